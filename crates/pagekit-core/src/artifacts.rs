//! Immutable build output.

use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One emitted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

impl Artifact {
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>, content_type: &'static str) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    /// Artifact whose content type is derived from `name`.
    #[must_use]
    pub fn for_file(name: &str, bytes: impl Into<Bytes>) -> Self {
        Self::new(bytes, content_type_for(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A script chunk in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkArtifact {
    pub name: String,
    /// Output file name (`main-bundle.js`).
    pub file: String,
    /// BLAKE3 hex digest of the chunk file.
    pub hash: String,
    /// Root-relative ids of the modules in the chunk.
    pub modules: Vec<String>,
}

/// A complete, immutable build result.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    /// Output name (relative to the output directory) to file.
    pub files: BTreeMap<String, Artifact>,
    pub chunks: Vec<ChunkArtifact>,
    /// Generated declaration files, by root-relative path.
    pub declarations: BTreeMap<PathBuf, String>,
    /// Digest over every output file name and content.
    pub hash: String,
}

impl ArtifactSet {
    /// Snapshot with no files, served before the first build completes.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.files.get(name.trim_start_matches('/'))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn chunk(&self, name: &str) -> Option<&ChunkArtifact> {
        self.chunks.iter().find(|c| c.name == name)
    }

    /// Names of chunks whose content differs from `previous` (or are new).
    #[must_use]
    pub fn changed_chunks(&self, previous: &ArtifactSet) -> Vec<String> {
        self.chunks
            .iter()
            .filter(|chunk| {
                previous
                    .chunk(&chunk.name)
                    .map_or(true, |old| old.hash != chunk.hash)
            })
            .map(|chunk| chunk.name.clone())
            .collect()
    }

    /// Total size of all files in bytes.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.files.values().map(Artifact::len).sum()
    }

    /// Recompute `hash` from the current files.
    pub fn seal(&mut self) {
        let mut hasher = blake3::Hasher::new();
        for (name, artifact) in &self.files {
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update(&(artifact.bytes.len() as u64).to_le_bytes());
            hasher.update(&artifact.bytes);
        }
        self.hash = hasher.finalize().to_hex().to_string();
    }
}

/// Content type for an output file name.
#[must_use]
pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    match ext {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" | "cjs" => "application/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        "gz" => "application/gzip",
        "br" => "application/x-brotli",
        _ => "application/octet-stream",
    }
}
