//! Request resolution shared by static and live serving.
//!
//! Both serving states look files up through [`AssetSource`]: the static
//! state over the output directory, the live state over the current
//! in-memory snapshot.

use crate::artifacts::{Artifact, ArtifactSet};
use std::path::{Component, Path, PathBuf};

/// Document served for unknown extensionless paths.
pub const FALLBACK_DOCUMENT: &str = "index.html";

/// Something requests can be served from.
pub trait AssetSource {
    /// Look up an output file by name (relative to the output root).
    fn fetch(&self, name: &str) -> Option<Artifact>;
}

impl AssetSource for ArtifactSet {
    fn fetch(&self, name: &str) -> Option<Artifact> {
        self.get(name).cloned()
    }
}

/// Output directory on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirSource {
    fn fetch(&self, name: &str) -> Option<Artifact> {
        let path = self.root.join(name);
        if !path.is_file() {
            return None;
        }
        std::fs::read(&path)
            .ok()
            .map(|bytes| Artifact::for_file(name, bytes))
    }
}

/// Outcome of resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The file named by the path.
    File { name: String, artifact: Artifact },
    /// History fallback: the entry document for a client-side route.
    Fallback(Artifact),
    NotFound,
}

/// Resolve a request path against `source`.
///
/// Known path: the file. Unknown path without an extension: the entry
/// document. Anything else, including paths leaving the output root: not
/// found.
pub fn resolve_request(source: &dyn AssetSource, path: &str) -> Resolution {
    let Some(name) = normalize_request_path(path) else {
        return Resolution::NotFound;
    };

    if let Some(artifact) = source.fetch(&name) {
        return Resolution::File { name, artifact };
    }

    if Path::new(&name).extension().is_none() {
        if let Some(document) = source.fetch(FALLBACK_DOCUMENT) {
            return Resolution::Fallback(document);
        }
    }

    Resolution::NotFound
}

/// Pick a precompressed sibling (`.br`, then `.gz`) the client accepts.
///
/// Returns the artifact and its `Content-Encoding`.
pub fn negotiate_encoding(
    source: &dyn AssetSource,
    name: &str,
    accept_encoding: &str,
) -> Option<(Artifact, &'static str)> {
    let accepts = |coding: &str| {
        accept_encoding.split(',').any(|part| {
            let mut fields = part.split(';');
            let accepted = fields.next().is_some_and(|c| c.trim().eq_ignore_ascii_case(coding));
            let refused = fields.any(|q| q.trim().replace(' ', "") == "q=0");
            accepted && !refused
        })
    };

    [("br", "br"), ("gzip", "gz")]
        .into_iter()
        .filter(|(coding, _)| accepts(coding))
        .find_map(|(coding, ext)| {
            source
                .fetch(&format!("{name}.{ext}"))
                .map(|artifact| (artifact, if coding == "br" { "br" } else { "gzip" }))
        })
}

/// `/a/b.js?x=1` -> `a/b.js`; `/` -> the entry document. `None` for paths
/// that climb out of the output root.
fn normalize_request_path(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Some(FALLBACK_DOCUMENT.to_string());
    }

    let mut parts = Vec::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ArtifactSet {
        let mut set = ArtifactSet::empty();
        for (name, body) in [
            ("index.html", "<html></html>"),
            ("main-bundle.js", "js"),
            ("main-bundle.js.gz", "gz"),
            ("main-bundle.js.br", "br"),
            ("main.css", "css"),
        ] {
            set.files.insert(name.to_string(), Artifact::for_file(name, body));
        }
        set
    }

    #[test]
    fn test_known_path_serves_file() {
        let set = snapshot();
        match resolve_request(&set, "/main-bundle.js?v=1") {
            Resolution::File { name, artifact } => {
                assert_eq!(name, "main-bundle.js");
                assert_eq!(&artifact.bytes[..], b"js");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_root_serves_entry_document() {
        let set = snapshot();
        assert!(matches!(
            resolve_request(&set, "/"),
            Resolution::File { name, .. } if name == "index.html"
        ));
    }

    #[test]
    fn test_history_fallback_only_without_extension() {
        let set = snapshot();
        assert!(matches!(
            resolve_request(&set, "/users/42"),
            Resolution::Fallback(_)
        ));
        assert_eq!(resolve_request(&set, "/missing.png"), Resolution::NotFound);
    }

    #[test]
    fn test_traversal_is_not_found() {
        let set = snapshot();
        assert_eq!(resolve_request(&set, "/../secret"), Resolution::NotFound);
        assert_eq!(resolve_request(&set, "/a/../../secret"), Resolution::NotFound);
    }

    #[test]
    fn test_dir_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>home</p>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        let source = DirSource::new(dir.path());

        assert!(matches!(
            resolve_request(&source, "/about"),
            Resolution::Fallback(a) if &a.bytes[..] == b"<p>home</p>"
        ));
        assert_eq!(resolve_request(&source, "/assets/app.js"), Resolution::NotFound);
    }

    #[test]
    fn test_negotiate_encoding() {
        let set = snapshot();
        let (artifact, encoding) =
            negotiate_encoding(&set, "main-bundle.js", "gzip, deflate, br").unwrap();
        assert_eq!(encoding, "br");
        assert_eq!(&artifact.bytes[..], b"br");

        let (_, encoding) = negotiate_encoding(&set, "main-bundle.js", "gzip").unwrap();
        assert_eq!(encoding, "gzip");

        let (_, encoding) = negotiate_encoding(&set, "main-bundle.js", "br;q=0, gzip").unwrap();
        assert_eq!(encoding, "gzip");

        assert!(negotiate_encoding(&set, "main.css", "br").is_none());
        assert!(negotiate_encoding(&set, "main-bundle.js", "identity").is_none());
    }
}
