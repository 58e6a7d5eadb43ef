//! Side-by-side compressed artifacts (`<file>.br`, `<file>.gz`).

use crate::artifacts::{Artifact, ArtifactSet};
use crate::bundler::plugin::{HookResult, Plugin, PluginContext, PluginError};
use crate::codes;
use crate::pipeline::Compressor;
use flate2::write::GzEncoder;
use flate2::Compression;
use rayon::prelude::*;
use std::io::Write;

/// Files with these extensions are never compressed.
const SKIP_EXTENSIONS: &[&str] = &[".map", ".gz", ".br"];

pub struct CompressPlugin {
    algorithm: Compressor,
    min_ratio_percent: u8,
}

impl CompressPlugin {
    #[must_use]
    pub fn new(algorithm: Compressor, min_ratio_percent: u8) -> Self {
        Self {
            algorithm,
            min_ratio_percent,
        }
    }

    fn worth_keeping(&self, original: usize, compressed: usize) -> bool {
        compressed * 100 < original * usize::from(self.min_ratio_percent)
    }
}

impl Plugin for CompressPlugin {
    fn name(&self) -> &'static str {
        match self.algorithm {
            Compressor::Brotli => "compress-brotli",
            Compressor::Gzip => "compress-gzip",
        }
    }

    fn generate_bundle(&self, bundle: &mut ArtifactSet, _ctx: &PluginContext) -> HookResult<()> {
        let candidates: Vec<(&String, &Artifact)> = bundle
            .files
            .iter()
            .filter(|(name, _)| !SKIP_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
            .collect();

        let compressed: Vec<(String, Vec<u8>)> = candidates
            .par_iter()
            .map(|(name, artifact)| {
                let bytes = compress(self.algorithm, &artifact.bytes).map_err(|e| {
                    PluginError::new(self.name(), "generate_bundle", format!("{name}: {e}"))
                        .with_code(codes::TRANSFORM_COMPRESS_FAILED)
                })?;
                Ok((name.to_string(), bytes, artifact.len()))
            })
            .collect::<HookResult<Vec<_>>>()?
            .into_iter()
            .filter(|(_, bytes, original)| self.worth_keeping(*original, bytes.len()))
            .map(|(name, bytes, _)| (format!("{name}.{}", self.algorithm.extension()), bytes))
            .collect();

        tracing::debug!(
            algorithm = self.algorithm.as_str(),
            files = compressed.len(),
            "compressed artifacts"
        );
        for (name, bytes) in compressed {
            let artifact = Artifact::for_file(&name, bytes);
            bundle.files.insert(name, artifact);
        }
        Ok(())
    }
}

/// Compress `data` with `algorithm` at its highest quality.
pub fn compress(algorithm: Compressor, data: &[u8]) -> std::io::Result<Vec<u8>> {
    match algorithm {
        Compressor::Brotli => {
            let mut writer = brotli::CompressorWriter::new(Vec::new(), 4096, 11, 22);
            writer.write_all(data)?;
            writer.flush()?;
            Ok(writer.into_inner())
        }
        Compressor::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(data)?;
            encoder.finish()
        }
    }
}
