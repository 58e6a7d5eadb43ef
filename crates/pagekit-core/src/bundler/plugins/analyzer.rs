//! Bundle composition report.
//!
//! Emits a static HTML report and a machine-readable `stats.json`. Neither
//! carries timestamps, so identical inputs give identical reports.

use crate::artifacts::{Artifact, ArtifactSet};
use crate::bundler::plugin::{HookResult, Plugin, PluginContext, PluginError};
use crate::version::STATS_SCHEMA_VERSION;
use serde::Serialize;
use std::fmt::Write;

pub struct BundleAnalyzerPlugin {
    report_filename: String,
    stats_filename: String,
}

#[derive(Debug, Serialize)]
struct Stats<'a> {
    version: u32,
    hash: &'a str,
    chunks: Vec<ChunkStats<'a>>,
    assets: Vec<AssetStats<'a>>,
}

#[derive(Debug, Serialize)]
struct ChunkStats<'a> {
    name: &'a str,
    file: &'a str,
    size: usize,
    modules: &'a [String],
}

#[derive(Debug, Serialize)]
struct AssetStats<'a> {
    name: &'a str,
    size: usize,
}

impl BundleAnalyzerPlugin {
    #[must_use]
    pub fn new(report_filename: impl Into<String>, stats_filename: impl Into<String>) -> Self {
        Self {
            report_filename: report_filename.into(),
            stats_filename: stats_filename.into(),
        }
    }

    fn stats<'a>(bundle: &'a ArtifactSet) -> Stats<'a> {
        Stats {
            version: STATS_SCHEMA_VERSION,
            hash: &bundle.hash,
            chunks: bundle
                .chunks
                .iter()
                .map(|chunk| ChunkStats {
                    name: &chunk.name,
                    file: &chunk.file,
                    size: bundle.get(&chunk.file).map_or(0, Artifact::len),
                    modules: &chunk.modules,
                })
                .collect(),
            assets: bundle
                .files
                .iter()
                .map(|(name, artifact)| AssetStats {
                    name,
                    size: artifact.len(),
                })
                .collect(),
        }
    }
}

impl Plugin for BundleAnalyzerPlugin {
    fn name(&self) -> &'static str {
        "bundle-analyzer"
    }

    fn generate_bundle(&self, bundle: &mut ArtifactSet, _ctx: &PluginContext) -> HookResult<()> {
        let stats = Self::stats(bundle);
        let json = serde_json::to_string_pretty(&stats)
            .map_err(|e| PluginError::new(self.name(), "generate_bundle", e.to_string()))?;
        let report = render_report(&stats);

        bundle.files.insert(
            self.stats_filename.clone(),
            Artifact::for_file(&self.stats_filename, json),
        );
        bundle.files.insert(
            self.report_filename.clone(),
            Artifact::for_file(&self.report_filename, report),
        );
        Ok(())
    }
}

fn render_report(stats: &Stats<'_>) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"UTF-8\">\n  \
         <title>Bundle report</title>\n  <style>\n    body { font-family: system-ui, sans-serif; margin: 24px; }\n    \
         table { border-collapse: collapse; margin-bottom: 24px; }\n    \
         td, th { border: 1px solid #ccc; padding: 4px 8px; text-align: left; }\n  </style>\n</head>\n<body>\n",
    );
    html.push_str("  <h1>Bundle report</h1>\n");

    for chunk in &stats.chunks {
        let _ = writeln!(
            html,
            "  <h2>{} <small>({}, {} bytes)</small></h2>",
            escape(chunk.name),
            escape(chunk.file),
            chunk.size
        );
        html.push_str("  <table>\n    <tr><th>Module</th></tr>\n");
        for module in chunk.modules {
            let _ = writeln!(html, "    <tr><td>{}</td></tr>", escape(module));
        }
        html.push_str("  </table>\n");
    }

    html.push_str("  <h2>Assets</h2>\n  <table>\n    <tr><th>File</th><th>Bytes</th></tr>\n");
    for asset in &stats.assets {
        let _ = writeln!(
            html,
            "    <tr><td>{}</td><td>{}</td></tr>",
            escape(asset.name),
            asset.size
        );
    }
    html.push_str("  </table>\n</body>\n</html>\n");
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
