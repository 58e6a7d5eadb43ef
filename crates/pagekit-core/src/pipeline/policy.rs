//! Mode policy: the development/production decision table.
//!
//! Every mode-dependent choice the pipeline builder makes is read from one of
//! the two [`ModePolicy`] values below. The printable [`table`] is derived from
//! the same values so the documentation cannot drift from the behaviour.

use super::registry::Stage;
use crate::compiler::SourceMapKind;
use crate::config::{Mode, ModeConfig};
use serde::Serialize;

/// How stylesheets reach the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleHandling {
    /// Injected at runtime by the script bundle.
    Inject,
    /// Extracted into a standalone stylesheet per chunk.
    Extract,
}

impl StyleHandling {
    /// Final stage of every stylesheet chain.
    #[must_use]
    pub fn stage(self) -> Stage {
        match self {
            Self::Inject => Stage::InjectStyle,
            Self::Extract => Stage::ExtractStyle,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Inject => "inject at runtime",
            Self::Extract => "extract to [name].css",
        }
    }
}

/// When the bundle analyzer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Analyzer {
    Always,
    /// Only when `ANALYZE` is truthy.
    OnRequest,
}

/// How the server exposes artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Serving {
    /// In-memory snapshot of a resident compiler.
    Live,
    /// Read-only output directory.
    Static,
}

/// Side-by-side compressed artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compressor {
    Brotli,
    Gzip,
}

impl Compressor {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brotli => "brotli",
            Self::Gzip => "gzip",
        }
    }

    /// File extension appended to the compressed artifact.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gz",
        }
    }
}

/// Mode-dependent decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModePolicy {
    pub style_handling: StyleHandling,
    /// Live-reload client entry and notification channel.
    pub live_reload: bool,
    /// `module.hot` runtime in emitted bundles.
    pub module_replacement: bool,
    pub analyzer: Analyzer,
    /// Whether declared minimizers run.
    pub minimize: bool,
    pub compressors: &'static [Compressor],
    pub source_maps: SourceMapKind,
    pub serving: Serving,
}

pub const DEVELOPMENT: ModePolicy = ModePolicy {
    style_handling: StyleHandling::Inject,
    live_reload: true,
    module_replacement: true,
    analyzer: Analyzer::Always,
    minimize: false,
    compressors: &[],
    source_maps: SourceMapKind::Inline,
    serving: Serving::Live,
};

pub const PRODUCTION: ModePolicy = ModePolicy {
    style_handling: StyleHandling::Extract,
    live_reload: false,
    module_replacement: true,
    analyzer: Analyzer::OnRequest,
    minimize: true,
    compressors: &[Compressor::Brotli, Compressor::Gzip],
    // Inline in production too; minification drops their line mappings.
    source_maps: SourceMapKind::Inline,
    serving: Serving::Static,
};

impl ModePolicy {
    #[must_use]
    pub fn for_mode(mode: Mode) -> &'static Self {
        match mode {
            Mode::Development => &DEVELOPMENT,
            Mode::Production => &PRODUCTION,
        }
    }

    /// Whether the analyzer plugin belongs in the graph for `config`.
    #[must_use]
    pub fn analyzer_enabled(&self, config: &ModeConfig) -> bool {
        match self.analyzer {
            Analyzer::Always => true,
            Analyzer::OnRequest => config.analyze_requested(),
        }
    }
}

/// One printable row of the decision table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRow {
    pub aspect: &'static str,
    pub development: String,
    pub production: String,
}

/// The decision table, derived from [`DEVELOPMENT`] and [`PRODUCTION`].
#[must_use]
pub fn table() -> Vec<PolicyRow> {
    let aspects: [(&'static str, fn(&ModePolicy) -> String); 8] = [
        ("style handling", |p| p.style_handling.describe().to_string()),
        ("live reload", |p| on_off(p.live_reload)),
        ("module replacement runtime", |p| on_off(p.module_replacement)),
        ("bundle analyzer", |p| match p.analyzer {
            Analyzer::Always => "on".to_string(),
            Analyzer::OnRequest => "when ANALYZE is set".to_string(),
        }),
        ("minification", |p| {
            if p.minimize {
                "script, then css minimizers".to_string()
            } else {
                "declared, not run".to_string()
            }
        }),
        ("compression", |p| {
            if p.compressors.is_empty() {
                "off".to_string()
            } else {
                p.compressors
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(" + ")
            }
        }),
        ("source maps", |p| p.source_maps.to_string()),
        ("serving", |p| match p.serving {
            Serving::Live => "live (in-memory snapshot)".to_string(),
            Serving::Static => "static (dist/)".to_string(),
        }),
    ];

    aspects
        .into_iter()
        .map(|(aspect, describe)| PolicyRow {
            aspect,
            development: describe(&DEVELOPMENT),
            production: describe(&PRODUCTION),
        })
        .collect()
}

fn on_off(value: bool) -> String {
    if value { "on" } else { "off" }.to_string()
}
