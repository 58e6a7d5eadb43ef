//! Declarative build graph produced by the pipeline builder.

use super::policy::Compressor;
use super::registry::{self, Classification, TransformRule};
use crate::compiler::SourceMapKind;
use crate::config::Mode;
use crate::error::ConfigError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Specifier prefix of modules pagekit provides itself.
pub const VIRTUAL_PREFIX: &str = "pagekit:";

/// One module of an entry point, in load order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EntryModule {
    /// Runtime polyfills loaded before application code.
    Polyfill,
    /// Live-reload client; `reload` falls back to a full page reload.
    HotClient { reload: bool },
    /// Application entry, relative to the project root.
    App { path: PathBuf },
}

impl EntryModule {
    /// Specifier the module graph resolves.
    #[must_use]
    pub fn specifier(&self) -> String {
        match self {
            Self::Polyfill => format!("{VIRTUAL_PREFIX}polyfill"),
            Self::HotClient { reload } => format!("{VIRTUAL_PREFIX}hot-client?reload={reload}"),
            Self::App { path } => format!("./{}", registry::match_path(path)),
        }
    }
}

/// Named entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    pub modules: Vec<EntryModule>,
}

/// Output file naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputNaming {
    /// Output directory, relative to the project root.
    pub dir: PathBuf,
    /// URL prefix of every emitted asset.
    pub public_path: String,
    /// Script chunk template, `[name]` is the chunk name.
    pub chunk_filename: String,
    /// Source map template, `[file]` is the chunk file.
    pub source_map_filename: String,
    /// Extracted stylesheet template.
    pub style_filename: String,
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("dist"),
            public_path: "/".to_string(),
            chunk_filename: "[name]-bundle.js".to_string(),
            source_map_filename: "[file].map".to_string(),
            style_filename: "[name].css".to_string(),
        }
    }
}

impl OutputNaming {
    #[must_use]
    pub fn chunk_file(&self, name: &str) -> String {
        self.chunk_filename.replace("[name]", name)
    }

    #[must_use]
    pub fn map_file(&self, file: &str) -> String {
        self.source_map_filename.replace("[file]", file)
    }

    #[must_use]
    pub fn style_file(&self, name: &str) -> String {
        self.style_filename.replace("[name]", name)
    }

    /// Public URL of an emitted file.
    #[must_use]
    pub fn url(&self, file: &str) -> String {
        format!("{}{}", self.public_path, file)
    }
}

/// Build plugins, in the order they run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "plugin", rename_all = "kebab-case")]
pub enum PluginSpec {
    /// `module.hot` runtime in emitted bundles.
    ModuleReplacement,
    /// Live-reload notification channel.
    HotReload { path: String },
    /// Entry document generated from a template.
    HtmlTemplate { template: PathBuf, filename: String },
    /// `process.env.*` replacements from the loaded environment.
    DotEnv {
        safe: bool,
        allow_empty_values: bool,
        system_vars: bool,
    },
    /// Compile-time constants.
    Define { constants: BTreeMap<String, String> },
    /// Bundle composition report.
    BundleAnalyzer {
        report_filename: String,
        stats_filename: String,
    },
    /// Standalone stylesheet per chunk.
    StyleExtract { filename: String },
    /// Script minification pass over emitted chunks.
    Minify,
    /// Side-by-side compressed artifacts.
    Compress {
        algorithm: Compressor,
        /// Keep the compressed file only below this size ratio, in percent.
        min_ratio_percent: u8,
    },
}

impl PluginSpec {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ModuleReplacement => "module-replacement",
            Self::HotReload { .. } => "hot-reload",
            Self::HtmlTemplate { .. } => "html-template",
            Self::DotEnv { .. } => "dotenv",
            Self::Define { .. } => "define",
            Self::BundleAnalyzer { .. } => "bundle-analyzer",
            Self::StyleExtract { .. } => "style-extract",
            Self::Minify => "minify",
            Self::Compress { algorithm, .. } => match algorithm {
                Compressor::Brotli => "compress-brotli",
                Compressor::Gzip => "compress-gzip",
            },
        }
    }
}

/// Which chunks a split policy looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSelection {
    All,
    Initial,
}

/// Modules shared by at least `min_chunks` selected chunks move to `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheGroup {
    pub name: String,
    pub chunks: ChunkSelection,
    pub min_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitChunks {
    pub chunks: ChunkSelection,
    pub cache_groups: Vec<CacheGroup>,
}

/// Minimizers, run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Minimizer {
    /// Script chunks.
    Script,
    /// Stylesheet optimisation without browser targets.
    CssOptimize,
    /// Stylesheet minification with browser targets.
    CssMinimize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizationPolicy {
    pub split_chunks: SplitChunks,
    /// Whether `minimizers` run.
    pub minimize: bool,
    pub minimizers: Vec<Minimizer>,
}

/// Module resolution options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveOptions {
    /// Extensions tried for extensionless specifiers, in order.
    pub extensions: Vec<String>,
    /// Specifier prefix aliases, targets relative to the project root.
    pub alias: BTreeMap<String, PathBuf>,
}

/// Server options carried by the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevServerOptions {
    pub static_dir: PathBuf,
    pub port: u16,
    pub hot: bool,
    pub history_api_fallback: bool,
}

/// Declarative description of a build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildGraph {
    pub mode: Mode,
    pub root: PathBuf,
    pub entries: Vec<Entry>,
    pub output: OutputNaming,
    pub rules: Vec<TransformRule>,
    pub plugins: Vec<PluginSpec>,
    pub optimization: OptimizationPolicy,
    pub source_maps: SourceMapKind,
    pub resolve: ResolveOptions,
    pub dev_server: DevServerOptions,
}

impl BuildGraph {
    /// Classify a root-relative source file.
    pub fn classify(&self, path: &Path) -> Result<Classification<'_>, ConfigError> {
        registry::classify(&self.rules, path)
    }

    #[must_use]
    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    /// Output directory as an absolute path.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output.dir)
    }
}
