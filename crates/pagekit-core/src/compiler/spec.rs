//! Per-module transpilation options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How JSX elements are lowered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JsxRuntime {
    /// `React.createElement` calls; the application imports React itself.
    #[default]
    Classic,
    /// `react/jsx-runtime` imports.
    Automatic,
}

/// Where a chunk's source map goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapKind {
    #[default]
    None,
    /// `data:` URL comment at the end of the chunk.
    Inline,
    /// Sibling `<file>.map` plus a `sourceMappingURL` comment.
    External,
}

impl fmt::Display for SourceMapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Inline => "inline",
            Self::External => "external",
        })
    }
}

/// Transpilation options for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileSpec {
    /// Root-relative module path; its extension selects TypeScript and JSX syntax.
    pub input_path: PathBuf,
    pub jsx_runtime: JsxRuntime,
}

impl TranspileSpec {
    #[must_use]
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            jsx_runtime: JsxRuntime::default(),
        }
    }

    #[must_use]
    pub fn with_jsx_runtime(mut self, runtime: JsxRuntime) -> Self {
        self.jsx_runtime = runtime;
        self
    }
}

/// Plain JavaScript produced from one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOutput {
    pub code: String,
}

impl TranspileOutput {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}
