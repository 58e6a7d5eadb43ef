//! Compiler backend abstraction for script transpilation and minification.
//!
//! The rest of pagekit never calls SWC directly; the transpile stage and the
//! script minimizer go through [`CompilerBackend`].

pub mod spec;
pub mod swc;

pub use spec::{JsxRuntime, SourceMapKind, TranspileOutput, TranspileSpec};
pub use swc::SwcBackend;

use thiserror::Error;

/// Transpile or minify failure reported by a backend.
#[derive(Error, Debug)]
#[error("{code}: {message}")]
pub struct CompilerError {
    pub code: &'static str,
    pub message: String,
}

impl CompilerError {
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new("COMPILER_PARSE_ERROR", message)
    }

    #[must_use]
    pub fn transform_error(message: impl Into<String>) -> Self {
        Self::new("COMPILER_TRANSFORM_ERROR", message)
    }
}

/// Script compiler used by the transpile stage and the script minimizer.
///
/// `Send + Sync`: one backend serves every module of every rebuild.
pub trait CompilerBackend: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    /// Transpile one module according to `spec`.
    fn transpile(&self, spec: &TranspileSpec, source: &str)
        -> Result<TranspileOutput, CompilerError>;

    /// Minify an emitted script chunk.
    fn minify(&self, code: &str) -> Result<String, CompilerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_error_display() {
        let error = CompilerError::parse_error("Unexpected token");
        assert_eq!(error.to_string(), "COMPILER_PARSE_ERROR: Unexpected token");
    }
}
