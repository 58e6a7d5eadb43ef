use crate::codes;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration errors.
///
/// These are detected while collecting the `ModeConfig` or assembling the
/// module graph, always before a listener binds or any output is written.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown mode '{0}' (expected 'development' or 'production')")]
    UnknownMode(String),

    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no transformation rule matches {0}")]
    UnclassifiedFile(PathBuf),

    #[error("transformation rules '{first}' and '{second}' both match {path}")]
    OverlappingRules {
        path: PathBuf,
        first: &'static str,
        second: &'static str,
    },

    #[error("invalid file pattern '{pattern}': {message}")]
    InvalidPattern {
        pattern: &'static str,
        message: String,
    },

    #[error("build graph has no entry modules")]
    NoEntry,
}

impl ConfigError {
    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownMode(_) => codes::CONFIG_UNKNOWN_MODE,
            Self::MissingVariables(_) => codes::CONFIG_MISSING_VARIABLES,
            Self::InvalidPort(_) => codes::CONFIG_INVALID_PORT,
            Self::Read { .. } => codes::CONFIG_READ_FAILED,
            Self::UnclassifiedFile(_) => codes::CONFIG_UNCLASSIFIED_FILE,
            Self::OverlappingRules { .. } => codes::CONFIG_OVERLAPPING_RULES,
            Self::InvalidPattern { .. } => codes::CONFIG_INVALID_PATTERN,
            Self::NoEntry => codes::CONFIG_NO_ENTRY,
        }
    }
}

/// Errors produced while executing a build graph.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Configuration problem discovered during graph construction.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A transformation stage, plugin, or minimizer failed.
    #[error("{message}")]
    Transform {
        code: &'static str,
        message: String,
        path: Option<String>,
    },
}

impl CompileError {
    /// Create a transformation error.
    pub fn transform(code: &'static str, message: impl Into<String>) -> Self {
        Self::Transform {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Attach the offending file to a transformation error.
    #[must_use]
    pub fn with_path(self, path: impl Into<String>) -> Self {
        match self {
            Self::Transform { code, message, .. } => Self::Transform {
                code,
                message,
                path: Some(path.into()),
            },
            other => other,
        }
    }

    /// Stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.code(),
            Self::Transform { code, .. } => code,
        }
    }

    /// Configuration errors abort the process; transformation errors do not.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// One-line description including the file, for logs and notifications.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Transform {
                code,
                message,
                path: Some(path),
            } => format!("{code}: {path}: {message}"),
            other => format!("{}: {other}", other.code()),
        }
    }
}
