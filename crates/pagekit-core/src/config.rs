//! Mode configuration, collected once at process start.

use crate::env::{self, EnvSchema};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Port used in development (and by the server) when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3111;

/// Build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    /// Lenient selection used by the server: `production` selects production,
    /// anything else (including an unset variable) selects development.
    #[must_use]
    pub fn from_node_env(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable per-process configuration.
///
/// Everything downstream (pipeline builder, compiler, server) reads the
/// environment through this value rather than the process environment.
#[derive(Debug, Clone, Serialize)]
pub struct ModeConfig {
    /// Selected mode.
    pub mode: Mode,
    /// Project root.
    pub root: PathBuf,
    /// Merged environment: dotenv values overlaid by system variables.
    pub env: BTreeMap<String, String>,
    /// Port from `PORT`, if set.
    pub port: Option<u16>,
}

impl ModeConfig {
    /// Create a config with an empty environment.
    #[must_use]
    pub fn new(mode: Mode, root: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            root: root.into(),
            env: BTreeMap::new(),
            port: None,
        }
    }

    /// Set a single environment variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Collect the configuration for `root`.
    ///
    /// Reads `<root>/.env`, overlays `system` (system variables win), validates
    /// the result against `<root>/.env.example` when present, and parses `PORT`.
    pub fn load<I, K, V>(root: &Path, mode: Mode, system: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let dotenv = env::load_dotenv(root)?;
        let merged = env::merge_system_vars(dotenv, system);

        if let Some(schema) = EnvSchema::load(root)? {
            schema.validate(&merged)?;
        }

        let port = match merged.get("PORT") {
            Some(raw) if !raw.is_empty() => Some(parse_port(raw)?),
            _ => None,
        };

        Ok(Self {
            mode,
            root: root.to_path_buf(),
            env: merged,
            port,
        })
    }

    /// Look up an environment variable.
    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Port the pipeline embeds into the bundle.
    ///
    /// Development falls back to [`DEFAULT_PORT`]; production requires `PORT`.
    pub fn required_port(&self) -> Result<u16, ConfigError> {
        match (self.port, self.mode) {
            (Some(port), _) => Ok(port),
            (None, Mode::Development) => Ok(DEFAULT_PORT),
            (None, Mode::Production) => Err(ConfigError::MissingVariables(vec!["PORT".into()])),
        }
    }

    /// Port the server listens on.
    #[must_use]
    pub fn listen_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Whether the bundle analyzer was requested through `ANALYZE`.
    #[must_use]
    pub fn analyze_requested(&self) -> bool {
        matches!(
            self.var("ANALYZE").map(str::to_ascii_lowercase).as_deref(),
            Some("1" | "true" | "yes")
        )
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| ConfigError::InvalidPort(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mode_parse_is_strict() {
        assert_eq!("production".parse::<Mode>().unwrap(), Mode::Production);
        assert_eq!("development".parse::<Mode>().unwrap(), Mode::Development);
        let err = "staging".parse::<Mode>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMode(ref m) if m == "staging"));
    }

    #[test]
    fn test_node_env_selection_is_lenient() {
        assert_eq!(Mode::from_node_env(Some("production")), Mode::Production);
        assert_eq!(Mode::from_node_env(Some("staging")), Mode::Development);
        assert_eq!(Mode::from_node_env(None), Mode::Development);
    }

    #[test]
    fn test_load_system_vars_win_over_dotenv() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "API_URL=from-file\nPORT=4000\n").unwrap();

        let config = ModeConfig::load(
            dir.path(),
            Mode::Development,
            [("API_URL", "from-system")],
        )
        .unwrap();

        assert_eq!(config.var("API_URL"), Some("from-system"));
        assert_eq!(config.port, Some(4000));
    }

    #[test]
    fn test_load_rejects_invalid_port() {
        let dir = tempdir().unwrap();
        let err = ModeConfig::load(dir.path(), Mode::Development, [("PORT", "http")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));
    }

    #[test]
    fn test_load_validates_schema() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".env.example"), "API_URL=\nPORT=\n").unwrap();

        let err = ModeConfig::load(dir.path(), Mode::Production, [("PORT", "8080")])
            .unwrap_err();
        match err {
            ConfigError::MissingVariables(names) => assert_eq!(names, vec!["API_URL"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_required_port() {
        let dev = ModeConfig::new(Mode::Development, "/app");
        assert_eq!(dev.required_port().unwrap(), DEFAULT_PORT);

        let prod = ModeConfig::new(Mode::Production, "/app");
        assert!(matches!(
            prod.required_port(),
            Err(ConfigError::MissingVariables(_))
        ));
        assert_eq!(prod.with_port(8080).required_port().unwrap(), 8080);
    }

    #[test]
    fn test_analyze_requested() {
        let config = ModeConfig::new(Mode::Production, "/app");
        assert!(!config.analyze_requested());
        assert!(config.with_var("ANALYZE", "true").analyze_requested());
    }
}
