use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version of the `stats.json` report and the inspect output.
pub const STATS_SCHEMA_VERSION: u32 = 1;

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("pagekit {VERSION}");

    if let Some(hash) = option_env!("PAGEKIT_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string_prefix() {
        assert!(version_string().starts_with("pagekit "));
        assert!(!VERSION.is_empty());
    }
}
