//! Stable error codes for configuration and transformation failures.
//!
//! All codes are SCREAMING_SNAKE_CASE and stable across versions.

/// Mode string is neither `development` nor `production`.
pub const CONFIG_UNKNOWN_MODE: &str = "CONFIG_UNKNOWN_MODE";

/// Required environment variables are absent.
pub const CONFIG_MISSING_VARIABLES: &str = "CONFIG_MISSING_VARIABLES";

/// `PORT` is not a valid TCP port.
pub const CONFIG_INVALID_PORT: &str = "CONFIG_INVALID_PORT";

/// A configuration input (dotenv file, schema) could not be read.
pub const CONFIG_READ_FAILED: &str = "CONFIG_READ_FAILED";

/// A source file matches no transformation rule.
pub const CONFIG_UNCLASSIFIED_FILE: &str = "CONFIG_UNCLASSIFIED_FILE";

/// Two transformation rules claim the same file.
pub const CONFIG_OVERLAPPING_RULES: &str = "CONFIG_OVERLAPPING_RULES";

/// A transformation rule pattern failed to compile.
pub const CONFIG_INVALID_PATTERN: &str = "CONFIG_INVALID_PATTERN";

/// The build graph declares no entry modules.
pub const CONFIG_NO_ENTRY: &str = "CONFIG_NO_ENTRY";

/// A source file could not be read.
pub const TRANSFORM_READ_FAILED: &str = "TRANSFORM_READ_FAILED";

/// A relative import could not be resolved.
pub const TRANSFORM_UNRESOLVED_IMPORT: &str = "TRANSFORM_UNRESOLVED_IMPORT";

/// The Sass engine rejected a stylesheet.
pub const TRANSFORM_SASS_FAILED: &str = "TRANSFORM_SASS_FAILED";

/// The CSS engine rejected a stylesheet.
pub const TRANSFORM_CSS_FAILED: &str = "TRANSFORM_CSS_FAILED";

/// The script compiler rejected a module.
pub const TRANSFORM_SCRIPT_FAILED: &str = "TRANSFORM_SCRIPT_FAILED";

/// Two scoped class tokens collided within one build.
pub const TRANSFORM_TOKEN_COLLISION: &str = "TRANSFORM_TOKEN_COLLISION";

/// A minimizer failed on an emitted asset.
pub const TRANSFORM_MINIFY_FAILED: &str = "TRANSFORM_MINIFY_FAILED";

/// A build plugin failed.
pub const TRANSFORM_PLUGIN_FAILED: &str = "TRANSFORM_PLUGIN_FAILED";

/// The entry document template could not be read.
pub const TRANSFORM_TEMPLATE_FAILED: &str = "TRANSFORM_TEMPLATE_FAILED";

/// A compressor failed on an emitted asset.
pub const TRANSFORM_COMPRESS_FAILED: &str = "TRANSFORM_COMPRESS_FAILED";
