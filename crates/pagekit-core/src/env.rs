//! Environment loading: `.env` parsing, system-variable precedence, schema
//! validation against `.env.example`, and `process.env.*` replacements.

use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::path::Path;

/// Dotenv file read from the project root.
pub const DOTENV_FILE: &str = ".env";

/// Schema file listing the variables a build requires.
pub const SCHEMA_FILE: &str = ".env.example";

/// Parse a `.env` file's contents into key-value pairs.
///
/// Supports:
/// - `KEY=value` (unquoted)
/// - `KEY="value"` (double-quoted, with escape sequences)
/// - `KEY='value'` (single-quoted, literal)
/// - Comments (`#`) and blank lines are skipped
/// - Inline comments after unquoted values
#[must_use]
pub fn parse_env_file(content: &str) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();

    for line in content.lines() {
        if let Some((key, value)) = parse_line(line) {
            env.insert(key.to_string(), value);
        }
    }

    env
}

fn parse_line(line: &str) -> Option<(&str, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let key = key.strip_prefix("export ").unwrap_or(key).trim();
    if key.is_empty() {
        return None;
    }

    let raw_value = line[eq_pos + 1..].trim();
    let value = if raw_value.starts_with('"') {
        parse_double_quoted(raw_value)
    } else if raw_value.starts_with('\'') {
        parse_single_quoted(raw_value)
    } else {
        parse_unquoted(raw_value)
    };

    Some((key, value))
}

fn parse_double_quoted(raw: &str) -> String {
    let inner = &raw[1..];

    let mut result = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => {
                if let Some(escaped) = chars.next() {
                    match escaped {
                        'n' => result.push('\n'),
                        'r' => result.push('\r'),
                        't' => result.push('\t'),
                        '\\' => result.push('\\'),
                        '"' => result.push('"'),
                        other => {
                            result.push('\\');
                            result.push(other);
                        }
                    }
                }
            }
            _ => result.push(c),
        }
    }

    result
}

fn parse_single_quoted(raw: &str) -> String {
    let inner = &raw[1..];
    match inner.find('\'') {
        Some(end) => inner[..end].to_string(),
        None => inner.to_string(),
    }
}

fn parse_unquoted(raw: &str) -> String {
    if raw.starts_with('#') {
        return String::new();
    }
    match raw.find(" #") {
        Some(comment_pos) => raw[..comment_pos].trim_end().to_string(),
        None => raw.to_string(),
    }
}

/// Load `<root>/.env`. A missing file yields an empty map.
pub fn load_dotenv(root: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let path = root.join(DOTENV_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(parse_env_file(&content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(source) => Err(ConfigError::Read { path, source }),
    }
}

/// Overlay system variables on top of dotenv values. System variables win.
#[must_use]
pub fn merge_system_vars<I, K, V>(
    mut dotenv: BTreeMap<String, String>,
    system: I,
) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    for (key, value) in system {
        dotenv.insert(key.into(), value.into());
    }
    dotenv
}

/// Variables a build requires, read from `.env.example`.
///
/// Every key is required unless its line carries a `# optional` comment.
/// Empty values satisfy a requirement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSchema {
    pub required: Vec<String>,
    pub optional: Vec<String>,
}

impl EnvSchema {
    /// Parse schema file contents.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut schema = Self::default();
        for line in content.lines() {
            let optional = line
                .split_once(" #")
                .is_some_and(|(_, comment)| comment.trim().eq_ignore_ascii_case("optional"));
            if let Some((key, _)) = parse_line(line) {
                if optional {
                    schema.optional.push(key.to_string());
                } else {
                    schema.required.push(key.to_string());
                }
            }
        }
        schema
    }

    /// Load `<root>/.env.example`, or `None` when the project has no schema.
    pub fn load(root: &Path) -> Result<Option<Self>, ConfigError> {
        let path = root.join(SCHEMA_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(Self::parse(&content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// Check that every required key is present.
    pub fn validate(&self, env: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|key| !env.contains_key(key.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingVariables(missing))
        }
    }
}

/// `process.env.KEY` replacements for every loaded variable, values encoded
/// as JSON string literals.
#[must_use]
pub fn process_env_replacements(env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    env.iter()
        .filter(|(key, _)| is_identifier(key))
        .map(|(key, value)| (format!("process.env.{key}"), json_string(value)))
        .collect()
}

/// Encode a string as a JSON string literal.
#[must_use]
pub fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_key_value() {
        let env = parse_env_file("KEY=value\nOTHER=123");
        assert_eq!(env.get("KEY").unwrap(), "value");
        assert_eq!(env.get("OTHER").unwrap(), "123");
    }

    #[test]
    fn test_parse_double_quoted_escapes() {
        let env = parse_env_file(r#"KEY="line1\nline2\ttab\\backslash""#);
        assert_eq!(env.get("KEY").unwrap(), "line1\nline2\ttab\\backslash");
    }

    #[test]
    fn test_parse_single_quoted_no_escapes() {
        let env = parse_env_file(r"KEY='hello\nworld'");
        assert_eq!(env.get("KEY").unwrap(), r"hello\nworld");
    }

    #[test]
    fn test_skip_comments_and_inline_comments() {
        let env = parse_env_file("# comment\n\nKEY=value # trailing\n  # another\nexport X=1");
        assert_eq!(env.len(), 2);
        assert_eq!(env.get("KEY").unwrap(), "value");
        assert_eq!(env.get("X").unwrap(), "1");
    }

    #[test]
    fn test_empty_value_and_equals_in_value() {
        let env = parse_env_file("EMPTY=\nKEY=a=b=c");
        assert_eq!(env.get("EMPTY").unwrap(), "");
        assert_eq!(env.get("KEY").unwrap(), "a=b=c");
    }

    #[test]
    fn test_load_dotenv_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dotenv(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_merge_system_vars_precedence() {
        let dotenv = parse_env_file("A=file\nB=file");
        let merged = merge_system_vars(dotenv, [("A", "system")]);
        assert_eq!(merged.get("A").unwrap(), "system");
        assert_eq!(merged.get("B").unwrap(), "file");
    }

    #[test]
    fn test_schema_required_and_optional() {
        let schema = EnvSchema::parse("API_URL=\nSENTRY_DSN= # optional\n# comment\nPORT=3000\n");
        assert_eq!(schema.required, vec!["API_URL", "PORT"]);
        assert_eq!(schema.optional, vec!["SENTRY_DSN"]);
    }

    #[test]
    fn test_schema_allows_empty_values() {
        let schema = EnvSchema::parse("API_URL=\n");
        let env = parse_env_file("API_URL=");
        assert!(schema.validate(&env).is_ok());
    }

    #[test]
    fn test_schema_reports_all_missing_keys() {
        let schema = EnvSchema::parse("A=\nB=\nC=\n");
        let env = parse_env_file("B=1");
        match schema.validate(&env).unwrap_err() {
            ConfigError::MissingVariables(names) => assert_eq!(names, vec!["A", "C"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_process_env_replacements() {
        let env = parse_env_file("API_URL=http://localhost:8080\nMSG=say \"hi\"");
        let replacements = process_env_replacements(&env);
        assert_eq!(
            replacements.get("process.env.API_URL").unwrap(),
            "\"http://localhost:8080\""
        );
        assert_eq!(
            replacements.get("process.env.MSG").unwrap(),
            r#""say \"hi\"""#
        );
    }

    #[test]
    fn test_process_env_skips_non_identifier_keys() {
        let mut env = BTreeMap::new();
        env.insert("ProgramFiles(x86)".to_string(), "C:\\".to_string());
        assert!(process_env_replacements(&env).is_empty());
    }
}
