//! Compile-time constant replacement.
//!
//! Replaces whole-expression occurrences of each key (`PRODUCTION`,
//! `process.env.PORT`, `typeof window`) in script code. String literals and
//! comments are left alone; template literals only inside their `${...}`
//! substitutions. Values that are not a single token are wrapped in
//! parentheses so `TWO * 2` stays `(1+1) * 2`.

use crate::bundler::lexer::{
    expression_end, is_ident_char, is_member_char, skip_len, string_end, template_end,
};
use crate::bundler::plugin::{HookResult, Plugin, PluginContext};
use std::collections::BTreeMap;

/// Define plugin.
pub struct DefinePlugin {
    name: &'static str,
    /// Keys sorted longest first.
    keys: Vec<String>,
    values: BTreeMap<String, String>,
}

impl DefinePlugin {
    #[must_use]
    pub fn new(name: &'static str, constants: BTreeMap<String, String>) -> Self {
        let mut keys: Vec<String> = constants.keys().filter(|k| !k.is_empty()).cloned().collect();
        keys.sort_by_key(|k| std::cmp::Reverse(k.len()));
        let values = constants
            .into_iter()
            .map(|(k, v)| {
                let v = if is_single_token(&v) { v } else { format!("({v})") };
                (k, v)
            })
            .collect();
        Self { name, keys, values }
    }

    /// Apply the replacements to `code`.
    #[must_use]
    pub fn replace(&self, code: &str) -> String {
        let mut out = String::with_capacity(code.len());
        let mut rest = code;
        let mut prev: Option<char> = None;

        'outer: while let Some(c) = rest.chars().next() {
            if c == '`' {
                let end = template_end(rest);
                out.push_str(&self.replace_template(&rest[..end]));
                prev = Some(c);
                rest = &rest[end..];
                continue;
            }
            // Strings and comments are copied verbatim.
            if let Some(end) = skip_len(rest) {
                out.push_str(&rest[..end]);
                prev = rest[..end].chars().last();
                rest = &rest[end..];
                continue;
            }

            if !prev.is_some_and(is_member_char) {
                for key in &self.keys {
                    if rest.starts_with(key.as_str())
                        && !rest[key.len()..].chars().next().is_some_and(is_ident_char)
                    {
                        out.push_str(&self.values[key]);
                        prev = key.chars().last();
                        rest = &rest[key.len()..];
                        continue 'outer;
                    }
                }
            }

            out.push(c);
            prev = Some(c);
            rest = &rest[c.len_utf8()..];
        }
        out
    }

    /// Copy a template literal, replacing inside its `${...}` substitutions only.
    fn replace_template(&self, template: &str) -> String {
        let bytes = template.as_bytes();
        let mut out = String::with_capacity(template.len());
        let mut copied = 0;
        let mut i = 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    let start = i + 2;
                    let end = start + expression_end(&template[start..]);
                    out.push_str(&template[copied..start]);
                    out.push_str(&self.replace(&template[start..end]));
                    copied = end;
                    i = end + 1;
                }
                _ => i += 1,
            }
        }
        out.push_str(&template[copied..]);
        out
    }
}

impl Plugin for DefinePlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    fn transform(&self, code: &str, _id: &str, _ctx: &PluginContext) -> HookResult<Option<String>> {
        if self.keys.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.replace(code)))
    }
}

/// Whether `value` is a literal or identifier that needs no parentheses.
fn is_single_token(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return true;
    }
    if let Some(first) = value.chars().next().filter(|c| *c == '"' || *c == '\'') {
        return string_end(value, first) == value.len();
    }
    value.chars().all(|c| is_ident_char(c) || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::define_constants;

    fn plugin() -> DefinePlugin {
        DefinePlugin::new("define", define_constants(3111))
    }

    #[test]
    fn test_replaces_identifiers() {
        assert_eq!(plugin().replace("if (PRODUCTION) {}"), "if (false) {}");
        assert_eq!(plugin().replace("log(VERSION);"), "log(\"5fa3b9\");");
    }

    #[test]
    fn test_wraps_expressions() {
        assert_eq!(plugin().replace("const four = TWO * 2;"), "const four = (1+1) * 2;");
    }

    #[test]
    fn test_member_and_typeof_keys() {
        assert_eq!(
            plugin().replace("listen(process.env.PORT);"),
            "listen(\"3111\");"
        );
        assert_eq!(
            plugin().replace("if (typeof window !== 'undefined') {}"),
            "if (\"object\" !== 'undefined') {}"
        );
    }

    #[test]
    fn test_respects_boundaries() {
        let p = plugin();
        assert_eq!(p.replace("const PRODUCTION_URL = 1;"), "const PRODUCTION_URL = 1;");
        assert_eq!(p.replace("config.PRODUCTION"), "config.PRODUCTION");
        assert_eq!(p.replace("NOT_TWO"), "NOT_TWO");
    }

    #[test]
    fn test_skips_strings_and_comments() {
        let p = plugin();
        assert_eq!(p.replace("'PRODUCTION'"), "'PRODUCTION'");
        assert_eq!(p.replace("\"a \\\" PRODUCTION\""), "\"a \\\" PRODUCTION\"");
        assert_eq!(p.replace("// PRODUCTION\nTWO"), "// PRODUCTION\n(1+1)");
        assert_eq!(p.replace("/* TWO */ TWO"), "/* TWO */ (1+1)");
    }

    #[test]
    fn test_replaces_inside_template_substitutions() {
        let p = plugin();
        assert_eq!(p.replace("`v${VERSION}`"), "`v${\"5fa3b9\"}`");
        assert_eq!(
            p.replace("fetch(`${process.env.PORT}/users`)"),
            "fetch(`${\"3111\"}/users`)"
        );
        assert_eq!(
            p.replace("`PRODUCTION ${ {a: TWO}.a } ${`x${PRODUCTION}`}`"),
            "`PRODUCTION ${ {a: (1+1)}.a } ${`x${false}`}`"
        );
        assert_eq!(p.replace("`a\\${TWO}` + TWO"), "`a\\${TWO}` + (1+1)");
    }
}
