//! Just enough JavaScript lexing to step over literals and comments.
//!
//! Regular expression literals are not recognized; a quote inside one is
//! read as the start of a string.

use std::ops::Range;

/// Byte length of the string literal, template literal or comment at the
/// start of `text`, if it starts with one.
#[must_use]
pub fn skip_len(text: &str) -> Option<usize> {
    if text.starts_with("//") {
        return Some(text.find('\n').unwrap_or(text.len()));
    }
    if text.starts_with("/*") {
        return Some(text[2..].find("*/").map_or(text.len(), |i| i + 4));
    }
    match text.chars().next()? {
        quote @ ('"' | '\'') => Some(string_end(text, quote)),
        '`' => Some(template_end(text)),
        _ => None,
    }
}

/// Byte length of the quoted string at the start of `text`, including quotes.
/// An unterminated string ends at the line break.
#[must_use]
pub fn string_end(text: &str, quote: char) -> usize {
    let mut escaped = false;
    for (i, c) in text.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return i + c.len_utf8();
        } else if c == '\n' {
            return i;
        }
    }
    text.len()
}

/// Byte length of the template literal at the start of `text`, including
/// its `${...}` substitutions.
#[must_use]
pub fn template_end(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                let start = i + 2;
                i = start + expression_end(&text[start..]) + 1;
            }
            _ => i += 1,
        }
    }
    text.len()
}

/// Byte offset of the `}` closing a template substitution that starts at
/// the beginning of `text`, or `text.len()` when it is never closed.
#[must_use]
pub fn expression_end(text: &str) -> usize {
    let mut depth = 0usize;
    let mut i = 0;
    while let Some(c) = text[i..].chars().next() {
        if let Some(len) = skip_len(&text[i..]) {
            i += len;
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return i,
            '}' => depth -= 1,
            _ => {}
        }
        i += c.len_utf8();
    }
    text.len()
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Characters that make the following text a property access or part of an identifier.
pub(crate) fn is_member_char(c: char) -> bool {
    is_ident_char(c) || c == '.'
}

/// A `require("...")` call with a literal specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireCall<'a> {
    /// Byte range of the whole call in the scanned code.
    pub span: Range<usize>,
    pub specifier: &'a str,
}

/// Every `require("...")` call in `code` outside literals and comments.
#[must_use]
pub fn require_calls(code: &str) -> Vec<RequireCall<'_>> {
    const CALLEE: &str = "require(";

    let mut calls = Vec::new();
    let mut prev: Option<char> = None;
    let mut i = 0;
    while let Some(c) = code[i..].chars().next() {
        if let Some(len) = skip_len(&code[i..]) {
            prev = None;
            i += len;
            continue;
        }

        if code[i..].starts_with(CALLEE) && !prev.is_some_and(is_member_char) {
            if let Some((specifier, end)) = literal_argument(code, i + CALLEE.len()) {
                calls.push(RequireCall {
                    span: i..end,
                    specifier,
                });
                prev = Some(')');
                i = end;
                continue;
            }
        }

        prev = Some(c);
        i += c.len_utf8();
    }
    calls
}

/// `'abc' )` at `start` -> (`abc`, offset just past the `)`).
fn literal_argument(code: &str, start: usize) -> Option<(&str, usize)> {
    let text = &code[start..];
    let trimmed = text.trim_start();
    let quote = trimmed.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let literal_start = start + (text.len() - trimmed.len());
    let len = string_end(trimmed, quote);
    if len < 2 || !trimmed[..len].ends_with(quote) {
        return None;
    }
    let specifier = &code[literal_start + 1..literal_start + len - 1];
    if specifier.contains('\\') {
        return None;
    }

    let after = &code[literal_start + len..];
    let close = after.trim_start();
    close.starts_with(')').then(|| (specifier, code.len() - close.len() + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_literals_and_comments() {
        assert_eq!(skip_len("'a\\'b' + c"), Some(6));
        assert_eq!(skip_len("// note\nx"), Some(7));
        assert_eq!(skip_len("/* a */b"), Some(7));
        assert_eq!(skip_len("x = 1"), None);
    }

    #[test]
    fn test_template_with_nested_substitutions() {
        let text = "`a${ {b: `c${d}`}.b }e` + 1";
        assert_eq!(template_end(text), text.len() - 4);
        assert_eq!(expression_end("x + `}` }rest"), 8);
    }

    #[test]
    fn test_require_calls() {
        let code = "var a = require('./a');\nvar b = x.require('./b');\n// require('./c')\nvar s = \"require('./d')\";\nmodule.exports = require( \"e/f\" );";
        let calls = require_calls(code);
        let specifiers: Vec<&str> = calls.iter().map(|c| c.specifier).collect();
        assert_eq!(specifiers, vec!["./a", "e/f"]);
        assert_eq!(&code[calls[0].span.clone()], "require('./a')");
        assert_eq!(&code[calls[1].span.clone()], "require( \"e/f\" )");
    }

    #[test]
    fn test_require_with_expression_is_skipped() {
        assert!(require_calls("require(name); require('a' + b);").is_empty());
    }
}
