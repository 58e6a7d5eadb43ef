//! Scoped (module) stylesheet naming.
//!
//! Each local class name in a scoped stylesheet is renamed to
//! `<file base>__<local>--<hash>`. The file base is the file name without
//! its final extension, dots replaced by dashes. The hash is five characters
//! derived from the root-relative path, the local name and the file content.
//! The engine's own generated names are then replaced in the emitted CSS.

use super::CssExport;
use pagekit_util::hash::short_base64_hash;
use std::collections::BTreeMap;
use std::path::Path;

/// Length of the hash suffix in scoped tokens.
pub const TOKEN_HASH_LEN: usize = 5;

/// Scoped token for `local` declared in the file at `rel_path`.
#[must_use]
pub fn scoped_token(rel_path: &str, local: &str, content: &str) -> String {
    let hash = short_base64_hash(
        &[rel_path.as_bytes(), local.as_bytes(), content.as_bytes()],
        TOKEN_HASH_LEN,
    );
    format!("{}__{local}--{hash}", file_base(rel_path))
}

/// File stem with every `.` replaced by `-` (`App.module.scss` -> `App-module`).
fn file_base(rel_path: &str) -> String {
    Path::new(rel_path)
        .file_stem()
        .map_or_else(|| rel_path.to_string(), |n| n.to_string_lossy().into_owned())
        .replace('.', "-")
}

/// Scoped stylesheet after renaming.
#[derive(Debug, Clone, Default)]
pub struct ScopedStyle {
    /// CSS with every local renamed to its token.
    pub code: String,
    /// Local name to the class list exposed to scripts.
    pub classes: BTreeMap<String, String>,
    /// Local name to its own token (without composed classes).
    pub tokens: BTreeMap<String, String>,
}

/// Rename the engine-generated names in `code` to scoped tokens.
///
/// `content` is the original (pre-Sass) source of the file.
#[must_use]
pub fn scope_stylesheet(
    rel_path: &str,
    content: &str,
    code: &str,
    exports: &BTreeMap<String, CssExport>,
) -> ScopedStyle {
    let mut renames: BTreeMap<String, String> = BTreeMap::new();
    let mut tokens = BTreeMap::new();
    for (local, export) in exports {
        let token = scoped_token(rel_path, local, content);
        renames.insert(export.name.clone(), token.clone());
        tokens.insert(local.clone(), token);
    }

    let mut classes = BTreeMap::new();
    for (local, export) in exports {
        let mut list = vec![tokens[local].clone()];
        for composed in &export.composes_local {
            list.push(renames.get(composed).cloned().unwrap_or_else(|| composed.clone()));
        }
        list.extend(export.composes_global.iter().cloned());
        classes.insert(local.clone(), list.join(" "));
    }

    ScopedStyle {
        code: replace_identifiers(code, &renames),
        classes,
        tokens,
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Replace whole-identifier occurrences of each key in `renames`.
///
/// An occurrence only counts when it is not preceded or followed by an
/// identifier character, so `a_btn` never matches inside `a_btn-primary`.
#[must_use]
pub fn replace_identifiers(code: &str, renames: &BTreeMap<String, String>) -> String {
    if renames.is_empty() {
        return code.to_string();
    }

    let mut names: Vec<&String> = renames.keys().filter(|k| !k.is_empty()).collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));

    let mut out = String::with_capacity(code.len());
    let mut i = 0;
    let mut prev: Option<char> = None;
    'outer: while i < code.len() {
        let rest = &code[i..];
        if !prev.is_some_and(is_ident_char) {
            for name in &names {
                if rest.starts_with(name.as_str())
                    && !rest[name.len()..].chars().next().is_some_and(is_ident_char)
                {
                    out.push_str(&renames[*name]);
                    i += name.len();
                    prev = name.chars().last();
                    continue 'outer;
                }
            }
        }
        let Some(c) = rest.chars().next() else { break };
        out.push(c);
        prev = Some(c);
        i += c.len_utf8();
    }
    out
}
