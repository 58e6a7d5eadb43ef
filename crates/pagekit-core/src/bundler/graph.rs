//! Module dependency graph.
//!
//! Tracks modules and their dependencies for bundling. Modules are kept in
//! discovery order, which is deterministic for a given source tree.

use super::lexer;
use super::resolve::Resolved;
use crate::pipeline::FileCategory;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// An import found in emitted module code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// The import specifier (e.g., "./utils", "react").
    pub specifier: String,
    /// Whether this is a dynamic `import()`.
    pub dynamic: bool,
}

/// A transformed module.
#[derive(Debug, Clone)]
pub struct Module {
    /// Module id (root-relative path or virtual specifier).
    pub id: String,
    pub category: FileCategory,
    /// Source as read from disk or provided by a plugin.
    pub source: String,
    /// Script code after the transformation chain and plugin transforms.
    pub code: String,
    /// Extracted stylesheet, for styles in extract mode.
    pub css: Option<String>,
    /// Generated declaration file, for scoped styles.
    pub declaration: Option<(PathBuf, String)>,
    /// Scoped tokens declared by this module: local name to token.
    pub tokens: BTreeMap<String, String>,
    pub imports: Vec<Import>,
    /// Resolution of each import specifier.
    pub resolved: HashMap<String, Resolved>,
}

impl Module {
    /// Ids of every module this module imports (static and dynamic).
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.imports
            .iter()
            .filter_map(|import| self.resolved.get(&import.specifier))
            .map(Resolved::id)
    }

    /// Module id a specifier of this module refers to.
    #[must_use]
    pub fn resolve_specifier(&self, specifier: &str) -> Option<&Resolved> {
        self.resolved.get(specifier)
    }
}

/// The module dependency graph.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    /// All modules, in discovery order.
    modules: Vec<Module>,
    index: HashMap<String, usize>,
}

impl ModuleGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module. A module with the same id replaces the earlier one.
    pub fn add(&mut self, module: Module) {
        if let Some(&i) = self.index.get(&module.id) {
            self.modules[i] = module;
        } else {
            self.index.insert(module.id.clone(), self.modules.len());
            self.modules.push(module);
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Module> {
        self.index.get(id).map(|&i| &self.modules[i])
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterate over all modules in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Position of a module in discovery order.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Every module reachable from `start`, including `start`, in discovery order.
    #[must_use]
    pub fn reachable(&self, start: &[String]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut stack: Vec<&str> = start.iter().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id.to_string()) {
                continue;
            }
            if let Some(module) = self.get(id) {
                stack.extend(module.dependencies());
            }
        }

        let mut ids: Vec<String> = seen.into_iter().filter(|id| self.contains(id)).collect();
        ids.sort_by_key(|id| self.position(id));
        ids
    }
}

/// Extract imports from emitted script code.
///
/// Static `import` statements, `export ... from` re-exports and
/// `import("...")` calls are read line by line, so a statement split over
/// several lines must go through [`join_split_statements`] first. CommonJS
/// `require("...")` calls are found anywhere outside literals and comments.
#[must_use]
pub fn scan_imports(code: &str) -> Vec<Import> {
    let mut imports = Vec::new();

    for line in code.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("import ") || trimmed.starts_with("import\"") || trimmed.starts_with("import'") {
            if let Some(specifier) = static_specifier(trimmed) {
                imports.push(Import {
                    specifier,
                    dynamic: false,
                });
            }
        } else if trimmed.starts_with("export ") && trimmed.contains(" from ") {
            if let Some(specifier) = static_specifier(trimmed) {
                imports.push(Import {
                    specifier,
                    dynamic: false,
                });
            }
        }

        let mut rest = trimmed;
        while let Some(pos) = rest.find("import(") {
            rest = &rest[pos + "import(".len()..];
            if let Some((specifier, _)) = quoted_prefix(rest.trim_start()) {
                imports.push(Import {
                    specifier: specifier.to_string(),
                    dynamic: true,
                });
            }
        }
    }

    imports.extend(lexer::require_calls(code).into_iter().map(|call| Import {
        specifier: call.specifier.to_string(),
        dynamic: false,
    }));
    imports
}

/// Put each `import { ... } from` and `export { ... }` statement whose braces
/// span several lines onto its first line. The lines it came from are left
/// empty, so every other line keeps its number.
#[must_use]
pub fn join_split_statements(code: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut lines = code.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        let opens_list = trimmed.starts_with("import {")
            || trimmed.starts_with("import{")
            || trimmed.starts_with("export {")
            || (trimmed.starts_with("import ") && trimmed.contains(", {"));
        if !opens_list || trimmed.contains('}') {
            out.push(line.to_string());
            continue;
        }

        let mut joined = line.trim_end().to_string();
        let mut consumed = 0;
        for next in lines.by_ref() {
            consumed += 1;
            let part = next.trim();
            if !part.is_empty() {
                joined.push(' ');
                joined.push_str(part);
            }
            if part.contains('}') {
                break;
            }
        }
        out.push(joined);
        out.extend(std::iter::repeat(String::new()).take(consumed));
    }

    let mut code_out = out.join("\n");
    if code.ends_with('\n') {
        code_out.push('\n');
    }
    code_out
}

/// Specifier of a single-line `import`/`export ... from` statement.
pub(crate) fn static_specifier(line: &str) -> Option<String> {
    let tail = match line.rfind(" from ") {
        Some(pos) => &line[pos + " from ".len()..],
        None => line.strip_prefix("import")?,
    };
    quoted_prefix(tail.trim_start()).map(|(spec, _)| spec.to_string())
}

/// `'abc' rest` -> (`abc`, ` rest`).
pub(crate) fn quoted_prefix(text: &str) -> Option<(&str, &str)> {
    let quote = text.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &text[1..];
    let end = body.find(quote)?;
    Some((&body[..end], &body[end + 1..]))
}
