//! Chunk emission.
//!
//! Each chunk registers its modules with a small page-global registry
//! (`self.__pagekit`) and entry chunks then run their entry modules. Module
//! code is rewritten line by line: `import`/`export` statements become
//! registry `require` calls and `exports` assignments. CommonJS `require`
//! calls in dependency code are pointed at module ids.

use super::chunks::Chunk;
use super::graph::{quoted_prefix, static_specifier, Module, ModuleGraph};
use super::lexer;
use super::sourcemap::SourceMapBuilder;
use crate::env::json_string;

/// Emission options.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions {
    /// Give every module a `module.hot` object.
    pub module_replacement: bool,
}

/// A rendered chunk and its line mappings.
#[derive(Debug, Clone)]
pub struct RenderedChunk {
    pub code: String,
    pub map: SourceMapBuilder,
}

/// Registry runtime, shared by every chunk. Defines `self.__pagekit` once.
#[must_use]
pub fn registry_runtime(options: EmitOptions) -> String {
    let hot = if options.module_replacement {
        r#"
  var disposers = [];
  function hotFor(id) {
    return {
      data: {},
      accept: function () {},
      dispose: function (callback) { disposers.push(callback); }
    };
  }
  function disposeAll() {
    while (disposers.length) {
      try { disposers.pop()(); } catch (e) { console.error(e); }
    }
  }"#
    } else {
        r"
  function disposeAll() {}"
    };
    let attach = if options.module_replacement {
        "\n    module.hot = hotFor(id);"
    } else {
        ""
    };

    format!(
        r#"(function (g) {{
  if (g.__pagekit) return;
  var modules = {{}};
  var cache = {{}};{hot}
  function require(id) {{
    if (cache[id]) return cache[id].exports;
    var factory = modules[id];
    if (!factory) throw new Error("Cannot find module '" + id + "'");
    var module = {{ id: id, exports: {{}} }};{attach}
    cache[id] = module;
    factory.call(module.exports, module, module.exports, require);
    return module.exports;
  }}
  require.interop = function (m) {{
    return m && Object.prototype.hasOwnProperty.call(m, "default") ? m["default"] : m;
  }};
  require.reexport = function (target, m) {{
    Object.keys(m).forEach(function (k) {{ if (k !== "default") target[k] = m[k]; }});
  }};
  g.__pagekit = {{
    define: function (id, factory) {{ modules[id] = factory; }},
    require: require,
    run: function (ids) {{ ids.forEach(function (id) {{ require(id); }}); }},
    dispose: disposeAll
  }};
}})(self);
"#
    )
}

/// Render `chunk`.
#[must_use]
pub fn render_chunk(graph: &ModuleGraph, chunk: &Chunk, options: EmitOptions) -> RenderedChunk {
    let mut code = registry_runtime(options);
    let mut line = code.lines().count() as u32;
    let mut map = SourceMapBuilder::new();

    for id in &chunk.modules {
        let Some(module) = graph.get(id) else {
            continue;
        };
        let source_idx = map.add_source(&module.id, &module.source);

        code.push_str(&format!(
            "__pagekit.define({}, function (module, exports, require) {{\n",
            json_string(&module.id)
        ));
        line += 1;

        let (body, mapped) = rewrite_module(module);
        for (i, text) in body.iter().enumerate() {
            if i < mapped {
                map.add_line_mapping(line, source_idx, i as u32);
            }
            code.push_str("  ");
            code.push_str(text);
            code.push('\n');
            line += 1;
        }

        code.push_str("});\n");
        line += 1;
    }

    if chunk.is_entry() {
        let ids: Vec<String> = chunk.entry_modules.iter().map(|id| json_string(id)).collect();
        code.push_str(&format!("__pagekit.run([{}]);\n", ids.join(", ")));
    }

    RenderedChunk { code, map }
}

/// Rewrite a module body. Returns the lines and how many of them correspond
/// one-to-one with lines of the module code; the rest are trailing exports.
fn rewrite_module(module: &Module) -> (Vec<String>, usize) {
    let mut lines = Vec::new();
    let mut pending = Vec::new();

    let code = rewrite_requires(module);
    for (n, line) in code.lines().enumerate() {
        let (rewritten, exports) = rewrite_line(line, n, module);
        lines.push(rewrite_dynamic_imports(&rewritten, module));
        pending.extend(exports);
    }

    let mapped = lines.len();
    lines.extend(pending);
    (lines, mapped)
}

fn rewrite_line(line: &str, n: usize, module: &Module) -> (String, Vec<String>) {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];

    if trimmed.starts_with("import ") || trimmed.starts_with("import'") || trimmed.starts_with("import\"") {
        if let Some(rewritten) = rewrite_import(trimmed, n, module) {
            return (format!("{indent}{rewritten}"), Vec::new());
        }
    }

    if trimmed.starts_with("export ") {
        if let Some((rewritten, exports)) = rewrite_export(trimmed, module) {
            return (format!("{indent}{rewritten}"), exports);
        }
    }

    (line.to_string(), Vec::new())
}

/// `require("<id>")` for a specifier of `module`.
fn require_call(specifier: &str, module: &Module) -> String {
    let target = module
        .resolve_specifier(specifier)
        .map_or(specifier, |resolved| resolved.id());
    format!("require({})", json_string(target))
}

/// Module code with each literal `require("...")` call pointed at the
/// resolved module id.
fn rewrite_requires(module: &Module) -> String {
    let code = module.code.as_str();
    let mut out = String::with_capacity(code.len());
    let mut copied = 0;
    for call in lexer::require_calls(code) {
        out.push_str(&code[copied..call.span.start]);
        out.push_str(&require_call(call.specifier, module));
        copied = call.span.end;
    }
    out.push_str(&code[copied..]);
    out
}

/// Rewrite an import statement.
///
/// - `import './a'` -> `require("src/a.ts");`
/// - `import A from './a'` -> `const A = require.interop(require("src/a.ts"));`
/// - `import * as A from './a'` -> `const A = require("src/a.ts");`
/// - `import { a, b as c } from './a'` -> `const { a, b: c } = require("src/a.ts");`
fn rewrite_import(line: &str, n: usize, module: &Module) -> Option<String> {
    let specifier = static_specifier(line)?;
    let require = require_call(&specifier, module);

    let Some(from_idx) = line.rfind(" from ") else {
        return Some(format!("{require};"));
    };
    let clause = line["import".len()..from_idx].trim();

    if let Some(ns) = clause.strip_prefix("* as ") {
        return Some(format!("const {} = {require};", ns.trim()));
    }

    let (default, named) = match clause.find('{') {
        Some(open) => {
            let close = clause.rfind('}')?;
            let default = clause[..open].trim().trim_end_matches(',').trim();
            let named = clause[open + 1..close].replace(" as ", ": ");
            (default, Some(named.trim().to_string()))
        }
        None => (clause, None),
    };

    match (default.is_empty(), named) {
        (false, None) => Some(format!("const {default} = require.interop({require});")),
        (true, Some(named)) => Some(format!("const {{ {named} }} = {require};")),
        (false, Some(named)) => {
            let tmp = format!("__pagekit_import_{n}");
            Some(format!(
                "const {tmp} = {require}; const {default} = require.interop({tmp}); const {{ {named} }} = {tmp};"
            ))
        }
        (true, None) => Some(format!("{require};")),
    }
}

/// Rewrite an export statement. Returns the replacement line and the
/// `exports` assignments to emit at the end of the module.
fn rewrite_export(line: &str, module: &Module) -> Option<(String, Vec<String>)> {
    if let Some(value) = line.strip_prefix("export default ") {
        for keyword in ["async function", "function", "class"] {
            if let Some(rest) = value.strip_prefix(keyword) {
                let name = leading_identifier(rest.trim_start_matches('*').trim_start());
                if !name.is_empty() && rest.starts_with(|c: char| c.is_whitespace() || c == '*') {
                    return Some((value.to_string(), vec![format!("exports.default = {name};")]));
                }
            }
        }
        return Some((format!("exports.default = {value}"), Vec::new()));
    }

    if line.contains(" from ") {
        let specifier = static_specifier(line)?;
        let require = require_call(&specifier, module);
        if line.starts_with("export * from") {
            return Some((format!("require.reexport(exports, {require});"), Vec::new()));
        }
        let names = braced_names(line)?;
        let assignments: Vec<String> = names
            .iter()
            .map(|(local, exported)| format!("exports.{exported} = m.{local};"))
            .collect();
        return Some((
            format!("(function (m) {{ {} }})({require});", assignments.join(" ")),
            Vec::new(),
        ));
    }

    if line.starts_with("export {") {
        let names = braced_names(line)?;
        let exports = names
            .iter()
            .map(|(local, exported)| format!("exports.{exported} = {local};"))
            .collect();
        return Some((String::new(), exports));
    }

    let decl = line.strip_prefix("export ")?;
    for keyword in ["const ", "let ", "var ", "function ", "async function ", "class "] {
        if let Some(rest) = decl.strip_prefix(keyword) {
            let name = leading_identifier(rest.trim_start_matches('*').trim_start());
            if name.is_empty() {
                return None;
            }
            return Some((decl.to_string(), vec![format!("exports.{name} = {name};")]));
        }
    }
    None
}

/// `{ a, b as c }` -> [(a, a), (b, c)].
fn braced_names(line: &str) -> Option<Vec<(String, String)>> {
    let open = line.find('{')?;
    let close = line[open..].find('}')? + open;
    Some(
        line[open + 1..close]
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once(" as ") {
                Some((local, exported)) => (local.trim().to_string(), exported.trim().to_string()),
                None => (part.to_string(), part.to_string()),
            })
            .collect(),
    )
}

fn leading_identifier(text: &str) -> &str {
    let end = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(text.len());
    &text[..end]
}

/// `import('./a')` -> `Promise.resolve().then(function () { return require("src/a.ts"); })`.
fn rewrite_dynamic_imports(line: &str, module: &Module) -> String {
    if !line.contains("import(") {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(pos) = rest.find("import(") {
        let preceded_by_ident = rest[..pos]
            .chars()
            .last()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.');
        let after = &rest[pos + "import(".len()..];
        let literal = quoted_prefix(after.trim_start())
            .and_then(|(spec, tail)| tail.trim_start().strip_prefix(')').map(|tail| (spec, tail)));

        match literal {
            Some((specifier, tail)) if !preceded_by_ident => {
                out.push_str(&rest[..pos]);
                out.push_str(&format!(
                    "Promise.resolve().then(function () {{ return {}; }})",
                    require_call(specifier, module)
                ));
                rest = tail;
            }
            _ => {
                out.push_str(&rest[..pos + "import(".len()]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::graph::Import;
    use crate::bundler::resolve::Resolved;
    use crate::pipeline::FileCategory;
    use std::collections::{BTreeMap, HashMap};

    fn module(id: &str, code: &str, resolved: &[(&str, Resolved)]) -> Module {
        Module {
            id: id.to_string(),
            category: FileCategory::Script,
            source: code.to_string(),
            code: code.to_string(),
            css: None,
            declaration: None,
            tokens: BTreeMap::new(),
            imports: resolved
                .iter()
                .map(|(spec, _)| Import {
                    specifier: (*spec).to_string(),
                    dynamic: false,
                })
                .collect(),
            resolved: resolved
                .iter()
                .map(|(spec, r)| ((*spec).to_string(), r.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn app() -> Module {
        module(
            "src/index.tsx",
            "",
            &[
                ("./App", Resolved::Module("src/App.tsx".into())),
                (
                    "react",
                    Resolved::Module("node_modules/react/index.js".into()),
                ),
            ],
        )
    }

    #[test]
    fn test_rewrite_import_side_effect() {
        assert_eq!(
            rewrite_import("import './App';", 0, &app()).unwrap(),
            r#"require("src/App.tsx");"#
        );
    }

    #[test]
    fn test_rewrite_import_default() {
        assert_eq!(
            rewrite_import("import App from './App';", 0, &app()).unwrap(),
            r#"const App = require.interop(require("src/App.tsx"));"#
        );
    }

    #[test]
    fn test_rewrite_import_named_and_namespace() {
        assert_eq!(
            rewrite_import("import { a, b as c } from './App';", 0, &app()).unwrap(),
            r#"const { a, b: c } = require("src/App.tsx");"#
        );
        assert_eq!(
            rewrite_import("import * as React from \"react\";", 0, &app()).unwrap(),
            r#"const React = require("node_modules/react/index.js");"#
        );
    }

    #[test]
    fn test_rewrite_import_default_and_named() {
        assert_eq!(
            rewrite_import("import React, { useState } from 'react';", 3, &app()).unwrap(),
            r#"const __pagekit_import_3 = require("node_modules/react/index.js"); const React = require.interop(__pagekit_import_3); const { useState } = __pagekit_import_3;"#
        );
    }

    #[test]
    fn test_rewrite_exports() {
        let m = app();
        assert_eq!(
            rewrite_export("export const x = 1;", &m).unwrap(),
            ("const x = 1;".to_string(), vec!["exports.x = x;".to_string()])
        );
        assert_eq!(
            rewrite_export("export default function App() {", &m).unwrap(),
            (
                "function App() {".to_string(),
                vec!["exports.default = App;".to_string()]
            )
        );
        assert_eq!(
            rewrite_export("export default 42;", &m).unwrap(),
            ("exports.default = 42;".to_string(), Vec::new())
        );
        assert_eq!(
            rewrite_export("export { a, b as c };", &m).unwrap(),
            (
                String::new(),
                vec!["exports.a = a;".to_string(), "exports.c = b;".to_string()]
            )
        );
    }

    #[test]
    fn test_rewrite_reexports() {
        let m = app();
        assert_eq!(
            rewrite_export("export { a as b } from './App';", &m).unwrap().0,
            r#"(function (m) { exports.b = m.a; })(require("src/App.tsx"));"#
        );
        assert_eq!(
            rewrite_export("export * from './App';", &m).unwrap().0,
            r#"require.reexport(exports, require("src/App.tsx"));"#
        );
    }

    #[test]
    fn test_rewrite_dynamic_import() {
        assert_eq!(
            rewrite_dynamic_imports("const m = import('./App');", &app()),
            r#"const m = Promise.resolve().then(function () { return require("src/App.tsx"); });"#
        );
        assert_eq!(rewrite_dynamic_imports("x.import('a')", &app()), "x.import('a')");
    }

    #[test]
    fn test_rewrite_commonjs_requires() {
        let m = module(
            "node_modules/react/index.js",
            "if (dev) {\n  module.exports = require('./cjs/react.development.js');\n}\nvar msg = \"require('./x')\";",
            &[(
                "./cjs/react.development.js",
                Resolved::Module("node_modules/react/cjs/react.development.js".into()),
            )],
        );
        assert_eq!(
            rewrite_requires(&m),
            "if (dev) {\n  module.exports = require(\"node_modules/react/cjs/react.development.js\");\n}\nvar msg = \"require('./x')\";"
        );
    }

    #[test]
    fn test_render_chunk() {
        let mut graph = ModuleGraph::new();
        graph.add(module(
            "src/index.tsx",
            "import App from './App';\nexport const x = App;",
            &[("./App", Resolved::Module("src/App.tsx".into()))],
        ));
        graph.add(module("src/App.tsx", "export default 1;", &[]));

        let chunk = Chunk {
            name: "main".to_string(),
            modules: vec!["src/index.tsx".to_string(), "src/App.tsx".to_string()],
            entry_modules: vec!["src/index.tsx".to_string()],
        };
        let rendered = render_chunk(&graph, &chunk, EmitOptions::default());

        assert!(rendered.code.starts_with("(function (g) {"));
        assert!(rendered
            .code
            .contains("__pagekit.define(\"src/index.tsx\", function (module, exports, require) {"));
        assert!(rendered.code.contains("  exports.x = x;\n"));
        assert!(rendered.code.ends_with("__pagekit.run([\"src/index.tsx\"]);\n"));
        assert_eq!(rendered.map.sources(), ["src/index.tsx", "src/App.tsx"]);
        assert!(!rendered.code.contains("module.hot"));
    }

    #[test]
    fn test_module_replacement_runtime() {
        let runtime = registry_runtime(EmitOptions {
            module_replacement: true,
        });
        assert!(runtime.contains("module.hot = hotFor(id);"));
        assert!(runtime.contains("dispose: disposeAll"));
    }
}
