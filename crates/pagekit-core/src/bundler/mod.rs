//! Build graph execution.
//!
//! ## Usage
//!
//! ```ignore
//! use pagekit_core::{Compiler, ModeConfig, Mode};
//! use pagekit_core::compiler::SwcBackend;
//! use std::sync::Arc;
//!
//! let config = ModeConfig::load(root, Mode::Production, std::env::vars())?;
//! let compiler = Compiler::from_config(&config, Arc::new(SwcBackend::new()))?;
//! let artifacts = compiler.compile()?;
//! ```
//!
//! ## Architecture
//!
//! 1. **Resolution** - Resolve entry specifiers and imports to module ids
//! 2. **Graph** - Walk the imports breadth-first, transforming each frontier in parallel
//! 3. **Chunks** - Split the graph into entry chunks and shared cache-group chunks
//! 4. **Emit** - Render each chunk, minimize, attach source maps, extract stylesheets
//! 5. **Bundle** - Let plugins add the entry document, reports and compressed files

pub mod chunks;
pub mod emit;
pub mod graph;
pub mod lexer;
pub mod plugin;
pub mod plugins;
pub mod resolve;
pub mod sourcemap;
pub mod transform;

pub use chunks::{split_chunks, Chunk};
pub use emit::{EmitOptions, RenderedChunk};
pub use graph::{Import, Module, ModuleGraph};
pub use plugin::{ChunkInfo, HookResult, Plugin, PluginContainer, PluginContext, PluginError};
pub use resolve::{Resolved, Resolver};
pub use transform::ModuleOutput;

use crate::artifacts::{Artifact, ArtifactSet, ChunkArtifact};
use crate::codes;
use crate::compiler::{CompilerBackend, SourceMapKind};
use crate::config::ModeConfig;
use crate::css;
use crate::error::CompileError;
use crate::pipeline::{self, BuildGraph, Classification, Minimizer, VIRTUAL_PREFIX};
use pagekit_util::fs::write_if_changed;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use transform::TransformContext;

/// A module output cached under the hash of its id and source.
struct CachedModule {
    hash: String,
    output: Arc<ModuleOutput>,
}

/// Resident executor of one build graph.
///
/// Keeps per-module transformation results between runs, so a rebuild only
/// transforms modules whose source changed.
pub struct Compiler {
    graph: BuildGraph,
    backend: Arc<dyn CompilerBackend>,
    plugins: PluginContainer,
    emit: EmitOptions,
    resolver: Resolver,
    cache: RwLock<HashMap<String, CachedModule>>,
}

impl Compiler {
    /// Create a compiler for `graph`. `env` feeds the `process.env` replacements.
    #[must_use]
    pub fn new(
        mut graph: BuildGraph,
        env: &BTreeMap<String, String>,
        backend: Arc<dyn CompilerBackend>,
    ) -> Self {
        graph.root = dunce::canonicalize(&graph.root).unwrap_or_else(|_| graph.root.clone());
        let (plugins, emit) = plugins::from_graph(&graph, env);
        let resolver = Resolver::new(graph.root.clone(), &graph.resolve);
        Self {
            graph,
            backend,
            plugins,
            emit,
            resolver,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Build the graph for `config` and create its compiler.
    pub fn from_config(
        config: &ModeConfig,
        backend: Arc<dyn CompilerBackend>,
    ) -> Result<Self, CompileError> {
        let graph = pipeline::build(config)?;
        Ok(Self::new(graph, &config.env, backend))
    }

    #[must_use]
    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.graph.root
    }

    /// Number of cached module outputs.
    #[must_use]
    pub fn cached_modules(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Execute the graph against the current source tree.
    pub fn compile(&self) -> Result<ArtifactSet, CompileError> {
        let started = Instant::now();
        self.resolver.clear_cache();

        let entries = self.resolve_entries()?;
        let modules = self.build_module_graph(&entries)?;
        check_token_collisions(&modules)?;

        let chunks = split_chunks(&modules, &entries, &self.graph.optimization.split_chunks);

        let mut artifacts = ArtifactSet::empty();
        for chunk in &chunks {
            self.emit_chunk(&modules, chunk, &mut artifacts)?;
        }
        for module in modules.iter() {
            if let Some((path, content)) = &module.declaration {
                artifacts.declarations.insert(path.clone(), content.clone());
            }
        }

        self.plugins
            .generate_bundle(&mut artifacts)
            .map_err(CompileError::from)?;
        artifacts.seal();

        self.prune_cache(&modules);

        let short_hash = artifacts.hash.get(..12).unwrap_or(&artifacts.hash);
        tracing::info!(
            mode = %self.graph.mode,
            backend = self.backend.name(),
            modules = modules.len(),
            chunks = artifacts.chunks.len(),
            files = artifacts.files.len(),
            hash = short_hash,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "build complete"
        );
        Ok(artifacts)
    }

    /// Resolved module ids of every entry, by entry name.
    fn resolve_entries(&self) -> Result<Vec<(String, Vec<String>)>, CompileError> {
        self.graph
            .entries
            .iter()
            .map(|entry| {
                let ids = entry
                    .modules
                    .iter()
                    .map(|module| {
                        self.resolver
                            .resolve_entry(&module.specifier())
                            .map(|resolved| resolved.id().to_string())
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((entry.name.clone(), ids))
            })
            .collect()
    }

    /// Walk imports breadth-first from the entries.
    fn build_module_graph(
        &self,
        entries: &[(String, Vec<String>)],
    ) -> Result<ModuleGraph, CompileError> {
        let mut graph = ModuleGraph::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut frontier: Vec<String> = Vec::new();
        for id in entries.iter().flat_map(|(_, ids)| ids) {
            if seen.insert(id.clone()) {
                frontier.push(id.clone());
            }
        }

        while !frontier.is_empty() {
            let loaded = frontier
                .par_iter()
                .map(|id| self.load_module(id))
                .collect::<Result<Vec<_>, _>>()?;

            let mut next = Vec::new();
            for module in loaded {
                for dep in module.dependencies() {
                    if seen.insert(dep.to_string()) {
                        next.push(dep.to_string());
                    }
                }
                graph.add(module);
            }
            frontier = next;
        }

        Ok(graph)
    }

    /// Load, transform and scan one module.
    fn load_module(&self, id: &str) -> Result<Module, CompileError> {
        let is_virtual = id.starts_with(VIRTUAL_PREFIX);
        let source = match self
            .plugins
            .load(id)
            .map_err(|e| CompileError::from(e).with_path(id))?
        {
            Some(code) => code,
            None if is_virtual => {
                return Err(CompileError::transform(
                    codes::TRANSFORM_UNRESOLVED_IMPORT,
                    format!("no plugin provides '{id}'"),
                )
                .with_path(id));
            }
            None => std::fs::read_to_string(self.graph.root.join(id)).map_err(|e| {
                CompileError::transform(codes::TRANSFORM_READ_FAILED, e.to_string()).with_path(id)
            })?,
        };

        let classification = if is_virtual {
            Classification::Passthrough
        } else {
            self.graph.classify(Path::new(id))?
        };
        let output = self.transform_cached(id, &source, classification)?;
        let code = graph::join_split_statements(&output.code);

        let imports = graph::scan_imports(&code);
        let mut resolved = HashMap::new();
        for import in &imports {
            if !resolved.contains_key(&import.specifier) {
                let target = self.resolver.resolve(&import.specifier, id)?;
                resolved.insert(import.specifier.clone(), target);
            }
        }

        Ok(Module {
            id: id.to_string(),
            category: classification.category(),
            source,
            code,
            css: output.css.clone(),
            declaration: output.declaration.clone(),
            tokens: output.tokens.clone(),
            imports,
            resolved,
        })
    }

    fn transform_cached(
        &self,
        id: &str,
        source: &str,
        classification: Classification<'_>,
    ) -> Result<Arc<ModuleOutput>, CompileError> {
        let hash = pagekit_util::hash::blake3_parts(&[id.as_bytes(), source.as_bytes()])
            .to_hex()
            .to_string();

        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .filter(|cached| cached.hash == hash)
        {
            return Ok(Arc::clone(&cached.output));
        }

        let ctx = TransformContext {
            root: &self.graph.root,
            backend: self.backend.as_ref(),
            plugins: &self.plugins,
        };
        let output = Arc::new(transform::transform_module(&ctx, id, source, classification)?);
        tracing::debug!(module = id, "transformed");

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id.to_string(),
                CachedModule {
                    hash,
                    output: Arc::clone(&output),
                },
            );
        Ok(output)
    }

    /// Drop cache entries for modules no longer in the graph.
    fn prune_cache(&self, modules: &ModuleGraph) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|id, _| modules.contains(id));
    }

    fn emit_chunk(
        &self,
        modules: &ModuleGraph,
        chunk: &Chunk,
        artifacts: &mut ArtifactSet,
    ) -> Result<(), CompileError> {
        let output = &self.graph.output;
        let optimization = &self.graph.optimization;
        let file = output.chunk_file(&chunk.name);

        let RenderedChunk { code, mut map } = emit::render_chunk(modules, chunk, self.emit);
        let info = ChunkInfo {
            name: chunk.name.clone(),
            is_entry: chunk.is_entry(),
            modules: chunk.modules.clone(),
        };
        let mut code = self
            .plugins
            .render_chunk(&code, &info)
            .map_err(|e| CompileError::from(e).with_path(file.as_str()))?;

        if optimization.minimize && optimization.minimizers.contains(&Minimizer::Script) {
            code = self.backend.minify(&code).map_err(|e| {
                CompileError::transform(codes::TRANSFORM_MINIFY_FAILED, e.to_string())
                    .with_path(file.as_str())
            })?;
            // Line mappings do not survive minification.
            map.clear_mappings();
        }

        if !code.is_empty() && !code.ends_with('\n') {
            code.push('\n');
        }
        match self.graph.source_maps {
            SourceMapKind::None => {}
            SourceMapKind::Inline => code.push_str(&sourcemap::inline_comment(&map.generate(&file))),
            SourceMapKind::External => {
                let map_file = output.map_file(&file);
                artifacts
                    .files
                    .insert(map_file.clone(), Artifact::for_file(&map_file, map.generate(&file)));
                code.push_str(&sourcemap::external_comment(&map_file));
            }
        }

        let styles: Vec<&str> = chunk
            .modules
            .iter()
            .filter_map(|id| modules.get(id).and_then(|m| m.css.as_deref()))
            .collect();
        if !styles.is_empty() {
            let style_file = output.style_file(&chunk.name);
            let stylesheet = self.minimize_styles(styles.join("\n"), &style_file)?;
            artifacts
                .files
                .insert(style_file.clone(), Artifact::for_file(&style_file, stylesheet));
        }

        artifacts.chunks.push(ChunkArtifact {
            name: chunk.name.clone(),
            file: file.clone(),
            hash: pagekit_util::hash::blake3_bytes(code.as_bytes()),
            modules: chunk.modules.clone(),
        });
        artifacts.files.insert(file.clone(), Artifact::for_file(&file, code));
        Ok(())
    }

    /// Run the declared stylesheet minimizers, in order.
    fn minimize_styles(&self, mut stylesheet: String, file: &str) -> Result<String, CompileError> {
        let optimization = &self.graph.optimization;
        if !optimization.minimize {
            return Ok(stylesheet);
        }
        for minimizer in &optimization.minimizers {
            let targets = match minimizer {
                Minimizer::Script => continue,
                Minimizer::CssOptimize => None,
                Minimizer::CssMinimize => Some(css::default_browser_targets()),
            };
            stylesheet = css::minify_css(&stylesheet, targets).map_err(|e| {
                CompileError::transform(codes::TRANSFORM_MINIFY_FAILED, e.to_string())
                    .with_path(file)
            })?;
        }
        Ok(stylesheet)
    }
}

/// Fail when two modules declare the same scoped token.
fn check_token_collisions(modules: &ModuleGraph) -> Result<(), CompileError> {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for module in modules.iter() {
        for token in module.tokens.values() {
            if let Some(owner) = owners.insert(token, &module.id) {
                if owner != module.id {
                    return Err(CompileError::transform(
                        codes::TRANSFORM_TOKEN_COLLISION,
                        format!("scoped token '{token}' is also declared by {owner}"),
                    )
                    .with_path(module.id.as_str()));
                }
            }
        }
    }
    Ok(())
}

/// Root-relative paths of the declaration files in `artifacts`, made absolute.
#[must_use]
pub fn declaration_targets(root: &Path, artifacts: &ArtifactSet) -> Vec<(PathBuf, String)> {
    artifacts
        .declarations
        .iter()
        .map(|(path, content)| (root.join(path), content.clone()))
        .collect()
}

/// Write the declaration files of `artifacts` next to their stylesheets.
/// Files whose content is unchanged are not touched. Returns how many were
/// written.
pub fn write_declarations(root: &Path, artifacts: &ArtifactSet) -> io::Result<usize> {
    let mut written = 0;
    for (path, content) in declaration_targets(root, artifacts) {
        if write_if_changed(&path, content.as_bytes())? {
            written += 1;
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::SwcBackend;
    use crate::config::Mode;
    use std::fs;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/components")).unwrap();
        fs::create_dir_all(root.join("public/css")).unwrap();
        fs::write(
            root.join("public/index.html"),
            "<!DOCTYPE html>\n<html>\n<head><title>app</title></head>\n<body>\n<div id=\"root\"></div>\n</body>\n</html>\n",
        )
        .unwrap();
        fs::write(root.join("public/css/_vars.scss"), "$brand: #336699;\n").unwrap();
        fs::write(
            root.join("src/index.tsx"),
            "import styles from './App.module.scss';\nimport './main.scss';\nimport { label } from './components/label';\n\ndocument.body.className = styles.app;\nconsole.log(label(VERSION));\n",
        )
        .unwrap();
        fs::write(root.join("src/App.module.scss"), ".app { color: red; }\n").unwrap();
        fs::write(root.join("src/main.scss"), "@import 'vars';\nbody { color: $brand; }\n").unwrap();
        fs::write(
            root.join("src/components/label.ts"),
            "export function label(v: string): string {\n  return 'v' + v;\n}\n",
        )
        .unwrap();
        dir
    }

    fn compiler(root: &Path, mode: Mode) -> Compiler {
        let config = ModeConfig::new(mode, root).with_port(3111);
        Compiler::from_config(&config, Arc::new(SwcBackend::new())).unwrap()
    }

    fn text(artifacts: &ArtifactSet, name: &str) -> String {
        String::from_utf8(artifacts.get(name).unwrap().bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_development_build() {
        let dir = project();
        let artifacts = compiler(dir.path(), Mode::Development).compile().unwrap();

        let bundle = text(&artifacts, "main-bundle.js");
        assert!(bundle.contains("__pagekit.define(\"src/index.tsx\""));
        assert!(bundle.contains("__pagekit.define(\"pagekit:hot-client?reload=true\""));
        assert!(bundle.contains("__pagekit.define(\"src/components/label.ts\""));
        assert!(bundle.contains("App-module__app--"));
        assert!(bundle.contains("\"5fa3b9\""));
        assert!(bundle.contains("sourceMappingURL=data:application/json"));
        assert!(!artifacts.contains("main.css"));

        let html = text(&artifacts, "index.html");
        assert!(html.contains("<script src=\"/main-bundle.js\"></script>"));
        assert!(artifacts.contains("stats.json"));
        assert!(artifacts
            .declarations
            .contains_key(Path::new("src/App.module.scss.d.ts")));
    }

    #[test]
    fn test_production_build() {
        let dir = project();
        let artifacts = compiler(dir.path(), Mode::Production).compile().unwrap();

        let bundle = text(&artifacts, "main-bundle.js");
        assert!(!bundle.contains("hot-client"));
        let css = text(&artifacts, "main.css");
        assert!(css.contains("App-module__app--"));
        assert!(css.contains("#369"));

        let html = text(&artifacts, "index.html");
        assert!(html.contains("<link rel=\"stylesheet\" href=\"/main.css\">"));
        assert!(artifacts.contains("main-bundle.js.gz"));
        assert!(artifacts.contains("main-bundle.js.br"));
        assert!(!artifacts.contains("stats.json"));
    }

    #[test]
    fn test_builds_are_deterministic() {
        let dir = project();
        let a = compiler(dir.path(), Mode::Production).compile().unwrap();
        let b = compiler(dir.path(), Mode::Production).compile().unwrap();
        assert_eq!(a.files, b.files);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_rebuild_reuses_unchanged_modules() {
        let dir = project();
        let compiler = compiler(dir.path(), Mode::Development);
        let first = compiler.compile().unwrap();
        let cached = compiler.cached_modules();
        assert!(cached >= 5);

        fs::write(dir.path().join("src/App.module.scss"), ".app { color: blue; }\n").unwrap();
        let second = compiler.compile().unwrap();
        assert_eq!(compiler.cached_modules(), cached);
        assert_ne!(first.hash, second.hash);
        assert_eq!(second.changed_chunks(&first), vec!["main".to_string()]);

        let old_token = first_token(&first);
        let new_token = first_token(&second);
        assert_ne!(old_token, new_token);
    }

    fn first_token(artifacts: &ArtifactSet) -> String {
        let bundle = text(artifacts, "main-bundle.js");
        let start = bundle.find("App-module__app--").unwrap();
        bundle[start..start + "App-module__app--".len() + 5].to_string()
    }

    #[test]
    fn test_unresolved_import_is_transform_error() {
        let dir = project();
        fs::write(dir.path().join("src/index.tsx"), "import './missing';\n").unwrap();
        let err = compiler(dir.path(), Mode::Development).compile().unwrap_err();
        assert_eq!(err.code(), codes::TRANSFORM_UNRESOLVED_IMPORT);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_package_imports_are_bundled() {
        let dir = project();
        let root = dir.path();
        let react = root.join("node_modules/react");
        fs::create_dir_all(react.join("cjs")).unwrap();
        fs::write(react.join("package.json"), r#"{"name":"react","main":"index.js"}"#).unwrap();
        fs::write(
            react.join("index.js"),
            "'use strict';\nif (process.env.NODE_ENV === 'production') {\n  module.exports = require('./cjs/react.production.js');\n} else {\n  module.exports = require('./cjs/react.development.js');\n}\n",
        )
        .unwrap();
        fs::write(react.join("cjs/react.production.js"), "exports.mode = 'prod';\n").unwrap();
        fs::write(react.join("cjs/react.development.js"), "exports.mode = 'dev';\n").unwrap();
        fs::write(
            root.join("src/index.tsx"),
            "import React from 'react';\nconsole.log(React.mode);\n",
        )
        .unwrap();

        let artifacts = compiler(root, Mode::Development).compile().unwrap();
        let bundle = text(&artifacts, "main-bundle.js");
        assert!(bundle.contains("__pagekit.define(\"node_modules/react/index.js\""));
        assert!(bundle.contains("__pagekit.define(\"node_modules/react/cjs/react.development.js\""));
        assert!(bundle.contains("require.interop(require(\"node_modules/react/index.js\"))"));
        assert!(bundle.contains("module.exports = require(\"node_modules/react/cjs/react.development.js\");"));
        assert!(bundle.contains("if (\"development\" === 'production')"));
        assert!(!bundle.contains("process.env.NODE_ENV"));
    }

    #[test]
    fn test_missing_package_is_transform_error() {
        let dir = project();
        fs::write(dir.path().join("src/index.tsx"), "import React from 'react';\n").unwrap();
        let err = compiler(dir.path(), Mode::Development).compile().unwrap_err();
        assert_eq!(err.code(), codes::TRANSFORM_UNRESOLVED_IMPORT);
        assert!(err.describe().contains("react"));
    }

    #[test]
    fn test_multi_line_imports_are_bundled() {
        let dir = project();
        fs::write(
            dir.path().join("src/components/label.ts"),
            "export function label(v: string): string {\n  return 'v' + v;\n}\nexport function shout(v: string): string {\n  return v + '!';\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("src/index.tsx"),
            "import {\n  label,\n  shout,\n} from './components/label';\nconsole.log(shout(label(VERSION)));\n",
        )
        .unwrap();

        let artifacts = compiler(dir.path(), Mode::Development).compile().unwrap();
        let bundle = text(&artifacts, "main-bundle.js");
        assert!(bundle.contains("__pagekit.define(\"src/components/label.ts\""));
        assert!(bundle.contains("const { label, shout, } = require(\"src/components/label.ts\");"));
    }

    #[test]
    fn test_same_local_name_in_two_files_gets_distinct_tokens() {
        let dir = project();
        let root = dir.path();
        fs::create_dir_all(root.join("src/a")).unwrap();
        fs::create_dir_all(root.join("src/b")).unwrap();
        fs::write(root.join("src/a/App.module.scss"), ".app { color: red; }\n").unwrap();
        fs::write(root.join("src/b/App.module.scss"), ".app { color: red; }\n").unwrap();
        fs::write(
            root.join("src/index.tsx"),
            "import a from './a/App.module.scss';\nimport b from './b/App.module.scss';\nconsole.log(a.app, b.app);\n",
        )
        .unwrap();

        let compiler = compiler(root, Mode::Production);
        let entries = compiler.resolve_entries().unwrap();
        let modules = compiler.build_module_graph(&entries).unwrap();
        let a = &modules.get("src/a/App.module.scss").unwrap().tokens["app"];
        let b = &modules.get("src/b/App.module.scss").unwrap().tokens["app"];
        assert!(a.starts_with("App-module__app--"));
        assert!(b.starts_with("App-module__app--"));
        assert_ne!(a, b);

        let css = text(&compiler.compile().unwrap(), "main.css");
        assert!(css.contains(a.as_str()));
        assert!(css.contains(b.as_str()));
    }

    #[test]
    fn test_write_declarations_skips_unchanged() {
        let dir = project();
        let compiler = compiler(dir.path(), Mode::Development);
        let artifacts = compiler.compile().unwrap();
        let path = dir.path().join("src/App.module.scss.d.ts");

        assert_eq!(write_declarations(compiler.root(), &artifacts).unwrap(), 1);
        assert!(fs::read_to_string(&path).unwrap().contains("'app': string;"));
        assert_eq!(write_declarations(compiler.root(), &artifacts).unwrap(), 0);
    }

    fn scoped_module(id: &str, token: &str) -> Module {
        Module {
            id: id.to_string(),
            category: pipeline::FileCategory::ScopedStyle,
            source: String::new(),
            code: String::new(),
            css: None,
            declaration: None,
            tokens: BTreeMap::from([("app".to_string(), token.to_string())]),
            imports: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    #[test]
    fn test_token_collision_is_transform_error() {
        let mut modules = ModuleGraph::new();
        modules.add(scoped_module("src/a/App.module.scss", "App-module__app--x1y2z"));
        modules.add(scoped_module("src/b/App.module.scss", "App-module__app--x1y2z"));

        let err = check_token_collisions(&modules).unwrap_err();
        assert_eq!(err.code(), codes::TRANSFORM_TOKEN_COLLISION);
        assert!(err.describe().contains("src/b/App.module.scss"));
        assert!(err.describe().contains("also declared by src/a/App.module.scss"));
    }

    #[test]
    fn test_distinct_tokens_pass_collision_check() {
        let mut modules = ModuleGraph::new();
        modules.add(scoped_module("src/a/App.module.scss", "App-module__app--aaaaa"));
        modules.add(scoped_module("src/b/App.module.scss", "App-module__app--bbbbb"));
        assert!(check_token_collisions(&modules).is_ok());
    }

    #[test]
    fn test_unclassified_import_is_fatal() {
        let dir = project();
        fs::write(dir.path().join("src/data.yaml"), "a: 1\n").unwrap();
        fs::write(dir.path().join("src/index.tsx"), "import './data.yaml';\n").unwrap();
        let err = compiler(dir.path(), Mode::Development).compile().unwrap_err();
        assert_eq!(err.code(), codes::CONFIG_UNCLASSIFIED_FILE);
        assert!(err.is_fatal());
    }
}
