//! Per-module transformation: runs a module through its chain.

use super::plugin::PluginContainer;
use crate::codes;
use crate::compiler::{CompilerBackend, JsxRuntime, TranspileSpec};
use crate::css::{self, scoped, typings, CssOptions};
use crate::env::json_string;
use crate::error::CompileError;
use crate::pipeline::{Classification, Stage};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Result of running one module through its chain.
#[derive(Debug, Clone, Default)]
pub struct ModuleOutput {
    /// Script code for the bundle.
    pub code: String,
    /// Stylesheet to extract, when the chain ends with extraction.
    pub css: Option<String>,
    /// Declaration file path (root-relative) and content.
    pub declaration: Option<(PathBuf, String)>,
    /// Scoped tokens: local name to token.
    pub tokens: BTreeMap<String, String>,
}

/// What the transformer needs besides the module itself.
pub struct TransformContext<'a> {
    pub root: &'a Path,
    pub backend: &'a dyn CompilerBackend,
    pub plugins: &'a PluginContainer,
}

/// Transform the module `id` with the given source.
pub fn transform_module(
    ctx: &TransformContext<'_>,
    id: &str,
    source: &str,
    classification: Classification<'_>,
) -> Result<ModuleOutput, CompileError> {
    let mut output = ModuleOutput::default();
    let mut text = source.to_string();
    let mut classes: BTreeMap<String, String> = BTreeMap::new();
    let mut script: Option<String> = None;

    let stages = classification.stages();
    for stage in stages.iter().rev() {
        match stage {
            Stage::Sass { include_paths } => {
                if css::sass::is_sass_file(Path::new(id)) {
                    let options = css::sass::SassOptions {
                        include_paths: include_paths.iter().map(|p| ctx.root.join(p)).collect(),
                        minify: false,
                        filename: Some(ctx.root.join(id)),
                    };
                    text = css::sass::compile_sass(&text, &options).map_err(|e| {
                        CompileError::transform(codes::TRANSFORM_SASS_FAILED, e.to_string())
                            .with_path(id)
                    })?;
                }
            }
            Stage::Css { modules } => {
                let options = CssOptions {
                    css_modules: *modules,
                    filename: Some(id.to_string()),
                    ..CssOptions::default()
                };
                let result = css::process_css(&text, &options).map_err(|e| {
                    CompileError::transform(codes::TRANSFORM_CSS_FAILED, e.to_string())
                        .with_path(id)
                })?;
                if *modules {
                    let scoped = scoped::scope_stylesheet(id, source, &result.code, &result.exports);
                    text = scoped.code;
                    classes = scoped.classes;
                    output.tokens = scoped.tokens;
                } else {
                    text = result.code;
                }
            }
            Stage::Typings => {
                output.declaration = Some((
                    typings::declaration_path(Path::new(id)),
                    typings::generate_declaration(&classes),
                ));
            }
            Stage::InjectStyle => {
                script = Some(css::style_inject_module(id, &text, &classes));
            }
            Stage::ExtractStyle => {
                script = Some(css::style_export_module(&classes));
                output.css = Some(text.clone());
            }
            Stage::Transpile => {
                let spec = TranspileSpec::new(id).with_jsx_runtime(JsxRuntime::Classic);
                let transpiled = ctx.backend.transpile(&spec, &text).map_err(|e| {
                    CompileError::transform(codes::TRANSFORM_SCRIPT_FAILED, e.to_string())
                        .with_path(id)
                })?;
                text = transpiled.code;
                script = Some(text.clone());
            }
            Stage::Html => {
                script = Some(format!("export default {};\n", json_string(&text)));
            }
        }
    }

    // Passthrough modules and chains without a script-producing stage are
    // bundled as written.
    let code = script.unwrap_or(text);
    output.code = ctx
        .plugins
        .transform(&code, id)
        .map_err(|e| CompileError::from(e).with_path(id))?;

    Ok(output)
}
