//! Stylesheet processing: Sass preprocessing with grass, CSS conversion,
//! scoping and minification with lightningcss.

pub mod sass;
pub mod scoped;
pub mod typings;

use lightningcss::css_modules::CssModuleReference;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::collections::BTreeMap;

/// CSS processing options.
#[derive(Debug, Clone, Default)]
pub struct CssOptions {
    /// Enable minification.
    pub minify: bool,
    /// Enable CSS Modules (returns class name mappings).
    pub css_modules: bool,
    /// Enable vendor prefixing for the browser targets.
    pub autoprefixer: bool,
    /// Source file path, for error messages.
    pub filename: Option<String>,
    /// Browser targets (defaults to [`default_browser_targets`]).
    pub targets: Option<Browsers>,
}

/// Result of CSS processing.
#[derive(Debug, Clone, Default)]
pub struct CssResult {
    /// The transformed CSS code.
    pub code: String,
    /// CSS Modules exports: local name to the engine-generated class list.
    /// Only populated if `css_modules` is enabled.
    pub exports: BTreeMap<String, CssExport>,
}

/// One exported local name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CssExport {
    /// Generated name of the local itself.
    pub name: String,
    /// Generated names of locals it composes.
    pub composes_local: Vec<String>,
    /// Global names it composes.
    pub composes_global: Vec<String>,
}

/// Process CSS with lightningcss.
pub fn process_css(source: &str, options: &CssOptions) -> Result<CssResult, CssError> {
    let filename = options.filename.as_deref().unwrap_or("input.css");

    let mut parser_options = ParserOptions::default();
    if options.css_modules {
        parser_options.css_modules = Some(lightningcss::css_modules::Config {
            pattern: lightningcss::css_modules::Pattern::parse("[hash]_[local]")
                .map_err(|e| CssError::Parse(format!("CSS Modules pattern error: {e}")))?,
            dashed_idents: false,
            animation: Default::default(),
            grid: Default::default(),
            container: Default::default(),
            custom_idents: Default::default(),
            pure: false,
        });
    }

    let mut stylesheet = StyleSheet::parse(source, parser_options)
        .map_err(|e| CssError::Parse(format!("{filename}: {e}")))?;

    let targets = if options.autoprefixer {
        options.targets.unwrap_or_else(default_browser_targets)
    } else {
        Browsers::default()
    };

    if options.minify || options.autoprefixer {
        stylesheet
            .minify(MinifyOptions {
                targets: Targets::from(targets),
                ..Default::default()
            })
            .map_err(|e| CssError::Transform(format!("{filename}: {e}")))?;
    }

    let printer_options = PrinterOptions {
        minify: options.minify,
        targets: Targets::from(targets),
        ..Default::default()
    };

    let output = stylesheet
        .to_css(printer_options)
        .map_err(|e| CssError::Print(format!("{filename}: {e}")))?;

    let exports = if options.css_modules {
        output
            .exports
            .map(|exports| {
                exports
                    .iter()
                    .map(|(local, export)| {
                        let mut entry = CssExport {
                            name: export.name.to_string(),
                            ..CssExport::default()
                        };
                        for reference in &export.composes {
                            match reference {
                                CssModuleReference::Local { name } => {
                                    entry.composes_local.push(name.to_string());
                                }
                                CssModuleReference::Global { name } => {
                                    entry.composes_global.push(name.to_string());
                                }
                                CssModuleReference::Dependency { .. } => {}
                            }
                        }
                        (local.to_string(), entry)
                    })
                    .collect()
            })
            .unwrap_or_default()
    } else {
        BTreeMap::new()
    };

    Ok(CssResult {
        code: output.code,
        exports,
    })
}

/// Minify an emitted stylesheet. With `targets`, vendor prefixes for those
/// browsers are applied as well.
pub fn minify_css(code: &str, targets: Option<Browsers>) -> Result<String, CssError> {
    let options = CssOptions {
        minify: true,
        css_modules: false,
        autoprefixer: targets.is_some(),
        filename: None,
        targets,
    };
    process_css(code, &options).map(|result| result.code)
}

/// Default browser targets: Chrome 80+, Firefox 75+, Safari 13+, Edge 80+.
#[must_use]
pub fn default_browser_targets() -> Browsers {
    Browsers {
        chrome: Some(80 << 16),
        firefox: Some(75 << 16),
        safari: Some(13 << 16),
        edge: Some(80 << 16),
        ..Default::default()
    }
}

/// Script module that injects `css` into the document at runtime and exports
/// the class name mapping.
#[must_use]
pub fn style_inject_module(id: &str, css: &str, classes: &BTreeMap<String, String>) -> String {
    let css_literal = serde_json::Value::String(css.to_string()).to_string();
    let id_literal = serde_json::Value::String(id.to_string()).to_string();
    format!(
        r#"var css = {css_literal};
var style = document.createElement("style");
style.setAttribute("data-pagekit-style", {id_literal});
style.textContent = css;
document.head.appendChild(style);
if (module.hot) {{
  module.hot.dispose(function () {{ style.remove(); }});
}}
export default {classes};
"#,
        classes = classes_literal(classes),
    )
}

/// Script module for an extracted stylesheet: only the class name mapping.
#[must_use]
pub fn style_export_module(classes: &BTreeMap<String, String>) -> String {
    format!("export default {};\n", classes_literal(classes))
}

fn classes_literal(classes: &BTreeMap<String, String>) -> String {
    serde_json::to_string(classes).unwrap_or_else(|_| "{}".to_string())
}

/// CSS processing error.
#[derive(Debug)]
pub enum CssError {
    Parse(String),
    Transform(String),
    Print(String),
}

impl std::fmt::Display for CssError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CssError::Parse(msg) => write!(f, "CSS parse error: {msg}"),
            CssError::Transform(msg) => write!(f, "CSS transform error: {msg}"),
            CssError::Print(msg) => write!(f, "CSS print error: {msg}"),
        }
    }
}

impl std::error::Error for CssError {}
