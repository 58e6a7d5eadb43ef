//! Sass/SCSS preprocessing using grass.

use std::path::{Path, PathBuf};

/// Sass compilation options.
#[derive(Debug, Clone, Default)]
pub struct SassOptions {
    /// Extra directories searched by `@import`/`@use`.
    pub include_paths: Vec<PathBuf>,
    /// Output style (expanded or compressed).
    pub minify: bool,
    /// Source file path (for error messages and relative imports).
    pub filename: Option<PathBuf>,
}

/// Compile Sass/SCSS to CSS.
///
/// `.sass` files are parsed with the indented syntax, everything else as SCSS.
/// The directory of `filename` is always searched for relative imports.
pub fn compile_sass(source: &str, options: &SassOptions) -> Result<String, SassError> {
    let mut grass_options = grass::Options::default().style(if options.minify {
        grass::OutputStyle::Compressed
    } else {
        grass::OutputStyle::Expanded
    });

    if options.filename.as_deref().is_some_and(is_indented_syntax) {
        grass_options = grass_options.input_syntax(grass::InputSyntax::Sass);
    }

    for path in &options.include_paths {
        grass_options = grass_options.load_path(path);
    }

    if let Some(parent) = options.filename.as_deref().and_then(Path::parent) {
        grass_options = grass_options.load_path(parent);
    }

    grass::from_string(source.to_string(), &grass_options).map_err(|e| {
        let name = options
            .filename
            .as_deref()
            .map_or_else(|| "input.scss".to_string(), |p| p.display().to_string());
        SassError::Compile(format!("{name}: {e}"))
    })
}

fn is_indented_syntax(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sass"))
}

/// Check if a file is a Sass/SCSS file.
#[must_use]
pub fn is_sass_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "scss" || e == "sass")
}

/// Sass compilation error.
#[derive(Debug)]
pub enum SassError {
    Compile(String),
}

impl std::fmt::Display for SassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SassError::Compile(msg) => write!(f, "Sass compile error: {msg}"),
        }
    }
}

impl std::error::Error for SassError {}
