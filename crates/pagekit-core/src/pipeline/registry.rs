//! Transformation-chain registry.
//!
//! Maps a file category to the ordered list of stages its files pass
//! through. Chains are stored in declaration order (outermost stage first);
//! [`TransformChain::execution_order`] yields the order stages actually run.

use super::policy::ModePolicy;
use crate::config::Mode;
use crate::error::ConfigError;
use regex_lite::Regex;
use serde::Serialize;
use std::path::Path;

/// Include path handed to the Sass engine for global stylesheets.
pub const GLOBAL_STYLE_INCLUDE_PATH: &str = "public/css";

/// Category of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileCategory {
    Markup,
    Script,
    GlobalStyle,
    ScopedStyle,
}

impl FileCategory {
    pub const ALL: [Self; 4] = [
        Self::Markup,
        Self::Script,
        Self::GlobalStyle,
        Self::ScopedStyle,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markup => "markup",
            Self::Script => "script",
            Self::GlobalStyle => "global-style",
            Self::ScopedStyle => "scoped-style",
        }
    }

    #[must_use]
    pub fn is_style(&self) -> bool {
        matches!(self, Self::GlobalStyle | Self::ScopedStyle)
    }
}

/// One transformation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "kebab-case")]
pub enum Stage {
    /// Export markup as a string module.
    Html,
    /// Transpile TypeScript/JSX to plain JavaScript.
    Transpile,
    /// Preprocess Sass to CSS.
    Sass { include_paths: Vec<String> },
    /// Convert CSS; with `modules`, rewrite local class names to scoped tokens.
    Css { modules: bool },
    /// Emit a TypeScript declaration for the scoped class names.
    Typings,
    /// Inject the stylesheet at runtime.
    InjectStyle,
    /// Extract the stylesheet into the chunk's standalone stylesheet.
    ExtractStyle,
}

impl Stage {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Transpile => "transpile",
            Self::Sass { .. } => "sass",
            Self::Css { .. } => "css",
            Self::Typings => "css-typings",
            Self::InjectStyle => "style-inject",
            Self::ExtractStyle => "style-extract",
        }
    }
}

/// Ordered, immutable list of stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransformChain(Vec<Stage>);

impl TransformChain {
    #[must_use]
    pub fn new(stages: Vec<Stage>) -> Self {
        Self(stages)
    }

    /// Stages in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.0
    }

    /// Stages in the order they run: innermost (last declared) first.
    pub fn execution_order(&self) -> impl Iterator<Item = &Stage> {
        self.0.iter().rev()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(Stage::name).collect()
    }
}

/// Contract of the registry: the chain for `category` in `mode`.
#[must_use]
pub fn chain_for(category: FileCategory, mode: Mode) -> TransformChain {
    let style = ModePolicy::for_mode(mode).style_handling.stage();
    let stages = match category {
        FileCategory::Markup => vec![Stage::Html],
        FileCategory::Script => vec![Stage::Transpile],
        FileCategory::GlobalStyle => vec![
            style,
            Stage::Css { modules: false },
            Stage::Sass {
                include_paths: vec![GLOBAL_STYLE_INCLUDE_PATH.to_string()],
            },
        ],
        FileCategory::ScopedStyle => vec![
            style,
            Stage::Typings,
            Stage::Css { modules: true },
            Stage::Sass {
                include_paths: Vec::new(),
            },
        ],
    };
    TransformChain::new(stages)
}

/// File patterns per category. Global styles exclude scoped ones so the two
/// never claim the same file.
const RULE_TABLE: [(FileCategory, &str, Option<&str>); 4] = [
    (FileCategory::Markup, r"\.html$", None),
    (
        FileCategory::Script,
        r"\.(js|ts|tsx|jsx)$",
        Some(r"(^|/)node_modules/"),
    ),
    (
        FileCategory::GlobalStyle,
        r"\.s?css$",
        Some(r"\.module\.(s(a|c)ss)$"),
    ),
    (FileCategory::ScopedStyle, r"\.module\.s(a|c)ss$", None),
];

/// A file pattern bound to a chain.
#[derive(Debug, Clone, Serialize)]
pub struct TransformRule {
    pub category: FileCategory,
    pub test: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<&'static str>,
    pub chain: TransformChain,
    #[serde(skip)]
    test_re: Regex,
    #[serde(skip)]
    exclude_re: Option<Regex>,
}

impl TransformRule {
    fn new(
        category: FileCategory,
        test: &'static str,
        exclude: Option<&'static str>,
        chain: TransformChain,
    ) -> Result<Self, ConfigError> {
        let compile = |pattern: &'static str| {
            Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern,
                message: e.to_string(),
            })
        };
        Ok(Self {
            category,
            test,
            exclude,
            chain,
            test_re: compile(test)?,
            exclude_re: exclude.map(compile).transpose()?,
        })
    }

    /// Whether this rule claims `path` (forward slashes, relative to the root).
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.test_re.is_match(path)
            && !self.exclude_re.as_ref().is_some_and(|re| re.is_match(path))
    }
}

/// Instantiate the rule table for `mode`.
pub fn rules_for(mode: Mode) -> Result<Vec<TransformRule>, ConfigError> {
    RULE_TABLE
        .iter()
        .map(|&(category, test, exclude)| {
            TransformRule::new(category, test, exclude, chain_for(category, mode))
        })
        .collect()
}

/// Outcome of classifying one file.
#[derive(Debug, Clone, Copy)]
pub enum Classification<'a> {
    Rule(&'a TransformRule),
    /// Script inside the dependency directory: bundled untouched.
    Passthrough,
}

impl Classification<'_> {
    #[must_use]
    pub fn category(&self) -> FileCategory {
        match self {
            Self::Rule(rule) => rule.category,
            Self::Passthrough => FileCategory::Script,
        }
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        match self {
            Self::Rule(rule) => rule.chain.stages(),
            Self::Passthrough => &[],
        }
    }
}

/// Normalize a root-relative path for pattern matching.
#[must_use]
pub fn match_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Find the single rule claiming `path`.
pub fn classify<'a>(
    rules: &'a [TransformRule],
    path: &Path,
) -> Result<Classification<'a>, ConfigError> {
    let normalized = match_path(path);
    let mut matching = rules.iter().filter(|rule| rule.matches(&normalized));

    match (matching.next(), matching.next()) {
        (Some(first), Some(second)) => Err(ConfigError::OverlappingRules {
            path: path.to_path_buf(),
            first: first.category.as_str(),
            second: second.category.as_str(),
        }),
        (Some(rule), None) => Ok(Classification::Rule(rule)),
        (None, _) if is_dependency_script(&normalized) => Ok(Classification::Passthrough),
        (None, _) => Err(ConfigError::UnclassifiedFile(path.to_path_buf())),
    }
}

fn is_dependency_script(path: &str) -> bool {
    (path.starts_with("node_modules/") || path.contains("/node_modules/"))
        && [".js", ".mjs", ".cjs"].iter().any(|ext| path.ends_with(ext))
}

/// Representative file names and the category each must land in.
pub const SAMPLE_FILES: &[(&str, FileCategory)] = &[
    ("public/index.html", FileCategory::Markup),
    ("src/index.tsx", FileCategory::Script),
    ("src/util.ts", FileCategory::Script),
    ("src/legacy.js", FileCategory::Script),
    ("src/Widget.jsx", FileCategory::Script),
    ("src/styles/main.scss", FileCategory::GlobalStyle),
    ("src/styles/reset.css", FileCategory::GlobalStyle),
    ("src/App.module.scss", FileCategory::ScopedStyle),
    ("src/App.module.sass", FileCategory::ScopedStyle),
];

/// Check that the rules are mutually exclusive and cover every sample file.
pub fn validate(rules: &[TransformRule]) -> Result<(), ConfigError> {
    for &(file, expected) in SAMPLE_FILES {
        let classification = classify(rules, Path::new(file))?;
        if classification.category() != expected {
            return Err(ConfigError::OverlappingRules {
                path: file.into(),
                first: expected.as_str(),
                second: classification.category().as_str(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(mode: Mode) -> Vec<TransformRule> {
        rules_for(mode).unwrap()
    }

    #[test]
    fn test_rules_are_mutually_exclusive() {
        validate(&rules(Mode::Development)).unwrap();
        validate(&rules(Mode::Production)).unwrap();
    }

    #[test]
    fn test_scoped_style_is_not_global() {
        let rules = rules(Mode::Development);
        let c = classify(&rules, Path::new("src/components/Button.module.scss")).unwrap();
        assert_eq!(c.category(), FileCategory::ScopedStyle);
    }

    #[test]
    fn test_unknown_file_is_config_error() {
        let rules = rules(Mode::Production);
        let err = classify(&rules, Path::new("src/logo.png")).unwrap_err();
        assert!(matches!(err, ConfigError::UnclassifiedFile(_)));
    }

    #[test]
    fn test_dependency_scripts_pass_through() {
        let rules = rules(Mode::Development);
        let c = classify(&rules, Path::new("node_modules/lib/index.js")).unwrap();
        assert!(matches!(c, Classification::Passthrough));
        assert!(c.stages().is_empty());
    }

    #[test]
    fn test_chain_declaration_and_execution_order() {
        let chain = chain_for(FileCategory::ScopedStyle, Mode::Development);
        assert_eq!(
            chain.names(),
            vec!["style-inject", "css-typings", "css", "sass"]
        );
        let run: Vec<_> = chain.execution_order().map(Stage::name).collect();
        assert_eq!(run, vec!["sass", "css", "css-typings", "style-inject"]);
    }

    #[test]
    fn test_only_style_finisher_depends_on_mode() {
        for category in FileCategory::ALL {
            let dev = chain_for(category, Mode::Development);
            let prod = chain_for(category, Mode::Production);
            if category.is_style() {
                assert_eq!(dev.stages()[0], Stage::InjectStyle);
                assert_eq!(prod.stages()[0], Stage::ExtractStyle);
                assert_eq!(dev.stages()[1..], prod.stages()[1..]);
            } else {
                assert_eq!(dev, prod);
            }
        }
    }

    #[test]
    fn test_global_styles_get_include_path() {
        let chain = chain_for(FileCategory::GlobalStyle, Mode::Production);
        assert!(chain.stages().contains(&Stage::Sass {
            include_paths: vec!["public/css".to_string()]
        }));
    }
}
