//! Type declarations for scoped stylesheets.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Declaration file path for a scoped stylesheet (`App.module.scss.d.ts`).
#[must_use]
pub fn declaration_path(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_os_string();
    name.push(".d.ts");
    PathBuf::from(name)
}

/// Whether `path` is a generated declaration file.
#[must_use]
pub fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".d.ts"))
}

/// Declaration text listing every exported local name, in sorted order.
#[must_use]
pub fn generate_declaration(classes: &BTreeMap<String, String>) -> String {
    let mut out = String::from("interface CssExports {\n");
    for name in classes.keys() {
        out.push_str("  '");
        out.push_str(&name.replace('\\', "\\\\").replace('\'', "\\'"));
        out.push_str("': string;\n");
    }
    out.push_str("}\nexport const cssExports: CssExports;\nexport default cssExports;\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_path() {
        assert_eq!(
            declaration_path(Path::new("src/App.module.scss")),
            PathBuf::from("src/App.module.scss.d.ts")
        );
    }

    #[test]
    fn test_is_declaration_file() {
        assert!(is_declaration_file(Path::new("src/App.module.scss.d.ts")));
        assert!(!is_declaration_file(Path::new("src/App.tsx")));
    }

    #[test]
    fn test_generate_declaration() {
        let mut classes = BTreeMap::new();
        classes.insert("title".to_string(), "t".to_string());
        classes.insert("app".to_string(), "a".to_string());

        assert_eq!(
            generate_declaration(&classes),
            "interface CssExports {\n  'app': string;\n  'title': string;\n}\n\
             export const cssExports: CssExports;\nexport default cssExports;\n"
        );
    }

    #[test]
    fn test_empty_declaration() {
        let text = generate_declaration(&BTreeMap::new());
        assert!(text.starts_with("interface CssExports {\n}"));
    }
}
