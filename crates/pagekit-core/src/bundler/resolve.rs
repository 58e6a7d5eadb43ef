//! Import specifier resolution.
//!
//! Resolves import specifiers to module ids. A module id is the file path
//! relative to the project root with forward slashes (`src/App.tsx`), or the
//! full specifier for virtual modules (`pagekit:polyfill`).
//!
//! ## Specifier Types
//!
//! - Relative: `./utils`, `../lib/foo`
//! - Root-absolute: `/src/lib/foo`
//! - Aliased: `~/components/Button` (alias targets are root-relative)
//! - Virtual: `pagekit:hot-client?reload=true`
//! - Bare: `react`, `@scope/pkg/sub` (looked up in `node_modules`, walking up
//!   from the importer to the project root)

use crate::codes;
use crate::error::CompileError;
use crate::pipeline::{ResolveOptions, VIRTUAL_PREFIX};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Result of resolving an import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A file in the project, by module id.
    Module(String),
    /// A module pagekit provides itself.
    Virtual(String),
}

impl Resolved {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Module(id) | Self::Virtual(id) => id,
        }
    }
}

/// Package entry conditions, most preferred first. The registry runtime is
/// CommonJS-shaped, so `require` entries win over `import` ones.
const EXPORT_CONDITIONS: [&str; 4] = ["require", "browser", "default", "import"];

/// Import resolver.
#[derive(Debug)]
pub struct Resolver {
    root: PathBuf,
    extensions: Vec<String>,
    alias: Vec<(String, PathBuf)>,
    /// Cached resolutions, keyed by (specifier, importer directory).
    cache: RwLock<HashMap<(String, String), Resolved>>,
}

impl Resolver {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, options: &ResolveOptions) -> Self {
        let mut alias: Vec<(String, PathBuf)> = options
            .alias
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        // Longest alias first so `~/x` never shadows a more specific key.
        alias.sort_by_key(|(key, _)| std::cmp::Reverse(key.len()));

        Self {
            root: root.into(),
            extensions: options.extensions.clone(),
            alias,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Drop cached resolutions. Called before each rebuild, since files may
    /// have been added or removed.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Resolve an entry specifier relative to the project root.
    pub fn resolve_entry(&self, specifier: &str) -> Result<Resolved, CompileError> {
        self.resolve(specifier, "")
    }

    /// Resolve `specifier` imported by the module `importer`.
    pub fn resolve(&self, specifier: &str, importer: &str) -> Result<Resolved, CompileError> {
        let importer_dir = parent_id(importer);
        let key = (specifier.to_string(), importer_dir.to_string());
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(cached.clone());
        }

        let resolved = self.resolve_uncached(specifier, importer_dir).map_err(|message| {
            CompileError::transform(
                codes::TRANSFORM_UNRESOLVED_IMPORT,
                format!("Cannot resolve '{specifier}': {message}"),
            )
            .with_path(if importer.is_empty() { "<entry>" } else { importer })
        })?;

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, resolved.clone());
        Ok(resolved)
    }

    fn resolve_uncached(&self, specifier: &str, importer_dir: &str) -> Result<Resolved, String> {
        if specifier.starts_with(VIRTUAL_PREFIX) {
            return Ok(Resolved::Virtual(specifier.to_string()));
        }

        if specifier.starts_with("./") || specifier.starts_with("../") {
            let target = normalize(&Path::new(importer_dir).join(specifier))?;
            return self.resolve_file_or_directory(&target).map(Resolved::Module);
        }

        if let Some(rest) = specifier.strip_prefix('/') {
            let target = normalize(Path::new(rest))?;
            return self.resolve_file_or_directory(&target).map(Resolved::Module);
        }

        for (key, target) in &self.alias {
            let rest = if specifier == key {
                Some("")
            } else {
                specifier
                    .strip_prefix(key.as_str())
                    .and_then(|r| r.strip_prefix('/'))
            };
            if let Some(rest) = rest {
                let target = normalize(&target.join(rest))?;
                return self.resolve_file_or_directory(&target).map(Resolved::Module);
            }
        }

        self.resolve_bare(specifier, importer_dir).map(Resolved::Module)
    }

    /// Look `specifier` up in each `node_modules` from `importer_dir` up to the root.
    fn resolve_bare(&self, specifier: &str, importer_dir: &str) -> Result<String, String> {
        let (package, subpath) = parse_bare_specifier(specifier);
        let mut dir = importer_dir;
        loop {
            let package_dir = Path::new(dir).join("node_modules").join(package);
            if self.root.join(&package_dir).is_dir() {
                return self.resolve_package(&package_dir, subpath);
            }
            if dir.is_empty() {
                break;
            }
            dir = parent_id(dir);
        }
        Err(format!("cannot find package '{package}' in node_modules"))
    }

    /// Entry of an installed package: `exports`, then `main`, then `module`,
    /// then the directory index.
    fn resolve_package(&self, package_dir: &Path, subpath: Option<&str>) -> Result<String, String> {
        let manifest = self.read_manifest(package_dir)?;
        let export_key = subpath.map_or_else(|| ".".to_string(), |sub| format!("./{sub}"));

        let exported = manifest
            .as_ref()
            .and_then(|m| m.get("exports"))
            .and_then(|exports| resolve_exports(exports, &export_key));
        if let Some(entry) = exported {
            let target = normalize(&package_dir.join(entry))?;
            if self.root.join(&target).is_file() {
                return Ok(to_id(&target));
            }
        }

        if let Some(sub) = subpath {
            return self.resolve_file_or_directory(&normalize(&package_dir.join(sub))?);
        }

        for field in ["main", "module"] {
            let entry = manifest
                .as_ref()
                .and_then(|m| m.get(field))
                .and_then(Value::as_str);
            if let Some(entry) = entry {
                let target = normalize(&package_dir.join(entry))?;
                if let Ok(id) = self.resolve_file_or_directory(&target) {
                    return Ok(id);
                }
            }
        }

        self.resolve_file_or_directory(package_dir)
    }

    fn read_manifest(&self, package_dir: &Path) -> Result<Option<Value>, String> {
        let path = package_dir.join("package.json");
        match std::fs::read_to_string(self.root.join(&path)) {
            Ok(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| format!("invalid {}: {e}", to_id(&path))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("cannot read {}: {e}", to_id(&path))),
        }
    }

    /// Try `target` as a file, then with each extension, then as a
    /// directory index.
    fn resolve_file_or_directory(&self, target: &Path) -> Result<String, String> {
        let absolute = self.root.join(target);
        if absolute.is_file() {
            return Ok(to_id(target));
        }

        for ext in &self.extensions {
            let candidate = append_extension(target, ext);
            if self.root.join(&candidate).is_file() {
                return Ok(to_id(&candidate));
            }
        }

        if absolute.is_dir() {
            for ext in &self.extensions {
                let candidate = target.join(format!("index{ext}"));
                if self.root.join(&candidate).is_file() {
                    return Ok(to_id(&candidate));
                }
            }
        }

        Err(format!("no file at {}", to_id(target)))
    }
}

/// `@scope/pkg/sub/path` -> (`@scope/pkg`, `sub/path`).
fn parse_bare_specifier(specifier: &str) -> (&str, Option<&str>) {
    let split = if specifier.starts_with('@') {
        specifier.match_indices('/').nth(1).map(|(i, _)| i)
    } else {
        specifier.find('/')
    };
    match split {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..])),
        None => (specifier, None),
    }
}

/// Target of `key` (`.` or `./sub`) in a package `exports` field.
fn resolve_exports<'a>(exports: &'a Value, key: &str) -> Option<&'a str> {
    match exports {
        Value::Object(map) if map.keys().any(|k| k.starts_with('.')) => {
            map.get(key).and_then(export_target)
        }
        _ if key == "." => export_target(exports),
        _ => None,
    }
}

fn export_target(value: &Value) -> Option<&str> {
    match value {
        Value::String(target) => Some(target.as_str()),
        Value::Object(conditions) => EXPORT_CONDITIONS
            .iter()
            .filter_map(|condition| conditions.get(*condition))
            .find_map(export_target),
        Value::Array(targets) => targets.iter().find_map(export_target),
        _ => None,
    }
}

/// Directory part of a module id (`src/a/b.ts` -> `src/a`).
fn parent_id(id: &str) -> &str {
    id.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// `App.module` + `.scss` -> `App.module.scss` (never replaces an extension).
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(ext);
    PathBuf::from(name)
}

/// Resolve `.` and `..` lexically. Paths escaping the root are rejected.
fn normalize(path: &Path) -> Result<PathBuf, String> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return Err("path escapes the project root".to_string());
                }
            }
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Ok(out)
}

/// Module id for a root-relative path.
#[must_use]
pub fn to_id(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
