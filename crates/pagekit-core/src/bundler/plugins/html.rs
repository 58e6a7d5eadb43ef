//! Entry document generation.
//!
//! Reads the template from the project (or falls back to a minimal document)
//! and injects a stylesheet link per extracted stylesheet before `</head>` and
//! a script tag per chunk before `</body>`, in chunk load order.

use crate::artifacts::{Artifact, ArtifactSet};
use crate::bundler::plugin::{HookResult, Plugin, PluginContext, PluginError};
use crate::codes;
use std::path::PathBuf;

const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>pagekit</title>
</head>
<body>
  <div id="root"></div>
</body>
</html>
"#;

pub struct HtmlTemplatePlugin {
    /// Template, relative to the project root.
    template: PathBuf,
    /// Output name of the document.
    filename: String,
}

impl HtmlTemplatePlugin {
    #[must_use]
    pub fn new(template: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            filename: filename.into(),
        }
    }

    fn read_template(&self, ctx: &PluginContext) -> HookResult<String> {
        let path = ctx.root.join(&self.template);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(template = %path.display(), "no template, using default document");
                Ok(DEFAULT_TEMPLATE.to_string())
            }
            Err(e) => Err(PluginError::new(
                "html-template",
                "generate_bundle",
                format!("failed to read {}: {e}", self.template.display()),
            )
            .with_code(codes::TRANSFORM_TEMPLATE_FAILED)),
        }
    }
}

impl Plugin for HtmlTemplatePlugin {
    fn name(&self) -> &'static str {
        "html-template"
    }

    fn generate_bundle(&self, bundle: &mut ArtifactSet, ctx: &PluginContext) -> HookResult<()> {
        let template = self.read_template(ctx)?;

        let mut styles = Vec::new();
        let mut scripts = Vec::new();
        for chunk in &bundle.chunks {
            let style = ctx.output.style_file(&chunk.name);
            if bundle.contains(&style) {
                styles.push(ctx.output.url(&style));
            }
            scripts.push(ctx.output.url(&chunk.file));
        }

        let html = inject_tags(&template, &styles, &scripts);
        bundle
            .files
            .insert(self.filename.clone(), Artifact::for_file(&self.filename, html));
        Ok(())
    }
}

/// Insert stylesheet links and script tags into `template`.
#[must_use]
pub fn inject_tags(template: &str, styles: &[String], scripts: &[String]) -> String {
    let mut html = template.to_string();

    if !styles.is_empty() {
        let links: String = styles
            .iter()
            .map(|href| format!("  <link rel=\"stylesheet\" href=\"{href}\">\n"))
            .collect();
        match html.find("</head>") {
            Some(pos) => html.insert_str(pos, &links),
            None => html.insert_str(0, &links),
        }
    }

    let tags: String = scripts
        .iter()
        .map(|src| format!("  <script src=\"{src}\"></script>\n"))
        .collect();
    match html.rfind("</body>") {
        Some(pos) => html.insert_str(pos, &tags),
        None => {
            if !html.ends_with('\n') {
                html.push('\n');
            }
            html.push_str(&tags);
        }
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ChunkArtifact;
    use crate::config::Mode;
    use crate::pipeline::OutputNaming;

    fn bundle() -> ArtifactSet {
        let mut bundle = ArtifactSet::empty();
        for name in ["vendor", "main"] {
            let file = format!("{name}-bundle.js");
            bundle.files.insert(file.clone(), Artifact::for_file(&file, "x"));
            bundle.chunks.push(ChunkArtifact {
                name: name.to_string(),
                file,
                hash: String::new(),
                modules: Vec::new(),
            });
        }
        bundle
            .files
            .insert("main.css".to_string(), Artifact::for_file("main.css", ".a{}"));
        bundle
    }

    fn ctx(root: PathBuf) -> PluginContext {
        PluginContext {
            root,
            mode: Mode::Production,
            output: OutputNaming::default(),
        }
    }

    #[test]
    fn test_injects_into_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("public")).unwrap();
        std::fs::write(
            dir.path().join("public/index.html"),
            "<html><head><title>t</title></head><body><main></main></body></html>",
        )
        .unwrap();

        let mut bundle = bundle();
        HtmlTemplatePlugin::new("public/index.html", "index.html")
            .generate_bundle(&mut bundle, &ctx(dir.path().to_path_buf()))
            .unwrap();

        let html = std::str::from_utf8(&bundle.get("index.html").unwrap().bytes).unwrap().to_string();
        let link = html.find("href=\"/main.css\"").unwrap();
        assert!(link < html.find("</head>").unwrap());
        let vendor = html.find("src=\"/vendor-bundle.js\"").unwrap();
        let main = html.find("src=\"/main-bundle.js\"").unwrap();
        assert!(vendor < main);
        assert!(main < html.find("</body>").unwrap());
        assert!(html.contains("<title>t</title>"));
    }

    #[test]
    fn test_missing_template_uses_default_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut bundle = bundle();
        HtmlTemplatePlugin::new("public/index.html", "index.html")
            .generate_bundle(&mut bundle, &ctx(dir.path().to_path_buf()))
            .unwrap();

        let artifact = bundle.get("index.html").unwrap();
        assert_eq!(artifact.content_type, "text/html; charset=utf-8");
        let html = std::str::from_utf8(&artifact.bytes).unwrap();
        assert!(html.contains("<div id=\"root\"></div>"));
        assert!(html.contains("<script src=\"/main-bundle.js\"></script>"));
    }

    #[test]
    fn test_inject_without_body_appends() {
        let html = inject_tags("<p>hi</p>", &[], &["/main-bundle.js".to_string()]);
        assert_eq!(html, "<p>hi</p>\n  <script src=\"/main-bundle.js\"></script>\n");
    }
}
