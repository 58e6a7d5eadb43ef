//! Line-level V3 source maps for emitted chunks.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

/// VLQ-encode a signed integer and append to output string.
fn vlq_encode(value: i64, out: &mut String) {
    const B64: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    #[allow(clippy::cast_sign_loss)]
    let mut v = (if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    }) as u64;
    loop {
        let mut digit = (v & 0x1f) as u8;
        v >>= 5;
        if v > 0 {
            digit |= 0x20; // continuation bit
        }
        out.push(B64[digit as usize] as char);
        if v == 0 {
            break;
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapJson<'a> {
    version: u8,
    file: &'a str,
    sources: &'a [String],
    sources_content: &'a [String],
    names: [&'a str; 0],
    mappings: String,
}

/// Tracks source positions during chunk emission and generates a V3 map.
#[derive(Debug, Clone, Default)]
pub struct SourceMapBuilder {
    /// Module ids (source file names).
    sources: Vec<String>,
    /// Original source content for each module.
    sources_content: Vec<String>,
    /// (output line, source index, source line), one segment per line.
    mappings: Vec<(u32, u32, u32)>,
}

impl SourceMapBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file and return its index.
    pub fn add_source(&mut self, id: &str, content: &str) -> u32 {
        let idx = self.sources.len() as u32;
        self.sources.push(id.to_string());
        self.sources_content.push(content.to_string());
        idx
    }

    /// Map `output_line` to `source_line` of source `source_idx` (all zero-based).
    pub fn add_line_mapping(&mut self, output_line: u32, source_idx: u32, source_line: u32) {
        self.mappings.push((output_line, source_idx, source_line));
    }

    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Drop every mapping but keep sources and their content. Used once the
    /// chunk has been minified and line positions no longer hold.
    pub fn clear_mappings(&mut self) {
        self.mappings.clear();
    }

    /// Encoded `mappings` field.
    fn encode_mappings(&self) -> String {
        let mut out = String::new();
        let mut prev_output_line: u32 = 0;
        let mut prev_source: i64 = 0;
        let mut prev_source_line: i64 = 0;

        let mut sorted = self.mappings.clone();
        sorted.sort_by_key(|m| m.0);
        sorted.dedup_by_key(|m| m.0);

        for (output_line, source_idx, source_line) in sorted {
            while prev_output_line < output_line {
                out.push(';');
                prev_output_line += 1;
            }

            // output column, source index, source line, source column
            vlq_encode(0, &mut out);
            vlq_encode(i64::from(source_idx) - prev_source, &mut out);
            vlq_encode(i64::from(source_line) - prev_source_line, &mut out);
            vlq_encode(0, &mut out);

            prev_source = i64::from(source_idx);
            prev_source_line = i64::from(source_line);
        }
        out
    }

    /// Generate the V3 source map JSON.
    #[must_use]
    pub fn generate(&self, file: &str) -> String {
        let json = SourceMapJson {
            version: 3,
            file,
            sources: &self.sources,
            sources_content: &self.sources_content,
            names: [],
            mappings: self.encode_mappings(),
        };
        serde_json::to_string(&json).unwrap_or_default()
    }
}

/// `sourceMappingURL` comment carrying the whole map as a data URL.
#[must_use]
pub fn inline_comment(map_json: &str) -> String {
    format!(
        "//# sourceMappingURL=data:application/json;charset=utf-8;base64,{}\n",
        STANDARD.encode(map_json)
    )
}

/// `sourceMappingURL` comment pointing at a sibling map file.
#[must_use]
pub fn external_comment(map_file: &str) -> String {
    format!("//# sourceMappingURL={map_file}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlq_encode() {
        let mut out = String::new();
        vlq_encode(0, &mut out);
        assert_eq!(out, "A");

        out.clear();
        vlq_encode(1, &mut out);
        assert_eq!(out, "C");

        out.clear();
        vlq_encode(-1, &mut out);
        assert_eq!(out, "D");

        out.clear();
        vlq_encode(16, &mut out);
        assert_eq!(out, "gB");
    }

    #[test]
    fn test_generate() {
        let mut builder = SourceMapBuilder::new();
        let a = builder.add_source("src/a.ts", "let a;\nlet b;");
        builder.add_line_mapping(1, a, 0);
        builder.add_line_mapping(2, a, 1);

        let json: serde_json::Value =
            serde_json::from_str(&builder.generate("main-bundle.js")).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["file"], "main-bundle.js");
        assert_eq!(json["sources"][0], "src/a.ts");
        assert_eq!(json["sourcesContent"][0], "let a;\nlet b;");
        assert_eq!(json["mappings"], ";AAAA;AACA");
    }

    #[test]
    fn test_clear_mappings_keeps_sources() {
        let mut builder = SourceMapBuilder::new();
        let a = builder.add_source("src/a.ts", "x");
        builder.add_line_mapping(0, a, 0);
        builder.clear_mappings();

        let json: serde_json::Value = serde_json::from_str(&builder.generate("f.js")).unwrap();
        assert_eq!(json["mappings"], "");
        assert_eq!(json["sourcesContent"][0], "x");
    }

    #[test]
    fn test_inline_comment_round_trips() {
        let comment = inline_comment("{}");
        let encoded = comment
            .trim_end()
            .rsplit_once("base64,")
            .map(|(_, b)| b)
            .unwrap();
        assert_eq!(STANDARD.decode(encoded).unwrap(), b"{}");
    }
}
