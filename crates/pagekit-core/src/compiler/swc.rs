//! SWC compiler backend implementation.
//!
//! ## Feature Flags
//!
//! - `swc`: Enable full SWC integration.
//!
//! Without the `swc` feature, a stub implementation is used that performs
//! basic regex-based transformations and a conservative line-level minifier.

#![allow(clippy::default_trait_access)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_raw_string_hashes)]

use super::spec::JsxRuntime;
use super::{CompilerBackend, CompilerError, TranspileOutput, TranspileSpec};

/// SWC-based compiler backend.
///
/// `SwcBackend` is `Send + Sync` and each call is independent, so one
/// instance is shared by every module of every rebuild.
#[derive(Debug, Clone, Default)]
pub struct SwcBackend {
    _private: (),
}

impl SwcBackend {
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn is_typescript(path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "ts" | "tsx"))
    }

    fn is_jsx(path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "jsx" | "tsx"))
    }
}

impl CompilerBackend for SwcBackend {
    fn name(&self) -> &'static str {
        "swc"
    }

    fn transpile(
        &self,
        spec: &TranspileSpec,
        source: &str,
    ) -> Result<TranspileOutput, CompilerError> {
        if source.is_empty() {
            return Ok(TranspileOutput::new(""));
        }

        let is_ts = Self::is_typescript(&spec.input_path);
        let is_jsx = Self::is_jsx(&spec.input_path);

        #[cfg(not(feature = "swc"))]
        {
            let mut code = source.to_string();

            if is_ts {
                code = strip_simple_types(&code, is_jsx);
            }
            if is_jsx {
                code = transform_simple_jsx(&code, spec.jsx_runtime);
            }
            Ok(TranspileOutput::new(code))
        }

        #[cfg(feature = "swc")]
        {
            compile_with_swc(spec, source, is_ts, is_jsx)
        }
    }

    fn minify(&self, code: &str) -> Result<String, CompilerError> {
        if code.trim().is_empty() {
            return Ok(String::new());
        }

        #[cfg(not(feature = "swc"))]
        {
            Ok(minify_lines(code))
        }

        #[cfg(feature = "swc")]
        {
            minify_with_swc(code)
        }
    }
}

/// Strip simple TypeScript type annotations (stub implementation).
#[cfg(not(feature = "swc"))]
fn strip_simple_types(source: &str, is_jsx: bool) -> String {
    let mut result = source.to_string();

    // interface Foo { ... }
    if let Ok(re) = regex_lite::Regex::new(r"(?m)^(export\s+)?interface\s+\w+\s*\{[^}]*\}\s*") {
        result = re.replace_all(&result, "").to_string();
    }

    // type Foo = ...;
    if let Ok(re) = regex_lite::Regex::new(r"(?m)^(export\s+)?type\s+\w+\s*=\s*[^;]+;\s*") {
        result = re.replace_all(&result, "").to_string();
    }

    // ): type { -> ) {
    if let Ok(re) = regex_lite::Regex::new(r"\)\s*:\s*\w+(\s*\[\s*\])?\s*\{") {
        result = re.replace_all(&result, ") {").to_string();
    }

    // (a: type, -> (a,
    if let Ok(re) = regex_lite::Regex::new(r"(\w+)\s*:\s*([A-Z]\w*|string|number|boolean|any|unknown)(\s*\[\s*\])?\s*,") {
        result = re.replace_all(&result, "$1,").to_string();
    }

    // (a: type) -> (a)
    if let Ok(re) = regex_lite::Regex::new(r"(\w+)\s*:\s*([A-Z]\w*|string|number|boolean|any|unknown)(\s*\[\s*\])?\s*\)") {
        result = re.replace_all(&result, "$1)").to_string();
    }

    // const x: type = -> const x =
    if let Ok(re) = regex_lite::Regex::new(r"(const|let|var)\s+(\w+)\s*:\s*\w+(\s*\[\s*\])?\s*=") {
        result = re.replace_all(&result, "$1 $2 =").to_string();
    }

    // Generic parameters collide with JSX tags, so only plain TS files get this
    if !is_jsx {
        if let Ok(re) = regex_lite::Regex::new(r"(\w)<[A-Za-z_][\w, ]*>") {
            result = re.replace_all(&result, "$1").to_string();
        }
    }

    // `as` type assertions
    if let Ok(re) = regex_lite::Regex::new(r"\)\s+as\s+[A-Z]\w*") {
        result = re.replace_all(&result, ")").to_string();
    }

    result
}

/// Transform simple JSX (stub implementation).
#[cfg(not(feature = "swc"))]
fn transform_simple_jsx(source: &str, runtime: JsxRuntime) -> String {
    let mut result = source.to_string();

    let (element, empty): (fn(&str, &str) -> String, fn(&str) -> String) = match runtime {
        JsxRuntime::Automatic => (
            |tag, content| format!("_jsx(\"{tag}\", {{ children: \"{content}\" }})"),
            |tag| format!("_jsx(\"{tag}\", {{}})"),
        ),
        JsxRuntime::Classic => (
            |tag, content| format!("React.createElement(\"{tag}\", null, \"{content}\")"),
            |tag| format!("React.createElement(\"{tag}\", null)"),
        ),
    };

    let before = result.clone();

    // <div>text</div>
    if let Ok(re) = regex_lite::Regex::new(r"<(\w+)>([^<{]*)</(\w+)>") {
        result = re
            .replace_all(&result, |caps: &regex_lite::Captures| {
                if caps[1] == caps[3] {
                    element(&caps[1], &caps[2])
                } else {
                    caps[0].to_string()
                }
            })
            .to_string();
    }

    // <br />
    if let Ok(re) = regex_lite::Regex::new(r"<(\w+)\s*/>") {
        result = re
            .replace_all(&result, |caps: &regex_lite::Captures| empty(&caps[1]))
            .to_string();
    }

    if runtime == JsxRuntime::Automatic && result != before && !result.contains("jsx-runtime") {
        result = format!("import {{ jsx as _jsx }} from \"react/jsx-runtime\";\n{result}");
    }

    result
}

/// Conservative line-level minifier: drops blank lines, whole-line `//`
/// comments, and indentation. Lines inside template literals are kept verbatim.
#[cfg(not(feature = "swc"))]
fn minify_lines(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut in_template = false;

    for line in code.lines() {
        if in_template {
            out.push_str(line);
            out.push('\n');
        } else {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with("//") {
                out.push_str(trimmed);
                out.push('\n');
            }
        }

        if count_unescaped_backticks(line) % 2 == 1 {
            in_template = !in_template;
        }
    }

    out
}

#[cfg(not(feature = "swc"))]
fn count_unescaped_backticks(line: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in line.chars() {
        match c {
            '\\' if !escaped => escaped = true,
            '`' if !escaped => count += 1,
            _ => escaped = false,
        }
    }
    count
}

// ============================================================
// Full SWC Implementation (requires `swc` feature)
// ============================================================

/// Syntax level of emitted modules.
#[cfg(feature = "swc")]
const OUTPUT_TARGET: swc_ecma_ast::EsVersion = swc_ecma_ast::EsVersion::Es2015;

#[cfg(feature = "swc")]
fn compile_with_swc(
    spec: &TranspileSpec,
    source: &str,
    is_ts: bool,
    is_jsx: bool,
) -> Result<TranspileOutput, CompilerError> {
    use swc_common::{
        comments::SingleThreadedComments, errors::Handler, sync::Lrc, FileName, Globals, Mark,
        SourceMap, GLOBALS,
    };
    use swc_ecma_ast::Program;
    use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
    use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
    use swc_ecma_transforms_base::{fixer::fixer, hygiene::hygiene, resolver};
    use swc_ecma_transforms_react::{react, Options as ReactOptions, Runtime};
    use swc_ecma_transforms_typescript::strip;
    use swc_ecma_visit::FoldWith;

    let cm: Lrc<SourceMap> = Default::default();
    let handler = Handler::with_emitter_writer(Box::new(std::io::sink()), Some(cm.clone()));

    let filename = spec
        .input_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input.js");
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );

    let syntax = if is_ts {
        Syntax::Typescript(TsSyntax {
            tsx: is_jsx,
            decorators: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsSyntax {
            jsx: is_jsx,
            decorators: true,
            ..Default::default()
        })
    };

    let target = OUTPUT_TARGET;
    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(syntax, target, StringInput::from(&*fm), Some(&comments));

    let mut parser = Parser::new_from(lexer);
    let module = parser.parse_module().map_err(|e| {
        let kind = format!("{:?}", e.kind());
        e.into_diagnostic(&handler).emit();
        CompilerError::parse_error(format!("Failed to parse {filename}: {kind}"))
    })?;

    let errors: Vec<String> = parser
        .take_errors()
        .into_iter()
        .map(|e| format!("{:?}", e.kind()))
        .collect();
    if !errors.is_empty() {
        return Err(CompilerError::parse_error(errors.join(", ")));
    }

    let output = GLOBALS.set(&Globals::default(), || {
        let unresolved_mark = Mark::new();
        let top_level_mark = Mark::new();

        let mut program = Program::Module(module);
        program = program.fold_with(&mut resolver(unresolved_mark, top_level_mark, is_ts));

        if is_ts {
            program = program.fold_with(&mut strip(unresolved_mark, top_level_mark));
        }

        let mut module = match program {
            Program::Module(m) => m,
            Program::Script(s) => swc_ecma_ast::Module {
                span: s.span,
                body: s
                    .body
                    .into_iter()
                    .map(swc_ecma_ast::ModuleItem::Stmt)
                    .collect(),
                shebang: s.shebang,
            },
        };

        if is_jsx {
            let runtime = match spec.jsx_runtime {
                JsxRuntime::Automatic => Runtime::Automatic,
                JsxRuntime::Classic => Runtime::Classic,
            };

            let react_options = ReactOptions {
                runtime: Some(runtime),
                import_source: Some("react".to_string()),
                ..Default::default()
            };

            module = module.fold_with(&mut react(
                cm.clone(),
                Some(&comments),
                react_options,
                top_level_mark,
                unresolved_mark,
            ));
        }

        module = module.fold_with(&mut hygiene());
        module = module.fold_with(&mut fixer(Some(&comments)));

        module
    });

    let mut buf = Vec::new();
    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, None);

        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default().with_target(target),
            cm: cm.clone(),
            comments: Some(&comments),
            wr: writer,
        };

        emitter
            .emit_module(&output)
            .map_err(|e| CompilerError::transform_error(format!("Failed to emit: {e}")))?;
    }

    String::from_utf8(buf)
        .map(TranspileOutput::new)
        .map_err(|e| CompilerError::transform_error(format!("Invalid UTF-8 output: {e}")))
}

/// Reprint a chunk with the minifying code generator.
#[cfg(feature = "swc")]
fn minify_with_swc(code: &str) -> Result<String, CompilerError> {
    use swc_common::{sync::Lrc, FileName, SourceMap};
    use swc_ecma_ast::EsVersion;
    use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
    use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};

    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        Lrc::new(FileName::Custom("chunk.js".to_string())),
        code.to_string(),
    );

    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::EsNext,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let script = parser
        .parse_script()
        .map_err(|e| CompilerError::parse_error(format!("Failed to parse chunk: {:?}", e.kind())))?;

    let mut buf = Vec::new();
    {
        let writer = JsWriter::new(cm.clone(), "\n", &mut buf, None);
        let mut emitter = Emitter {
            cfg: swc_ecma_codegen::Config::default().with_minify(true),
            cm: cm.clone(),
            comments: None,
            wr: writer,
        };
        emitter
            .emit_script(&script)
            .map_err(|e| CompilerError::transform_error(format!("Failed to emit: {e}")))?;
    }

    String::from_utf8(buf)
        .map_err(|e| CompilerError::transform_error(format!("Invalid UTF-8 output: {e}")))
}
