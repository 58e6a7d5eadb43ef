//! `pagekit build` command implementation.
//!
//! Output is written to a staging directory next to `dist/` and swapped in
//! only after every file landed, so a failed build never leaves a partial
//! output directory behind.

use miette::{IntoDiagnostic, Result};
use pagekit_core::bundler::write_declarations;
use pagekit_core::compiler::SwcBackend;
use pagekit_core::version::STATS_SCHEMA_VERSION;
use pagekit_core::{ArtifactSet, Compiler, Mode, ModeConfig};
use pagekit_util::fs::{replace_dir, staging_dir_for};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Build command action.
#[derive(Debug, Clone)]
pub struct BuildAction {
    pub cwd: PathBuf,
    /// Raw mode string; anything but `development`/`production` is rejected.
    pub mode: String,
    pub json: bool,
}

/// Build result for JSON output.
#[derive(Serialize)]
struct BuildResultJson {
    schema_version: u32,
    mode: Mode,
    out_dir: String,
    hash: String,
    duration_ms: u64,
    chunks: Vec<String>,
    total_size: usize,
    files: Vec<BuildFileJson>,
    declarations: usize,
}

#[derive(Serialize)]
struct BuildFileJson {
    name: String,
    size: usize,
}

pub fn run(action: BuildAction) -> Result<()> {
    let started = Instant::now();
    let mode: Mode = action.mode.parse().into_diagnostic()?;
    let root = dunce::canonicalize(&action.cwd).into_diagnostic()?;

    let config = ModeConfig::load(&root, mode, std::env::vars()).into_diagnostic()?;
    let compiler =
        Compiler::from_config(&config, Arc::new(SwcBackend::new())).into_diagnostic()?;
    let artifacts = compiler.compile().into_diagnostic()?;

    let out_dir = compiler.graph().output_dir();
    publish(&artifacts, &out_dir).into_diagnostic()?;

    let updated = write_declarations(compiler.root(), &artifacts).into_diagnostic()?;
    if updated > 0 {
        tracing::debug!(files = updated, "declarations updated");
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    if action.json {
        let result = BuildResultJson {
            schema_version: STATS_SCHEMA_VERSION,
            mode,
            out_dir: out_dir.display().to_string(),
            hash: artifacts.hash.clone(),
            duration_ms,
            chunks: artifacts.chunks.iter().map(|c| c.name.clone()).collect(),
            total_size: artifacts.total_size(),
            files: artifacts
                .files
                .iter()
                .map(|(name, artifact)| BuildFileJson {
                    name: name.clone(),
                    size: artifact.len(),
                })
                .collect(),
            declarations: artifacts.declarations.len(),
        };
        println!("{}", serde_json::to_string(&result).into_diagnostic()?);
    } else {
        print_summary(&artifacts, &out_dir, duration_ms);
    }
    Ok(())
}

/// Write `artifacts` to `out_dir`, replacing whatever was there.
pub fn publish(artifacts: &ArtifactSet, out_dir: &Path) -> io::Result<()> {
    let staging = staging_dir_for(out_dir);
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    std::fs::create_dir_all(&staging)?;

    let published = write_files(artifacts, &staging).and_then(|()| replace_dir(&staging, out_dir));
    if published.is_err() {
        let _ = std::fs::remove_dir_all(&staging);
    }
    published
}

fn write_files(artifacts: &ArtifactSet, dir: &Path) -> io::Result<()> {
    for (name, artifact) in &artifacts.files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &artifact.bytes)?;
    }
    Ok(())
}

fn print_summary(artifacts: &ArtifactSet, out_dir: &Path, duration_ms: u64) {
    println!();
    println!(
        "  Built {} files ({}) in {duration_ms}ms",
        artifacts.files.len(),
        format_size(artifacts.total_size())
    );
    println!();
    let width = artifacts.files.keys().map(String::len).max().unwrap_or(0);
    for (name, artifact) in &artifacts.files {
        println!("  {name:<width$}  {}", format_size(artifact.len()));
    }
    println!();
    println!("  Output: {}", out_dir.display());
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    }
}
