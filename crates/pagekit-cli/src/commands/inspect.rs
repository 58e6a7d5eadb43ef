//! `pagekit inspect` command implementation.

use miette::{IntoDiagnostic, Result};
use pagekit_core::pipeline::policy::{table as policy_table, PolicyRow};
use pagekit_core::{Mode, ModeConfig};
use std::path::Path;

/// Print the build graph for `mode` as JSON.
pub fn graph(cwd: &Path, mode: &str) -> Result<()> {
    let mode: Mode = mode.parse().into_diagnostic()?;
    let root = dunce::canonicalize(cwd).into_diagnostic()?;
    let config = ModeConfig::load(&root, mode, std::env::vars()).into_diagnostic()?;
    let graph = pagekit_core::build(&config).into_diagnostic()?;
    println!("{}", serde_json::to_string_pretty(&graph).into_diagnostic()?);
    Ok(())
}

/// Print the development/production decision table.
pub fn policy(json: bool) -> Result<()> {
    let rows = policy_table();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows).into_diagnostic()?);
    } else {
        print!("{}", render_table(&rows));
    }
    Ok(())
}

fn render_table(rows: &[PolicyRow]) -> String {
    let aspect_width = rows.iter().map(|r| r.aspect.len()).max().unwrap_or(0).max(6);
    let dev_width = rows
        .iter()
        .map(|r| r.development.len())
        .max()
        .unwrap_or(0)
        .max(11);

    let mut out = format!(
        "{:<aspect_width$}  {:<dev_width$}  {}\n",
        "aspect", "development", "production"
    );
    for row in rows {
        out.push_str(&format!(
            "{:<aspect_width$}  {:<dev_width$}  {}\n",
            row.aspect, row.development, row.production
        ));
    }
    out
}
