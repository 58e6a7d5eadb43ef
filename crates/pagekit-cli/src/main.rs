#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pagekit_core::Mode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pagekit")]
#[command(author, version, about = "Build and serve a single-page application", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the project root
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Build the application into the output directory
    Build {
        /// Build mode: development or production
        #[arg(long, env = "NODE_ENV", default_value = "production")]
        mode: String,
    },

    /// Serve the application: static from dist/ in production, live otherwise
    Serve {
        /// `production` serves dist/ statically; anything else serves live
        #[arg(long, env = "NODE_ENV")]
        mode: Option<String>,
    },

    /// Print the build graph or the mode policy table
    Inspect {
        /// Mode whose build graph is printed
        #[arg(long, env = "NODE_ENV", default_value = "development")]
        mode: String,

        /// Print the development/production decision table instead
        #[arg(long)]
        policy: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    // Commands that only print
    if matches!(cli.command, Commands::Version) {
        return commands::version::run(cli.json);
    }

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Commands::Version => Ok(()),
        Commands::Build { mode } => commands::build::run(commands::build::BuildAction {
            cwd,
            mode,
            json: cli.json,
        }),
        Commands::Serve { mode } => {
            let action = commands::serve::ServeAction {
                cwd,
                mode: Mode::from_node_env(mode.as_deref()),
            };
            let rt = tokio::runtime::Runtime::new().into_diagnostic()?;
            rt.block_on(commands::serve::run(action))
        }
        Commands::Inspect { mode, policy } => {
            if policy {
                commands::inspect::policy(cli.json)
            } else {
                commands::inspect::graph(&cwd, &mode)
            }
        }
    }
}
