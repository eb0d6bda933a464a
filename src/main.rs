//! # Paperlift CLI
//!
//! ## Usage
//!
//! ```bash
//! paperlift --config ./config/paperlift.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `paperlift run` | Extract metadata from every discovered document |
//! | `paperlift list` | List discovered documents with their identity |
//! | `paperlift slice <path>` | Show the excerpt selected for one document |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use paperlift::config;
use paperlift::pipeline::{self, RunOptions};
use paperlift::progress::ProgressMode;

/// Paperlift: front-matter metadata extraction via a local text-generation model.
#[derive(Parser)]
#[command(
    name = "paperlift",
    about = "Paperlift: front-matter metadata extraction via a local text-generation model",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/paperlift.toml`. Input, output, slicing,
    /// generation and prompt settings are read from this file.
    #[arg(long, global = true, default_value = "./config/paperlift.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Extract metadata from every discovered document.
    ///
    /// Resets `index.jsonl`, then writes `json/<id>.json` and
    /// `logs/<id>_raw.json` for each document in sorted path order.
    Run {
        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Slice documents and report, without calling the model or writing output.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a TTY, otherwise `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// List discovered documents in processing order.
    List,

    /// Show identity, page window and excerpt for a single document.
    ///
    /// Uses the config file if present, otherwise default slicing budgets.
    Slice {
        /// Path to the document.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Slice { path } = &cli.command {
        let cfg = config::load_config(&cli.config).unwrap_or_else(|_| config::Config::minimal());
        pipeline::print_slice(path, &cfg)?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run {
            limit,
            dry_run,
            progress,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            let reporter = mode.reporter();
            let options = RunOptions { limit, dry_run };
            pipeline::run(&cfg, &options, reporter.as_ref()).await?;
        }
        Commands::List => {
            pipeline::list_documents(&cfg)?;
        }
        Commands::Slice { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
