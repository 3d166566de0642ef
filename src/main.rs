//! Taxograph CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "taxograph")]
#[command(about = "Transitive closure maintenance for is-a hierarchies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Snapshot file holding the concepts (.json, anything else is bincode)
    #[arg(short, long, default_value = "taxonomy.json", global = true)]
    store: PathBuf,

    /// Processor configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report structural issues and stale parentage without writing
    Check,
    /// Rebuild the parentage of every concept from scratch
    Reindex {
        /// Report what would change without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply a change set and update the affected concepts
    Apply {
        /// JSON change set with `new`, `changed` and `removed` entries
        #[arg(long)]
        changes: PathBuf,

        /// Process without saving
        #[arg(long)]
        dry_run: bool,
    },
    /// Print one concept
    Show {
        id: String,
    },
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("taxograph={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = taxograph_processor::ProcessorConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "processor configuration");

    match cli.command {
        Commands::Check => commands::check(&cli.store, &config),
        Commands::Reindex { dry_run } => commands::reindex(&cli.store, &config, dry_run),
        Commands::Apply { changes, dry_run } => commands::apply(&cli.store, &changes, &config, dry_run),
        Commands::Show { id } => commands::show(&cli.store, &id),
        Commands::Version => {
            println!("Taxograph v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
