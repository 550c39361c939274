//! Tessera CLI - scan a directory of photos and compute each one's average color.
//!
//! The records Tessera produces are the tile library for a photo mosaic: one
//! entry per decodable image with its path, average RGB color and size.
//!
//! # Usage
//!
//! ```bash
//! # Scan a directory, JSON array on stdout
//! tessera scan ~/Pictures
//!
//! # Stream JSONL to a file with 16 workers
//! tessera scan ./tiles -f jsonl -o tiles.jsonl -p 16
//!
//! # View configuration
//! tessera config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Tessera - compute average colors of a photo collection for mosaic building.
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a directory and emit one record per decodable image
    Scan(cli::scan::ScanArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match tessera_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `tessera config path`."
            );
            tessera_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Tessera v{}", tessera_core::VERSION);

    match cli.command {
        Commands::Scan(args) => cli::scan::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
