//! Sencast CLI - Command-line interface
//!
//! This binary provides a command-line interface to the Sencast library.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::config::ConfigCommands;
use commands::run::RunArgs;
use commands::search::SearchArgs;

#[derive(Parser)]
#[command(name = "sencast")]
#[command(version = sencast::VERSION)]
#[command(about = "Satellite hindcasting for inland and coastal waters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full hindcast: search, download, process, mosaic and adapt
    Run {
        /// Configuration file (default: ~/.sencast/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Only use Level-1 products already on disk
        #[arg(long)]
        offline: bool,

        /// Enable debug logging regardless of RUST_LOG
        #[arg(long)]
        debug: bool,
    },

    /// Search the catalog and show which scenes are available locally
    Search {
        /// Configuration file (default: ~/.sencast/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            offline,
            debug,
        } => commands::run::run(RunArgs {
            config,
            offline,
            debug,
        }),
        Commands::Search { config } => commands::search::run(SearchArgs { config }),
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
