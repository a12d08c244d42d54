//! GeoSync CLI
//!
//! Command-line interface for GeoSync repositories.
//!
//! # Commands
//!
//! - `push` - Update remote refs along with associated objects
//! - `version` - Show version information

mod commands;
mod progress;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// GeoSync command-line tools.
#[derive(Parser)]
#[command(name = "geosync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the repository directory (defaults to the current directory)
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update remote refs along with associated objects
    Push {
        /// Push every ref under refs/heads/ instead of naming each ref
        #[arg(long)]
        all: bool,

        /// Remote to push to
        repository: Option<String>,

        /// Refs to push, as <source>[:<destination>]
        refspecs: Vec<String>,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Push {
            all,
            repository,
            refspecs,
        } => {
            let path = cli.path.unwrap_or_else(|| PathBuf::from("."));
            match commands::push::run(&path, repository.as_deref(), &refspecs, all, cli.verbose) {
                Ok(outcome) => {
                    if !outcome.data_pushed {
                        println!("Nothing to push.");
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("{}", commands::push::failure_message(&e));
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Version => {
            commands::version::run();
            ExitCode::SUCCESS
        }
    }
}
