//! LowlaDB CLI
//!
//! Command-line tools for LowlaDB sync batches.
//!
//! # Commands
//!
//! - `inspect` - Summarize a batch file
//! - `load` - Load a batch file into an in-memory database and query it

mod commands;
mod error;
mod transport;

use clap::{Parser, Subcommand};
use commands::load::LoadOptions;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// LowlaDB command-line tools.
#[derive(Parser)]
#[command(name = "lowladb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a sync batch file
    Inspect {
        /// Batch file
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Load a sync batch file and print the result
    Load {
        /// Batch file
        file: PathBuf,

        /// Print the documents of this namespace (db.collection)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Sort printed documents by this field
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(short, long)]
        desc: bool,

        /// Maximum number of documents to print (0 = all)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { file, format } => {
            commands::inspect::run(&file, &format)?;
        }
        Commands::Load {
            file,
            namespace,
            sort,
            desc,
            limit,
        } => {
            let options = LoadOptions {
                namespace,
                sort,
                descending: desc,
                limit,
            };
            commands::load::run(&file, &options)?;
        }
        Commands::Version => {
            println!("LowlaDB CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
