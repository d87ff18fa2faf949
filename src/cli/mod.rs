//! CLI module for the review indexing tool.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Load professor reviews into a vector index for retrieval.
#[derive(Debug, Parser)]
#[command(name = "rmp-rag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Provision the index, then embed and upsert every review
    Setup(commands::SetupArgs),

    /// Create the index if it does not exist
    Provision(commands::ProvisionArgs),

    /// Show index statistics
    Stats(commands::StatsArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
