//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Streams JSON events into partitioned Parquet files
#[derive(Parser, Debug)]
#[command(name = "rtdl-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML); environment variables override it
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP ingest host
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8082")]
        port: u16,
    },

    /// Process one message envelope from a JSON file
    Ingest {
        /// Envelope file (`{"stream_id", "message_type", "payload"}`)
        file: PathBuf,
    },

    /// Load the config source and summarise it
    CheckConfig,
}
