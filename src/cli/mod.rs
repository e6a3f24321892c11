//! CLI module
//!
//! # Commands
//!
//! - `serve` - Start the HTTP ingest host
//! - `ingest` - Process one envelope from a file
//! - `check-config` - Load and summarise the config source

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands};
pub use runner::{build_pipeline, config_source, Runner};
pub use server::{router, serve};

#[cfg(test)]
mod tests;
