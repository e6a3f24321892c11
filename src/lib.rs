// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # rtdl-ingest
//!
//! Turns JSON events into partitioned Parquet files on pluggable storage
//! and registers them in query catalogs.
//!
//! ## Features
//!
//! - **Schema inference**: a Parquet schema per message, derived from the payload
//! - **Partitioned layout**: `{folder}/{message_type}/{time bucket}/{unique leaf}`
//! - **Backends**: local filesystem, S3, GCS, Azure Blob, HDFS (WebHDFS)
//! - **Catalogs**: Dremio sources and datasets, AWS Glue crawlers, Snowflake external tables
//! - **Hot config**: stream configs swapped atomically on a refresh control message
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rtdl_ingest::{build_pipeline, IncomingMessage, Settings};
//!
//! #[tokio::main]
//! async fn main() -> rtdl_ingest::Result<()> {
//!     let settings = Settings::load(None)?;
//!     let pipeline = build_pipeline(&settings).await?;
//!
//!     let message = IncomingMessage::from_bytes(br#"{"stream_id":"s1","payload":{"id":1}}"#)?;
//!     let outcome = pipeline.ingest(message).await;
//!     println!("{outcome:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        IngestPipeline                          │
//! │  resolve config → infer schema → plan path → write → catalogs  │
//! │                         → egress                               │
//! └────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬──────────┬───────┴──────┬──────────────┬───────────┐
//! │  Config   │  Schema  │  Partition   │   Storage    │  Catalog  │
//! ├───────────┼──────────┼──────────────┼──────────────┼───────────┤
//! │ Directory │ Infer    │ Hourly..     │ Local  S3    │ Dremio    │
//! │ Service   │ Arrow    │  Quarterly   │ GCS  Azure   │ Glue      │
//! │ Static    │ Parquet  │ Unique leaf  │ HDFS         │ Snowflake │
//! └───────────┴──────────┴──────────────┴──────────────┴───────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Process settings
pub mod settings;

/// Catalog authentication
pub mod auth;

/// HTTP client with timeout and retry
pub mod http;

/// Stream configs, lookup tables and the config cache
pub mod config;

/// Inbound message envelope
pub mod message;

/// Schema inference from JSON payloads
pub mod schema;

/// Partition paths and file names
pub mod partition;

/// Parquet output
pub mod output;

/// Storage backends
pub mod storage;

/// Catalog synchronization
pub mod catalog;

/// Downstream forwarding
pub mod egress;

/// Per-message orchestration
pub mod pipeline;

/// Command-line interface and HTTP host
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use cli::build_pipeline;
pub use message::IncomingMessage;
pub use pipeline::{IngestOutcome, IngestPipeline};
pub use settings::Settings;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
