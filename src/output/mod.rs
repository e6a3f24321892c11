//! Output module
//!
//! Turns one JSON payload into a local Parquet file.
//!
//! # Overview
//!
//! - `payload_to_batch` - decode the payload against the inferred schema
//! - `FileWriter` - write that batch with the stream's compression codec

mod batch;
mod writer;

pub use batch::payload_to_batch;
pub use writer::{parquet_compression, FileWriter, WrittenFile};

#[cfg(test)]
mod tests;
