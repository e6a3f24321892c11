//! Stream configuration module
//!
//! Holds the per-stream `StreamConfig` records and the three lookup tables,
//! and keeps them in a `ConfigCache` that is refreshed by atomic snapshot
//! replacement.
//!
//! # Overview
//!
//! - `StreamConfig` - one record per stream (backend, location, credentials)
//! - `ConfigSnapshot` - immutable view of all streams and lookup tables
//! - `ConfigCache` - owns the current snapshot, swaps it on `refresh()`
//! - `ConfigSource` - where snapshots come from (directory, config service)

mod cache;
mod source;
mod types;

pub use cache::ConfigCache;
pub use source::{
    unwrap_sql_nullable, ConfigServiceSource, ConfigSource, DirectorySource, StaticSource,
    COMPRESSION_TYPES_FILE, FILE_STORE_TYPES_FILE, PARTITION_TIMES_FILE,
};
pub use types::{
    CompressionTypes, ConfigSnapshot, FileStoreTypes, LookupEntry, LookupTable, PartitionTimes,
    ResolvedStream, StreamConfig,
};
