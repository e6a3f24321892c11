//! Time-bucket subfolders and unique leaf filenames

use crate::error::{Error, Result};
use crate::types::PartitionGranularity;
use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

/// Time bucket for `now` at the given granularity
///
/// | granularity | format          | example         |
/// |-------------|-----------------|-----------------|
/// | Hourly      | `YYYY-MM-DD-HH` | `2024-03-14-09` |
/// | Daily       | `YYYY-MM-DD`    | `2024-03-14`    |
/// | Weekly      | `YYYY-Www`      | `2024-W11`      |
/// | Monthly     | `YYYY-MM`       | `2024-03`       |
/// | Quarterly   | `YYYY-Qn`       | `2024-Q1`       |
///
/// Weekly buckets use the ISO week-based year, so the first days of
/// January can fall in the previous year's last week.
pub fn partition_bucket(granularity: PartitionGranularity, now: DateTime<Utc>) -> String {
    match granularity {
        PartitionGranularity::Hourly => now.format("%Y-%m-%d-%H").to_string(),
        PartitionGranularity::Daily => now.format("%Y-%m-%d").to_string(),
        PartitionGranularity::Weekly => {
            let week = now.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        PartitionGranularity::Monthly => now.format("%Y-%m").to_string(),
        PartitionGranularity::Quarterly => {
            format!("{}-Q{}", now.year(), now.month().div_ceil(3))
        }
    }
}

/// Check that a message type is usable as a single path segment
///
/// Only ASCII letters, digits, `_`, `-` and `.` are accepted, and `.` / `..`
/// are rejected. The same name becomes a directory on every backend, an
/// object key prefix and a catalog folder, so it must not need escaping.
pub fn validate_message_type(message_type: &str) -> Result<()> {
    if message_type.is_empty() || message_type == "." || message_type == ".." {
        return Err(Error::malformed(format!(
            "message type {message_type:?} is not a valid path segment"
        )));
    }
    if let Some(bad) = message_type
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(Error::malformed(format!(
            "message type {message_type:?} contains {bad:?}"
        )));
    }
    Ok(())
}

/// `"{message_type}/{bucket}"`
pub fn subfolder(message_type: &str, granularity: PartitionGranularity, now: DateTime<Utc>) -> String {
    format!("{message_type}/{}", partition_bucket(granularity, now))
}

/// Unique Parquet filename for a write at `now`
///
/// Fixed-width timestamp down to the nanosecond plus a random token, so
/// concurrent writes in the same second never collide.
pub fn leaf_filename(now: DateTime<Utc>) -> String {
    format!(
        "{}{:09}-{}.parquet",
        now.format("%Y%m%d%H%M%S"),
        now.timestamp_subsec_nanos(),
        Uuid::new_v4().simple()
    )
}

/// Destination of one write, relative to the backend's root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPath {
    /// Stream folder inside the bucket/container/datastore (may be empty)
    pub folder: String,
    /// `{message_type}/{bucket}`
    pub subfolder: String,
    /// Leaf filename
    pub leaf: String,
}

impl PlannedPath {
    /// Plan a write for `message_type` at `now`
    pub fn plan(
        folder: &str,
        message_type: &str,
        granularity: PartitionGranularity,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            folder: folder.trim_matches('/').to_string(),
            subfolder: subfolder(message_type, granularity, now),
            leaf: leaf_filename(now),
        }
    }

    /// `{folder}/{subfolder}`, without the leaf
    pub fn directory(&self) -> String {
        join_segments(&[&self.folder, &self.subfolder])
    }

    /// `{folder}/{subfolder}/{leaf}`
    pub fn key(&self) -> String {
        join_segments(&[&self.folder, &self.subfolder, &self.leaf])
    }
}

fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}
