//! Partition path planning
//!
//! Decides where a file lands: `{message_type}/{time bucket}/{leaf}`.

mod planner;

pub use planner::{
    leaf_filename, partition_bucket, subfolder, validate_message_type, PlannedPath,
};

#[cfg(test)]
mod tests;
