//! Path planning tests

use super::*;
use crate::types::PartitionGranularity;
use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use test_case::test_case;

fn at(y: i32, m: u32, d: u32, h: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 30, 15).unwrap()
}

#[test_case(PartitionGranularity::Hourly, "orders/2024-03-14-09" ; "hourly")]
#[test_case(PartitionGranularity::Daily, "orders/2024-03-14" ; "daily")]
#[test_case(PartitionGranularity::Weekly, "orders/2024-W11" ; "weekly")]
#[test_case(PartitionGranularity::Monthly, "orders/2024-03" ; "monthly")]
#[test_case(PartitionGranularity::Quarterly, "orders/2024-Q1" ; "quarterly")]
fn test_subfolder(granularity: PartitionGranularity, expected: &str) {
    assert_eq!(subfolder("orders", granularity, at(2024, 3, 14, 9)), expected);
}

#[test_case(1, "Q1")]
#[test_case(3, "Q1")]
#[test_case(4, "Q2")]
#[test_case(9, "Q3")]
#[test_case(10, "Q4")]
#[test_case(12, "Q4")]
fn test_quarter_is_ceiling_of_month_over_three(month: u32, quarter: &str) {
    let bucket = partition_bucket(PartitionGranularity::Quarterly, at(2023, month, 1, 0));
    assert_eq!(bucket, format!("2023-{quarter}"));
}

#[test]
fn test_weekly_uses_iso_week_year() {
    // 2021-01-03 is a Sunday in ISO week 53 of 2020
    assert_eq!(
        partition_bucket(PartitionGranularity::Weekly, at(2021, 1, 3, 12)),
        "2020-W53"
    );
    assert_eq!(
        partition_bucket(PartitionGranularity::Weekly, at(2024, 1, 1, 0)),
        "2024-W01"
    );
}

#[test]
fn test_leaf_filename_shape() {
    let now = Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap();
    let leaf = leaf_filename(now);

    assert!(leaf.starts_with("20240304050607000000000-"));
    assert!(leaf.ends_with(".parquet"));
    // 23 timestamp digits, dash, 32 hex chars, ".parquet"
    assert_eq!(leaf.len(), 23 + 1 + 32 + 8);
}

#[test]
fn test_leaf_filename_unique_within_same_instant() {
    let now = Utc::now();
    let names: HashSet<String> = (0..1000).map(|_| leaf_filename(now)).collect();
    assert_eq!(names.len(), 1000);
}

#[test]
fn test_planned_path_key() {
    let path = PlannedPath::plan("/raw/", "clicks", PartitionGranularity::Daily, at(2024, 3, 14, 9));
    assert_eq!(path.folder, "raw");
    assert_eq!(path.directory(), "raw/clicks/2024-03-14");
    assert!(path.key().starts_with("raw/clicks/2024-03-14/2024031409"));

    let bare = PlannedPath::plan("", "clicks", PartitionGranularity::Monthly, at(2024, 3, 14, 9));
    assert_eq!(bare.directory(), "clicks/2024-03");
}

#[test_case("orders" ; "plain")]
#[test_case("page_view" ; "underscore")]
#[test_case("v2.click-event" ; "dot and dash")]
fn test_valid_message_types(message_type: &str) {
    assert!(validate_message_type(message_type).is_ok());
}

#[test_case("" ; "empty")]
#[test_case("." ; "dot")]
#[test_case(".." ; "dot dot")]
#[test_case("../../escaped" ; "parent traversal")]
#[test_case("a/b" ; "slash")]
#[test_case("a\\b" ; "backslash")]
#[test_case("page view" ; "space")]
#[test_case("100%" ; "percent")]
#[test_case("caf\u{e9}" ; "non ascii")]
fn test_invalid_message_types(message_type: &str) {
    let err = validate_message_type(message_type).unwrap_err();
    assert!(err.is_dropped_message());
}
