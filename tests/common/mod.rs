//! Shared test helpers and utilities.
//!
//! Provides factory functions for event records and CSV fixtures with
//! sensible defaults.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use events_data::EventRecord;

/// CSV header in the export's column order.
pub const HEADER: &str = "event_id,previous_event_id,contract_address,sender,event_type,block_number,block_timestamp,tx_hash,status";

/// 2024-01-01T00:00:00Z.
pub const BASE_TS: i64 = 1_704_067_200;

/// Timestamp `offset_s` seconds after [`BASE_TS`].
pub fn ts(offset_s: i64) -> NaiveDateTime {
    DateTime::from_timestamp(BASE_TS + offset_s, 0)
        .expect("timestamp in range")
        .naive_utc()
}

/// Creates a sample EventRecord with sensible defaults.
///
/// # Arguments
/// * `id` - Event id
/// * `prev` - Predecessor id, `None` for a genesis event
/// * `contract` - Contract address
/// * `offset_s` - Seconds after [`BASE_TS`]
/// * `status` - Status text, e.g. `"Confirmed"`
///
/// # Example
/// ```ignore
/// let e = sample_event("2", Some("1"), "0xc1", 12, "Confirmed");
/// assert!(e.is_confirmed());
/// ```
pub fn sample_event(
    id: &str,
    prev: Option<&str>,
    contract: &str,
    offset_s: i64,
    status: &str,
) -> EventRecord {
    EventRecord {
        event_id: id.to_string(),
        previous_event_id: prev.map(str::to_string),
        contract_address: contract.to_string(),
        sender: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string(),
        event_type: "Transfer".to_string(),
        block_number: 18_000_000 + offset_s,
        block_timestamp: ts(offset_s),
        tx_hash: format!("0x{:064x}", offset_s),
        status: status.to_string(),
    }
}

/// Writes `rows` (without header) to `contract_events.csv` inside `dir`.
pub fn write_export(dir: &Path, rows: &[&str]) -> PathBuf {
    let path = dir.join("contract_events.csv");
    let mut body = String::from(HEADER);
    body.push('\n');
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    std::fs::write(&path, body).expect("write export");
    path
}

/// Reads a report as header plus data lines.
pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("read report")
        .lines()
        .map(str::to_string)
        .collect()
}
