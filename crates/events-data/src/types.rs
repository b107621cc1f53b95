//! Type definitions for contract event records and the base tables built from them.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};

/// Status value marking an event as part of the canonical chain.
pub const CONFIRMED_STATUS: &str = "Confirmed";

/// Text forms treated as "no predecessor" in the `previous_event_id` column.
///
/// Matches the missing-value spellings common CSV exporters write.
const ABSENT_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One contract event row after type coercion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier (kept as text).
    pub event_id: String,
    /// Identifier of the causally preceding event; `None` for a chain's genesis event.
    pub previous_event_id: Option<String>,
    /// Address of the contract that emitted the event.
    pub contract_address: String,
    /// Sender address.
    pub sender: String,
    /// Categorical event type, e.g. `"Transfer"`.
    pub event_type: String,
    /// Block number containing the event.
    pub block_number: i64,
    /// Block timestamp normalized to UTC.
    pub block_timestamp: NaiveDateTime,
    /// Transaction hash that emitted the event.
    pub tx_hash: String,
    /// Finality status, e.g. `"Confirmed"` or `"Pending"`.
    pub status: String,
}

/// Borrowed, untyped view of one CSV row as read from the export.
///
/// Each field is `None` when the cell is null.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawEventRow<'a> {
    pub event_id: Option<&'a str>,
    pub previous_event_id: Option<&'a str>,
    pub contract_address: Option<&'a str>,
    pub sender: Option<&'a str>,
    pub event_type: Option<&'a str>,
    pub block_number: Option<&'a str>,
    pub block_timestamp: Option<&'a str>,
    pub tx_hash: Option<&'a str>,
    pub status: Option<&'a str>,
}

impl EventRecord {
    /// Builds a validated record from a raw row.
    ///
    /// `row` is the 1-based data row number used in diagnostics.
    ///
    /// # Errors
    /// Returns error if `event_id` is missing, or if `block_number` or
    /// `block_timestamp` cannot be coerced.
    pub fn from_row(row: usize, raw: &RawEventRow<'_>) -> Result<Self> {
        let event_id = raw
            .event_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| eyre!("row {row}: missing event_id"))?
            .to_string();

        let block_number = match raw.block_number {
            Some(text) => {
                parse_block_number(text).ok_or_else(|| {
                    eyre!("row {row}: invalid block_number '{text}'")
                })?
            }
            None => return Err(eyre!("row {row}: missing block_number")),
        };

        let block_timestamp = match raw.block_timestamp {
            Some(text) => parse_timestamp(text).ok_or_else(|| {
                eyre!("row {row}: invalid block_timestamp '{text}'")
            })?,
            None => return Err(eyre!("row {row}: missing block_timestamp")),
        };

        Ok(Self {
            event_id,
            previous_event_id: normalize_reference(raw.previous_event_id),
            contract_address: text_or_empty(raw.contract_address),
            sender: text_or_empty(raw.sender),
            event_type: text_or_empty(raw.event_type),
            block_number,
            block_timestamp,
            tx_hash: text_or_empty(raw.tx_hash),
            status: text_or_empty(raw.status),
        })
    }

    /// True when the event belongs to the canonical (confirmed) sequence.
    pub fn is_confirmed(&self) -> bool {
        self.status == CONFIRMED_STATUS
    }
}

/// The two immutable base tables every report reads from.
///
/// `confirmed` is an independent copy of the confirmed rows of `raw`,
/// in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventTables {
    pub raw: Vec<EventRecord>,
    pub confirmed: Vec<EventRecord>,
}

impl EventTables {
    /// Builds both tables from the full set of loaded rows.
    pub fn from_records(raw: Vec<EventRecord>) -> Self {
        let confirmed = raw.iter().filter(|e| e.is_confirmed()).cloned().collect();
        Self { raw, confirmed }
    }

    /// Rows of the raw table whose status is not `"Confirmed"`.
    pub fn unconfirmed(&self) -> impl Iterator<Item = &EventRecord> {
        self.raw.iter().filter(|e| !e.is_confirmed())
    }
}

fn text_or_empty(value: Option<&str>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Normalizes a predecessor reference, mapping nulls, blanks and absent
/// markers to `None`.
pub fn normalize_reference(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() || ABSENT_MARKERS.contains(&trimmed) {
        return None;
    }
    Some(trimmed.to_string())
}

fn parse_block_number(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }

    // Exports that passed through a float column write `123.0`.
    let value = trimmed.parse::<f64>().ok()?;
    let in_range = (i64::MIN as f64..i64::MAX as f64).contains(&value);
    if in_range && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

/// Parses a block timestamp into a naive UTC datetime.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` (with optional offset),
/// the same with a `T` separator, and bare dates.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
