//! Record factories for unit tests.

use chrono::{DateTime, NaiveDateTime};
use events_data::EventRecord;

/// Base timestamp for synthetic events (2024-01-01T00:00:00Z).
pub const BASE_TS: i64 = 1_704_067_200;

pub fn ts(offset_s: i64) -> NaiveDateTime {
    DateTime::from_timestamp(BASE_TS + offset_s, 0)
        .expect("timestamp in range")
        .naive_utc()
}

/// Confirmed event with the given id, predecessor, contract and time offset.
pub fn event(id: &str, prev: Option<&str>, contract: &str, offset_s: i64) -> EventRecord {
    EventRecord {
        event_id: id.to_string(),
        previous_event_id: prev.map(str::to_string),
        contract_address: contract.to_string(),
        sender: "0xsender".to_string(),
        event_type: "Transfer".to_string(),
        block_number: 1_000 + offset_s,
        block_timestamp: ts(offset_s),
        tx_hash: format!("0xtx{id}"),
        status: "Confirmed".to_string(),
    }
}

pub fn with_status(mut record: EventRecord, status: &str) -> EventRecord {
    record.status = status.to_string();
    record
}

pub fn with_sender(mut record: EventRecord, sender: &str) -> EventRecord {
    record.sender = sender.to_string();
    record
}
