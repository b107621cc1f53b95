//! Orphan event detection.
//!
//! An orphan is a confirmed event whose `previous_event_id` does not name any
//! confirmed event. Membership is checked against the whole confirmed table,
//! not per contract: a predecessor emitted by another contract still resolves
//! the reference.

use std::collections::HashSet;

use arrow::record_batch::RecordBatch;
use eyre::Result;
use events_data::{BatchBuilder, EventRecord, EventTables};

/// Output file for the orphan report.
pub const ORPHANS_REPORT: &str = "task1_result.csv";

/// Report projection shared by the orphan and unconfirmed-predecessor reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrphanEvent {
    pub event_id: String,
    /// Always present: events without a predecessor are never orphans.
    pub previous_event_id: String,
    pub contract_address: String,
    pub event_type: String,
    pub block_number: i64,
}

impl OrphanEvent {
    fn project(record: &EventRecord, previous_event_id: &str) -> Self {
        Self {
            event_id: record.event_id.clone(),
            previous_event_id: previous_event_id.to_string(),
            contract_address: record.contract_address.clone(),
            event_type: record.event_type.clone(),
            block_number: record.block_number,
        }
    }
}

/// Set of every confirmed `event_id`.
pub fn confirmed_ids(tables: &EventTables) -> HashSet<&str> {
    tables
        .confirmed
        .iter()
        .map(|e| e.event_id.as_str())
        .collect()
}

/// Confirmed events with a predecessor reference, paired with that reference,
/// whose predecessor is not a confirmed event. Input order is preserved.
pub(crate) fn unresolved_references<'a>(
    tables: &'a EventTables,
    confirmed: &HashSet<&str>,
) -> Vec<(&'a EventRecord, &'a str)> {
    tables
        .confirmed
        .iter()
        .filter_map(|e| e.previous_event_id.as_deref().map(|prev| (e, prev)))
        .filter(|(_, prev)| !confirmed.contains(prev))
        .collect()
}

/// Projects a filtered reference list into report rows.
pub(crate) fn project_all(refs: &[(&EventRecord, &str)]) -> Vec<OrphanEvent> {
    refs.iter()
        .map(|(record, prev)| OrphanEvent::project(record, prev))
        .collect()
}

/// Finds confirmed events whose declared predecessor is not a confirmed event.
pub fn find_orphans(tables: &EventTables) -> Vec<OrphanEvent> {
    let confirmed = confirmed_ids(tables);
    project_all(&unresolved_references(tables, &confirmed))
}

/// Builds the `{event_id, previous_event_id, contract_address, event_type,
/// block_number}` report batch.
///
/// # Errors
/// Returns error if the batch cannot be assembled.
pub fn orphan_batch(rows: &[OrphanEvent]) -> Result<RecordBatch> {
    BatchBuilder::new()
        .text("event_id", rows.iter().map(|r| &r.event_id))
        .text("previous_event_id", rows.iter().map(|r| &r.previous_event_id))
        .text("contract_address", rows.iter().map(|r| &r.contract_address))
        .text("event_type", rows.iter().map(|r| &r.event_type))
        .int64("block_number", rows.iter().map(|r| r.block_number))
        .build()
}
