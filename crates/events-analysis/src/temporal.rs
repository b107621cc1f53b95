//! Per-contract inter-event timing.
//!
//! Confirmed events are stable-sorted by `(contract_address, block_timestamp)`;
//! events sharing a timestamp within a contract keep their input order. Each
//! event's delta is measured against the previous event of the same contract
//! in that order. The first event of a contract has no delta and is left out
//! of the per-event report, but still counts toward the contract's
//! `event_count`.

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use chrono::{NaiveDateTime, TimeDelta};
use eyre::Result;
use events_data::{BatchBuilder, EventRecord, EventTables};

/// Output file for per-event deltas.
pub const TIME_DELTA_REPORT: &str = "task2_time_delta_result.csv";
/// Output file for per-contract summary statistics.
pub const CONTRACT_SUMMARY_REPORT: &str = "task2_contracts_average_time_delta.csv";

/// Elapsed time since the previous confirmed event of the same contract.
#[derive(Clone, Debug, PartialEq)]
pub struct EventTimeDelta {
    pub event_id: String,
    pub contract_address: String,
    pub event_type: String,
    pub block_timestamp: NaiveDateTime,
    pub seconds_since_last_event: f64,
}

/// Per-contract delta statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct ContractTimingSummary {
    pub contract_address: String,
    /// Confirmed events of the contract (not the number of deltas).
    pub event_count: u64,
    /// `None` when the contract has a single confirmed event.
    pub avg_seconds_between_events: Option<f64>,
    pub median_seconds_between_events: Option<f64>,
}

/// Both outputs of the timing analysis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemporalReport {
    /// Deltas in `(contract_address, block_timestamp)` order.
    pub deltas: Vec<EventTimeDelta>,
    /// Summaries ordered by contract address.
    pub summaries: Vec<ContractTimingSummary>,
}

/// Signed seconds from `earlier` to `later`, with sub-second precision.
pub fn seconds_between(earlier: &NaiveDateTime, later: &NaiveDateTime) -> f64 {
    delta_seconds(*later - *earlier)
}

pub(crate) fn delta_seconds(delta: TimeDelta) -> f64 {
    match delta.num_nanoseconds() {
        Some(nanos) => nanos as f64 / 1e9,
        None => delta.num_seconds() as f64,
    }
}

/// Computes per-event deltas and per-contract summaries over confirmed events.
pub fn compute_time_deltas(tables: &EventTables) -> TemporalReport {
    let mut ordered: Vec<&EventRecord> = tables.confirmed.iter().collect();
    // `sort_by` is stable; ties keep input order.
    ordered.sort_by(|a, b| {
        a.contract_address
            .cmp(&b.contract_address)
            .then(a.block_timestamp.cmp(&b.block_timestamp))
    });

    let mut deltas = Vec::new();
    let mut per_contract: BTreeMap<&str, (u64, Vec<f64>)> = BTreeMap::new();
    let mut previous: Option<&EventRecord> = None;

    for event in ordered {
        let entry = per_contract
            .entry(event.contract_address.as_str())
            .or_default();
        entry.0 += 1;

        if let Some(prev) = previous.filter(|p| p.contract_address == event.contract_address) {
            let seconds = seconds_between(&prev.block_timestamp, &event.block_timestamp);
            entry.1.push(seconds);
            deltas.push(EventTimeDelta {
                event_id: event.event_id.clone(),
                contract_address: event.contract_address.clone(),
                event_type: event.event_type.clone(),
                block_timestamp: event.block_timestamp,
                seconds_since_last_event: seconds,
            });
        }
        previous = Some(event);
    }

    let summaries = per_contract
        .into_iter()
        .map(|(contract, (event_count, values))| ContractTimingSummary {
            contract_address: contract.to_string(),
            event_count,
            avg_seconds_between_events: mean(&values),
            median_seconds_between_events: median(&values),
        })
        .collect();

    TemporalReport { deltas, summaries }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Median (average of the two middle values for even lengths); `None` for an
/// empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Builds the per-event delta report batch.
///
/// # Errors
/// Returns error if the batch cannot be assembled.
pub fn time_delta_batch(rows: &[EventTimeDelta]) -> Result<RecordBatch> {
    BatchBuilder::new()
        .text("event_id", rows.iter().map(|r| &r.event_id))
        .text("contract_address", rows.iter().map(|r| &r.contract_address))
        .text("event_type", rows.iter().map(|r| &r.event_type))
        .timestamps("block_timestamp", rows.iter().map(|r| &r.block_timestamp))
        .float64(
            "seconds_since_last_event",
            rows.iter().map(|r| Some(r.seconds_since_last_event)),
        )
        .build()
}

/// Builds the per-contract summary report batch.
///
/// # Errors
/// Returns error if the batch cannot be assembled.
pub fn contract_summary_batch(rows: &[ContractTimingSummary]) -> Result<RecordBatch> {
    BatchBuilder::new()
        .text("contract_address", rows.iter().map(|r| &r.contract_address))
        .uint64("event_count", rows.iter().map(|r| r.event_count))
        .float64(
            "avg_seconds_between_events",
            rows.iter().map(|r| r.avg_seconds_between_events),
        )
        .float64(
            "median_seconds_between_events",
            rows.iter().map(|r| r.median_seconds_between_events),
        )
        .build()
}
