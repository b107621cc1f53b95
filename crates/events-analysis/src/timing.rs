//! Inter-event timing histogram across the whole export.
//!
//! Uses the raw table (every status) in global timestamp order, not per
//! contract. Evenly spaced intervals dominating the histogram hint at
//! scheduled, bot-like senders.

use std::collections::BTreeMap;

use arrow::record_batch::RecordBatch;
use chrono::TimeDelta;
use eyre::Result;
use events_data::{BatchBuilder, EventRecord, EventTables};

use crate::temporal::delta_seconds;

/// Output file for the interval histogram.
pub const INTERVAL_HISTOGRAM_REPORT: &str = "bonus2_seconds_between_events.csv";

/// Number of consecutive event pairs separated by exactly `seconds`.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalBucket {
    pub seconds: f64,
    pub count: u64,
}

/// Histogram of exact gaps between consecutive events, ordered by gap.
///
/// The first event in time order has no predecessor and contributes nothing.
pub fn inter_event_histogram(tables: &EventTables) -> Vec<IntervalBucket> {
    let mut ordered: Vec<&EventRecord> = tables.raw.iter().collect();
    ordered.sort_by_key(|e| e.block_timestamp);

    let mut buckets: BTreeMap<TimeDelta, u64> = BTreeMap::new();
    for pair in ordered.windows(2) {
        let gap = pair[1].block_timestamp - pair[0].block_timestamp;
        *buckets.entry(gap).or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|(gap, count)| IntervalBucket {
            seconds: delta_seconds(gap),
            count,
        })
        .collect()
}

/// Builds the histogram report batch.
///
/// # Errors
/// Returns error if the batch cannot be assembled.
pub fn histogram_batch(rows: &[IntervalBucket]) -> Result<RecordBatch> {
    BatchBuilder::new()
        .float64(
            "seconds_since_last_block",
            rows.iter().map(|r| Some(r.seconds)),
        )
        .uint64("count", rows.iter().map(|r| r.count))
        .build()
}
