//! Data-quality checks: transaction hash reuse and predecessors that exist
//! only as non-confirmed events.

use std::collections::{BTreeMap, HashSet};

use arrow::record_batch::RecordBatch;
use eyre::Result;
use events_data::{BatchBuilder, EventTables};

use crate::orphans::{confirmed_ids, project_all, unresolved_references, OrphanEvent};

/// Output file for transaction hash usage counts.
pub const TX_HASH_REUSE_REPORT: &str = "bonus1_tx_hash_reuse.csv";
/// Output file for confirmed events whose predecessor is unconfirmed.
pub const UNCONFIRMED_PREDECESSOR_REPORT: &str = "bonus1_previous_event_unconfirmed.csv";

/// Number of confirmed events carrying one transaction hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxHashUsage {
    pub tx_hash: String,
    pub tx_count: u64,
}

/// Counts confirmed events per `tx_hash`, ordered by hash.
pub fn tx_hash_reuse(tables: &EventTables) -> Vec<TxHashUsage> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for event in &tables.confirmed {
        *counts.entry(event.tx_hash.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(tx_hash, tx_count)| TxHashUsage {
            tx_hash: tx_hash.to_string(),
            tx_count,
        })
        .collect()
}

/// Mean events per hash; `None` when there are no hashes.
pub fn mean_tx_hash_usage(usage: &[TxHashUsage]) -> Option<f64> {
    if usage.is_empty() {
        return None;
    }
    let total: u64 = usage.iter().map(|u| u.tx_count).sum();
    Some(total as f64 / usage.len() as f64)
}

/// Orphans whose predecessor does exist, but only as a non-confirmed event.
///
/// This separates "predecessor exists but was not confirmed" from the truly
/// missing predecessors reported by [`crate::orphans::find_orphans`].
pub fn find_unconfirmed_predecessors(tables: &EventTables) -> Vec<OrphanEvent> {
    let confirmed = confirmed_ids(tables);
    let unconfirmed: HashSet<&str> = tables
        .unconfirmed()
        .map(|e| e.event_id.as_str())
        .collect();

    let refs: Vec<_> = unresolved_references(tables, &confirmed)
        .into_iter()
        .filter(|(_, prev)| unconfirmed.contains(prev))
        .collect();
    project_all(&refs)
}

/// Builds the tx hash usage report batch.
///
/// # Errors
/// Returns error if the batch cannot be assembled.
pub fn tx_hash_batch(rows: &[TxHashUsage]) -> Result<RecordBatch> {
    BatchBuilder::new()
        .text("tx_hash", rows.iter().map(|r| &r.tx_hash))
        .uint64("tx_count", rows.iter().map(|r| r.tx_count))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orphans::find_orphans;
    use crate::testutil::{event, with_status};

    #[test]
    fn counts_hash_reuse_among_confirmed() {
        let mut a = event("1", None, "X", 0);
        let mut b = event("2", None, "X", 1);
        let mut c = with_status(event("3", None, "X", 2), "Pending");
        a.tx_hash = "0xbb".to_string();
        b.tx_hash = "0xbb".to_string();
        c.tx_hash = "0xbb".to_string();
        let mut d = event("4", None, "X", 3);
        d.tx_hash = "0xaa".to_string();

        let usage = tx_hash_reuse(&EventTables::from_records(vec![a, b, c, d]));
        assert_eq!(
            usage,
            vec![
                TxHashUsage {
                    tx_hash: "0xaa".to_string(),
                    tx_count: 1
                },
                TxHashUsage {
                    tx_hash: "0xbb".to_string(),
                    tx_count: 2
                },
            ]
        );
        assert_eq!(mean_tx_hash_usage(&usage), Some(1.5));
        assert_eq!(mean_tx_hash_usage(&[]), None);
    }

    #[test]
    fn separates_unconfirmed_from_missing_predecessors() {
        let tables = EventTables::from_records(vec![
            event("1", None, "X", 0),
            with_status(event("2", Some("1"), "X", 10), "Pending"),
            event("3", Some("2"), "X", 20),
            event("4", Some("404"), "X", 30),
            event("5", Some("1"), "Y", 40),
        ]);

        let orphans: Vec<String> = find_orphans(&tables)
            .into_iter()
            .map(|o| o.event_id)
            .collect();
        assert_eq!(orphans, vec!["3", "4"]);

        let unconfirmed = find_unconfirmed_predecessors(&tables);
        assert_eq!(unconfirmed.len(), 1);
        assert_eq!(unconfirmed[0].event_id, "3");
        assert_eq!(unconfirmed[0].previous_event_id, "2");
    }

    #[test]
    fn confirmed_duplicate_of_unconfirmed_id_resolves() {
        // The same id appears as both a pending and a confirmed row.
        let tables = EventTables::from_records(vec![
            with_status(event("1", None, "X", 0), "Pending"),
            event("1", None, "X", 5),
            event("2", Some("1"), "X", 10),
        ]);

        assert!(find_unconfirmed_predecessors(&tables).is_empty());
        assert!(find_orphans(&tables).is_empty());
    }
}
