//! Sender activity ranking within each contract.

use std::collections::{BTreeMap, HashMap};

use arrow::record_batch::RecordBatch;
use eyre::Result;
use events_data::{BatchBuilder, EventTables};

/// Output file for the ranked sender activity table.
pub const SENDER_ACTIVITY_REPORT: &str = "task3_sender_mapping_in_contracts.csv";

/// Confirmed-event volume of one sender on one contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderActivity {
    pub sender: String,
    pub contract_address: String,
    pub event_count: u64,
    /// Dense rank by descending `event_count` within the contract (1 = most active).
    pub rank_in_sender_activity: u32,
}

/// Dense ranking of `counts` in descending order.
///
/// Equal counts share a rank and the next distinct count gets the previous
/// rank plus one: `[10, 10, 7, 3]` ranks as `[1, 1, 2, 3]`.
pub fn dense_rank_desc(counts: &[u64]) -> Vec<u32> {
    let mut distinct: Vec<u64> = counts.to_vec();
    distinct.sort_unstable_by(|a, b| b.cmp(a));
    distinct.dedup();

    let rank_of: HashMap<u64, u32> = distinct
        .iter()
        .enumerate()
        .map(|(i, count)| (*count, i as u32 + 1))
        .collect();

    counts.iter().map(|count| rank_of[count]).collect()
}

/// Counts confirmed events per `(sender, contract)` and ranks senders within
/// each contract.
///
/// Output is ordered by contract ascending, then rank ascending; senders that
/// share a rank stay in ascending sender order.
pub fn rank_sender_activity(tables: &EventTables) -> Vec<SenderActivity> {
    let mut counts: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for event in &tables.confirmed {
        *counts
            .entry((event.sender.as_str(), event.contract_address.as_str()))
            .or_insert(0) += 1;
    }

    // Group-key order: sender, then contract.
    let mut rows: Vec<SenderActivity> = counts
        .into_iter()
        .map(|((sender, contract), event_count)| SenderActivity {
            sender: sender.to_string(),
            contract_address: contract.to_string(),
            event_count,
            rank_in_sender_activity: 0,
        })
        .collect();

    let mut by_contract: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        by_contract
            .entry(row.contract_address.clone())
            .or_default()
            .push(i);
    }
    for indices in by_contract.values() {
        let contract_counts: Vec<u64> = indices.iter().map(|&i| rows[i].event_count).collect();
        for (&i, rank) in indices.iter().zip(dense_rank_desc(&contract_counts)) {
            rows[i].rank_in_sender_activity = rank;
        }
    }

    rows.sort_by(|a, b| {
        a.contract_address
            .cmp(&b.contract_address)
            .then(a.rank_in_sender_activity.cmp(&b.rank_in_sender_activity))
    });
    rows
}

/// Largest number of confirmed events sharing one block.
///
/// When every block holds a single event, block-level sender mapping carries
/// no information and activity is ranked per contract instead.
pub fn max_events_per_block(tables: &EventTables) -> usize {
    let mut per_block: HashMap<i64, usize> = HashMap::new();
    for event in &tables.confirmed {
        *per_block.entry(event.block_number).or_insert(0) += 1;
    }
    per_block.into_values().max().unwrap_or(0)
}

/// Builds the ranked sender activity report batch.
///
/// # Errors
/// Returns error if the batch cannot be assembled.
pub fn sender_activity_batch(rows: &[SenderActivity]) -> Result<RecordBatch> {
    BatchBuilder::new()
        .text("sender", rows.iter().map(|r| &r.sender))
        .text("contract_address", rows.iter().map(|r| &r.contract_address))
        .uint64("event_count", rows.iter().map(|r| r.event_count))
        .uint64(
            "rank_in_sender_activity",
            rows.iter().map(|r| u64::from(r.rank_in_sender_activity)),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{event, with_sender, with_status};
    use events_data::EventRecord;

    fn events_for(sender: &str, contract: &str, n: usize, start: i64) -> Vec<EventRecord> {
        (0..n)
            .map(|i| {
                let id = format!("{sender}-{contract}-{i}");
                with_sender(event(&id, None, contract, start + i as i64), sender)
            })
            .collect()
    }

    #[test]
    fn dense_rank_shares_ties_without_gaps() {
        assert_eq!(dense_rank_desc(&[10, 10, 7, 3]), vec![1, 1, 2, 3]);
        assert_eq!(dense_rank_desc(&[3, 7, 10, 10]), vec![3, 2, 1, 1]);
        assert_eq!(dense_rank_desc(&[5]), vec![1]);
        assert!(dense_rank_desc(&[]).is_empty());
    }

    #[test]
    fn ranks_within_each_contract() {
        let mut records = Vec::new();
        records.extend(events_for("0xd", "C1", 10, 0));
        records.extend(events_for("0xa", "C1", 10, 100));
        records.extend(events_for("0xc", "C1", 7, 200));
        records.extend(events_for("0xb", "C1", 3, 300));
        records.extend(events_for("0xa", "C0", 1, 400));

        let tables = EventTables::from_records(records);
        let ranked = rank_sender_activity(&tables);

        let rows: Vec<(&str, &str, u64, u32)> = ranked
            .iter()
            .map(|r| {
                (
                    r.contract_address.as_str(),
                    r.sender.as_str(),
                    r.event_count,
                    r.rank_in_sender_activity,
                )
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("C0", "0xa", 1, 1),
                ("C1", "0xa", 10, 1),
                ("C1", "0xd", 10, 1),
                ("C1", "0xc", 7, 2),
                ("C1", "0xb", 3, 3),
            ]
        );
    }

    #[test]
    fn only_confirmed_events_are_counted() {
        let mut records = events_for("0xa", "C1", 2, 0);
        records.push(with_status(
            with_sender(event("p", None, "C1", 50), "0xa"),
            "Pending",
        ));

        let ranked = rank_sender_activity(&EventTables::from_records(records));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].event_count, 2);
    }

    #[test]
    fn block_occupancy_counts_confirmed_events() {
        let mut a = event("1", None, "X", 0);
        let mut b = event("2", None, "Y", 1);
        a.block_number = 7;
        b.block_number = 7;
        let c = event("3", None, "X", 2);

        let tables = EventTables::from_records(vec![a, b, c]);
        assert_eq!(max_events_per_block(&tables), 2);
        assert_eq!(max_events_per_block(&EventTables::default()), 0);
    }
}
