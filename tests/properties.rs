//! Invariant checks over a generated event table.

mod common;

use std::collections::{HashMap, HashSet};

use common::*;
use events_analysis::orphans::find_orphans;
use events_analysis::quality::find_unconfirmed_predecessors;
use events_analysis::senders::{dense_rank_desc, rank_sender_activity};
use events_analysis::temporal::{compute_time_deltas, mean};
use events_data::{EventRecord, EventTables};

const STATUSES: [&str; 3] = ["Confirmed", "Pending", "Failed"];

/// Small linear congruential generator for reproducible tables.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) % bound
    }
}

/// Builds `n` events over 4 contracts and 6 senders with mixed statuses,
/// repeated timestamps, and predecessors that are valid, unconfirmed,
/// missing, or absent.
fn generated_tables(seed: u64, n: u64) -> EventTables {
    let mut rng = Lcg(seed);
    let records: Vec<EventRecord> = (0..n)
        .map(|i| {
            let prev = match rng.next(4) {
                0 => None,
                1 => Some(format!("missing-{}", rng.next(5))),
                _ if i > 0 => Some(rng.next(i).to_string()),
                _ => None,
            };
            let status = STATUSES[if rng.next(3) == 0 {
                rng.next(3) as usize
            } else {
                0
            }];
            let mut event = sample_event(
                &i.to_string(),
                prev.as_deref(),
                &format!("C{}", rng.next(4)),
                rng.next(40) as i64 * 6,
                status,
            );
            event.sender = format!("0xs{}", rng.next(6));
            event
        })
        .collect();
    EventTables::from_records(records)
}

#[test]
fn orphan_and_unconfirmed_membership() {
    for seed in 1..=20 {
        let tables = generated_tables(seed, 120);
        let confirmed: HashSet<&str> = tables
            .confirmed
            .iter()
            .map(|e| e.event_id.as_str())
            .collect();
        let unconfirmed: HashSet<&str> = tables
            .unconfirmed()
            .map(|e| e.event_id.as_str())
            .collect();

        let orphans: HashSet<String> = find_orphans(&tables)
            .into_iter()
            .map(|o| o.event_id)
            .collect();
        let unconfirmed_preds: HashSet<String> = find_unconfirmed_predecessors(&tables)
            .into_iter()
            .map(|o| o.event_id)
            .collect();

        for e in &tables.confirmed {
            match &e.previous_event_id {
                Some(prev) => {
                    let missing = !confirmed.contains(prev.as_str());
                    assert_eq!(orphans.contains(&e.event_id), missing, "seed {seed}");
                    assert_eq!(
                        unconfirmed_preds.contains(&e.event_id),
                        missing && unconfirmed.contains(prev.as_str()),
                        "seed {seed}"
                    );
                }
                None => {
                    assert!(!orphans.contains(&e.event_id));
                    assert!(!unconfirmed_preds.contains(&e.event_id));
                }
            }
        }
    }
}

#[test]
fn deltas_skip_first_event_and_match_summary() {
    for seed in 1..=20 {
        let tables = generated_tables(seed, 150);
        let report = compute_time_deltas(&tables);

        let mut first_per_contract: HashMap<&str, &EventRecord> = HashMap::new();
        let mut ordered: Vec<&EventRecord> = tables.confirmed.iter().collect();
        ordered.sort_by(|a, b| {
            a.contract_address
                .cmp(&b.contract_address)
                .then(a.block_timestamp.cmp(&b.block_timestamp))
        });
        for e in &ordered {
            first_per_contract
                .entry(e.contract_address.as_str())
                .or_insert(*e);
        }

        for delta in &report.deltas {
            assert!(delta.seconds_since_last_event >= 0.0, "seed {seed}");
            let first = first_per_contract[delta.contract_address.as_str()];
            assert_ne!(delta.event_id, first.event_id, "seed {seed}");
        }
        assert_eq!(
            report.deltas.len(),
            tables.confirmed.len() - first_per_contract.len()
        );

        for summary in &report.summaries {
            let listed: Vec<f64> = report
                .deltas
                .iter()
                .filter(|d| d.contract_address == summary.contract_address)
                .map(|d| d.seconds_since_last_event)
                .collect();
            assert_eq!(summary.avg_seconds_between_events, mean(&listed));

            let confirmed_count = tables
                .confirmed
                .iter()
                .filter(|e| e.contract_address == summary.contract_address)
                .count() as u64;
            assert_eq!(summary.event_count, confirmed_count);
        }
    }
}

#[test]
fn sender_ranks_are_dense_within_contracts() {
    assert_eq!(dense_rank_desc(&[10, 10, 7, 3]), vec![1, 1, 2, 3]);

    for seed in 1..=20 {
        let tables = generated_tables(seed, 200);
        let ranked = rank_sender_activity(&tables);

        let mut by_contract: HashMap<&str, Vec<(u64, u32)>> = HashMap::new();
        for row in &ranked {
            by_contract
                .entry(row.contract_address.as_str())
                .or_default()
                .push((row.event_count, row.rank_in_sender_activity));
        }

        for rows in by_contract.values() {
            // Rows arrive in rank order; ranks start at 1 and never skip.
            assert_eq!(rows[0].1, 1);
            for pair in rows.windows(2) {
                let ((count_a, rank_a), (count_b, rank_b)) = (pair[0], pair[1]);
                if count_a == count_b {
                    assert_eq!(rank_a, rank_b);
                } else {
                    assert!(count_a > count_b);
                    assert_eq!(rank_b, rank_a + 1);
                }
            }
        }

        let total: u64 = ranked.iter().map(|r| r.event_count).sum();
        assert_eq!(total, tables.confirmed.len() as u64);
    }
}
