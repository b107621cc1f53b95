//! Report stage: runs every analysis over the base tables and writes the CSV
//! reports.
//!
//! Each analysis is a stateless function of `&EventTables`; nothing computed
//! by one report is fed into another.

use std::path::PathBuf;

use eyre::{Context, Result};
use events_data::{EventTables, ReportWriter};
use serde::Serialize;
use tracing::info;

use crate::orphans::{find_orphans, orphan_batch, OrphanEvent, ORPHANS_REPORT};
use crate::quality::{
    find_unconfirmed_predecessors, mean_tx_hash_usage, tx_hash_batch, tx_hash_reuse,
    TxHashUsage, TX_HASH_REUSE_REPORT, UNCONFIRMED_PREDECESSOR_REPORT,
};
use crate::senders::{
    max_events_per_block, rank_sender_activity, sender_activity_batch, SenderActivity,
    SENDER_ACTIVITY_REPORT,
};
use crate::temporal::{
    compute_time_deltas, contract_summary_batch, time_delta_batch, TemporalReport,
    CONTRACT_SUMMARY_REPORT, TIME_DELTA_REPORT,
};
use crate::timing::{
    histogram_batch, inter_event_histogram, IntervalBucket, INTERVAL_HISTOGRAM_REPORT,
};

/// Everything the report stage computed, kept for console summaries.
#[derive(Clone, Debug)]
pub struct AnalysisOutcome {
    pub total_events: usize,
    pub confirmed_events: usize,
    pub orphans: Vec<OrphanEvent>,
    pub temporal: TemporalReport,
    pub max_events_per_block: usize,
    pub sender_activity: Vec<SenderActivity>,
    pub tx_hash_usage: Vec<TxHashUsage>,
    pub unconfirmed_predecessors: Vec<OrphanEvent>,
    pub interval_histogram: Vec<IntervalBucket>,
    /// Report files written, in write order.
    pub written: Vec<PathBuf>,
}

/// Serializable step counts for machine-readable summaries.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_events: usize,
    pub confirmed_events: usize,
    pub orphan_events: usize,
    pub time_delta_rows: usize,
    pub contracts: usize,
    pub max_events_per_block: usize,
    pub sender_contract_pairs: usize,
    pub distinct_tx_hashes: usize,
    pub mean_tx_hash_usage: Option<f64>,
    pub unconfirmed_predecessor_events: usize,
    pub interval_buckets: usize,
    pub reports: Vec<String>,
}

impl AnalysisOutcome {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total_events: self.total_events,
            confirmed_events: self.confirmed_events,
            orphan_events: self.orphans.len(),
            time_delta_rows: self.temporal.deltas.len(),
            contracts: self.temporal.summaries.len(),
            max_events_per_block: self.max_events_per_block,
            sender_contract_pairs: self.sender_activity.len(),
            distinct_tx_hashes: self.tx_hash_usage.len(),
            mean_tx_hash_usage: mean_tx_hash_usage(&self.tx_hash_usage)
                .map(|mean| (mean * 100.0).round() / 100.0),
            unconfirmed_predecessor_events: self.unconfirmed_predecessors.len(),
            interval_buckets: self.interval_histogram.len(),
            reports: self
                .written
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        }
    }
}

/// Runs every analysis and writes each CSV report.
///
/// A failure aborts the stage; reports already written stay on disk.
///
/// # Errors
/// Returns error if any report cannot be built or written.
#[tracing::instrument(skip_all, fields(output_dir = %writer.output_dir().display()))]
pub fn write_reports(tables: &EventTables, writer: &ReportWriter) -> Result<AnalysisOutcome> {
    let mut written = Vec::new();

    let orphans = find_orphans(tables);
    written.push(
        writer
            .write_batch(ORPHANS_REPORT, &orphan_batch(&orphans)?)
            .wrap_err("failed to write orphan report")?,
    );
    info!(orphans = orphans.len(), "orphan detection complete");

    let temporal = compute_time_deltas(tables);
    written.push(
        writer
            .write_batch(TIME_DELTA_REPORT, &time_delta_batch(&temporal.deltas)?)
            .wrap_err("failed to write time delta report")?,
    );
    written.push(
        writer
            .write_batch(
                CONTRACT_SUMMARY_REPORT,
                &contract_summary_batch(&temporal.summaries)?,
            )
            .wrap_err("failed to write contract timing summary")?,
    );
    info!(
        deltas = temporal.deltas.len(),
        contracts = temporal.summaries.len(),
        "time delta analysis complete"
    );

    let max_per_block = max_events_per_block(tables);
    let sender_activity = rank_sender_activity(tables);
    written.push(
        writer
            .write_batch(
                SENDER_ACTIVITY_REPORT,
                &sender_activity_batch(&sender_activity)?,
            )
            .wrap_err("failed to write sender activity report")?,
    );
    info!(
        pairs = sender_activity.len(),
        max_events_per_block = max_per_block,
        "sender ranking complete"
    );

    let tx_hash_usage = tx_hash_reuse(tables);
    written.push(
        writer
            .write_batch(TX_HASH_REUSE_REPORT, &tx_hash_batch(&tx_hash_usage)?)
            .wrap_err("failed to write tx hash reuse report")?,
    );
    let unconfirmed_predecessors = find_unconfirmed_predecessors(tables);
    written.push(
        writer
            .write_batch(
                UNCONFIRMED_PREDECESSOR_REPORT,
                &orphan_batch(&unconfirmed_predecessors)?,
            )
            .wrap_err("failed to write unconfirmed predecessor report")?,
    );
    info!(
        tx_hashes = tx_hash_usage.len(),
        unconfirmed_predecessors = unconfirmed_predecessors.len(),
        "data quality checks complete"
    );

    let interval_histogram = inter_event_histogram(tables);
    written.push(
        writer
            .write_batch(
                INTERVAL_HISTOGRAM_REPORT,
                &histogram_batch(&interval_histogram)?,
            )
            .wrap_err("failed to write interval histogram")?,
    );
    info!(
        buckets = interval_histogram.len(),
        "interval histogram complete"
    );

    Ok(AnalysisOutcome {
        total_events: tables.raw.len(),
        confirmed_events: tables.confirmed.len(),
        orphans,
        temporal,
        max_events_per_block: max_per_block,
        sender_activity,
        tx_hash_usage,
        unconfirmed_predecessors,
        interval_histogram,
        written,
    })
}
