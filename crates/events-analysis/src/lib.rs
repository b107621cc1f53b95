//! events-analysis crate
//!
//! Report computations over the confirmed and raw event tables: orphan
//! detection, per-contract timing, sender ranking, data-quality checks,
//! inter-event timing histogram, and chart series aggregation.

pub mod orphans;
pub mod quality;
pub mod report;
pub mod senders;
pub mod series;
pub mod temporal;
pub mod timing;

#[cfg(test)]
pub(crate) mod testutil;
