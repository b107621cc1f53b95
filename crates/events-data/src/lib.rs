//! events-data crate
//!
//! Loading of contract event exports into immutable in-memory tables and
//! CSV report writing.

pub mod loader;
pub mod report;
pub mod types;

pub use loader::load_events;
pub use report::{BatchBuilder, ReportWriter};
pub use types::{EventRecord, EventTables, RawEventRow};
