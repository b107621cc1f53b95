//! CSV ingestion for contract event exports.
//!
//! Every column is read as nullable text through the Arrow CSV reader and
//! coerced in one place ([`EventRecord::from_row`]), so a malformed row fails
//! with its row number and column instead of deep inside an analysis.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use eyre::{eyre, Context, Result};
use tracing::{debug, info};

use crate::types::{EventRecord, EventTables, RawEventRow};

/// Columns the export must contain. Any other column is ignored.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "event_id",
    "previous_event_id",
    "contract_address",
    "sender",
    "event_type",
    "block_number",
    "block_timestamp",
    "tx_hash",
    "status",
];

/// Rows per Arrow record batch.
const BATCH_SIZE: usize = 8192;

/// Loads the export at `path` and derives the confirmed view.
///
/// # Errors
/// Returns error if the file cannot be opened, a required column is missing,
/// or any row fails type coercion.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_events(path: &Path) -> Result<EventTables> {
    let records = read_events(path)?;
    let tables = EventTables::from_records(records);

    info!(
        rows = tables.raw.len(),
        confirmed = tables.confirmed.len(),
        "loaded contract events"
    );

    Ok(tables)
}

/// Reads every row of the export at `path` into typed records, in file order.
///
/// # Errors
/// Returns error if the file cannot be opened or parsed, a required column is
/// missing, or a row fails coercion.
pub fn read_events(path: &Path) -> Result<Vec<EventRecord>> {
    let mut file =
        File::open(path).wrap_err_with(|| format!("failed to open {}", path.display()))?;

    let format = Format::default().with_header(true);
    let (inferred, _) = format
        .infer_schema(&mut file, Some(1))
        .wrap_err_with(|| format!("failed to read CSV header from {}", path.display()))?;

    for column in REQUIRED_COLUMNS {
        if inferred.field_with_name(column).is_err() {
            return Err(eyre!(
                "missing required column '{column}' in {}",
                path.display()
            ));
        }
    }

    // Read everything as text; coercion happens per row.
    let schema = Schema::new(
        inferred
            .fields()
            .iter()
            .map(|field| Field::new(field.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    );

    file.rewind()
        .wrap_err_with(|| format!("failed to rewind {}", path.display()))?;

    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .build(file)
        .wrap_err("failed to build CSV reader")?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.wrap_err_with(|| format!("failed to parse {}", path.display()))?;
        debug!(rows = batch.num_rows(), "read record batch");
        append_batch(&batch, &mut records)?;
    }

    Ok(records)
}

fn text_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| eyre!("missing required column '{name}'"))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| eyre!("column '{name}' was not read as text"))
}

fn cell(column: &StringArray, index: usize) -> Option<&str> {
    if column.is_null(index) {
        None
    } else {
        Some(column.value(index))
    }
}

fn append_batch(batch: &RecordBatch, records: &mut Vec<EventRecord>) -> Result<()> {
    let event_id = text_column(batch, "event_id")?;
    let previous_event_id = text_column(batch, "previous_event_id")?;
    let contract_address = text_column(batch, "contract_address")?;
    let sender = text_column(batch, "sender")?;
    let event_type = text_column(batch, "event_type")?;
    let block_number = text_column(batch, "block_number")?;
    let block_timestamp = text_column(batch, "block_timestamp")?;
    let tx_hash = text_column(batch, "tx_hash")?;
    let status = text_column(batch, "status")?;

    records.reserve(batch.num_rows());
    for i in 0..batch.num_rows() {
        let raw = RawEventRow {
            event_id: cell(event_id, i),
            previous_event_id: cell(previous_event_id, i),
            contract_address: cell(contract_address, i),
            sender: cell(sender, i),
            event_type: cell(event_type, i),
            block_number: cell(block_number, i),
            block_timestamp: cell(block_timestamp, i),
            tx_hash: cell(tx_hash, i),
            status: cell(status, i),
        };
        let row = records.len() + 1;
        records.push(EventRecord::from_row(row, &raw)?);
    }

    Ok(())
}
