//! CSV report output.
//!
//! Reports are assembled as Arrow record batches with [`BatchBuilder`] and
//! written by [`ReportWriter`] into a single output directory. Existing files
//! are overwritten.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray, UInt64Array};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDateTime, Timelike};
use eyre::{Context, Result};
use tracing::debug;

/// Writes report files into one output directory.
#[derive(Clone, Debug)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    /// Creates the writer, creating `output_dir` if it does not exist.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn create(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).wrap_err_with(|| {
            format!(
                "failed to create output directory: {}",
                output_dir.display()
            )
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Full path of a report file inside the output directory.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// Writes `batch` as CSV with a header row and returns the file path.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or written.
    pub fn write_batch(&self, file_name: &str, batch: &RecordBatch) -> Result<PathBuf> {
        let path = self.path_for(file_name);
        let file = File::create(&path)
            .wrap_err_with(|| format!("failed to create report: {}", path.display()))?;

        let mut writer = WriterBuilder::new().with_header(true).build(file);
        writer
            .write(batch)
            .wrap_err_with(|| format!("failed to write report: {}", path.display()))?;

        debug!(path = %path.display(), rows = batch.num_rows(), "wrote report");
        Ok(path)
    }
}

/// Column-by-column builder for report record batches.
#[derive(Default)]
pub struct BatchBuilder {
    fields: Vec<Field>,
    columns: Vec<ArrayRef>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &str, data_type: DataType, nullable: bool, column: ArrayRef) -> Self {
        self.fields.push(Field::new(name, data_type, nullable));
        self.columns.push(column);
        self
    }

    pub fn text<I, S>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let column = Arc::new(StringArray::from_iter_values(values));
        self.push(name, DataType::Utf8, false, column)
    }

    /// Text column where `None` is written as an empty cell.
    pub fn optional_text<I, S>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let column = Arc::new(values.into_iter().collect::<StringArray>());
        self.push(name, DataType::Utf8, true, column)
    }

    pub fn int64<I>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let column = Arc::new(Int64Array::from_iter_values(values));
        self.push(name, DataType::Int64, false, column)
    }

    pub fn uint64<I>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let column = Arc::new(UInt64Array::from_iter_values(values));
        self.push(name, DataType::UInt64, false, column)
    }

    /// Float column where `None` is written as an empty cell.
    pub fn float64<I>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let column = Arc::new(values.into_iter().collect::<Float64Array>());
        self.push(name, DataType::Float64, true, column)
    }

    /// Timestamp column rendered with [`format_timestamp`].
    pub fn timestamps<'a, I>(self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = &'a NaiveDateTime>,
    {
        self.text(name, values.into_iter().map(format_timestamp))
    }

    /// Assembles the batch.
    ///
    /// # Errors
    /// Returns error if the columns have different lengths.
    pub fn build(self) -> Result<RecordBatch> {
        RecordBatch::try_new(Arc::new(Schema::new(self.fields)), self.columns)
            .wrap_err("failed to assemble report batch")
    }
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS`, adding fractional seconds
/// only when they are non-zero.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}
