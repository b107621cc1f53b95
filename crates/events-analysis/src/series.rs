//! Chart series aggregation.
//!
//! Pure group/count/pivot steps that feed the bar charts. Rendering lives in
//! the CLI; everything here is plain data so it can be tested directly.

use std::collections::{BTreeMap, BTreeSet};

use events_data::{EventRecord, EventTables};
use serde::Serialize;

/// Event count of one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Wide count table: one row per row category, one column per column category.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PivotTable {
    /// Row categories, ascending.
    pub rows: Vec<String>,
    /// Column categories, ascending.
    pub columns: Vec<String>,
    /// `values[row][column]`; zero where the combination does not occur.
    pub values: Vec<Vec<u64>>,
}

impl PivotTable {
    /// Largest cell value, or zero for an empty table.
    pub fn max_value(&self) -> u64 {
        self.values
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

/// Data for one chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ChartData {
    /// One bar per category.
    Simple(Vec<CategoryCount>),
    /// One bar group per pivot row, one bar per pivot column.
    Grouped {
        pivot: PivotTable,
        legend_title: String,
    },
}

/// A chart to render: output file, labels and data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSpec {
    pub file_name: &'static str,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub data: ChartData,
}

/// Counts records per key, ordered by count descending then key ascending.
pub fn count_by<'a, I, F>(records: I, key: F) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = &'a EventRecord>,
    F: Fn(&'a EventRecord) -> &'a str,
{
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records {
        *counts.entry(key(record)).or_insert(0) += 1;
    }

    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Counts records per `(row_key, column_key)` and pivots into a wide table.
pub fn pivot_counts<'a, I, R, C>(records: I, row_key: R, column_key: C) -> PivotTable
where
    I: IntoIterator<Item = &'a EventRecord>,
    R: Fn(&'a EventRecord) -> &'a str,
    C: Fn(&'a EventRecord) -> &'a str,
{
    let mut counts: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    let mut columns: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        let column = column_key(record);
        columns.insert(column);
        *counts.entry((row_key(record), column)).or_insert(0) += 1;
    }

    let columns: Vec<&str> = columns.into_iter().collect();
    let column_index: BTreeMap<&str, usize> =
        columns.iter().enumerate().map(|(i, c)| (*c, i)).collect();

    let mut rows: Vec<String> = Vec::new();
    let mut values: Vec<Vec<u64>> = Vec::new();
    for ((row, column), count) in counts {
        if rows.last().map(String::as_str) != Some(row) {
            rows.push(row.to_string());
            values.push(vec![0; columns.len()]);
        }
        if let Some(cells) = values.last_mut() {
            cells[column_index[column]] = count;
        }
    }

    PivotTable {
        rows,
        columns: columns.into_iter().map(str::to_string).collect(),
        values,
    }
}

/// The four standard charts.
pub fn chart_specs(tables: &EventTables) -> Vec<ChartSpec> {
    vec![
        ChartSpec {
            file_name: "1.event_type_counts.png",
            title: "Event Count by Type",
            x_label: "Event Type",
            y_label: "Event Count",
            data: ChartData::Simple(count_by(&tables.confirmed, |e| e.event_type.as_str())),
        },
        ChartSpec {
            file_name: "2.contracts_event_counts.png",
            title: "Event Count by Contract",
            x_label: "Contract Name",
            y_label: "Event Count",
            data: ChartData::Simple(count_by(&tables.confirmed, |e| {
                e.contract_address.as_str()
            })),
        },
        ChartSpec {
            file_name: "3.contract_status_counts.png",
            title: "Event Count by Contract and Status",
            x_label: "Contract Address",
            y_label: "Event Count",
            data: ChartData::Grouped {
                pivot: pivot_counts(
                    &tables.raw,
                    |e| e.contract_address.as_str(),
                    |e| e.status.as_str(),
                ),
                legend_title: "Status".to_string(),
            },
        },
        ChartSpec {
            file_name: "4.contract_sender_counts.png",
            title: "Event Count by Contract and Sender",
            x_label: "Contract Address",
            y_label: "Event Count",
            data: ChartData::Grouped {
                pivot: pivot_counts(
                    &tables.confirmed,
                    |e| e.contract_address.as_str(),
                    |e| e.sender.as_str(),
                ),
                legend_title: "Sender".to_string(),
            },
        },
    ]
}
