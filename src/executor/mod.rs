//! One executor per intent. Each reads a `Dataset` snapshot and the
//! normalized query text and returns a fresh `QueryResult`.

pub mod aggregate;
pub mod chart;
pub mod comparison;
pub mod filter;
pub mod lookup;
pub mod ranking;
pub mod sales;
pub mod search;

use crate::cell::CellValue;
use crate::engine::Dataset;
use crate::error::{QueryError, Result};
use crate::resolver::{find_column, find_column_in, find_mentioned_index};
use crate::result::QueryResult;
use crate::vocab::SALES_KEYWORDS;
use std::collections::HashMap;

/// Sheet references are resolved by the workbook router before a query
/// reaches a single sheet's snapshot.
pub fn unrouted_sheet(_: &Dataset, _: &str) -> Result<QueryResult> {
    Err(QueryError::UnroutedSheet)
}

/// Running totals over the numeric values of one column.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Stats {
    pub fn push(&mut self, n: f64) {
        self.count += 1;
        self.sum += n;
        self.min = Some(self.min.map_or(n, |m| m.min(n)));
        self.max = Some(self.max.map_or(n, |m| m.max(n)));
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn from_rows<'a, I>(rows: I, col: usize) -> Self
    where
        I: IntoIterator<Item = &'a Vec<CellValue>>,
    {
        let mut stats = Stats::default();
        for n in rows.into_iter().filter_map(|row| row.get(col)?.as_number()) {
            stats.push(n);
        }
        stats
    }
}

/// Rows bucketed by the display value of one column, buckets in order of
/// first appearance.
pub fn group_rows<'a, I>(rows: I, col: usize) -> Vec<(String, Vec<&'a Vec<CellValue>>)>
where
    I: IntoIterator<Item = &'a Vec<CellValue>>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&'a Vec<CellValue>>)> = Vec::new();
    for row in rows {
        let key = row.get(col).map(|v| v.to_string()).unwrap_or_default();
        let key = if key.trim().is_empty() { "(blank)".to_string() } else { key };
        match index.get(&key) {
            Some(&i) => groups[i].1.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![row]));
            }
        }
    }
    groups
}

/// Numeric column a query is about: one it names, else a sales-like
/// numeric column, else the first numeric column.
pub fn numeric_target(ds: &Dataset, query: &str, exclude: Option<usize>) -> Option<usize> {
    let numeric: Vec<usize> = ds
        .numeric_columns()
        .into_iter()
        .filter(|&i| Some(i) != exclude)
        .collect();
    let headers = ds.headers();
    find_mentioned_index(query, headers, &numeric)
        .or_else(|| find_column_in(headers, &numeric, SALES_KEYWORDS))
        .or_else(|| numeric.first().copied())
}

/// First sales-like column holding numbers, so a text column such as
/// `sales rep` is passed over. A sheet without data rows has no typed
/// columns, and any sales-like header will do there.
pub fn sales_column(ds: &Dataset) -> Option<usize> {
    let headers = ds.headers();
    if ds.rows().is_empty() {
        return find_column(headers, SALES_KEYWORDS);
    }
    find_column_in(headers, &ds.numeric_columns(), SALES_KEYWORDS)
}

/// Plural-aware row count for messages.
pub fn rows_label(n: usize) -> String {
    if n == 1 {
        "1 row".to_string()
    } else {
        format!("{} rows", n)
    }
}
