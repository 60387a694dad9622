use crate::cell::CellValue;
use crate::grid::Grid;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Number,
    Date,
    Boolean,
    Text,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%d %b %Y", "%d %B %Y", "%Y/%m/%d"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Parse the date shapes the inferencer recognises. Numbers are never dates.
pub fn parse_date(value: &CellValue) -> Option<NaiveDate> {
    let CellValue::Text(s) = value else {
        return None;
    };
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

pub fn is_boolean(value: &CellValue) -> bool {
    match value {
        CellValue::Bool(_) => true,
        CellValue::Text(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "false" | "yes" | "no"
        ),
        _ => false,
    }
}

/// Infer one type per column from the data rows. Classes are tried in the
/// order number, date, boolean; the first whose share of non-empty samples
/// is strictly above `threshold` wins, otherwise the column is text.
pub fn infer_column_types(grid: &Grid, threshold: f64) -> Vec<ColumnType> {
    (0..grid.column_count())
        .map(|col| {
            let samples: Vec<&CellValue> = grid
                .data_rows()
                .iter()
                .filter_map(|row| row.get(col))
                .filter(|v| !v.is_empty())
                .collect();
            infer_type(&samples, threshold)
        })
        .collect()
}

fn infer_type(samples: &[&CellValue], threshold: f64) -> ColumnType {
    if samples.is_empty() {
        ColumnType::Text
    } else if share(samples, |v| v.as_number().is_some()) > threshold {
        ColumnType::Number
    } else if share(samples, |v| parse_date(v).is_some()) > threshold {
        ColumnType::Date
    } else if share(samples, is_boolean) > threshold {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    }
}

fn share(samples: &[&CellValue], pred: impl Fn(&CellValue) -> bool) -> f64 {
    samples.iter().filter(|&&v| pred(v)).count() as f64 / samples.len() as f64
}
