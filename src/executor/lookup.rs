//! Region, product and date lookups: find a target value in the query and
//! keep the rows whose matching column contains it.

use super::rows_label;
use crate::cell::CellValue;
use crate::engine::Dataset;
use crate::error::{QueryError, Result};
use crate::resolver::find_column;
use crate::result::{QueryResult, row_result};
use crate::schema::{ColumnType, parse_date};
use crate::vocab::{
    DATE_KEYWORDS, MONTHS, PRODUCT_KEYWORDS, REGION_KEYWORDS, REGION_VALUES, find_vocab_word,
    is_stop_word, keyword_pattern, query_words,
};
use chrono::Datelike;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PRODUCT_TARGET_REGEX: Regex = Regex::new(&format!(
        r"{}\s+(?:(?:is|named|called|=|:)\s*)?([a-z0-9][a-z0-9_\-]*)",
        keyword_pattern(PRODUCT_KEYWORDS)
    ))
    .unwrap();
    static ref QUARTER_REGEX: Regex = Regex::new(r"\bq([1-4])\b").unwrap();
    static ref YEAR_REGEX: Regex = Regex::new(r"\b((?:19|20)[0-9]{2})\b").unwrap();
}

pub fn region(ds: &Dataset, q: &str) -> Result<QueryResult> {
    let col = find_column(ds.headers(), REGION_KEYWORDS).ok_or(QueryError::ColumnNotFound { role: "region" })?;
    let target = find_vocab_word(q, REGION_VALUES);
    Ok(contains_lookup(ds, col, target, "region"))
}

pub fn product(ds: &Dataset, q: &str) -> Result<QueryResult> {
    let col = find_column(ds.headers(), PRODUCT_KEYWORDS).ok_or(QueryError::ColumnNotFound { role: "product" })?;
    let target = PRODUCT_TARGET_REGEX
        .captures(q)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|word| !is_stop_word(word));
    Ok(contains_lookup(ds, col, target, "product"))
}

fn contains_lookup(ds: &Dataset, col: usize, target: Option<&str>, role: &str) -> QueryResult {
    let headers = ds.headers();
    let Some(target) = target else {
        log::debug!("no {} value in query, returning every row", role);
        return row_result(
            format!("No specific {} mentioned; showing all {}", role, rows_label(ds.rows().len())),
            headers,
            ds.rows(),
            Vec::new(),
        );
    };

    let rows: Vec<&Vec<CellValue>> = ds
        .rows()
        .iter()
        .filter(|row| row.get(col).is_some_and(|v| v.contains_lower(target)))
        .collect();
    row_result(
        format!("Found {} where {} matches '{}'", rows_label(rows.len()), headers[col], target),
        headers,
        rows,
        vec![format!("{} = {}", headers[col], target)],
    )
}

/// A calendar constraint taken from the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTarget {
    Month(u32),
    Quarter(u32),
    Year(i32),
}

impl DateTarget {
    fn label(&self) -> String {
        match self {
            DateTarget::Month(m) => MONTHS[*m as usize - 1].0.to_string(),
            DateTarget::Quarter(n) => format!("q{}", n),
            DateTarget::Year(y) => y.to_string(),
        }
    }

    /// Parsed dates compare by calendar field; anything else falls back to
    /// a substring test on the label (and month abbreviation).
    fn matches(&self, value: &CellValue) -> bool {
        if let Some(date) = parse_date(value) {
            return match self {
                DateTarget::Month(m) => date.month() == *m,
                DateTarget::Quarter(n) => (date.month() - 1) / 3 + 1 == *n,
                DateTarget::Year(y) => date.year() == *y,
            };
        }
        match self {
            DateTarget::Month(m) => {
                let (full, abbr) = MONTHS[*m as usize - 1];
                value.contains_lower(full) || value.contains_lower(abbr)
            }
            _ => value.contains_lower(&self.label()),
        }
    }
}

/// Every month, quarter and year named in the query, in that order.
pub fn date_targets(q: &str) -> Vec<DateTarget> {
    let words = query_words(q);
    let mut targets = Vec::new();
    if let Some(i) = MONTHS
        .iter()
        .position(|(full, abbr)| words.contains(full) || words.contains(abbr))
    {
        targets.push(DateTarget::Month(i as u32 + 1));
    }
    if let Some(n) = QUARTER_REGEX.captures(q).and_then(|c| c[1].parse().ok()) {
        targets.push(DateTarget::Quarter(n));
    }
    if let Some(y) = YEAR_REGEX.captures(q).and_then(|c| c[1].parse().ok()) {
        targets.push(DateTarget::Year(y));
    }
    targets
}

pub fn date(ds: &Dataset, q: &str) -> Result<QueryResult> {
    let headers = ds.headers();
    let col = find_column(headers, DATE_KEYWORDS)
        .or_else(|| (0..headers.len()).find(|&i| ds.column_type(i) == ColumnType::Date))
        .ok_or(QueryError::ColumnNotFound { role: "date" })?;

    let targets = date_targets(q);
    if targets.is_empty() {
        log::debug!("no date value in query, returning every row");
        return Ok(row_result(
            format!("No specific period mentioned; showing all {}", rows_label(ds.rows().len())),
            headers,
            ds.rows(),
            Vec::new(),
        ));
    }

    let rows: Vec<&Vec<CellValue>> = ds
        .rows()
        .iter()
        .filter(|row| {
            row.get(col)
                .is_some_and(|v| !v.is_empty() && targets.iter().all(|t| t.matches(v)))
        })
        .collect();
    let labels: Vec<String> = targets.iter().map(DateTarget::label).collect();
    Ok(row_result(
        format!("Found {} in {} for {}", rows_label(rows.len()), headers[col], labels.join(" ")),
        headers,
        rows,
        labels.iter().map(|l| format!("{} = {}", headers[col], l)).collect(),
    ))
}
