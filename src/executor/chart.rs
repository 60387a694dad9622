use super::{Stats, group_rows};
use crate::cell::CellValue;
use crate::engine::Dataset;
use crate::error::{QueryError, Result};
use crate::resolver::find_mentioned_index;
use crate::result::{QueryResult, Record};
use crate::vocab::{CHART_KINDS, find_vocab_word};

/// Chart kind named in the query, `bar` otherwise.
pub fn chart_kind(q: &str) -> &'static str {
    find_vocab_word(q, CHART_KINDS).unwrap_or("bar")
}

/// Category/value series for a chart: the value column summed per category.
pub fn execute(ds: &Dataset, q: &str) -> Result<QueryResult> {
    let headers = ds.headers();
    let numeric = ds.numeric_columns();
    let text = ds.non_numeric_columns();
    let value = find_mentioned_index(q, headers, &numeric)
        .or_else(|| numeric.first().copied())
        .ok_or(QueryError::NoNumericColumn { purpose: "a chart" })?;
    let category = find_mentioned_index(q, headers, &text).or_else(|| text.first().copied());

    let series: Vec<(String, f64)> = match category {
        Some(col) => group_rows(ds.rows(), col)
            .into_iter()
            .map(|(key, rows)| (key, Stats::from_rows(rows, value).sum))
            .collect(),
        None => ds
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let n = row.get(value).and_then(CellValue::as_number).unwrap_or(0.0);
                (format!("Row {}", i + 1), n)
            })
            .collect(),
    };

    let category_header = category.map_or("category", |c| headers[c].as_str());
    let value_header = headers[value].as_str();
    let data: Vec<Record> = series
        .iter()
        .map(|(key, sum)| {
            Record::new()
                .with(category_header, key.as_str())
                .with(value_header, *sum)
                .with("category", key.as_str())
                .with("value", *sum)
        })
        .collect();

    let mut columns: Vec<String> = Vec::new();
    for name in [category_header, value_header, "category", "value"] {
        if !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }
    }

    let kind = chart_kind(q);
    let message = format!(
        "Prepared {} chart of {} by {} ({} categories)",
        kind,
        value_header,
        category_header,
        data.len()
    );
    Ok(QueryResult::success(message, data, columns, Vec::new()))
}
