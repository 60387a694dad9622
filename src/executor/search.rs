use super::rows_label;
use crate::cell::CellValue;
use crate::engine::Dataset;
use crate::error::Result;
use crate::result::{QueryResult, row_result};
use crate::vocab::{is_stop_word, query_words};

/// Keyword search: every non-stop word must appear somewhere in the row.
pub fn execute(ds: &Dataset, q: &str) -> Result<QueryResult> {
    let headers = ds.headers();
    let tokens: Vec<&str> = query_words(q).into_iter().filter(|w| !is_stop_word(w)).collect();
    if tokens.is_empty() {
        return Ok(row_result(
            format!("Showing all {}", rows_label(ds.rows().len())),
            headers,
            ds.rows(),
            Vec::new(),
        ));
    }

    let rows: Vec<&Vec<CellValue>> = ds
        .rows()
        .iter()
        .filter(|row| tokens.iter().all(|t| row.iter().any(|v| v.contains_lower(t))))
        .collect();
    Ok(row_result(
        format!("Found {} matching '{}'", rows_label(rows.len()), tokens.join(" ")),
        headers,
        rows,
        tokens.iter().map(|t| format!("any column contains '{}'", t)).collect(),
    ))
}
