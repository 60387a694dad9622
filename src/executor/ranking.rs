use super::sales_column;
use crate::cell::CellValue;
use crate::engine::Dataset;
use crate::error::{QueryError, Result};
use crate::resolver::find_mentioned_index;
use crate::result::{QueryResult, row_result};
use crate::vocab::{RANK_BOTTOM_WORDS, find_vocab_word};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LIMIT_REGEX: Regex = Regex::new(r"\b(\d+)\b").unwrap();
}

/// Top-N / bottom-N rows by a numeric column.
pub fn execute(ds: &Dataset, q: &str) -> Result<QueryResult> {
    let headers = ds.headers();
    let ascending = find_vocab_word(q, RANK_BOTTOM_WORDS).is_some();
    let limit = LIMIT_REGEX
        .captures(q)
        .and_then(|c| c[1].parse::<usize>().ok())
        .unwrap_or(ds.config().default_limit);

    let col = find_mentioned_index(q, headers, &ds.numeric_columns())
        .or_else(|| sales_column(ds))
        .ok_or(QueryError::ColumnNotFound { role: "numeric" })?;

    let mut ranked: Vec<(f64, &Vec<CellValue>)> = ds
        .rows()
        .iter()
        .filter_map(|row| Some((row.get(col)?.as_number()?, row)))
        .collect();
    // sort_by is stable, so ties keep their original row order
    if ascending {
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    } else {
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    }
    ranked.truncate(limit);

    let direction = if ascending { "bottom" } else { "top" };
    let message = format!(
        "{} {} by {} ({} requested)",
        capitalize(direction),
        ranked.len(),
        headers[col],
        limit
    );
    Ok(row_result(
        message,
        headers,
        ranked.into_iter().map(|(_, row)| row),
        vec![format!("{} {} by {}", direction, limit, headers[col])],
    ))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
