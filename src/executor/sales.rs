use super::{Stats, group_rows, rows_label, sales_column};
use crate::cell::CellValue;
use crate::engine::Dataset;
use crate::error::{QueryError, Result};
use crate::resolver::group_by_column;
use crate::result::{QueryResult, Record, format_stat, row_result};

/// Sales overview. With `by <column>` the sales column is summed per group;
/// otherwise rows with a sales value are returned and the totals go in the
/// message.
pub fn execute(ds: &Dataset, q: &str) -> Result<QueryResult> {
    let headers = ds.headers();
    let sales = sales_column(ds).ok_or(QueryError::ColumnNotFound { role: "sales" })?;

    match group_by_column(q, headers).filter(|&g| g != sales) {
        Some(group) => Ok(grouped(ds, sales, group)),
        None => Ok(overall(ds, sales)),
    }
}

fn grouped(ds: &Dataset, sales: usize, group: usize) -> QueryResult {
    let headers = ds.headers();
    let with_sales = ds
        .rows()
        .iter()
        .filter(|row| row.get(sales).is_some_and(|v| v.as_number().is_some()));

    let mut data = Vec::new();
    let mut best: Option<(String, f64)> = None;
    for (key, rows) in group_rows(with_sales, group) {
        let stats = Stats::from_rows(rows, sales);
        if best.as_ref().is_none_or(|(_, sum)| stats.sum > *sum) {
            best = Some((key.clone(), stats.sum));
        }
        data.push(
            Record::new()
                .with(headers[group].clone(), key)
                .with("sum", stats.sum)
                .with("count", stats.count as f64)
                .with("average", stats.average()),
        );
    }

    let mut message = format!("{} by {}: {} groups", headers[sales], headers[group], data.len());
    if let Some((key, sum)) = best {
        message.push_str(&format!(", highest total {} ({})", key, format_stat(sum)));
    }
    QueryResult::success(
        message,
        data,
        vec![
            headers[group].clone(),
            "sum".to_string(),
            "count".to_string(),
            "average".to_string(),
        ],
        Vec::new(),
    )
}

fn overall(ds: &Dataset, sales: usize) -> QueryResult {
    let headers = ds.headers();
    let rows: Vec<&Vec<CellValue>> = ds
        .rows()
        .iter()
        .filter(|row| row.get(sales).is_some_and(|v| !v.is_empty()))
        .collect();
    let stats = Stats::from_rows(rows.iter().copied(), sales);

    let message = format!(
        "Found {} with {} data. Total: {}, Average: {}, Max: {}, Min: {}",
        rows_label(rows.len()),
        headers[sales],
        format_stat(stats.sum),
        format_stat(stats.average()),
        format_stat(stats.max.unwrap_or(0.0)),
        format_stat(stats.min.unwrap_or(0.0)),
    );
    let filters = if rows.len() < ds.rows().len() {
        vec![format!("{} is not empty", headers[sales])]
    } else {
        Vec::new()
    };
    row_result(message, headers, rows, filters)
}
