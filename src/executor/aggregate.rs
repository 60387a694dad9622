use super::{Stats, group_rows};
use crate::cell::CellValue;
use crate::engine::Dataset;
use crate::error::{QueryError, Result};
use crate::resolver::{find_mentioned_index, group_by_column};
use crate::result::{QueryResult, Record, format_stat};
use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Average,
    Count,
    Max,
    Min,
}

impl Aggregate {
    /// Output field prefix, e.g. `avg_` in `avg_sales`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Aggregate::Sum => "sum_",
            Aggregate::Average => "avg_",
            Aggregate::Count => "count_",
            Aggregate::Max => "max_",
            Aggregate::Min => "min_",
        }
    }

    fn apply(&self, stats: &Stats) -> CellValue {
        match self {
            Aggregate::Sum => stats.sum.into(),
            Aggregate::Average => stats.average().into(),
            Aggregate::Count => (stats.count as f64).into(),
            Aggregate::Max => stats.max.map_or(CellValue::Null, CellValue::Number),
            Aggregate::Min => stats.min.map_or(CellValue::Null, CellValue::Number),
        }
    }
}

lazy_static! {
    static ref VERBS: Vec<(Aggregate, Regex)> = vec![
        (Aggregate::Average, Regex::new(r"\b(?:average|avg|mean)\b").unwrap()),
        (Aggregate::Count, Regex::new(r"\b(?:count|how many)\b").unwrap()),
        (Aggregate::Max, Regex::new(r"\b(?:max|maximum)\b").unwrap()),
        (Aggregate::Min, Regex::new(r"\b(?:min|minimum)\b").unwrap()),
        (Aggregate::Sum, Regex::new(r"\b(?:sum|total)\b").unwrap()),
    ];
}

/// The aggregate a query asks for; sum when no verb is recognised.
pub fn detect_aggregate(q: &str) -> Aggregate {
    VERBS
        .iter()
        .find(|(_, re)| re.is_match(q))
        .map_or(Aggregate::Sum, |(agg, _)| *agg)
}

pub fn execute(ds: &Dataset, q: &str) -> Result<QueryResult> {
    let headers = ds.headers();
    let agg = detect_aggregate(q);
    let group = group_by_column(q, headers);

    let numeric: Vec<usize> = ds
        .numeric_columns()
        .into_iter()
        .filter(|&i| Some(i) != group)
        .collect();
    let targets = match find_mentioned_index(q, headers, &numeric) {
        Some(col) => vec![col],
        None => numeric,
    };
    if targets.is_empty() {
        return Err(QueryError::NoNumericColumn { purpose: "aggregation" });
    }

    let fields: Vec<String> = targets
        .iter()
        .map(|&col| format!("{}{}", agg.prefix(), headers[col]))
        .collect();

    let Some(group) = group else {
        let mut record = Record::new();
        let mut parts = Vec::new();
        for (&col, field) in targets.iter().zip(&fields) {
            let value = agg.apply(&Stats::from_rows(ds.rows(), col));
            parts.push(format!("{} = {}", field, stat_text(&value)));
            record.insert(field.clone(), value);
        }
        return Ok(QueryResult::success(parts.join(", "), vec![record], fields, Vec::new()));
    };

    let mut data = Vec::new();
    for (key, rows) in group_rows(ds.rows(), group) {
        let mut record = Record::new().with(headers[group].clone(), key);
        for (&col, field) in targets.iter().zip(&fields) {
            record.insert(field.clone(), agg.apply(&Stats::from_rows(rows.iter().copied(), col)));
        }
        data.push(record);
    }
    let message = format!("{} by {}: {} groups", fields.join(", "), headers[group], data.len());
    let mut columns = vec![headers[group].clone()];
    columns.extend(fields);
    Ok(QueryResult::success(message, data, columns, Vec::new()))
}

fn stat_text(value: &CellValue) -> String {
    match value {
        CellValue::Number(n) => format_stat(*n),
        other => other.to_string(),
    }
}
