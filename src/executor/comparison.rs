use super::{Stats, numeric_target, rows_label};
use crate::cell::CellValue;
use crate::engine::Dataset;
use crate::error::{QueryError, Result};
use crate::result::{QueryResult, Record, format_stat, row_result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INFIX_PAIR_REGEX: Regex = Regex::new(
        r"([a-z0-9][a-z0-9_\-]*)\s+(?:vs\.?|versus|against|compared (?:to|with))\s+([a-z0-9][a-z0-9_\-]*)"
    )
    .unwrap();
    static ref PREFIX_PAIR_REGEX: Regex = Regex::new(
        r"\b(?:compare|between)\s+([a-z0-9][a-z0-9_\-]*)\s+(?:and|with|to)\s+([a-z0-9][a-z0-9_\-]*)"
    )
    .unwrap();
}

/// The two literals being compared, in query order.
pub fn comparison_pair(q: &str) -> Option<(String, String)> {
    let caps = INFIX_PAIR_REGEX
        .captures(q)
        .or_else(|| PREFIX_PAIR_REGEX.captures(q))?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// First column holding both literals; text columns are tried before
/// numeric ones.
fn pair_column(ds: &Dataset, a: &str, b: &str) -> Option<usize> {
    let holds = |col: usize, needle: &str| {
        ds.rows()
            .iter()
            .any(|row| row.get(col).is_some_and(|v| v.contains_lower(needle)))
    };
    ds.non_numeric_columns()
        .into_iter()
        .chain(ds.numeric_columns())
        .find(|&col| holds(col, a) && holds(col, b))
}

pub fn execute(ds: &Dataset, q: &str) -> Result<QueryResult> {
    let headers = ds.headers();
    let resolved = comparison_pair(q).and_then(|(a, b)| {
        let col = pair_column(ds, &a, &b)?;
        Some((a, b, col))
    });
    let Some((a, b, group)) = resolved else {
        log::debug!("comparison pair not resolved in `{}`", q);
        return Ok(row_result(
            format!(
                "Could not tell what to compare; showing all {}",
                rows_label(ds.rows().len())
            ),
            headers,
            ds.rows(),
            Vec::new(),
        ));
    };
    let value = numeric_target(ds, q, Some(group)).ok_or(QueryError::NoNumericColumn { purpose: "a comparison" })?;

    let side = |needle: &str| {
        Stats::from_rows(
            ds.rows()
                .iter()
                .filter(|row| row.get(group).is_some_and(|v| v.contains_lower(needle))),
            value,
        )
    };
    let (left, right) = (side(&a), side(&b));
    let difference = left.sum - right.sum;
    let percent = if right.sum == 0.0 {
        CellValue::Null
    } else {
        CellValue::Number(difference / right.sum * 100.0)
    };

    let group_header = headers[group].clone();
    let side_record = |label: &str, stats: &Stats| {
        Record::new()
            .with(group_header.clone(), label)
            .with("count", stats.count as f64)
            .with("sum", stats.sum)
            .with("average", stats.average())
    };
    let data = vec![
        side_record(&a, &left),
        side_record(&b, &right),
        Record::new()
            .with(group_header.clone(), format!("{} vs {}", a, b))
            .with("difference", difference)
            .with("percentDifference", percent.clone()),
    ];

    let mut message = format!(
        "Compared {} and {} on {}: {} vs {}, difference {}",
        a,
        b,
        headers[value],
        format_stat(left.sum),
        format_stat(right.sum),
        format_stat(difference)
    );
    if let CellValue::Number(p) = percent {
        message.push_str(&format!(" ({}%)", format_stat(p)));
    }

    Ok(QueryResult::success(
        message,
        data,
        vec![
            group_header,
            "count".to_string(),
            "sum".to_string(),
            "average".to_string(),
            "difference".to_string(),
            "percentDifference".to_string(),
        ],
        vec![format!("{} in [{}, {}]", headers[group], a, b)],
    ))
}
