use super::rows_label;
use crate::cell::{CellValue, parse_number};
use crate::clause::{Clause, Literal, Operator, parse_clauses};
use crate::engine::Dataset;
use crate::error::Result;
use crate::result::{QueryResult, row_result};
use crate::vocab::{is_stop_word, query_words};

/// One narrowing step over the working row set.
enum Step<'q> {
    Clause(Clause),
    Search(&'q str),
}

impl Step<'_> {
    fn keeps(&self, row: &[CellValue]) -> bool {
        match self {
            Step::Clause(clause) => clause.matches(row),
            Step::Search(token) => row.iter().any(|v| v.contains_lower(token)),
        }
    }

    fn describe(&self, headers: &[String]) -> String {
        match self {
            Step::Clause(clause) => clause.describe(headers),
            Step::Search(token) => format!("any column contains '{}'", token),
        }
    }
}

/// Tokens worth filtering on: no stop words, nothing shorter than three
/// characters unless it is a number.
pub fn filter_tokens(q: &str) -> Vec<&str> {
    query_words(q)
        .into_iter()
        .filter(|w| !is_stop_word(w) && (w.len() > 2 || parse_number(w).is_some()))
        .collect()
}

/// Token mode: a token naming a header compares that column with the next
/// token; anything else is a substring search across every column.
fn token_steps<'q>(q: &'q str, headers: &[String]) -> Vec<Step<'q>> {
    let tokens = filter_tokens(q);
    let mut steps = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        match (headers.iter().position(|h| h == token), tokens.get(i + 1)) {
            (Some(col), Some(next)) => {
                let literal = parse_number(next).map_or_else(|| Literal::Text(next.to_string()), Literal::Number);
                steps.push(Step::Clause(Clause::new(col, Operator::Eq, literal)));
                i += 2;
            }
            _ => {
                steps.push(Step::Search(token));
                i += 1;
            }
        }
    }
    steps
}

pub fn execute(ds: &Dataset, q: &str) -> Result<QueryResult> {
    let headers = ds.headers();
    let clauses = parse_clauses(q, headers);
    let steps: Vec<Step> = if clauses.is_empty() {
        log::debug!("no filter clause in `{}`, using token search", q);
        token_steps(q, headers)
    } else {
        clauses.into_iter().map(Step::Clause).collect()
    };

    let mut rows: Vec<&Vec<CellValue>> = ds.rows().iter().collect();
    let mut filters = Vec::new();
    for step in &steps {
        let before = rows.len();
        rows.retain(|row| step.keeps(row));
        if rows.len() < before {
            filters.push(step.describe(headers));
        }
    }

    let message = if filters.is_empty() {
        format!("No narrowing filter found; showing all {}", rows_label(rows.len()))
    } else {
        format!("Found {} matching {}", rows_label(rows.len()), filters.join(" and "))
    };
    Ok(row_result(message, headers, rows, filters))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_skip_stop_words_and_short_words() {
        assert_eq!(filter_tokens("show me rows with widgeta in it"), vec!["widgeta"]);
        assert_eq!(filter_tokens("units 80"), vec!["units", "80"]);
    }

    #[test]
    fn header_token_becomes_equality() {
        let headers = vec!["region".to_string(), "product".to_string()];
        let steps = token_steps("product widgeta west", &headers);
        assert_eq!(steps.len(), 2);
        assert!(matches!(
            &steps[0],
            Step::Clause(c) if *c == Clause::new(1, Operator::Eq, Literal::Text("widgeta".into()))
        ));
        assert!(matches!(steps[1], Step::Search("west")));
    }
}
