//! Structured filter clauses: `<column> <operator> <value>`.
//!
//! Each operator has one pattern; patterns are tried in a fixed order
//! (`>=` before `>`, comparisons before `is`) and a later match whose
//! operator or value overlaps an accepted clause is ignored.

use crate::cell::{CellValue, format_number, parse_number};
use crate::resolver::resolve_column_phrase;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Ge,
    Le,
    Gt,
    Lt,
    Eq,
    Contains,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "=",
            Operator::Contains => "contains",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Operator::Ge | Operator::Le | Operator::Gt | Operator::Lt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(n) => f.write_str(&format_number(*n)),
            Literal::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub column: usize,
    pub operator: Operator,
    pub literal: Literal,
}

impl Clause {
    pub fn new(column: usize, operator: Operator, literal: Literal) -> Self {
        Clause {
            column,
            operator,
            literal,
        }
    }

    pub fn matches(&self, row: &[CellValue]) -> bool {
        let Some(value) = row.get(self.column) else {
            return false;
        };
        match (&self.operator, &self.literal) {
            (Operator::Contains, lit) => value.contains_lower(&lit.to_string().to_lowercase()),
            (Operator::Eq, Literal::Number(n)) => match value.as_number() {
                Some(v) => (v - n).abs() < 1e-9,
                None => value.to_string().trim().eq_ignore_ascii_case(&format_number(*n)),
            },
            (Operator::Eq, Literal::Text(s)) => value.to_string().trim().to_lowercase() == *s,
            (op, Literal::Number(n)) => match value.as_number() {
                Some(v) => match op {
                    Operator::Ge => v >= *n,
                    Operator::Le => v <= *n,
                    Operator::Gt => v > *n,
                    Operator::Lt => v < *n,
                    _ => false,
                },
                None => false,
            },
            (_, Literal::Text(_)) => false,
        }
    }

    /// Human-readable form used in result summaries ("sales > 100").
    pub fn describe(&self, headers: &[String]) -> String {
        let column = headers.get(self.column).map(String::as_str).unwrap_or("?");
        format!("{} {} {}", column, self.operator.symbol(), self.literal)
    }
}

const LHS: &str = r"(?P<lhs>(?:[a-z0-9_]+\s+){0,2}[a-z0-9_]+)\s*(?:is\s+)?";
const NUMBER_RHS: &str = r"\s*(?P<rhs>-?\$?[0-9][0-9,]*(?:\.[0-9]+)?)";
const TEXT_RHS: &str = r#"\s*(?P<rhs>"[^"]*"|'[^']*'|[a-z0-9_.\-]+)"#;

fn clause_regex(ops: &str, rhs: &str) -> Regex {
    Regex::new(&format!("{}(?P<op>{}){}", LHS, ops, rhs)).unwrap()
}

lazy_static! {
    static ref CLAUSE_PATTERNS: Vec<(Operator, Regex)> = vec![
        (
            Operator::Ge,
            clause_regex(r">=|≥|\bgreater than or equal to\b|\bat least\b|\bno less than\b", NUMBER_RHS),
        ),
        (
            Operator::Le,
            clause_regex(r"<=|≤|\bless than or equal to\b|\bat most\b|\bno more than\b", NUMBER_RHS),
        ),
        (
            Operator::Gt,
            clause_regex(r">|\bgreater than\b|\bmore than\b|\babove\b|\bover\b|\bexceeds\b", NUMBER_RHS),
        ),
        (
            Operator::Lt,
            clause_regex(r"<|\bless than\b|\bfewer than\b|\bbelow\b|\bunder\b", NUMBER_RHS),
        ),
        (
            Operator::Eq,
            clause_regex(r"==|=|\bequals\b|\bequal to\b|\bis\b", TEXT_RHS),
        ),
        (
            Operator::Contains,
            clause_regex(r"\bcontains\b|\bcontaining\b|\bhas\b|\bincludes\b|\bincluding\b", TEXT_RHS),
        ),
    ];
    static ref OPERATOR_HINT: Regex = Regex::new(
        r"(?:>=|<=|>|<|=|≥|≤|\b(?:greater than|less than|more than|fewer than|at least|at most|exceeds|equals|equal to|contains|includes)\b)"
    )
    .unwrap();
}

/// Whether the query carries an explicit comparison operator.
pub fn has_operator(query: &str) -> bool {
    OPERATOR_HINT.is_match(query)
}

/// Extract every resolvable clause from a lower-cased query, in the order
/// they appear. Matches whose left side names no column are dropped.
pub fn parse_clauses(query: &str, headers: &[String]) -> Vec<Clause> {
    let mut found: Vec<(usize, Clause)> = Vec::new();
    let mut consumed: Vec<(usize, usize)> = Vec::new();

    for (operator, pattern) in CLAUSE_PATTERNS.iter() {
        for caps in pattern.captures_iter(query) {
            let (Some(op), Some(rhs)) = (caps.name("op"), caps.name("rhs")) else {
                continue;
            };
            let span = (op.start(), rhs.end());
            if consumed.iter().any(|&(s, e)| span.0 < e && s < span.1) {
                continue;
            }
            match build_clause(*operator, &caps, headers) {
                Some(clause) => {
                    consumed.push(span);
                    found.push((span.0, clause));
                }
                None => log::debug!("unparseable clause `{}`", &caps[0]),
            }
        }
    }

    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, clause)| clause).collect()
}

fn build_clause(operator: Operator, caps: &Captures<'_>, headers: &[String]) -> Option<Clause> {
    let lhs: Vec<&str> = caps
        .name("lhs")?
        .as_str()
        .split_whitespace()
        .filter(|w| !matches!(*w, "is" | "are" | "was" | "were"))
        .collect();
    let column = resolve_column_phrase(&lhs.join(" "), headers)?;
    let raw = caps.name("rhs")?.as_str().trim_matches(|c| c == '"' || c == '\'');
    let literal = if operator.is_numeric() {
        Literal::Number(parse_number(raw)?)
    } else if operator == Operator::Eq {
        parse_number(raw).map_or_else(|| Literal::Text(raw.to_string()), Literal::Number)
    } else {
        Literal::Text(raw.to_string())
    };
    Some(Clause::new(column, operator, literal))
}
