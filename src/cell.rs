use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sparse cell store keyed by coordinate name ("A1", "C12", ...).
pub type CellMap = BTreeMap<String, Cell>;

/// A scalar held by a cell or produced by formula evaluation.
///
/// Serialized untagged so a row-object reads as plain JSON
/// (`120`, `"West"`, `true`, `null`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
    #[default]
    Null,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Null values and whitespace-only text count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Coerce to a finite number. Text is trimmed, and a leading currency
    /// sign and thousands separators are ignored ("$1,200" -> 1200).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Case-insensitive substring test; `needle` must already be lower-cased.
    pub fn contains_lower(&self, needle: &str) -> bool {
        !self.is_empty() && self.to_string().to_lowercase().contains(needle)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Null => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned: String = trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Integral values print without a fractional part ("120", not "120.0").
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    #[serde(default)]
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl Cell {
    pub fn create(row: u32, col: u32, value: impl Into<CellValue>) -> Self {
        Cell {
            row,
            col,
            value: value.into(),
            formula: None,
        }
    }

    pub fn with_formula(row: u32, col: u32, formula: impl Into<String>) -> Self {
        Cell {
            row,
            col,
            value: CellValue::Null,
            formula: Some(formula.into()),
        }
    }

    pub fn name(&self) -> String {
        cell_name(self.row, self.col)
    }
}

pub fn col_to_letter(col: u32) -> String {
    let mut col = col;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}

pub fn letter_to_col(letters: &str) -> Option<u32> {
    letters.chars().try_fold(0u32, |acc, c| {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)
    })
}

pub fn cell_name(row: u32, col: u32) -> String {
    format!("{}{}", col_to_letter(col), row)
}

/// Parse "AB12" into `(row, col)` = `(12, 28)`. Letters must precede digits
/// and row 0 is rejected.
pub fn parse_cell_name(cell_name: &str) -> Option<(u32, u32)> {
    let mut letters = String::new();
    let mut digits = String::new();
    let mut found_digit = false;

    for c in cell_name.trim().chars() {
        if c.is_ascii_alphabetic() {
            if found_digit {
                return None;
            }
            letters.push(c);
        } else if c.is_ascii_digit() {
            found_digit = true;
            digits.push(c);
        } else {
            return None;
        }
    }

    if letters.is_empty() || digits.is_empty() {
        return None;
    }

    let col = letter_to_col(&letters)?;
    let row = digits.parse::<u32>().ok()?;
    if row == 0 {
        return None;
    }
    Some((row, col))
}

/// Build a cell map from dense rows, first row at `A1`. Null values are
/// left out, matching how the sheet stores untouched cells.
pub fn cell_map_from_rows<R, V>(rows: R) -> CellMap
where
    R: IntoIterator,
    R::Item: IntoIterator<Item = V>,
    V: Into<CellValue>,
{
    let mut cells = CellMap::new();
    for (r, row) in rows.into_iter().enumerate() {
        for (c, value) in row.into_iter().enumerate() {
            let value = value.into();
            if value == CellValue::Null {
                continue;
            }
            let cell = Cell::create(r as u32 + 1, c as u32 + 1, value);
            cells.insert(cell.name(), cell);
        }
    }
    cells
}
