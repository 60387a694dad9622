use crate::cell::{Cell, CellMap, CellValue};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} is empty")]
    Empty(String),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported file type: {0}")]
    Unsupported(String),
}

/// Load a cell map from a CSV file
///
/// The first line lands in row 1 (the header row of the query grid), each
/// field in its own column. Empty fields leave no cell behind.
///
/// # Arguments
/// * `filepath` - Path to the CSV file to load
///
/// # Returns
/// * `Result<CellMap, LoadError>` - The loaded cells or an error
///
/// # Examples
/// ```no_run
/// use sheet_query::loader::from_csv;
///
/// match from_csv("sales.csv") {
///     Ok(cells) => println!("Loaded {} cells", cells.len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<CellMap, LoadError> {
    let path = filepath.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    if lines.iter().all(|l| l.trim().is_empty()) {
        return Err(LoadError::Empty(path.display().to_string()));
    }
    Ok(cells_from_lines(lines.iter().map(String::as_str)))
}

/// Parse CSV text held in memory. Empty text yields an empty map.
pub fn parse_csv_str(text: &str) -> CellMap {
    cells_from_lines(text.lines())
}

fn cells_from_lines<'a>(lines: impl Iterator<Item = &'a str>) -> CellMap {
    let mut cells = CellMap::new();
    for (r, line) in lines.enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        for (c, field) in parse_csv_row(line).iter().enumerate() {
            if let Some(cell) = field_to_cell(r as u32 + 1, c as u32 + 1, field) {
                cells.insert(cell.name(), cell);
            }
        }
    }
    cells
}

/// Numbers become numbers, `true`/`false` booleans, a leading `=` a
/// formula; anything else is kept as text.
fn field_to_cell(row: u32, col: u32, field: &str) -> Option<Cell> {
    let value = field.trim();
    if value.is_empty() {
        return None;
    }
    if let Some(formula) = value.strip_prefix('=') {
        return Some(Cell::with_formula(row, col, formula));
    }
    let value = if let Ok(num) = value.parse::<f64>() {
        CellValue::Number(num)
    } else if value.eq_ignore_ascii_case("true") {
        CellValue::Bool(true)
    } else if value.eq_ignore_ascii_case("false") {
        CellValue::Bool(false)
    } else {
        CellValue::text(value)
    };
    Some(Cell::create(row, col, value))
}

// Parse a CSV row into a vector of strings
fn parse_csv_row(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Doubled quote inside a quoted field
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(std::mem::take(&mut current_field));
            }
            _ => current_field.push(c),
        }
    }

    result.push(current_field);
    result
}

/// Load a cell map saved as JSON: `{ "A1": { "row": 1, "col": 1, "value": "Region" }, ... }`
///
/// # Examples
/// ```no_run
/// use sheet_query::loader::from_json;
///
/// let cells = from_json("sheet.json").expect("readable sheet");
/// println!("{} cells", cells.len());
/// ```
pub fn from_json(filepath: impl AsRef<Path>) -> Result<CellMap, LoadError> {
    let text = std::fs::read_to_string(filepath)?;
    from_json_str(&text)
}

pub fn from_json_str(text: &str) -> Result<CellMap, LoadError> {
    Ok(serde_json::from_str(text)?)
}

/// Detect file type and load appropriate format
///
/// # Arguments
/// * `filepath` - Path to a `.csv` or `.json` file
///
/// # Returns
/// * `Result<CellMap, LoadError>` - The loaded cells or an error
pub fn load_cells(filepath: impl AsRef<Path>) -> Result<CellMap, LoadError> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => from_csv(path),
        Some("json") => from_json(path),
        Some(ext) => Err(LoadError::Unsupported(ext.to_string())),
        None => Err(LoadError::Unsupported(path.display().to_string())),
    }
}
