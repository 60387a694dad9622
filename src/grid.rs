use crate::cell::{CellMap, CellValue};
use crate::formula::{FormulaEvaluator, Sheet};
use std::collections::HashSet;

/// Dense view of a cell map. Row 0 of `matrix` is the header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub matrix: Vec<Vec<CellValue>>,
}

/// Reported to the yield hook after each materialized chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    pub processed: usize,
    pub total: usize,
}

impl Grid {
    /// True when the source cell map held no usable cells.
    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn data_rows(&self) -> &[Vec<CellValue>] {
        self.matrix.get(1..).unwrap_or(&[])
    }
}

/// Largest sheet the materializer will lay out densely. Cells beyond it are
/// skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub max_rows: u32,
    pub max_cols: u32,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            max_rows: 65_536,
            max_cols: 256,
        }
    }
}

impl Bounds {
    fn contains(&self, row: u32, col: u32) -> bool {
        (1..=self.max_rows).contains(&row) && (1..=self.max_cols).contains(&col)
    }
}

pub fn materialize<E: FormulaEvaluator + ?Sized>(cells: &CellMap, evaluator: &E) -> Grid {
    materialize_chunked(cells, evaluator, Bounds::default(), usize::MAX, |_| {})
}

/// Materialize `cells` in chunks of `chunk_size`, calling `on_chunk` between
/// chunks so a cooperative caller can yield. The result does not depend on
/// the chunk size.
///
/// Cells are visited in row-major order and share one formula `Sheet`, so
/// each formula is evaluated once for the whole pass.
pub fn materialize_chunked<E, F>(
    cells: &CellMap,
    evaluator: &E,
    bounds: Bounds,
    chunk_size: usize,
    mut on_chunk: F,
) -> Grid
where
    E: FormulaEvaluator + ?Sized,
    F: FnMut(ChunkProgress),
{
    let mut valid: Vec<_> = cells
        .iter()
        .filter(|(key, cell)| {
            let ok = bounds.contains(cell.row, cell.col);
            if !ok {
                log::warn!("skipping cell {} with out-of-range coordinates", key);
            }
            ok
        })
        .map(|(_, cell)| cell)
        .collect();
    valid.sort_by_key(|cell| (cell.row, cell.col));

    let max_row = valid.iter().map(|c| c.row).max().unwrap_or(0) as usize;
    let max_col = valid.iter().map(|c| c.col).max().unwrap_or(0) as usize;
    if max_row == 0 || max_col == 0 {
        return Grid::default();
    }

    let mut matrix = vec![vec![CellValue::Null; max_col]; max_row];
    let total = valid.len();
    let mut processed = 0;
    let sheet = Sheet::new(cells);

    for chunk in valid.chunks(chunk_size.max(1)) {
        for cell in chunk {
            let value = match &cell.formula {
                Some(formula) => match evaluator.evaluate_cell(cell, &sheet) {
                    Ok(value) => value,
                    Err(e) => {
                        log::debug!("formula in {} left unevaluated: {}", cell.name(), e);
                        CellValue::Text(formula.clone())
                    }
                },
                None => cell.value.clone(),
            };
            matrix[cell.row as usize - 1][cell.col as usize - 1] = value;
        }
        processed += chunk.len();
        on_chunk(ChunkProgress { processed, total });
    }

    let headers = header_names(&matrix[0]);
    Grid { headers, matrix }
}

/// Lowercased header names; blanks become `column_N` and repeats get a
/// `_2`, `_3`, ... suffix so every name is unique.
fn header_names(row: &[CellValue]) -> Vec<String> {
    let mut seen = HashSet::new();
    row.iter()
        .enumerate()
        .map(|(i, value)| {
            let name = value.to_string().trim().to_lowercase();
            let name = if name.is_empty() { format!("column_{}", i + 1) } else { name };
            let mut unique = name.clone();
            let mut n = 2;
            while !seen.insert(unique.clone()) {
                unique = format!("{}_{}", name, n);
                n += 1;
            }
            unique
        })
        .collect()
}
