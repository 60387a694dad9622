use crate::cell::{Cell, CellMap, CellValue, cell_name, parse_cell_name};
use lazy_static::lazy_static;
use regex::Regex;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

lazy_static! {
    static ref FUNC_REGEX: Regex = Regex::new(r"^([A-Za-z]+)\((.*)\)$").unwrap();
    static ref ARITH_EXPR_REGEX: Regex = Regex::new(
        r"^(([+-]?[0-9]+(?:\.[0-9]+)?)|([A-Za-z]+[0-9]+))([+\-*/])(([+-]?[0-9]+(?:\.[0-9]+)?)|([A-Za-z]+[0-9]+))$"
    )
    .unwrap();
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("cannot parse formula `{0}`")]
    Parse(String),
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("invalid cell reference `{0}`")]
    InvalidReference(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("circular reference through {0}")]
    Circular(String),
    #[error("formula chain through {0} is nested too deeply")]
    TooDeep(String),
    #[error("{0} does not hold a number")]
    NonNumeric(String),
}

/// Evaluates a cell formula against the sheet it lives in.
///
/// Implementations are best effort: the grid materializer substitutes the raw
/// formula text for any `Err`, so an error never aborts a query.
pub trait FormulaEvaluator {
    fn evaluate(&self, formula: &str, sheet: &Sheet<'_>) -> Result<CellValue, FormulaError>;

    /// Value of `cell` itself. Evaluators that memoize through `sheet`
    /// override this so a cell already reached by another formula is not
    /// evaluated twice.
    fn evaluate_cell(&self, cell: &Cell, sheet: &Sheet<'_>) -> Result<CellValue, FormulaError> {
        match &cell.formula {
            Some(formula) => self.evaluate(formula, sheet),
            None => Ok(cell.value.clone()),
        }
    }
}

type Coord = (u32, u32);

/// A cell map indexed by coordinate, plus the state of one evaluation pass:
/// resolved formula values and the formula cells currently being evaluated.
///
/// Build one per materialization and drop it afterwards; values cached here
/// go stale as soon as the cells change.
#[derive(Debug, Default)]
pub struct Sheet<'a> {
    index: BTreeMap<Coord, &'a Cell>,
    resolved: RefCell<HashMap<Coord, Result<CellValue, FormulaError>>>,
    in_progress: RefCell<HashSet<Coord>>,
}

impl<'a> Sheet<'a> {
    pub fn new(cells: &'a CellMap) -> Self {
        let index = cells.values().map(|cell| ((cell.row, cell.col), cell)).collect();
        Sheet {
            index,
            ..Sheet::default()
        }
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&'a Cell> {
        self.index.get(&(row, col)).copied()
    }

    /// Cells inside the rectangle, in row-major order. An inverted
    /// rectangle holds no cells.
    pub fn range(&self, (r1, c1): Coord, (r2, c2): Coord) -> impl Iterator<Item = &'a Cell> + '_ {
        let rows = (r1 <= r2 && c1 <= c2).then(|| self.index.range((r1, c1)..=(r2, c2)));
        rows.into_iter()
            .flatten()
            .filter(move |((_, col), _)| *col >= c1 && *col <= c2)
            .map(|(_, cell)| *cell)
    }

    pub fn resolved(&self, row: u32, col: u32) -> Option<Result<CellValue, FormulaError>> {
        self.resolved.borrow().get(&(row, col)).cloned()
    }

    pub fn remember(&self, row: u32, col: u32, result: Result<CellValue, FormulaError>) {
        self.resolved.borrow_mut().insert((row, col), result);
    }

    /// Mark a cell as being evaluated. False when it already is, which means
    /// its formula depends on itself.
    pub fn enter(&self, row: u32, col: u32) -> bool {
        self.in_progress.borrow_mut().insert((row, col))
    }

    pub fn leave(&self, row: u32, col: u32) {
        self.in_progress.borrow_mut().remove(&(row, col));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFormula {
    Function {
        name: FunctionName,
        range: ((u32, u32), (u32, u32)),
    },
    Arithmetic {
        lhs: Operand,
        operator: char,
        rhs: Operand,
    },
    SingleValue(Operand),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Number(f64),
    Cell(u32, u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FunctionName {
    Min,
    Max,
    Avg,
    Sum,
    Stdev,
}

impl FunctionName {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "MIN" => Some(FunctionName::Min),
            "MAX" => Some(FunctionName::Max),
            "AVG" | "AVERAGE" => Some(FunctionName::Avg),
            "SUM" => Some(FunctionName::Sum),
            "STDEV" => Some(FunctionName::Stdev),
            _ => None,
        }
    }
}

/// Parse the sheet's formula language: a number, a cell reference, a binary
/// arithmetic expression over those, or `FUNC(A1:B9)`. A leading `=` and
/// whitespace are ignored.
pub fn parse_formula(formula: &str) -> Result<ParsedFormula, FormulaError> {
    let expr: String = formula
        .trim()
        .trim_start_matches('=')
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if expr.is_empty() {
        return Err(FormulaError::Parse(formula.to_string()));
    }

    if let Some(captures) = FUNC_REGEX.captures(&expr) {
        let func = &captures[1];
        let args = &captures[2];
        let name =
            FunctionName::from_name(func).ok_or_else(|| FormulaError::UnknownFunction(func.to_string()))?;
        let (start, end) = args
            .split_once(':')
            .ok_or_else(|| FormulaError::Parse(formula.to_string()))?;
        let start = parse_cell_name(start).ok_or_else(|| FormulaError::InvalidReference(start.to_string()))?;
        let end = parse_cell_name(end).ok_or_else(|| FormulaError::InvalidReference(end.to_string()))?;
        if start.0 > end.0 || start.1 > end.1 {
            return Err(FormulaError::InvalidReference(args.to_string()));
        }
        return Ok(ParsedFormula::Function {
            name,
            range: (start, end),
        });
    }

    if let Some((row, col)) = parse_cell_name(&expr) {
        return Ok(ParsedFormula::SingleValue(Operand::Cell(row, col)));
    }

    if let Ok(value) = expr.parse::<f64>() {
        return Ok(ParsedFormula::SingleValue(Operand::Number(value)));
    }

    if let Some(captures) = ARITH_EXPR_REGEX.captures(&expr) {
        let lhs = parse_operand(&captures[1])?;
        let rhs = parse_operand(&captures[5])?;
        let operator = captures[4]
            .chars()
            .next()
            .ok_or_else(|| FormulaError::Parse(formula.to_string()))?;
        return Ok(ParsedFormula::Arithmetic { lhs, operator, rhs });
    }

    Err(FormulaError::Parse(formula.to_string()))
}

fn parse_operand(token: &str) -> Result<Operand, FormulaError> {
    if token.starts_with(|c: char| c.is_ascii_alphabetic()) {
        parse_cell_name(token)
            .map(|(row, col)| Operand::Cell(row, col))
            .ok_or_else(|| FormulaError::InvalidReference(token.to_string()))
    } else {
        token
            .parse::<f64>()
            .map(Operand::Number)
            .map_err(|_| FormulaError::Parse(token.to_string()))
    }
}

/// Evaluator for the formula language understood by `parse_formula`.
///
/// Referenced formula cells are evaluated recursively and each resolved value
/// is kept in the `Sheet`, so a cell is evaluated once per pass. A cell that
/// is reached again while its own formula is still being evaluated is
/// circular. `max_depth` only bounds the recursion.
#[derive(Debug, Clone)]
pub struct BasicEvaluator {
    pub max_depth: usize,
}

impl Default for BasicEvaluator {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

impl BasicEvaluator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    fn eval_parsed(
        &self,
        parsed: &ParsedFormula,
        sheet: &Sheet<'_>,
        depth: usize,
    ) -> Result<CellValue, FormulaError> {
        match parsed {
            ParsedFormula::Function { name, range } => {
                let values = self.range_numbers(sheet, *range, depth)?;
                let result = match name {
                    FunctionName::Min => values.iter().cloned().reduce(f64::min).unwrap_or(0.0),
                    FunctionName::Max => values.iter().cloned().reduce(f64::max).unwrap_or(0.0),
                    FunctionName::Sum => values.iter().sum(),
                    FunctionName::Avg => {
                        if values.is_empty() {
                            return Err(FormulaError::DivisionByZero);
                        }
                        values.iter().sum::<f64>() / values.len() as f64
                    }
                    FunctionName::Stdev => {
                        if values.len() < 2 {
                            0.0
                        } else {
                            let mean = values.iter().sum::<f64>() / values.len() as f64;
                            let variance = values
                                .iter()
                                .map(|&x| {
                                    let diff = x - mean;
                                    diff * diff
                                })
                                .sum::<f64>()
                                / values.len() as f64;
                            variance.sqrt()
                        }
                    }
                };
                Ok(CellValue::Number(result))
            }
            ParsedFormula::Arithmetic { lhs, operator, rhs } => {
                let lhs_val = self.operand_number(lhs, sheet, depth)?;
                let rhs_val = self.operand_number(rhs, sheet, depth)?;
                let result = match operator {
                    '+' => lhs_val + rhs_val,
                    '-' => lhs_val - rhs_val,
                    '*' => lhs_val * rhs_val,
                    '/' => {
                        if rhs_val == 0.0 {
                            return Err(FormulaError::DivisionByZero);
                        }
                        lhs_val / rhs_val
                    }
                    other => return Err(FormulaError::Parse(other.to_string())),
                };
                Ok(CellValue::Number(result))
            }
            ParsedFormula::SingleValue(Operand::Number(n)) => Ok(CellValue::Number(*n)),
            ParsedFormula::SingleValue(Operand::Cell(row, col)) => {
                self.cell_value(sheet, *row, *col, depth)
            }
        }
    }

    fn cell_value(&self, sheet: &Sheet<'_>, row: u32, col: u32, depth: usize) -> Result<CellValue, FormulaError> {
        match sheet.cell(row, col) {
            None => Ok(CellValue::Null),
            Some(cell) => self.resolve(cell, sheet, depth + 1),
        }
    }

    fn resolve(&self, cell: &Cell, sheet: &Sheet<'_>, depth: usize) -> Result<CellValue, FormulaError> {
        let Some(formula) = &cell.formula else {
            return Ok(cell.value.clone());
        };
        if let Some(result) = sheet.resolved(cell.row, cell.col) {
            return result;
        }
        if !sheet.enter(cell.row, cell.col) {
            return Err(FormulaError::Circular(cell.name()));
        }
        let result = if depth > self.max_depth {
            Err(FormulaError::TooDeep(cell.name()))
        } else {
            parse_formula(formula).and_then(|parsed| self.eval_parsed(&parsed, sheet, depth))
        };
        sheet.leave(cell.row, cell.col);

        // A chain cut short by the depth guard may still resolve when reached
        // from a shallower cell.
        if !matches!(result, Err(FormulaError::TooDeep(_))) {
            sheet.remember(cell.row, cell.col, result.clone());
        }
        result
    }

    fn operand_number(&self, operand: &Operand, sheet: &Sheet<'_>, depth: usize) -> Result<f64, FormulaError> {
        match operand {
            Operand::Number(n) => Ok(*n),
            Operand::Cell(row, col) => {
                let value = self.cell_value(sheet, *row, *col, depth)?;
                if value.is_empty() {
                    return Ok(0.0);
                }
                value
                    .as_number()
                    .ok_or_else(|| FormulaError::NonNumeric(cell_name(*row, *col)))
            }
        }
    }

    /// Numeric values inside the range; empty and text cells are skipped.
    fn range_numbers(
        &self,
        sheet: &Sheet<'_>,
        (start, end): (Coord, Coord),
        depth: usize,
    ) -> Result<Vec<f64>, FormulaError> {
        let mut values = Vec::new();
        for cell in sheet.range(start, end) {
            if let Some(n) = self.resolve(cell, sheet, depth + 1)?.as_number() {
                values.push(n);
            }
        }
        Ok(values)
    }
}

impl FormulaEvaluator for BasicEvaluator {
    fn evaluate(&self, formula: &str, sheet: &Sheet<'_>) -> Result<CellValue, FormulaError> {
        let parsed = parse_formula(formula)?;
        self.eval_parsed(&parsed, sheet, 0)
    }

    fn evaluate_cell(&self, cell: &Cell, sheet: &Sheet<'_>) -> Result<CellValue, FormulaError> {
        self.resolve(cell, sheet, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    fn sheet() -> CellMap {
        let mut cells = CellMap::new();
        for cell in [
            Cell::create(1, 1, 10),
            Cell::create(2, 1, 20),
            Cell::create(3, 1, "n/a"),
            Cell::create(4, 1, 30),
            Cell::with_formula(1, 2, "=A1*2"),
        ] {
            cells.insert(cell.name(), cell);
        }
        cells
    }

    #[test]
    fn parses_each_formula_shape() {
        assert_eq!(
            parse_formula("=SUM(A1:A4)").unwrap(),
            ParsedFormula::Function {
                name: FunctionName::Sum,
                range: ((1, 1), (4, 1))
            }
        );
        assert_eq!(
            parse_formula("=A1 + 2.5").unwrap(),
            ParsedFormula::Arithmetic {
                lhs: Operand::Cell(1, 1),
                operator: '+',
                rhs: Operand::Number(2.5)
            }
        );
        assert_eq!(
            parse_formula("=B7").unwrap(),
            ParsedFormula::SingleValue(Operand::Cell(7, 2))
        );
        assert!(matches!(parse_formula("=FOO(A1:A2)"), Err(FormulaError::UnknownFunction(_))));
        assert!(matches!(parse_formula("=SUM(B4:A1)"), Err(FormulaError::InvalidReference(_))));
        assert!(matches!(parse_formula("=1+"), Err(FormulaError::Parse(_))));
    }

    #[test]
    fn range_functions_skip_text() {
        let cells = sheet();
        let sheet = Sheet::new(&cells);
        let eval = BasicEvaluator::default();
        assert_eq!(eval.evaluate("=SUM(A1:A4)", &sheet), Ok(CellValue::Number(60.0)));
        assert_eq!(eval.evaluate("=AVG(A1:A4)", &sheet), Ok(CellValue::Number(20.0)));
        assert_eq!(eval.evaluate("=MAX(A1:A4)", &sheet), Ok(CellValue::Number(30.0)));
        assert_eq!(eval.evaluate("=MIN(A1:A4)", &sheet), Ok(CellValue::Number(10.0)));
    }

    #[test]
    fn arithmetic_follows_formula_references() {
        let cells = sheet();
        let sheet = Sheet::new(&cells);
        let eval = BasicEvaluator::default();
        assert_eq!(eval.evaluate("=B1+A2", &sheet), Ok(CellValue::Number(40.0)));
        assert_eq!(eval.evaluate("=A9+1", &sheet), Ok(CellValue::Number(1.0)));
        assert_eq!(eval.evaluate("=A1/0", &sheet), Err(FormulaError::DivisionByZero));
        assert_eq!(
            eval.evaluate("=A3+1", &sheet),
            Err(FormulaError::NonNumeric("A3".to_string()))
        );
    }

    #[test]
    fn self_reference_is_circular() {
        let mut cells = sheet();
        let cell = Cell::with_formula(5, 1, "=A5+1");
        cells.insert(cell.name(), cell);
        let sheet = Sheet::new(&cells);
        let eval = BasicEvaluator::new(4);
        assert!(matches!(eval.evaluate("=A5+1", &sheet), Err(FormulaError::Circular(_))));
    }

    #[test]
    fn mutual_references_are_circular() {
        let mut cells = CellMap::new();
        for cell in [Cell::with_formula(1, 1, "=B1"), Cell::with_formula(1, 2, "=A1+1")] {
            cells.insert(cell.name(), cell);
        }
        let sheet = Sheet::new(&cells);
        let eval = BasicEvaluator::default();
        assert_eq!(
            eval.evaluate_cell(&cells["A1"], &sheet),
            Err(FormulaError::Circular("A1".to_string()))
        );
        assert!(matches!(eval.evaluate_cell(&cells["B1"], &sheet), Err(FormulaError::Circular(_))));
    }

    /// Running total in column C over forty rows of ones in column B.
    fn running_total(rows: u32) -> CellMap {
        let mut cells = CellMap::new();
        for row in 2..=rows + 1 {
            let formula = if row == 2 {
                "=B2".to_string()
            } else {
                format!("=C{}+B{}", row - 1, row)
            };
            for cell in [Cell::create(row, 2, 1), Cell::with_formula(row, 3, &formula)] {
                cells.insert(cell.name(), cell);
            }
        }
        cells
    }

    #[test]
    fn long_reference_chains_are_not_circular() {
        let cells = running_total(40);
        let sheet = Sheet::new(&cells);
        let eval = BasicEvaluator::default();
        assert_eq!(eval.evaluate_cell(&cells["C41"], &sheet), Ok(CellValue::Number(40.0)));
        assert_eq!(sheet.resolved(20, 3), Some(Ok(CellValue::Number(19.0))));
    }

    #[test]
    fn depth_guard_is_not_a_cycle() {
        let cells = running_total(40);
        let eval = BasicEvaluator::new(8);
        assert!(matches!(
            eval.evaluate_cell(&cells["C41"], &Sheet::new(&cells)),
            Err(FormulaError::TooDeep(_))
        ));

        // Walking up the chain in row order keeps every step shallow.
        let sheet = Sheet::new(&cells);
        for row in 2..=41 {
            let cell = &cells[&format!("C{}", row)];
            assert_eq!(eval.evaluate_cell(cell, &sheet), Ok(CellValue::Number(f64::from(row - 1))));
        }
    }

    #[test]
    fn nested_ranges_resolve_each_cell_once() {
        let mut cells = CellMap::new();
        let first = Cell::create(2, 1, 1);
        cells.insert(first.name(), first);
        for row in 3..=40 {
            let cell = Cell::with_formula(row, 1, &format!("=SUM(A2:A{})", row - 1));
            cells.insert(cell.name(), cell);
        }
        let sheet = Sheet::new(&cells);
        let eval = BasicEvaluator::default();
        for row in 3..=40 {
            let expected = 2f64.powi(row as i32 - 3);
            assert_eq!(eval.evaluate_cell(&cells[&format!("A{}", row)], &sheet), Ok(CellValue::Number(expected)));
        }
    }

    #[test]
    fn ranges_only_visit_cells_inside() {
        let cells = sheet();
        let sheet = Sheet::new(&cells);
        let rows: Vec<u32> = sheet.range((2, 1), (3, 1)).map(|c| c.row).collect();
        assert_eq!(rows, vec![2, 3]);
        assert_eq!(sheet.range((1, 2), (9, 2)).count(), 1);
        assert_eq!(sheet.range((3, 1), (1, 1)).count(), 0);
        assert!(sheet.cell(9, 9).is_none());
    }
}
