use crate::cell::{CellMap, CellValue};
use crate::error::QueryError;
use crate::formula::{BasicEvaluator, FormulaEvaluator};
use crate::grid::{Bounds, ChunkProgress, Grid, materialize_chunked};
use crate::intent::{self, Intent, ROUTES, Route};
use crate::loader::LoadError;
use crate::result::QueryResult;
use crate::schema::{ColumnType, infer_column_types};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for the engine. Every field has a default, so a config file
/// only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Row limit for ranking queries that name no number.
    pub default_limit: usize,
    /// Share of samples a type must exceed to claim a column.
    pub type_threshold: f64,
    /// Cells materialized between yield points.
    pub chunk_size: usize,
    /// Deepest chain of formula references followed before giving up.
    /// Cycles are detected separately, at any depth.
    pub max_formula_depth: usize,
    /// Cells below this row are skipped when materializing.
    pub max_rows: u32,
    /// Cells right of this column are skipped when materializing.
    pub max_cols: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            type_threshold: 0.7,
            chunk_size: 4096,
            max_formula_depth: 256,
            max_rows: Bounds::default().max_rows,
            max_cols: Bounds::default().max_cols,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds {
            max_rows: self.max_rows,
            max_cols: self.max_cols,
        }
    }
}

/// Immutable snapshot of one sheet: the materialized grid and its inferred
/// column types. Queries only read it, so one snapshot can serve any number
/// of queries, from any number of threads.
#[derive(Debug, Clone)]
pub struct Dataset {
    grid: Grid,
    types: Vec<ColumnType>,
    config: EngineConfig,
}

impl Dataset {
    pub fn new(grid: Grid, config: EngineConfig) -> Self {
        let types = infer_column_types(&grid, config.type_threshold);
        Dataset {
            grid,
            types,
            config,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn headers(&self) -> &[String] {
        &self.grid.headers
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        self.grid.data_rows()
    }

    pub fn types(&self) -> &[ColumnType] {
        &self.types
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn column_type(&self, col: usize) -> ColumnType {
        self.types.get(col).copied().unwrap_or(ColumnType::Text)
    }

    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.types.len())
            .filter(|&i| self.types[i] == ColumnType::Number)
            .collect()
    }

    pub fn non_numeric_columns(&self) -> Vec<usize> {
        (0..self.types.len())
            .filter(|&i| self.types[i] != ColumnType::Number)
            .collect()
    }

    /// Classify the query and run the matching executor.
    pub fn query(&self, text: &str) -> QueryResult {
        let q = intent::normalize(text);
        self.run(intent::route(&q), &q)
    }

    /// Run one specific executor regardless of what the classifier would pick.
    pub fn execute(&self, intent: Intent, text: &str) -> QueryResult {
        let q = intent::normalize(text);
        let route = ROUTES
            .iter()
            .find(|r| r.intent == intent)
            .unwrap_or(&intent::FALLBACK);
        self.run(route, &q)
    }

    fn run(&self, route: &Route, q: &str) -> QueryResult {
        if self.grid.is_empty() {
            return QueryError::EmptyDataset.into();
        }
        log::debug!("query `{}` routed to {}", q, route.intent);
        match (route.execute)(self, q) {
            Ok(result) => result,
            Err(err) => {
                log::debug!("{} query failed: {}", route.intent, err);
                err.into()
            }
        }
    }
}

/// Entry point tying the materializer, type inference and executors together.
#[derive(Debug, Clone, Default)]
pub struct QueryEngine<E = BasicEvaluator> {
    config: EngineConfig,
    evaluator: E,
}

impl QueryEngine<BasicEvaluator> {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let evaluator = BasicEvaluator::new(config.max_formula_depth);
        QueryEngine { config, evaluator }
    }
}

impl<E: FormulaEvaluator> QueryEngine<E> {
    pub fn with_evaluator(config: EngineConfig, evaluator: E) -> Self {
        QueryEngine { config, evaluator }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self, cells: &CellMap) -> Dataset {
        self.snapshot_with_yield(cells, |_| {})
    }

    /// Build a snapshot, calling `on_chunk` every `chunk_size` cells so a
    /// cooperative scheduler can interleave other work.
    pub fn snapshot_with_yield<F: FnMut(ChunkProgress)>(&self, cells: &CellMap, on_chunk: F) -> Dataset {
        let grid = materialize_chunked(
            cells,
            &self.evaluator,
            self.config.bounds(),
            self.config.chunk_size,
            on_chunk,
        );
        Dataset::new(grid, self.config.clone())
    }

    /// Materialize `cells` and answer one query against them.
    pub fn process(&self, cells: &CellMap, query: &str) -> QueryResult {
        self.snapshot(cells).query(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_fills_missing_keys_with_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "default_limit": 3 }"#).unwrap();
        assert_eq!(config.default_limit, 3);
        assert_eq!(config.type_threshold, 0.7);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.max_formula_depth, 256);
        assert_eq!(config.bounds(), Bounds::default());

        let config = EngineConfig::from_json_str(r#"{ "max_rows": 999, "max_cols": 18278 }"#).unwrap();
        assert_eq!(config.bounds().max_rows, 999);
        assert_eq!(config.bounds().max_cols, 18278);
        assert!(EngineConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn empty_snapshot_fails_every_intent() {
        let dataset = QueryEngine::new().snapshot(&CellMap::new());
        for route in ROUTES {
            let result = dataset.execute(route.intent, "anything");
            assert!(!result.success);
            assert!(result.data.is_empty());
        }
    }
}
