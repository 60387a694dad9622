/*!
# Sheet Query

Natural-language queries over a spreadsheet's cells, built in Rust.

## Overview

The engine takes the sparse cell store behind a spreadsheet together with a
free-text command such as `"top 5 sales"` or `"average sales by region"`, and
answers it with a uniform, JSON-serializable result. Classification is plain
keyword and pattern matching: the same query on the same cells always gives
the same answer.

## Pipeline

### Grid Layer
- **Cell Store** - `CellMap`, cells keyed by coordinate name (`"A1"`)
- **Formula Evaluator** - `=A1+B2`, `=SUM(B2:B9)` and friends, best effort
- **Grid Materializer** - dense matrix with row 1 as the header row
- **Type Inference** - number, date, boolean or text per column

### Query Layer
- **Intent Classifier** - ordered route table, first match wins:
  chart, region, product, date, sales, ranking, comparison, aggregation,
  filter, sheet, then a keyword search
- **Column Resolver** - maps role keywords and query words to headers
- **Clause Grammar** - `<column> <operator> <value>` filter clauses
- **Executors** - one per intent, read-only over a snapshot

### Edges
- CSV and JSON import into a cell map
- CSV and JSON export of a result
- Multi-sheet workbook routing
- Interactive shell (`sheet-query <data-file>`)

## Result Contract

Every query returns a `QueryResult`:

- `success: false` carries an explanatory `message` and no data
- `success: true` carries `data` rows and a `summary` whose `totalRows`
  equals the number of rows

## Usage

```
use sheet_query::{CellValue, QueryEngine, cell_map_from_rows};

let rows: Vec<Vec<CellValue>> = vec![
    vec!["Region".into(), "Product".into(), "Sales".into()],
    vec!["West".into(), "WidgetA".into(), 120.into()],
    vec!["East".into(), "WidgetB".into(), 80.into()],
    vec!["West".into(), "WidgetC".into(), 200.into()],
];
let cells = cell_map_from_rows(rows);

let result = QueryEngine::new().process(&cells, "top 1 sales");
assert!(result.success);
assert_eq!(result.data.len(), 1);
```
*/

pub mod cell;
pub mod clause;
pub mod downloader;
pub mod engine;
pub mod error;
pub mod executor;
pub mod formula;
pub mod grid;
pub mod intent;
pub mod loader;
pub mod resolver;
pub mod result;
pub mod router;
pub mod schema;
pub mod vocab;

/// Re-export the types most callers need
pub use cell::{Cell, CellMap, CellValue, cell_map_from_rows};
pub use engine::{Dataset, EngineConfig, QueryEngine};
pub use error::QueryError;
pub use formula::{BasicEvaluator, FormulaError, FormulaEvaluator, Sheet};
pub use intent::{Intent, classify};
pub use loader::LoadError;
pub use result::{QueryResult, Record, Summary};
pub use router::Workbook;
pub use schema::ColumnType;

/// Answer one query against `cells` with the default configuration.
pub fn process_query(cells: &CellMap, query: &str) -> QueryResult {
    QueryEngine::new().process(cells, query)
}
