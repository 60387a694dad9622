use sheet_query::intent::ROUTES;
use sheet_query::{
    CellMap, CellValue, ColumnType, EngineConfig, QueryEngine, QueryResult, cell_map_from_rows, process_query,
};

/// Region, Product, Sales with three data rows.
fn sales_cells() -> CellMap {
    let rows: Vec<Vec<CellValue>> = vec![
        vec!["Region".into(), "Product".into(), "Sales".into()],
        vec!["West".into(), "WidgetA".into(), 120.into()],
        vec!["East".into(), "WidgetB".into(), 80.into()],
        vec!["West".into(), "WidgetC".into(), 200.into()],
    ];
    cell_map_from_rows(rows)
}

/// Wider sheet with a date column and two numeric columns.
fn orders_cells() -> CellMap {
    let rows: Vec<Vec<CellValue>> = vec![
        vec!["Date".into(), "Region".into(), "Product".into(), "Units".into(), "Sales".into()],
        vec!["2024-01-15".into(), "West".into(), "WidgetA".into(), 3.into(), 120.into()],
        vec!["2024-03-02".into(), "East".into(), "WidgetB".into(), 5.into(), 80.into()],
        vec!["2024-03-20".into(), "West".into(), "WidgetC".into(), 2.into(), 200.into()],
        vec!["2023-11-05".into(), "North".into(), "WidgetA".into(), 4.into(), 150.into()],
    ];
    cell_map_from_rows(rows)
}

fn field(result: &QueryResult, row: usize, key: &str) -> CellValue {
    result.data[row].get(key).cloned().unwrap_or_default()
}

fn column(result: &QueryResult, key: &str) -> Vec<CellValue> {
    (0..result.data.len()).map(|i| field(result, i, key)).collect()
}

#[test]
fn infers_column_types() {
    let dataset = QueryEngine::new().snapshot(&sales_cells());
    assert_eq!(dataset.headers(), ["region", "product", "sales"]);
    assert_eq!(dataset.types(), [ColumnType::Text, ColumnType::Text, ColumnType::Number]);

    let orders = QueryEngine::new().snapshot(&orders_cells());
    assert_eq!(orders.column_type(0), ColumnType::Date);
    assert_eq!(orders.numeric_columns(), vec![3, 4]);
}

#[test]
fn region_lookup_keeps_matching_rows() {
    let result = process_query(&sales_cells(), "show west region data");
    assert!(result.success);
    assert_eq!(column(&result, "product"), vec![CellValue::text("WidgetA"), CellValue::text("WidgetC")]);
    assert_eq!(column(&result, "sales"), vec![CellValue::Number(120.0), CellValue::Number(200.0)]);
    assert_eq!(result.filters(), ["region = west"]);
}

#[test]
fn lookup_without_target_returns_everything() {
    let result = process_query(&sales_cells(), "show region data");
    assert!(result.success);
    assert_eq!(result.data.len(), 3);
    assert!(result.filters().is_empty());
}

#[test]
fn product_lookup_uses_word_after_keyword() {
    let result = process_query(&orders_cells(), "show product widgeta");
    assert_eq!(result.data.len(), 2);
    assert_eq!(result.filters(), ["product = widgeta"]);
}

#[test]
fn date_lookup_matches_calendar_fields() {
    let result = process_query(&orders_cells(), "sales in march 2024");
    assert!(result.success);
    assert_eq!(column(&result, "product"), vec![CellValue::text("WidgetB"), CellValue::text("WidgetC")]);
    assert_eq!(result.filters(), ["date = march", "date = 2024"]);
}

#[test]
fn top_one_by_sales() {
    let result = process_query(&sales_cells(), "top 1 sales");
    assert!(result.success);
    assert_eq!(result.data.len(), 1);
    assert_eq!(field(&result, 0, "product"), CellValue::text("WidgetC"));
    assert_eq!(field(&result, 0, "sales"), CellValue::Number(200.0));
}

#[test]
fn bottom_ranking_and_default_limit() {
    let result = process_query(&orders_cells(), "bottom 2 units");
    assert_eq!(column(&result, "units"), vec![CellValue::Number(2.0), CellValue::Number(3.0)]);

    let config = EngineConfig {
        default_limit: 2,
        ..EngineConfig::default()
    };
    let result = QueryEngine::with_config(config).process(&orders_cells(), "highest sales");
    assert_eq!(column(&result, "sales"), vec![CellValue::Number(200.0), CellValue::Number(150.0)]);
}

#[test]
fn numeric_filter_clause() {
    let result = process_query(&sales_cells(), "find records where sales > 100");
    assert!(result.success);
    assert_eq!(column(&result, "sales"), vec![CellValue::Number(120.0), CellValue::Number(200.0)]);
    assert_eq!(result.filters(), ["sales > 100"]);
}

#[test]
fn clauses_are_anded() {
    let result = process_query(&orders_cells(), "where units > 2 and sales < 150");
    assert_eq!(column(&result, "product"), vec![CellValue::text("WidgetA"), CellValue::text("WidgetB")]);
    assert_eq!(result.filters(), ["units > 2", "sales < 150"]);
}

#[test]
fn token_filter_without_clauses() {
    let result = process_query(&orders_cells(), "filter widgeta");
    assert_eq!(result.data.len(), 2);
    assert_eq!(result.filters(), ["any column contains 'widgeta'"]);
}

#[test]
fn average_sales_by_region() {
    let result = process_query(&sales_cells(), "average sales by region");
    assert!(result.success);
    assert_eq!(result.columns(), ["region", "sum", "count", "average"]);
    assert_eq!(field(&result, 0, "region"), CellValue::text("West"));
    assert_eq!(field(&result, 0, "average"), CellValue::Number(160.0));
    assert_eq!(field(&result, 1, "region"), CellValue::text("East"));
    assert_eq!(field(&result, 1, "average"), CellValue::Number(80.0));
}

#[test]
fn ungrouped_sales_summarizes_in_message() {
    let result = process_query(&orders_cells(), "total sales");
    assert_eq!(result.data.len(), 4);
    assert!(result.message.contains("Total: 550"), "{}", result.message);
    assert!(result.filters().is_empty());
}

#[test]
fn comparison_reports_difference() {
    let result = process_query(&sales_cells(), "compare widgeta vs widgetb");
    assert!(result.success);
    assert_eq!(result.data.len(), 3);
    assert_eq!(field(&result, 0, "sum"), CellValue::Number(120.0));
    assert_eq!(field(&result, 1, "sum"), CellValue::Number(80.0));
    assert_eq!(field(&result, 2, "product"), CellValue::text("widgeta vs widgetb"));
    assert_eq!(field(&result, 2, "difference"), CellValue::Number(40.0));
    assert_eq!(field(&result, 2, "percentDifference"), CellValue::Number(50.0));
}

#[test]
fn unresolved_comparison_returns_all_rows() {
    let result = process_query(&sales_cells(), "compare gadgets vs gizmos");
    assert!(result.success);
    assert_eq!(result.data.len(), 3);
}

#[test]
fn aggregation_over_named_column() {
    let result = process_query(&orders_cells(), "average units");
    assert_eq!(result.columns(), ["avg_units"]);
    assert_eq!(field(&result, 0, "avg_units"), CellValue::Number(3.5));

    let grouped = process_query(&orders_cells(), "max units by region");
    assert_eq!(grouped.columns(), ["region", "max_units"]);
    assert_eq!(
        column(&grouped, "max_units"),
        vec![CellValue::Number(3.0), CellValue::Number(5.0), CellValue::Number(4.0)]
    );
}

#[test]
fn chart_sums_value_per_category() {
    let result = process_query(&orders_cells(), "pie chart of sales by region");
    assert!(result.success);
    assert!(result.message.contains("pie"));
    assert_eq!(result.columns(), ["region", "sales", "category", "value"]);
    assert_eq!(
        column(&result, "value"),
        vec![CellValue::Number(320.0), CellValue::Number(80.0), CellValue::Number(150.0)]
    );
    assert_eq!(field(&result, 2, "category"), CellValue::text("North"));
}

#[test]
fn chart_needs_a_numeric_column() {
    let rows: Vec<Vec<CellValue>> = vec![vec!["Name".into()], vec!["Ada".into()]];
    let result = process_query(&cell_map_from_rows(rows), "chart names");
    assert!(!result.success);
    assert!(result.data.is_empty());
}

#[test]
fn keyword_search_fallback() {
    let result = process_query(&orders_cells(), "widgetc");
    assert_eq!(result.data.len(), 1);
    let everything = process_query(&orders_cells(), "");
    assert_eq!(everything.data.len(), 4);
}

#[test]
fn sheet_queries_need_the_workbook_router() {
    let result = process_query(&orders_cells(), "open the budget worksheet");
    assert!(!result.success);
    assert!(!result.message.is_empty());
}

#[test]
fn empty_cell_map_fails_every_executor() {
    let dataset = QueryEngine::new().snapshot(&CellMap::new());
    for route in ROUTES {
        let result = dataset.execute(route.intent, "top 5 sales in west");
        assert!(!result.success, "{} succeeded", route.intent);
        assert!(result.data.is_empty());
        assert!(!result.message.is_empty());
    }
    let fallback = process_query(&CellMap::new(), "widgeta");
    assert!(!fallback.success);
}

#[test]
fn header_only_sheet_returns_no_rows() {
    let rows: Vec<Vec<CellValue>> = vec![vec!["Region".into(), "Sales".into()]];
    let cells = cell_map_from_rows(rows);
    for query in ["top 5 sales", "total sales", "show west region data", "where sales > 1", "widgeta"] {
        let result = process_query(&cells, query);
        assert!(result.success, "{}: {}", query, result.message);
        assert_eq!(result.total_rows(), 0);
    }
}

#[test]
fn text_sales_columns_are_passed_over() {
    let rows: Vec<Vec<CellValue>> = vec![
        vec!["Sales Rep".into(), "Amount".into()],
        vec!["Ada".into(), 120.into()],
        vec!["Grace".into(), 300.into()],
        vec!["Linus".into(), 80.into()],
    ];
    let cells = cell_map_from_rows(rows);

    let top = process_query(&cells, "top 1 sales");
    assert!(top.success, "{}", top.message);
    assert_eq!(top.data.len(), 1);
    assert_eq!(field(&top, 0, "sales rep"), CellValue::text("Grace"));
    assert_eq!(top.filters(), ["top 1 by amount"]);

    let total = process_query(&cells, "total sales");
    assert!(total.message.contains("Total: 500"), "{}", total.message);
    assert_eq!(total.data.len(), 3);
}

#[test]
fn running_totals_aggregate_over_every_row() {
    let mut rows: Vec<Vec<CellValue>> = vec![vec!["Step".into(), "Running".into()]];
    rows.extend((2..=41).map(|_| vec![CellValue::from(1), CellValue::Null]));
    let mut cells = cell_map_from_rows(rows);
    for row in 2..=41u32 {
        let formula = if row == 2 {
            "=A2".to_string()
        } else {
            format!("=B{}+A{}", row - 1, row)
        };
        let cell = sheet_query::Cell::with_formula(row, 2, formula);
        cells.insert(cell.name(), cell);
    }

    let result = process_query(&cells, "total running");
    assert!(result.success, "{}", result.message);
    assert_eq!(field(&result, 0, "sum_running"), CellValue::Number(820.0));
    let top = process_query(&cells, "top 1 running");
    assert_eq!(field(&top, 0, "running"), CellValue::Number(40.0));
}

#[test]
fn far_away_cells_do_not_stop_a_query() {
    let mut cells = sales_cells();
    let far = sheet_query::Cell::create(3_000_000_000, 3_000_000_000, 1);
    cells.insert(far.name(), far);
    let result = process_query(&cells, "top 1 sales");
    assert!(result.success, "{}", result.message);
    assert_eq!(field(&result, 0, "sales"), CellValue::Number(200.0));

    let narrow = QueryEngine::with_config(EngineConfig {
        max_cols: 2,
        ..EngineConfig::default()
    });
    assert_eq!(narrow.snapshot(&sales_cells()).headers(), ["region", "product"]);
}

#[test]
fn repeated_headers_serialize_to_distinct_keys() {
    let rows: Vec<Vec<CellValue>> = vec![
        vec!["Region".into(), "Region".into(), "Sales".into()],
        vec!["West".into(), "Coast".into(), 120.into()],
    ];
    let result = process_query(&cell_map_from_rows(rows), "top 1 sales");
    assert_eq!(result.columns(), ["region", "region_2", "sales"]);
    let json = serde_json::to_string(&result.data[0]).unwrap();
    assert_eq!(json.matches(r#""region":"#).count(), 1, "{}", json);
    assert!(json.contains(r#""region_2":"Coast""#), "{}", json);
}

const QUERIES: &[&str] = &[
    "show west region data",
    "show product widgeta",
    "sales in march 2024",
    "total sales",
    "average sales by region",
    "top 2 sales",
    "bottom 1 units",
    "compare widgeta vs widgetb",
    "sum units by product",
    "count",
    "where units >= 3",
    "bar chart of units",
    "widgeta west",
];

#[test]
fn same_query_same_bytes() {
    let cells = orders_cells();
    for query in QUERIES {
        let first = serde_json::to_string(&process_query(&cells, query)).unwrap();
        let second = serde_json::to_string(&process_query(&cells, query)).unwrap();
        assert_eq!(first, second, "{}", query);
    }
}

#[test]
fn successful_results_are_consistent() {
    let cells = orders_cells();
    for query in QUERIES {
        let result = process_query(&cells, query);
        assert!(result.success, "{}: {}", query, result.message);
        assert_eq!(result.data.len(), result.total_rows(), "{}", query);
        for record in &result.data {
            for key in record.keys() {
                assert!(result.columns().iter().any(|c| c == key), "{}: {} not in columns", query, key);
            }
        }
    }
}

#[test]
fn chunked_snapshot_matches_single_pass() {
    let engine = QueryEngine::with_config(EngineConfig {
        chunk_size: 3,
        ..EngineConfig::default()
    });
    let cells = orders_cells();
    let mut calls = 0;
    let chunked = engine.snapshot_with_yield(&cells, |progress| {
        calls += 1;
        assert!(progress.processed <= progress.total);
    });
    assert_eq!(calls, cells.len().div_ceil(3));
    assert_eq!(chunked.grid(), QueryEngine::new().snapshot(&cells).grid());
}

#[test]
fn snapshots_are_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<sheet_query::Dataset>();

    let dataset = std::sync::Arc::new(QueryEngine::new().snapshot(&sales_cells()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dataset = dataset.clone();
            std::thread::spawn(move || dataset.query("top 1 sales"))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().data.len(), 1);
    }
}
