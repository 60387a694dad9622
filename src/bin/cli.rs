#![cfg(not(tarpaulin_include))]

use sheet_query::downloader::{export, to_json};
use sheet_query::loader::load_cells;
use sheet_query::{EngineConfig, QueryEngine, QueryResult, Workbook, classify};
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let s = Instant::now();
    let args: Vec<String> = env::args().collect();

    let mut files = Vec::new();
    let mut config = EngineConfig::default();
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--config" {
            let path = args.get(i + 1).ok_or("--config needs a file")?;
            config = EngineConfig::from_json_file(path)?;
            i += 2;
        } else {
            files.push(args[i].clone());
            i += 1;
        }
    }
    if files.is_empty() {
        eprintln!("Usage: {} <data-file>... [--config <config.json>]", args[0]);
        return Ok(());
    }

    let mut workbook = Workbook::new();
    for file in &files {
        let cells = load_cells(file)?;
        let name = Path::new(file)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(file.as_str())
            .to_string();
        println!("Loaded {} cells into sheet {}", cells.len(), name);
        workbook.add_sheet(name, cells);
    }

    let engine = QueryEngine::with_config(config);
    let mut last: Option<QueryResult> = None;
    let mut json = false;
    let mut start_time = Instant::now();
    let mut status = String::from("ok");
    loop {
        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let command = command.trim();

        start_time = Instant::now();

        if command.is_empty() {
            status = String::from("empty query");
            continue;
        }

        if command == "help" {
            println!("Commands:");
            println!("  q: Quit");
            println!("  :json: Toggle JSON output");
            println!("  :export <file>: Write the last result as CSV (or JSON for .json)");
            println!("  :intent <query>: Show how a query is classified");
            println!("  :sheets: List loaded sheets");
            println!("  :use <sheet>: Make a sheet active");
            println!("  <query>: Run a query, e.g. top 5 sales");
            continue;
        }

        if command == "q" {
            break;
        } else if command == ":json" {
            json = !json;
            status = format!("json {}", if json { "on" } else { "off" });
        } else if let Some(file) = command.strip_prefix(":export") {
            let file = file.trim();
            status = match (&last, file.is_empty()) {
                (_, true) => String::from("missing file name"),
                (None, false) => String::from("nothing to export"),
                (Some(result), false) => match export(result, file) {
                    Ok(()) => format!("wrote {}", file),
                    Err(e) => format!("export failed: {}", e),
                },
            };
        } else if let Some(query) = command.strip_prefix(":intent") {
            println!("{}", classify(query));
            status = String::from("ok");
        } else if command == ":sheets" {
            for name in workbook.sheet_names() {
                let marker = if Some(name) == workbook.active() { "*" } else { " " };
                println!("{} {}", marker, name);
            }
            status = String::from("ok");
        } else if let Some(name) = command.strip_prefix(":use") {
            status = if workbook.set_active(name.trim()) {
                String::from("ok")
            } else {
                String::from("unknown sheet")
            };
        } else {
            let result = workbook.process(&engine, command);
            if json {
                println!("{}", to_json(&result)?);
            } else {
                print_result(&result);
            }
            status = if result.success {
                format!("{} rows", result.total_rows())
            } else {
                String::from("failed")
            };
            last = Some(result);
        }
    }

    let e = s.elapsed().as_secs_f64();
    println!("Total elapsed time: {:.1} seconds", e);

    Ok(())
}

fn print_result(result: &QueryResult) {
    println!("{}", result.message);
    if !result.filters().is_empty() {
        println!("Filters: {}", result.filters().join("; "));
    }
    let columns = result.columns();
    if columns.is_empty() {
        return;
    }

    let cells: Vec<Vec<String>> = result
        .data
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|c| record.get(c).map(|v| v.to_string()).unwrap_or_default())
                .collect()
        })
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: &[String]| {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect();
        println!("{}", padded.join(" | "));
    };
    line(columns);
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );
    for row in &cells {
        line(row.as_slice());
    }
}
