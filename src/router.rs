//! Multi-sheet routing: pick the sheet a query names, then hand the rest of
//! the query to the engine.

use crate::cell::CellMap;
use crate::engine::QueryEngine;
use crate::error::QueryError;
use crate::formula::FormulaEvaluator;
use crate::result::QueryResult;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

lazy_static! {
    static ref SHEET_REF_REGEX: Regex =
        Regex::new(r"\b(?:in|on|from)?\s*(?:sheet|worksheet|tab)\s+([a-z0-9_\-]+)").unwrap();
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: BTreeMap<String, CellMap>,
    active: Option<String>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a sheet. The first sheet added becomes active.
    pub fn add_sheet(&mut self, name: impl Into<String>, cells: CellMap) {
        let name = name.into().to_lowercase();
        if self.active.is_none() {
            self.active = Some(name.clone());
        }
        self.sheets.insert(name, cells);
    }

    pub fn set_active(&mut self, name: &str) -> bool {
        let name = name.to_lowercase();
        if self.sheets.contains_key(&name) {
            self.active = Some(name);
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn sheet(&self, name: &str) -> Option<&CellMap> {
        self.sheets.get(&name.to_lowercase())
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    /// Split a query into the sheet it targets and the remaining text.
    /// Queries that name no sheet target the active one.
    pub fn resolve(&self, query: &str) -> Result<(&str, String), QueryError> {
        let q = query.trim().to_lowercase();
        let mut names: Vec<&String> = self.sheets.keys().collect();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));

        for name in names {
            let escaped = regex::escape(name);
            let patterns = [
                format!(r"\b(?:in|on|from)?\s*(?:sheet|worksheet|tab)\s+{}\b", escaped),
                format!(r"\b(?:in|on|from)?\s*{}\s+(?:sheet|worksheet|tab)\b", escaped),
            ];
            for pattern in patterns {
                let Ok(re) = Regex::new(&pattern) else {
                    continue;
                };
                if let Some(m) = re.find(&q) {
                    let rest = format!("{} {}", &q[..m.start()], &q[m.end()..]);
                    return Ok((name.as_str(), rest.split_whitespace().collect::<Vec<_>>().join(" ")));
                }
            }
        }

        if let Some(caps) = SHEET_REF_REGEX.captures(&q) {
            return Err(QueryError::SheetNotFound {
                name: caps[1].to_string(),
            });
        }
        match self.active.as_deref() {
            Some(active) => Ok((active, q)),
            None => Err(QueryError::EmptyDataset),
        }
    }

    pub fn process<E: FormulaEvaluator>(&self, engine: &QueryEngine<E>, query: &str) -> QueryResult {
        let (name, rest) = match self.resolve(query) {
            Ok(resolved) => resolved,
            Err(err) => return err.into(),
        };
        log::debug!("query routed to sheet {}", name);
        match self.sheets.get(name) {
            Some(cells) => engine.process(cells, &rest),
            None => QueryError::EmptyDataset.into(),
        }
    }
}
