use crate::cell::{CellValue, format_number};
use crate::error::QueryError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// One output row: field name to value, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(Vec<(String, CellValue)>);

impl Record {
    pub fn new() -> Self {
        Record(Vec::new())
    }

    /// Build a record from a grid row keyed by the grid headers.
    pub fn from_row(headers: &[String], row: &[CellValue]) -> Self {
        Record(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
                .collect(),
        )
    }

    /// Set a field, replacing an earlier value under the same name.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_rows: usize,
    pub columns: Vec<String>,
    pub filters: Vec<String>,
}

/// Envelope returned for every query.
///
/// A failed result never carries data; a successful one always carries a
/// summary whose `total_rows` equals `data.len()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub success: bool,
    pub message: String,
    pub data: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

impl QueryResult {
    pub fn success(
        message: impl Into<String>,
        data: Vec<Record>,
        columns: Vec<String>,
        filters: Vec<String>,
    ) -> Self {
        let total_rows = data.len();
        QueryResult {
            success: true,
            message: message.into(),
            data,
            summary: Some(Summary {
                total_rows,
                columns,
                filters,
            }),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        QueryResult {
            success: false,
            message: message.into(),
            data: Vec::new(),
            summary: None,
        }
    }

    pub fn total_rows(&self) -> usize {
        self.summary.as_ref().map_or(0, |s| s.total_rows)
    }

    pub fn filters(&self) -> &[String] {
        self.summary.as_ref().map_or(&[], |s| s.filters.as_slice())
    }

    pub fn columns(&self) -> &[String] {
        self.summary.as_ref().map_or(&[], |s| s.columns.as_slice())
    }
}

impl From<QueryError> for QueryResult {
    fn from(err: QueryError) -> Self {
        QueryResult::failure(err.to_string())
    }
}

/// Statistic formatting for messages: at most two decimals.
pub fn format_stat(n: f64) -> String {
    format_number((n * 100.0).round() / 100.0)
}

/// Turn surviving grid rows into records keyed by header.
pub fn records<'a, I>(headers: &[String], rows: I) -> Vec<Record>
where
    I: IntoIterator<Item = &'a Vec<CellValue>>,
{
    rows.into_iter()
        .map(|row| Record::from_row(headers, row))
        .collect()
}

/// Success result over raw grid rows, with the grid headers as columns.
pub fn row_result<'a, I>(message: impl Into<String>, headers: &[String], rows: I, filters: Vec<String>) -> QueryResult
where
    I: IntoIterator<Item = &'a Vec<CellValue>>,
{
    QueryResult::success(message, records(headers, rows), headers.to_vec(), filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_in_column_order() {
        let record = Record::new()
            .with("region", "West")
            .with("sales", 120)
            .with("flag", CellValue::Null);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"region":"West","sales":120.0,"flag":null}"#);
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut record = Record::new().with("value", 1);
        record.insert("value", 2);
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("value"), Some(&CellValue::Number(2.0)));
    }

    #[test]
    fn envelope_field_names_are_stable() {
        let ok = QueryResult::success("done", vec![Record::new().with("a", 1)], vec!["a".into()], vec![]);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["summary"]["totalRows"], 1);
        assert!(json["summary"]["filters"].as_array().unwrap().is_empty());

        let failed = serde_json::to_value(QueryResult::failure("no data")).unwrap();
        assert_eq!(failed["success"], false);
        assert!(failed.get("summary").is_none());
    }

    #[test]
    fn stats_round_to_two_decimals() {
        assert_eq!(format_stat(133.33333), "133.33");
        assert_eq!(format_stat(160.0), "160");
    }
}
