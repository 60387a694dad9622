use crate::result::QueryResult;
use std::path::Path;

/// Convert a query result to CSV format
///
/// The header line is the result's column list; each record fills the
/// columns it has and leaves the rest blank. Commas, quotes and newlines are
/// escaped the usual way.
///
/// # Arguments
/// * `result` - The query result to convert
///
/// # Returns
/// * `String` - CSV content
///
/// # Examples
/// ```
/// use sheet_query::downloader::to_csv;
/// use sheet_query::result::{QueryResult, Record};
///
/// let result = QueryResult::success(
///     "1 row",
///     vec![Record::new().with("region", "West").with("sales", 120)],
///     vec!["region".into(), "sales".into()],
///     vec![],
/// );
/// assert_eq!(to_csv(&result), "region,sales\nWest,120\n");
/// ```
pub fn to_csv(result: &QueryResult) -> String {
    let columns = result.columns();
    let mut csv_content = String::new();

    let header: Vec<String> = columns.iter().map(|c| escape_field(c)).collect();
    csv_content.push_str(&header.join(","));
    csv_content.push('\n');

    for record in &result.data {
        let fields: Vec<String> = columns
            .iter()
            .map(|c| record.get(c).map(|v| escape_field(&v.to_string())).unwrap_or_default())
            .collect();
        csv_content.push_str(&fields.join(","));
        csv_content.push('\n');
    }

    csv_content
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Pretty-printed JSON of the full result envelope.
pub fn to_json(result: &QueryResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}

/// Write `result` to `path`, as JSON when the extension is `.json` and as
/// CSV otherwise.
pub fn export(result: &QueryResult, path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let content = if is_json {
        to_json(result)?
    } else {
        to_csv(result)
    };
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Record;

    #[test]
    fn escapes_and_fills_missing_fields() {
        let result = QueryResult::success(
            "2 rows",
            vec![
                Record::new().with("name", "Smith, J").with("note", "said \"hi\""),
                Record::new().with("name", "Lee"),
            ],
            vec!["name".into(), "note".into()],
            vec![],
        );
        assert_eq!(
            to_csv(&result),
            "name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\nLee,\n"
        );
    }

    #[test]
    fn failed_result_exports_header_only() {
        assert_eq!(to_csv(&QueryResult::failure("no data")), "\n");
    }
}
