use thiserror::Error;

/// Failures that end a query with `success: false`.
///
/// Everything narrower than these (a formula that fails to evaluate, a filter
/// clause that cannot be completed, a missing target value) is absorbed by
/// the executor that meets it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("No data available. Add some data to the sheet before running a query.")]
    EmptyDataset,

    #[error("Could not find a {role} column in the data")]
    ColumnNotFound { role: &'static str },

    #[error("No numeric columns available for {purpose}")]
    NoNumericColumn { purpose: &'static str },

    #[error("Queries about another sheet must be routed to that sheet before they reach the query engine")]
    UnroutedSheet,

    #[error("No sheet named '{name}' in this workbook")]
    SheetNotFound { name: String },
}

pub type Result<T> = std::result::Result<T, QueryError>;
