//! Error types for the tabulate core.

use thiserror::Error;

/// All errors that can occur while building or transforming a [`crate::Table`].
#[derive(Debug, Error)]
pub enum TabulateError {
    #[error("cannot cast {input:?} to {type_name} at row {row}, column {column:?}")]
    Cast {
        row: usize,
        column: String,
        input: String,
        type_name: &'static str,
    },

    #[error("column {0:?} not found")]
    MissingColumn(String),

    #[error("operation requires column {column:?} to be {expected}, found {found}")]
    DataType {
        column: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("join failed: left row {row} has no match and require_match was set")]
    Join { row: usize },

    #[error("{method} is not safe to proxy across a TableSet: it does not return a Table")]
    UnsupportedAggregation { method: &'static str },

    #[error("line {line} exceeds the configured field size limit")]
    FieldSizeLimit { line: usize },
}

pub type TabulateResult<T> = Result<T, TabulateError>;
