use thiserror::Error;

use evloop_core::schema::ColumnType;

/// Result type local to evloop-io.
pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("column '{column}' not found in source '{source_name}'")]
    ColumnNotFound { source_name: String, column: String },

    #[error("column '{column}' in source '{source_name}' has type {found}, expected {expected}")]
    TypeMismatch {
        source_name: String,
        column: String,
        expected: ColumnType,
        found: ColumnType,
    },

    #[error("join error: {0}")]
    Join(#[from] JoinError),

    #[error("parse error in '{source_name}' at line {line}: {message}")]
    Parse {
        source_name: String,
        line: u64,
        message: String,
    },

    #[error("invalid source: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("cannot join zero sources")]
    Empty,

    #[error("sources '{left}' ({left_rows} rows) and '{right}' ({right_rows} rows) disagree on row count")]
    RowCountMismatch {
        left: String,
        left_rows: u64,
        right: String,
        right_rows: u64,
    },

    #[error("column '{column}' is provided by both '{left}' and '{right}'")]
    DuplicateColumn {
        column: String,
        left: String,
        right: String,
    },

    #[error("source '{ended}' ended after {rows} rows while '{other}' still has rows")]
    EndedEarly {
        ended: String,
        other: String,
        rows: u64,
    },
}
