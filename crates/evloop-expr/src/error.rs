use thiserror::Error;

use evloop_core::schema::ColumnType;

use crate::shape::{ParamType, Shape};

/// Raised when an expression cannot be attached to a particular row source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindingError {
    #[error("expression '{expression}' has shape {shape}, which has no registered adapter")]
    UnsupportedShape { expression: String, shape: Shape },

    #[error("expression '{expression}' names {got} input column(s) but its function takes {expected}")]
    ArityMismatch {
        expression: String,
        expected: usize,
        got: usize,
    },

    #[error("expression '{expression}': column '{column}' not found in source '{source_name}'")]
    ColumnNotFound {
        expression: String,
        column: String,
        source_name: String,
    },

    #[error("expression '{expression}': column '{column}' has type {found}, parameter expects {expected}")]
    TypeMismatch {
        expression: String,
        column: String,
        expected: ParamType,
        found: ColumnType,
    },

    #[error("expression '{expression}': source '{source_name}' could not provide column '{column}': {message}")]
    Source {
        expression: String,
        column: String,
        source_name: String,
        message: String,
    },
}

impl BindingError {
    /// Name of the expression that failed to bind.
    pub fn expression(&self) -> &str {
        match self {
            BindingError::UnsupportedShape { expression, .. }
            | BindingError::ArityMismatch { expression, .. }
            | BindingError::ColumnNotFound { expression, .. }
            | BindingError::TypeMismatch { expression, .. }
            | BindingError::Source { expression, .. } => expression,
        }
    }

    /// Offending column, when the failure is about one.
    pub fn column(&self) -> Option<&str> {
        match self {
            BindingError::ColumnNotFound { column, .. }
            | BindingError::TypeMismatch { column, .. }
            | BindingError::Source { column, .. } => Some(column),
            _ => None,
        }
    }
}

/// Declaration-time errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("construction error: {0}")]
    Construction(String),

    #[error("formula '{formula}': {message}")]
    Formula { formula: String, message: String },
}
