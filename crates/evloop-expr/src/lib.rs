#![forbid(unsafe_code)]
//! evloop-expr: expressions over named columns and their binding to row sources.
//!
//! An `Expression` wraps a plain Rust closure (or a compiled string formula).
//! Its function shape (parameter types and output kind) is computed from the
//! closure's signature when the expression is declared. Binding looks the
//! shape up in a `BindingRegistry`, resolves the named columns against a row
//! source and produces an `Evaluator`: a zero-argument callable reading the
//! source's live row buffer.
//!
//! Dispatch happens once at bind time. Per row, an evaluator is one indirect
//! call plus a read of each input cell.

pub mod error;
pub mod evaluator;
pub mod expr;
pub mod formula;
pub mod kernel;
pub mod registry;
pub mod shape;

pub use error::{BindingError, ExprError};
pub use evaluator::Evaluator;
pub use expr::Expression;
pub use formula::Formula;
pub use kernel::{IntoKernel, Kernel, Output, Param};
pub use registry::BindingRegistry;
pub use shape::{OutputKind, ParamType, Shape};
