#![forbid(unsafe_code)]
//! evloop-model: declarative analysis description.
//!
//! - `Sample`s of kind data/background/signal, each made of `Component`s
//!   (a row source plus its own weight, cut and normalization inputs)
//! - `Variable`s: scalar or vector expressions with a fixed binning
//! - `Selection`s: named predicates, evaluated independently per row
//! - `Analysis`: the validated combination of the three
//! - a small YAML DSL producing an `Analysis` plus config overrides
//!
//! Role checks (a cut must be a predicate, a weight a scalar, ...) happen
//! when the analysis is built, never inside the event loop.

pub mod analysis;
pub mod dsl;
pub mod error;
pub mod sample;
pub mod variable;

pub use analysis::Analysis;
pub use dsl::yaml::{load_yaml_analysis, parse_yaml_analysis, DslConfig, ParsedAnalysis};
pub use error::{ModelError, Result};
pub use sample::{Component, Sample, SampleKind};
pub use variable::{Selection, Variable};
