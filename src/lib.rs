#![forbid(unsafe_code)]
//! evloop: declarative sample × selection × variable histogramming over
//! columnar event data.
//!
//! This facade re-exports the workspace crates so applications can depend on a
//! single package:
//! - [`core`]: column types, histogram accumulators, configuration, manifests
//! - [`io`]: row sources (memory, CSV, JSONL, joins) and result writers
//! - [`expr`]: expressions, function shapes, and the binding registry
//! - [`model`]: samples, components, variables, selections, YAML DSL
//! - [`exec`]: per-sample event loop and the loop orchestrator

pub use evloop_core as core;
pub use evloop_exec as exec;
pub use evloop_expr as expr;
pub use evloop_io as io;
pub use evloop_model as model;
