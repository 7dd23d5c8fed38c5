#![forbid(unsafe_code)]
//! evloop-exec: the event loop.
//!
//! - `grid`: the pre-allocated result grid, partitioned by sample
//! - `executor`: binds one sample and streams its components row by row
//! - `runtime`: the `Engine` that runs every sample, sequentially or one
//!   task per sample, and emits a `RunManifest`
//! - `scheduler`: the crate-local thread pool used for per-sample tasks
//! - `replay`: stable hashes of analyses and results
//! - `metrics`: tracing hooks (no-ops without the `tracing` feature)
//!
//! Samples never share mutable state: each task owns exactly one grid
//! partition and opens its own row sources.

pub mod executor;
pub mod grid;
pub mod metrics;
pub mod replay;
pub mod runtime;
pub mod scheduler;

pub use executor::SampleExecutor;
pub use grid::{ResultGrid, SamplePartition, SelectionYield};
pub use runtime::{Engine, ExecError, RunOutput};
