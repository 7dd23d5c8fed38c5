#![forbid(unsafe_code)]
//! evloop-core: pure data shared by every evloop crate.
//!
//! - column types and schemas (`schema`)
//! - constant values and in-memory columnar tables (`types`)
//! - fixed-binning weighted histogram accumulators (`hist`)
//! - loop configuration (`config`)
//! - typed ids, stable hashing, and run manifests
//!
//! No I/O, no threading, no expression logic here.

pub mod config;
pub mod error;
pub mod hash;
pub mod hist;
pub mod id;
pub mod manifest;
pub mod prelude;
pub mod schema;
pub mod types;

pub use error::{Error, Result};

/// Engine version recorded in run manifests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
