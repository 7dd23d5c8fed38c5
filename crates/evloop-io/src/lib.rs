#![forbid(unsafe_code)]
//! evloop-io: row sources and result writers.
//!
//! A row source exposes named, typed columns through a live row buffer:
//! binding hands out `Slot` handles once, and every `advance()` rewrites the
//! slots in place so all bound readers observe the same row. Sources are
//! single-threaded by construction (slots are `Rc`), so one source instance
//! belongs to exactly one sample's execution.

pub mod buffer;
pub mod error;
pub mod join;
pub mod readers;
pub mod source;
pub mod writers;

pub use buffer::{RowBuffer, Slot};
pub use error::{JoinError, Result, SourceError};
pub use join::JoinedSource;
pub use readers::csv::CsvSource;
pub use readers::jsonl::JsonlSource;
pub use readers::memory::MemorySource;
pub use source::{Capped, RowSource, SourceSpec};
