//! Row sources over in-memory tables and line-oriented files.

pub mod csv;
pub mod jsonl;
pub mod memory;
