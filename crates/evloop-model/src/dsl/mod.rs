//! Declarative front ends producing an `Analysis`.

pub mod yaml;
