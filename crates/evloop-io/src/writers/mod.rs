//! Histogram result writers.
//!
//! Writers take borrowed `HistogramRecord`s so they stay independent of how
//! the executor lays out its result grid.

pub mod csv;
pub mod json;

use evloop_core::hist::HistogramAccumulator;

/// One histogram addressed by its (sample, selection, variable) names.
#[derive(Debug, Clone, Copy)]
pub struct HistogramRecord<'a> {
    pub sample: &'a str,
    pub selection: &'a str,
    pub variable: &'a str,
    pub hist: &'a HistogramAccumulator,
}
