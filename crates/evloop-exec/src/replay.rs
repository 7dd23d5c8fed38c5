//! Reproducibility helpers.
//!
//! The analysis hash covers the declaration summary from
//! `Analysis::describe`. The results hash covers every accumulator in grid
//! order; within one sample the fill order is fixed, so two runs of the same
//! analysis over the same sources hash identically.

use evloop_core::hash::Hash256;
use evloop_model::Analysis;

use crate::grid::ResultGrid;
use crate::ExecError;

/// Stable digest of what an analysis declares.
pub fn hash_analysis(analysis: &Analysis) -> Hash256 {
    Hash256::of_bytes(analysis.describe().as_bytes())
}

/// Stable digest of every accumulator and its (sample, selection, variable) key.
pub fn hash_results(grid: &ResultGrid) -> Result<Hash256, ExecError> {
    let keyed: Vec<_> = grid
        .records()
        .map(|r| (r.sample, r.selection, r.variable, r.hist))
        .collect();
    Hash256::of_serde(&keyed).map_err(|e| ExecError::Hash(e.to_string()))
}
