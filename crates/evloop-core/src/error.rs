use thiserror::Error;

use crate::hist::FillError;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A declaration-time invariant was violated (bad binning, bad
    /// normalization inputs, invalid configuration).
    #[error("construction error: {0}")]
    Construction(String),

    #[error(transparent)]
    Fill(#[from] FillError),

    #[error("hashing error: {0}")]
    Hash(String),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
