//! Run manifest emitted after a successful event loop.
//!
//! Records what ran (analysis hash, config), when, and how many rows each
//! sample consumed. Row counts are for reporting only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LoopConfig;
use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRun {
    pub sample: String,
    /// Rows read across all components (after the optional row cap).
    pub rows_processed: u64,
    /// Rows that passed the sample and component cuts.
    pub rows_accepted: u64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Stable hash of the analysis declaration summary.
    pub analysis_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    pub config: LoopConfig,

    pub samples: Vec<SampleRun>,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(analysis_hash: Hash256, config: LoopConfig, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            analysis_hash,
            engine_version: crate::VERSION.to_string(),
            config,
            samples: Vec::new(),
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, samples: Vec<SampleRun>) -> Self {
        self.finished_ms = finished_ms;
        self.samples = samples;
        self
    }

    pub fn total_rows(&self) -> u64 {
        self.samples.iter().map(|s| s.rows_processed).sum()
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }
}
