//! Convenient re-exports for downstream crates.

pub use crate::config::{LoopConfig, LoopConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::hist::{BinSlot, Binning, FillError, HistogramAccumulator};
pub use crate::id::{SampleId, SelectionId, VariableId};
pub use crate::manifest::{ManifestId, RunManifest, SampleRun};
pub use crate::schema::{ColumnType, Field, Schema};
pub use crate::types::{Column, ColumnData, Table, Value};
