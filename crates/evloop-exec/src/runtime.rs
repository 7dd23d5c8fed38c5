//! Runtime: run every sample of an analysis and emit a `RunManifest`.
//!
//! - The result grid is allocated in full before any sample starts.
//! - Sequential mode walks samples in declaration order and stops at the
//!   first failure.
//! - Parallel mode runs one task per sample on a crate-local pool; each
//!   task owns one grid partition. After the join, the error of the first
//!   failing sample in declaration order wins.
//! - Any error aborts the run: no partial grid is returned.

use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use evloop_core::config::LoopConfig;
use evloop_core::hist::FillError;
use evloop_core::id::SampleId;
use evloop_core::manifest::{RunManifest, SampleRun};
use evloop_expr::{BindingError, BindingRegistry};
use evloop_io::SourceError;
use evloop_model::Analysis;

use crate::executor::SampleExecutor;
use crate::grid::{ResultGrid, SamplePartition};
use crate::metrics::emit_span;
use crate::replay::hash_analysis;
use crate::scheduler::SamplePool;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("sample '{sample}': {source}")]
    Binding { sample: String, source: BindingError },
    #[error("sample '{sample}': row source: {source}")]
    Source { sample: String, source: SourceError },
    #[error("sample '{sample}': filling '{variable}': {source}")]
    Fill {
        sample: String,
        variable: String,
        source: FillError,
    },
    #[error("setup: {0}")]
    Setup(String),
    #[error("thread pool: {0}")]
    Pool(String),
    #[error("hashing error: {0}")]
    Hash(String),
}

impl ExecError {
    /// Sample the error belongs to, when it belongs to one.
    pub fn sample(&self) -> Option<&str> {
        match self {
            ExecError::Binding { sample, .. }
            | ExecError::Source { sample, .. }
            | ExecError::Fill { sample, .. } => Some(sample),
            _ => None,
        }
    }
}

/// A finished run: the filled grid plus its provenance.
#[derive(Debug)]
pub struct RunOutput {
    pub grid: ResultGrid,
    pub manifest: RunManifest,
}

/// Engine owns the loop configuration and the binding registry.
pub struct Engine {
    cfg: LoopConfig,
    registry: Cow<'static, BindingRegistry>,
}

impl Engine {
    /// Engine over the shared standard binding registry.
    pub fn new(cfg: LoopConfig) -> Self {
        Self {
            cfg,
            registry: Cow::Borrowed(BindingRegistry::standard()),
        }
    }

    /// Replace the registry, e.g. one extended with `BindingRegistry::admit`.
    pub fn with_registry(mut self, registry: BindingRegistry) -> Self {
        self.registry = Cow::Owned(registry);
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    /// Run every sample and return the filled grid.
    pub fn run(&self, analysis: &Analysis) -> Result<RunOutput, ExecError> {
        let started_ms = now_ms();
        let hash = hash_analysis(analysis);
        let mut grid = ResultGrid::allocate(analysis);
        let samples = analysis.samples().len();
        let parallel = self.cfg.parallel() && samples > 1;

        #[cfg(feature = "tracing")]
        tracing::info!(
            analysis = %hash.short(),
            samples,
            histograms = grid.len(),
            parallel,
            "event loop starting"
        );
        emit_span(
            "run_started",
            &[
                ("analysis", hash.short()),
                ("samples", samples.to_string()),
            ],
        );

        let runs = if parallel {
            self.run_parallel(analysis, grid.partitions_mut())?
        } else {
            self.run_sequential(analysis, grid.partitions_mut())?
        };

        let manifest = RunManifest::new(hash, self.cfg.clone(), started_ms).finish(now_ms(), runs);

        #[cfg(feature = "tracing")]
        tracing::info!(
            manifest = %manifest.id.0,
            rows = manifest.total_rows(),
            duration_ms = manifest.duration_ms(),
            "event loop finished"
        );
        emit_span(
            "run_finished",
            &[
                ("rows", manifest.total_rows().to_string()),
                ("duration_ms", manifest.duration_ms().to_string()),
            ],
        );

        Ok(RunOutput { grid, manifest })
    }

    fn run_sequential(
        &self,
        analysis: &Analysis,
        partitions: &mut [SamplePartition],
    ) -> Result<Vec<SampleRun>, ExecError> {
        let mut runs = Vec::with_capacity(partitions.len());
        for (i, partition) in partitions.iter_mut().enumerate() {
            let exec = SampleExecutor::new(analysis, SampleId::new(i), &self.cfg, &self.registry)?;
            runs.push(exec.run(partition)?);
        }
        Ok(runs)
    }

    fn run_parallel(
        &self,
        analysis: &Analysis,
        partitions: &mut [SamplePartition],
    ) -> Result<Vec<SampleRun>, ExecError> {
        let pool = SamplePool::new(self.cfg.max_parallel_tasks().min(partitions.len()))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(threads = pool.threads(), "sample pool ready");

        let registry: &BindingRegistry = &self.registry;
        let results = pool.run_each(partitions, |i, partition| {
            SampleExecutor::new(analysis, SampleId::new(i), &self.cfg, registry)?.run(partition)
        });

        // Results are in declaration order, so `collect` surfaces the first
        // failing sample's error.
        results.into_iter().collect()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
