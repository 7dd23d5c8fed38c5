//! Loop configuration that downstream crates can serialize/deserialize.
//!
//! A `LoopConfig` is validated once when built and never mutated afterwards;
//! the executor only ever sees fully-configured values.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Integrated luminosity used to normalize simulated samples.
    luminosity: f64,

    /// Unit conversion applied to `luminosity × cross-section` (e.g. pb → fb).
    unit_conversion: f64,

    /// When false every component normalization factor is 1.0.
    normalize_to_luminosity: bool,

    /// Optional cap on rows read from each component's row source.
    max_rows: Option<u64>,

    /// Run one task per sample instead of walking samples sequentially.
    parallel: bool,

    /// Thread-pool size used when `parallel` is set.
    max_parallel_tasks: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            luminosity: 1.0,
            unit_conversion: 1.0,
            normalize_to_luminosity: true,
            max_rows: None,
            parallel: false,
            max_parallel_tasks: default_parallelism(),
        }
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl LoopConfig {
    pub fn builder() -> LoopConfigBuilder {
        LoopConfigBuilder {
            cfg: Self::default(),
        }
    }

    /// Start a builder from this config (used for layered overrides).
    pub fn to_builder(&self) -> LoopConfigBuilder {
        LoopConfigBuilder { cfg: self.clone() }
    }

    pub fn luminosity(&self) -> f64 {
        self.luminosity
    }

    pub fn unit_conversion(&self) -> f64 {
        self.unit_conversion
    }

    pub fn normalize_to_luminosity(&self) -> bool {
        self.normalize_to_luminosity
    }

    pub fn max_rows(&self) -> Option<u64> {
        self.max_rows
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn max_parallel_tasks(&self) -> usize {
        self.max_parallel_tasks
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `EVLOOP_LUMINOSITY`: integrated luminosity
    /// - `EVLOOP_UNIT_CONVERSION`: luminosity × cross-section unit factor
    /// - `EVLOOP_NORMALIZE`: `true`/`false`, luminosity normalization
    /// - `EVLOOP_MAX_ROWS`: per-component row cap
    /// - `EVLOOP_PARALLEL`: `true`/`false`, one task per sample
    /// - `EVLOOP_MAX_PARALLEL_TASKS`: thread-pool size
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Result<Self> {
        let mut b = Self::builder();

        if let Some(v) = env_parse::<f64>("EVLOOP_LUMINOSITY") {
            b = b.luminosity(v);
        }
        if let Some(v) = env_parse::<f64>("EVLOOP_UNIT_CONVERSION") {
            b = b.unit_conversion(v);
        }
        if let Some(v) = env_parse::<bool>("EVLOOP_NORMALIZE") {
            b = b.normalize_to_luminosity(v);
        }
        if let Some(v) = env_parse::<u64>("EVLOOP_MAX_ROWS") {
            b = b.max_rows(Some(v));
        }
        if let Some(v) = env_parse::<bool>("EVLOOP_PARALLEL") {
            b = b.parallel(v);
        }
        if let Some(v) = env_parse::<usize>("EVLOOP_MAX_PARALLEL_TASKS") {
            b = b.max_parallel_tasks(v);
        }

        b.build()
    }

    fn validate(&self) -> Result<()> {
        if !(self.luminosity.is_finite() && self.luminosity > 0.0) {
            return Err(Error::Construction(format!(
                "luminosity must be finite and positive, got {}",
                self.luminosity
            )));
        }
        if !(self.unit_conversion.is_finite() && self.unit_conversion > 0.0) {
            return Err(Error::Construction(format!(
                "unit conversion must be finite and positive, got {}",
                self.unit_conversion
            )));
        }
        if self.max_rows == Some(0) {
            return Err(Error::Construction("max_rows must be at least 1".into()));
        }
        if self.max_parallel_tasks == 0 {
            return Err(Error::Construction(
                "max_parallel_tasks must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

/// Chainable setters; `build` validates once.
#[derive(Debug, Clone)]
pub struct LoopConfigBuilder {
    cfg: LoopConfig,
}

impl LoopConfigBuilder {
    pub fn luminosity(mut self, v: f64) -> Self {
        self.cfg.luminosity = v;
        self
    }

    pub fn unit_conversion(mut self, v: f64) -> Self {
        self.cfg.unit_conversion = v;
        self
    }

    pub fn normalize_to_luminosity(mut self, v: bool) -> Self {
        self.cfg.normalize_to_luminosity = v;
        self
    }

    pub fn max_rows(mut self, v: Option<u64>) -> Self {
        self.cfg.max_rows = v;
        self
    }

    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }

    pub fn max_parallel_tasks(mut self, v: usize) -> Self {
        self.cfg.max_parallel_tasks = v;
        self
    }

    pub fn build(self) -> Result<LoopConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}
