//! Per-sample event loop.
//!
//! Setup opens every component's row source and binds every expression the
//! sample needs against it. Only when all of that succeeded are rows read:
//! components in declaration order, rows in source order.

use std::time::Instant;

use evloop_core::config::LoopConfig;
use evloop_core::hist::FillError;
use evloop_core::id::SampleId;
use evloop_core::manifest::SampleRun;
use evloop_expr::{BindingRegistry, Evaluator, Expression};
use evloop_io::{Capped, RowSource};
use evloop_model::{Analysis, Component, Sample, SampleKind};

use crate::grid::SamplePartition;
use crate::metrics::emit_span;
use crate::runtime::ExecError;

/// Name used in `ExecError::Fill` when the row weight itself is non-finite.
const WEIGHT: &str = "<weight>";

/// Constant per-component scale: 1 for data or when normalization is off,
/// otherwise `lumi * unit_conversion * xsec / ngen`.
pub fn normalization_factor(kind: SampleKind, component: &Component, config: &LoopConfig) -> f64 {
    if kind == SampleKind::Data || !config.normalize_to_luminosity() {
        return 1.0;
    }
    config.luminosity() * config.unit_conversion() * component.xsec / component.ngen
}

type ScalarFn = Box<dyn Fn() -> f64>;
type PredicateFn = Box<dyn Fn() -> bool>;

/// One component after setup: its open source and everything bound to it.
struct BoundComponent {
    source: Box<dyn RowSource>,
    factor: f64,
    sample_weight: ScalarFn,
    sample_cut: PredicateFn,
    weight: ScalarFn,
    cut: PredicateFn,
    selections: Vec<PredicateFn>,
    variables: Vec<Evaluator>,
}

/// Runs one sample of an analysis into its grid partition.
pub struct SampleExecutor<'a> {
    analysis: &'a Analysis,
    sample: &'a Sample,
    config: &'a LoopConfig,
    registry: &'a BindingRegistry,
}

impl<'a> SampleExecutor<'a> {
    pub fn new(
        analysis: &'a Analysis,
        id: SampleId,
        config: &'a LoopConfig,
        registry: &'a BindingRegistry,
    ) -> Result<Self, ExecError> {
        let sample = analysis
            .sample(id)
            .ok_or_else(|| ExecError::Setup(format!("no sample at index {}", id.index())))?;
        Ok(Self {
            analysis,
            sample,
            config,
            registry,
        })
    }

    pub fn sample_name(&self) -> &str {
        &self.sample.name
    }

    /// Bind everything, then stream every component into `partition`.
    ///
    /// The partition is not touched unless setup succeeds for all components.
    pub fn run(&self, partition: &mut SamplePartition) -> Result<SampleRun, ExecError> {
        let started = Instant::now();
        let mut components = self.setup()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sample = %self.sample.name,
            components = components.len(),
            "sample bound"
        );

        for component in &mut components {
            self.stream(component, partition)?;
        }

        let run = SampleRun {
            sample: self.sample.name.clone(),
            rows_processed: partition.rows_processed(),
            rows_accepted: partition.rows_accepted(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            sample = %run.sample,
            rows = run.rows_processed,
            accepted = run.rows_accepted,
            elapsed_ms = run.elapsed_ms,
            "sample finished"
        );
        emit_span(
            "sample_finished",
            &[
                ("sample", run.sample.clone()),
                ("rows", run.rows_processed.to_string()),
            ],
        );

        Ok(run)
    }

    fn setup(&self) -> Result<Vec<BoundComponent>, ExecError> {
        let mut bound = Vec::with_capacity(self.sample.components.len());
        for component in &self.sample.components {
            let mut source = component.source.open().map_err(|source| ExecError::Source {
                sample: self.sample.name.clone(),
                source,
            })?;
            if let Some(cap) = self.config.max_rows() {
                source = Box::new(Capped::new(source, cap));
            }
            let src = source.as_ref();

            let sample_weight = self.scalar(&self.sample.weight, src)?;
            let sample_cut = self.predicate(&self.sample.cut, src)?;
            let weight = self.scalar(&component.weight, src)?;
            let cut = self.predicate(&component.cut, src)?;
            let selections = self
                .analysis
                .selections()
                .iter()
                .map(|s| self.predicate(&s.predicate, src))
                .collect::<Result<Vec<_>, _>>()?;
            let variables = self
                .analysis
                .variables()
                .iter()
                .map(|v| self.bind(&v.expr, src))
                .collect::<Result<Vec<_>, _>>()?;

            bound.push(BoundComponent {
                factor: normalization_factor(self.sample.kind, component, self.config),
                source,
                sample_weight,
                sample_cut,
                weight,
                cut,
                selections,
                variables,
            });
        }
        Ok(bound)
    }

    fn stream(
        &self,
        c: &mut BoundComponent,
        partition: &mut SamplePartition,
    ) -> Result<(), ExecError> {
        let mut passing: Vec<usize> = Vec::with_capacity(c.selections.len());
        while c.source.advance().map_err(|source| ExecError::Source {
            sample: self.sample.name.clone(),
            source,
        })? {
            let accepted = (c.sample_cut)() && (c.cut)();
            partition.count_row(accepted);
            if !accepted {
                continue;
            }

            passing.clear();
            passing.extend(
                c.selections
                    .iter()
                    .enumerate()
                    .filter(|(_, pred)| pred())
                    .map(|(i, _)| i),
            );
            if passing.is_empty() {
                continue;
            }

            let w = (c.sample_weight)() * (c.weight)() * c.factor;
            if !w.is_finite() {
                return Err(self.fill_error(WEIGHT, FillError::NonFiniteWeight { weight: w }));
            }
            for &s in &passing {
                partition.yield_mut(s).record(w);
            }

            for (v, eval) in c.variables.iter().enumerate() {
                eval.for_each_value::<FillError>(|value| {
                    for &s in &passing {
                        partition.hist_mut(s, v).fill(value, w)?;
                    }
                    Ok(())
                })
                .map_err(|e| self.fill_error(&self.analysis.variables()[v].name, e))?;
            }
        }
        Ok(())
    }

    fn bind(&self, expr: &Expression, source: &dyn RowSource) -> Result<Evaluator, ExecError> {
        self.registry
            .bind(expr, source)
            .map_err(|source| ExecError::Binding {
                sample: self.sample.name.clone(),
                source,
            })
    }

    fn scalar(&self, expr: &Expression, source: &dyn RowSource) -> Result<ScalarFn, ExecError> {
        let eval = self.bind(expr, source)?;
        let kind = eval.kind();
        eval.into_scalar().ok_or_else(|| {
            ExecError::Setup(format!(
                "sample '{}': weight '{}' bound as {kind}, expected scalar",
                self.sample.name,
                expr.name()
            ))
        })
    }

    fn predicate(&self, expr: &Expression, source: &dyn RowSource) -> Result<PredicateFn, ExecError> {
        let eval = self.bind(expr, source)?;
        let kind = eval.kind();
        eval.into_predicate().ok_or_else(|| {
            ExecError::Setup(format!(
                "sample '{}': '{}' bound as {kind}, expected bool",
                self.sample.name,
                expr.name()
            ))
        })
    }

    fn fill_error(&self, variable: &str, source: FillError) -> ExecError {
        ExecError::Fill {
            sample: self.sample.name.clone(),
            variable: variable.to_string(),
            source,
        }
    }
}
