//! The validated analysis: samples × selections × variables.

use std::collections::HashSet;
use std::fmt::Write as _;

use evloop_core::id::{SampleId, SelectionId, VariableId};

use crate::error::{ModelError, Result};
use crate::sample::Sample;
use crate::variable::{Selection, Variable};

#[derive(Debug, Clone)]
pub struct Analysis {
    samples: Vec<Sample>,
    selections: Vec<Selection>,
    variables: Vec<Variable>,
}

impl Analysis {
    /// Validate and assemble an analysis.
    ///
    /// An empty selection list becomes the single always-true "no cut"
    /// selection. Names must be unique within each list.
    pub fn new(
        samples: Vec<Sample>,
        selections: Vec<Selection>,
        variables: Vec<Variable>,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(ModelError::Construction(
                "an analysis needs at least one sample".into(),
            ));
        }
        for sample in &samples {
            sample.validate()?;
        }
        unique("sample", samples.iter().map(|s| s.name.as_str()))?;

        let selections = if selections.is_empty() {
            vec![Selection::no_cut()]
        } else {
            selections
        };
        unique("selection", selections.iter().map(|s| s.name.as_str()))?;
        unique("variable", variables.iter().map(|v| v.name.as_str()))?;

        Ok(Self {
            samples,
            selections,
            variables,
        })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn sample(&self, id: SampleId) -> Option<&Sample> {
        self.samples.get(id.index())
    }

    pub fn sample_id(&self, name: &str) -> Option<SampleId> {
        self.samples
            .iter()
            .position(|s| s.name == name)
            .map(SampleId::new)
    }

    pub fn selection_id(&self, name: &str) -> Option<SelectionId> {
        self.selections
            .iter()
            .position(|s| s.name == name)
            .map(SelectionId::new)
    }

    pub fn variable_id(&self, name: &str) -> Option<VariableId> {
        self.variables
            .iter()
            .position(|v| v.name == name)
            .map(VariableId::new)
    }

    /// Number of accumulators a result grid for this analysis holds.
    pub fn grid_size(&self) -> usize {
        self.samples.len() * self.selections.len() * self.variables.len()
    }

    /// Human-readable summary. Also the input of the analysis hash, so it
    /// lists everything that affects results.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "analysis: {} sample(s), {} selection(s), {} variable(s), {} histogram(s)",
            self.samples.len(),
            self.selections.len(),
            self.variables.len(),
            self.grid_size()
        );
        out.push_str("samples:\n");
        for s in &self.samples {
            let _ = writeln!(out, "  {} [{}] label={:?}", s.name, s.kind, s.label);
            let _ = writeln!(out, "    weight: {}", s.weight);
            let _ = writeln!(out, "    cut:    {}", s.cut);
            for (i, c) in s.components.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "    component {i}: {} xsec={} ngen={}",
                    c.source, c.xsec, c.ngen
                );
                let _ = writeln!(out, "      weight: {}", c.weight);
                let _ = writeln!(out, "      cut:    {}", c.cut);
            }
        }
        out.push_str("selections:\n");
        for sel in &self.selections {
            let _ = writeln!(out, "  {}: {}", sel.name, sel.predicate);
        }
        out.push_str("variables:\n");
        for v in &self.variables {
            let _ = writeln!(out, "  {} {}: {}", v.name, v.binning, v.expr);
        }
        out
    }
}

fn unique<'a>(what: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ModelError::Construction(format!(
                "duplicate {what} name '{name}'"
            )));
        }
    }
    Ok(())
}
