//! Samples and their components.

use std::fmt;

use serde::{Deserialize, Serialize};

use evloop_expr::{Expression, OutputKind};
use evloop_io::SourceSpec;

use crate::error::{ModelError, Result};

/// How a sample is treated for normalization and stacking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    /// Recorded data: never normalized to luminosity.
    Data,
    #[serde(alias = "bkg")]
    Background,
    #[serde(alias = "sig")]
    Signal,
}

impl SampleKind {
    pub fn is_simulated(self) -> bool {
        !matches!(self, SampleKind::Data)
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SampleKind::Data => "data",
            SampleKind::Background => "background",
            SampleKind::Signal => "signal",
        })
    }
}

/// One physical (possibly joined) source contributing rows to a sample.
#[derive(Debug, Clone)]
pub struct Component {
    pub source: SourceSpec,
    pub weight: Expression,
    pub cut: Expression,
    /// Cross-section, in the units `LoopConfig::unit_conversion` expects.
    pub xsec: f64,
    /// Number of generated events the cross-section is spread over.
    pub ngen: f64,
}

impl Component {
    pub fn new(source: SourceSpec) -> Self {
        Self {
            source,
            weight: Expression::constant("component weight", 1.0),
            cut: Expression::always("component cut", true),
            xsec: 1.0,
            ngen: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: Expression) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_cut(mut self, cut: Expression) -> Self {
        self.cut = cut;
        self
    }

    pub fn with_xsec(mut self, xsec: f64) -> Self {
        self.xsec = xsec;
        self
    }

    pub fn with_ngen(mut self, ngen: f64) -> Self {
        self.ngen = ngen;
        self
    }

    fn validate(&self, sample: &str, index: usize) -> Result<()> {
        let at = || format!("sample '{sample}' component {index}");
        if !(self.xsec.is_finite() && self.xsec >= 0.0) {
            return Err(ModelError::Construction(format!(
                "{}: cross-section must be finite and non-negative, got {}",
                at(),
                self.xsec
            )));
        }
        if !(self.ngen.is_finite() && self.ngen > 0.0) {
            return Err(ModelError::Construction(format!(
                "{}: generated event count must be finite and positive, got {}",
                at(),
                self.ngen
            )));
        }
        expect_kind(&self.weight, OutputKind::Scalar, &format!("{} weight", at()))?;
        expect_kind(&self.cut, OutputKind::Predicate, &format!("{} cut", at()))?;
        Ok(())
    }
}

/// A named logical dataset made of one or more components.
#[derive(Debug, Clone)]
pub struct Sample {
    pub name: String,
    pub kind: SampleKind,
    /// Display label for downstream plotting; defaults to `name`.
    pub label: String,
    pub weight: Expression,
    pub cut: Expression,
    pub components: Vec<Component>,
}

impl Sample {
    pub fn new(name: impl Into<String>, kind: SampleKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            weight: Expression::constant("sample weight", 1.0),
            cut: Expression::always("sample cut", true),
            components: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_weight(mut self, weight: Expression) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_cut(mut self, cut: Expression) -> Self {
        self.cut = cut;
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::Construction("sample name must not be empty".into()));
        }
        if self.components.is_empty() {
            return Err(ModelError::Construction(format!(
                "sample '{}' has no components",
                self.name
            )));
        }
        expect_kind(
            &self.weight,
            OutputKind::Scalar,
            &format!("sample '{}' weight", self.name),
        )?;
        expect_kind(
            &self.cut,
            OutputKind::Predicate,
            &format!("sample '{}' cut", self.name),
        )?;
        for (i, c) in self.components.iter().enumerate() {
            c.validate(&self.name, i)?;
        }
        Ok(())
    }
}

pub(crate) fn expect_kind(expr: &Expression, kind: OutputKind, role: &str) -> Result<()> {
    if expr.output_kind() == kind {
        Ok(())
    } else {
        Err(ModelError::Construction(format!(
            "{role}: expression '{}' produces {}, expected {kind}",
            expr.name(),
            expr.output_kind()
        )))
    }
}
