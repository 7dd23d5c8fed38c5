//! Variables (what to histogram) and selections (when to fill).

use evloop_core::hist::Binning;
use evloop_expr::{Expression, OutputKind};

use crate::error::{ModelError, Result};
use crate::sample::expect_kind;

/// Name of the selection used when an analysis declares none.
pub const NO_CUT: &str = "no cut";

/// A scalar- or vector-valued expression with a fixed binning.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub expr: Expression,
    pub binning: Binning,
}

impl Variable {
    pub fn new(name: impl Into<String>, expr: Expression, binning: Binning) -> Result<Self> {
        let name = name.into();
        match expr.output_kind() {
            OutputKind::Scalar | OutputKind::Vector => Ok(Self {
                name,
                expr,
                binning,
            }),
            OutputKind::Predicate => Err(ModelError::Construction(format!(
                "variable '{name}': expression '{}' is a predicate, expected a scalar or vector",
                expr.name()
            ))),
        }
    }

    /// Variable from a string formula, e.g. `"pt / 1000"`.
    pub fn formula(
        name: impl Into<String>,
        src: &str,
        bins: usize,
        low: f64,
        high: f64,
    ) -> Result<Self> {
        let name = name.into();
        let binning = Binning::new(bins, low, high)?;
        let expr = Expression::formula(name.clone(), src)?;
        Self::new(name, expr, binning)
    }

    pub fn is_vector(&self) -> bool {
        self.expr.output_kind() == OutputKind::Vector
    }
}

/// A named predicate. Selections are independent: one row may fill several.
#[derive(Debug, Clone)]
pub struct Selection {
    pub name: String,
    pub predicate: Expression,
}

impl Selection {
    pub fn new(name: impl Into<String>, predicate: Expression) -> Result<Self> {
        let name = name.into();
        expect_kind(
            &predicate,
            OutputKind::Predicate,
            &format!("selection '{name}'"),
        )?;
        Ok(Self { name, predicate })
    }

    pub fn formula(name: impl Into<String>, src: &str) -> Result<Self> {
        let name = name.into();
        let predicate = Expression::formula(name.clone(), src)?;
        Self::new(name, predicate)
    }

    /// The always-true selection.
    pub fn no_cut() -> Self {
        Self {
            name: NO_CUT.to_string(),
            predicate: Expression::always(NO_CUT, true),
        }
    }
}
