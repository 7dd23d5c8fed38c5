//! Named expressions over input columns.

use std::fmt;
use std::sync::Arc;

use crate::error::ExprError;
use crate::formula::Formula;
use crate::kernel::{IntoKernel, Kernel};
use crate::shape::{OutputKind, Shape};

/// A named function of zero or more columns, independent of any row source
/// until bound. Cheap to clone; safe to share across threads.
#[derive(Clone)]
pub struct Expression {
    name: String,
    inputs: Vec<String>,
    kernel: Arc<Kernel>,
    /// Formula text, when built from a string.
    formula: Option<String>,
}

impl Expression {
    /// Declare an expression from a closure.
    ///
    /// ```ignore
    /// let pt = Expression::new("pt_gev", ["pt_mev"], |pt: f32| pt / 1000.0)?;
    /// ```
    ///
    /// Fails with `ExprError::Construction` if the number of input names
    /// differs from the closure's arity.
    pub fn new<M, I, S>(name: impl Into<String>, inputs: I, body: impl IntoKernel<M>) -> Result<Self, ExprError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let inputs: Vec<String> = inputs.into_iter().map(Into::into).collect();
        let kernel = body.into_kernel();
        if inputs.len() != kernel.shape().arity() {
            return Err(ExprError::Construction(format!(
                "expression '{name}' lists {} input(s) but its function {} takes {}",
                inputs.len(),
                kernel.shape(),
                kernel.shape().arity()
            )));
        }
        Ok(Self {
            name,
            inputs,
            kernel: Arc::new(kernel),
            formula: None,
        })
    }

    /// Compile a string formula; its inputs are the identifiers it references.
    pub fn formula(name: impl Into<String>, src: &str) -> Result<Self, ExprError> {
        let formula = Formula::parse(src)?;
        let text = formula.source().to_string();
        let inputs = formula.inputs().to_vec();
        let mut expr = Self::new(name, inputs, formula)?;
        expr.formula = Some(text);
        Ok(expr)
    }

    /// Constant scalar, e.g. a unit weight.
    pub fn constant(name: impl Into<String>, value: f64) -> Self {
        Self::from_kernel(name, (move || value).into_kernel())
    }

    /// Constant predicate, e.g. "no cut".
    pub fn always(name: impl Into<String>, pass: bool) -> Self {
        Self::from_kernel(name, (move || pass).into_kernel())
    }

    fn from_kernel(name: impl Into<String>, kernel: Kernel) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            kernel: Arc::new(kernel),
            formula: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn shape(&self) -> &Shape {
        self.kernel.shape()
    }

    pub fn output_kind(&self) -> OutputKind {
        self.kernel.shape().output
    }

    pub fn formula_text(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    pub(crate) fn kernel(&self) -> &Kernel {
        &self.kernel
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expression")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("shape", self.shape())
            .finish()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.formula {
            Some(text) => write!(f, "{} = {text}", self.name),
            None => write!(
                f,
                "{}({}) : {}",
                self.name,
                self.inputs.join(", "),
                self.shape()
            ),
        }
    }
}
