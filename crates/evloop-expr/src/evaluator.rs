//! Bound, zero-argument per-row callables.

use std::fmt;

use crate::shape::OutputKind;

/// An expression bound to one row source. Each call reads the source's
/// current row; evaluators are not `Send` because the row buffer is not.
pub enum Evaluator {
    Scalar(Box<dyn Fn() -> f64>),
    Vector(Box<dyn Fn() -> Vec<f64>>),
    Predicate(Box<dyn Fn() -> bool>),
}

impl Evaluator {
    pub fn kind(&self) -> OutputKind {
        match self {
            Evaluator::Scalar(_) => OutputKind::Scalar,
            Evaluator::Vector(_) => OutputKind::Vector,
            Evaluator::Predicate(_) => OutputKind::Predicate,
        }
    }

    pub fn into_scalar(self) -> Option<Box<dyn Fn() -> f64>> {
        match self {
            Evaluator::Scalar(f) => Some(f),
            _ => None,
        }
    }

    pub fn into_predicate(self) -> Option<Box<dyn Fn() -> bool>> {
        match self {
            Evaluator::Predicate(f) => Some(f),
            _ => None,
        }
    }

    /// Evaluate and hand every produced value to `sink`: one for scalars,
    /// one per element for vectors, 0/1 for predicates.
    pub fn for_each_value<E>(
        &self,
        mut sink: impl FnMut(f64) -> Result<(), E>,
    ) -> Result<(), E> {
        match self {
            Evaluator::Scalar(f) => sink(f()),
            Evaluator::Predicate(f) => sink(if f() { 1.0 } else { 0.0 }),
            Evaluator::Vector(f) => {
                for v in f() {
                    sink(v)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Evaluator::{:?}", self.kind())
    }
}
