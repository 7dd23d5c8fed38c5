//! The binding registry: the closed table of function shapes that may be
//! attached to a row source.
//!
//! The standard table is built once per process and only read afterwards,
//! so concurrent binds from several sample tasks need no locking.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use evloop_io::{RowSource, Slot, SourceError};

use crate::error::BindingError;
use crate::evaluator::Evaluator;
use crate::expr::Expression;
use crate::shape::{OutputKind, ParamType, Shape};

/// Largest arity admitted for closure shapes over scalar columns.
pub const MAX_SCALAR_ARITY: usize = 4;

/// Largest number of inputs admitted for string formulas.
pub const MAX_FORMULA_INPUTS: usize = 16;

const SCALAR_PARAMS: [ParamType; 3] = [ParamType::Bool, ParamType::F32, ParamType::F64];
const OUTPUTS: [OutputKind; 3] = [OutputKind::Scalar, OutputKind::Vector, OutputKind::Predicate];

#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    shapes: BTreeSet<Shape>,
}

impl BindingRegistry {
    /// A registry that admits nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shared, process-wide standard registry.
    pub fn standard() -> &'static BindingRegistry {
        static STANDARD: OnceLock<BindingRegistry> = OnceLock::new();
        STANDARD.get_or_init(Self::build_standard)
    }

    fn build_standard() -> Self {
        let mut reg = Self::empty();

        // Every combination of scalar parameter types up to the max arity.
        let mut layer: Vec<Vec<ParamType>> = vec![Vec::new()];
        for _ in 0..=MAX_SCALAR_ARITY {
            for params in &layer {
                for output in OUTPUTS {
                    reg.admit(Shape::new(params.clone(), output));
                }
            }
            layer = layer
                .iter()
                .flat_map(|params| {
                    SCALAR_PARAMS.iter().map(move |p| {
                        let mut next = params.clone();
                        next.push(*p);
                        next
                    })
                })
                .collect();
        }

        for vector in [ParamType::VecF32, ParamType::VecF64] {
            for output in OUTPUTS {
                reg.admit(Shape::new(vec![vector], output));
            }
        }

        for n in 1..=MAX_FORMULA_INPUTS {
            for output in [OutputKind::Scalar, OutputKind::Predicate] {
                reg.admit(Shape::new(vec![ParamType::Numeric; n], output));
            }
        }

        reg
    }

    /// Owned copy of the standard table, for extension with `admit`.
    pub fn with_standard() -> Self {
        Self::standard().clone()
    }

    /// Register one more shape. Returns false if it was already admitted.
    pub fn admit(&mut self, shape: Shape) -> bool {
        self.shapes.insert(shape)
    }

    pub fn supports(&self, shape: &Shape) -> bool {
        self.shapes.contains(shape)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    /// Bind `expr` against the live buffer of `source`.
    ///
    /// Checks, in order: the shape is registered, the input count matches the
    /// arity, every input column exists, every column's type fits its
    /// parameter. Nothing is read from the source.
    pub fn bind(&self, expr: &Expression, source: &dyn RowSource) -> Result<Evaluator, BindingError> {
        let shape = expr.shape();
        if !self.supports(shape) {
            return Err(BindingError::UnsupportedShape {
                expression: expr.name().to_string(),
                shape: shape.clone(),
            });
        }
        if expr.inputs().len() != shape.arity() {
            return Err(BindingError::ArityMismatch {
                expression: expr.name().to_string(),
                expected: shape.arity(),
                got: expr.inputs().len(),
            });
        }

        let mut slots: Vec<Slot> = Vec::with_capacity(shape.arity());
        for (column, param) in expr.inputs().iter().zip(&shape.params) {
            let slot = source.slot(column).map_err(|e| match e {
                SourceError::ColumnNotFound { source_name, .. } => BindingError::ColumnNotFound {
                    expression: expr.name().to_string(),
                    column: column.clone(),
                    source_name,
                },
                SourceError::TypeMismatch { found, .. } => BindingError::TypeMismatch {
                    expression: expr.name().to_string(),
                    column: column.clone(),
                    expected: *param,
                    found,
                },
                other => BindingError::Source {
                    expression: expr.name().to_string(),
                    column: column.clone(),
                    source_name: source.name().to_string(),
                    message: other.to_string(),
                },
            })?;
            if !param.accepts(slot.column_type()) {
                return Err(BindingError::TypeMismatch {
                    expression: expr.name().to_string(),
                    column: column.clone(),
                    expected: *param,
                    found: slot.column_type(),
                });
            }
            slots.push(slot);
        }

        expr.kernel().attach(&slots).map_err(|idx| BindingError::TypeMismatch {
            expression: expr.name().to_string(),
            column: expr.inputs()[idx].clone(),
            expected: shape.params[idx],
            found: slots[idx].column_type(),
        })
    }
}
