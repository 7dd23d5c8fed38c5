//! Function shapes: the parameter types and output kind of an expression body.

use std::fmt;

use serde::{Deserialize, Serialize};

use evloop_core::schema::ColumnType;

/// Type a body parameter expects from its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParamType {
    Bool,
    F32,
    F64,
    VecF32,
    VecF64,
    /// Any scalar column read as `f64` (bool as 0/1). Used by string formulas.
    Numeric,
}

impl ParamType {
    pub fn accepts(self, column: ColumnType) -> bool {
        match self {
            ParamType::Bool => column == ColumnType::Bool,
            ParamType::F32 => column == ColumnType::F32,
            ParamType::F64 => column == ColumnType::F64,
            ParamType::VecF32 => column == ColumnType::VecF32,
            ParamType::VecF64 => column == ColumnType::VecF64,
            ParamType::Numeric => !column.is_vector(),
        }
    }

    pub fn is_vector(self) -> bool {
        matches!(self, ParamType::VecF32 | ParamType::VecF64)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::Bool => "bool",
            ParamType::F32 => "f32",
            ParamType::F64 => "f64",
            ParamType::VecF32 => "vec<f32>",
            ParamType::VecF64 => "vec<f64>",
            ParamType::Numeric => "num",
        };
        f.write_str(s)
    }
}

/// What an evaluator produces per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputKind {
    /// One number (`f32` outputs are widened).
    Scalar,
    /// Zero or more numbers.
    Vector,
    /// Pass/fail.
    Predicate,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputKind::Scalar => "scalar",
            OutputKind::Vector => "vector",
            OutputKind::Predicate => "bool",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Shape {
    pub params: Vec<ParamType>,
    pub output: OutputKind,
}

impl Shape {
    pub fn new(params: Vec<ParamType>, output: OutputKind) -> Self {
        Self { params, output }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ") -> {}", self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_accepts_any_scalar_column() {
        assert!(ParamType::Numeric.accepts(ColumnType::Bool));
        assert!(ParamType::Numeric.accepts(ColumnType::F32));
        assert!(!ParamType::Numeric.accepts(ColumnType::VecF64));
        assert!(!ParamType::F64.accepts(ColumnType::F32));
    }

    #[test]
    fn display_reads_like_a_signature() {
        let shape = Shape::new(vec![ParamType::F32, ParamType::VecF64], OutputKind::Vector);
        assert_eq!(shape.to_string(), "(f32, vec<f64>) -> vector");
        assert_eq!(Shape::new(vec![], OutputKind::Predicate).to_string(), "() -> bool");
    }
}
