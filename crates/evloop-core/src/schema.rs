//! Column types and schemas. Pure data; no reader logic here.
//!
//! A column's type is fixed for the lifetime of its dataset. Row sources
//! report a `Schema` before iteration so expressions can be bound against it.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Bool,
    F32,
    F64,
    /// Homogeneous variable-length vector of `f32` per row.
    VecF32,
    /// Homogeneous variable-length vector of `f64` per row.
    VecF64,
}

impl ColumnType {
    pub fn is_vector(self) -> bool {
        matches!(self, ColumnType::VecF32 | ColumnType::VecF64)
    }

    /// Parse the short names used by declarative schemas.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "bool" | "Bool" | "Boolean" => Some(ColumnType::Bool),
            "f32" | "F32" | "Float32" | "float" => Some(ColumnType::F32),
            "f64" | "F64" | "Float64" | "double" => Some(ColumnType::F64),
            "vec<f32>" | "[f32]" | "VecF32" => Some(ColumnType::VecF32),
            "vec<f64>" | "[f64]" | "VecF64" => Some(ColumnType::VecF64),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Bool => "bool",
            ColumnType::F32 => "f32",
            ColumnType::F64 => "f64",
            ColumnType::VecF32 => "vec<f32>",
            ColumnType::VecF64 => "vec<f64>",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub column_type: ColumnType,
}

impl Field {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_short_names() {
        assert_eq!(ColumnType::parse("f32"), Some(ColumnType::F32));
        assert_eq!(ColumnType::parse(" Float64 "), Some(ColumnType::F64));
        assert_eq!(ColumnType::parse("vec<f64>"), Some(ColumnType::VecF64));
        assert_eq!(ColumnType::parse("utf8"), None);
    }

    #[test]
    fn lookup_by_name() {
        let schema = Schema::new(vec![
            Field::new("pt", ColumnType::F32),
            Field::new("jets_e", ColumnType::VecF64),
        ]);
        assert_eq!(schema.index_of("jets_e"), Some(1));
        assert!(schema.field("eta").is_none());
        assert!(schema.field("jets_e").unwrap().column_type.is_vector());
    }
}
