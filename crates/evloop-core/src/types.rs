//! Lightweight values and an owned columnar table.
//!
//! `Table` is what the in-memory row source streams from and what the
//! readers materialize in tests. Evaluation never touches `Value` per row:
//! bound expressions read typed cells directly.

use serde::{Deserialize, Serialize};

use crate::schema::{ColumnType, Field, Schema};

/// One cell value of any supported column type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    F32(f32),
    F64(f64),
    VecF32(Vec<f32>),
    VecF64(Vec<f64>),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Bool(_) => ColumnType::Bool,
            Value::F32(_) => ColumnType::F32,
            Value::F64(_) => ColumnType::F64,
            Value::VecF32(_) => ColumnType::VecF32,
            Value::VecF64(_) => ColumnType::VecF64,
        }
    }

    /// The zero value a live row buffer starts from before the first advance.
    pub fn zero(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Bool => Value::Bool(false),
            ColumnType::F32 => Value::F32(0.0),
            ColumnType::F64 => Value::F64(0.0),
            ColumnType::VecF32 => Value::VecF32(Vec::new()),
            ColumnType::VecF64 => Value::VecF64(Vec::new()),
        }
    }
}

/// Typed storage for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Bool(Vec<bool>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    VecF32(Vec<Vec<f32>>),
    VecF64(Vec<Vec<f64>>),
}

impl ColumnData {
    pub fn empty(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Bool => ColumnData::Bool(Vec::new()),
            ColumnType::F32 => ColumnData::F32(Vec::new()),
            ColumnType::F64 => ColumnData::F64(Vec::new()),
            ColumnType::VecF32 => ColumnData::VecF32(Vec::new()),
            ColumnType::VecF64 => ColumnData::VecF64(Vec::new()),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Bool(_) => ColumnType::Bool,
            ColumnData::F32(_) => ColumnType::F32,
            ColumnData::F64(_) => ColumnType::F64,
            ColumnData::VecF32(_) => ColumnType::VecF32,
            ColumnData::VecF64(_) => ColumnType::VecF64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool(v) => v.len(),
            ColumnData::F32(v) => v.len(),
            ColumnData::F64(v) => v.len(),
            ColumnData::VecF32(v) => v.len(),
            ColumnData::VecF64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, row: usize) -> Option<Value> {
        Some(match self {
            ColumnData::Bool(v) => Value::Bool(*v.get(row)?),
            ColumnData::F32(v) => Value::F32(*v.get(row)?),
            ColumnData::F64(v) => Value::F64(*v.get(row)?),
            ColumnData::VecF32(v) => Value::VecF32(v.get(row)?.clone()),
            ColumnData::VecF64(v) => Value::VecF64(v.get(row)?.clone()),
        })
    }

    /// Append one value; returns the value back if its type does not match.
    pub fn push(&mut self, value: Value) -> Result<(), Value> {
        match (self, value) {
            (ColumnData::Bool(v), Value::Bool(x)) => v.push(x),
            (ColumnData::F32(v), Value::F32(x)) => v.push(x),
            (ColumnData::F64(v), Value::F64(x)) => v.push(x),
            (ColumnData::VecF32(v), Value::VecF32(x)) => v.push(x),
            (ColumnData::VecF64(v), Value::VecF64(x)) => v.push(x),
            (_, other) => return Err(other),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn f64(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnData::F64(values))
    }

    pub fn f32(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self::new(name, ColumnData::F32(values))
    }

    pub fn bool(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self::new(name, ColumnData::Bool(values))
    }

    pub fn vec_f32(name: impl Into<String>, values: Vec<Vec<f32>>) -> Self {
        Self::new(name, ColumnData::VecF32(values))
    }

    pub fn vec_f64(name: impl Into<String>, values: Vec<Vec<f64>>) -> Self {
        Self::new(name, ColumnData::VecF64(values))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Owned columnar table. All columns must have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<Column>,
}

impl Table {
    /// Build a table, rejecting ragged columns and duplicate names.
    pub fn new(columns: Vec<Column>) -> Result<Self, String> {
        if let Some(first) = columns.first() {
            let n = first.len();
            for col in &columns {
                if col.len() != n {
                    return Err(format!(
                        "column '{}' has {} rows, expected {}",
                        col.name,
                        col.len(),
                        n
                    ));
                }
            }
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(format!("duplicate column '{}'", col.name));
            }
        }
        Ok(Self { columns })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Field::new(c.name.clone(), c.data.column_type()))
                .collect(),
        )
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_table_is_rejected() {
        let err = Table::new(vec![
            Column::f64("x", vec![1.0, 2.0]),
            Column::f64("y", vec![1.0]),
        ])
        .unwrap_err();
        assert!(err.contains("'y'"));
    }

    #[test]
    fn duplicate_column_is_rejected() {
        let err = Table::new(vec![
            Column::f64("x", vec![1.0]),
            Column::f32("x", vec![1.0]),
        ])
        .unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn push_checks_type() {
        let mut data = ColumnData::empty(ColumnType::F32);
        assert!(data.push(Value::F32(1.5)).is_ok());
        assert_eq!(data.push(Value::F64(2.0)), Err(Value::F64(2.0)));
        assert_eq!(data.get(0), Some(Value::F32(1.5)));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn schema_follows_columns() {
        let table = Table::new(vec![
            Column::bool("pass", vec![true]),
            Column::vec_f64("jets", vec![vec![1.0, 2.0]]),
        ])
        .unwrap();
        let schema = table.schema();
        assert_eq!(schema.fields[0].column_type, ColumnType::Bool);
        assert_eq!(schema.fields[1].column_type, ColumnType::VecF64);
        assert_eq!(table.num_rows(), 1);
    }
}
