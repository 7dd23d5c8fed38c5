//! Live row buffer shared between a row source and its bound readers.
//!
//! Each column gets one typed `Slot`. Sources write the current row into the
//! slots on `advance()`; bound evaluators hold clones of the slot handles and
//! read them without going back through the source.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use evloop_core::schema::{ColumnType, Schema};
use evloop_core::types::{ColumnData, Value};

use crate::error::{Result, SourceError};

/// Typed handle onto one column of the current row.
#[derive(Debug, Clone)]
pub enum Slot {
    Bool(Rc<Cell<bool>>),
    F32(Rc<Cell<f32>>),
    F64(Rc<Cell<f64>>),
    VecF32(Rc<RefCell<Vec<f32>>>),
    VecF64(Rc<RefCell<Vec<f64>>>),
}

impl Slot {
    pub fn new(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Bool => Slot::Bool(Rc::new(Cell::new(false))),
            ColumnType::F32 => Slot::F32(Rc::new(Cell::new(0.0))),
            ColumnType::F64 => Slot::F64(Rc::new(Cell::new(0.0))),
            ColumnType::VecF32 => Slot::VecF32(Rc::new(RefCell::new(Vec::new()))),
            ColumnType::VecF64 => Slot::VecF64(Rc::new(RefCell::new(Vec::new()))),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Slot::Bool(_) => ColumnType::Bool,
            Slot::F32(_) => ColumnType::F32,
            Slot::F64(_) => ColumnType::F64,
            Slot::VecF32(_) => ColumnType::VecF32,
            Slot::VecF64(_) => ColumnType::VecF64,
        }
    }

    /// Snapshot of the current value (allocates for vectors; not for hot paths).
    pub fn value(&self) -> Value {
        match self {
            Slot::Bool(c) => Value::Bool(c.get()),
            Slot::F32(c) => Value::F32(c.get()),
            Slot::F64(c) => Value::F64(c.get()),
            Slot::VecF32(c) => Value::VecF32(c.borrow().clone()),
            Slot::VecF64(c) => Value::VecF64(c.borrow().clone()),
        }
    }

    /// Overwrite the slot; the value must have the slot's type.
    pub fn store(&self, value: Value) -> std::result::Result<(), Value> {
        match (self, value) {
            (Slot::Bool(c), Value::Bool(v)) => c.set(v),
            (Slot::F32(c), Value::F32(v)) => c.set(v),
            (Slot::F64(c), Value::F64(v)) => c.set(v),
            (Slot::VecF32(c), Value::VecF32(v)) => *c.borrow_mut() = v,
            (Slot::VecF64(c), Value::VecF64(v)) => *c.borrow_mut() = v,
            (_, other) => return Err(other),
        }
        Ok(())
    }

    /// Copy row `row` of `data` into the slot, reusing vector allocations.
    /// Returns false if the types differ or the row is out of range.
    pub fn load(&self, data: &ColumnData, row: usize) -> bool {
        match (self, data) {
            (Slot::Bool(c), ColumnData::Bool(v)) => v.get(row).map(|x| c.set(*x)).is_some(),
            (Slot::F32(c), ColumnData::F32(v)) => v.get(row).map(|x| c.set(*x)).is_some(),
            (Slot::F64(c), ColumnData::F64(v)) => v.get(row).map(|x| c.set(*x)).is_some(),
            (Slot::VecF32(c), ColumnData::VecF32(v)) => v
                .get(row)
                .map(|x| c.borrow_mut().clone_from(x))
                .is_some(),
            (Slot::VecF64(c), ColumnData::VecF64(v)) => v
                .get(row)
                .map(|x| c.borrow_mut().clone_from(x))
                .is_some(),
            _ => false,
        }
    }
}

/// One slot per schema field, in schema order.
#[derive(Debug)]
pub struct RowBuffer {
    source_name: String,
    schema: Schema,
    slots: Vec<Slot>,
}

impl RowBuffer {
    pub fn new(source_name: impl Into<String>, schema: Schema) -> Self {
        let slots = schema
            .fields
            .iter()
            .map(|f| Slot::new(f.column_type))
            .collect();
        Self {
            source_name: source_name.into(),
            schema,
            slots,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Clone the live handle for `column`.
    pub fn slot(&self, column: &str) -> Result<Slot> {
        self.schema
            .index_of(column)
            .map(|i| self.slots[i].clone())
            .ok_or_else(|| SourceError::ColumnNotFound {
                source_name: self.source_name.clone(),
                column: column.to_string(),
            })
    }

    /// Store `value` into column `idx`, checking the type.
    pub fn store(&self, idx: usize, value: Value) -> Result<()> {
        let slot = self.slots.get(idx).ok_or_else(|| {
            SourceError::Invalid(format!(
                "column index {idx} out of range for '{}'",
                self.source_name
            ))
        })?;
        slot.store(value).map_err(|v| SourceError::TypeMismatch {
            source_name: self.source_name.clone(),
            column: self.schema.fields[idx].name.clone(),
            expected: slot.column_type(),
            found: v.column_type(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evloop_core::schema::Field;

    fn buffer() -> RowBuffer {
        RowBuffer::new(
            "t",
            Schema::new(vec![
                Field::new("x", ColumnType::F64),
                Field::new("jets", ColumnType::VecF32),
            ]),
        )
    }

    #[test]
    fn handles_observe_stores() {
        let buf = buffer();
        let x = buf.slot("x").unwrap();
        buf.store(0, Value::F64(4.5)).unwrap();
        assert_eq!(x.value(), Value::F64(4.5));
        buf.store(1, Value::VecF32(vec![1.0, 2.0])).unwrap();
        assert_eq!(buf.slot("jets").unwrap().value(), Value::VecF32(vec![1.0, 2.0]));
    }

    #[test]
    fn store_rejects_wrong_type() {
        let buf = buffer();
        let err = buf.store(0, Value::F32(1.0)).unwrap_err();
        assert!(matches!(
            err,
            SourceError::TypeMismatch {
                expected: ColumnType::F64,
                found: ColumnType::F32,
                ..
            }
        ));
    }

    #[test]
    fn missing_column_is_reported() {
        let err = buffer().slot("eta").unwrap_err();
        assert!(matches!(err, SourceError::ColumnNotFound { .. }));
    }

    #[test]
    fn load_copies_typed_rows() {
        let slot = Slot::new(ColumnType::VecF64);
        let data = ColumnData::VecF64(vec![vec![1.0], vec![2.0, 3.0]]);
        assert!(slot.load(&data, 1));
        assert_eq!(slot.value(), Value::VecF64(vec![2.0, 3.0]));
        assert!(!slot.load(&data, 2));
        assert!(!slot.load(&ColumnData::F64(vec![1.0]), 0));
    }
}
