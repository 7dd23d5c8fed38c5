//! Row source over a shared in-memory `Table`.

use std::sync::Arc;

use evloop_core::schema::Schema;
use evloop_core::types::Table;

use crate::buffer::{RowBuffer, Slot};
use crate::error::{Result, SourceError};
use crate::source::RowSource;

pub struct MemorySource {
    table: Arc<Table>,
    buffer: RowBuffer,
    next_row: usize,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, table: Arc<Table>) -> Self {
        let buffer = RowBuffer::new(name, table.schema());
        Self {
            table,
            buffer,
            next_row: 0,
        }
    }
}

impl RowSource for MemorySource {
    fn name(&self) -> &str {
        self.buffer.source_name()
    }

    fn schema(&self) -> &Schema {
        self.buffer.schema()
    }

    fn slot(&self, column: &str) -> Result<Slot> {
        self.buffer.slot(column)
    }

    fn advance(&mut self) -> Result<bool> {
        let row = self.next_row;
        if row >= self.table.num_rows() {
            return Ok(false);
        }
        for (slot, col) in self.buffer.slots().iter().zip(&self.table.columns) {
            if !slot.load(&col.data, row) {
                return Err(SourceError::Invalid(format!(
                    "column '{}' of '{}' has no row {row}",
                    col.name,
                    self.buffer.source_name()
                )));
            }
        }
        self.next_row += 1;
        Ok(true)
    }

    fn len_hint(&self) -> Option<u64> {
        Some(self.table.num_rows() as u64)
    }

    fn rows_read(&self) -> u64 {
        self.next_row as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evloop_core::types::{Column, Value};

    #[test]
    fn streams_every_row_in_order() {
        let table = Table::new(vec![
            Column::f32("pt", vec![10.0, 20.0]),
            Column::vec_f64("jets", vec![vec![1.0, 2.0], vec![]]),
        ])
        .unwrap();
        let mut src = MemorySource::new("m", Arc::new(table));
        let pt = src.slot("pt").unwrap();
        let jets = src.slot("jets").unwrap();

        assert!(src.advance().unwrap());
        assert_eq!(pt.value(), Value::F32(10.0));
        assert_eq!(jets.value(), Value::VecF64(vec![1.0, 2.0]));

        assert!(src.advance().unwrap());
        assert_eq!(pt.value(), Value::F32(20.0));
        assert_eq!(jets.value(), Value::VecF64(vec![]));

        assert!(!src.advance().unwrap());
        assert_eq!(src.rows_read(), 2);
    }

    #[test]
    fn empty_table_is_immediately_exhausted() {
        let mut src = MemorySource::new("empty", Arc::new(Table::default()));
        assert!(!src.advance().unwrap());
        assert_eq!(src.len_hint(), Some(0));
    }
}
