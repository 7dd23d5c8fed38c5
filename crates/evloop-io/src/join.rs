//! Row-aligned join of several sources ("friend" trees).
//!
//! Row `i` of the join is row `i` of every part. Column names must be unique
//! across parts. When every part knows its length up front, a mismatch is
//! reported at construction; otherwise it surfaces as `EndedEarly` when one
//! part runs dry before the others.

use evloop_core::schema::{Field, Schema};

use crate::buffer::Slot;
use crate::error::{JoinError, Result, SourceError};
use crate::source::RowSource;

pub struct JoinedSource {
    name: String,
    parts: Vec<Box<dyn RowSource>>,
    schema: Schema,
    /// Owning part for each field of `schema`.
    owners: Vec<usize>,
    rows: u64,
}

impl JoinedSource {
    pub fn new(parts: Vec<Box<dyn RowSource>>) -> Result<Self> {
        if parts.is_empty() {
            return Err(JoinError::Empty.into());
        }

        let mut fields: Vec<Field> = Vec::new();
        let mut owners: Vec<usize> = Vec::new();
        for (pi, part) in parts.iter().enumerate() {
            for field in &part.schema().fields {
                if let Some(pos) = fields.iter().position(|f| f.name == field.name) {
                    return Err(JoinError::DuplicateColumn {
                        column: field.name.clone(),
                        left: parts[owners[pos]].name().to_string(),
                        right: part.name().to_string(),
                    }
                    .into());
                }
                fields.push(field.clone());
                owners.push(pi);
            }
        }

        // Every part with a known length must agree with the first such part.
        let mut known = parts.iter().filter_map(|p| p.len_hint().map(|n| (p, n)));
        if let Some((first, first_rows)) = known.next() {
            for (part, rows) in known {
                if rows != first_rows {
                    return Err(JoinError::RowCountMismatch {
                        left: first.name().to_string(),
                        left_rows: first_rows,
                        right: part.name().to_string(),
                        right_rows: rows,
                    }
                    .into());
                }
            }
        }

        let name = parts
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join("+");

        Ok(Self {
            name,
            parts,
            schema: Schema::new(fields),
            owners,
            rows: 0,
        })
    }
}

impl RowSource for JoinedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn slot(&self, column: &str) -> Result<Slot> {
        let idx = self
            .schema
            .index_of(column)
            .ok_or_else(|| SourceError::ColumnNotFound {
                source_name: self.name.clone(),
                column: column.to_string(),
            })?;
        self.parts[self.owners[idx]].slot(column)
    }

    fn advance(&mut self) -> Result<bool> {
        let mut ended: Option<usize> = None;
        let mut active: Option<usize> = None;
        for (i, part) in self.parts.iter_mut().enumerate() {
            if part.advance()? {
                active.get_or_insert(i);
            } else {
                ended.get_or_insert(i);
            }
        }
        match (ended, active) {
            (None, _) => {
                self.rows += 1;
                Ok(true)
            }
            (Some(_), None) => Ok(false),
            (Some(e), Some(a)) => Err(JoinError::EndedEarly {
                ended: self.parts[e].name().to_string(),
                other: self.parts[a].name().to_string(),
                rows: self.rows,
            }
            .into()),
        }
    }

    fn len_hint(&self) -> Option<u64> {
        self.parts.iter().filter_map(|p| p.len_hint()).min()
    }

    fn rows_read(&self) -> u64 {
        self.rows
    }
}
