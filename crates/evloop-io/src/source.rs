//! The row source capability and its declarative, thread-safe description.
//!
//! `SourceSpec` is what an analysis stores: it is `Send + Sync` and can be
//! shipped to whichever worker executes the sample. `open()` produces the
//! live, single-threaded `RowSource` on that worker.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use evloop_core::schema::Schema;
use evloop_core::types::Table;

use crate::buffer::Slot;
use crate::error::Result;
use crate::join::JoinedSource;
use crate::readers::csv::CsvSource;
use crate::readers::jsonl::JsonlSource;
use crate::readers::memory::MemorySource;

/// An iterable dataset exposing named, typed columns through a live row
/// buffer. Handles returned by `slot` stay valid for the life of the source
/// and always reflect the row most recently produced by `advance`.
pub trait RowSource {
    fn name(&self) -> &str;

    fn schema(&self) -> &Schema;

    /// Live handle for `column`, or `ColumnNotFound`.
    fn slot(&self, column: &str) -> Result<Slot>;

    /// Move to the next row. Returns `false` once exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Total number of rows, when known without reading them.
    fn len_hint(&self) -> Option<u64> {
        None
    }

    /// Rows produced so far.
    fn rows_read(&self) -> u64;
}

/// Stops the inner source after `max_rows` rows.
pub struct Capped {
    inner: Box<dyn RowSource>,
    max_rows: u64,
    read: u64,
}

impl Capped {
    pub fn new(inner: Box<dyn RowSource>, max_rows: u64) -> Self {
        Self {
            inner,
            max_rows,
            read: 0,
        }
    }
}

impl RowSource for Capped {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn schema(&self) -> &Schema {
        self.inner.schema()
    }

    fn slot(&self, column: &str) -> Result<Slot> {
        self.inner.slot(column)
    }

    fn advance(&mut self) -> Result<bool> {
        if self.read >= self.max_rows {
            return Ok(false);
        }
        let more = self.inner.advance()?;
        if more {
            self.read += 1;
        }
        Ok(more)
    }

    fn len_hint(&self) -> Option<u64> {
        self.inner.len_hint().map(|n| n.min(self.max_rows))
    }

    fn rows_read(&self) -> u64 {
        self.read
    }
}

/// Declarative description of where a component's rows come from.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    Memory { name: String, table: Arc<Table> },
    /// Delimited text with a header row. Without a schema every column is `f64`.
    Csv {
        path: PathBuf,
        schema: Option<Schema>,
    },
    /// One JSON object per line. Without a schema types come from the first row.
    Jsonl {
        path: PathBuf,
        schema: Option<Schema>,
    },
    /// Row-aligned union of the columns of several sources.
    Join(Vec<SourceSpec>),
}

impl SourceSpec {
    pub fn memory(name: impl Into<String>, table: Table) -> Self {
        SourceSpec::Memory {
            name: name.into(),
            table: Arc::new(table),
        }
    }

    pub fn csv(path: impl Into<PathBuf>) -> Self {
        SourceSpec::Csv {
            path: path.into(),
            schema: None,
        }
    }

    pub fn jsonl(path: impl Into<PathBuf>) -> Self {
        SourceSpec::Jsonl {
            path: path.into(),
            schema: None,
        }
    }

    /// Open a fresh live source. Each call yields an independent cursor.
    pub fn open(&self) -> Result<Box<dyn RowSource>> {
        let source: Box<dyn RowSource> = match self {
            SourceSpec::Memory { name, table } => {
                Box::new(MemorySource::new(name.clone(), Arc::clone(table)))
            }
            SourceSpec::Csv { path, schema } => Box::new(CsvSource::open(path, schema.clone())?),
            SourceSpec::Jsonl { path, schema } => {
                Box::new(JsonlSource::open(path, schema.clone())?)
            }
            SourceSpec::Join(parts) => {
                let opened = parts
                    .iter()
                    .map(SourceSpec::open)
                    .collect::<Result<Vec<_>>>()?;
                Box::new(JoinedSource::new(opened)?)
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(source = source.name(), columns = source.schema().len(), "opened row source");

        Ok(source)
    }

    /// One-line human description used by `explain`.
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Memory { name, table } => {
                write!(f, "memory:{name} ({} rows)", table.num_rows())
            }
            SourceSpec::Csv { path, .. } => write!(f, "csv:{}", path.display()),
            SourceSpec::Jsonl { path, .. } => write!(f, "jsonl:{}", path.display()),
            SourceSpec::Join(parts) => {
                f.write_str("join[")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evloop_core::types::{Column, Value};

    fn table(n: usize) -> Table {
        Table::new(vec![Column::f64("x", (0..n).map(|i| i as f64).collect())]).unwrap()
    }

    #[test]
    fn capped_stops_early() {
        let spec = SourceSpec::memory("m", table(10));
        let mut src = Capped::new(spec.open().unwrap(), 3);
        let x = src.slot("x").unwrap();
        let mut seen = Vec::new();
        while src.advance().unwrap() {
            seen.push(x.value());
        }
        assert_eq!(seen, vec![Value::F64(0.0), Value::F64(1.0), Value::F64(2.0)]);
        assert_eq!(src.rows_read(), 3);
        assert_eq!(src.len_hint(), Some(3));
    }

    #[test]
    fn open_yields_independent_cursors() {
        let spec = SourceSpec::memory("m", table(2));
        let mut a = spec.open().unwrap();
        let mut b = spec.open().unwrap();
        assert!(a.advance().unwrap());
        assert!(a.advance().unwrap());
        assert!(!a.advance().unwrap());
        assert_eq!(b.rows_read(), 0);
        assert!(b.advance().unwrap());
    }

    #[test]
    fn describe_nests_joins() {
        let spec = SourceSpec::Join(vec![
            SourceSpec::memory("a", table(1)),
            SourceSpec::csv("b.csv"),
        ]);
        assert_eq!(spec.describe(), "join[memory:a (1 rows), csv:b.csv]");
    }
}
