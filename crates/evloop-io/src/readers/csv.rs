//! CSV row source (headers required).
//!
//! Without an explicit schema every header column is read as `f64`. Vector
//! cells hold `;`-separated numbers; an empty cell is an empty vector.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use evloop_core::schema::{ColumnType, Field, Schema};
use evloop_core::types::Value;

use crate::buffer::{RowBuffer, Slot};
use crate::error::{Result, SourceError};
use crate::source::RowSource;

pub struct CsvSource<R: Read = BufReader<File>> {
    reader: csv::Reader<R>,
    buffer: RowBuffer,
    /// For each schema field, its position in the CSV record.
    positions: Vec<usize>,
    record: csv::StringRecord,
    rows: u64,
}

impl CsvSource<BufReader<File>> {
    pub fn open(path: &Path, schema: Option<Schema>) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = File::open(path)?;
        Self::from_reader(name, BufReader::new(file), schema)
    }
}

impl<R: Read> CsvSource<R> {
    pub fn from_reader(name: impl Into<String>, rdr: R, schema: Option<Schema>) -> Result<Self> {
        let name = name.into();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let schema = match schema {
            Some(s) => s,
            None => Schema::new(
                headers
                    .iter()
                    .map(|h| Field::new(h.clone(), ColumnType::F64))
                    .collect(),
            ),
        };

        let mut positions = Vec::with_capacity(schema.len());
        for field in &schema.fields {
            let pos = headers.iter().position(|h| *h == field.name).ok_or_else(|| {
                SourceError::ColumnNotFound {
                    source_name: name.clone(),
                    column: field.name.clone(),
                }
            })?;
            positions.push(pos);
        }

        Ok(Self {
            reader,
            buffer: RowBuffer::new(name, schema),
            positions,
            record: csv::StringRecord::new(),
            rows: 0,
        })
    }
}

impl<R: Read> RowSource for CsvSource<R> {
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
        if !self.reader.read_record(&mut self.record)? {
            return Ok(false);
        }
        let line = self
            .record
            .position()
            .map(|p| p.line())
            .unwrap_or(self.rows + 2);

        for (idx, &pos) in self.positions.iter().enumerate() {
            let field = &self.buffer.schema().fields[idx];
            let cell = self.record.get(pos).unwrap_or("");
            let value = parse_cell(cell, field.column_type).map_err(|message| {
                SourceError::Parse {
                    source_name: self.buffer.source_name().to_string(),
                    line,
                    message: format!("column '{}': {message}", field.name),
                }
            })?;
            self.buffer.store(idx, value)?;
        }
        self.rows += 1;
        Ok(true)
    }

    fn rows_read(&self) -> u64 {
        self.rows
    }
}

pub(crate) fn parse_cell(cell: &str, ty: ColumnType) -> std::result::Result<Value, String> {
    let cell = cell.trim();
    match ty {
        ColumnType::Bool => match cell {
            "true" | "True" | "TRUE" | "1" => Ok(Value::Bool(true)),
            "false" | "False" | "FALSE" | "0" => Ok(Value::Bool(false)),
            other => Err(format!("'{other}' is not a bool")),
        },
        ColumnType::F32 => cell
            .parse::<f32>()
            .map(Value::F32)
            .map_err(|e| format!("'{cell}': {e}")),
        ColumnType::F64 => cell
            .parse::<f64>()
            .map(Value::F64)
            .map_err(|e| format!("'{cell}': {e}")),
        ColumnType::VecF32 => split_vector(cell)
            .map(|s| s.parse::<f32>().map_err(|e| format!("'{s}': {e}")))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::VecF32),
        ColumnType::VecF64 => split_vector(cell)
            .map(|s| s.parse::<f64>().map_err(|e| format!("'{s}': {e}")))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::VecF64),
    }
}

fn split_vector(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(';').map(str::trim).filter(|s| !s.is_empty())
}
