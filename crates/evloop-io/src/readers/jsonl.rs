//! Newline-delimited JSON row source.
//!
//! Each non-blank line is one object. Without a schema, column types are
//! taken from the first object: booleans become `bool`, numbers `f64`,
//! numeric arrays `vec<f64>`. Keys are ordered by name.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{Map, Value as Json};

use evloop_core::schema::{ColumnType, Field, Schema};
use evloop_core::types::Value;

use crate::buffer::{RowBuffer, Slot};
use crate::error::{Result, SourceError};
use crate::source::RowSource;

pub struct JsonlSource<R: BufRead = BufReader<File>> {
    lines: std::io::Lines<R>,
    buffer: RowBuffer,
    /// First object, read ahead during schema inference.
    pending: Option<(u64, Map<String, Json>)>,
    line: u64,
    rows: u64,
}

impl JsonlSource<BufReader<File>> {
    pub fn open(path: &Path, schema: Option<Schema>) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = File::open(path)?;
        Self::from_reader(name, BufReader::new(file), schema)
    }
}

impl<R: BufRead> JsonlSource<R> {
    pub fn from_reader(name: impl Into<String>, rdr: R, schema: Option<Schema>) -> Result<Self> {
        let name = name.into();
        let mut src = Self {
            lines: rdr.lines(),
            buffer: RowBuffer::new(name.clone(), Schema::default()),
            pending: None,
            line: 0,
            rows: 0,
        };

        let schema = match schema {
            Some(s) => s,
            None => {
                let first = src.next_object()?;
                let schema = match &first {
                    Some((line, obj)) => infer_schema(&name, *line, obj)?,
                    None => Schema::default(),
                };
                src.pending = first;
                schema
            }
        };
        src.buffer = RowBuffer::new(name, schema);
        Ok(src)
    }

    fn next_object(&mut self) -> Result<Option<(u64, Map<String, Json>)>> {
        for line in self.lines.by_ref() {
            let line = line?;
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            return match serde_json::from_str::<Json>(&line) {
                Ok(Json::Object(obj)) => Ok(Some((self.line, obj))),
                Ok(_) => Err(parse_error(
                    self.buffer.source_name(),
                    self.line,
                    "expected a JSON object".into(),
                )),
                Err(e) => Err(parse_error(self.buffer.source_name(), self.line, e.to_string())),
            };
        }
        Ok(None)
    }
}

fn parse_error(source_name: &str, line: u64, message: String) -> SourceError {
    SourceError::Parse {
        source_name: source_name.to_string(),
        line,
        message,
    }
}

impl<R: BufRead> RowSource for JsonlSource<R> {
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
        let next = match self.pending.take() {
            Some(obj) => Some(obj),
            None => self.next_object()?,
        };
        let Some((line, obj)) = next else {
            return Ok(false);
        };

        let name = self.buffer.source_name();
        for (idx, field) in self.buffer.schema().fields.iter().enumerate() {
            let raw = obj
                .get(&field.name)
                .ok_or_else(|| parse_error(name, line, format!("missing key '{}'", field.name)))?;
            let value = json_to_value(raw, field.column_type)
                .map_err(|m| parse_error(name, line, format!("key '{}': {m}", field.name)))?;
            self.buffer.store(idx, value)?;
        }
        self.rows += 1;
        Ok(true)
    }

    fn rows_read(&self) -> u64 {
        self.rows
    }
}

fn infer_schema(name: &str, line: u64, obj: &Map<String, Json>) -> Result<Schema> {
    let mut keys: Vec<&String> = obj.keys().collect();
    keys.sort();
    let mut fields = Vec::with_capacity(keys.len());
    for key in keys {
        let ty = match &obj[key] {
            Json::Bool(_) => ColumnType::Bool,
            Json::Number(_) => ColumnType::F64,
            Json::Array(_) => ColumnType::VecF64,
            other => {
                return Err(parse_error(
                    name,
                    line,
                    format!("key '{key}' has unsupported value {other}"),
                ))
            }
        };
        fields.push(Field::new(key.clone(), ty));
    }
    Ok(Schema::new(fields))
}

fn json_to_value(raw: &Json, ty: ColumnType) -> std::result::Result<Value, String> {
    let number = |v: &Json| v.as_f64().ok_or_else(|| format!("{v} is not a number"));
    match ty {
        ColumnType::Bool => match raw {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) if n.as_f64() == Some(0.0) => Ok(Value::Bool(false)),
            Json::Number(n) if n.as_f64() == Some(1.0) => Ok(Value::Bool(true)),
            other => Err(format!("{other} is not a bool")),
        },
        ColumnType::F32 => number(raw).map(|x| Value::F32(x as f32)),
        ColumnType::F64 => number(raw).map(Value::F64),
        ColumnType::VecF32 | ColumnType::VecF64 => {
            let items = raw
                .as_array()
                .ok_or_else(|| format!("{raw} is not an array"))?;
            let values = items.iter().map(number).collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(if ty == ColumnType::VecF32 {
                Value::VecF32(values.into_iter().map(|x| x as f32).collect())
            } else {
                Value::VecF64(values)
            })
        }
    }
}
