//! Row sources read from disk, joined and capped.

use evloop_core::schema::{ColumnType, Field, Schema};
use evloop_core::types::Value;
use evloop_io::{Capped, JoinError, RowSource, SourceError, SourceSpec};
use evloop_tests::{cleanup_dir, create_temp_dir, uniform_table, write_jets_jsonl, write_weighted_csv};

fn drain(source: &mut dyn RowSource, column: &str) -> Vec<Value> {
    let slot = source.slot(column).unwrap();
    let mut out = Vec::new();
    while source.advance().unwrap() {
        out.push(slot.value());
    }
    out
}

#[test]
fn csv_columns_default_to_f64() {
    let dir = create_temp_dir("csv");
    let path = dir.join("events.csv");
    write_weighted_csv(&path, 4, |i| i as f64 * 0.5);

    let mut src = SourceSpec::csv(&path).open().unwrap();
    assert_eq!(src.name(), "events");
    assert_eq!(src.schema().field("w").unwrap().column_type, ColumnType::F64);
    let w = drain(src.as_mut(), "w");
    assert_eq!(
        w,
        [Value::F64(0.0), Value::F64(0.5), Value::F64(1.0), Value::F64(1.5)]
    );
    assert_eq!(src.rows_read(), 4);
    cleanup_dir(&dir);
}

#[test]
fn csv_schema_selects_and_types_columns() {
    let dir = create_temp_dir("csv-schema");
    let path = dir.join("events.csv");
    write_weighted_csv(&path, 3, |_| 2.0);

    let spec = SourceSpec::Csv {
        path: path.clone(),
        schema: Some(Schema::new(vec![Field::new("w", ColumnType::F32)])),
    };
    let mut src = spec.open().unwrap();
    assert!(matches!(src.slot("x"), Err(SourceError::ColumnNotFound { .. })));
    assert_eq!(drain(src.as_mut(), "w"), vec![Value::F32(2.0); 3]);

    let missing = SourceSpec::Csv {
        path,
        schema: Some(Schema::new(vec![Field::new("pt", ColumnType::F64)])),
    };
    assert!(matches!(
        missing.open().err(),
        Some(SourceError::ColumnNotFound { .. })
    ));
    cleanup_dir(&dir);
}

#[test]
fn jsonl_infers_vector_columns() {
    let dir = create_temp_dir("jsonl");
    let path = dir.join("jets.jsonl");
    write_jets_jsonl(&path, 4);

    // The first row has no jets, so the type comes from the array itself.
    let mut src = SourceSpec::jsonl(&path).open().unwrap();
    assert_eq!(src.schema().field("jets").unwrap().column_type, ColumnType::VecF64);
    let jets = drain(src.as_mut(), "jets");
    assert_eq!(
        jets,
        [
            Value::VecF64(vec![]),
            Value::VecF64(vec![10.0]),
            Value::VecF64(vec![10.0, 20.0]),
            Value::VecF64(vec![]),
        ]
    );
    cleanup_dir(&dir);
}

#[test]
fn join_combines_columns_row_by_row() {
    let dir = create_temp_dir("join");
    let csv = dir.join("events.csv");
    let jsonl = dir.join("jets.jsonl");
    write_weighted_csv(&csv, 3, |i| i as f64);
    write_jets_jsonl(&jsonl, 3);

    let spec = SourceSpec::Join(vec![SourceSpec::csv(&csv), SourceSpec::jsonl(&jsonl)]);
    assert_eq!(
        spec.to_string(),
        format!("join[csv:{}, jsonl:{}]", csv.display(), jsonl.display())
    );
    let mut src = spec.open().unwrap();
    assert_eq!(src.name(), "events+jets");
    let x = src.slot("x").unwrap();
    let jets = src.slot("jets").unwrap();
    let mut rows = Vec::new();
    while src.advance().unwrap() {
        rows.push((x.value(), jets.value()));
    }
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2], (Value::F64(2.0), Value::VecF64(vec![10.0, 20.0])));
    cleanup_dir(&dir);
}

#[test]
fn join_detects_mismatched_lengths() {
    // Known lengths fail up front.
    let spec = SourceSpec::Join(vec![
        SourceSpec::memory("a", uniform_table(3)),
        SourceSpec::memory("b", {
            let mut t = uniform_table(4);
            t.columns[0].name = "y".into();
            t
        }),
    ]);
    assert!(matches!(
        spec.open().err(),
        Some(SourceError::Join(JoinError::RowCountMismatch { .. }))
    ));

    // Unknown lengths fail when one side runs out.
    let dir = create_temp_dir("join-short");
    let csv = dir.join("events.csv");
    let jsonl = dir.join("jets.jsonl");
    write_weighted_csv(&csv, 2, |_| 1.0);
    write_jets_jsonl(&jsonl, 3);
    let mut src = SourceSpec::Join(vec![SourceSpec::csv(&csv), SourceSpec::jsonl(&jsonl)])
        .open()
        .unwrap();
    assert!(src.advance().unwrap());
    assert!(src.advance().unwrap());
    assert!(matches!(
        src.advance(),
        Err(SourceError::Join(JoinError::EndedEarly { rows: 2, .. }))
    ));
    cleanup_dir(&dir);
}

#[test]
fn duplicate_columns_cannot_be_joined() {
    let spec = SourceSpec::Join(vec![
        SourceSpec::memory("a", uniform_table(3)),
        SourceSpec::memory("b", uniform_table(3)),
    ]);
    assert!(matches!(
        spec.open().err(),
        Some(SourceError::Join(JoinError::DuplicateColumn { .. }))
    ));
}

#[test]
fn capped_sources_stop_early() {
    let inner = SourceSpec::memory("t", uniform_table(10)).open().unwrap();
    let mut capped = Capped::new(inner, 4);
    assert_eq!(capped.len_hint(), Some(4));
    let x = drain(&mut capped, "x");
    assert_eq!(x.len(), 4);
    assert_eq!(x[3], Value::F64(3.0));
    assert_eq!(capped.rows_read(), 4);
}
