//! Expression binding against live row sources.

use evloop_core::schema::ColumnType;
use evloop_core::types::{Column, Table};
use evloop_expr::{BindingError, BindingRegistry, Expression, OutputKind, ParamType, Shape};
use evloop_io::{RowSource, SourceSpec};

fn events() -> Table {
    Table::new(vec![
        Column::f32("pt", vec![10.0, 20.0, 30.0]),
        Column::f64("eta", vec![0.5, -1.5, 2.8]),
        Column::bool("trigger", vec![true, false, true]),
        Column::vec_f32("jet_pt", vec![vec![], vec![25.0], vec![40.0, 15.0]]),
    ])
    .unwrap()
}

fn open(name: &str) -> Box<dyn RowSource> {
    SourceSpec::memory(name, events()).open().unwrap()
}

#[test]
fn closure_shapes_follow_signatures() {
    let e = Expression::new("f", ["pt", "eta", "trigger"], |pt: f32, eta: f64, t: bool| {
        if t {
            pt as f64 * eta
        } else {
            0.0
        }
    })
    .unwrap();
    assert_eq!(
        e.shape(),
        &Shape::new(
            vec![ParamType::F32, ParamType::F64, ParamType::Bool],
            OutputKind::Scalar
        )
    );
    let jets = Expression::new("n", ["jet_pt"], |j: Vec<f32>| j.len() > 1).unwrap();
    assert_eq!(jets.output_kind(), OutputKind::Predicate);
}

#[test]
fn declaring_the_wrong_number_of_inputs_fails_immediately() {
    let err = Expression::new("f", ["pt"], |a: f32, b: f32| a + b).unwrap_err();
    assert!(err.to_string().contains("takes 2"), "{err}");
}

#[test]
fn evaluators_over_different_sources_are_independent() {
    let expr = Expression::new("pt", ["pt"], |pt: f32| pt as f64).unwrap();
    let reg = BindingRegistry::standard();
    let mut a = open("a");
    let mut b = open("b");
    let fa = reg.bind(&expr, a.as_ref()).unwrap().into_scalar().unwrap();
    let fb = reg.bind(&expr, b.as_ref()).unwrap().into_scalar().unwrap();

    assert!(a.advance().unwrap());
    assert!(b.advance().unwrap());
    assert!(a.advance().unwrap());
    assert!(a.advance().unwrap());
    assert_eq!(fa(), 30.0);
    assert_eq!(fb(), 10.0);
}

#[test]
fn vector_expressions_see_each_row() {
    let expr = Expression::new("jets", ["jet_pt"], |j: Vec<f32>| j).unwrap();
    let mut src = open("a");
    let eval = BindingRegistry::standard().bind(&expr, src.as_ref()).unwrap();
    let mut seen = Vec::new();
    while src.advance().unwrap() {
        eval.for_each_value::<()>(|v| {
            seen.push(v);
            Ok(())
        })
        .unwrap();
    }
    assert_eq!(seen, [25.0, 40.0, 15.0]);
}

#[test]
fn binding_errors_name_expression_and_column() {
    let src = open("events");
    let reg = BindingRegistry::standard();

    let missing = Expression::formula("met_cut", "met > 30").unwrap();
    match reg.bind(&missing, src.as_ref()).unwrap_err() {
        BindingError::ColumnNotFound {
            expression,
            column,
            source_name,
        } => {
            assert_eq!(expression, "met_cut");
            assert_eq!(column, "met");
            assert_eq!(source_name, "events");
        }
        other => panic!("unexpected error: {other}"),
    }

    let wrong = Expression::new("jets", ["jet_pt"], |j: Vec<f64>| j).unwrap();
    assert_eq!(
        reg.bind(&wrong, src.as_ref()).unwrap_err(),
        BindingError::TypeMismatch {
            expression: "jets".into(),
            column: "jet_pt".into(),
            expected: ParamType::VecF64,
            found: ColumnType::VecF32,
        }
    );

    // Formulas take scalars only.
    let vector_in_formula = Expression::formula("bad", "jet_pt > 1").unwrap();
    assert!(matches!(
        reg.bind(&vector_in_formula, src.as_ref()).unwrap_err(),
        BindingError::TypeMismatch { .. }
    ));
}

#[test]
fn formulas_mix_column_types() {
    let expr = Expression::formula("sel", "trigger && pt * 2 > 30 && abs(eta) < 3").unwrap();
    assert_eq!(expr.inputs(), ["trigger", "pt", "eta"]);
    let mut src = open("a");
    let f = BindingRegistry::standard()
        .bind(&expr, src.as_ref())
        .unwrap()
        .into_predicate()
        .unwrap();
    let mut passed = Vec::new();
    while src.advance().unwrap() {
        passed.push(f());
    }
    assert_eq!(passed, [false, false, true]);

    let expr = Expression::formula("w", "pt / 10 + trigger").unwrap();
    let mut src = open("a");
    let f = BindingRegistry::standard()
        .bind(&expr, src.as_ref())
        .unwrap()
        .into_scalar()
        .unwrap();
    let mut values = Vec::new();
    while src.advance().unwrap() {
        values.push(f());
    }
    assert_eq!(values, [2.0, 2.0, 4.0]);
}

#[test]
fn registry_is_extendable_per_engine() {
    let expr = Expression::new("pair", ["jet_pt", "pt"], |j: Vec<f32>, pt: f32| {
        j.iter().filter(|x| **x > pt).count() as f64
    })
    .unwrap();
    let src = open("a");
    assert!(!BindingRegistry::standard().supports(expr.shape()));
    let mut reg = BindingRegistry::with_standard();
    reg.admit(expr.shape().clone());
    assert!(reg.bind(&expr, src.as_ref()).is_ok());
    assert!(!BindingRegistry::standard().supports(expr.shape()));
}
