//! YAML analysis files: parsing, validation and running them end to end.

use std::fs;

use evloop_core::config::LoopConfig;
use evloop_exec::Engine;
use evloop_model::{load_yaml_analysis, parse_yaml_analysis, ModelError, SampleKind};
use evloop_tests::{cleanup_dir, create_temp_dir, write_jets_jsonl, write_weighted_csv};

#[test]
fn test_parse_and_run_weighted_analysis() {
    let dir = create_temp_dir("yaml-run");
    write_weighted_csv(&dir.join("data.csv"), 100, |_| 1.0);
    write_weighted_csv(&dir.join("ttbar.csv"), 100, |i| if i % 2 == 0 { 2.0 } else { 0.0 });
    fs::write(
        dir.join("analysis.yaml"),
        r#"
config:
  luminosity: 10.0
samples:
  - name: data
    kind: data
    components:
      - source: { csv: "data.csv" }
  - name: ttbar
    kind: bkg
    label: "t#bar{t}"
    weight: "w"
    components:
      - source: { csv: "ttbar.csv" }
        xsec: 5.0
        ngen: 100
variables:
  - { name: x, bins: 10, low: 0, high: 100 }
  - { name: x_half, expr: "x / 2", bins: 10, low: 0, high: 100 }
selections:
  - { name: all, cut: "x >= 0" }
  - { name: high_x, cut: "x > 50" }
"#,
    )
    .unwrap();

    let parsed = load_yaml_analysis(&dir.join("analysis.yaml")).unwrap();
    assert_eq!(parsed.analysis.samples()[1].kind, SampleKind::Background);
    assert_eq!(parsed.analysis.samples()[1].label, "t#bar{t}");
    let config = parsed.config.apply_to(&LoopConfig::default()).unwrap();
    assert_eq!(config.luminosity(), 10.0);

    let out = Engine::new(config).run(&parsed.analysis).unwrap();
    let data = out.grid.by_name("data", "all", "x").unwrap();
    assert_eq!(data.integral(), 100.0);

    // 50 even rows of weight 2, each scaled by 10 * 5 / 100.
    let ttbar = out.grid.by_name("ttbar", "all", "x").unwrap();
    assert_eq!(ttbar.entries(), 100);
    assert!((ttbar.integral() - 50.0).abs() < 1e-9);

    let half = out.grid.by_name("data", "high_x", "x_half").unwrap();
    assert_eq!(half.entries(), 49);
    assert_eq!(half.bin_content(2), Some(9.0));
    cleanup_dir(&dir);
}

#[test]
fn test_joined_sources_with_schemas() {
    let dir = create_temp_dir("yaml-join");
    write_weighted_csv(&dir.join("events.csv"), 6, |_| 1.0);
    write_jets_jsonl(&dir.join("jets.jsonl"), 6);
    let yaml = r#"
samples:
  - name: sig
    kind: signal
    components:
      - source:
          join:
            - { csv: "events.csv", schema: [ { name: x, type: f32 } ] }
            - { jsonl: "jets.jsonl", schema: [ { name: jets, type: "vec<f64>" } ] }
variables:
  - { name: n_jets_x, expr: "x", bins: 6, low: 0, high: 6 }
"#;
    let parsed = parse_yaml_analysis(yaml, &dir).unwrap();
    assert_eq!(
        parsed.analysis.samples()[0].components[0].source.to_string(),
        format!(
            "join[csv:{}, jsonl:{}]",
            dir.join("events.csv").display(),
            dir.join("jets.jsonl").display()
        )
    );
    let out = Engine::new(LoopConfig::default()).run(&parsed.analysis).unwrap();
    let h = out.grid.by_name("sig", "no cut", "n_jets_x").unwrap();
    assert_eq!(h.entries(), 6);
    cleanup_dir(&dir);
}

#[test]
fn test_unknown_fields_are_rejected() {
    let yaml = r#"
samples:
  - name: d
    kind: data
    colour: red
    components:
      - source: { csv: "d.csv" }
"#;
    assert!(matches!(
        parse_yaml_analysis(yaml, std::path::Path::new(".")),
        Err(ModelError::Yaml(_))
    ));
}

#[test]
fn test_source_needs_exactly_one_kind() {
    let yaml = r#"
samples:
  - name: d
    kind: data
    components:
      - source: { csv: "d.csv", jsonl: "d.jsonl" }
"#;
    assert!(matches!(
        parse_yaml_analysis(yaml, std::path::Path::new(".")),
        Err(ModelError::Dsl(_))
    ));
}

#[test]
fn test_bad_formulas_and_binnings_fail_at_parse_time() {
    let bad_formula = r#"
samples:
  - name: d
    kind: data
    components:
      - source: { csv: "d.csv" }
selections:
  - { name: sr, cut: "x > > 3" }
"#;
    assert!(parse_yaml_analysis(bad_formula, std::path::Path::new(".")).is_err());

    let bad_binning = r#"
samples:
  - name: d
    kind: data
    components:
      - source: { csv: "d.csv" }
variables:
  - { name: x, bins: 10, low: 5, high: 5 }
"#;
    assert!(parse_yaml_analysis(bad_binning, std::path::Path::new(".")).is_err());
}

#[test]
fn test_missing_column_is_reported_before_reading() {
    let dir = create_temp_dir("yaml-missing");
    write_weighted_csv(&dir.join("d.csv"), 10, |_| 1.0);
    let yaml = r#"
samples:
  - name: d
    kind: data
    components:
      - source: { csv: "d.csv" }
variables:
  - { name: pt, bins: 10, low: 0, high: 100 }
"#;
    let parsed = parse_yaml_analysis(yaml, &dir).unwrap();
    let err = Engine::new(LoopConfig::default())
        .run(&parsed.analysis)
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("'d'"), "{msg}");
    assert!(msg.contains("'pt'"), "{msg}");
    cleanup_dir(&dir);
}
