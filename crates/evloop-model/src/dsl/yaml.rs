//! YAML analysis files.
//!
//! Example:
//! ```yaml
//! config:
//!   luminosity: 140.0
//!   unit_conversion: 1000
//!   parallel: true
//! samples:
//!   - name: data
//!     kind: data
//!     components:
//!       - source: { csv: "data.csv" }
//!   - name: ttbar
//!     kind: background
//!     weight: "gen_weight"
//!     components:
//!       - source:
//!           join:
//!             - { csv: "ttbar.csv", schema: [ {name: x, type: f64} ] }
//!             - { jsonl: "ttbar_weights.jsonl" }
//!         xsec: 831.8
//!         ngen: 1.0e6
//! variables:
//!   - { name: x, expr: "x", bins: 10, low: 0, high: 100 }
//! selections:
//!   - { name: high_x, cut: "x > 50" }
//! ```
//!
//! Every expression is a string formula. Relative source paths resolve
//! against the directory passed to `parse_yaml_analysis`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use evloop_core::config::LoopConfig;
use evloop_core::schema::{ColumnType, Field, Schema};
use evloop_expr::Expression;
use evloop_io::SourceSpec;

use crate::analysis::Analysis;
use crate::error::{ModelError, Result};
use crate::sample::{Component, Sample, SampleKind};
use crate::variable::{Selection, Variable};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisDoc {
    #[serde(default)]
    pub config: Option<DslConfig>,
    pub samples: Vec<SampleDef>,
    #[serde(default)]
    pub variables: Vec<VariableDef>,
    #[serde(default)]
    pub selections: Vec<SelectionDef>,
}

/// `config:` block. Unset fields leave the underlying value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DslConfig {
    pub luminosity: Option<f64>,
    pub unit_conversion: Option<f64>,
    #[serde(alias = "normalize")]
    pub normalize_to_luminosity: Option<bool>,
    pub max_rows: Option<u64>,
    pub parallel: Option<bool>,
    pub max_parallel_tasks: Option<usize>,
}

impl DslConfig {
    /// Layer these overrides over `base` and re-validate.
    pub fn apply_to(&self, base: &LoopConfig) -> Result<LoopConfig> {
        let mut b = base.to_builder();
        if let Some(v) = self.luminosity {
            b = b.luminosity(v);
        }
        if let Some(v) = self.unit_conversion {
            b = b.unit_conversion(v);
        }
        if let Some(v) = self.normalize_to_luminosity {
            b = b.normalize_to_luminosity(v);
        }
        if let Some(v) = self.max_rows {
            b = b.max_rows(Some(v));
        }
        if let Some(v) = self.parallel {
            b = b.parallel(v);
        }
        if let Some(v) = self.max_parallel_tasks {
            b = b.max_parallel_tasks(v);
        }
        Ok(b.build()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleDef {
    pub name: String,
    pub kind: SampleKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub cut: Option<String>,
    pub components: Vec<ComponentDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentDef {
    pub source: SourceDef,
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub cut: Option<String>,
    #[serde(default)]
    pub xsec: Option<f64>,
    #[serde(default)]
    pub ngen: Option<f64>,
}

/// Exactly one of `csv`, `jsonl` or `join` must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceDef {
    pub csv: Option<String>,
    pub jsonl: Option<String>,
    pub join: Option<Vec<SourceDef>>,
    pub schema: Option<Vec<FieldDef>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableDef {
    pub name: String,
    /// Formula; defaults to the column named like the variable.
    #[serde(default)]
    pub expr: Option<String>,
    pub bins: usize,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionDef {
    pub name: String,
    pub cut: String,
}

#[derive(Debug, Clone)]
pub struct ParsedAnalysis {
    pub analysis: Analysis,
    pub config: DslConfig,
}

/// Parse an analysis document; relative paths resolve against `base_dir`.
pub fn parse_yaml_analysis(yaml_src: &str, base_dir: &Path) -> Result<ParsedAnalysis> {
    let doc: AnalysisDoc = serde_yaml::from_str(yaml_src)?;

    let samples = doc
        .samples
        .iter()
        .map(|s| sample_from_def(s, base_dir))
        .collect::<Result<Vec<_>>>()?;
    let variables = doc
        .variables
        .iter()
        .map(|v| Variable::formula(&v.name, v.expr.as_deref().unwrap_or(&v.name), v.bins, v.low, v.high))
        .collect::<Result<Vec<_>>>()?;
    let selections = doc
        .selections
        .iter()
        .map(|s| Selection::formula(&s.name, &s.cut))
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedAnalysis {
        analysis: Analysis::new(samples, selections, variables)?,
        config: doc.config.unwrap_or_default(),
    })
}

/// Read and parse an analysis file, resolving sources next to it.
pub fn load_yaml_analysis(path: &Path) -> Result<ParsedAnalysis> {
    let src = std::fs::read_to_string(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_yaml_analysis(&src, base)
}

fn sample_from_def(def: &SampleDef, base_dir: &Path) -> Result<Sample> {
    let mut sample = Sample::new(&def.name, def.kind);
    if let Some(label) = &def.label {
        sample = sample.with_label(label);
    }
    if let Some(w) = &def.weight {
        sample = sample.with_weight(Expression::formula(format!("{}.weight", def.name), w)?);
    }
    if let Some(c) = &def.cut {
        sample = sample.with_cut(Expression::formula(format!("{}.cut", def.name), c)?);
    }
    for (i, cdef) in def.components.iter().enumerate() {
        let mut comp = Component::new(source_from_def(&cdef.source, base_dir)?);
        if let Some(w) = &cdef.weight {
            comp = comp.with_weight(Expression::formula(
                format!("{}[{i}].weight", def.name),
                w,
            )?);
        }
        if let Some(c) = &cdef.cut {
            comp = comp.with_cut(Expression::formula(format!("{}[{i}].cut", def.name), c)?);
        }
        if let Some(x) = cdef.xsec {
            comp = comp.with_xsec(x);
        }
        if let Some(n) = cdef.ngen {
            comp = comp.with_ngen(n);
        }
        sample = sample.with_component(comp);
    }
    Ok(sample)
}

fn source_from_def(def: &SourceDef, base_dir: &Path) -> Result<SourceSpec> {
    let schema = def.schema.as_deref().map(to_schema).transpose()?;
    match (&def.csv, &def.jsonl, &def.join) {
        (Some(path), None, None) => Ok(SourceSpec::Csv {
            path: resolve(base_dir, path),
            schema,
        }),
        (None, Some(path), None) => Ok(SourceSpec::Jsonl {
            path: resolve(base_dir, path),
            schema,
        }),
        (None, None, Some(parts)) => {
            if schema.is_some() {
                return Err(ModelError::Dsl(
                    "a join source takes schemas on its parts, not on the join".into(),
                ));
            }
            let parts = parts
                .iter()
                .map(|p| source_from_def(p, base_dir))
                .collect::<Result<Vec<_>>>()?;
            Ok(SourceSpec::Join(parts))
        }
        _ => Err(ModelError::Dsl(
            "a source needs exactly one of 'csv', 'jsonl' or 'join'".into(),
        )),
    }
}

fn to_schema(fields: &[FieldDef]) -> Result<Schema> {
    fields
        .iter()
        .map(|f| {
            ColumnType::parse(&f.column_type)
                .map(|t| Field::new(f.name.clone(), t))
                .ok_or_else(|| {
                    ModelError::Dsl(format!(
                        "column '{}' has unknown type '{}'",
                        f.name, f.column_type
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()
        .map(Schema::new)
}

fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
config:
  luminosity: 140.0
  normalize: false
samples:
  - name: data
    kind: data
    components:
      - source: { csv: "data.csv" }
  - name: ttbar
    kind: bkg
    label: "t#bar{t}"
    weight: "w * 0.5"
    components:
      - source:
          join:
            - { csv: "a.csv", schema: [ {name: x, type: f32} ] }
            - { jsonl: "/abs/b.jsonl" }
        xsec: 831.8
        ngen: 1.0e6
variables:
  - { name: x, bins: 10, low: 0, high: 100 }
selections:
  - { name: high_x, cut: "x > 50" }
"#;

    #[test]
    fn parses_full_document() {
        let parsed = parse_yaml_analysis(DOC, Path::new("/work")).unwrap();
        let a = &parsed.analysis;
        assert_eq!(a.samples().len(), 2);
        assert_eq!(a.samples()[1].kind, SampleKind::Background);
        assert_eq!(a.samples()[1].label, "t#bar{t}");
        assert_eq!(a.samples()[1].weight.inputs(), ["w"]);
        assert_eq!(a.samples()[1].components[0].ngen, 1.0e6);
        assert_eq!(a.variables()[0].expr.inputs(), ["x"]);
        assert_eq!(a.selections()[0].name, "high_x");

        match &a.samples()[1].components[0].source {
            SourceSpec::Join(parts) => {
                assert!(matches!(
                    &parts[0],
                    SourceSpec::Csv { path, schema: Some(s) }
                        if path == Path::new("/work/a.csv") && s.fields[0].column_type == ColumnType::F32
                ));
                assert!(matches!(
                    &parts[1],
                    SourceSpec::Jsonl { path, schema: None } if path == Path::new("/abs/b.jsonl")
                ));
            }
            other => panic!("expected a join, got {other:?}"),
        }
    }

    #[test]
    fn config_block_layers_over_base() {
        let parsed = parse_yaml_analysis(DOC, Path::new(".")).unwrap();
        let base = LoopConfig::builder().parallel(true).build().unwrap();
        let cfg = parsed.config.apply_to(&base).unwrap();
        assert_eq!(cfg.luminosity(), 140.0);
        assert!(!cfg.normalize_to_luminosity());
        assert!(cfg.parallel());
    }

    #[test]
    fn ambiguous_source_is_rejected() {
        let doc = r#"
samples:
  - name: d
    kind: data
    components:
      - source: { csv: "a.csv", jsonl: "b.jsonl" }
"#;
        assert!(matches!(
            parse_yaml_analysis(doc, Path::new(".")),
            Err(ModelError::Dsl(_))
        ));
    }

    #[test]
    fn unknown_column_type_is_rejected() {
        let doc = r#"
samples:
  - name: d
    kind: data
    components:
      - source: { csv: "a.csv", schema: [ {name: s, type: utf8} ] }
"#;
        let err = parse_yaml_analysis(doc, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("unknown type 'utf8'"));
    }

    #[test]
    fn bad_formula_surfaces_as_expr_error() {
        let doc = r#"
samples:
  - name: d
    kind: data
    components:
      - source: { csv: "a.csv" }
selections:
  - { name: broken, cut: "x >" }
"#;
        assert!(matches!(
            parse_yaml_analysis(doc, Path::new(".")),
            Err(ModelError::Expr(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let doc = "samples: []\nbogus: 1\n";
        assert!(matches!(
            parse_yaml_analysis(doc, Path::new(".")),
            Err(ModelError::Yaml(_))
        ));
    }
}
