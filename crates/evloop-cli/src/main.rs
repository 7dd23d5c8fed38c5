//! evloop CLI: run, validate and explain YAML analyses.

use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use evloop_core::config::LoopConfig;
use evloop_core::hist::{FillError, HistogramAccumulator};
use evloop_core::id::{SelectionId, VariableId};
use evloop_exec::{Engine, ResultGrid};
use evloop_io::writers::csv::CsvWriter;
use evloop_io::writers::json::JsonWriter;
use evloop_io::writers::HistogramRecord;
use evloop_model::{load_yaml_analysis, DslConfig};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "evloop")]
#[command(about = "evloop: event-loop histogramming over samples, selections and variables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

/// Flags that override the analysis file's `config:` block.
#[derive(Args, Debug, Default, Clone)]
struct Overrides {
    /// Stop each component after this many rows
    #[arg(long)]
    max_rows: Option<u64>,

    /// Run one task per sample
    #[arg(long)]
    parallel: bool,

    /// Thread-pool size for --parallel
    #[arg(long)]
    max_parallel: Option<usize>,

    /// Integrated luminosity
    #[arg(long)]
    luminosity: Option<f64>,

    /// Do not scale simulated samples to luminosity
    #[arg(long)]
    no_normalize: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the event loop and write every histogram
    Run {
        /// Path to the analysis YAML file
        #[arg(short, long)]
        analysis: PathBuf,

        /// Result format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        output_format: OutputFormat,

        /// Result file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the run manifest as JSON to this path
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Scale every histogram to unit integral
        #[arg(long)]
        shape: bool,

        /// Also emit running background totals per selection and variable
        #[arg(long)]
        stack: bool,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Parse and validate an analysis file without reading any rows
    Validate {
        /// Path to the analysis YAML file
        #[arg(short, long)]
        analysis: PathBuf,
    },

    /// Print the analysis summary and the effective configuration
    Explain {
        /// Path to the analysis YAML file
        #[arg(short, long)]
        analysis: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            analysis,
            output_format,
            output,
            manifest,
            shape,
            stack,
            overrides,
        } => {
            let opts = RunOptions {
                format: output_format,
                output,
                manifest,
                shape,
                stack,
            };
            if let Err(e) = run_analysis(&analysis, &overrides, &opts) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Validate { analysis } => {
            if let Err(e) = validate_analysis(&analysis) {
                eprintln!("Validation failed: {e}");
                std::process::exit(1);
            }
            println!("✓ Analysis is valid");
        }
        Commands::Explain {
            analysis,
            overrides,
        } => {
            if let Err(e) = explain_analysis(&analysis, &overrides) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
}

struct RunOptions {
    format: OutputFormat,
    output: Option<PathBuf>,
    manifest: Option<PathBuf>,
    shape: bool,
    stack: bool,
}

fn run_analysis(path: &Path, overrides: &Overrides, opts: &RunOptions) -> CliResult<()> {
    let parsed = load_yaml_analysis(path)?;
    let config = layer_config(LoopConfig::from_env()?, &parsed.config, overrides)?;

    let out = Engine::new(config).run(&parsed.analysis)?;
    let grid = if opts.shape {
        out.grid.normalized()
    } else {
        out.grid
    };
    let stacked = if opts.stack {
        stacked_records(&grid)?
    } else {
        Vec::new()
    };

    write_results(&grid, &stacked, opts.format, opts.output.as_deref())?;

    if let Some(manifest_path) = &opts.manifest {
        fs::write(manifest_path, serde_json::to_string_pretty(&out.manifest)?)?;
    }

    eprintln!("✓ Event loop finished");
    eprintln!("  Rows: {}", out.manifest.total_rows());
    eprintln!("  Duration: {}ms", out.manifest.duration_ms());
    eprintln!("  Analysis hash: {}", out.manifest.analysis_hash);
    Ok(())
}

fn validate_analysis(path: &Path) -> CliResult<()> {
    let parsed = load_yaml_analysis(path)?;
    parsed.config.apply_to(&LoopConfig::default())?;
    Ok(())
}

fn explain_analysis(path: &Path, overrides: &Overrides) -> CliResult<()> {
    let parsed = load_yaml_analysis(path)?;
    let config = layer_config(LoopConfig::from_env()?, &parsed.config, overrides)?;

    print!("{}", parsed.analysis.describe());
    println!("config:");
    println!("  luminosity: {}", config.luminosity());
    println!("  unit conversion: {}", config.unit_conversion());
    println!("  normalize to luminosity: {}", config.normalize_to_luminosity());
    match config.max_rows() {
        Some(n) => println!("  max rows per component: {n}"),
        None => println!("  max rows per component: unlimited"),
    }
    if config.parallel() {
        println!("  parallel: yes ({} tasks)", config.max_parallel_tasks());
    } else {
        println!("  parallel: no");
    }
    Ok(())
}

/// defaults < environment < analysis file < flags.
fn layer_config(base: LoopConfig, doc: &DslConfig, overrides: &Overrides) -> CliResult<LoopConfig> {
    let mut b = doc.apply_to(&base)?.to_builder();
    if let Some(n) = overrides.max_rows {
        b = b.max_rows(Some(n));
    }
    if overrides.parallel {
        b = b.parallel(true);
    }
    if let Some(n) = overrides.max_parallel {
        b = b.max_parallel_tasks(n);
    }
    if let Some(l) = overrides.luminosity {
        b = b.luminosity(l);
    }
    if overrides.no_normalize {
        b = b.normalize_to_luminosity(false);
    }
    Ok(b.build()?)
}

/// Owned running background totals, keyed like grid records.
struct StackedHist {
    sample: String,
    selection: String,
    variable: String,
    hist: HistogramAccumulator,
}

fn stacked_records(grid: &ResultGrid) -> Result<Vec<StackedHist>, FillError> {
    let mut out = Vec::new();
    for (s, selection) in grid.selection_names().iter().enumerate() {
        for (v, variable) in grid.variable_names().iter().enumerate() {
            for (name, hist) in grid.stack(SelectionId::new(s), VariableId::new(v))? {
                out.push(StackedHist {
                    sample: format!("stack:{name}"),
                    selection: selection.clone(),
                    variable: variable.clone(),
                    hist,
                });
            }
        }
    }
    Ok(out)
}

fn write_results(
    grid: &ResultGrid,
    stacked: &[StackedHist],
    format: OutputFormat,
    output: Option<&Path>,
) -> CliResult<()> {
    let records = grid.records().chain(stacked.iter().map(|h| HistogramRecord {
        sample: &h.sample,
        selection: &h.selection,
        variable: &h.variable,
        hist: &h.hist,
    }));
    match (format, output) {
        (OutputFormat::Json, Some(path)) => JsonWriter::to_path(path)?.write_all(records)?,
        (OutputFormat::Json, None) => JsonWriter::to_writer(io::stdout().lock()).write_all(records)?,
        (OutputFormat::Csv, Some(path)) => CsvWriter::to_path(path)?.write_all(records)?,
        (OutputFormat::Csv, None) => CsvWriter::to_writer(io::stdout().lock()).write_all(records)?,
    }
    Ok(())
}
