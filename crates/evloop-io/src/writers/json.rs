//! Pretty-printed JSON export of a set of histograms.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use evloop_core::hist::Binning;

use super::HistogramRecord;
use crate::error::Result;

#[derive(Serialize)]
struct JsonHistogram<'a> {
    sample: &'a str,
    selection: &'a str,
    variable: &'a str,
    binning: Binning,
    contents: &'a [f64],
    sumw2: &'a [f64],
    underflow: f64,
    overflow: f64,
    entries: u64,
    integral: f64,
}

pub struct JsonWriter<W: Write> {
    writer: BufWriter<W>,
}

impl JsonWriter<File> {
    pub fn to_path(path: &Path) -> Result<Self> {
        let f = File::create(path)?;
        Ok(Self::to_writer(f))
    }
}

impl<W: Write> JsonWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Write all records as one JSON array.
    pub fn write_all<'a, I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = HistogramRecord<'a>>,
    {
        let rows: Vec<JsonHistogram<'a>> = records
            .into_iter()
            .map(|r| JsonHistogram {
                sample: r.sample,
                selection: r.selection,
                variable: r.variable,
                binning: *r.hist.binning(),
                contents: r.hist.contents(),
                sumw2: r.hist.sumw2(),
                underflow: r.hist.underflow(),
                overflow: r.hist.overflow(),
                entries: r.hist.entries(),
                integral: r.hist.integral(),
            })
            .collect();
        serde_json::to_writer_pretty(&mut self.writer, &rows)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
