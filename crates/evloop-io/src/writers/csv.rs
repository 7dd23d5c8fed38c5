//! Long-format CSV export: one row per histogram bin.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::HistogramRecord;
use crate::error::Result;

const HEADER: [&str; 8] = [
    "sample", "selection", "variable", "bin", "low", "high", "content", "error",
];

pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
    header_written: bool,
}

impl CsvWriter<File> {
    pub fn to_path(path: &Path) -> Result<Self> {
        Ok(Self::to_writer(File::create(path)?))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
            header_written: false,
        }
    }

    /// Append one histogram. Under/overflow are not exported.
    pub fn write_record(&mut self, record: &HistogramRecord<'_>) -> Result<()> {
        if !self.header_written {
            self.writer.write_record(HEADER)?;
            self.header_written = true;
        }
        let binning = record.hist.binning();
        for (i, content) in record.hist.contents().iter().enumerate() {
            let error = record.hist.bin_error(i).unwrap_or(0.0);
            self.writer.write_record(&[
                record.sample.to_string(),
                record.selection.to_string(),
                record.variable.to_string(),
                i.to_string(),
                binning.bin_low(i).to_string(),
                binning.bin_high(i).to_string(),
                content.to_string(),
                error.to_string(),
            ])?;
        }
        Ok(())
    }

    pub fn write_all<'a, I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = HistogramRecord<'a>>,
    {
        for record in records {
            self.write_record(&record)?;
        }
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
