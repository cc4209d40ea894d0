//! Report sinks for benchmark records.

use crate::bench::BenchRecord;
use crate::error::{Error, Result};
use colored::Colorize;
use csv::Writer;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Column names of the CSV report, in order.
pub const HEADER: [&str; 9] = [
    "matrix_size",
    "block_size",
    "threads",
    "serial_seconds",
    "parallel_seconds",
    "speedup",
    "efficiency",
    "serial_count",
    "parallel_count",
];

/// Written in place of a count that could not be computed.
pub const FAILED_COUNT: i64 = -1;

/// Destination for sweep records.
pub trait ReportSink {
    fn write_record(&mut self, record: &BenchRecord) -> Result<()>;

    /// Flush buffered output once the sweep is over.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl ReportSink for Vec<BenchRecord> {
    fn write_record(&mut self, record: &BenchRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

// =============================================================================
// CSV
// =============================================================================

pub struct CsvReport<W: Write> {
    writer: Writer<W>,
}

impl CsvReport<File> {
    /// Create (or truncate) the report file and write the header.
    /// Role: open the only durable output of a sweep
    ///
    /// Failing to open the file is fatal for the whole run.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| Error::ReportUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_writer(file)
    }
}

impl<W: Write> CsvReport<W> {
    pub fn from_writer(inner: W) -> Result<Self> {
        let mut writer = Writer::from_writer(inner);
        writer.write_record(HEADER)?;
        Ok(CsvReport { writer })
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))
    }
}

impl<W: Write> ReportSink for CsvReport<W> {
    fn write_record(&mut self, record: &BenchRecord) -> Result<()> {
        self.writer.write_record(csv_fields(record))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn csv_fields(record: &BenchRecord) -> [String; 9] {
    [
        record.matrix_size.to_string(),
        record.block_size.to_string(),
        record.threads.to_string(),
        format!("{:.6}", record.serial_seconds),
        format!("{:.6}", record.parallel_seconds),
        format!("{:.6}", record.speedup),
        format!("{:.6}", record.efficiency),
        count_field(record.serial_count),
        count_field(record.parallel_count),
    ]
}

fn count_field(count: Option<u64>) -> String {
    count.map_or_else(|| FAILED_COUNT.to_string(), |c| c.to_string())
}

// =============================================================================
// Terminal
// =============================================================================

/// Human-readable, colored lines on any writer (stdout in the CLI).
pub struct TerminalReport<W: Write> {
    out: W,
}

impl TerminalReport<io::Stdout> {
    pub fn stdout() -> Self {
        TerminalReport { out: io::stdout() }
    }
}

impl<W: Write> TerminalReport<W> {
    pub fn new(out: W) -> Self {
        TerminalReport { out }
    }
}

impl<W: Write> ReportSink for TerminalReport<W> {
    fn write_record(&mut self, record: &BenchRecord) -> Result<()> {
        let config = format!(
            "{:>6} | block {:>5} | {:>2} threads",
            record.matrix_size, record.block_size, record.threads
        );

        let status = match (record.serial_count, record.parallel_count) {
            (Some(serial), Some(parallel)) if serial == parallel => {
                format!("{} primes", parallel).green()
            }
            (Some(serial), Some(parallel)) => {
                format!("MISMATCH serial={} parallel={}", serial, parallel).red().bold()
            }
            _ => "FAILED (allocation)".yellow(),
        };

        writeln!(
            self.out,
            "{} | serial {:.4}s | parallel {:.4}s | speedup {:.2} | eff {:.2} | {}",
            config.bold(),
            record.serial_seconds,
            record.parallel_seconds,
            record.speedup,
            record.efficiency,
            status
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
