//! Pluggable destinations for report lines.
//!
//! Controllers emit rendered report lines through a `ReportSink` so the
//! destination (console, per-region file, test buffer) is a deployment
//! choice, not controller logic.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("report sink lock poisoned")]
    SinkPoisoned,
}

pub type ReportResult<T> = Result<T, ReportError>;

/// A destination for rendered report lines.
pub trait ReportSink: Send + Sync {
    fn emit(&self, line: &str) -> ReportResult<()>;
}

/// Writes report lines to stdout.
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn emit(&self, line: &str) -> ReportResult<()> {
        println!("{line}");
        Ok(())
    }
}

/// Appends report lines to a file, one per line.
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    /// Open (or create) the report file in append mode.
    pub fn open(path: &Path) -> ReportResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ReportSink for FileSink {
    fn emit(&self, line: &str) -> ReportResult<()> {
        let mut file = self.file.lock().map_err(|_| ReportError::SinkPoisoned)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// Collects report lines in memory; used by tests.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, line: &str) -> ReportResult<()> {
        self.lines
            .lock()
            .map_err(|_| ReportError::SinkPoisoned)?
            .push(line.to_string());
        Ok(())
    }
}
