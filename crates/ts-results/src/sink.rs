//! Streaming JSONL telemetry writer.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ts_sim::{SimError, SimResult, TelemetryRecord, TelemetrySink};

use crate::ResultsResult;

/// Appends one JSON line per telemetry record.
#[derive(Debug)]
pub struct JsonlTelemetrySink {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl JsonlTelemetrySink {
    pub fn create(path: &Path) -> ResultsResult<Self> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Flush buffered lines; returns the number of records written.
    pub fn finish(mut self) -> ResultsResult<u64> {
        self.writer.flush()?;
        Ok(self.records)
    }

    fn write_record(&mut self, record: &TelemetryRecord) -> ResultsResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }
}

impl TelemetrySink for JsonlTelemetrySink {
    fn emit(&mut self, _run_id: &str, record: &TelemetryRecord) -> SimResult<()> {
        self.write_record(record)
            .map_err(|e| SimError::Collaborator {
                message: format!("telemetry write to {} failed: {e}", self.path.display()),
            })
    }
}
