//! # Telemetry Module
//!
//! Handles telemetry logging to JSONL files with rotation.
//!
//! This module handles:
//! - Receiving decoded records from the frame engine
//! - Formatting as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Managing file rotation (max N records per file)
//! - Retaining only last M files
//!
//! The logger sits behind an unbounded channel; the engine pushes records
//! and never blocks on the sink.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::error::Result;
use crate::imu::protocol::ImuRecord;

/// JSONL record sink with file rotation
///
/// Each record becomes one JSON line carrying an ISO-8601 capture
/// timestamp and the record fields. A new file is started every
/// `max_records_per_file` records; only the newest `max_files_to_keep`
/// files are retained.
pub struct JsonlLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_seq: u64,
}

impl JsonlLogger {
    /// Create a logger writing under `dir`, creating it if needed
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory for the JSONL files
    /// * `max_records_per_file` - Records before rotating to a new file
    /// * `max_files_to_keep` - Newest files retained after rotation
    pub fn new<P: AsRef<Path>>(
        dir: P,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            max_records_per_file: max_records_per_file.max(1),
            max_files_to_keep: max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    /// Append one record as a JSON line, rotating files as configured
    pub fn log(&mut self, record: &ImuRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::json!({
            "ts": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "record": record,
        });

        // rotate() always installs a writer
        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, &line)?;
            writer.write_all(b"\n")?;
            self.records_in_file += 1;
        }

        Ok(())
    }

    /// Flush any buffered output to disk
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.file_seq += 1;
        let name = format!(
            "imu-{}-{:04}.jsonl",
            Utc::now().format("%Y%m%d-%H%M%S"),
            self.file_seq
        );
        let file = File::create(self.dir.join(&name))?;
        debug!("Rotated telemetry log to {}", name);

        self.writer = Some(BufWriter::new(file));
        self.records_in_file = 0;

        self.prune()
    }

    /// Remove the oldest files beyond the retention limit.
    ///
    /// File names sort chronologically (timestamp then sequence number).
    fn prune(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map_or(false, |ext| ext == "jsonl"))
            .collect();
        files.sort();

        while files.len() > self.max_files_to_keep {
            let oldest = files.remove(0);
            debug!("Pruning old telemetry log {:?}", oldest);
            fs::remove_file(oldest)?;
        }

        Ok(())
    }
}

/// Drain the record channel into the logger until the sender side closes
///
/// Logging failures are reported and skipped; a flaky disk must not take
/// down the decode loop.
pub async fn run_sink(mut rx: UnboundedReceiver<ImuRecord>, mut logger: JsonlLogger) {
    while let Some(record) = rx.recv().await {
        if let Err(e) = logger.log(&record) {
            warn!("Failed to log record: {}", e);
        }
    }

    if let Err(e) = logger.flush() {
        warn!("Failed to flush telemetry log: {}", e);
    }
    debug!("Telemetry sink stopped");
}
