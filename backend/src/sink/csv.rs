//! Append-only CSV sink.
//!
//! Layout (bit-exact):
//! `timestamp,value,delta,direction,velocity_per_minute,velocity_per_second`
//! with floats at four decimals, `\n` line endings and no quoting.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use corelib::{Record, RenderZone};
use tracing::{debug, info};

use super::{PersistenceError, RecordSink};

pub const HEADER: &str = "timestamp,value,delta,direction,velocity_per_minute,velocity_per_second";

/// Rendering of the delta/velocity fields on the first row of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FirstRow {
    /// Empty fields, so "no history" reads differently from "no change".
    #[default]
    Blank,
    /// `0.0000` like any other flat row.
    Zero,
}

impl FromStr for FirstRow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blank" | "empty" => Ok(FirstRow::Blank),
            "zero" => Ok(FirstRow::Zero),
            other => Err(format!("unknown first-row style '{other}' (expected blank|zero)")),
        }
    }
}

/// How an existing file is treated on open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SinkMode {
    /// Keep existing rows; write the header only for a new or empty file.
    #[default]
    Append,
    /// Start over with just the header.
    Truncate,
}

/// Renders one record as a complete CSV line, terminator included.
pub fn format_row(record: &Record, zone: RenderZone, first_row: FirstRow) -> String {
    let ts = record.timestamp.render(zone);

    if !record.has_previous && first_row == FirstRow::Blank {
        return format!("{ts},{:.4},,{},,\n", record.value, record.direction);
    }

    format!(
        "{ts},{:.4},{:.4},{},{:.4},{:.4}\n",
        record.value,
        record.delta,
        record.direction,
        record.velocity_per_minute,
        record.velocity_per_second
    )
}

pub struct CsvSink {
    path: PathBuf,
    file: File,
    zone: RenderZone,
    first_row: FirstRow,
    rows_written: u64,
}

impl CsvSink {
    pub fn open(
        path: impl AsRef<Path>,
        mode: SinkMode,
        zone: RenderZone,
        first_row: FirstRow,
    ) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| PersistenceError::Open {
            path: path.clone(),
            source,
        };

        let needs_header = match mode {
            SinkMode::Truncate => true,
            SinkMode::Append => std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true),
        };

        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            SinkMode::Append => options.append(true),
            SinkMode::Truncate => options.write(true).truncate(true),
        };
        let file = options.open(&path).map_err(open_err)?;

        let mut sink = Self {
            path,
            file,
            zone,
            first_row,
            rows_written: 0,
        };

        if needs_header {
            sink.write_line(&format!("{HEADER}\n"))?;
            debug!(path = %sink.path.display(), "csv header written");
        }

        info!(path = %sink.path.display(), ?mode, "csv sink opened");
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows appended by this handle.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn write_line(&mut self, line: &str) -> Result<(), PersistenceError> {
        let write_err = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };

        self.file.write_all(line.as_bytes()).map_err(write_err)?;
        self.file.flush().map_err(write_err)?;
        self.file.sync_data().map_err(write_err)
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &Record) -> Result<(), PersistenceError> {
        let line = format_row(record, self.zone, self.first_row);
        self.write_line(&line)?;
        self.rows_written += 1;
        Ok(())
    }
}
