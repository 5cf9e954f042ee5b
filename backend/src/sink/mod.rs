pub mod csv;

use std::path::PathBuf;

use corelib::Record;
use thiserror::Error;

pub use csv::{CsvSink, FirstRow, HEADER, SinkMode, format_row};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable destination for accepted records. Single writer.
pub trait RecordSink: Send {
    /// Appends one record. A row is either fully written or not at all.
    fn append(&mut self, record: &Record) -> Result<(), PersistenceError>;
}
