//! Acquisition device seam.
//!
//! The driver trait mirrors the usual board SDK lifecycle:
//! prepare → (config) → start stream → read … → stop stream → release.
//! [`DeviceSession`] owns that lifecycle so every exit path releases the board.

pub mod session;
pub mod simulated;

use chrono::{DateTime, Utc};
use corelib::ChannelReading;
use thiserror::Error;

pub use session::{DeviceSession, SessionOptions};
pub use simulated::SimulatedBoard;

/// Board data: one row per channel index, one column per sample.
pub type BoardData = Vec<Vec<f64>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("{op} failed: {reason}")]
    Driver { op: &'static str, reason: String },

    #[error("board is not streaming")]
    NotStreaming,
}

/// Fatal failure while opening or closing a session.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("device session failed during {stage}: {source}")]
pub struct DeviceSessionError {
    pub stage: &'static str,
    #[source]
    pub source: DeviceError,
}

/// An EEG channel and the board-data row it lives in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EegChannel {
    pub name: String,
    pub row: usize,
}

impl EegChannel {
    pub fn new(name: impl Into<String>, row: usize) -> Self {
        Self {
            name: name.into(),
            row,
        }
    }
}

pub trait BoardDriver: Send {
    fn eeg_channels(&self) -> Vec<EegChannel>;

    fn prepare_session(&mut self) -> Result<(), DeviceError>;

    fn config_board(&mut self, command: &str) -> Result<(), DeviceError>;

    fn start_stream(&mut self, buffer_size: usize) -> Result<(), DeviceError>;

    /// Up to the `n_samples` most recent samples; may be empty.
    fn current_board_data(&mut self, n_samples: usize) -> Result<BoardData, DeviceError>;

    fn stop_stream(&mut self) -> Result<(), DeviceError>;

    fn release_session(&mut self) -> Result<(), DeviceError>;
}

/// Named per-channel series cut out of one board read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EegFrame {
    pub channels: Vec<(String, Vec<f64>)>,
}

impl EegFrame {
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(|(_, v)| v.is_empty())
    }

    /// Every value of every channel, in channel order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.channels.iter().flat_map(|(_, v)| v.iter().copied())
    }

    /// Most recent value per channel. `None` if the frame is empty.
    pub fn latest_reading(&self, at: DateTime<Utc>) -> Option<ChannelReading> {
        let mut reading = ChannelReading::new(at);
        for (name, values) in &self.channels {
            if let Some(last) = values.last() {
                reading.insert(name.clone(), *last);
            }
        }
        (!reading.is_empty()).then_some(reading)
    }
}
