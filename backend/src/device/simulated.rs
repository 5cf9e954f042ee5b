use std::f64::consts::TAU;
use std::time::Instant;

use tracing::debug;

use super::{BoardData, BoardDriver, DeviceError, EegChannel};

/// Channel names in board-row order (rows 1..=4).
pub const MUSE_CHANNELS: [&str; 4] = ["TP9", "AF7", "AF8", "TP10"];

const PACKAGE_ROW: usize = 0;
const TIMESTAMP_ROW: usize = 5;
const ROWS: usize = 6;

/// Synthetic four-channel headset.
///
/// Each channel is a 10 Hz alpha-like wave of ±40 µV on top of a slow
/// five-minute drift, so per-minute means actually move.
pub struct SimulatedBoard {
    sample_rate: u32,
    buffer_size: usize,
    started: Option<Instant>,
    prepared: bool,
}

impl SimulatedBoard {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            buffer_size: 0,
            started: None,
            prepared: false,
        }
    }

    /// Muse-style board at 256 Hz.
    pub fn muse() -> Self {
        Self::new(256)
    }

    fn sample(&self, channel: usize, index: u64) -> f64 {
        let t = index as f64 / f64::from(self.sample_rate);
        40.0 * (TAU * 10.0 * t + channel as f64).sin() + 15.0 * (TAU * t / 300.0).sin()
    }

    fn fail(op: &'static str, reason: &str) -> DeviceError {
        DeviceError::Driver {
            op,
            reason: reason.to_string(),
        }
    }
}

impl BoardDriver for SimulatedBoard {
    fn eeg_channels(&self) -> Vec<EegChannel> {
        MUSE_CHANNELS
            .iter()
            .enumerate()
            .map(|(i, name)| EegChannel::new(*name, i + 1))
            .collect()
    }

    fn prepare_session(&mut self) -> Result<(), DeviceError> {
        if self.prepared {
            return Err(Self::fail("prepare_session", "session already prepared"));
        }
        self.prepared = true;
        Ok(())
    }

    fn config_board(&mut self, command: &str) -> Result<(), DeviceError> {
        if !self.prepared {
            return Err(Self::fail("config_board", "session not prepared"));
        }
        debug!(command, "simulated board config accepted");
        Ok(())
    }

    fn start_stream(&mut self, buffer_size: usize) -> Result<(), DeviceError> {
        if !self.prepared {
            return Err(Self::fail("start_stream", "session not prepared"));
        }
        self.buffer_size = buffer_size.max(1);
        self.started = Some(Instant::now());
        Ok(())
    }

    fn current_board_data(&mut self, n_samples: usize) -> Result<BoardData, DeviceError> {
        let started = self.started.ok_or(DeviceError::NotStreaming)?;

        let produced = (started.elapsed().as_secs_f64() * f64::from(self.sample_rate)) as u64;
        let available = produced.min(self.buffer_size as u64);
        let take = (n_samples as u64).min(available);
        let first = produced - take;

        let mut data: BoardData = vec![Vec::with_capacity(take as usize); ROWS];
        for index in first..produced {
            data[PACKAGE_ROW].push((index % 256) as f64);
            for channel in 0..MUSE_CHANNELS.len() {
                data[channel + 1].push(self.sample(channel, index));
            }
            data[TIMESTAMP_ROW].push(index as f64 / f64::from(self.sample_rate));
        }

        Ok(data)
    }

    fn stop_stream(&mut self) -> Result<(), DeviceError> {
        if self.started.take().is_none() {
            return Err(Self::fail("stop_stream", "stream not started"));
        }
        Ok(())
    }

    fn release_session(&mut self) -> Result<(), DeviceError> {
        if !self.prepared {
            return Err(Self::fail("release_session", "session not prepared"));
        }
        self.prepared = false;
        self.started = None;
        Ok(())
    }
}
