use tracing::{info, warn};

use super::{BoardDriver, DeviceError, DeviceSessionError, EegChannel, EegFrame};

/// Options applied while opening a session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Sent right after `prepare_session`, e.g. `p61` for high-resolution mode.
    pub config_command: Option<String>,

    /// Ring-buffer size requested from the driver.
    pub buffer_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            config_command: Some("p61".to_string()),
            buffer_size: 45_000,
        }
    }
}

/// Scoped board session.
///
/// Dropping the session stops the stream and releases the board, including
/// after a partially failed `open`.
pub struct DeviceSession<D: BoardDriver> {
    driver: D,
    channels: Vec<EegChannel>,
    prepared: bool,
    streaming: bool,
}

impl<D: BoardDriver> DeviceSession<D> {
    pub fn open(driver: D, options: &SessionOptions) -> Result<Self, DeviceSessionError> {
        let channels = driver.eeg_channels();
        let mut session = Self {
            driver,
            channels,
            prepared: false,
            streaming: false,
        };

        session
            .driver
            .prepare_session()
            .map_err(|source| DeviceSessionError { stage: "prepare", source })?;
        session.prepared = true;

        if let Some(cmd) = &options.config_command {
            session
                .driver
                .config_board(cmd)
                .map_err(|source| DeviceSessionError { stage: "config", source })?;
        }

        session
            .driver
            .start_stream(options.buffer_size)
            .map_err(|source| DeviceSessionError { stage: "start", source })?;
        session.streaming = true;

        info!(
            channels = session.channels.len(),
            buffer_size = options.buffer_size,
            "device streaming started"
        );
        Ok(session)
    }

    pub fn channels(&self) -> &[EegChannel] {
        &self.channels
    }

    /// Reads the most recent samples of every EEG channel.
    pub fn read_latest(&mut self, n_samples: usize) -> Result<EegFrame, DeviceError> {
        if !self.streaming {
            return Err(DeviceError::NotStreaming);
        }

        let data = self.driver.current_board_data(n_samples)?;
        let channels = self
            .channels
            .iter()
            .map(|ch| {
                let values = data.get(ch.row).cloned().unwrap_or_default();
                (ch.name.clone(), values)
            })
            .collect();

        Ok(EegFrame { channels })
    }

    /// Stops and releases explicitly, surfacing driver errors.
    pub fn close(mut self) -> Result<(), DeviceSessionError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), DeviceSessionError> {
        let was_open = self.prepared || self.streaming;
        let mut first_err = None;

        if self.streaming {
            self.streaming = false;
            if let Err(source) = self.driver.stop_stream() {
                first_err = Some(DeviceSessionError { stage: "stop", source });
            }
        }

        if self.prepared {
            self.prepared = false;
            if let Err(source) = self.driver.release_session() {
                first_err.get_or_insert(DeviceSessionError { stage: "release", source });
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => {
                if was_open {
                    info!("device session released");
                }
                Ok(())
            }
        }
    }
}

impl<D: BoardDriver> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "device cleanup failed");
        }
    }
}
