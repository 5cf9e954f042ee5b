//! Aggregate-then-bucket summarizer.
//!
//! Reads the device once per `read_every`, averages every finite EEG value
//! of each window into one per-minute sample, and stops once `minutes`
//! windows have closed (or on an external stop). A window still open at an
//! early stop is dropped.

use std::time::Duration;

use chrono::TimeDelta;
use corelib::Record;
use engine::{Cadence, CadencePhase, EmptyWindow, MinuteBucketer};
use tracing::{info, warn};

use super::clock::Clock;
use super::stop::StopSignal;
use crate::device::{BoardDriver, DeviceSession};
use crate::error::AppError;
use crate::readout::ReadoutState;
use crate::recorder::{RecordError, Recorder};

/// Minimum records needed for a summary to carry any change information.
pub const MIN_SUMMARY_RECORDS: usize = 2;

#[derive(Clone, Debug)]
pub struct SummarySettings {
    /// Run length in minutes, i.e. the number of windows to close.
    pub minutes: u32,
    pub read_every: Duration,
    pub window: TimeDelta,
    pub n_samples: usize,
    pub empty_window: EmptyWindow,
    /// Records kept for the preview table.
    pub preview_rows: usize,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            minutes: 1,
            read_every: Duration::from_secs(1),
            window: TimeDelta::seconds(60),
            n_samples: 256,
            empty_window: EmptyWindow::Zero,
            preview_rows: 5,
        }
    }
}

#[derive(Debug)]
pub struct SummaryReport {
    /// Records accepted during the run.
    pub total: usize,
    /// First `preview_rows` records.
    pub head: Vec<Record>,
    /// Windows that produced no sample under the empty-window policy.
    pub skipped_windows: usize,
    /// Non-finite readings dropped across all windows.
    pub rejected_readings: usize,
}

pub async fn run_summary<D, C>(
    mut session: DeviceSession<D>,
    clock: C,
    mut recorder: Recorder,
    readout: ReadoutState,
    settings: SummarySettings,
    mut stop: StopSignal,
) -> Result<SummaryReport, AppError>
where
    D: BoardDriver,
    C: Clock,
{
    let mut bucketer = MinuteBucketer::new(clock.now(), settings.window, settings.empty_window);
    let mut windows_closed = 0u32;
    let mut cadence = Cadence::new();
    let mut report = SummaryReport {
        total: 0,
        head: Vec::with_capacity(settings.preview_rows),
        skipped_windows: 0,
        rejected_readings: 0,
    };

    cadence.advance(CadencePhase::Aggregating)?;
    readout.publish_phase(CadencePhase::Aggregating);
    info!(minutes = settings.minutes, policy = ?settings.empty_window, "summary run started");

    loop {
        if !stop.sleep(settings.read_every).await {
            info!("summary run stopped early");
            break;
        }

        let now = clock.now();

        match session.read_latest(settings.n_samples) {
            Ok(frame) => bucketer.push_readings(frame.values()),
            Err(e) => warn!(error = %e, "device read failed"),
        }

        if let Some(bucket) = bucketer.poll(now) {
            windows_closed += 1;
            report.rejected_readings += bucket.stats.rejected;

            match bucket.sample {
                Some(sample) => {
                    if bucket.stats.valid == 0 {
                        warn!(minute = ?bucket.at, value = sample.value, "window had no finite readings, filled by policy");
                    }
                    match recorder.record(sample) {
                        Ok(Some(record)) => {
                            if report.head.len() < settings.preview_rows {
                                report.head.push(record);
                            }
                        }
                        Ok(None) => {}
                        Err(RecordError::Engine(e)) => warn!(error = %e, "bucket discarded"),
                        Err(RecordError::Persistence(e)) => return Err(e.into()),
                    }
                }
                None => {
                    report.skipped_windows += 1;
                    warn!(minute = ?bucket.at, "window had no finite readings, no sample emitted");
                }
            }
        }

        if windows_closed >= settings.minutes {
            break;
        }
    }

    cadence.advance(CadencePhase::ShuttingDown)?;
    readout.publish_phase(CadencePhase::ShuttingDown);
    session.close()?;

    report.total = recorder.accepted();
    info!(
        total = report.total,
        skipped = report.skipped_windows,
        rejected = report.rejected_readings,
        "summary run finished"
    );

    if report.total < MIN_SUMMARY_RECORDS {
        return Err(AppError::InsufficientData {
            got: report.total,
            need: MIN_SUMMARY_RECORDS,
        });
    }

    Ok(report)
}
