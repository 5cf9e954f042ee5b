//! Live EEG relay: device sampler plus the per-minute channel-mean recorder.
//!
//! Both halves share one acquisition stop. Whichever half ends first stops
//! the other, so a fatal recorder error releases the board and surfaces
//! instead of waiting for an operator stop.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{Instrument, info, warn};

use super::clock::Clock;
use super::poll::{PollController, PollSettings};
use super::sampler::{SamplerSettings, run_sampler};
use super::stop::StopHandle;
use crate::device::{BoardDriver, DeviceSession};
use crate::error::AppError;
use crate::readout::ReadoutState;
use crate::recorder::Recorder;
use crate::source::ChannelMeanSource;
use common::logger::child_span;

#[derive(Clone, Debug)]
pub struct RelaySettings {
    pub sampler: SamplerSettings,
    pub poll: PollSettings,
    /// Longest wait for the first channel reading before polling starts.
    pub warmup: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            sampler: SamplerSettings::default(),
            poll: PollSettings::default(),
            warmup: Duration::from_secs(5),
        }
    }
}

pub struct RelayReport {
    /// Channel readings published by the sampler.
    pub published: u64,
    pub recorder: Recorder,
}

/// Runs the relay until `acquisition` is triggered or the recorder fails.
///
/// A recorder error is returned ahead of any sampler error.
pub async fn run_relay<D, C>(
    session: DeviceSession<D>,
    clock: C,
    recorder: Recorder,
    readout: ReadoutState,
    settings: RelaySettings,
    acquisition: StopHandle,
) -> Result<RelayReport, AppError>
where
    D: BoardDriver + 'static,
    C: Clock + Clone + 'static,
{
    let sampler = tokio::spawn(
        run_sampler(
            session,
            clock.clone(),
            readout.channels.clone(),
            settings.sampler.clone(),
            acquisition.signal(),
        )
        .instrument(child_span("sampler")),
    );

    wait_for_first_reading(&readout, &settings, &acquisition).await;

    let source = ChannelMeanSource::new(readout.channels.clone());
    let controller = PollController::new(source, clock, recorder, readout, settings.poll);
    let polled = controller
        .run(acquisition.signal())
        .instrument(child_span("poll"))
        .await;

    if let Err(e) = &polled {
        warn!(error = %e, "recorder failed, stopping acquisition");
    }
    acquisition.trigger();

    let sampled = sampler.await;
    let recorder = polled?;
    let published = sampled??;

    info!(published, accepted = recorder.accepted(), "acquisition stopped");
    Ok(RelayReport {
        published,
        recorder,
    })
}

async fn wait_for_first_reading(
    readout: &ReadoutState,
    settings: &RelaySettings,
    acquisition: &StopHandle,
) {
    let deadline = Instant::now() + settings.warmup;
    let mut stop = acquisition.signal();

    while readout.channels.is_empty() {
        if Instant::now() >= deadline {
            warn!(
                warmup_ms = settings.warmup.as_millis() as u64,
                "no channel reading yet, polling anyway"
            );
            return;
        }
        if !stop.sleep(settings.sampler.every).await {
            return;
        }
    }
}
