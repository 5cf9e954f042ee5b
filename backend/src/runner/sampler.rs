//! Live relay sampler: keeps the latest channel reading fresh.

use std::time::Duration;

use corelib::ChannelReading;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::stop::StopSignal;
use crate::device::{BoardDriver, DeviceSession, DeviceSessionError};
use crate::readout::LatestSlot;

#[derive(Clone, Debug)]
pub struct SamplerSettings {
    pub every: Duration,
    pub n_samples: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            every: Duration::from_millis(100),
            n_samples: 1,
        }
    }
}

/// Polls the session until `stop` fires, then closes it.
///
/// Returns how many readings were published.
pub async fn run_sampler<D, C>(
    mut session: DeviceSession<D>,
    clock: C,
    slot: LatestSlot<ChannelReading>,
    settings: SamplerSettings,
    mut stop: StopSignal,
) -> Result<u64, DeviceSessionError>
where
    D: BoardDriver,
    C: Clock,
{
    let mut ticker = interval(settings.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        every_ms = settings.every.as_millis() as u64,
        channels = session.channels().len(),
        "sampler started"
    );

    let mut published = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.stopped() => break,
        }

        match session.read_latest(settings.n_samples) {
            Ok(frame) => match frame.latest_reading(clock.now()) {
                Some(reading) => {
                    slot.set(reading);
                    published += 1;
                }
                None => debug!("device returned no samples"),
            },
            Err(e) => warn!(error = %e, "device read failed"),
        }
    }

    session.close()?;
    info!(published, "sampler stopped");
    Ok(published)
}
