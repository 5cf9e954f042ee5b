use async_trait::async_trait;
use corelib::ChannelReading;

use super::{FetchError, SampleSource};
use crate::readout::LatestSlot;

/// Mean of the latest device channel values, as published by the sampler.
#[derive(Clone)]
pub struct ChannelMeanSource {
    slot: LatestSlot<ChannelReading>,
}

impl ChannelMeanSource {
    pub fn new(slot: LatestSlot<ChannelReading>) -> Self {
        Self { slot }
    }
}

#[async_trait]
impl SampleSource for ChannelMeanSource {
    fn name(&self) -> &str {
        "channel-mean"
    }

    async fn fetch(&self) -> Result<f64, FetchError> {
        let reading = self
            .slot
            .get()
            .ok_or(FetchError::NoData("no channel reading yet"))?;

        reading
            .mean()
            .ok_or(FetchError::NoData("no finite channel values"))
    }
}
