use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest per-channel values from a device, keyed by channel name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelReading {
    pub at: DateTime<Utc>,
    pub channels: BTreeMap<String, f64>,
}

impl ChannelReading {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            channels: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.channels.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Mean of the finite channel values, `None` if there are none.
    pub fn mean(&self) -> Option<f64> {
        let (sum, n) = self
            .channels
            .values()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));

        (n > 0).then(|| sum / n as f64)
    }
}
