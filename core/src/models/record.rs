use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Layout of the minute key in CSV rows and summary lines.
pub const MINUTE_FORMAT: &str = "%Y-%m-%d %H:%M:00";

/// Direction of a change relative to the previous record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,

    #[default]
    Flat,
}

impl Direction {
    /// `Flat` iff the delta is exactly zero.
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Direction::Up
        } else if delta < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Flat => "flat",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which clock face a minute key is rendered in. The key itself is always UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RenderZone {
    #[default]
    Local,
    Utc,
}

impl FromStr for RenderZone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(RenderZone::Local),
            "utc" => Ok(RenderZone::Utc),
            other => Err(format!("unknown timezone '{other}' (expected local|utc)")),
        }
    }
}

/// An instant truncated to the start of its minute.
///
/// This is the canonical time key of the series: two samples taken inside
/// the same minute share one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinuteKey(DateTime<Utc>);

impl MinuteKey {
    pub fn floor(at: DateTime<Utc>) -> Self {
        let secs = at.timestamp().rem_euclid(60);
        let nanos = i64::from(at.timestamp_subsec_nanos());
        Self(at - TimeDelta::seconds(secs) - TimeDelta::nanoseconds(nanos))
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    /// Start of the following minute.
    pub fn next(&self) -> Self {
        Self(self.0 + TimeDelta::minutes(1))
    }

    /// Whole minutes elapsed since `earlier`, as a float divisor.
    pub fn minutes_since(&self, earlier: &MinuteKey) -> f64 {
        (self.0 - earlier.0).num_seconds() as f64 / 60.0
    }

    pub fn render(&self, zone: RenderZone) -> String {
        match zone {
            RenderZone::Utc => self.0.format(MINUTE_FORMAT).to_string(),
            RenderZone::Local => self.0.with_timezone(&Local).format(MINUTE_FORMAT).to_string(),
        }
    }
}

impl From<DateTime<Utc>> for MinuteKey {
    fn from(at: DateTime<Utc>) -> Self {
        Self::floor(at)
    }
}

/// A scalar observation keyed by its floored minute.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub at: MinuteKey,
}

impl Sample {
    pub fn new(value: f64, at: DateTime<Utc>) -> Self {
        Self {
            value,
            at: MinuteKey::floor(at),
        }
    }
}

/// One persisted row of the series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: MinuteKey,
    pub value: f64,
    pub delta: f64,
    pub direction: Direction,
    pub velocity_per_minute: f64,
    pub velocity_per_second: f64,

    /// Percent change versus the previous value. `None` when there is no
    /// previous record or the previous value was zero.
    pub pct_change: Option<f64>,

    /// False only for the first record of a session.
    pub has_previous: bool,
}

impl Record {
    /// The "no history" record: zero delta and velocity, flat direction.
    pub fn first(sample: Sample) -> Self {
        Self {
            timestamp: sample.at,
            value: sample.value,
            delta: 0.0,
            direction: Direction::Flat,
            velocity_per_minute: 0.0,
            velocity_per_second: 0.0,
            pct_change: None,
            has_previous: false,
        }
    }
}
