//! Window aggregation for high-frequency samples.
//!
//! Readings arrive roughly once per second. Every time the window length
//! of wall-clock time has passed since the last flush, the finite readings
//! collected so far are averaged into one per-minute [`Sample`].

use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use corelib::{MinuteKey, Sample};

/// What a window without a single finite reading turns into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EmptyWindow {
    /// Emit 0.0.
    #[default]
    Zero,
    /// Repeat the last emitted value; nothing if there is none yet.
    CarryForward,
    /// Emit nothing; the next bucket spans the gap.
    Skip,
}

impl FromStr for EmptyWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(EmptyWindow::Zero),
            "carry" | "carry-forward" | "carry_forward" => Ok(EmptyWindow::CarryForward),
            "skip" => Ok(EmptyWindow::Skip),
            other => Err(format!(
                "unknown empty-window policy '{other}' (expected zero|carry-forward|skip)"
            )),
        }
    }
}

/// Counters for one closed window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WindowStats {
    pub sum: f64,
    pub valid: usize,
    pub rejected: usize,
}

impl WindowStats {
    pub fn mean(&self) -> Option<f64> {
        (self.valid > 0).then(|| self.sum / self.valid as f64)
    }
}

/// Running sum of finite readings. Non-finite readings are counted and dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowAccumulator {
    stats: WindowStats,
}

impl WindowAccumulator {
    /// Returns whether the reading was kept.
    pub fn push(&mut self, reading: f64) -> bool {
        if reading.is_finite() {
            self.stats.sum += reading;
            self.stats.valid += 1;
            true
        } else {
            self.stats.rejected += 1;
            false
        }
    }

    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, readings: I) {
        for r in readings {
            self.push(r);
        }
    }

    pub fn stats(&self) -> WindowStats {
        self.stats
    }

    /// Closes the window and starts an empty one.
    pub fn take(&mut self) -> WindowStats {
        std::mem::take(&mut self.stats)
    }
}

/// Result of closing one window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bucket {
    pub at: MinuteKey,
    pub stats: WindowStats,

    /// `None` when the window was empty and the policy produced nothing.
    pub sample: Option<Sample>,
}

/// Turns a stream of readings into per-window samples.
#[derive(Debug)]
pub struct MinuteBucketer {
    window: TimeDelta,
    last_flush: DateTime<Utc>,
    acc: WindowAccumulator,
    policy: EmptyWindow,
    last_value: Option<f64>,
}

impl MinuteBucketer {
    pub fn new(started_at: DateTime<Utc>, window: TimeDelta, policy: EmptyWindow) -> Self {
        Self {
            window,
            last_flush: started_at,
            acc: WindowAccumulator::default(),
            policy,
            last_value: None,
        }
    }

    pub fn push_readings<I: IntoIterator<Item = f64>>(&mut self, readings: I) {
        self.acc.extend(readings);
    }

    pub fn pending(&self) -> WindowStats {
        self.acc.stats()
    }

    /// Closes the window if it has run its full length by `now`.
    ///
    /// The bucket is keyed by the minute the window started in.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<Bucket> {
        if now - self.last_flush < self.window {
            return None;
        }

        let at = MinuteKey::floor(self.last_flush);
        let stats = self.acc.take();
        self.last_flush = now;

        let value = match (stats.mean(), self.policy) {
            (Some(mean), _) => Some(mean),
            (None, EmptyWindow::Zero) => Some(0.0),
            (None, EmptyWindow::CarryForward) => self.last_value,
            (None, EmptyWindow::Skip) => None,
        };

        if value.is_some() {
            self.last_value = value;
        }

        Some(Bucket {
            at,
            stats,
            sample: value.map(|v| Sample { value: v, at }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 5).unwrap()
    }

    fn secs(s: i64) -> DateTime<Utc> {
        t0() + TimeDelta::seconds(s)
    }

    #[test]
    fn nan_is_excluded_from_the_mean() {
        let mut acc = WindowAccumulator::default();
        acc.extend([1.0, 2.0, f64::NAN, 3.0]);

        let stats = acc.take();
        assert_eq!(stats.mean(), Some(2.0));
        assert_eq!(stats.valid, 3);
        assert_eq!(stats.rejected, 1);
        assert_eq!(acc.stats(), WindowStats::default());
    }

    #[test]
    fn flushes_only_after_full_window() {
        let mut b = MinuteBucketer::new(t0(), TimeDelta::seconds(60), EmptyWindow::Zero);
        b.push_readings([10.0, 20.0]);

        assert!(b.poll(secs(59)).is_none());

        let bucket = b.poll(secs(60)).unwrap();
        assert_eq!(bucket.at, MinuteKey::floor(t0()));
        assert_eq!(bucket.sample.unwrap().value, 15.0);
        assert_eq!(b.pending().valid, 0);

        // next window starts from the flush instant
        assert!(b.poll(secs(119)).is_none());
        assert!(b.poll(secs(120)).is_some());
    }

    #[test]
    fn mean_spans_whole_window_not_last_second() {
        let mut b = MinuteBucketer::new(t0(), TimeDelta::seconds(60), EmptyWindow::Zero);
        b.push_readings([0.0, 0.0]);
        b.push_readings([30.0]);

        let bucket = b.poll(secs(61)).unwrap();
        assert_eq!(bucket.sample.unwrap().value, 10.0);
    }

    #[test]
    fn empty_window_policies() {
        let run = |policy| {
            let mut b = MinuteBucketer::new(t0(), TimeDelta::seconds(60), policy);
            b.push_readings([4.0]);
            let first = b.poll(secs(60)).unwrap().sample.map(|s| s.value);
            b.push_readings([f64::NAN]);
            let second = b.poll(secs(120)).unwrap();
            (first, second.sample.map(|s| s.value), second.stats.rejected)
        };

        assert_eq!(run(EmptyWindow::Zero), (Some(4.0), Some(0.0), 1));
        assert_eq!(run(EmptyWindow::CarryForward), (Some(4.0), Some(4.0), 1));
        assert_eq!(run(EmptyWindow::Skip), (Some(4.0), None, 1));
    }

    #[test]
    fn carry_forward_without_history_emits_nothing() {
        let mut b = MinuteBucketer::new(t0(), TimeDelta::seconds(60), EmptyWindow::CarryForward);
        assert_eq!(b.poll(secs(60)).unwrap().sample, None);
    }

    #[test]
    fn policy_parses() {
        assert_eq!("zero".parse(), Ok(EmptyWindow::Zero));
        assert_eq!("Carry-Forward".parse(), Ok(EmptyWindow::CarryForward));
        assert_eq!("skip".parse(), Ok(EmptyWindow::Skip));
        assert!("drop".parse::<EmptyWindow>().is_err());
    }
}
