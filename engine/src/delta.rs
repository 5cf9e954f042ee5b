//! Delta / velocity computation.
//!
//! Every accepted sample becomes exactly one [`Record`]:
//! - no previous record      → sentinel zeros, flat
//! - same minute as previous → nothing (duplicate suppression)
//! - later minute            → signed delta, |delta| / elapsed minutes

use corelib::{Direction, Record, Sample};
use tracing::debug;

use crate::error::EngineError;

/// Computes the record that follows `previous` for `sample`.
///
/// Returns `Ok(None)` when the sample falls in the minute already recorded.
pub fn next_record(sample: Sample, previous: Option<&Record>) -> Result<Option<Record>, EngineError> {
    if !sample.value.is_finite() {
        return Err(EngineError::InvalidSample(sample.value));
    }

    let Some(prev) = previous else {
        return Ok(Some(Record::first(sample)));
    };

    if sample.at < prev.timestamp {
        return Err(EngineError::OutOfOrder {
            previous: prev.timestamp,
            current: sample.at,
        });
    }

    if sample.at == prev.timestamp {
        return Ok(None);
    }

    let delta = sample.value - prev.value;
    let elapsed_minutes = sample.at.minutes_since(&prev.timestamp);
    let velocity_per_minute = delta.abs() / elapsed_minutes;

    if !delta.is_finite() || !velocity_per_minute.is_finite() {
        return Err(EngineError::NonFiniteChange {
            previous: prev.value,
            current: sample.value,
        });
    }

    let pct_change = if prev.value != 0.0 {
        Some(delta / prev.value * 100.0).filter(|p| p.is_finite())
    } else {
        None
    };

    Ok(Some(Record {
        timestamp: sample.at,
        value: sample.value,
        delta,
        direction: Direction::from_delta(delta),
        velocity_per_minute,
        velocity_per_second: velocity_per_minute / 60.0,
        pct_change,
        has_previous: true,
    }))
}

/// Holds the last accepted record of a session.
#[derive(Debug, Default)]
pub struct DeltaEngine {
    previous: Option<Record>,
}

impl DeltaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one sample. `Ok(None)` means "not new".
    pub fn ingest(&mut self, sample: Sample) -> Result<Option<Record>, EngineError> {
        let next = next_record(sample, self.previous.as_ref())?;

        match &next {
            Some(record) => {
                self.previous = Some(record.clone());
            }
            None => {
                debug!(minute = ?sample.at, "duplicate minute suppressed");
            }
        }

        Ok(next)
    }

    pub fn previous(&self) -> Option<&Record> {
        self.previous.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn minute(m: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() + TimeDelta::minutes(m)
    }

    fn sample(m: i64, v: f64) -> Sample {
        Sample::new(v, minute(m))
    }

    fn row(r: &Record) -> (f64, f64, Direction, String, String) {
        (
            r.value,
            r.delta,
            r.direction,
            format!("{:.4}", r.velocity_per_minute),
            format!("{:.4}", r.velocity_per_second),
        )
    }

    #[test]
    fn first_record_is_sentinel() {
        let r = next_record(sample(0, 123.45), None).unwrap().unwrap();

        assert_eq!(r.delta, 0.0);
        assert_eq!(r.direction, Direction::Flat);
        assert_eq!(r.velocity_per_minute, 0.0);
        assert_eq!(r.velocity_per_second, 0.0);
        assert!(!r.has_previous);
        assert_eq!(r.pct_change, None);
    }

    #[test]
    fn overflowing_change_is_rejected_and_keeps_previous() {
        let mut engine = DeltaEngine::new();
        engine.ingest(sample(0, -f64::MAX)).unwrap();

        let err = engine.ingest(sample(1, f64::MAX)).unwrap_err();
        assert!(matches!(err, EngineError::NonFiniteChange { .. }));
        assert_eq!(engine.previous().unwrap().value, -f64::MAX);

        let r = engine.ingest(sample(2, -f64::MAX / 2.0)).unwrap().unwrap();
        assert!(r.delta.is_finite());
        assert!(r.velocity_per_minute.is_finite());
    }

    #[test]
    fn tiny_baseline_drops_pct_instead_of_infinity() {
        let mut engine = DeltaEngine::new();
        engine.ingest(sample(0, f64::MIN_POSITIVE)).unwrap();

        let r = engine.ingest(sample(1, 1.0e300)).unwrap().unwrap();
        assert_eq!(r.pct_change, None);
    }

    #[test]
    fn reference_scenario() {
        let mut engine = DeltaEngine::new();
        let rows: Vec<_> = [(0, 100.0), (1, 105.0), (2, 105.0), (3, 95.0)]
            .into_iter()
            .map(|(m, v)| engine.ingest(sample(m, v)).unwrap().unwrap())
            .collect();

        assert_eq!(
            row(&rows[0]),
            (100.0, 0.0, Direction::Flat, "0.0000".into(), "0.0000".into())
        );
        assert_eq!(
            row(&rows[1]),
            (105.0, 5.0, Direction::Up, "5.0000".into(), "0.0833".into())
        );
        assert_eq!(
            row(&rows[2]),
            (105.0, 0.0, Direction::Flat, "0.0000".into(), "0.0000".into())
        );
        assert_eq!(
            row(&rows[3]),
            (95.0, -10.0, Direction::Down, "10.0000".into(), "0.1667".into())
        );

        // flat after a genuine comparison is not the "no history" sentinel
        assert!(rows[2].has_previous);
    }

    #[test]
    fn duplicate_minute_is_a_noop() {
        let mut engine = DeltaEngine::new();
        engine.ingest(sample(0, 100.0)).unwrap();

        let later_same_minute = Sample::new(250.0, minute(0) + TimeDelta::seconds(42));
        assert_eq!(engine.ingest(later_same_minute).unwrap(), None);
        assert_eq!(engine.previous().unwrap().value, 100.0);
    }

    #[test]
    fn velocity_divides_by_actual_gap() {
        let mut engine = DeltaEngine::new();
        engine.ingest(sample(1, 100.0)).unwrap();

        // minute 2 was missed
        let r = engine.ingest(sample(3, 110.0)).unwrap().unwrap();

        assert_eq!(r.delta, 10.0);
        assert_eq!(r.velocity_per_minute, 5.0);
        assert_eq!(r.velocity_per_second, 5.0 / 60.0);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut engine = DeltaEngine::new();
        engine.ingest(sample(0, 1.0)).unwrap();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = engine.ingest(sample(1, bad)).unwrap_err();
            assert!(matches!(err, EngineError::InvalidSample(_)));
        }
        assert_eq!(engine.previous().unwrap().value, 1.0);
    }

    #[test]
    fn earlier_minute_is_out_of_order() {
        let mut engine = DeltaEngine::new();
        engine.ingest(sample(5, 1.0)).unwrap();

        let err = engine.ingest(sample(4, 2.0)).unwrap_err();
        assert!(matches!(err, EngineError::OutOfOrder { .. }));
    }

    #[test]
    fn pct_change_skips_zero_baseline() {
        let mut engine = DeltaEngine::new();
        engine.ingest(sample(0, 0.0)).unwrap();
        let r = engine.ingest(sample(1, 5.0)).unwrap().unwrap();
        assert_eq!(r.pct_change, None);

        let r = engine.ingest(sample(2, 10.0)).unwrap().unwrap();
        assert_eq!(r.pct_change, Some(100.0));
    }
}
