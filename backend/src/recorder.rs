//! Accept path shared by every mode:
//! sample → delta engine → sink (durable) → history → readout → summary line.

use corelib::{Record, RenderZone, Sample};
use engine::{DeltaEngine, EngineError, History};
use thiserror::Error;
use tracing::info;

use crate::preview::summary_line;
use crate::readout::ReadoutState;
use crate::sink::{PersistenceError, RecordSink};

#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub struct Recorder {
    engine: DeltaEngine,
    history: History,
    sink: Option<Box<dyn RecordSink>>,
    readout: ReadoutState,
    zone: RenderZone,
    echo: bool,
    accepted: usize,
}

impl Recorder {
    pub fn new(retention: usize, readout: ReadoutState, zone: RenderZone) -> Self {
        Self {
            engine: DeltaEngine::new(),
            history: History::new(retention),
            sink: None,
            readout,
            zone,
            echo: true,
            accepted: 0,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Print a summary line to stdout for every accepted record.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Accepts one sample. `Ok(None)` for a minute that is already recorded.
    ///
    /// The row is persisted before the record becomes visible to readers.
    pub fn record(&mut self, sample: Sample) -> Result<Option<Record>, RecordError> {
        let Some(record) = self.engine.ingest(sample)? else {
            return Ok(None);
        };

        if let Some(sink) = self.sink.as_mut() {
            sink.append(&record)?;
        }

        self.history.push(record.clone());
        self.readout.publish_record(&record);
        self.accepted += 1;

        info!(
            minute = %record.timestamp.render(self.zone),
            value = record.value,
            delta = record.delta,
            direction = %record.direction,
            velocity_per_minute = record.velocity_per_minute,
            "record accepted"
        );
        if self.echo {
            println!("{}", summary_line(&record, self.zone));
        }

        Ok(Some(record))
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Records accepted over the lifetime of this recorder.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn zone(&self) -> RenderZone {
        self.zone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::stop::stop_pair;
    use chrono::{TimeDelta, TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemorySink {
        rows: Arc<Mutex<Vec<Record>>>,
        fail: bool,
    }

    impl RecordSink for MemorySink {
        fn append(&mut self, record: &Record) -> Result<(), PersistenceError> {
            if self.fail {
                return Err(PersistenceError::Write {
                    path: "memory".into(),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.rows.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn sample(m: i64, v: f64) -> Sample {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Sample::new(v, base + TimeDelta::minutes(m))
    }

    fn recorder(sink: MemorySink) -> (Recorder, ReadoutState) {
        let (handle, _signal) = stop_pair();
        let readout = ReadoutState::new(handle);
        let rec = Recorder::new(2, readout.clone(), RenderZone::Utc)
            .with_sink(Box::new(sink))
            .with_echo(false);
        (rec, readout)
    }

    #[test]
    fn accepted_records_reach_sink_history_and_readout() {
        let sink = MemorySink::default();
        let (mut rec, readout) = recorder(sink.clone());

        for (m, v) in [(0, 1.0), (1, 2.0), (2, 4.0)] {
            rec.record(sample(m, v)).unwrap();
        }

        assert_eq!(sink.rows.lock().unwrap().len(), 3);
        assert_eq!(rec.history().len(), 2);
        assert_eq!(rec.accepted(), 3);
        assert_eq!(readout.record.get().unwrap().value, 4.0);
        assert_eq!(readout.records_accepted(), 3);
    }

    #[test]
    fn duplicates_touch_nothing() {
        let sink = MemorySink::default();
        let (mut rec, readout) = recorder(sink.clone());

        rec.record(sample(0, 1.0)).unwrap();
        assert!(rec.record(sample(0, 9.0)).unwrap().is_none());

        assert_eq!(sink.rows.lock().unwrap().len(), 1);
        assert_eq!(readout.record.get().unwrap().value, 1.0);
    }

    #[test]
    fn persistence_failure_is_surfaced_and_not_published() {
        let sink = MemorySink {
            fail: true,
            ..Default::default()
        };
        let (mut rec, readout) = recorder(sink);

        let err = rec.record(sample(0, 1.0)).unwrap_err();
        assert!(matches!(err, RecordError::Persistence(_)));
        assert!(readout.record.get().is_none());
        assert_eq!(rec.accepted(), 0);
    }

    #[test]
    fn invalid_sample_is_an_engine_error() {
        let (mut rec, _) = recorder(MemorySink::default());
        let err = rec.record(sample(0, f64::NAN)).unwrap_err();
        assert!(matches!(err, RecordError::Engine(EngineError::InvalidSample(_))));
    }
}
