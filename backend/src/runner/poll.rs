//! Poll-and-floor controller.
//!
//! Each iteration fetches once, floors the fetch instant to its minute and
//! hands the value to the recorder, then sleeps to the next wall-clock
//! minute. A failed fetch produces no record and waits the backoff instead.

use std::time::Duration;

use common::logger::warn_if_slow;
use corelib::{Record, Sample};
use engine::{Cadence, CadencePhase, until_next_minute};
use tracing::{error, info, warn};

use super::clock::Clock;
use super::stop::StopSignal;
use crate::readout::ReadoutState;
use crate::recorder::{RecordError, Recorder};
use crate::source::SampleSource;

#[derive(Clone, Debug)]
pub struct PollSettings {
    pub backoff: Duration,
    pub slow_fetch: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(60),
            slow_fetch: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Recorded(Record),
    /// The minute already has a record.
    Duplicate,
    /// The value was rejected (non-finite, or the clock went backwards).
    Discarded,
    FetchFailed,
}

pub struct PollController<S, C> {
    source: S,
    clock: C,
    recorder: Recorder,
    readout: ReadoutState,
    cadence: Cadence,
    settings: PollSettings,
}

impl<S: SampleSource, C: Clock> PollController<S, C> {
    pub fn new(
        source: S,
        clock: C,
        recorder: Recorder,
        readout: ReadoutState,
        settings: PollSettings,
    ) -> Self {
        Self {
            source,
            clock,
            recorder,
            readout,
            cadence: Cadence::new(),
            settings,
        }
    }

    pub fn phase(&self) -> CadencePhase {
        self.cadence.phase()
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    fn enter(&mut self, phase: CadencePhase) {
        match self.cadence.advance(phase) {
            Ok(_) => self.readout.publish_phase(phase),
            Err(e) => error!(error = %e, "cadence transition rejected"),
        }
    }

    /// One fetch → record step. Only persistence failures are returned as errors.
    pub async fn tick(&mut self) -> Result<TickOutcome, RecordError> {
        self.enter(CadencePhase::Fetching);
        let fetched_at = self.clock.now();

        let fetched = warn_if_slow("fetch", self.settings.slow_fetch, self.source.fetch()).await;

        let value = match fetched {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    error = %e,
                    retry_in_secs = self.settings.backoff.as_secs(),
                    "fetch failed, backing off"
                );
                self.enter(CadencePhase::Backoff);
                return Ok(TickOutcome::FetchFailed);
            }
        };

        let outcome = match self.recorder.record(Sample::new(value, fetched_at)) {
            Ok(Some(record)) => TickOutcome::Recorded(record),
            Ok(None) => TickOutcome::Duplicate,
            Err(RecordError::Engine(e)) => {
                warn!(source = self.source.name(), error = %e, "sample discarded");
                TickOutcome::Discarded
            }
            Err(e @ RecordError::Persistence(_)) => return Err(e),
        };

        self.enter(CadencePhase::Idle);
        Ok(outcome)
    }

    /// Runs until `stop` fires. The signal is checked between iterations and
    /// while waiting, never during a fetch.
    pub async fn run(mut self, mut stop: StopSignal) -> Result<Recorder, RecordError> {
        info!(
            source = self.source.name(),
            backoff_secs = self.settings.backoff.as_secs(),
            "poll loop started"
        );

        while !stop.is_stopped() {
            let outcome = match self.tick().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.enter(CadencePhase::ShuttingDown);
                    return Err(e);
                }
            };

            let wait = match outcome {
                TickOutcome::FetchFailed => self.settings.backoff,
                _ => until_next_minute(self.clock.now()),
            };

            if !stop.sleep(wait).await {
                break;
            }
        }

        self.enter(CadencePhase::ShuttingDown);
        info!(
            accepted = self.recorder.accepted(),
            "poll loop stopped"
        );
        Ok(self.recorder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::clock::TokioClock;
    use crate::runner::stop::{StopHandle, stop_pair};
    use crate::source::FetchError;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use corelib::{Direction, RenderZone};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Replays scripted results, then stops the loop.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<f64, FetchError>>>,
        stop: StopHandle,
    }

    impl ScriptedSource {
        fn new(stop: StopHandle, script: Vec<Result<f64, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                stop,
            }
        }
    }

    #[async_trait]
    impl SampleSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn fetch(&self) -> Result<f64, FetchError> {
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| {
                self.stop.trigger();
                Err(FetchError::NoData("script exhausted"))
            })
        }
    }

    fn controller(
        script: Vec<Result<f64, FetchError>>,
    ) -> (PollController<ScriptedSource, TokioClock>, ReadoutState, StopSignal) {
        let (handle, signal) = stop_pair();
        let readout = ReadoutState::new(handle.clone());
        let recorder = Recorder::new(10, readout.clone(), RenderZone::Utc).with_echo(false);
        let clock = TokioClock::starting_at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 30).unwrap());
        let source = ScriptedSource::new(handle, script);

        let ctl = PollController::new(source, clock, recorder, readout.clone(), PollSettings::default());
        (ctl, readout, signal)
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_backs_off_and_velocity_spans_the_gap() {
        let (ctl, readout, signal) = controller(vec![
            Ok(100.0),
            Err(FetchError::InvalidResponse("rate limited".into())),
            Ok(110.0),
        ]);

        let recorder = ctl.run(signal).await.unwrap();
        let records: Vec<_> = recorder.history().iter().cloned().collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp.render(RenderZone::Utc), "2025-06-01 12:00:00");
        // 12:00:30 → aligned 12:01:00 (failed) → backoff 60 s → 12:02:00
        assert_eq!(records[1].timestamp.render(RenderZone::Utc), "2025-06-01 12:02:00");
        assert_eq!(records[1].delta, 10.0);
        assert_eq!(records[1].direction, Direction::Up);
        assert_eq!(records[1].velocity_per_minute, 5.0);

        assert_eq!(readout.current_phase(), CadencePhase::ShuttingDown);
        assert_eq!(readout.records_accepted(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_finite_value_is_discarded_without_backoff() {
        let (mut ctl, _readout, _signal) = controller(vec![Ok(f64::NAN), Ok(1.0)]);

        assert_eq!(ctl.tick().await.unwrap(), TickOutcome::Discarded);
        assert_eq!(ctl.phase(), CadencePhase::Idle);
        assert!(matches!(ctl.tick().await.unwrap(), TickOutcome::Recorded(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn same_minute_fetch_is_a_duplicate() {
        let (mut ctl, _readout, _signal) = controller(vec![Ok(1.0), Ok(2.0)]);

        assert!(matches!(ctl.tick().await.unwrap(), TickOutcome::Recorded(_)));
        assert_eq!(ctl.tick().await.unwrap(), TickOutcome::Duplicate);
        assert_eq!(ctl.recorder().accepted(), 1);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn fetch_failure_is_logged_and_enters_backoff() {
        let (mut ctl, _readout, _signal) =
            controller(vec![Err(FetchError::InvalidResponse("bad body".into()))]);

        assert_eq!(ctl.tick().await.unwrap(), TickOutcome::FetchFailed);
        assert_eq!(ctl.phase(), CadencePhase::Backoff);
        assert!(logs_contain("fetch failed, backing off"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_before_start_records_nothing() {
        let (ctl, _readout, signal) = controller(vec![Ok(1.0)]);
        ctl.readout.request_stop();

        let recorder = ctl.run(signal).await.unwrap();
        assert_eq!(recorder.accepted(), 0);
    }
}
