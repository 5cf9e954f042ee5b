pub mod http;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use corelib::{ChannelReading, Record};
use engine::CadencePhase;
use parking_lot::RwLock;

use crate::runner::stop::StopHandle;

pub use http::{ReadoutError, router, serve};

/// Single-writer / multi-reader cell holding the most recent value.
///
/// Both sides hold the lock only to swap or clone; readers never see a
/// reference into the slot.
#[derive(Debug)]
pub struct LatestSlot<T> {
    inner: Arc<RwLock<Option<T>>>,
}

impl<T> Clone for LatestSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
        }
    }
}

impl<T: Clone> LatestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins.
    pub fn set(&self, value: T) {
        *self.inner.write() = Some(value);
    }

    /// `None` until the first write.
    pub fn get(&self) -> Option<T> {
        self.inner.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_none()
    }
}

/// Everything the live readout can see.
#[derive(Clone)]
pub struct ReadoutState {
    pub record: LatestSlot<Record>,
    pub channels: LatestSlot<ChannelReading>,
    pub phase: LatestSlot<CadencePhase>,
    records: Arc<AtomicU64>,
    stop: StopHandle,
}

impl ReadoutState {
    pub fn new(stop: StopHandle) -> Self {
        Self {
            record: LatestSlot::new(),
            channels: LatestSlot::new(),
            phase: LatestSlot::new(),
            records: Arc::new(AtomicU64::new(0)),
            stop,
        }
    }

    pub fn publish_record(&self, record: &Record) {
        self.record.set(record.clone());
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn publish_phase(&self, phase: CadencePhase) {
        self.phase.set(phase);
    }

    /// Records accepted during this run.
    pub fn records_accepted(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    pub fn current_phase(&self) -> CadencePhase {
        self.phase.get().unwrap_or_default()
    }

    pub fn request_stop(&self) {
        self.stop.trigger();
    }
}
