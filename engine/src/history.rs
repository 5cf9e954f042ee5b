use std::collections::VecDeque;

use corelib::Record;

/// Default number of records kept in memory.
pub const DEFAULT_RETENTION: usize = 100;

/// Bounded in-memory tail of the series.
///
/// Only the oldest in-memory entries are evicted; persisted rows are never
/// touched from here.
#[derive(Debug)]
pub struct History {
    entries: VecDeque<Record>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl History {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: Record) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(record);
    }

    pub fn latest(&self) -> Option<&Record> {
        self.entries.back()
    }

    pub fn oldest(&self) -> Option<&Record> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use corelib::Sample;

    fn rec(m: i64) -> Record {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + TimeDelta::minutes(m);
        Record::first(Sample::new(m as f64, at))
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut h = History::new(3);
        for m in 0..5 {
            h.push(rec(m));
        }

        assert_eq!(h.len(), 3);
        assert_eq!(h.oldest().unwrap().value, 2.0);
        assert_eq!(h.latest().unwrap().value, 4.0);
    }

    #[test]
    fn default_keeps_one_hundred() {
        let mut h = History::default();
        for m in 0..150 {
            h.push(rec(m));
        }

        assert_eq!(h.len(), DEFAULT_RETENTION);
        assert_eq!(h.oldest().unwrap().value, 50.0);
    }

    #[test]
    fn zero_capacity_still_holds_latest() {
        let mut h = History::new(0);
        h.push(rec(1));
        h.push(rec(2));

        assert_eq!(h.capacity(), 1);
        assert_eq!(h.latest().unwrap().value, 2.0);
    }
}
