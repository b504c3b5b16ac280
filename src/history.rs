//! Sample history snapshots
//!
//! A `History` is immutable once built. `SharedHistory` lets a poller swap
//! in a freshly loaded history while readers keep computing on the
//! snapshot they already hold.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

use crate::sample::Sample;

/// Samples ordered newest-first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    samples: Vec<Sample>,
}

impl History {
    /// Build a history from samples in any order
    pub fn new(mut samples: Vec<Sample>) -> Self {
        samples.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The current (newest) sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn newest_first(&self) -> &[Sample] {
        &self.samples
    }

    /// The `n` most recent samples, newest-first
    pub fn recent(&self, n: usize) -> &[Sample] {
        &self.samples[..n.min(self.samples.len())]
    }

    /// Samples in chart order
    pub fn oldest_first(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter().rev()
    }

    /// Samples taken at or after `cutoff`, newest-first
    pub fn since(&self, cutoff: DateTime<Utc>) -> &[Sample] {
        let end = self.samples.partition_point(|s| s.timestamp >= cutoff);
        &self.samples[..end]
    }

    /// Samples from the last `days` days before `now`.
    /// A window reaching past the representable time range covers everything.
    pub fn last_days(&self, now: DateTime<Utc>, days: i64) -> &[Sample] {
        match Duration::try_days(days).and_then(|d| now.checked_sub_signed(d)) {
            Some(cutoff) => self.since(cutoff),
            None => &self.samples,
        }
    }
}

/// Single-writer / multi-reader holder with swap-on-completion semantics
#[derive(Debug, Default)]
pub struct SharedHistory {
    current: RwLock<Arc<History>>,
}

impl SharedHistory {
    pub fn new(history: History) -> Self {
        Self { current: RwLock::new(Arc::new(history)) }
    }

    /// Get the current snapshot; it stays valid after a later `replace`
    pub fn snapshot(&self) -> Arc<History> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&*guard)
    }

    /// Publish a fully built history in one step
    pub fn replace(&self, history: History) {
        let fresh = Arc::new(history);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::Trend;
    use chrono::TimeZone;

    fn sample(epoch: i64, value: f64) -> Sample {
        Sample::new(value, Utc.timestamp_opt(epoch, 0).unwrap(), Trend::Flat).unwrap()
    }

    #[test]
    fn test_history_is_newest_first() {
        let history = History::new(vec![sample(100, 1.0), sample(300, 3.0), sample(200, 2.0)]);
        assert_eq!(history.latest().unwrap().value, 3.0);
        let chart: Vec<f64> = history.oldest_first().map(|s| s.value).collect();
        assert_eq!(chart, vec![1.0, 2.0, 3.0]);
        assert_eq!(history.recent(2).len(), 2);
        assert_eq!(history.recent(10).len(), 3);
    }

    #[test]
    fn test_since() {
        let history = History::new(vec![sample(100, 1.0), sample(300, 3.0), sample(200, 2.0)]);
        let cutoff = Utc.timestamp_opt(200, 0).unwrap();
        let values: Vec<f64> = history.since(cutoff).iter().map(|s| s.value).collect();
        assert_eq!(values, vec![3.0, 2.0]);
    }

    #[test]
    fn test_last_days() {
        let day = 86_400;
        let history = History::new(vec![sample(day, 1.0), sample(5 * day, 2.0), sample(6 * day, 3.0)]);
        let now = Utc.timestamp_opt(6 * day, 0).unwrap();

        assert_eq!(history.last_days(now, 2).len(), 2);
        assert_eq!(history.last_days(now, 10_000_000_000_000).len(), 3);
        assert_eq!(history.last_days(now, i64::MAX).len(), 3);
        assert!(History::default().last_days(Utc::now(), i64::MAX).is_empty());
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let shared = SharedHistory::new(History::new(vec![sample(100, 1.0)]));
        let before = shared.snapshot();
        shared.replace(History::new(vec![sample(200, 2.0), sample(300, 3.0)]));

        assert_eq!(before.len(), 1);
        assert_eq!(shared.snapshot().len(), 2);
    }
}
