//! In-memory histogram of sheet fetch durations.
//! Covers the whole logical fetch, retries and backoff waits included.

use std::sync::Mutex;
use std::time::Duration;

/// Shared fetch latency stats. Fetch client records, API reads.
/// Values stored in milliseconds.
pub struct FetchLatency {
    inner: Mutex<Option<hdrhistogram::Histogram<u64>>>,
}

impl FetchLatency {
    /// Tracks 1ms up to one hour, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 3_600_000, 3).ok();
        Self {
            inner: Mutex::new(histogram),
        }
    }

    pub fn record(&self, d: Duration) {
        let ms = (d.as_millis().min(u128::from(u64::MAX)) as u64).max(1);
        if let Ok(mut guard) = self.inner.lock() {
            if let Some(h) = guard.as_mut() {
                h.saturating_record(ms);
            }
        }
    }

    /// Return (p50_ms, p95_ms, p99_ms). None if no samples.
    pub fn percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        let Ok(guard) = self.inner.lock() else {
            return (None, None, None);
        };
        match guard.as_ref() {
            Some(h) if h.len() > 0 => (
                Some(h.value_at_quantile(0.5)),
                Some(h.value_at_quantile(0.95)),
                Some(h.value_at_quantile(0.99)),
            ),
            _ => (None, None, None),
        }
    }

    /// Sample count.
    pub fn len(&self) -> u64 {
        self.inner
            .lock()
            .ok()
            .and_then(|g| g.as_ref().map(|h| h.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FetchLatency {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_no_percentiles() {
        let latency = FetchLatency::new();
        assert!(latency.is_empty());
        assert_eq!(latency.percentiles(), (None, None, None));
    }

    #[test]
    fn percentiles_follow_samples() {
        let latency = FetchLatency::new();
        for ms in 1..=100 {
            latency.record(Duration::from_millis(ms));
        }
        let (p50, p95, p99) = latency.percentiles();
        assert_eq!(latency.len(), 100);
        let (p50, p95, p99) = (p50.unwrap(), p95.unwrap(), p99.unwrap());
        assert!((49..=51).contains(&p50), "p50={p50}");
        assert!((94..=96).contains(&p95), "p95={p95}");
        assert!((98..=100).contains(&p99), "p99={p99}");
    }

    #[test]
    fn sub_millisecond_fetches_count_as_one() {
        let latency = FetchLatency::new();
        latency.record(Duration::from_micros(300));
        assert_eq!(latency.percentiles().0, Some(1));
    }
}
