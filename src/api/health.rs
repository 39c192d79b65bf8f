//! Shared health state for the /health endpoint.
//! Updated by the refresh loop and the board ticker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Shared health metrics. Updated by ticker components, read by API and screen.
#[derive(Default)]
pub struct HealthState {
    /// True while a fetch cycle is in flight.
    pub refreshing: AtomicBool,
    /// Nanosecond timestamp of the last successful refresh (0 = none yet).
    pub last_refresh_at_ns: AtomicU64,
    /// Records in the last published set.
    pub records: AtomicU64,
    /// Flaps mid-transition at the last board sample.
    pub busy_flaps: AtomicU64,
    /// Completed cycles, successful or not.
    pub cycles: AtomicU64,
    /// Message of the most recent failed cycle, cleared on success.
    last_error: Mutex<Option<String>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_refreshing(&self, v: bool) {
        self.refreshing.store(v, Ordering::Relaxed);
    }

    pub fn record_success(&self, at_ns: u64, records: usize) {
        self.last_refresh_at_ns.store(at_ns, Ordering::Relaxed);
        self.records.store(records as u64, Ordering::Relaxed);
        self.cycles.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut e) = self.last_error.lock() {
            *e = None;
        }
    }

    pub fn record_failure(&self, message: String) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut e) = self.last_error.lock() {
            *e = Some(message);
        }
    }

    pub fn set_busy_flaps(&self, n: usize) {
        self.busy_flaps.store(n as u64, Ordering::Relaxed);
    }

    pub fn refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Relaxed)
    }

    pub fn last_refresh_at_ns(&self) -> u64 {
        self.last_refresh_at_ns.load(Ordering::Relaxed)
    }

    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    pub fn busy_flaps(&self) -> u64 {
        self.busy_flaps.load(Ordering::Relaxed)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|e| e.clone())
    }
}
