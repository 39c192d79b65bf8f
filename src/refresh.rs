use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::api::health::HealthState;
use crate::error::Result;
use crate::types::BidRecord;

/// Latest published record set. Replaced wholesale on every successful cycle.
pub type RecordSet = Arc<Vec<BidRecord>>;

/// Anything that can produce a fresh record set.
#[async_trait]
pub trait RecordSource: Send + Sync + 'static {
    async fn load(&self) -> Result<Vec<BidRecord>>;
}

// ---------------------------------------------------------------------------
// RefreshLoop
// ---------------------------------------------------------------------------

/// Polls a [`RecordSource`] on a fixed interval and publishes the result.
///
/// At most one cycle is in flight. A tick that fires while one is running is
/// dropped, not queued. Failed cycles leave the last good set published.
pub struct RefreshLoop<S> {
    source: Arc<S>,
    interval: Duration,
    health: Arc<HealthState>,
    records_tx: Arc<watch::Sender<RecordSet>>,
    in_flight: Arc<AtomicBool>,
    /// Held across the publish so deactivation cannot interleave with it.
    active: Arc<Mutex<bool>>,
    manual: Arc<Notify>,
}

impl<S: RecordSource> RefreshLoop<S> {
    pub fn new(source: Arc<S>, interval: Duration, health: Arc<HealthState>) -> (Self, watch::Receiver<RecordSet>) {
        let (tx, rx) = watch::channel(RecordSet::default());
        let this = Self {
            source,
            interval,
            health,
            records_tx: Arc::new(tx),
            in_flight: Arc::new(AtomicBool::new(false)),
            active: Arc::new(Mutex::new(true)),
            manual: Arc::new(Notify::new()),
        };
        (this, rx)
    }

    /// Start polling. The first cycle starts immediately.
    pub fn activate(self) -> RefreshHandle {
        let active = Arc::clone(&self.active);
        let manual = Arc::clone(&self.manual);
        let ticker = tokio::spawn(self.run());
        RefreshHandle { ticker, active, manual }
    }

    async fn run(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_ms = self.interval.as_millis() as u64, "Refresh loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.manual.notified() => {}
            }
            self.start_cycle();
        }
    }

    fn start_cycle(&self) {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Refresh tick skipped: cycle already in flight");
            return;
        }
        self.health.set_refreshing(true);

        let source = Arc::clone(&self.source);
        let health = Arc::clone(&self.health);
        let records_tx = Arc::clone(&self.records_tx);
        let in_flight = Arc::clone(&self.in_flight);
        let active = Arc::clone(&self.active);

        tokio::spawn(async move {
            let result = source.load().await;
            in_flight.store(false, Ordering::Release);
            health.set_refreshing(false);

            let Ok(active) = active.lock() else {
                return;
            };
            if !*active {
                debug!("Refresh loop deactivated; discarding cycle result");
                return;
            }

            match result {
                Ok(records) => {
                    let count = records.len();
                    health.record_success(now_ns(), count);
                    records_tx.send_replace(Arc::new(records));
                    debug!(records = count, "Record set published");
                }
                Err(e) => {
                    error!("Refresh failed, keeping last record set: {e}");
                    health.record_failure(e.to_string());
                }
            }
        });
    }
}

// ---------------------------------------------------------------------------
// RefreshHandle
// ---------------------------------------------------------------------------

/// Keeps the loop alive. Dropping it deactivates the loop.
pub struct RefreshHandle {
    ticker: JoinHandle<()>,
    active: Arc<Mutex<bool>>,
    manual: Arc<Notify>,
}

impl RefreshHandle {
    /// Ask for a cycle now. Subject to the same overlap rule as timer ticks.
    pub fn trigger(&self) {
        self.manual.notify_one();
    }

    /// Stop polling. A cycle already in flight finishes but is not published.
    pub fn deactivate(self) {
        drop(self);
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        // Waits out a publish already in progress; none can start afterwards.
        if let Ok(mut active) = self.active.lock() {
            *active = false;
        }
        self.ticker.abort();
        info!("Refresh loop stopped");
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, FetchError};
    use crate::types::CellValue;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;
    use tokio::time::sleep;

    fn record(id: f64) -> BidRecord {
        BidRecord {
            item_id: Some(CellValue::Number(id)),
            item_name: None,
            bidder_id: None,
            bid_amount: None,
        }
    }

    /// Each load waits for a permit, so tests decide when cycles finish.
    struct GatedSource {
        calls: AtomicUsize,
        gate: Semaphore,
        results: Mutex<Vec<Result<Vec<BidRecord>>>>,
    }

    impl GatedSource {
        fn new(results: Vec<Result<Vec<BidRecord>>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(0),
                results: Mutex::new(results),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn release(&self) {
            self.gate.add_permits(1);
        }
    }

    #[async_trait]
    impl RecordSource for GatedSource {
        async fn load(&self) -> Result<Vec<BidRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                Ok(Vec::new())
            } else {
                results.remove(0)
            }
        }
    }

    const INTERVAL: Duration = Duration::from_secs(5);

    /// Let every ready task run without reaching the next poll tick.
    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_runs_on_activation() {
        let source = GatedSource::new(vec![Ok(vec![record(1.0)])]);
        let health = Arc::new(HealthState::new());
        let (refresh, mut rx) = RefreshLoop::new(Arc::clone(&source), INTERVAL, Arc::clone(&health));
        let _handle = refresh.activate();

        settle().await;
        assert_eq!(source.calls(), 1);
        assert!(health.refreshing());

        source.release();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
        assert_eq!(health.records(), 1);
        assert!(!health.refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_during_pending_cycle_are_skipped() {
        let source = GatedSource::new(vec![Ok(vec![record(1.0)]), Ok(vec![record(2.0)])]);
        let (refresh, mut rx) = RefreshLoop::new(Arc::clone(&source), INTERVAL, Arc::new(HealthState::new()));
        let _handle = refresh.activate();

        // Ticks at 5s and 10s land while the first load is still pending.
        sleep(Duration::from_secs(12)).await;
        assert_eq!(source.calls(), 1);

        source.release();
        rx.changed().await.unwrap();
        assert_eq!(source.calls(), 1);

        // Next tick at 15s starts a fresh cycle.
        sleep(Duration::from_secs(4)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_last_good_records() {
        let source = GatedSource::new(vec![
            Ok(vec![record(1.0), record(2.0)]),
            Err(AppError::Fetch(FetchError::NonRetryableError {
                status: 404,
                body: String::new(),
            })),
        ]);
        let health = Arc::new(HealthState::new());
        let (refresh, mut rx) = RefreshLoop::new(Arc::clone(&source), INTERVAL, Arc::clone(&health));
        let _handle = refresh.activate();

        source.release();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 2);

        source.release();
        sleep(INTERVAL + Duration::from_millis(1)).await;
        assert_eq!(source.calls(), 2);
        assert_eq!(health.cycles(), 2);
        assert!(health.last_error().unwrap().contains("404"));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(rx.borrow().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_trigger_obeys_overlap_rule() {
        let source = GatedSource::new(vec![]);
        let (refresh, _rx) = RefreshLoop::new(Arc::clone(&source), INTERVAL, Arc::new(HealthState::new()));
        let handle = refresh.activate();

        settle().await;
        handle.trigger();
        settle().await;
        assert_eq!(source.calls(), 1);

        source.release();
        sleep(Duration::from_millis(10)).await;
        handle.trigger();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivated_loop_discards_in_flight_result() {
        let source = GatedSource::new(vec![Ok(vec![record(1.0)])]);
        let health = Arc::new(HealthState::new());
        let (refresh, rx) = RefreshLoop::new(Arc::clone(&source), INTERVAL, Arc::clone(&health));
        let handle = refresh.activate();

        settle().await;
        assert_eq!(source.calls(), 1);
        handle.deactivate();

        source.release();
        sleep(INTERVAL * 3).await;
        assert_eq!(source.calls(), 1);
        assert!(rx.borrow().is_empty());
        assert_eq!(health.records(), 0);
    }

    struct ImmediateSource;

    #[async_trait]
    impl RecordSource for ImmediateSource {
        async fn load(&self) -> Result<Vec<BidRecord>> {
            tokio::task::yield_now().await;
            Ok(vec![record(1.0)])
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn nothing_publishes_after_deactivate_returns() {
        for i in 0..100u64 {
            let health = Arc::new(HealthState::new());
            let (refresh, rx) = RefreshLoop::new(Arc::new(ImmediateSource), INTERVAL, Arc::clone(&health));
            let handle = refresh.activate();

            sleep(Duration::from_micros(i * 10)).await;
            handle.deactivate();
            let published = rx.borrow().len();
            let recorded = health.records();

            sleep(Duration::from_millis(2)).await;
            assert_eq!(rx.borrow().len(), published, "iteration {i}");
            assert_eq!(health.records(), recorded, "iteration {i}");
        }
    }
}
