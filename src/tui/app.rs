use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::api::health::HealthState;
use crate::board::{BoardDriver, FlapBoard};
use crate::refresh::{RecordSet, RefreshHandle};

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

pub struct TickerApp {
    driver: BoardDriver,
    records_rx: watch::Receiver<RecordSet>,
    alerts_rx: mpsc::UnboundedReceiver<String>,
    refresh: RefreshHandle,
    pub health: Arc<HealthState>,
    pub last_alert: Option<String>,
}

impl TickerApp {
    pub fn new(
        driver: BoardDriver,
        records_rx: watch::Receiver<RecordSet>,
        alerts_rx: mpsc::UnboundedReceiver<String>,
        refresh: RefreshHandle,
        health: Arc<HealthState>,
    ) -> Self {
        Self {
            driver,
            records_rx,
            alerts_rx,
            refresh,
            health,
            last_alert: None,
        }
    }

    /// Pull the latest record set and any pending alerts.
    pub fn sync(&mut self) {
        if self.records_rx.has_changed().unwrap_or(false) {
            let records = Arc::clone(&self.records_rx.borrow_and_update());
            debug!(records = records.len(), "Board retargeted");
            self.driver.apply(&records);
        }
        while let Ok(message) = self.alerts_rx.try_recv() {
            self.last_alert = Some(message);
        }
    }

    pub fn step(&mut self) -> usize {
        self.driver.step()
    }

    pub fn request_refresh(&self) {
        self.refresh.trigger();
    }

    pub fn board(&self) -> &FlapBoard {
        self.driver.board()
    }

    pub fn busy(&self) -> usize {
        self.driver.busy()
    }

    pub fn playback_rate(&self) -> Option<f32> {
        self.driver.playback_rate()
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Wall-clock time of day (UTC) for a nanosecond timestamp; 0 means never.
pub fn format_time_ns(ns: u64) -> String {
    if ns == 0 {
        return "never".to_string();
    }
    let secs = ns / 1_000_000_000;
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

pub fn format_rate(rate: Option<f32>) -> String {
    match rate {
        Some(r) => format!("{r:.1}x"),
        None => "muted".to_string(),
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::fake_driver;
    use crate::flap::FlapActivity;
    use crate::refresh::{RecordSource, RefreshLoop};
    use crate::types::{BidRecord, CellValue};
    use async_trait::async_trait;
    use std::time::Duration;

    #[test]
    fn time_of_day() {
        assert_eq!(format_time_ns(0), "never");
        // 1970-01-01 13:05:09 UTC
        assert_eq!(format_time_ns(47_109 * 1_000_000_000), "13:05:09");
    }

    #[test]
    fn rate_and_truncate() {
        assert_eq!(format_rate(Some(3.0)), "3.0x");
        assert_eq!(format_rate(None), "muted");
        assert_eq!(truncate("An unexpected error occurred.", 10), "An unexpe…");
        assert_eq!(truncate("short", 10), "short");
    }

    struct Empty;

    #[async_trait]
    impl RecordSource for Empty {
        async fn load(&self) -> crate::error::Result<Vec<BidRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sync_applies_records_and_keeps_latest_alert() {
        let health = Arc::new(HealthState::new());
        let (refresh, _rx) = RefreshLoop::new(Arc::new(Empty), Duration::from_secs(5), Arc::clone(&health));
        let handle = refresh.activate();

        let (tx, records_rx) = watch::channel(RecordSet::default());
        let (alerts_tx, alerts_rx) = mpsc::unbounded_channel();
        let (audio, _log) = fake_driver();
        let board = FlapBoard::with_seed(FlapActivity::new(), 9);
        let driver = BoardDriver::new(board, audio, Arc::clone(&health));
        let mut app = TickerApp::new(driver, records_rx, alerts_rx, handle, health);

        tx.send_replace(Arc::new(vec![BidRecord {
            item_id: Some(CellValue::Number(1.0)),
            item_name: Some(CellValue::Text("Pie".to_string())),
            bidder_id: None,
            bid_amount: None,
        }]));
        alerts_tx.send("first".to_string()).unwrap();
        alerts_tx.send("second".to_string()).unwrap();

        app.sync();
        assert_eq!(app.board().len(), 1);
        assert_eq!(app.last_alert.as_deref(), Some("second"));
        assert!(app.step() <= app.board().activity().registered());
    }
}
