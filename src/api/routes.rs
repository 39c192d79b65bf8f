use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::api::health::HealthState;
use crate::api::latency::FetchLatency;
use crate::refresh::RecordSet;
use crate::types::BidRecord;

#[derive(Clone)]
pub struct ApiState {
    pub health: Arc<HealthState>,
    pub latency: Arc<FetchLatency>,
    pub records: watch::Receiver<RecordSet>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/records", get(get_records))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RecordsQuery {
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub refreshing: bool,
    pub last_refresh_at_ns: Option<u64>,
    pub records: u64,
    pub busy_flaps: u64,
    pub cycles: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LatencyResponse {
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub sample_count: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let h = &state.health;
    let last = h.last_refresh_at_ns();
    Json(HealthResponse {
        refreshing: h.refreshing(),
        last_refresh_at_ns: (last > 0).then_some(last),
        records: h.records(),
        busy_flaps: h.busy_flaps(),
        cycles: h.cycles(),
        last_error: h.last_error(),
    })
}

async fn get_records(
    State(state): State<ApiState>,
    Query(params): Query<RecordsQuery>,
) -> Json<Vec<BidRecord>> {
    let records = state.records.borrow().clone();
    let limit = params.limit.unwrap_or(records.len());
    Json(records.iter().take(limit).cloned().collect())
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50, p95, p99) = state.latency.percentiles();
    Json(LatencyResponse {
        p50_ms: p50,
        p95_ms: p95,
        p99_ms: p99,
        sample_count: state.latency.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use std::time::Duration;

    fn state(records: Vec<BidRecord>) -> (ApiState, watch::Sender<RecordSet>) {
        let (tx, rx) = watch::channel(Arc::new(records));
        let state = ApiState {
            health: Arc::new(HealthState::new()),
            latency: Arc::new(FetchLatency::new()),
            records: rx,
        };
        (state, tx)
    }

    fn record(name: &str) -> BidRecord {
        BidRecord {
            item_id: None,
            item_name: Some(CellValue::Text(name.to_string())),
            bidder_id: None,
            bid_amount: None,
        }
    }

    #[tokio::test]
    async fn health_reports_last_error_and_busy_flaps() {
        let (state, _tx) = state(vec![]);
        state.health.set_busy_flaps(7);
        state.health.record_failure("boom".to_string());

        let Json(body) = get_health(State(state)).await;
        assert_eq!(body.busy_flaps, 7);
        assert_eq!(body.cycles, 1);
        assert_eq!(body.last_refresh_at_ns, None);
        assert_eq!(body.last_error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn records_follow_latest_publish_and_limit() {
        let (state, tx) = state(vec![record("Pie")]);
        tx.send_replace(Arc::new(vec![record("Quilt"), record("Vase"), record("Lamp")]));

        let Json(all) = get_records(State(state.clone()), Query(RecordsQuery { limit: None })).await;
        assert_eq!(all.len(), 3);

        let Json(first) = get_records(State(state), Query(RecordsQuery { limit: Some(1) })).await;
        assert_eq!(first, vec![record("Quilt")]);
    }

    #[tokio::test]
    async fn latency_counts_samples() {
        let (state, _tx) = state(vec![]);
        state.latency.record(Duration::from_millis(1_200));
        let Json(body) = get_stats_latency(State(state)).await;
        assert_eq!(body.sample_count, 1);
        assert!(body.p50_ms.is_some());
    }
}
