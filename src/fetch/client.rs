use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use tokio::time::{sleep, Instant};
use tracing::{debug, error};

use crate::alert::AlertSink;
use crate::api::latency::FetchLatency;
use crate::config::BackoffConfig;
use crate::error::FetchError;
use crate::fetch::backoff::{FetchAttempt, Step};
use crate::fetch::transport::{HttpRequest, Transport};

/// Fetches and parses one JSON document, riding out transient failures.
///
/// Knows nothing about the document's shape beyond "deserializes into `D`".
pub struct FetchClient<T> {
    transport: T,
    backoff: BackoffConfig,
    alerts: Arc<dyn AlertSink>,
    latency: Option<Arc<FetchLatency>>,
    /// Seeds each attempt's jitter source.
    seeds: Mutex<StdRng>,
}

impl<T: Transport> FetchClient<T> {
    pub fn new(transport: T, backoff: BackoffConfig, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            transport,
            backoff,
            alerts,
            latency: None,
            seeds: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic jitter, for tests and replays.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seeds = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Record the duration of every successful fetch.
    pub fn with_latency(mut self, latency: Arc<FetchLatency>) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Run one logical fetch to success, a fatal error, or the deadline.
    ///
    /// Fatal errors are logged and alerted exactly once before being returned.
    pub async fn fetch_json<D: DeserializeOwned>(&self, request: &HttpRequest) -> Result<D, FetchError> {
        let started = Instant::now();
        let mut attempt = FetchAttempt::begin(&self.backoff, self.attempt_rng(), started);

        while attempt.can_send(Instant::now()) {
            let outcome = self.transport.send(request).await;
            match attempt.on_response(outcome) {
                Step::Deliver(body) => match serde_json::from_str::<D>(&body) {
                    Ok(parsed) => {
                        attempt.succeed();
                        let elapsed = started.elapsed();
                        if let Some(latency) = &self.latency {
                            latency.record(elapsed);
                        }
                        debug!(
                            url = %request.url,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Fetch complete"
                        );
                        return Ok(parsed);
                    }
                    Err(e) => {
                        let err = attempt.malformed(e.to_string());
                        return Err(self.fatal(request, err));
                    }
                },
                Step::Wait(delay) => sleep(delay).await,
                Step::Fail(err) => return Err(self.fatal(request, err)),
            }
        }

        let err = attempt.expire(Instant::now());
        Err(self.fatal(request, err))
    }

    fn fatal(&self, request: &HttpRequest, err: FetchError) -> FetchError {
        debug_assert!(err.is_fatal(), "transient error surfaced: {err}");
        error!(url = %request.url, method = %request.method, "Fetch failed: {err}");
        self.alerts.alert(&err);
        err
    }

    fn attempt_rng(&self) -> StdRng {
        let seed = self
            .seeds
            .lock()
            .map(|mut rng| rng.gen::<u64>())
            .unwrap_or_default();
        StdRng::seed_from_u64(seed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
