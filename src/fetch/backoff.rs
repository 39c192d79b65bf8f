//! Retry policy for one logical fetch.
//!
//! [`FetchAttempt`] is a small state machine:
//!
//! ```text
//! Pending ──response──▶ Retrying ──response──▶ … ──▶ Succeeded
//!    │                     │
//!    └─────────────────────┴──fatal / deadline──▶ Failed(kind)
//! ```
//!
//! It never sleeps or reads a clock itself. The caller passes `now` in and
//! performs the waits it is told to, which keeps timeout and terminal-failure
//! behaviour testable without real delays.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::time::Instant;
use tracing::warn;

use crate::config::BackoffConfig;
use crate::error::FetchError;
use crate::fetch::transport::{HttpResponse, TransportError};

/// How a response status is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    Fatal,
}

/// 408, 429 and 5xx are worth retrying. Any other non-2xx is final.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        408 | 429 => StatusClass::Retryable,
        s if s >= 500 => StatusClass::Retryable,
        _ => StatusClass::Fatal,
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Exponential delay with a ceiling plus uniform jitter.
#[derive(Debug)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    jitter: Duration,
    rng: StdRng,
}

impl Backoff {
    pub fn new(cfg: &BackoffConfig, rng: StdRng) -> Self {
        Self {
            next: cfg.initial,
            max: cfg.max,
            jitter: cfg.jitter,
            rng,
        }
    }

    /// Delay before the next retry; doubles the base for the one after.
    pub fn next_delay(&mut self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(self.rng.gen_range(0..jitter_ms))
        };
        let delay = self.next + jitter;
        self.next = (self.next * 2).min(self.max);
        delay
    }
}

// ---------------------------------------------------------------------------
// FetchAttempt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Retrying { retries: u32 },
    Succeeded,
    Failed(FailureKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NonRetryable,
    Timeout,
    Malformed,
}

/// What the caller should do after feeding a result into the attempt.
#[derive(Debug)]
pub enum Step {
    /// Got an OK response; hand the body to the parser.
    Deliver(String),
    /// Transient failure; wait this long, then try again.
    Wait(Duration),
    /// Terminal failure.
    Fail(FetchError),
}

#[derive(Debug)]
pub struct FetchAttempt {
    start: Instant,
    deadline: Instant,
    backoff: Backoff,
    state: AttemptState,
}

impl FetchAttempt {
    pub fn begin(cfg: &BackoffConfig, rng: StdRng, now: Instant) -> Self {
        Self {
            start: now,
            deadline: now + cfg.deadline,
            backoff: Backoff::new(cfg, rng),
            state: AttemptState::Pending,
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn retries(&self) -> u32 {
        match self.state {
            AttemptState::Retrying { retries, .. } => retries,
            _ => 0,
        }
    }

    /// True while another request may be issued.
    pub fn can_send(&self, now: Instant) -> bool {
        matches!(self.state, AttemptState::Pending | AttemptState::Retrying { .. }) && now < self.deadline
    }

    /// Feed the outcome of one request.
    pub fn on_response(&mut self, outcome: std::result::Result<HttpResponse, TransportError>) -> Step {
        let response = match outcome {
            Ok(r) => r,
            Err(e) => return self.retry(FetchError::TransientServerError(e.0)),
        };

        match classify_status(response.status) {
            StatusClass::Success => Step::Deliver(response.body),
            StatusClass::Retryable => self.retry(FetchError::TransientServerError(format!(
                "{}: {}",
                response.status, response.reason
            ))),
            StatusClass::Fatal => {
                self.state = AttemptState::Failed(FailureKind::NonRetryable);
                Step::Fail(FetchError::NonRetryableError {
                    status: response.status,
                    body: format!("{}\n{}", response.reason, response.body),
                })
            }
        }
    }

    /// The delivered body parsed.
    pub fn succeed(&mut self) {
        self.state = AttemptState::Succeeded;
    }

    /// The delivered body did not parse. Retrying would return the same body.
    pub fn malformed(&mut self, detail: String) -> FetchError {
        self.state = AttemptState::Failed(FailureKind::Malformed);
        FetchError::MalformedResponse(detail)
    }

    /// Deadline passed without a usable response.
    pub fn expire(&mut self, now: Instant) -> FetchError {
        self.state = AttemptState::Failed(FailureKind::Timeout);
        FetchError::TimeoutExceeded {
            elapsed: now.saturating_duration_since(self.start),
        }
    }

    fn retry(&mut self, cause: FetchError) -> Step {
        let delay = self.backoff.next_delay();
        let retries = self.retries() + 1;
        self.state = AttemptState::Retrying { retries };
        warn!(
            retries,
            delay_ms = delay.as_millis() as u64,
            "Fetch failed, retrying: {cause}"
        );
        Step::Wait(delay)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
