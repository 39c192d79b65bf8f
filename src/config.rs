use std::time::Duration;

use crate::error::{AppError, Result};

pub const SHEET_URL: &str = "https://auction-ticker.hawkbar.workers.dev/";

/// How often the sheet is re-fetched (milliseconds).
pub const POLL_INTERVAL_MS: u64 = 5_000;

/// Board animation tick (milliseconds). Each tick moves every flap one position.
pub const FLAP_INTERVAL_MS: u64 = 100;

/// Retry backoff for the sheet fetch, in milliseconds.
pub const BACKOFF_INITIAL_MS: u64 = 1_000;
pub const BACKOFF_MAX_MS: u64 = 64_000;
/// Upper bound (exclusive) of the random delay added to every backoff wait.
pub const BACKOFF_JITTER_MS: u64 = 1_000;

/// Absolute deadline for one logical fetch, retries included (milliseconds).
pub const FETCH_DEADLINE_MS: u64 = 600_000;

/// Per-request timeout handed to reqwest.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Board column layout: (title, width, right-aligned).
pub mod columns {
    pub const ITEM: (&str, usize, bool) = ("Item", 6, true);
    pub const DESCRIPTION: (&str, usize, bool) = ("Description", 16, false);
    pub const BIDDER: (&str, usize, bool) = ("Bidder", 6, true);
    pub const BID_AMOUNT: (&str, usize, bool) = ("Bid Amount", 10, true);
}

/// Retry timing for the fetch client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
    pub jitter: Duration,
    pub deadline: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(BACKOFF_INITIAL_MS),
            max: Duration::from_millis(BACKOFF_MAX_MS),
            jitter: Duration::from_millis(BACKOFF_JITTER_MS),
            deadline: Duration::from_millis(FETCH_DEADLINE_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sheet_url: String,
    pub log_level: String,
    /// Log destination while the terminal board owns the screen (LOG_FILE).
    pub log_file: String,
    /// Status API port; 0 disables the API (API_PORT).
    pub api_port: u16,
    /// Run without the terminal board, logging to stdout (HEADLESS).
    pub headless: bool,
    pub poll_interval: Duration,
    pub flap_interval: Duration,
    pub http_timeout: Duration,
    pub backoff: BackoffConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            sheet_url: std::env::var("SHEET_URL").unwrap_or_else(|_| SHEET_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: std::env::var("LOG_FILE").unwrap_or_else(|_| "ticker.log".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "0".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            headless: std::env::var("HEADLESS")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            poll_interval: millis_from_env("POLL_INTERVAL_MS", POLL_INTERVAL_MS)?,
            flap_interval: millis_from_env("FLAP_INTERVAL_MS", FLAP_INTERVAL_MS)?,
            http_timeout: Duration::from_secs(
                std::env::var("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                    .parse::<u64>()
                    .map_err(|_| {
                        AppError::Config("HTTP_TIMEOUT_SECS must be a whole number".to_string())
                    })?,
            ),
            backoff: BackoffConfig {
                initial: millis_from_env("BACKOFF_INITIAL_MS", BACKOFF_INITIAL_MS)?,
                max: millis_from_env("BACKOFF_MAX_MS", BACKOFF_MAX_MS)?,
                jitter: millis_from_env("BACKOFF_JITTER_MS", BACKOFF_JITTER_MS)?,
                deadline: millis_from_env("FETCH_DEADLINE_MS", FETCH_DEADLINE_MS)?,
            },
        })
    }
}

fn millis_from_env(key: &str, default: u64) -> Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| AppError::Config(format!("{key} must be a whole number of milliseconds"))),
        Err(_) => Ok(Duration::from_millis(default)),
    }
}
