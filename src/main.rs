use std::fs::OpenOptions;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use auction_ticker::alert::{AlertSink, ChannelAlert, LogAlert};
use auction_ticker::api::health::HealthState;
use auction_ticker::api::latency::FetchLatency;
use auction_ticker::api::routes::{router, ApiState};
use auction_ticker::audio::AudioDriver;
use auction_ticker::board::{BoardDriver, FlapBoard};
use auction_ticker::config::Config;
use auction_ticker::error::Result;
use auction_ticker::fetch::{FetchClient, ReqwestTransport};
use auction_ticker::flap::FlapActivity;
use auction_ticker::refresh::{RecordSet, RefreshLoop};
use auction_ticker::sheet::SheetSource;
use auction_ticker::tui::{self, TickerApp};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&cfg) {
        eprintln!("Logging setup failed: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

/// Headless logs to stdout. The terminal board owns the screen, so it logs to a file.
fn init_logging(cfg: &Config) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::new(&cfg.log_level));
    if cfg.headless {
        builder.init();
    } else {
        let file = OpenOptions::new().create(true).append(true).open(&cfg.log_file)?;
        builder.with_writer(Arc::new(file)).with_ansi(false).init();
    }
    Ok(())
}

async fn run(cfg: Config) -> Result<()> {
    info!(url = %cfg.sheet_url, headless = cfg.headless, "Auction ticker starting");

    let health = Arc::new(HealthState::new());
    let latency = Arc::new(FetchLatency::new());

    // --- Alerts go to the screen when there is one ---
    let mut alerts_rx = None;
    let alerts: Arc<dyn AlertSink> = if cfg.headless {
        Arc::new(LogAlert)
    } else {
        let (sink, rx) = ChannelAlert::new();
        alerts_rx = Some(rx);
        Arc::new(sink)
    };

    // --- Sheet polling ---
    let transport = ReqwestTransport::new(cfg.http_timeout)?;
    let client = FetchClient::new(transport, cfg.backoff, alerts).with_latency(Arc::clone(&latency));
    let source = Arc::new(SheetSource::new(client, cfg.sheet_url.clone()));
    let (refresh, records_rx) = RefreshLoop::new(source, cfg.poll_interval, Arc::clone(&health));
    let refresh = refresh.activate();

    // --- HTTP API server ---
    if cfg.api_port != 0 {
        let app = router(ApiState {
            health: Arc::clone(&health),
            latency: Arc::clone(&latency),
            records: records_rx.clone(),
        });
        let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
        info!("HTTP API listening on {bind_addr}");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("HTTP API stopped: {e}");
            }
        });
    }

    // --- Board ---
    let board = FlapBoard::new(FlapActivity::new());
    let driver = BoardDriver::new(board, open_audio(), Arc::clone(&health));

    match alerts_rx {
        Some(alerts_rx) => {
            let flap_interval = cfg.flap_interval;
            let mut app = TickerApp::new(driver, records_rx, alerts_rx, refresh, health);
            tokio::task::spawn_blocking(move || tui::run(&mut app, flap_interval)).await??;
        }
        None => run_headless(driver, records_rx, &cfg).await,
    }

    info!("Auction ticker stopped");
    Ok(())
}

/// Drive the board without a screen until Ctrl-C. The refresh loop stops when
/// its handle drops at the end of `run`.
async fn run_headless(mut driver: BoardDriver, mut records_rx: watch::Receiver<RecordSet>, cfg: &Config) {
    let mut ticker = interval(cfg.flap_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                driver.step();
            }
            changed = records_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let records = Arc::clone(&records_rx.borrow_and_update());
                info!(records = records.len(), "Board updated");
                driver.apply(&records);
            }
            _ = &mut shutdown => {
                info!("Ctrl-C received, shutting down");
                break;
            }
        }
    }
}

#[cfg(feature = "midi")]
fn open_audio() -> AudioDriver {
    match auction_ticker::audio::midi::MidiClickChannel::open() {
        Some(channel) => AudioDriver::new(Box::new(channel)),
        None => {
            info!("No MIDI output port; board runs silent");
            AudioDriver::silent()
        }
    }
}

#[cfg(not(feature = "midi"))]
fn open_audio() -> AudioDriver {
    info!("Built without audio; board runs silent");
    AudioDriver::silent()
}
