// # tokensync
//
// Thin integration layer: reads the environment, wires the HTTP adapters to
// the YAML record directory and runs a single sync pass. All reconciliation
// logic lives in tokensync-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `TOKENSYNC_FEED_URL`: listings API endpoint
// - `TOKENSYNC_LOOKUP_URL_TEMPLATE`: listing page URL, with a `{slug}` placeholder
// - `TOKENSYNC_TOKENS_DIR`: directory of `0x*.yaml` records (default `tokens`)
// - `TOKENSYNC_RATE_LIMIT_SECS`: delay before each listing (default 12)
// - `TOKENSYNC_DEPRECATE_VANISHED`: deprecate listings gone from the feed (default true)
// - `TOKENSYNC_DRY_RUN`: log record writes instead of performing them
// - `TOKENSYNC_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// export TOKENSYNC_TOKENS_DIR=./tokens
// export TOKENSYNC_DRY_RUN=true
//
// tokensync
// ```

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use tokio::sync::{mpsc, watch};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use tokensync_core::config::{EngineConfig, FeedConfig, LookupConfig, StoreConfig, SyncConfig};
use tokensync_core::{SyncEngine, SyncEvent, SyncReport, YamlDirStore};
use tokensync_http::{HttpAddressLookup, HttpListingFeed};

/// Exit codes for different termination scenarios
///
/// - 0: Run completed
/// - 1: Configuration or startup error
/// - 2: Run aborted by an error
/// - 130: Interrupted by the user (after finishing the current listing)
#[derive(Debug, Clone, Copy)]
enum TokensyncExitCode {
    /// Run completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Feed failure, store inconsistency or I/O error
    RuntimeError = 2,
    /// SIGINT/SIGTERM before the run finished
    Interrupted = 130,
}

impl From<TokensyncExitCode> for ExitCode {
    fn from(code: TokensyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    sync: SyncConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let defaults = EngineConfig::default();

        let rate_limit_secs = match env::var("TOKENSYNC_RATE_LIMIT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("TOKENSYNC_RATE_LIMIT_SECS is not a number: {}", raw))?,
            Err(_) => defaults.rate_limit_secs,
        };

        let sync = SyncConfig {
            feed: FeedConfig {
                url: env::var("TOKENSYNC_FEED_URL").unwrap_or_else(|_| FeedConfig::default().url),
            },
            lookup: LookupConfig {
                url_template: env::var("TOKENSYNC_LOOKUP_URL_TEMPLATE")
                    .unwrap_or_else(|_| LookupConfig::default().url_template),
            },
            store: StoreConfig {
                path: env::var("TOKENSYNC_TOKENS_DIR")
                    .unwrap_or_else(|_| StoreConfig::default().path),
                dry_run: env_flag("TOKENSYNC_DRY_RUN", false)?,
            },
            engine: EngineConfig {
                rate_limit_secs,
                deprecate_vanished: env_flag(
                    "TOKENSYNC_DEPRECATE_VANISHED",
                    defaults.deprecate_vanished,
                )?,
                ..defaults
            },
        };

        Ok(Self {
            sync,
            log_level: env::var("TOKENSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.sync.validate()?;

        if std::path::Path::new(&self.sync.store.path).is_file() {
            anyhow::bail!(
                "TOKENSYNC_TOKENS_DIR points to a file, not a directory: {}",
                self.sync.store.path
            );
        }

        if self.sync.feed.url.starts_with("http://") {
            eprintln!("WARNING: TOKENSYNC_FEED_URL uses HTTP (not HTTPS).");
        }

        if self.sync.engine.rate_limit_secs == 0 {
            eprintln!("WARNING: TOKENSYNC_RATE_LIMIT_SECS=0 disables the upstream rate limit.");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "TOKENSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

/// Read a boolean variable; unset means `default`
fn env_flag(name: &str, default: bool) -> Result<bool> {
    let Ok(raw) = env::var(name) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("{} must be a boolean. Got: {}", name, other),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return TokensyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return TokensyncExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return TokensyncExitCode::ConfigError.into();
    }

    info!("Starting tokensync");

    // The run is strictly sequential; one thread is enough.
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return TokensyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(forward_shutdown(shutdown_tx));

        match run_sync(config, shutdown_rx).await {
            Ok(report) => {
                log_report(&report);
                if report.interrupted {
                    TokensyncExitCode::Interrupted
                } else {
                    TokensyncExitCode::Success
                }
            }
            Err(e) => {
                error!("Sync aborted: {:#}", e);
                TokensyncExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire the adapters and run one pass
async fn run_sync(config: Config, shutdown: watch::Receiver<bool>) -> Result<SyncReport> {
    let store = if config.sync.store.dry_run {
        info!("Dry run: record writes are logged, not performed");
        YamlDirStore::new_dry_run(&config.sync.store.path).await?
    } else {
        YamlDirStore::new(&config.sync.store.path).await?
    };
    info!("Record directory: {}", store.dir().display());

    let feed = HttpListingFeed::new(&config.sync.feed.url)?;
    let lookup = HttpAddressLookup::new(&config.sync.lookup.url_template)?;

    let (engine, events) = SyncEngine::new(
        Box::new(feed),
        Box::new(lookup),
        Box::new(store),
        config.sync.engine.clone(),
    )?;
    let engine = engine.with_shutdown(shutdown);

    tokio::spawn(log_events(events));

    Ok(engine.run().await?)
}

/// Log engine events until the engine is dropped
async fn log_events(mut events: mpsc::Receiver<SyncEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Event: {:?}", event);
    }
}

fn log_report(report: &SyncReport) {
    let elapsed = report.finished_at - report.started_at;
    info!(
        "Processed {} listing(s) in {}s: {} reconciled, {} skipped",
        report.listings,
        elapsed.num_seconds(),
        report.reconciled,
        report.skipped
    );
    info!(
        "Records: {} written, {} deprecated",
        report.written, report.deprecated
    );
    if report.interrupted {
        warn!("Run interrupted; listings after the last one processed were not touched");
    }
    if !report.vanished_ids.is_empty() {
        warn!(
            "{} listing(s) left the feed: {:?}",
            report.vanished_ids.len(),
            report.vanished_ids
        );
    }
}

/// Ask the engine to stop after the current listing once a signal arrives
async fn forward_shutdown(shutdown: watch::Sender<bool>) {
    let name = shutdown_signal().await;
    warn!("Received {}, stopping after the current listing", name);
    let _ = shutdown.send(true);
}

/// Resolve with the signal name; never resolves if handlers cannot be installed
async fn shutdown_signal() -> &'static str {
    match wait_for_shutdown().await {
        Ok(name) => name,
        Err(e) => {
            warn!("Signal handling unavailable, run cannot be interrupted: {:#}", e);
            std::future::pending().await
        }
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
