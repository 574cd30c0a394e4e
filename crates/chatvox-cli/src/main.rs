//! chatvox — reads a Twitch chat channel aloud.
//!
//! Wiring: connection → reader → queue → speech worker → (playback,
//! deletion). The reader and worker are long-lived tasks; playback and
//! deletion are short-lived tracked tasks, two per spoken message.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use chatvox_core::auth;
use chatvox_core::config::Config;
use chatvox_core::error::{ChatvoxError, Result};
use chatvox_core::types::{QueueItem, QueueSender};
use chatvox_irc::{Reader, Session};
use chatvox_speech::artifact::ensure_work_dir;
use chatvox_speech::{AudioSink, PiperEngine, RodioSink, SpeechEngine, SpeechWorker};

#[derive(Parser)]
#[command(
    name = "chatvox",
    about = "Unattended Twitch chat-to-speech pipeline",
    version
)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "chatvox.json5")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config = Config::load(&cli.config)?;
    config.validate()?;

    let token = auth::load_access_token(&config.credential_path())?;
    ensure_work_dir(&config.work_dir())?;

    let engine: Arc<dyn SpeechEngine> = Arc::new(PiperEngine::new(&config.voice_model));
    let sink: Arc<dyn AudioSink> = Arc::new(RodioSink::new());

    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    let tracker = TaskTracker::new();
    let worker = SpeechWorker::new(engine, sink, config.work_dir(), tracker.clone());
    let worker_handle = tokio::spawn(worker.run(queue_rx));

    let cancel = CancellationToken::new();
    let ingest_handle = {
        let config = config.clone();
        let queue_tx = queue_tx.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { run_ingest(&config, &token, &queue_tx, &cancel).await })
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
        result = ingest_handle => {
            match result {
                Ok(Ok(())) => info!("ingestion finished"),
                Ok(Err(e)) => error!(error = %e, "ingestion failed"),
                Err(e) => error!(error = %e, "ingestion task panicked"),
            }
        }
    }

    // Orderly teardown: stop the reader, let the worker drain up to the
    // sentinel, then wait for in-flight playback and deletion.
    cancel.cancel();
    let _ = queue_tx.send(QueueItem::Shutdown);
    let _ = worker_handle.await;
    tracker.close();
    tracker.wait().await;

    info!("shutdown complete");
    Ok(())
}

/// Connect and read until cancellation, applying the configured reconnect
/// policy on read failures.
///
/// The initial connection is not retried — a server that is unreachable at
/// startup is a fatal misconfiguration. A session that drops after being
/// established is retried up to `reconnect.max_attempts` times with doubling
/// backoff; a successful reconnect resets the budget.
async fn run_ingest(
    config: &Config,
    token: &str,
    queue: &QueueSender,
    cancel: &CancellationToken,
) -> Result<()> {
    let addr = config.addr();
    let channel = config.channel();
    let mut attempt: u32 = 0;

    loop {
        let session = match Session::connect(&addr, &channel, token).await {
            Ok(session) => {
                attempt = 0;
                session
            }
            Err(e) if attempt == 0 => return Err(e),
            Err(e) => {
                warn!(error = %e, attempt, "reconnect attempt failed");
                if !backoff_or_give_up(config, &mut attempt, cancel).await {
                    return Err(e);
                }
                continue;
            }
        };

        match Reader::new(session).run(queue, cancel).await {
            Ok(()) => return Ok(()),
            Err(e @ ChatvoxError::Read(_)) => {
                warn!(error = %e, "connection lost");
                if !backoff_or_give_up(config, &mut attempt, cancel).await {
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Sleep out the backoff for the next attempt. Returns false once the
/// reconnect budget is exhausted (or cancellation arrives mid-wait).
async fn backoff_or_give_up(
    config: &Config,
    attempt: &mut u32,
    cancel: &CancellationToken,
) -> bool {
    let policy = &config.reconnect;
    if *attempt >= policy.max_attempts {
        if policy.max_attempts == 0 {
            info!("reconnect disabled, exiting on connection loss");
        } else {
            warn!(max_attempts = policy.max_attempts, "reconnect budget exhausted");
        }
        return false;
    }

    let backoff = Duration::from_millis(
        policy
            .initial_backoff_ms
            .saturating_mul(1u64 << (*attempt).min(6)),
    );
    *attempt += 1;
    info!(
        attempt = *attempt,
        max_attempts = policy.max_attempts,
        backoff_ms = backoff.as_millis() as u64,
        "reconnecting"
    );

    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(backoff) => true,
    }
}
