//! zenith-daemon: Background daemon for a guided meditation timer
//!
//! This daemon owns a single meditation session and provides:
//! - A countdown clock with a fixed set of session lengths
//! - A paced breathing cycle (in 4s, hold 4s, out 6s)
//! - Audio cue and ambient noise commands, published to clients
//! - IPC server for UI communication
//!
//! Sound is produced by the connected UI; the daemon only decides what
//! should be heard and when.

mod audio;
mod config;
mod events;
mod ipc;
mod lifecycle;
mod session;
mod tick;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::audio::BroadcastAudio;
use crate::config::Config;
use crate::events::{log_events, SessionEvent};
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::session::{Session, SessionHandle, SessionRunner};
use crate::tick::Ticker;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "zenith-daemon starting");

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        duration = %config.duration.label(),
        "configuration loaded"
    );

    let shutdown = ShutdownSignal::new();

    // IPC server -> session loop
    let (command_tx, command_rx) = mpsc::channel(32);
    // Session -> log and subscribed clients
    let (event_tx, _event_rx) = broadcast::channel::<SessionEvent>(64);

    let audio = BroadcastAudio::new(event_tx.clone());
    let session = Session::new(
        config.settings,
        config.duration,
        Box::new(audio),
        event_tx.clone(),
    );
    let mut runner = SessionRunner::new(session, Ticker::every_second());

    let server = Server::new(
        &config.socket_path,
        SessionHandle::new(command_tx),
        event_tx.clone(),
    )?;

    info!("daemon initialized, entering main loop");

    tokio::select! {
        _ = runner.run(command_rx) => {
            info!("session loop exited");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        _ = log_events(event_tx.subscribe()) => {
            info!("event log exited");
        }

        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "failed to install signal handlers"),
            }
        }
    }

    info!("shutting down...");

    runner.teardown();
    server.shutdown().await;

    info!("zenith-daemon stopped");

    Ok(())
}
