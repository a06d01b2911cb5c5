//! Headless ClipLiaison host.
//!
//! Loads `.env`, the optional config file named by `CLIPLIAISON_CONFIG` and
//! the `CLIPLIAISON_*` overrides, starts the liaison, logs every event and
//! stops cleanly on Ctrl-C.

use std::future::Future;
use std::path::PathBuf;

use anyhow::Context;
use cl_core::LiaisonEvent;
use cl_tauri::bootstrap::{self, LiaisonRuntime};
use cl_tauri::commands;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Environment variable naming the TOML config file.
pub const ENV_CONFIG_PATH: &str = "CLIPLIAISON_CONFIG";

pub async fn run() -> anyhow::Result<()> {
    // .env is optional
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("Failed to load .env: {err}");
        }
    }

    let lookup = |key: &str| std::env::var(key).ok();
    let config = bootstrap::resolve_config(config_path(lookup), lookup)?;
    bootstrap::tracing::init_tracing_subscriber(&config.logging)?;

    let runtime = bootstrap::create_runtime(config)?;
    serve(&runtime, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C, shutting down");
        }
    })
    .await
}

/// Start the liaison, log events until `shutdown` completes, then stop.
pub async fn serve<F>(runtime: &LiaisonRuntime, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let events = runtime.coordinator().subscribe();
    let status = commands::start_liaison(runtime)
        .await
        .map_err(anyhow::Error::msg)
        .context("Failed to start liaison")?;
    info!(
        instance_id = %status.instance_id,
        bound = ?status.bound_address,
        advertised = ?status.advertised_address,
        "ClipLiaison is running, press Ctrl-C to stop"
    );

    let logger = tokio::spawn(log_events(events));
    shutdown.await;

    let status = commands::stop_liaison(runtime).await;
    info!(
        state = %status.state,
        history_len = status.history_len,
        "ClipLiaison stopped"
    );
    logger.abort();
    Ok(())
}

fn config_path<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(ENV_CONFIG_PATH)
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

async fn log_events(mut events: broadcast::Receiver<LiaisonEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => log_event(&event),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn log_event(event: &LiaisonEvent) {
    match event {
        LiaisonEvent::SessionStarted { bound_address } => {
            debug!(%bound_address, "Session started")
        }
        LiaisonEvent::SessionStopped => debug!("Session stopped"),
        LiaisonEvent::EntryAdded(entry) => info!(
            origin = %entry.origin.instance_id(),
            local = entry.origin.is_local(),
            sequence = entry.sequence,
            len = entry.content.len(),
            "Clipboard entry added"
        ),
        LiaisonEvent::PeerDiscovered(peer) => info!(
            address = %peer.address,
            instance_id = ?peer.instance_id,
            "Peer discovered"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_from_env() {
        let path = config_path(|key| {
            (key == ENV_CONFIG_PATH).then(|| "/etc/clipliaison.toml".to_string())
        });
        assert_eq!(path, Some(PathBuf::from("/etc/clipliaison.toml")));
    }

    #[test]
    fn test_blank_config_path_is_ignored() {
        assert_eq!(config_path(|_| Some("  ".to_string())), None);
        assert_eq!(config_path(|_| None), None);
    }
}
