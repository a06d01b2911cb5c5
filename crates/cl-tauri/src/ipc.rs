//! Tauri bindings for the commands.
//!
//! ```ignore
//! tauri::Builder::default()
//!     .manage(Arc::new(runtime))
//!     .invoke_handler(cl_tauri::ipc::invoke_handler())
//!     .setup(|app| {
//!         let runtime = app.state::<Arc<LiaisonRuntime>>();
//!         cl_tauri::ipc::spawn_event_forwarder(app.handle().clone(), &runtime);
//!         Ok(())
//!     })
//! ```

use std::sync::Arc;

use tauri::ipc::Invoke;
use tauri::{AppHandle, Emitter, Runtime, State};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::bootstrap::LiaisonRuntime;
use crate::commands::{
    self,
    dto::{BroadcastAckDto, ClipboardEntryDto, LiaisonStatusDto, PeerDto},
};

/// Prefix of the webview events, e.g. `liaison://entry-added`.
pub const EVENT_PREFIX: &str = "liaison://";

#[tauri::command]
pub async fn start_liaison(
    runtime: State<'_, Arc<LiaisonRuntime>>,
) -> Result<LiaisonStatusDto, String> {
    commands::start_liaison(&runtime).await
}

#[tauri::command]
pub async fn stop_liaison(
    runtime: State<'_, Arc<LiaisonRuntime>>,
) -> Result<LiaisonStatusDto, String> {
    Ok(commands::stop_liaison(&runtime).await)
}

#[tauri::command]
pub async fn liaison_status(
    runtime: State<'_, Arc<LiaisonRuntime>>,
) -> Result<LiaisonStatusDto, String> {
    Ok(commands::liaison_status(&runtime).await)
}

#[tauri::command]
pub fn liaison_peers(runtime: State<'_, Arc<LiaisonRuntime>>) -> Vec<PeerDto> {
    commands::liaison_peers(&runtime)
}

#[tauri::command]
pub async fn clipboard_broadcast(
    runtime: State<'_, Arc<LiaisonRuntime>>,
    message: String,
) -> Result<BroadcastAckDto, String> {
    commands::clipboard_broadcast(&runtime, message).await
}

#[tauri::command]
pub fn clipboard_get(runtime: State<'_, Arc<LiaisonRuntime>>) -> Vec<String> {
    commands::clipboard_get(&runtime)
}

#[tauri::command]
pub fn clipboard_entries(runtime: State<'_, Arc<LiaisonRuntime>>) -> Vec<ClipboardEntryDto> {
    commands::clipboard_entries(&runtime)
}

#[tauri::command]
pub async fn clipboard_share_local(
    runtime: State<'_, Arc<LiaisonRuntime>>,
) -> Result<Option<BroadcastAckDto>, String> {
    commands::clipboard_share_local(&runtime).await
}

#[tauri::command]
pub async fn clipboard_apply_latest(
    runtime: State<'_, Arc<LiaisonRuntime>>,
) -> Result<Option<ClipboardEntryDto>, String> {
    commands::clipboard_apply_latest(&runtime).await
}

/// Handler registering every liaison command.
pub fn invoke_handler<R: Runtime>() -> impl Fn(Invoke<R>) -> bool + Send + Sync + 'static {
    tauri::generate_handler![
        start_liaison,
        stop_liaison,
        liaison_status,
        liaison_peers,
        clipboard_broadcast,
        clipboard_get,
        clipboard_entries,
        clipboard_share_local,
        clipboard_apply_latest,
    ]
}

/// Re-emit every [`cl_core::LiaisonEvent`] to the webview as
/// `liaison://<event-name>`, replacing front-end polling.
pub fn spawn_event_forwarder<R: Runtime>(
    app: AppHandle<R>,
    runtime: &LiaisonRuntime,
) -> tauri::async_runtime::JoinHandle<()> {
    let mut events = runtime.coordinator().subscribe();
    tauri::async_runtime::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let name = format!("{EVENT_PREFIX}{}", event.name());
                    if let Err(err) = app.emit(&name, &event) {
                        warn!(event = %name, error = %err, "Failed to emit liaison event");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event forwarder lagged, front-end should refresh history");
                }
                Err(RecvError::Closed) => {
                    debug!("Liaison event channel closed");
                    break;
                }
            }
        }
    })
}
