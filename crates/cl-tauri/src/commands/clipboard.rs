//! Clipboard-related commands
//! 剪贴板相关命令

use tracing::{info_span, Instrument};

use super::dto::{BroadcastAckDto, ClipboardEntryDto};
use super::map_err;
use crate::bootstrap::LiaisonRuntime;

const NO_SYSTEM_CLIPBOARD: &str = "system clipboard is not available";

/// Share `message` with the LAN.
///
/// The entry is added to the local history even when sending fails.
pub async fn clipboard_broadcast(
    runtime: &LiaisonRuntime,
    message: String,
) -> Result<BroadcastAckDto, String> {
    let span = info_span!("command.clipboard.broadcast", len = message.len());
    async {
        runtime
            .coordinator()
            .broadcast(message)
            .await
            .map(BroadcastAckDto::from)
            .map_err(map_err)
    }
    .instrument(span)
    .await
}

/// History contents, oldest first.
pub fn clipboard_get(runtime: &LiaisonRuntime) -> Vec<String> {
    runtime
        .coordinator()
        .get_history()
        .into_iter()
        .map(|entry| entry.content)
        .collect()
}

/// History with origin and timing details, oldest first.
pub fn clipboard_entries(runtime: &LiaisonRuntime) -> Vec<ClipboardEntryDto> {
    runtime
        .coordinator()
        .get_history()
        .into_iter()
        .map(ClipboardEntryDto::from)
        .collect()
}

/// Broadcast the system clipboard text. `None` when it holds no text.
pub async fn clipboard_share_local(
    runtime: &LiaisonRuntime,
) -> Result<Option<BroadcastAckDto>, String> {
    let span = info_span!("command.clipboard.share_local");
    async {
        let uc = runtime
            .usecases()
            .share_local_clipboard()
            .ok_or_else(|| NO_SYSTEM_CLIPBOARD.to_string())?;
        let receipt = uc.execute().await.map_err(map_err)?;
        Ok(receipt.map(BroadcastAckDto::from))
    }
    .instrument(span)
    .await
}

/// Copy the newest history entry to the system clipboard. `None` when the
/// history is empty.
pub async fn clipboard_apply_latest(
    runtime: &LiaisonRuntime,
) -> Result<Option<ClipboardEntryDto>, String> {
    let span = info_span!("command.clipboard.apply_latest");
    async {
        let uc = runtime
            .usecases()
            .apply_latest_entry()
            .ok_or_else(|| NO_SYSTEM_CLIPBOARD.to_string())?;
        let entry = uc.execute().await.map_err(map_err)?;
        Ok(entry.map(ClipboardEntryDto::from))
    }
    .instrument(span)
    .await
}
