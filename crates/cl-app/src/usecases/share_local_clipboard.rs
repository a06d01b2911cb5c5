use std::sync::Arc;

use cl_core::ports::SystemClipboardPort;
use tracing::{debug, info, info_span, Instrument};

use crate::liaison::{BroadcastReceipt, LiaisonCoordinator, LiaisonError};

#[derive(Debug, thiserror::Error)]
pub enum ShareClipboardError {
    #[error("System clipboard access failed: {0}")]
    Clipboard(String),

    #[error(transparent)]
    Liaison(#[from] LiaisonError),
}

impl From<anyhow::Error> for ShareClipboardError {
    fn from(err: anyhow::Error) -> Self {
        ShareClipboardError::Clipboard(err.to_string())
    }
}

/// Broadcast the current system clipboard text.
/// 读取系统剪贴板并广播给局域网中的其他实例。
pub struct ShareLocalClipboard {
    clipboard: Arc<dyn SystemClipboardPort>,
    coordinator: LiaisonCoordinator,
}

impl ShareLocalClipboard {
    pub fn new(clipboard: Arc<dyn SystemClipboardPort>, coordinator: LiaisonCoordinator) -> Self {
        Self {
            clipboard,
            coordinator,
        }
    }

    /// Returns `Ok(None)` when the clipboard holds no text.
    pub async fn execute(&self) -> Result<Option<BroadcastReceipt>, ShareClipboardError> {
        let span = info_span!("usecase.share_local_clipboard.execute");

        async {
            let text = match self.clipboard.read_text()? {
                Some(text) if !text.is_empty() => text,
                _ => {
                    debug!("System clipboard has no text to share");
                    return Ok(None);
                }
            };

            let receipt = self.coordinator.broadcast(text).await?;
            info!(
                sequence = receipt.sequence,
                delivered = receipt.delivered,
                "Shared local clipboard"
            );
            Ok(Some(receipt))
        }
        .instrument(span)
        .await
    }
}
