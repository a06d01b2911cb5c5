use std::sync::Arc;

use cl_core::ports::SystemClipboardPort;
use cl_core::ClipboardEntry;
use tracing::{debug, info, info_span, Instrument};

use super::ShareClipboardError;
use crate::liaison::LiaisonCoordinator;

/// Write the newest history entry to the system clipboard.
pub struct ApplyLatestEntry {
    clipboard: Arc<dyn SystemClipboardPort>,
    coordinator: LiaisonCoordinator,
}

impl ApplyLatestEntry {
    pub fn new(clipboard: Arc<dyn SystemClipboardPort>, coordinator: LiaisonCoordinator) -> Self {
        Self {
            clipboard,
            coordinator,
        }
    }

    /// Returns the applied entry, or `Ok(None)` when the history is empty.
    pub async fn execute(&self) -> Result<Option<ClipboardEntry>, ShareClipboardError> {
        let span = info_span!("usecase.apply_latest_entry.execute");

        async {
            let Some(entry) = self.coordinator.latest_entry() else {
                debug!("History is empty, nothing to apply");
                return Ok(None);
            };

            self.clipboard.write_text(&entry.content)?;
            info!(
                origin = %entry.origin.instance_id(),
                sequence = entry.sequence,
                "Applied history entry to system clipboard"
            );
            Ok(Some(entry))
        }
        .instrument(span)
        .await
    }
}
