use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Result};
use clipboard_rs::{Clipboard, ClipboardContext, ContentFormat};
use cl_core::ports::SystemClipboardPort;
use tracing::debug;

/// Native clipboard through `clipboard-rs`. Text only.
pub struct ClipboardRsClipboard {
    inner: Mutex<ClipboardContext>,
}

impl ClipboardRsClipboard {
    pub fn new() -> Result<Self> {
        let context = ClipboardContext::new()
            .map_err(|e| anyhow!("failed to open system clipboard: {e}"))?;
        Ok(Self {
            inner: Mutex::new(context),
        })
    }

    fn context(&self) -> MutexGuard<'_, ClipboardContext> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SystemClipboardPort for ClipboardRsClipboard {
    fn read_text(&self) -> Result<Option<String>> {
        let ctx = self.context();
        if !ctx.has(ContentFormat::Text) {
            debug!("system clipboard holds no text");
            return Ok(None);
        }
        ctx.get_text()
            .map(Some)
            .map_err(|e| anyhow!("failed to read clipboard text: {e}"))
    }

    fn write_text(&self, text: &str) -> Result<()> {
        self.context()
            .set_text(text.to_string())
            .map_err(|e| anyhow!("failed to write clipboard text: {e}"))
    }
}
