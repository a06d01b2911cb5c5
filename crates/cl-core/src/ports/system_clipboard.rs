//! System clipboard port - text-only access to the local clipboard.

use anyhow::Result;

/// Text access to the operating system clipboard.
///
/// Implementations are synchronous; callers on an async runtime should
/// expect them to block briefly.
pub trait SystemClipboardPort: Send + Sync {
    /// Current clipboard text, `None` when the clipboard holds no text.
    fn read_text(&self) -> Result<Option<String>>;

    fn write_text(&self, text: &str) -> Result<()>;
}
