//! Use cases bridging the system clipboard and the liaison.

mod apply_latest_entry;
mod share_local_clipboard;

pub use apply_latest_entry::ApplyLatestEntry;
pub use share_local_clipboard::{ShareClipboardError, ShareLocalClipboard};
