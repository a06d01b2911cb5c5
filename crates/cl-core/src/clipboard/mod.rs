//! Clipboard history domain model.

mod entry;

pub use entry::{ClipboardEntry, EntryKey, EntryOrigin};
