//! Platform adapters for ClipLiaison.
//!
//! - [`SystemClock`]: wall clock for entry timestamps
//! - [`net_utils`]: LAN address detection for status reporting
//! - `ClipboardRsClipboard` (feature `system-clipboard`): native clipboard

pub mod net_utils;
mod time;

#[cfg(feature = "system-clipboard")]
mod clipboard;

#[cfg(feature = "system-clipboard")]
pub use clipboard::ClipboardRsClipboard;
pub use time::SystemClock;
