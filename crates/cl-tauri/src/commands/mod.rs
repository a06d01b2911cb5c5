//! Front-end facing operations.
//!
//! Each command maps to one coordinator call or use case and turns failures
//! into a message string. The `ipc` module exposes the same set to Tauri.

pub mod clipboard;
pub mod dto;
pub mod error;
pub mod liaison;

pub use clipboard::{
    clipboard_apply_latest, clipboard_broadcast, clipboard_entries, clipboard_get,
    clipboard_share_local,
};
pub use error::map_err;
pub use liaison::{liaison_peers, liaison_status, start_liaison, stop_liaison};
