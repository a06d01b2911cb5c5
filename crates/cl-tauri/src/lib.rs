//! ClipLiaison adapter layer.
//!
//! - [`bootstrap`]: config loading, tracing setup and runtime wiring
//! - [`commands`]: the front-end facing operations, as plain async functions
//! - `ipc` (feature `tauri`): the same operations as Tauri commands

pub mod bootstrap;
pub mod commands;

#[cfg(feature = "tauri")]
pub mod ipc;
