//! # Liaison Runtime
//!
//! Wires the ports into a [`LiaisonCoordinator`] and hands out use cases.
//!
//! - **cl-app**: use cases with `new()` constructors taking ports
//! - **cl-tauri/bootstrap**: this module picks the adapters
//! - **Commands**: call `runtime.coordinator()` or `runtime.usecases().xxx()`

use std::sync::Arc;

use cl_app::{ApplyLatestEntry, LiaisonCoordinator, ShareLocalClipboard};
use cl_core::ports::{ClockPort, PeerTransportPort, SystemClipboardPort};
use cl_core::LiaisonConfig;
use cl_network::UdpTransport;
use cl_platform::SystemClock;
use tracing::info;

/// Everything the commands need, created once per process.
///
/// 每个进程创建一次的运行时，持有协调器与可选的系统剪贴板。
pub struct LiaisonRuntime {
    config: LiaisonConfig,
    coordinator: LiaisonCoordinator,
    clipboard: Option<Arc<dyn SystemClipboardPort>>,
}

impl LiaisonRuntime {
    pub fn new(
        config: LiaisonConfig,
        transport: Arc<dyn PeerTransportPort>,
        clock: Arc<dyn ClockPort>,
        clipboard: Option<Arc<dyn SystemClipboardPort>>,
    ) -> Self {
        let coordinator = LiaisonCoordinator::new(&config, transport, clock);
        Self {
            config,
            coordinator,
            clipboard,
        }
    }

    pub fn config(&self) -> &LiaisonConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &LiaisonCoordinator {
        &self.coordinator
    }

    pub fn has_system_clipboard(&self) -> bool {
        self.clipboard.is_some()
    }

    pub fn usecases(&self) -> UseCases<'_> {
        UseCases { runtime: self }
    }
}

/// Use case accessor attached to [`LiaisonRuntime`].
pub struct UseCases<'a> {
    runtime: &'a LiaisonRuntime,
}

impl UseCases<'_> {
    /// `None` when no system clipboard is wired in.
    pub fn share_local_clipboard(&self) -> Option<ShareLocalClipboard> {
        let clipboard = self.runtime.clipboard.clone()?;
        Some(ShareLocalClipboard::new(
            clipboard,
            self.runtime.coordinator.clone(),
        ))
    }

    /// `None` when no system clipboard is wired in.
    pub fn apply_latest_entry(&self) -> Option<ApplyLatestEntry> {
        let clipboard = self.runtime.clipboard.clone()?;
        Some(ApplyLatestEntry::new(
            clipboard,
            self.runtime.coordinator.clone(),
        ))
    }
}

/// Production wiring: UDP sockets, wall clock and, with the
/// `system-clipboard` feature, the native clipboard.
pub fn create_runtime(config: LiaisonConfig) -> anyhow::Result<LiaisonRuntime> {
    let runtime = LiaisonRuntime::new(
        config,
        Arc::new(UdpTransport::new()),
        Arc::new(SystemClock),
        system_clipboard(),
    );
    info!(
        instance_id = %runtime.coordinator.instance_id(),
        bind_addr = %runtime.config.network.bind_addr,
        system_clipboard = runtime.has_system_clipboard(),
        "Liaison runtime created"
    );
    Ok(runtime)
}

#[cfg(feature = "system-clipboard")]
fn system_clipboard() -> Option<Arc<dyn SystemClipboardPort>> {
    match cl_platform::ClipboardRsClipboard::new() {
        Ok(clipboard) => Some(Arc::new(clipboard)),
        Err(err) => {
            tracing::warn!(error = %err, "System clipboard unavailable");
            None
        }
    }
}

#[cfg(not(feature = "system-clipboard"))]
fn system_clipboard() -> Option<Arc<dyn SystemClipboardPort>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_runtime_uses_configured_instance_id() {
        let mut config = LiaisonConfig::default();
        config.instance_id = Some("desk-1".to_string());

        let runtime = create_runtime(config).unwrap();

        assert_eq!(runtime.coordinator().instance_id().as_str(), "desk-1");
        assert_eq!(runtime.config().history.capacity, 500);
    }

    #[test]
    fn test_clipboard_use_cases_need_a_clipboard() {
        let runtime = LiaisonRuntime::new(
            LiaisonConfig::default(),
            Arc::new(UdpTransport::new()),
            Arc::new(SystemClock),
            None,
        );

        assert!(!runtime.has_system_clipboard());
        assert!(runtime.usecases().share_local_clipboard().is_none());
        assert!(runtime.usecases().apply_latest_entry().is_none());
    }
}
