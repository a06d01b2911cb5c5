//! Liaison session commands
//! 联络会话相关命令

use cl_platform::net_utils::advertised_address;
use tracing::{info_span, Instrument};

use super::dto::{LiaisonStatusDto, PeerDto};
use super::map_err;
use crate::bootstrap::LiaisonRuntime;

/// Start listening. Idempotent while already listening.
///
/// 开始监听；已在监听时直接返回当前状态。
pub async fn start_liaison(runtime: &LiaisonRuntime) -> Result<LiaisonStatusDto, String> {
    let span = info_span!("command.liaison.start");
    async {
        runtime.coordinator().start().await.map_err(map_err)?;
        Ok(liaison_status(runtime).await)
    }
    .instrument(span)
    .await
}

/// Stop listening and release the socket. The session cannot be restarted.
pub async fn stop_liaison(runtime: &LiaisonRuntime) -> LiaisonStatusDto {
    let span = info_span!("command.liaison.stop");
    async {
        runtime.coordinator().stop().await;
        liaison_status(runtime).await
    }
    .instrument(span)
    .await
}

pub async fn liaison_status(runtime: &LiaisonRuntime) -> LiaisonStatusDto {
    let coordinator = runtime.coordinator();
    let session = coordinator.session().await;
    let advertised = session
        .is_listening()
        .then_some(session.bound_address)
        .flatten()
        .map(advertised_address);

    LiaisonStatusDto::new(
        coordinator.instance_id().to_string(),
        &session,
        advertised,
        coordinator.peers().len(),
        coordinator.get_history().len(),
    )
}

pub fn liaison_peers(runtime: &LiaisonRuntime) -> Vec<PeerDto> {
    runtime
        .coordinator()
        .peers()
        .into_iter()
        .map(PeerDto::from)
        .collect()
}
