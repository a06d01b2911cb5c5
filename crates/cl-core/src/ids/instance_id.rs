use serde::{Deserialize, Serialize};

use super::id_macro::impl_id;

/// Identifies one running liaison instance on the network.
///
/// Every envelope carries the instance id of the peer that produced it. The
/// id may be fixed through config, so it can outlive a process; see
/// [`random_epoch`] for the per-process part of the deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl_id!(InstanceId);

/// Random per-process epoch.
///
/// Sequence numbers restart at 1 with every process, so receivers key
/// deduplication on `(origin, epoch, sequence)`.
pub fn random_epoch() -> u64 {
    uuid::Uuid::new_v4().as_u128() as u64
}
