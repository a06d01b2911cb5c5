//! Identifier newtypes.

mod id_macro;
mod instance_id;

pub use instance_id::{random_epoch, InstanceId};
