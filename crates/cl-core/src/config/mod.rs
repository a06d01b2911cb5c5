//! Liaison configuration domain model

mod liaison_config;

pub use liaison_config::{
    ConfigError, HistoryConfig, LiaisonConfig, LoggingConfig, NetworkConfig, DEFAULT_PORT,
    ENV_BIND_ADDR, ENV_BROADCAST_ADDR, ENV_HISTORY_CAPACITY, ENV_INSTANCE_ID,
};
