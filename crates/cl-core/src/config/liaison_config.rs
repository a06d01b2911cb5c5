use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::InstanceId;

/// Port used by the original liaison protocol.
pub const DEFAULT_PORT: u16 = 1699;

pub const ENV_BIND_ADDR: &str = "CLIPLIAISON_BIND_ADDR";
pub const ENV_BROADCAST_ADDR: &str = "CLIPLIAISON_BROADCAST_ADDR";
pub const ENV_HISTORY_CAPACITY: &str = "CLIPLIAISON_HISTORY_CAPACITY";
pub const ENV_INSTANCE_ID: &str = "CLIPLIAISON_INSTANCE_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidOverride {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Liaison service configuration.
///
/// Every field has a default, so an empty document (or no document at all)
/// yields a working LAN setup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiaisonConfig {
    /// Fixed instance id; a random one is generated per process when unset.
    pub instance_id: Option<String>,
    pub network: NetworkConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// UDP listen address
    pub bind_addr: SocketAddr,
    /// Destination of broadcasts and discovery pings
    pub broadcast_addr: SocketAddr,
    /// Send to `broadcast_addr` at all
    pub broadcast_enabled: bool,
    /// Ping the broadcast address when listening starts
    pub announce_on_start: bool,
    /// Also unicast every broadcast to each discovered peer
    pub peer_fanout: bool,
    /// Upper bound of the peer registry
    pub max_peers: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            broadcast_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), DEFAULT_PORT),
            broadcast_enabled: true,
            announce_on_start: true,
            peer_fanout: true,
            max_peers: 64,
        }
    }
}

impl NetworkConfig {
    pub fn broadcast_destination(&self) -> Option<SocketAddr> {
        self.broadcast_enabled.then_some(self.broadcast_addr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of entries kept; `0` means unlimited.
    pub capacity: usize,
    /// Number of recent entry keys remembered for dedup.
    pub dedup_window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            dedup_window: 1024,
        }
    }
}

impl HistoryConfig {
    pub fn capacity_limit(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.capacity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write logs to a file
    pub file: bool,
    /// Log directory; the platform data directory is used when unset
    pub directory: Option<PathBuf>,
}

impl LiaisonConfig {
    /// Parse a TOML document. Missing sections and keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the instance id, generating a fresh one when not configured.
    pub fn resolve_instance_id(&self) -> InstanceId {
        match self.instance_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => InstanceId::from(id),
            _ => InstanceId::new(),
        }
    }

    /// Apply `CLIPLIAISON_*` overrides read through `lookup`.
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_BIND_ADDR) {
            self.network.bind_addr = parse_override(ENV_BIND_ADDR, &value)?;
        }

        if let Some(value) = lookup(ENV_BROADCAST_ADDR) {
            match value.trim() {
                "off" | "none" | "" => self.network.broadcast_enabled = false,
                other => {
                    self.network.broadcast_addr = parse_override(ENV_BROADCAST_ADDR, other)?;
                    self.network.broadcast_enabled = true;
                }
            }
        }

        if let Some(value) = lookup(ENV_HISTORY_CAPACITY) {
            self.history.capacity = parse_override(ENV_HISTORY_CAPACITY, &value)?;
        }

        if let Some(value) = lookup(ENV_INSTANCE_ID) {
            self.instance_id = Some(value);
        }

        Ok(())
    }
}

fn parse_override<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidOverride {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_target_lan_broadcast() {
        let config = LiaisonConfig::default();

        assert_eq!(config.network.bind_addr, "0.0.0.0:1699".parse().unwrap());
        assert_eq!(
            config.network.broadcast_destination(),
            Some("255.255.255.255:1699".parse().unwrap())
        );
        assert_eq!(config.history.capacity_limit(), NonZeroUsize::new(500));
        assert!(config.network.announce_on_start);
        assert!(!config.logging.file);
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = LiaisonConfig::from_toml_str("").unwrap();
        assert_eq!(config, LiaisonConfig::default());
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config = LiaisonConfig::from_toml_str(
            r#"
            instance_id = "desk"

            [network]
            bind_addr = "192.168.1.164:1700"
            broadcast_enabled = false

            [history]
            capacity = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.instance_id.as_deref(), Some("desk"));
        assert_eq!(
            config.network.bind_addr,
            "192.168.1.164:1700".parse().unwrap()
        );
        assert_eq!(config.network.broadcast_destination(), None);
        assert_eq!(config.history.capacity_limit(), None);
        assert_eq!(config.history.dedup_window, 1024);
        assert_eq!(config.network.max_peers, 64);
    }

    #[test]
    fn test_invalid_address_is_a_parse_error() {
        let result = LiaisonConfig::from_toml_str(
            r#"
            [network]
            bind_addr = "not-an-address"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_BIND_ADDR, "127.0.0.1:4000"),
            (ENV_BROADCAST_ADDR, "10.0.0.255:4000"),
            (ENV_HISTORY_CAPACITY, "16"),
            (ENV_INSTANCE_ID, "laptop"),
        ]
        .into_iter()
        .collect();
        let mut config = LiaisonConfig::default();

        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.network.bind_addr, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(
            config.network.broadcast_destination(),
            Some("10.0.0.255:4000".parse().unwrap())
        );
        assert_eq!(config.history.capacity, 16);
        assert_eq!(config.resolve_instance_id().as_str(), "laptop");
    }

    #[test]
    fn test_broadcast_override_can_disable() {
        let mut config = LiaisonConfig::default();
        config
            .apply_overrides(|key| (key == ENV_BROADCAST_ADDR).then(|| "off".to_string()))
            .unwrap();
        assert_eq!(config.network.broadcast_destination(), None);
    }

    #[test]
    fn test_bad_override_is_reported() {
        let mut config = LiaisonConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_HISTORY_CAPACITY).then(|| "lots".to_string()))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                key: ENV_HISTORY_CAPACITY,
                ..
            }
        ));
    }

    #[test]
    fn test_blank_instance_id_generates_one() {
        let config = LiaisonConfig {
            instance_id: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(!config.resolve_instance_id().as_str().trim().is_empty());
    }
}
