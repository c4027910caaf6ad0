//! Server configuration.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration. Per-room overrides supplied by clients at room creation
//! are layered on top of the defaults configured here.

use pocket_holdem::room::RoomConfig;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Complete server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Server bind address.
    pub bind: SocketAddr,
    /// Defaults for rooms created without overrides.
    pub room_defaults: RoomConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables, with optional CLI
    /// overrides taking precedence.
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| std::env::var("SERVER_BIND").ok().and_then(|s| s.parse().ok()))
            .unwrap_or_else(|| {
                "127.0.0.1:7070"
                    .parse()
                    .expect("default bind address is valid")
            });

        let defaults = RoomConfig::default();
        let room_defaults = RoomConfig {
            initial_chips: parse_env_or("ROOM_INITIAL_CHIPS", defaults.initial_chips),
            small_blind: parse_env_or("ROOM_SMALL_BLIND", defaults.small_blind),
            big_blind: parse_env_or("ROOM_BIG_BLIND", defaults.big_blind),
            max_players: parse_env_or("ROOM_MAX_PLAYERS", defaults.max_players),
            turn_timeout_secs: parse_env_or("ROOM_TURN_TIMEOUT_SECS", defaults.turn_timeout_secs),
            inter_hand_delay_ms: parse_env_or(
                "ROOM_INTER_HAND_DELAY_MS",
                defaults.inter_hand_delay_ms,
            ),
        };

        room_defaults
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "ROOM_*".to_string(),
                reason,
            })?;

        Ok(Self {
            bind,
            room_defaults,
        })
    }
}

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = ServerConfig::from_env(None).unwrap();
        assert!(config.room_defaults.validate().is_ok());
        assert_eq!(config.room_defaults.big_blind, 10);
    }

    #[test]
    fn test_cli_bind_override_wins() {
        let bind: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let config = ServerConfig::from_env(Some(bind)).unwrap();
        assert_eq!(config.bind, bind);
    }

    #[test]
    fn test_parse_env_or_falls_back() {
        assert_eq!(parse_env_or("PH_UNSET_VARIABLE_FOR_TEST", 42u32), 42);
    }
}
