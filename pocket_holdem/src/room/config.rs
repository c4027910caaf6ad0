//! Room configuration models.

use serde::{Deserialize, Serialize};

use crate::game::constants::{MAX_SEATS, MIN_PLAYERS_TO_START};
use crate::game::entities::Chips;

pub const DEFAULT_INITIAL_CHIPS: Chips = 1000;
pub const DEFAULT_SMALL_BLIND: Chips = 5;
pub const DEFAULT_BIG_BLIND: Chips = 10;
pub const DEFAULT_MAX_PLAYERS: usize = 6;
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_INTER_HAND_DELAY_MS: u64 = 3000;

/// Per-room configuration, fixed at creation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RoomConfig {
    /// Stack granted when a player sits down.
    pub initial_chips: Chips,
    pub small_blind: Chips,
    pub big_blind: Chips,
    /// Seats at the table, within `[2, 9]`.
    pub max_players: usize,
    /// Per-turn action deadline.
    pub turn_timeout_secs: u64,
    /// Pause between settlement and the next deal.
    pub inter_hand_delay_ms: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            initial_chips: DEFAULT_INITIAL_CHIPS,
            small_blind: DEFAULT_SMALL_BLIND,
            big_blind: DEFAULT_BIG_BLIND,
            max_players: DEFAULT_MAX_PLAYERS,
            turn_timeout_secs: DEFAULT_TURN_TIMEOUT_SECS,
            inter_hand_delay_ms: DEFAULT_INTER_HAND_DELAY_MS,
        }
    }
}

impl RoomConfig {
    /// Validate configuration before a room is created.
    pub fn validate(&self) -> Result<(), String> {
        if self.small_blind == 0 || self.big_blind == 0 {
            return Err("blinds must be positive".to_string());
        }
        if self.big_blind < self.small_blind {
            return Err("big blind must be at least the small blind".to_string());
        }
        if self.initial_chips < self.big_blind {
            return Err("initial chips must cover the big blind".to_string());
        }
        if !(MIN_PLAYERS_TO_START..=MAX_SEATS).contains(&self.max_players) {
            return Err(format!(
                "max players must be between {MIN_PLAYERS_TO_START} and {MAX_SEATS}"
            ));
        }
        if self.turn_timeout_secs == 0 {
            return Err("turn timeout must be positive".to_string());
        }
        Ok(())
    }
}

/// Optional per-field overrides supplied on room creation. Unset fields
/// fall back to the server defaults.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RoomOverrides {
    pub initial_chips: Option<Chips>,
    pub small_blind: Option<Chips>,
    pub big_blind: Option<Chips>,
    pub max_players: Option<usize>,
    pub turn_timeout_secs: Option<u64>,
    pub inter_hand_delay_ms: Option<u64>,
}

impl RoomOverrides {
    pub fn apply(&self, base: &RoomConfig) -> RoomConfig {
        RoomConfig {
            initial_chips: self.initial_chips.unwrap_or(base.initial_chips),
            small_blind: self.small_blind.unwrap_or(base.small_blind),
            big_blind: self.big_blind.unwrap_or(base.big_blind),
            max_players: self.max_players.unwrap_or(base.max_players),
            turn_timeout_secs: self.turn_timeout_secs.unwrap_or(base.turn_timeout_secs),
            inter_hand_delay_ms: self.inter_hand_delay_ms.unwrap_or(base.inter_hand_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RoomConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_blinds() {
        let config = RoomConfig {
            small_blind: 0,
            ..RoomConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_blinds() {
        let config = RoomConfig {
            small_blind: 20,
            big_blind: 10,
            ..RoomConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_table_size() {
        for max_players in [0, 1, 10] {
            let config = RoomConfig {
                max_players,
                ..RoomConfig::default()
            };
            assert!(config.validate().is_err(), "{max_players} seats accepted");
        }
    }

    #[test]
    fn test_overrides_apply_partially() {
        let overrides = RoomOverrides {
            big_blind: Some(20),
            small_blind: Some(10),
            max_players: Some(9),
            ..RoomOverrides::default()
        };
        let config = overrides.apply(&RoomConfig::default());
        assert_eq!(config.big_blind, 20);
        assert_eq!(config.small_blind, 10);
        assert_eq!(config.max_players, 9);
        assert_eq!(config.initial_chips, DEFAULT_INITIAL_CHIPS);
        assert_eq!(config.turn_timeout_secs, DEFAULT_TURN_TIMEOUT_SECS);
    }

    #[test]
    fn test_overrides_round_trip_from_json() {
        let json = r#"{"big_blind": 50, "small_blind": 25}"#;
        let overrides: RoomOverrides = serde_json::from_str(json).unwrap();
        let config = overrides.apply(&RoomConfig::default());
        assert_eq!(config.big_blind, 50);
        assert_eq!(config.max_players, DEFAULT_MAX_PLAYERS);
    }
}
