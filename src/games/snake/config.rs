use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Highest tick rate whose period is still a whole millisecond.
pub const MAX_TICK_RATE_HZ: u32 = 1000;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SnakeConfig {
    /// Board width in cells
    pub width: u32,
    /// Board height in cells
    pub height: u32,
    /// Simulation ticks per second
    pub tick_rate_hz: u32,
    /// Bots placed when a match is created
    pub initial_bots: usize,
    /// Human players admitted per match
    pub max_players: usize,
    /// Fixed RNG seed; random per match when absent
    pub seed: Option<u64>,
}

impl SnakeConfig {
    /// Rejects values the board or the tick timer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(invalid(
                "tick_rate_hz",
                format!("{} is outside 1..={}", self.tick_rate_hz, MAX_TICK_RATE_HZ),
            ));
        }

        for (field, size) in [("width", self.width), ("height", self.height)] {
            if size == 0 {
                return Err(invalid(field, "must be at least 1".to_string()));
            }
            // coordinates are i32
            if size > i32::MAX as u32 {
                return Err(invalid(field, format!("{} does not fit a coordinate", size)));
            }
        }

        if self.width.checked_mul(self.height).is_none() {
            return Err(invalid(
                "width",
                format!("{}x{} board has too many cells", self.width, self.height),
            ));
        }

        if self.max_players == 0 {
            return Err(invalid("max_players", "must be at least 1".to_string()));
        }

        Ok(())
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(1000 / self.tick_rate_hz.max(1) as u64)
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            width: 30,
            height: 20,
            tick_rate_hz: 3,
            initial_bots: 2,
            max_players: 2,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SnakeConfig::default();
        assert_eq!(config.width, 30);
        assert_eq!(config.height, 20);
        assert_eq!(config.tick_rate_hz, 3);
        assert_eq!(config.initial_bots, 2);
        assert_eq!(config.tick_duration(), Duration::from_millis(333));
    }

    #[test]
    fn test_zero_tick_rate_does_not_divide_by_zero() {
        let config = SnakeConfig {
            tick_rate_hz: 0,
            ..Default::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_millis(1000));
    }

    fn rejected_field(config: SnakeConfig) -> &'static str {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("Expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SnakeConfig::default().validate().is_ok());
        let fastest = SnakeConfig {
            tick_rate_hz: MAX_TICK_RATE_HZ,
            ..Default::default()
        };
        assert!(fastest.validate().is_ok());
        assert_eq!(fastest.tick_duration(), Duration::from_millis(1));
    }

    #[test]
    fn test_rejects_tick_rates_without_a_period() {
        for tick_rate_hz in [0, MAX_TICK_RATE_HZ + 1, 2000] {
            let config = SnakeConfig {
                tick_rate_hz,
                ..Default::default()
            };
            assert_eq!(rejected_field(config), "tick_rate_hz");
        }
    }

    #[test]
    fn test_rejects_empty_board() {
        let narrow = SnakeConfig {
            width: 0,
            ..Default::default()
        };
        assert_eq!(rejected_field(narrow), "width");

        let flat = SnakeConfig {
            height: 0,
            ..Default::default()
        };
        assert_eq!(rejected_field(flat), "height");
    }

    #[test]
    fn test_rejects_oversized_board() {
        let huge = SnakeConfig {
            width: 100_000,
            height: 100_000,
            ..Default::default()
        };
        assert_eq!(rejected_field(huge), "width");

        let tall = SnakeConfig {
            height: u32::MAX,
            ..Default::default()
        };
        assert_eq!(rejected_field(tall), "height");
    }

    #[test]
    fn test_rejects_zero_players() {
        let config = SnakeConfig {
            max_players: 0,
            ..Default::default()
        };
        assert_eq!(rejected_field(config), "max_players");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SnakeConfig = toml::from_str("width = 12\ninitial_bots = 0").unwrap();
        assert_eq!(config.width, 12);
        assert_eq!(config.height, 20);
        assert_eq!(config.initial_bots, 0);
        assert_eq!(config.seed, None);
    }
}
