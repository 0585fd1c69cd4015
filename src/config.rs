//! Server configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::games::snake::SnakeConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub snake: SnakeConfig,
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No {} found, using default config", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.snake.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Server networking settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Seconds of silence before a session is dropped.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session_timeout_secs: default_session_timeout(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:9000".to_string()
}
fn default_session_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.server.session_timeout_secs, 30);
        assert_eq!((config.snake.width, config.snake.height), (30, 20));
        assert_eq!(config.snake.initial_bots, 2);
        assert_eq!(config.snake.max_players, 2);
    }

    #[test]
    fn test_sections_override() {
        let config = Config::parse(
            r#"
            [server]
            bind = "0.0.0.0:7000"

            [snake]
            width = 12
            tick_rate_hz = 5
            seed = 99
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:7000");
        assert_eq!(config.server.session_timeout_secs, 30);
        assert_eq!(config.snake.width, 12);
        assert_eq!(config.snake.height, 20);
        assert_eq!(config.snake.tick_rate_hz, 5);
        assert_eq!(config.snake.seed, Some(99));
    }

    #[test]
    fn test_bad_toml_is_rejected() {
        assert!(Config::parse("[snake]\nwidth = \"wide\"").is_err());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let path = std::env::temp_dir().join(format!("snake-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[snake]\ntick_rate_hz = 2000\n").unwrap();

        let result = Config::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "tick_rate_hz", .. })
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load("definitely/not/here.toml").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("snake-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[snake]\ninitial_bots = 0\n").unwrap();

        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.snake.initial_bots, 0);
    }
}
