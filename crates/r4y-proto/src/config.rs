use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::params::{AudioFormat, DEFAULT_AUDIO_FORMAT, DEFAULT_LIMIT};
use super::platform;

/// Env var overriding `catalog.client_id`.
pub const CATALOG_CLIENT_ID_ENV: &str = "JAMENDO_CLIENT_ID";
/// Env var overriding `broadcast.token`.
pub const BROADCAST_TOKEN_ENV: &str = "RADIOFRANCE_API_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Music catalog (Jamendo) access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_api_base")]
    pub api_base: String,
    /// Client credential.  Playback of the catalog is impossible without it.
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_audio_format")]
    pub default_audio_format: AudioFormat,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Broadcast schedule / live-stream API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_broadcast_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Station identifier as the query language spells it.
    #[serde(default = "default_station")]
    pub station: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Volume used when no preference has been stored yet.
    #[serde(default = "default_live_volume")]
    pub default_volume: f32,
    /// How often the now-airing highlight is recomputed.
    #[serde(default = "default_schedule_tick_secs")]
    pub schedule_tick_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_volume")]
    pub default_volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where the listener preferences are written.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base: default_catalog_api_base(),
            client_id: None,
            default_limit: default_limit(),
            default_audio_format: default_audio_format(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            endpoint: default_broadcast_endpoint(),
            token: None,
            station: default_station(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            default_volume: default_live_volume(),
            schedule_tick_secs: default_schedule_tick_secs(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_player_volume(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

fn default_catalog_api_base() -> String {
    "https://api.jamendo.com/v3.0".to_string()
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

fn default_audio_format() -> AudioFormat {
    DEFAULT_AUDIO_FORMAT
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_broadcast_endpoint() -> String {
    "https://openapi.radiofrance.fr/v1/graphql".to_string()
}

fn default_station() -> String {
    "FRANCEINTER".to_string()
}

fn default_live_volume() -> f32 {
    0.8
}

fn default_schedule_tick_secs() -> u64 {
    30
}

fn default_player_volume() -> f32 {
    0.3
}

fn default_state_file() -> PathBuf {
    platform::data_dir().join("state.json")
}

impl Config {
    /// Load `config.toml`, writing defaults on first run, then apply
    /// credential overrides from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        let mut config = if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            config
        } else {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Non-empty env values win over the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(id) = non_empty(CATALOG_CLIENT_ID_ENV) {
            self.catalog.client_id = Some(id);
        }
        if let Some(token) = non_empty(BROADCAST_TOKEN_ENV) {
            self.broadcast.token = Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.catalog.api_base.starts_with("https://"));
        assert_eq!(config.catalog.default_limit, 30);
        assert_eq!(config.catalog.default_audio_format, AudioFormat::Mp32);
        assert!(config.catalog.client_id.is_none());
        assert_eq!(config.broadcast.station, "FRANCEINTER");
        assert_eq!(config.live.default_volume, 0.8);
        assert_eq!(config.player.default_volume, 0.3);
        assert!(config.paths.state_file.ends_with("r4y/state.json"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [catalog]
            client_id = "abc123"

            [live]
            schedule_tick_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog.client_id.as_deref(), Some("abc123"));
        assert_eq!(config.catalog.default_limit, 30);
        assert_eq!(config.live.schedule_tick_secs, 5);
        assert_eq!(config.live.default_volume, 0.8);
        assert!(config.broadcast.token.is_none());
    }

    #[test]
    fn test_env_overrides_credentials() {
        let mut config = Config::default();
        config.catalog.client_id = Some("from-file".to_string());
        config.apply_env_overrides(|key| match key {
            CATALOG_CLIENT_ID_ENV => Some("from-env".to_string()),
            BROADCAST_TOKEN_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.catalog.client_id.as_deref(), Some("from-env"));
        assert!(config.broadcast.token.is_none());
    }
}
