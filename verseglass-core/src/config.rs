use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// Spotify OAuth client ID (PKCE flow, no secret needed)
    pub client_id: String,
    #[serde(default = "default_redirect_uri")]
    pub oauth_redirect_uri: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_redirect_uri() -> String {
    "http://127.0.0.1:5000/callback".into()
}

const fn default_poll_interval() -> u64 {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Local extrapolation ticker interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

const fn default_tick_interval() -> u64 {
    50
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
        }
    }
}

/// Config file template written on first run
pub const CONFIG_TEMPLATE: &str = r#"[spotify]
# Get a client ID from https://developer.spotify.com/dashboard
# The redirect URI below must be registered for the app.
client_id = ""
oauth_redirect_uri = "http://127.0.0.1:5000/callback"
poll_interval_ms = 200

[sync]
tick_interval_ms = 50
"#;

impl Config {
    /// Load the config from a file, writing a template and failing with
    /// [`CoreError::ConfigNotFound`] when the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, fails to parse,
    /// or is missing required fields.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, CONFIG_TEMPLATE)?;
            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate that required fields are present.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or empty.
    pub fn validate(&self) -> Result<()> {
        if self.spotify.client_id.is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: "spotify.client_id".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_but_fails_validation() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert!(matches!(
            config.validate(),
            Err(CoreError::ConfigMissingField { .. })
        ));
    }

    #[test]
    fn test_defaults_applied() {
        let config: Config = toml::from_str("[spotify]\nclient_id = \"abc\"\n").unwrap();
        assert_eq!(config.spotify.oauth_redirect_uri, "http://127.0.0.1:5000/callback");
        assert_eq!(config.spotify.poll_interval_ms, 200);
        assert_eq!(config.sync.tick_interval_ms, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_writes_template_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let result = Config::load(&path);
        assert!(matches!(result, Err(CoreError::ConfigNotFound { .. })));
        assert!(path.exists());
    }

    #[test]
    fn test_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[spotify]\nclient_id = \"abc\"\npoll_interval_ms = 500\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.spotify.client_id, "abc");
        assert_eq!(config.spotify.poll_interval_ms, 500);
    }
}
