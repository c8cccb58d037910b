// Configuration module for the Pong client

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::banner::Language;
use crate::core::input::KeyBindings;
use crate::core::types::RenderMode;

// =============================================================================
// CONFIGURATION STRUCTURES
// =============================================================================

/// Pong web server and session credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base URL, e.g. "https://pong.example.org". WebSocket URLs derive from it.
    #[serde(default = "default_url")]
    pub url: String,
    /// Value of the `sessionid` cookie of a logged-in user
    #[serde(default)]
    pub session_cookie: String,
    /// Value sent as `X-CSRFToken` and as the `csrftoken` cookie
    #[serde(default)]
    pub csrf_token: String,
    /// Timeout of each HTTP request in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            session_cookie: String::new(),
            csrf_token: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServerSettings {
    /// `Cookie` header carrying the session and CSRF cookies, if any are set
    pub fn cookie_header(&self) -> Option<String> {
        let mut cookies = Vec::new();
        if !self.session_cookie.is_empty() {
            cookies.push(format!("sessionid={}", self.session_cookie));
        }
        if !self.csrf_token.is_empty() {
            cookies.push(format!("csrftoken={}", self.csrf_token));
        }
        (!cookies.is_empty()).then(|| cookies.join("; "))
    }
}

/// Renderer selection
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenderSettings {
    /// "2d" or "3d"; a change applies to the next game
    #[serde(default)]
    pub mode: RenderMode,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingSettings {
    /// Write logs to stdout
    #[serde(default)]
    pub console: bool,
    /// Log file path (relative to the config directory or absolute). Empty = no file logging.
    #[serde(default)]
    pub log_file: String,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub keybindings: KeyBindings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

// =============================================================================
// CONFIG LOADING
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config file path")]
    PathError,
    #[error("Failed to read config file: {0}")]
    ReadError(#[source] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[source] toml::de::Error),
}

impl ClientConfig {
    pub const CONFIG_FILENAME: &'static str = "pong_client.toml";

    /// Directory of the running executable
    pub fn config_directory() -> Option<PathBuf> {
        std::env::current_exe()
            .ok()?
            .parent()
            .map(|p| p.to_path_buf())
    }

    /// Load configuration from the file next to the executable, or defaults
    pub fn load() -> Result<Self, ConfigError> {
        let dir = Self::config_directory().ok_or(ConfigError::PathError)?;
        Self::load_from(&dir.join(Self::CONFIG_FILENAME))
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "[config] Looking for config");

        if !path.exists() {
            debug!("[config] No config found, using defaults");
            return Ok(ClientConfig::default());
        }

        let contents = fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config = Self::parse(&contents)?;
        info!(path = %path.display(), "[config] Loaded config");
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(ConfigError::ParseError)
    }

    /// Resolve the log file path against `base_dir`
    pub fn log_file_path(&self, base_dir: &Path) -> Option<PathBuf> {
        if self.logging.log_file.is_empty() {
            return None;
        }
        let path = PathBuf::from(&self.logging.log_file);
        Some(if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ClientConfig::parse("").unwrap();
        assert_eq!(config.server.url, "http://localhost:8000");
        assert_eq!(config.server.request_timeout_ms, 10_000);
        assert_eq!(config.render.mode, RenderMode::Flat);
        assert_eq!(config.language, Language::En);
        assert_eq!(config.keybindings, KeyBindings::default());
    }

    #[test]
    fn test_full_config() {
        let config = ClientConfig::parse(
            r#"
            language = "es"

            [server]
            url = "https://pong.example.org"
            session_cookie = "abc"
            csrf_token = "tok"

            [render]
            mode = "3d"

            [keybindings]
            online_up = ["w"]

            [logging]
            console = true
            log_file = "pong_client.log"
            "#,
        )
        .unwrap();
        assert_eq!(config.language, Language::Es);
        assert_eq!(config.render.mode, RenderMode::Scene);
        assert_eq!(config.keybindings.online_up, vec!["w".to_string()]);
        assert_eq!(config.keybindings.online_down, vec!["ArrowDown".to_string()]);
        assert!(config.logging.console);
        assert_eq!(
            config.log_file_path(Path::new("/opt/pong")),
            Some(PathBuf::from("/opt/pong/pong_client.log"))
        );
    }

    #[test]
    fn test_cookie_header() {
        let mut server = ServerSettings::default();
        assert_eq!(server.cookie_header(), None);
        server.session_cookie = "abc".to_string();
        server.csrf_token = "tok".to_string();
        assert_eq!(
            server.cookie_header().as_deref(),
            Some("sessionid=abc; csrftoken=tok")
        );
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        assert!(matches!(
            ClientConfig::parse("[server"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = ClientConfig::load_from(Path::new("/nonexistent/pong_client.toml")).unwrap();
        assert!(config.server.session_cookie.is_empty());
    }

    #[test]
    fn test_no_log_file() {
        let config = ClientConfig::default();
        assert_eq!(config.log_file_path(Path::new("/tmp")), None);
    }
}
