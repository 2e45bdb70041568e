//! Configuration system for sessionlink
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (SESSIONLINK_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::channel::{ChannelSettings, RetryPolicy};
use crate::error::{Error, Result};

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Session defaults
    pub session: SessionSettings,

    /// Server connection settings
    pub server: ServerSettings,

    /// Reconnection policy settings
    pub retry: RetrySettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Session defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Default session identifier (generated per run if not set).
    /// Must be path-safe; it is inserted verbatim into the endpoint path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server base URL (ws:// or wss://)
    pub url: String,

    /// Path prefix the session id is appended to
    pub path_prefix: String,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

/// Reconnection policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Base reconnect delay in milliseconds (doubled on each attempt)
    pub base_delay_ms: u64,

    /// Maximum reconnection attempts before giving up
    pub max_attempts: u32,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            server: ServerSettings::default(),
            retry: RetrySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { id: None }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000".to_string(),
            path_prefix: "/ws".to_string(),
            connect_timeout_ms: 30000,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_attempts: 5,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl ClientConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        let config_file = Self::find_config_file(config_path)?;
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
            config = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let expanded = shellexpand::tilde(path);
            let path = PathBuf::from(expanded.as_ref());
            if path.exists() {
                return Ok(Some(path));
            } else {
                return Err(Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            PathBuf::from("sessionlink.toml"),
            PathBuf::from("config.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("sessionlink").join("client.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".sessionlink").join("client.toml"))
                .unwrap_or_default(),
            // System config (Linux)
            PathBuf::from("/etc/sessionlink/client.toml"),
        ];

        for path in &search_paths {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Session settings
        if let Ok(val) = std::env::var("SESSIONLINK_SESSION_ID") {
            self.session.id = Some(val);
        }

        // Server settings
        if let Ok(val) = std::env::var("SESSIONLINK_SERVER_URL") {
            self.server.url = val;
        }
        if let Ok(val) = std::env::var("SESSIONLINK_PATH_PREFIX") {
            self.server.path_prefix = val;
        }
        if let Ok(val) = std::env::var("SESSIONLINK_CONNECT_TIMEOUT_MS") {
            if let Ok(n) = val.parse() {
                self.server.connect_timeout_ms = n;
            }
        }

        // Retry settings
        if let Ok(val) = std::env::var("SESSIONLINK_RETRY_BASE_DELAY_MS") {
            if let Ok(n) = val.parse() {
                self.retry.base_delay_ms = n;
            }
        }
        if let Ok(val) = std::env::var("SESSIONLINK_MAX_RECONNECT_ATTEMPTS") {
            if let Ok(n) = val.parse() {
                self.retry.max_attempts = n;
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("SESSIONLINK_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("SESSIONLINK_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("SESSIONLINK_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate server URL
        if self.server.url.is_empty() {
            return Err(Error::Config("Server URL cannot be empty".to_string()));
        }
        if !self.server.url.starts_with("ws://") && !self.server.url.starts_with("wss://") {
            return Err(Error::Config(
                "Server URL must start with ws:// or wss://".to_string(),
            ));
        }

        // Validate path prefix
        if !self.server.path_prefix.starts_with('/') {
            return Err(Error::Config(
                "path_prefix must start with '/'".to_string(),
            ));
        }

        // Validate retry policy
        if self.retry.base_delay_ms == 0 {
            return Err(Error::Config(
                "base_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config(
                "max_attempts must be greater than zero".to_string(),
            ));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Build the channel settings handed to the connection manager
    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            server_url: self.server.url.clone(),
            path_prefix: self.server.path_prefix.clone(),
            connect_timeout: Duration::from_millis(self.server.connect_timeout_ms),
            retry: RetryPolicy {
                base_delay: Duration::from_millis(self.retry.base_delay_ms),
                max_attempts: self.retry.max_attempts,
            },
        }
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<()> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".sessionlink")
                .join("client.toml")
        });

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }

    // Generate default config with comments
    let config_content = generate_default_config();

    // Write the file
    fs::write(&config_path, config_content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

    println!("Configuration file created: {}", config_path.display());
    Ok(())
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# sessionlink Configuration
# https://github.com/sessionlink/sessionlink

[session]
# Default session identifier (generated per run if not set).
# Must be path-safe; it is inserted verbatim into the endpoint path.
# id = "abc123"

[server]
# Server base URL
url = "ws://localhost:8000"

# Path prefix the session id is appended to:
# the channel endpoint is <url><path_prefix>/<session_id>
path_prefix = "/ws"

# Connection timeout in milliseconds
connect_timeout_ms = 30000

[retry]
# Base reconnect delay in milliseconds (doubled on each attempt)
base_delay_ms = 1000

# Maximum reconnection attempts before giving up
max_attempts = 5

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.sessionlink/logs/client.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.server.url, "ws://localhost:8000");
        assert_eq!(config.server.path_prefix, "/ws");
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_override() {
        // Set env vars
        env::set_var("SESSIONLINK_SERVER_URL", "wss://test.example.com");
        env::set_var("SESSIONLINK_MAX_RECONNECT_ATTEMPTS", "3");
        env::set_var("SESSIONLINK_LOG_LEVEL", "debug");

        let mut config = ClientConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.server.url, "wss://test.example.com");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.logging.level, "debug");

        // Cleanup
        env::remove_var("SESSIONLINK_SERVER_URL");
        env::remove_var("SESSIONLINK_MAX_RECONNECT_ATTEMPTS");
        env::remove_var("SESSIONLINK_LOG_LEVEL");
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut config = ClientConfig::default();
        config.server.url = "http://invalid.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_path_prefix() {
        let mut config = ClientConfig::default();
        config.server.path_prefix = "ws".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_base_delay() {
        let mut config = ClientConfig::default();
        config.retry.base_delay_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = ClientConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_path_expansion() {
        let mut config = ClientConfig::default();
        config.logging.file = Some("~/logs/client.log".to_string());
        config.expand_paths();

        // Should not contain ~
        assert!(!config.logging.file.unwrap().contains('~'));
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = ClientConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: ClientConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.server.url, parsed.server.url);
        assert_eq!(config.retry.max_attempts, parsed.retry.max_attempts);
    }

    #[test]
    fn test_parse_config_file() {
        let config_str = r#"
[session]
id = "abc123"

[server]
url = "wss://custom.example.com"
path_prefix = "/channels"

[retry]
base_delay_ms = 500
max_attempts = 8

[logging]
level = "debug"
"#;

        let config: ClientConfig = toml::from_str(config_str).unwrap();

        assert_eq!(config.session.id, Some("abc123".to_string()));
        assert_eq!(config.server.url, "wss://custom.example.com");
        assert_eq!(config.server.path_prefix, "/channels");
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.retry.max_attempts, 8);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_channel_settings() {
        let config = ClientConfig::default();
        let settings = config.channel_settings();

        assert_eq!(settings.server_url, "ws://localhost:8000");
        assert_eq!(settings.connect_timeout, Duration::from_secs(30));
        assert_eq!(settings.retry.base_delay, Duration::from_millis(1000));
        assert_eq!(settings.retry.max_attempts, 5);
    }
}
