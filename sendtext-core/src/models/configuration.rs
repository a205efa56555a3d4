//! Configuration data structures

use crate::channel::resolver::extract_addresses;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding `slack.token`
pub const ENV_SLACK_TOKEN: &str = "SENDTEXT_SLACK_TOKEN";
/// Environment variable overriding `telegram.token`
pub const ENV_TELEGRAM_TOKEN: &str = "SENDTEXT_TELEGRAM_TOKEN";
/// Environment variable overriding `email.password`
pub const ENV_EMAIL_PASSWORD: &str = "SENDTEXT_EMAIL_PASSWORD";

/// Errors raised while loading or saving the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Logging level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

/// Email relay settings and defaults for the email channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmailSettings {
    /// HTTP mail relay endpoint that accepts a JSON message
    pub relay_url: String,
    pub username: String,
    pub password: String,
    pub from_addr: String,
    /// Recipients used when a request names none
    pub to_addrs: Vec<String>,
    /// Subject used when a request names none
    pub subject: String,
    pub enable_alert: bool,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            relay_url: String::new(),
            username: String::new(),
            password: String::new(),
            from_addr: String::new(),
            to_addrs: Vec::new(),
            subject: "Email from #sendtext".to_string(),
            enable_alert: false,
        }
    }
}

/// Slack bot settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SlackSettings {
    pub token: String,
    /// Channel used when a request names none
    pub channel: String,
    pub enable_alert: bool,
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel: "general".to_string(),
            enable_alert: false,
        }
    }
}

/// Telegram bot settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TelegramSettings {
    pub token: String,
    pub enable_alert: bool,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Logging verbosity level
    pub log_level: LogLevel,
    /// Server bind address
    pub server_host: String,
    /// Server port number
    pub server_port: u16,
    /// Folder for the embedded database files
    pub data_path: PathBuf,
    /// Timeout applied to every outbound provider call
    pub http_timeout_secs: u64,
    pub email: EmailSettings,
    pub slack: SlackSettings,
    pub telegram: TelegramSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        let data_path = dirs::data_dir()
            .map(|dir| dir.join("sendtext").join("data"))
            .unwrap_or_else(|| PathBuf::from("data"));
        Self {
            log_level: LogLevel::Info,
            server_host: "127.0.0.1".to_string(),
            server_port: 5000,
            data_path,
            http_timeout_secs: 30,
            email: EmailSettings::default(),
            slack: SlackSettings::default(),
            telegram: TelegramSettings::default(),
        }
    }
}

impl Configuration {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
        } else {
            // Return default configuration if file doesn't exist
            Ok(Configuration::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, content).map_err(io_err)?;
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("sendtext").join("config.toml"))
    }

    /// Overlay secrets supplied through the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay secrets from an arbitrary lookup; empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(token) = lookup(ENV_SLACK_TOKEN) {
            self.slack.token = token;
        }
        if let Some(token) = lookup(ENV_TELEGRAM_TOKEN) {
            self.telegram.token = token;
        }
        if let Some(password) = lookup(ENV_EMAIL_PASSWORD) {
            self.email.password = password;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.http_timeout_secs == 0 || self.http_timeout_secs > 300 {
            errors.push("http_timeout_secs must be between 1 and 300".to_string());
        }

        // Validate port (u16 is already 0-65535, so only check minimum)
        if self.server_port < 1024 {
            errors.push(
                "server_port must be at least 1024 (privileged ports not allowed)".to_string(),
            );
        }

        for addr in &self.email.to_addrs {
            if extract_addresses(addr) != [addr.as_str()] {
                errors.push(format!("email.to_addrs contains a malformed address: {}", addr));
            }
        }

        if !self.email.from_addr.is_empty()
            && extract_addresses(&self.email.from_addr) != [self.email.from_addr.as_str()]
        {
            errors.push("email.from_addr is not a valid address".to_string());
        }

        if self.slack.channel.trim().is_empty() {
            errors.push("slack.channel cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
