//! # Configuration Management Module
//!
//! TNC settings are read from a TOML file at startup. Every section has defaults so
//! a missing section or field falls back to the reference firmware values.
//!
//! ## Configuration Structure
//!
//! - [`TncConfig`] - KISS port and buffer sizes
//! - [`SerialConfig`] - host serial link
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Configuration File Format
//!
//! ```toml
//! [tnc]
//! kiss_port = 0
//! command_buffer_len = 500
//! reply_buffer_len = 500
//! poll_interval_ms = 10
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [logging]
//! level = "info"
//! file = "meshtnc.log"
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meshtnc::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("KISS port: {}", config.tnc.kiss_port);
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::TncError;
use crate::kiss::{Port, CMD_BUF_LEN_MAX};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tnc: TncConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TncConfig {
    /// Port this modem answers on (0-14). 15 is the global channel.
    #[serde(default)]
    pub kiss_port: u8,
    /// Size of the inbound command buffer. Frames longer than this minus one are
    /// dispatched truncated.
    #[serde(default = "default_buffer_len")]
    pub command_buffer_len: usize,
    /// Upper bound on the size of any frame written to the host.
    #[serde(default = "default_buffer_len")]
    pub reply_buffer_len: usize,
    /// Delay between serial polls (ms).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_buffer_len() -> usize {
    CMD_BUF_LEN_MAX
}

fn default_poll_interval_ms() -> u64 {
    10
}

impl Default for TncConfig {
    fn default() -> Self {
        Self {
            kiss_port: 0,
            command_buffer_len: default_buffer_len(),
            reply_buffer_len: default_buffer_len(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl TncConfig {
    pub fn port(&self) -> std::result::Result<Port, TncError> {
        Port::assignable(self.kiss_port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("meshtnc.log".to_string()),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or fall back to defaults when the file does not exist.
    ///
    /// Any other failure (unreadable file, bad TOML, failed validation) is returned.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        match fs::metadata(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            _ => Self::load(path).await,
        }
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), TncError> {
        self.tnc.port()?;
        if self.tnc.command_buffer_len < 3 {
            return Err(TncError::Config(format!(
                "command_buffer_len must be at least 3 (got {})",
                self.tnc.command_buffer_len
            )));
        }
        if self.tnc.reply_buffer_len < 3 {
            return Err(TncError::Config(format!(
                "reply_buffer_len must be at least 3 (got {})",
                self.tnc.reply_buffer_len
            )));
        }
        if self.serial.baud_rate == 0 {
            return Err(TncError::Config("baud_rate must be non-zero".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_firmware() {
        let config = Config::default();
        assert_eq!(config.tnc.kiss_port, 0);
        assert_eq!(config.tnc.command_buffer_len, 500);
        assert_eq!(config.serial.baud_rate, 115200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config: Config = toml::from_str("[tnc]\nkiss_port = 3\n").unwrap();
        assert_eq!(config.tnc.kiss_port, 3);
        assert_eq!(config.tnc.reply_buffer_len, 500);
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn rejects_global_port() {
        let mut config = Config::default();
        config.tnc.kiss_port = 15;
        assert!(matches!(config.validate(), Err(TncError::InvalidPort(15))));
    }

    #[test]
    fn rejects_tiny_buffers() {
        let mut config = Config::default();
        config.tnc.reply_buffer_len = 2;
        assert!(matches!(config.validate(), Err(TncError::Config(_))));
    }

    #[tokio::test]
    async fn default_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.tnc.poll_interval_ms, 10);
        assert_eq!(loaded.logging.file.as_deref(), Some("meshtnc.log"));
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load_or_default(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
    }

    #[tokio::test]
    async fn invalid_file_is_an_error_not_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(
            &path,
            "[tnc]\nkiss_port = 15\n[serial]\nport = \"/dev/ttyACM3\"\n",
        )
        .unwrap();
        let err = Config::load_or_default(path.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid kiss port: 15"), "{err}");
    }

    #[tokio::test]
    async fn unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[tnc\nkiss_port = ").unwrap();
        assert!(Config::load_or_default(path.to_str().unwrap())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn existing_file_keeps_its_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[tnc]\nkiss_port = 2\n[serial]\nport = \"/dev/ttyACM3\"\n",
        )
        .unwrap();
        let config = Config::load_or_default(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.tnc.kiss_port, 2);
        assert_eq!(config.serial.port, "/dev/ttyACM3");
        assert_eq!(config.serial.baud_rate, 115200);
    }
}
