use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CraneBotError, Result};

/// Top-level configuration for CraneBot.
///
/// Loaded from `~/.cranebot/config.toml` by default. Every section falls back
/// to its defaults when absent, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CraneBotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl CraneBotConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CraneBotConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist, cannot be parsed, or fails validation.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.chat.validate()
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Chat widget and reply simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Lower bound (inclusive) of the simulated typing delay.
    pub reply_delay_min_ms: u64,
    /// Upper bound (exclusive) of the simulated typing delay.
    pub reply_delay_max_ms: u64,
    /// Maximum accepted message length in characters.
    pub max_message_length: usize,
    /// Post the welcome message when a session starts.
    pub greeting: bool,
    /// Whether the widget starts expanded.
    pub start_visible: bool,
    /// Capacity of the per-session event broadcast channel.
    pub event_buffer: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_delay_min_ms: 800,
            reply_delay_max_ms: 1800,
            max_message_length: 2000,
            greeting: true,
            start_visible: false,
            event_buffer: 64,
        }
    }
}

impl ChatConfig {
    pub fn reply_delay_min(&self) -> Duration {
        Duration::from_millis(self.reply_delay_min_ms)
    }

    pub fn reply_delay_max(&self) -> Duration {
        Duration::from_millis(self.reply_delay_max_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.reply_delay_min_ms > self.reply_delay_max_ms {
            return Err(CraneBotError::Config(format!(
                "chat.reply_delay_min_ms ({}) exceeds chat.reply_delay_max_ms ({})",
                self.reply_delay_min_ms, self.reply_delay_max_ms
            )));
        }
        if self.max_message_length == 0 {
            return Err(CraneBotError::Config(
                "chat.max_message_length must be greater than zero".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(CraneBotError::Config(
                "chat.event_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = CraneBotConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.chat.reply_delay_min_ms, 800);
        assert_eq!(config.chat.reply_delay_max_ms, 1800);
        assert_eq!(config.chat.max_message_length, 2000);
        assert!(config.chat.greeting);
        assert!(!config.chat.start_visible);
        assert_eq!(config.chat.event_buffer, 64);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[chat]
reply_delay_min_ms = 100
reply_delay_max_ms = 200
max_message_length = 500
greeting = false
start_visible = true
event_buffer = 8
"#;
        let file = create_temp_config(content);
        let config = CraneBotConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.chat.reply_delay_min(), Duration::from_millis(100));
        assert_eq!(config.chat.reply_delay_max(), Duration::from_millis(200));
        assert_eq!(config.chat.max_message_length, 500);
        assert!(!config.chat.greeting);
        assert!(config.chat.start_visible);
        assert_eq!(config.chat.event_buffer, 8);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[chat]
greeting = false
"#;
        let file = create_temp_config(content);
        let config = CraneBotConfig::load(file.path()).unwrap();
        assert!(!config.chat.greeting);
        // Remaining fields use defaults
        assert_eq!(config.chat.reply_delay_min_ms, 800);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = CraneBotConfig::load(file.path()).unwrap();
        assert_eq!(config.chat.reply_delay_max_ms, 1800);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        let result = CraneBotConfig::load(file.path());
        assert!(matches!(result, Err(CraneBotError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = CraneBotConfig::load(Path::new("/nonexistent/cranebot.toml"));
        assert!(matches!(result, Err(CraneBotError::Io(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = CraneBotConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.chat.reply_delay_min_ms, 800);
    }

    #[test]
    fn test_load_rejects_inverted_delay_bounds() {
        let content = r#"
[chat]
reply_delay_min_ms = 2000
reply_delay_max_ms = 1000
"#;
        let file = create_temp_config(content);
        let err = CraneBotConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("reply_delay_min_ms"));
    }

    #[test]
    fn test_load_or_default_falls_back_on_invalid_values() {
        let file = create_temp_config("[chat]\nevent_buffer = 0\n");
        let config = CraneBotConfig::load_or_default(file.path());
        assert_eq!(config.chat.event_buffer, 64);
    }

    #[test]
    fn test_validate_equal_delay_bounds_ok() {
        let mut config = CraneBotConfig::default();
        config.chat.reply_delay_min_ms = 500;
        config.chat.reply_delay_max_ms = 500;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_message_length() {
        let mut config = CraneBotConfig::default();
        config.chat.max_message_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = CraneBotConfig::default();
        config.chat.start_visible = true;
        config.save(&path).unwrap();

        let reloaded = CraneBotConfig::load(&path).unwrap();
        assert!(reloaded.chat.start_visible);
        assert_eq!(reloaded.chat.reply_delay_max_ms, 1800);
    }

    #[test]
    fn test_config_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("dir").join("config.toml");

        CraneBotConfig::default().save(&path).unwrap();

        assert!(path.exists());
        let reloaded = CraneBotConfig::load(&path).unwrap();
        assert_eq!(reloaded.general.log_level, "info");
    }
}
