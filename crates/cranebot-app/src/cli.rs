//! CLI argument definitions for the CraneBot shell.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use cranebot_core::config::CraneBotConfig;

/// CraneBot: an interactive predictive-maintenance chat assistant.
#[derive(Parser, Debug)]
#[command(name = "cranebot", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Start with the chat expanded.
    #[arg(long = "open")]
    pub open: bool,

    /// Skip the greeting message.
    #[arg(long = "no-greeting")]
    pub no_greeting: bool,

    /// Write the effective configuration to the config path and exit.
    #[arg(long = "init-config")]
    pub init_config: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CRANEBOT_CONFIG env var > ~/.cranebot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("CRANEBOT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Log filter that takes precedence over the config file.
    ///
    /// Priority: --log-level flag > RUST_LOG. `None` means the config file's
    /// `general.log_level` applies.
    pub fn log_filter_override(&self) -> Option<String> {
        if let Some(ref level) = self.log_level {
            return Some(level.clone());
        }
        std::env::var("RUST_LOG")
            .ok()
            .filter(|filter| !filter.trim().is_empty())
    }

    /// Apply flag overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut CraneBotConfig) {
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if self.open {
            config.chat.start_visible = true;
        }
        if self.no_greeting {
            config.chat.greeting = false;
        }
    }
}

fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".cranebot").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".cranebot").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::try_parse_from([
            "cranebot",
            "--config",
            "/tmp/cranebot.toml",
            "-l",
            "debug",
            "--open",
            "--no-greeting",
            "--init-config",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/cranebot.toml")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.open);
        assert!(args.no_greeting);
        assert!(args.init_config);
    }

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["cranebot"]).unwrap();
        assert!(args.config.is_none());
        assert!(!args.open);
        assert!(!args.no_greeting);
        assert!(!args.init_config);
    }

    #[test]
    fn test_config_flag_wins() {
        let args = CliArgs::try_parse_from(["cranebot", "-c", "explicit.toml"]).unwrap();
        assert_eq!(args.resolve_config_path(), PathBuf::from("explicit.toml"));
    }

    #[test]
    fn test_log_level_flag_wins() {
        let args = CliArgs::try_parse_from(["cranebot", "--log-level", "trace"]).unwrap();
        assert_eq!(args.log_filter_override().as_deref(), Some("trace"));
    }

    #[test]
    fn test_apply_overrides() {
        let args =
            CliArgs::try_parse_from(["cranebot", "--open", "--no-greeting", "-l", "warn"]).unwrap();
        let mut config = CraneBotConfig::default();
        args.apply_overrides(&mut config);
        assert!(config.chat.start_visible);
        assert!(!config.chat.greeting);
        assert_eq!(config.general.log_level, "warn");
    }

    #[test]
    fn test_no_flags_keep_file_values() {
        let args = CliArgs::try_parse_from(["cranebot"]).unwrap();
        let mut config = CraneBotConfig::default();
        config.chat.start_visible = true;
        args.apply_overrides(&mut config);
        assert!(config.chat.start_visible);
        assert!(config.chat.greeting);
        assert_eq!(config.general.log_level, "info");
    }
}
