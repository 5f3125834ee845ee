use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

// ---------------------------------------------------------------------------
// Logging config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub to_file: bool,
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            to_file: false,
            dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Brain (persistence) config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BrainConfig {
    /// Directory for the JSON store; defaults to `<config dir>/brain`.
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Reminder defaults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersConfig {
    /// IANA timezone reminders are interpreted in when the request carries
    /// no explicit timezone, e.g. "Europe/Berlin".
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_store_key")]
    pub store_key: String,
}

fn default_timezone() -> String {
    "UTC".into()
}
fn default_store_key() -> String {
    "jobs".into()
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            store_key: default_store_key(),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel configs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub console: ConsoleConfig,
}

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub brain: BrainConfig,
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

// ---------------------------------------------------------------------------
// Paths & loading
// ---------------------------------------------------------------------------

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nudgebot")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

pub fn brain_dir(cfg: &Config) -> PathBuf {
    cfg.brain
        .dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir().join("brain"))
}

pub fn log_dir_path(cfg: &Config) -> PathBuf {
    cfg.log
        .dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| config_dir().join("logs"))
}

/// Resolve the configured default timezone, falling back to UTC when the
/// name does not parse.
pub fn default_tz(cfg: &Config) -> chrono_tz::Tz {
    cfg.reminders.timezone.parse().unwrap_or_else(|_| {
        warn!(timezone = %cfg.reminders.timezone, "unknown timezone in config, using UTC");
        chrono_tz::Tz::UTC
    })
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let p = path.map(PathBuf::from).unwrap_or_else(config_path);

    if p.exists() {
        let text = std::fs::read_to_string(&p)
            .with_context(|| format!("reading config from {}", p.display()))?;
        let cfg: Config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config from {}", p.display()))?;
        Ok(cfg)
    } else {
        Ok(Config::default())
    }
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let p = path.map(PathBuf::from).unwrap_or_else(config_path);

    if let Some(parent) = p.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(cfg)?;
    std::fs::write(&p, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.reminders.timezone, "UTC");
        assert_eq!(cfg.reminders.store_key, "jobs");
        assert!(cfg.channels.console.enabled);
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut cfg = Config::default();
        cfg.reminders.timezone = "Europe/Berlin".into();
        save_config(&cfg, Some(&path)).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.reminders.timezone, "Europe/Berlin");
        assert_eq!(default_tz(&loaded), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let mut cfg = Config::default();
        cfg.reminders.timezone = "Mars/Olympus".into();
        assert_eq!(default_tz(&cfg), chrono_tz::Tz::UTC);
    }
}
