use crate::core::merge::MetadataSource;
use crate::providers::coinmarketcap::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf, time::Duration};
use tracing::{debug, warn};

pub const API_KEY_ENV: &str = "COIN_MARKET_CAP_API_KEY";
pub const WEBHOOK_URL_ENV: &str = "SLACK_HOOK_URL";
pub const NOTIFICATIONS_ENABLED_ENV: &str = "NOTIFICATIONS_ENABLED";
pub const PORT_ENV: &str = "PORT";
pub const CRON_ENV: &str = "CRON_SCHEDULE";

#[derive(Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub metadata_source: MetadataSource,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("metadata_source", &self.metadata_source)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: Some(30),
            metadata_source: MetadataSource::Map,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Six-field cron expression (seconds first), evaluated in UTC.
    pub cron: String,
    /// When set, overrides `cron` with a run every N minutes, counted from
    /// scheduler start.
    pub every_minutes: Option<u32>,
}

/// How often the digest job fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cadence {
    Cron(String),
    Every(Duration),
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            cron: "0 0 14 * * *".to_string(),
            every_minutes: None,
        }
    }
}

impl ScheduleConfig {
    /// A fixed interval rather than a cron minute step, since `*/N` restarts
    /// every hour and only fires on schedule when N divides 60.
    pub fn cadence(&self) -> Cadence {
        match self.every_minutes {
            Some(n) if n > 0 => Cadence::Every(Duration::from_secs(u64::from(n) * 60)),
            _ => Cadence::Cron(self.cron.clone()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DigestConfig {
    pub max_assets: usize,
    pub view_more_url: String,
}

impl Default for DigestConfig {
    fn default() -> Self {
        DigestConfig {
            max_assets: 10,
            view_more_url: "https://athdiff.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub server: ServerConfig,
    pub schedule: ScheduleConfig,
    pub digest: DigestConfig,
    pub notifications: NotificationsConfig,
    pub tracked_assets_path: Option<String>,
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    /// Loads the default config file if there is one, otherwise built-in
    /// defaults. Environment overrides are applied either way.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "athdiff", "athdiff")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Loads an explicit config file and applies environment overrides.
    pub fn load_with_env<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let mut config = Self::load_from_path(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_ENV) {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = lookup(WEBHOOK_URL_ENV) {
            self.notifications.webhook_url = Some(url);
        }
        if let Some(raw) = lookup(NOTIFICATIONS_ENABLED_ENV) {
            match parse_flag(&raw) {
                Some(enabled) => self.notifications.enabled = enabled,
                None => warn!("Ignoring invalid {}: {}", NOTIFICATIONS_ENABLED_ENV, raw),
            }
        }
        if let Some(raw) = lookup(PORT_ENV) {
            match raw.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid {}: {}", PORT_ENV, raw),
            }
        }
        if let Some(cron) = lookup(CRON_ENV) {
            self.schedule.cron = cron;
            self.schedule.every_minutes = None;
        }
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
provider:
  base_url: "http://localhost:9000/v1"
  api_key: "abc"
  metadata_source: info
schedule:
  every_minutes: 15
digest:
  max_assets: 5
  view_more_url: "https://example.com"
notifications:
  enabled: true
  webhook_url: "https://hooks.example.com/T000"
tracked_assets_path: "/tmp/ath.json"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.provider.base_url, "http://localhost:9000/v1");
        assert_eq!(config.provider.api_key.as_deref(), Some("abc"));
        assert_eq!(config.provider.metadata_source, MetadataSource::Info);
        assert_eq!(config.provider.timeout_secs, Some(30));
        assert_eq!(config.server.bind_address(), "0.0.0.0:3001");
        assert_eq!(
            config.schedule.cadence(),
            Cadence::Every(Duration::from_secs(15 * 60))
        );
        assert_eq!(config.digest.max_assets, 5);
        assert!(config.notifications.enabled);
        assert_eq!(config.tracked_assets_path.as_deref(), Some("/tmp/ath.json"));
        assert!(!format!("{config:?}").contains("abc"));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(
            config.schedule.cadence(),
            Cadence::Cron("0 0 14 * * *".to_string())
        );
        assert_eq!(config.digest.max_assets, 10);
        assert!(!config.notifications.enabled);
        assert!(config.notifications.webhook_url.is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let config: AppConfig =
            serde_yaml::from_str(include_str!("../../docs/example_config.yaml")).unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.provider.metadata_source, MetadataSource::Map);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (API_KEY_ENV, "from-env"),
            (WEBHOOK_URL_ENV, "https://hooks.example.com/env"),
            (NOTIFICATIONS_ENABLED_ENV, "true"),
            (PORT_ENV, "8080"),
            (CRON_ENV, "0 30 9 * * *"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.provider.api_key.as_deref(), Some("from-env"));
        assert_eq!(
            config.notifications.webhook_url.as_deref(),
            Some("https://hooks.example.com/env")
        );
        assert!(config.notifications.enabled);
        assert_eq!(config.server.port, 8080);
        assert_eq!(
            config.schedule.cadence(),
            Cadence::Cron("0 30 9 * * *".to_string())
        );
    }

    #[test]
    fn test_cron_env_overrides_file_interval() {
        let mut config: AppConfig =
            serde_yaml::from_str("schedule:\n  every_minutes: 30\n").unwrap();
        config.apply_overrides(|k| (k == CRON_ENV).then(|| "0 0 8 * * *".to_string()));

        assert_eq!(config.schedule.every_minutes, None);
        assert_eq!(
            config.schedule.cadence(),
            Cadence::Cron("0 0 8 * * *".to_string())
        );
    }

    #[test]
    fn test_interval_longer_than_an_hour() {
        let schedule = ScheduleConfig {
            every_minutes: Some(90),
            ..Default::default()
        };
        assert_eq!(
            schedule.cadence(),
            Cadence::Every(Duration::from_secs(90 * 60))
        );

        let zero = ScheduleConfig {
            every_minutes: Some(0),
            ..Default::default()
        };
        assert_eq!(zero.cadence(), Cadence::Cron("0 0 14 * * *".to_string()));
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|k| match k {
            PORT_ENV => Some("not-a-port".to_string()),
            NOTIFICATIONS_ENABLED_ENV => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 3001);
        assert!(!config.notifications.enabled);
    }
}
