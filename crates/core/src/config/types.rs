use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dispatch::DispatchConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub services: ServicesConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote console backend (split, protect, send)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServicesConfig {
    /// Backend base URL (e.g., "http://localhost:3600")
    pub base_url: String,
    /// HTTP request timeout in seconds (default: 30)
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
}

fn default_service_timeout() -> u64 {
    30
}

/// Scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Countdown refresh interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
        }
    }
}

fn default_tick_interval() -> u64 {
    1000
}

/// Persistent slot storage
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("fiche.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
[services]
base_url = "http://localhost:3600"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.services.timeout_secs, 30);
        assert_eq!(config.scheduler.tick_interval_ms, 1000);
        assert_eq!(config.storage.path, PathBuf::from("fiche.db"));
        assert_eq!(config.dispatch.pacing_delay_ms, 300);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
[services]
base_url = "https://console.example.com"
timeout_secs = 5

[dispatch]
pacing_delay_ms = 0
call_timeout_secs = 12
default_recipient_address = "rh@example.com"

[scheduler]
tick_interval_ms = 250

[storage]
path = "/var/lib/fiche/slots.db"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.services.timeout_secs, 5);
        assert_eq!(config.dispatch.pacing_delay_ms, 0);
        assert_eq!(config.dispatch.call_timeout_secs, 12);
        assert_eq!(config.dispatch.default_recipient_address, "rh@example.com");
        assert_eq!(config.scheduler.tick_interval_ms, 250);
    }

    #[test]
    fn test_deserialize_missing_services_fails() {
        let toml = r#"
[scheduler]
tick_interval_ms = 500
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
