use crate::health::Policy;
use crate::render::OutputFormat;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub disk_threshold_pct: u8,
    pub ping_target: String,
    pub services: Vec<String>,
    pub format: OutputFormat,
    #[serde(with = "duration_str")]
    pub command_timeout: Duration,
    pub ping_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disk_threshold_pct: default_disk_threshold_pct(),
            ping_target: default_ping_target(),
            services: default_services(),
            format: OutputFormat::default(),
            command_timeout: default_command_timeout(),
            ping_timeout_secs: default_ping_timeout_secs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    /// Parses a YAML file. Callers validate once flags and env are applied on top.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.disk_threshold_pct > 100 {
            return Err(ConfigError::Validation(
                "disk_threshold_pct must be in 0..100".to_string(),
            ));
        }
        if self.ping_target.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ping_target must not be empty".to_string(),
            ));
        }
        if self.ping_target.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "ping_target '{}' must be a single host or address",
                self.ping_target
            )));
        }
        for service in &self.services {
            if service.trim().is_empty() || service.chars().any(char::is_whitespace) {
                return Err(ConfigError::Validation(format!(
                    "service name '{}' must be a single non-empty unit name",
                    service
                )));
            }
        }
        if self.command_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "command_timeout must be > 0".to_string(),
            ));
        }
        if self.ping_timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "ping_timeout_secs must be >= 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn policy(&self) -> Policy {
        Policy {
            disk_threshold_pct: self.disk_threshold_pct,
            ping_target: self.ping_target.clone(),
            services: self.services.clone(),
        }
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

/// Splits a whitespace-separated unit list such as `CHECK_SERVICES`.
pub fn parse_service_list(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

const fn default_disk_threshold_pct() -> u8 {
    85
}

fn default_ping_target() -> String {
    "8.8.8.8".to_string()
}

fn default_services() -> Vec<String> {
    parse_service_list("ssh systemd-journald cron")
}

const fn default_command_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_ping_timeout_secs() -> u64 {
    2
}

mod duration_str {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.disk_threshold_pct, 85);
        assert_eq!(cfg.ping_target, "8.8.8.8");
        assert_eq!(cfg.services, vec!["ssh", "systemd-journald", "cron"]);
        assert_eq!(cfg.format, OutputFormat::Json);
        assert_eq!(cfg.ping_timeout_secs, 2);
        cfg.validate().expect("defaults must be valid");
    }

    #[test]
    fn example_yaml_is_loadable() {
        let cfg: Config =
            serde_yaml::from_str(Config::example_yaml()).expect("example must parse");
        cfg.validate().expect("example must be valid");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: Config = serde_yaml::from_str(
            "disk_threshold_pct: 70\nservices: [nginx]\ncommand_timeout: 1m 30s\n",
        )
        .expect("partial config must parse");
        assert_eq!(cfg.disk_threshold_pct, 70);
        assert_eq!(cfg.services, vec!["nginx"]);
        assert_eq!(cfg.command_timeout, Duration::from_secs(90));
        assert_eq!(cfg.ping_target, "8.8.8.8");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = serde_yaml::from_str::<Config>("disk_treshold_pct: 70\n");
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::load_from_file("/nonexistent/hostcheck.yaml").expect_err("must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn file_values_are_validated_after_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hostcheck.yaml");
        fs::write(&path, "ping_target: \"\"\ndisk_threshold_pct: 90\n").expect("write config");

        let mut cfg = Config::load_from_file(&path).expect("file loads before validation");
        assert_eq!(cfg.disk_threshold_pct, 90);
        assert!(cfg.validate().is_err());

        cfg.ping_target = "1.1.1.1".to_string();
        cfg.validate().expect("override fixes the file value");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hostcheck.yaml");
        fs::write(&path, "services: [ssh\n").expect("write config");

        let err = Config::load_from_file(&path).expect_err("must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.disk_threshold_pct = 101;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.ping_target = "  ".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.services = vec!["ssh cron".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.command_timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_service_list_is_valid() {
        let mut cfg = Config::default();
        cfg.services = parse_service_list("   ");
        assert!(cfg.services.is_empty());
        cfg.validate().expect("no services is allowed");
    }

    #[test]
    fn service_list_splits_on_any_whitespace() {
        assert_eq!(
            parse_service_list(" ssh\tcron\n nginx "),
            vec!["ssh", "cron", "nginx"]
        );
    }
}
