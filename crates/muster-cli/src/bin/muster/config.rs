//! Layered configuration for the `muster` binary.
//!
//! Precedence, lowest to highest:
//!
//! 1. Environment variables (`MUSTER_*`, plus `GITHUB_REPOSITORY`)
//! 2. TOML file passed with `--config`
//! 3. Command-line flags
//!
//! Every layer is a [`MusterConfig`] whose unset fields are `None`; layers are
//! folded with [`MusterConfig::merge`] and defaults apply last.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use muster_barrier::BarrierConfig;
use muster_barrier::constants::DEFAULT_EXIT_DELAY_MS;
use muster_barrier::constants::DEFAULT_REQUIRED_COUNT;
use muster_barrier::constants::DEFAULT_ROOT_PATH;
use muster_core::path::validate_path;
use muster_etcd::DEFAULT_ETCD_ENDPOINT;
use muster_etcd::DEFAULT_SESSION_TTL_SECS;
use muster_etcd::EtcdConfig;
use serde::Deserialize;
use snafu::ResultExt;
use snafu::Snafu;

/// One configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MusterConfig {
    /// etcd endpoints.
    pub endpoints: Option<Vec<String>>,
    /// Session lease TTL in seconds.
    pub session_ttl_secs: Option<u64>,
    /// Barrier root path.
    pub root_path: Option<String>,
    /// Participants required to pass.
    pub required_count: Option<u32>,
    /// This participant's numeric contribution.
    pub participant_value: Option<f64>,
    /// Delay between passage and session close, in milliseconds.
    pub exit_delay_ms: Option<u64>,
    /// Origin identifier written into the payload.
    pub repository: Option<String>,
}

impl MusterConfig {
    /// Load a configuration layer from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        toml::from_str(&content).context(ParseTomlSnafu { path })
    }

    /// Load a configuration layer from the process environment.
    ///
    /// Variables follow `MUSTER_<FIELD_NAME>`. The origin identifier falls
    /// back to `GITHUB_REPOSITORY` so CI jobs need no extra setup.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
        Self {
            endpoints: parse("MUSTER_ENDPOINTS").map(|value| split_list(&value)),
            session_ttl_secs: parse("MUSTER_SESSION_TTL_SECS").and_then(|v| v.parse().ok()),
            root_path: parse("MUSTER_ROOT_PATH"),
            required_count: parse("MUSTER_REQUIRED_COUNT").and_then(|v| v.parse().ok()),
            participant_value: parse("MUSTER_PARTICIPANT_VALUE").and_then(|v| v.parse().ok()),
            exit_delay_ms: parse("MUSTER_EXIT_DELAY_MS").and_then(|v| v.parse().ok()),
            repository: lookup("MUSTER_REPOSITORY").or_else(|| lookup("GITHUB_REPOSITORY")),
        }
    }

    /// Overlay `other` on top of `self`. Fields set in `other` win.
    pub fn merge(&mut self, other: Self) {
        if other.endpoints.is_some() {
            self.endpoints = other.endpoints;
        }
        if other.session_ttl_secs.is_some() {
            self.session_ttl_secs = other.session_ttl_secs;
        }
        if other.root_path.is_some() {
            self.root_path = other.root_path;
        }
        if other.required_count.is_some() {
            self.required_count = other.required_count;
        }
        if other.participant_value.is_some() {
            self.participant_value = other.participant_value;
        }
        if other.exit_delay_ms.is_some() {
            self.exit_delay_ms = other.exit_delay_ms;
        }
        if other.repository.is_some() {
            self.repository = other.repository;
        }
    }

    /// Build the effective configuration: environment, then the optional
    /// file, then `overrides`.
    pub fn load(file: Option<&Path>, overrides: Self) -> Result<Self, ConfigError> {
        let mut config = Self::from_env();
        if let Some(path) = file {
            config.merge(Self::from_toml_file(path)?);
        }
        config.merge(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Check the effective values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.required_count() == 0 {
            return Err(ConfigError::Validation {
                message: "required_count must be non-zero".into(),
            });
        }

        if let Err(err) = validate_path(self.root_path()) {
            return Err(ConfigError::Validation {
                message: format!("root_path: {err}"),
            });
        }

        if self.endpoints().is_empty() || self.endpoints().iter().any(|e| e.trim().is_empty()) {
            return Err(ConfigError::Validation {
                message: "at least one non-empty etcd endpoint is required".into(),
            });
        }

        if self.session_ttl_secs() == 0 {
            return Err(ConfigError::Validation {
                message: "session_ttl_secs must be non-zero".into(),
            });
        }

        if let Some(value) = self.participant_value
            && !value.is_finite()
        {
            return Err(ConfigError::Validation {
                message: format!("participant_value must be finite, got {value}"),
            });
        }

        Ok(())
    }

    /// Effective etcd endpoints.
    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.clone().unwrap_or_else(|| vec![DEFAULT_ETCD_ENDPOINT.to_string()])
    }

    /// Effective session TTL.
    pub fn session_ttl_secs(&self) -> u64 {
        self.session_ttl_secs.unwrap_or(DEFAULT_SESSION_TTL_SECS)
    }

    /// Effective barrier root.
    pub fn root_path(&self) -> &str {
        self.root_path.as_deref().unwrap_or(DEFAULT_ROOT_PATH)
    }

    /// Effective participant count.
    pub fn required_count(&self) -> u32 {
        self.required_count.unwrap_or(DEFAULT_REQUIRED_COUNT)
    }

    /// Effective exit delay.
    pub fn exit_delay(&self) -> Duration {
        Duration::from_millis(self.exit_delay_ms.unwrap_or(DEFAULT_EXIT_DELAY_MS))
    }

    /// Barrier settings.
    pub fn barrier_config(&self) -> BarrierConfig {
        BarrierConfig {
            root_path: self.root_path().to_string(),
            required_count: self.required_count(),
            participant_value: self.participant_value,
            repository: self.repository.clone(),
        }
    }

    /// etcd connection settings.
    pub fn etcd_config(&self) -> EtcdConfig {
        EtcdConfig {
            endpoints: self.endpoints(),
            session_ttl_secs: self.session_ttl_secs(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

/// Configuration loading and parsing errors.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("failed to read config file {}: {source}", path.display()))]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[snafu(display("failed to parse TOML config file {}: {source}", path.display()))]
    ParseToml { path: PathBuf, source: toml::de::Error },

    #[snafu(display("configuration validation failed: {message}"))]
    Validation { message: String },
}
