//! Run configuration.
//!
//! Every setting has a default matching the production sweep, so an empty
//! (or missing) config file is valid. Values can be loaded from TOML and then
//! overridden field by field by the caller.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PulseError, Result};
use crate::merge::StalePolicy;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; APIHealthChecker/1.0)";
pub const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/json,*/*";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub probe: ProbeSettings,
    pub runner: RunnerSettings,
    pub parked: ParkedSettings,
    pub merge: MergeSettings,
}

/// Settings for a single URL probe sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Deadline for each probe request, in milliseconds. It bounds the
    /// whole request, so the GET fallback's body prefix read counts against
    /// it as well. Connecting is bounded by the same value.
    pub timeout_ms: u64,
    /// Maximum redirect hops followed before giving up.
    pub max_redirects: usize,
    /// Bytes of body read by the GET fallback to confirm content is served.
    pub fallback_body_bytes: usize,
    pub user_agent: String,
    pub accept: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_redirects: 5,
            fallback_body_bytes: 256,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Settings for the batch runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    pub concurrency: usize,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    /// Emit a progress report every N completed checks.
    pub progress_every: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            concurrency: 50,
            batch_size: 50,
            batch_delay_ms: 100,
            progress_every: 100,
        }
    }
}

impl RunnerSettings {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParkedSettings {
    /// Regex patterns added to the built-in parked-domain list.
    pub extra_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Handling of existing deprecation marks for URLs not checked this run.
    pub stale_policy: StalePolicy,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PulseError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe.timeout_ms == 0 {
            return Err(PulseError::Config("probe.timeout_ms must be positive".into()));
        }
        if self.runner.concurrency == 0 {
            return Err(PulseError::Config("runner.concurrency must be at least 1".into()));
        }
        if self.runner.batch_size == 0 {
            return Err(PulseError::Config("runner.batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_sweep() {
        let config = Config::default();
        assert_eq!(config.probe.timeout(), Duration::from_secs(10));
        assert_eq!(config.probe.max_redirects, 5);
        assert_eq!(config.probe.fallback_body_bytes, 256);
        assert_eq!(config.runner.concurrency, 50);
        assert_eq!(config.runner.batch_size, 50);
        assert_eq!(config.runner.batch_delay(), Duration::from_millis(100));
        assert_eq!(config.runner.progress_every, 100);
        assert!(config.parked.extra_patterns.is_empty());
        assert_eq!(config.merge.stale_policy, StalePolicy::PreserveUnchecked);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
[probe]
timeout_ms = 2500

[parked]
extra_patterns = ["forsale\\.example"]

[merge]
stale_policy = "clear_unchecked"
"#,
        )
        .unwrap();

        assert_eq!(config.probe.timeout(), Duration::from_millis(2500));
        assert_eq!(config.probe.max_redirects, 5);
        assert_eq!(config.runner, RunnerSettings::default());
        assert_eq!(config.parked.extra_patterns, vec!["forsale\\.example"]);
        assert_eq!(config.merge.stale_policy, StalePolicy::ClearUnchecked);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("[runner]\nconcurrency = \"many\"").unwrap_err();
        assert!(matches!(err, PulseError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.runner.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
