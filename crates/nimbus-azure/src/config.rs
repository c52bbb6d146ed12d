//! Integration configuration

use crate::steps::catalog_step_ids;
use nimbus_engine::SchedulerOptions;
use nimbus_provider::{ProviderConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_SUBSCRIPTION_ID: &str = "NIMBUS_SUBSCRIPTION_ID";
pub const ENV_TENANT_ID: &str = "NIMBUS_TENANT_ID";
pub const ENV_ACCESS_TOKEN: &str = "NIMBUS_ACCESS_TOKEN";
/// Separate directory token; the access token is used when unset
pub const ENV_DIRECTORY_TOKEN: &str = "NIMBUS_DIRECTORY_TOKEN";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required setting: {0}")]
    MissingField(&'static str),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Unknown step in active_steps: {0}")]
    UnknownStep(String),
}

/// Retry settings for every page request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per page request
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Cool-down after a rate-limit response without a hint
    pub rate_limit_cooldown_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            rate_limit_cooldown_ms: 5_000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            rate_limit_cooldown: Duration::from_millis(self.rate_limit_cooldown_ms),
        }
    }
}

fn default_arm_endpoint() -> String {
    "https://management.azure.com".to_string()
}

fn default_graph_endpoint() -> String {
    "https://graph.microsoft.com".to_string()
}

fn default_step_deadline_secs() -> u64 {
    900
}

fn default_max_concurrent_steps() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Azure integration configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Integration instance; scopes directory object keys
    pub instance_id: String,
    /// Directory tenant
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default = "default_arm_endpoint")]
    pub arm_endpoint: String,
    #[serde(default = "default_graph_endpoint")]
    pub graph_endpoint: String,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_step_deadline_secs")]
    pub step_deadline_secs: u64,
    #[serde(default = "default_max_concurrent_steps")]
    pub max_concurrent_steps: usize,
    /// Explicit step allow-list; the catalog default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_steps: Option<Vec<String>>,
}

impl IntegrationConfig {
    pub fn new(instance_id: &str, tenant_id: &str, subscription_id: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            tenant_id: tenant_id.to_string(),
            subscription_id: subscription_id.to_string(),
            arm_endpoint: default_arm_endpoint(),
            graph_endpoint: default_graph_endpoint(),
            retry: RetrySettings::default(),
            request_timeout_secs: default_request_timeout_secs(),
            step_deadline_secs: default_step_deadline_secs(),
            max_concurrent_steps: default_max_concurrent_steps(),
            active_steps: None,
        }
    }

    pub fn with_endpoints(mut self, arm_endpoint: &str, graph_endpoint: &str) -> Self {
        self.arm_endpoint = arm_endpoint.to_string();
        self.graph_endpoint = graph_endpoint.to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_active_steps(mut self, steps: &[&str]) -> Self {
        self.active_steps = Some(steps.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Load from a JSON file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let mut config: IntegrationConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: display, source })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// `NIMBUS_SUBSCRIPTION_ID` and `NIMBUS_TENANT_ID` override file values
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let Some(value) = lookup(ENV_SUBSCRIPTION_ID).filter(|v| !v.is_empty()) {
            self.subscription_id = value;
        }
        if let Some(value) = lookup(ENV_TENANT_ID).filter(|v| !v.is_empty()) {
            self.tenant_id = value;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instance_id.trim().is_empty() {
            return Err(ConfigError::MissingField("instance_id"));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(ConfigError::MissingField("tenant_id"));
        }
        if self.subscription_id.trim().is_empty() {
            return Err(ConfigError::MissingField("subscription_id"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_concurrent_steps == 0 {
            return Err(ConfigError::Invalid {
                field: "max_concurrent_steps",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.step_deadline_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "step_deadline_secs",
                reason: "must be at least 1".to_string(),
            });
        }

        if let Some(active) = &self.active_steps {
            let known = catalog_step_ids();
            if let Some(unknown) = active.iter().find(|id| !known.contains(&id.as_str())) {
                return Err(ConfigError::UnknownStep(unknown.clone()));
            }
        }

        Ok(())
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(&self.subscription_id)
            .with_arm_endpoint(&self.arm_endpoint)
            .with_graph_endpoint(&self.graph_endpoint)
            .with_timeout(self.request_timeout_secs)
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            max_concurrent_steps: self.max_concurrent_steps,
            step_deadline: Some(Duration::from_secs(self.step_deadline_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: IntegrationConfig = serde_json::from_str(
            r#"{"instance_id": "inst-1", "tenant_id": "t-1", "subscription_id": "s-1"}"#,
        )
        .unwrap();

        assert_eq!(config.arm_endpoint, "https://management.azure.com");
        assert_eq!(config.graph_endpoint, "https://graph.microsoft.com");
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.step_deadline_secs, 900);
        assert_eq!(config.max_concurrent_steps, 4);
        assert!(config.active_steps.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_retry_block_keeps_defaults() {
        let config: IntegrationConfig = serde_json::from_str(
            r#"{"instance_id": "i", "tenant_id": "t", "subscription_id": "s", "retry": {"max_attempts": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.rate_limit_cooldown_ms, 5_000);
        assert_eq!(config.retry.policy().max_attempts, 2);
    }

    #[test]
    fn test_validation_errors() {
        let base = IntegrationConfig::new("inst", "tenant", "sub");

        let mut missing = base.clone();
        missing.subscription_id = " ".into();
        assert!(matches!(missing.validate(), Err(ConfigError::MissingField("subscription_id"))));

        let zero_retry = base.clone().with_retry(RetrySettings {
            max_attempts: 0,
            ..RetrySettings::default()
        });
        assert!(matches!(zero_retry.validate(), Err(ConfigError::Invalid { .. })));

        let unknown = base.clone().with_active_steps(&["fetch-account", "fetch-everything"]);
        assert!(matches!(unknown.validate(), Err(ConfigError::UnknownStep(id)) if id == "fetch-everything"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_SUBSCRIPTION_ID, "sub-env"), (ENV_TENANT_ID, "")]
            .into_iter()
            .collect();
        let mut config = IntegrationConfig::new("inst", "tenant-file", "sub-file");
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.subscription_id, "sub-env");
        assert_eq!(config.tenant_id, "tenant-file");
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(IntegrationConfig::load(&path), Err(ConfigError::Parse { .. })));

        let missing = dir.path().join("absent.json");
        assert!(matches!(IntegrationConfig::load(&missing), Err(ConfigError::Io { .. })));
    }
}
