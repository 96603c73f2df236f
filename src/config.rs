//! Configuration management for Votegate.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! `VOTEGATE__`-prefixed environment variables (e.g.
//! `VOTEGATE__SERVER__GRPC_ADDR=0.0.0.0:8081`).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::error::{Result, VotegateError};
use crate::ratelimit::{
    reference_exclusions, reference_policies, ExclusionList, LimiterSettings, PolicyEntry,
    PolicyTable, Retention, DEFAULT_RETENTION_SECS, DEFAULT_SWEEP_INTERVAL_SECS,
};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "VOTEGATE";

/// Main configuration for the Votegate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VotegateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// gRPC server address
    #[serde(default = "default_grpc_addr")]
    pub grpc_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: default_grpc_addr(),
        }
    }
}

fn default_grpc_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8081))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Path to a YAML policy file; replaces `policies` when set
    #[serde(default)]
    pub policy_path: Option<String>,

    /// Inline policy table, in match order
    #[serde(default = "reference_policies")]
    pub policies: Vec<PolicyEntry>,

    /// Paths that bypass the limiter
    #[serde(default = "reference_exclusions")]
    pub excluded_paths: Vec<String>,

    /// How long request records are kept, in seconds
    #[serde(default = "default_retention")]
    pub retention_secs: u64,

    /// Minimum spacing between ledger sweeps, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Whether denied requests still occupy a slot in the window
    #[serde(default)]
    pub record_rejected: bool,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            policy_path: None,
            policies: reference_policies(),
            excluded_paths: reference_exclusions(),
            retention_secs: default_retention(),
            sweep_interval_secs: default_sweep_interval(),
            record_rejected: false,
        }
    }
}

fn default_retention() -> u64 {
    DEFAULT_RETENTION_SECS
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

impl RateLimitingConfig {
    /// Build the policy table from `policy_path` if set, else the inline list.
    pub fn policy_table(&self) -> Result<PolicyTable> {
        match &self.policy_path {
            Some(path) => PolicyTable::from_file(path),
            None => PolicyTable::new(self.policies.clone()),
        }
    }

    pub fn exclusions(&self) -> Result<ExclusionList> {
        ExclusionList::new(&self.excluded_paths)
    }

    pub fn limiter_settings(&self) -> LimiterSettings {
        LimiterSettings {
            retention: Retention::from_secs(self.retention_secs, self.sweep_interval_secs),
            record_rejected: self.record_rejected,
        }
    }

    /// Check the retention settings against a policy table.
    ///
    /// The retention horizon must cover the longest window, otherwise sweeps
    /// would discard records that still count.
    pub fn validate(&self, policies: &PolicyTable) -> Result<()> {
        if self.sweep_interval_secs == 0 {
            return Err(VotegateError::Config(
                "sweep_interval_secs must be positive".to_string(),
            ));
        }

        let longest = u64::from(policies.longest_window());
        if self.retention_secs < longest {
            return Err(VotegateError::Config(format!(
                "retention_secs ({}) is shorter than the longest policy window ({})",
                self.retention_secs, longest
            )));
        }

        Ok(())
    }
}

impl VotegateConfig {
    /// Load configuration from defaults, an optional file, and the
    /// environment, in that order of precedence.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(VotegateError::Config(format!(
                    "configuration file {} does not exist",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load configuration from a YAML file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| VotegateError::Config(e.to_string()))
    }

    /// Build and validate the policy table this configuration describes.
    pub fn policy_table(&self) -> Result<PolicyTable> {
        let policies = self.rate_limiting.policy_table()?;
        self.rate_limiting.validate(&policies)?;
        Ok(policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VotegateConfig::default();

        assert_eq!(config.server.grpc_addr.to_string(), "127.0.0.1:8081");
        assert_eq!(config.rate_limiting.retention_secs, 3600);
        assert_eq!(config.rate_limiting.sweep_interval_secs, 60);
        assert!(!config.rate_limiting.record_rejected);
        assert_eq!(config.rate_limiting.policies.len(), 9);

        let table = config.policy_table().unwrap();
        assert_eq!(table.default_entry().max_requests, 100);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = VotegateConfig::from_yaml("{}").unwrap();
        assert_eq!(config.rate_limiting.policies, reference_policies());
        assert_eq!(config.rate_limiting.excluded_paths, reference_exclusions());
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
server:
  grpc_addr: 0.0.0.0:9000
rate_limiting:
  record_rejected: true
  retention_secs: 7200
  excluded_paths: ["/ping"]
  policies:
    - pattern: /api/votes/*/submit
      max_requests: 5
      window_seconds: 300
    - pattern: default
      max_requests: 50
      window_seconds: 120
"#;
        let config = VotegateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.server.grpc_addr.port(), 9000);
        assert!(config.rate_limiting.record_rejected);

        let settings = config.rate_limiting.limiter_settings();
        assert!(settings.record_rejected);
        assert_eq!(settings.retention.horizon, 7200.0);
        assert_eq!(settings.retention.sweep_interval, 60.0);

        let exclusions = config.rate_limiting.exclusions().unwrap();
        assert!(exclusions.is_excluded("/ping"));
        assert!(!exclusions.is_excluded("/health"));

        let table = config.policy_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.default_entry().max_requests, 50);
    }

    #[test]
    fn test_retention_shorter_than_window_rejected() {
        let mut config = VotegateConfig::default();
        config.rate_limiting.retention_secs = 300;

        // The reference password reset policies use a 600 second window
        let err = config.policy_table().unwrap_err();
        assert!(matches!(err, VotegateError::Config(_)));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let mut config = VotegateConfig::default();
        config.rate_limiting.sweep_interval_secs = 0;
        assert!(config.policy_table().is_err());
    }

    #[test]
    fn test_invalid_inline_policy_rejected() {
        let mut config = VotegateConfig::default();
        config.rate_limiting.policies = vec![PolicyEntry::new("/login", 5, 60)];

        let err = config.policy_table().unwrap_err();
        assert!(matches!(err, VotegateError::InvalidPolicy(_)));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = VotegateConfig::load(None).unwrap();
        assert_eq!(config.rate_limiting.policies.len(), 9);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/votegate.yaml");
        let config = VotegateConfig::load(Some(&path)).unwrap();

        assert_eq!(config.rate_limiting.policies, reference_policies());
        assert_eq!(config.rate_limiting.excluded_paths, reference_exclusions());
        assert!(config.policy_table().is_ok());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = VotegateConfig::load(Some(Path::new("/nonexistent/votegate.yaml"))).unwrap_err();
        assert!(matches!(err, VotegateError::Config(_)));
    }

    #[test]
    fn test_load_from_file_and_policy_path() {
        let dir = std::env::temp_dir().join(format!("votegate-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let policy_path = dir.join("policies.yaml");
        std::fs::write(
            &policy_path,
            "policies:\n  - pattern: /api/v1/auth/login\n    max_requests: 2\n    window_seconds: 60\n  - pattern: default\n    max_requests: 10\n    window_seconds: 60\n",
        )
        .unwrap();

        let config_path = dir.join("votegate.yaml");
        std::fs::write(
            &config_path,
            format!(
                "rate_limiting:\n  policy_path: {}\n  sweep_interval_secs: 30\n",
                policy_path.display()
            ),
        )
        .unwrap();

        let config = VotegateConfig::load(Some(&config_path)).unwrap();
        assert_eq!(config.rate_limiting.sweep_interval_secs, 30);

        let table = config.policy_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.default_entry().max_requests, 10);

        let from_file = VotegateConfig::from_file(config_path.to_str().unwrap()).unwrap();
        assert_eq!(
            from_file.rate_limiting.policy_path,
            Some(policy_path.display().to_string())
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
