//! Configuration management for the bookhive server.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use bookhive_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("bookhive.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix: `BOOKHIVE_SERVER__PORT` -> `server.port`.
pub const ENV_PREFIX: &str = "BOOKHIVE";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub bootstrap: BootstrapSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    #[serde(default)]
    pub errors: ErrorSettings,
}

/// Server network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_body_limit() -> usize {
    1024 * 1024
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type. Only "memory" is built in.
    #[serde(default = "default_storage_backend")]
    pub backend: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
        }
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

/// Credential settings.
///
/// `jwt_secret` has no default and must be supplied, usually through
/// `BOOKHIVE_AUTH__JWT_SECRET`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuthSettings {
    /// HMAC key for signing tokens
    #[serde(default)]
    pub jwt_secret: String,

    /// Token lifetime in seconds (7 days)
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,

    /// bcrypt work factor
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    /// Trust the role embedded in the token instead of re-reading the
    /// account on gated routes. The session probe always trusts it.
    #[serde(default)]
    pub trust_token_role: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl(),
            bcrypt_cost: default_bcrypt_cost(),
            trust_token_role: false,
        }
    }
}

fn default_token_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_bcrypt_cost() -> u32 {
    10
}

/// Optional admin account created at startup when its email is free.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct BootstrapSettings {
    pub admin_name: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl BootstrapSettings {
    /// Returns `(name, email, password)` when all three are set.
    pub fn admin(&self) -> Option<(&str, &str, &str)> {
        match (&self.admin_name, &self.admin_email, &self.admin_password) {
            (Some(name), Some(email), Some(password)) => Some((name, email, password)),
            _ => None,
        }
    }

    fn is_partial(&self) -> bool {
        let set = [
            self.admin_name.is_some(),
            self.admin_email.is_some(),
            self.admin_password.is_some(),
        ];
        set.iter().any(|s| *s) && !set.iter().all(|s| *s)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetricsSettings {
    /// Enable the Prometheus endpoint
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

/// Error response settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ErrorSettings {
    /// Include validation/lookup detail in client messages. Internal
    /// failures stay generic either way.
    #[serde(default)]
    pub detailed: bool,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigLoadError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `BOOKHIVE_` and use `__` as
    /// separator, e.g. `BOOKHIVE_AUTH__JWT_SECRET` overrides `auth.jwt_secret`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(ConfigLoadError::invalid(
                "server.port must be greater than 0",
            ));
        }

        if self.server.body_limit_bytes == 0 {
            return Err(ConfigLoadError::invalid(
                "server.body_limit_bytes must be greater than 0",
            ));
        }

        let valid_backends = ["memory"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(ConfigLoadError::invalid(format!(
                "storage.backend must be one of: {:?}, got: {}",
                valid_backends, self.storage.backend
            )));
        }

        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigLoadError::invalid(
                "auth.jwt_secret is required (set BOOKHIVE_AUTH__JWT_SECRET)",
            ));
        }

        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigLoadError::invalid(
                "auth.token_ttl_secs must be greater than 0",
            ));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigLoadError::invalid(format!(
                "auth.bcrypt_cost must be between 4 and 31, got: {}",
                self.auth.bcrypt_cost
            )));
        }

        if self.bootstrap.is_partial() {
            return Err(ConfigLoadError::invalid(
                "bootstrap requires admin_name, admin_email and admin_password together",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config
    }

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9090

storage:
  backend: memory

auth:
  jwt_secret: "from-file"
  token_ttl_secs: 3600
  bcrypt_cost: 4

logging:
  level: debug
  json: true

metrics:
  enabled: false

errors:
  detailed: true
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.body_limit_bytes, 1024 * 1024);
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.auth.bcrypt_cost, 4);
        assert!(!config.auth.trust_token_role);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(!config.metrics.enabled);
        assert!(config.errors.detailed);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  port: 8080
auth:
  jwt_secret: "from-file"
"#
        )
        .unwrap();

        std::env::set_var("BOOKHIVE_SERVER__PORT", "9999");
        std::env::set_var("BOOKHIVE_AUTH__JWT_SECRET", "from-env");

        let config = ServerConfig::load(file.path());

        std::env::remove_var("BOOKHIVE_SERVER__PORT");
        std::env::remove_var("BOOKHIVE_AUTH__JWT_SECRET");

        let config = config.unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.auth.jwt_secret, "from-env");
    }

    /// Test: from_env loads defaults with env overrides
    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("BOOKHIVE_AUTH__JWT_SECRET", "s3cret");
        std::env::set_var("BOOKHIVE_SERVER__HOST", "127.0.0.1");

        let config = ServerConfig::from_env();

        std::env::remove_var("BOOKHIVE_AUTH__JWT_SECRET");
        std::env::remove_var("BOOKHIVE_SERVER__HOST");

        let config = config.unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.token_ttl_secs, 604_800);
    }

    /// Test: A missing secret is rejected
    #[test]
    #[serial]
    fn test_missing_secret_is_rejected() {
        std::env::remove_var("BOOKHIVE_AUTH__JWT_SECRET");
        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("jwt_secret"));
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.storage.backend = "postgres".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("storage.backend"));

        let mut config = valid_config();
        config.server.port = 0;
        assert!(config.validate().unwrap_err().to_string().contains("server.port"));

        let mut config = valid_config();
        config.auth.token_ttl_secs = 0;
        assert!(config.validate().unwrap_err().to_string().contains("token_ttl_secs"));

        let mut config = valid_config();
        config.auth.bcrypt_cost = 2;
        assert!(config.validate().unwrap_err().to_string().contains("bcrypt_cost"));

        let mut config = valid_config();
        config.logging.level = "loud".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("logging.level"));
    }

    /// Test: Bootstrap admin must be fully specified
    #[test]
    fn test_partial_bootstrap_is_rejected() {
        let mut config = valid_config();
        config.bootstrap.admin_email = Some("root@example.com".to_string());
        assert!(config.validate().unwrap_err().to_string().contains("bootstrap"));

        config.bootstrap.admin_name = Some("Root".to_string());
        config.bootstrap.admin_password = Some("changeme".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.bootstrap.admin(),
            Some(("Root", "root@example.com", "changeme"))
        );
    }

    /// Test: Invalid config returns clear error
    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = ServerConfig::load("/nonexistent/path/bookhive.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();
        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }
}
