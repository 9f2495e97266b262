//! Configuration module for mirrorfs.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults, and a builder pattern for
//! programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for mirrorfs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub local: LocalConfig,
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub pool: PoolConfig,
    pub listing: ListingConfig,
    pub transfer: TransferConfig,
    pub keepalive: KeepaliveConfig,
    pub logging: LoggingConfig,
}

/// Local mirror settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Root directory of the local mirror.
    pub root_dir: PathBuf,
    /// Directory for cached file content pulled from the remote store.
    pub cache_dir: PathBuf,
    /// User name reported as the owner of every mirrored entry.
    pub user: String,
    /// Group name reported for every mirrored entry.
    pub group: String,
}

/// Remote store endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Path prefix on the remote store that maps to the local root.
    pub store_root: String,
    /// Control channel host.
    pub host: String,
    /// Control channel port.
    pub port: u16,
    /// Data transfer host (usually the same as `host`).
    pub transfer_host: String,
    /// Data transfer port.
    pub transfer_port: u16,
}

/// Caching strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Strategy: `minimal` (on-demand only) or `full` (background mirror).
    pub strategy: String,
}

/// Connection pool settings. Three pools of this capacity are created:
/// control, pull-data, and push-data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Connections held per pool.
    pub capacity: usize,
}

/// Background listing settings (full strategy only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Seconds before the first recursive listing after startup.
    pub initial_delay_secs: u64,
    /// Seconds between recursive listings.
    pub period_secs: u64,
}

/// Transfer batching settings (full strategy only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Maximum queued paths drained into one transfer batch.
    pub batch_size: usize,
}

/// Session keepalive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    /// Seconds between keepalive rounds over the pooled connections.
    pub period_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/mirrorfs/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("mirrorfs")
            .join("config.yaml")
    }
}

// Config derives Default because all its fields implement Default.

impl Default for LocalConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("mirrorfs");
        Self {
            root_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("mirror"),
            cache_dir: data_dir.join("cache"),
            user: "mirror".to_string(),
            group: "mirror".to_string(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            store_root: "/".to_string(),
            host: "localhost".to_string(),
            port: 2811,
            transfer_host: "localhost".to_string(),
            transfer_port: 2811,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strategy: "full".to_string(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { capacity: 5 }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 3,
            period_secs: 30,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self { period_secs: 540 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"pool.capacity"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `cache.strategy`.
const VALID_STRATEGIES: &[&str] = &["minimal", "full"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- remote ---
        if self.remote.host.is_empty() {
            errors.push(ValidationError {
                field: "remote.host".into(),
                message: "must not be empty".into(),
            });
        }
        if self.remote.port == 0 {
            errors.push(ValidationError {
                field: "remote.port".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.remote.transfer_host.is_empty() {
            errors.push(ValidationError {
                field: "remote.transfer_host".into(),
                message: "must not be empty".into(),
            });
        }
        if self.remote.transfer_port == 0 {
            errors.push(ValidationError {
                field: "remote.transfer_port".into(),
                message: "must be greater than 0".into(),
            });
        }
        if !self.remote.store_root.starts_with('/') {
            errors.push(ValidationError {
                field: "remote.store_root".into(),
                message: "must be an absolute path".into(),
            });
        }

        // --- cache ---
        if !VALID_STRATEGIES.contains(&self.cache.strategy.as_str()) {
            errors.push(ValidationError {
                field: "cache.strategy".into(),
                message: format!(
                    "invalid strategy '{}'; valid options: {}",
                    self.cache.strategy,
                    VALID_STRATEGIES.join(", ")
                ),
            });
        }

        // --- pool ---
        if self.pool.capacity == 0 {
            errors.push(ValidationError {
                field: "pool.capacity".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- listing ---
        if self.listing.period_secs == 0 {
            errors.push(ValidationError {
                field: "listing.period_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- transfer ---
        if self.transfer.batch_size == 0 {
            errors.push(ValidationError {
                field: "transfer.batch_size".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- keepalive ---
        if self.keepalive.period_secs == 0 {
            errors.push(ValidationError {
                field: "keepalive.period_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use mirrorfs_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .local_root_dir(PathBuf::from("/srv/mirror"))
///     .remote_host("store.example.org")
///     .pool_capacity(8)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- local ---

    pub fn local_root_dir(mut self, dir: PathBuf) -> Self {
        self.config.local.root_dir = dir;
        self
    }

    pub fn local_cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.local.cache_dir = dir;
        self
    }

    pub fn local_user(mut self, user: impl Into<String>) -> Self {
        self.config.local.user = user.into();
        self
    }

    pub fn local_group(mut self, group: impl Into<String>) -> Self {
        self.config.local.group = group.into();
        self
    }

    // --- remote ---

    pub fn remote_store_root(mut self, root: impl Into<String>) -> Self {
        self.config.remote.store_root = root.into();
        self
    }

    pub fn remote_host(mut self, host: impl Into<String>) -> Self {
        self.config.remote.host = host.into();
        self
    }

    pub fn remote_port(mut self, port: u16) -> Self {
        self.config.remote.port = port;
        self
    }

    pub fn remote_transfer_host(mut self, host: impl Into<String>) -> Self {
        self.config.remote.transfer_host = host.into();
        self
    }

    pub fn remote_transfer_port(mut self, port: u16) -> Self {
        self.config.remote.transfer_port = port;
        self
    }

    // --- cache ---

    pub fn cache_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.config.cache.strategy = strategy.into();
        self
    }

    // --- pool ---

    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.config.pool.capacity = capacity;
        self
    }

    // --- listing ---

    pub fn listing_initial_delay_secs(mut self, seconds: u64) -> Self {
        self.config.listing.initial_delay_secs = seconds;
        self
    }

    pub fn listing_period_secs(mut self, seconds: u64) -> Self {
        self.config.listing.period_secs = seconds;
        self
    }

    // --- transfer ---

    pub fn transfer_batch_size(mut self, size: usize) -> Self {
        self.config.transfer.batch_size = size;
        self
    }

    // --- keepalive ---

    pub fn keepalive_period_secs(mut self, seconds: u64) -> Self {
        self.config.keepalive.period_secs = seconds;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.remote.store_root, "/");
        assert_eq!(cfg.remote.host, "localhost");
        assert_eq!(cfg.remote.port, 2811);
        assert_eq!(cfg.cache.strategy, "full");
        assert_eq!(cfg.pool.capacity, 5);
        assert_eq!(cfg.listing.initial_delay_secs, 3);
        assert_eq!(cfg.listing.period_secs, 30);
        assert_eq!(cfg.transfer.batch_size, 10);
        assert_eq!(cfg.keepalive.period_secs, 540);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
local:
  root_dir: /srv/mirror
  cache_dir: /var/cache/mirrorfs
  user: alice
  group: staff
remote:
  store_root: /exports/data
  host: store.example.org
  port: 2811
  transfer_host: xfer.example.org
  transfer_port: 2812
cache:
  strategy: minimal
pool:
  capacity: 8
listing:
  initial_delay_secs: 1
  period_secs: 15
transfer:
  batch_size: 4
keepalive:
  period_secs: 300
logging:
  level: debug
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.local.root_dir, PathBuf::from("/srv/mirror"));
        assert_eq!(cfg.local.user, "alice");
        assert_eq!(cfg.remote.store_root, "/exports/data");
        assert_eq!(cfg.remote.transfer_host, "xfer.example.org");
        assert_eq!(cfg.remote.transfer_port, 2812);
        assert_eq!(cfg.cache.strategy, "minimal");
        assert_eq!(cfg.pool.capacity, 8);
        assert_eq!(cfg.listing.period_secs, 15);
        assert_eq!(cfg.transfer.batch_size, 4);
        assert_eq!(cfg.keepalive.period_secs, 300);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.pool.capacity, 5);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_zero_pool_capacity() {
        let mut cfg = Config::default();
        cfg.pool.capacity = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "pool.capacity"));
    }

    #[test]
    fn validate_catches_bad_strategy() {
        let mut cfg = Config::default();
        cfg.cache.strategy = "aggressive".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "cache.strategy"));
    }

    #[test]
    fn validate_catches_relative_store_root() {
        let mut cfg = Config::default();
        cfg.remote.store_root = "exports/data".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "remote.store_root"));
    }

    #[test]
    fn validate_catches_bad_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn validate_catches_zero_batch_size() {
        let mut cfg = Config::default();
        cfg.transfer.batch_size = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "transfer.batch_size"));
    }

    // -- Builder --

    #[test]
    fn builder_overrides_selected_fields() {
        let cfg = ConfigBuilder::new()
            .remote_host("store.example.org")
            .pool_capacity(2)
            .cache_strategy("minimal")
            .logging_level("trace")
            .build();
        assert_eq!(cfg.remote.host, "store.example.org");
        assert_eq!(cfg.pool.capacity, 2);
        assert_eq!(cfg.cache.strategy, "minimal");
        assert_eq!(cfg.logging.level, "trace");
        // Untouched sections keep their defaults.
        assert_eq!(cfg.transfer.batch_size, 10);
    }

    #[test]
    fn builder_build_validated_rejects_invalid() {
        let result = ConfigBuilder::new().pool_capacity(0).build_validated();
        assert!(result.is_err());
    }
}
