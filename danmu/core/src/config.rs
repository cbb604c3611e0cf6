//! TOML Configuration File Support
//!
//! Centralized configuration for the caption server and the terminal overlay,
//! read from `~/.config/danmu/danmu.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//!
//! [upstream]
//! base_url = "https://aggregator.example.com"
//! timeout_secs = 10
//!
//! [cache]
//! ttl_secs = 1800
//!
//! [captions]
//! default_provider = "caiji"
//! default_limit = 300
//!
//! [client]
//! server_url = "http://127.0.0.1:3000"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregator::DEFAULT_PROVIDER;
use crate::cache::DEFAULT_TTL;
use crate::caption::DEFAULT_LIMIT;

/// Default listen address of the caption server
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Default caption server URL used by clients
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Environment variables read by [`load_config`]
pub mod env {
    /// Listen address
    pub const BIND: &str = "DANMU_BIND";
    /// Upstream aggregator base URL
    pub const AGGREGATOR_BASE: &str = "DANMU_AGGREGATOR_BASE";
    /// Upstream request timeout, seconds
    pub const UPSTREAM_TIMEOUT_SECS: &str = "DANMU_UPSTREAM_TIMEOUT_SECS";
    /// Cache TTL, seconds
    pub const CACHE_TTL_SECS: &str = "DANMU_CACHE_TTL_SECS";
    /// Caption server URL for clients
    pub const SERVER_URL: &str = "DANMU_SERVER_URL";
}

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[server]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Listen address, `host:port`
    pub bind: Option<String>,
}

/// `[upstream]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamToml {
    /// Aggregator base URL; no upstream when unset
    pub base_url: Option<String>,

    /// Request timeout in seconds (no timeout when unset)
    pub timeout_secs: Option<u64>,
}

/// `[cache]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheToml {
    /// Entry lifetime in seconds
    pub ttl_secs: Option<u64>,
}

/// `[captions]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionsToml {
    /// Provider used when a request names none
    pub default_provider: Option<String>,

    /// Limit used when a request gives none
    pub default_limit: Option<usize>,
}

/// `[client]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Caption server the overlay fetches from
    pub server_url: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DanmuToml {
    /// Server section
    pub server: ServerToml,
    /// Upstream section
    pub upstream: UpstreamToml,
    /// Cache section
    pub cache: CacheToml,
    /// Captions section
    pub captions: CaptionsToml,
    /// Client section
    pub client: ClientToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration
#[derive(Clone, Debug)]
pub struct DanmuConfig {
    /// Listen address of the caption server
    pub bind: String,

    /// Upstream aggregator base URL
    pub aggregator_base: Option<String>,

    /// Upstream request timeout
    pub upstream_timeout: Option<Duration>,

    /// Server cache entry lifetime
    pub cache_ttl: Duration,

    /// Provider used when a request names none
    pub default_provider: String,

    /// Limit used when a request gives none
    pub default_limit: usize,

    /// Caption server the overlay fetches from
    pub server_url: String,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for DanmuConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            aggregator_base: None,
            upstream_timeout: None,
            cache_ttl: DEFAULT_TTL,
            default_provider: DEFAULT_PROVIDER.to_string(),
            default_limit: DEFAULT_LIMIT,
            server_url: DEFAULT_SERVER_URL.to_string(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl DanmuConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-priority source that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that parse but make no sense
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an empty bind address, a
    /// zero TTL or a blank provider.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server bind address is empty".to_string(),
            ));
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ValidationError(
                "cache ttl must be positive".to_string(),
            ));
        }
        if self.default_provider.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default provider is empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/danmu/danmu.toml` or
/// `~/.config/danmu/danmu.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("danmu").join("danmu.toml"))
}

/// Load configuration from the default path and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed,
/// or if the result fails validation. A missing file is not an error.
pub async fn load_config() -> Result<DanmuConfig, ConfigError> {
    load_config_from_path(default_config_path()).await
}

/// Load configuration from a specific path and the process environment
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed, or if
/// the result fails validation.
pub async fn load_config_from_path(path: Option<PathBuf>) -> Result<DanmuConfig, ConfigError> {
    load_config_with_env(path, |name| std::env::var(name).ok()).await
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub async fn load_config_with_env<F>(
    path: Option<PathBuf>,
    lookup: F,
) -> Result<DanmuConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = DanmuConfig::default();

    if let Some(config_path) = path {
        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                let toml_config: DanmuToml = toml::from_str(&content)?;
                apply_toml_config(&mut config, &toml_config);
                config.source = ConfigSource::File;
                tracing::info!(
                    path = %config_path.display(),
                    "Loaded configuration from file"
                );
                config.config_file_path = Some(config_path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    path = %config_path.display(),
                    "Config file not found, using defaults"
                );
            }
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: config_path,
                    source: e,
                })
            }
        }
    }

    apply_env_config(&mut config, lookup);
    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut DanmuConfig, toml: &DanmuToml) {
    if let Some(ref bind) = toml.server.bind {
        config.bind.clone_from(bind);
    }
    if let Some(ref base) = toml.upstream.base_url {
        config.aggregator_base = non_blank(base);
    }
    if let Some(secs) = toml.upstream.timeout_secs {
        config.upstream_timeout = timeout_from_secs(secs);
    }
    if let Some(secs) = toml.cache.ttl_secs {
        config.cache_ttl = Duration::from_secs(secs);
    }
    if let Some(ref provider) = toml.captions.default_provider {
        config.default_provider = provider.trim().to_lowercase();
    }
    if let Some(limit) = toml.captions.default_limit {
        config.default_limit = limit;
    }
    if let Some(ref url) = toml.client.server_url {
        config.server_url.clone_from(url);
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut DanmuConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = lookup(env::BIND) {
        config.bind = bind;
        config.source = ConfigSource::Env;
    }
    if let Some(base) = lookup(env::AGGREGATOR_BASE) {
        config.aggregator_base = non_blank(&base);
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = lookup(env::UPSTREAM_TIMEOUT_SECS) {
        if let Ok(secs) = timeout.trim().parse::<u64>() {
            config.upstream_timeout = timeout_from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(ttl) = lookup(env::CACHE_TTL_SECS) {
        if let Ok(secs) = ttl.trim().parse::<u64>() {
            config.cache_ttl = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(url) = lookup(env::SERVER_URL) {
        config.server_url = url;
        config.source = ConfigSource::Env;
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Zero means "no timeout"
fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Listen address override
    pub bind: Option<String>,

    /// Upstream base URL override
    pub aggregator_base: Option<String>,

    /// Upstream timeout override (seconds)
    pub upstream_timeout_secs: Option<u64>,

    /// Cache TTL override (seconds)
    pub cache_ttl_secs: Option<u64>,

    /// Server URL override
    pub server_url: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set listen address override
    #[must_use]
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = Some(bind.into());
        self
    }

    /// Set upstream base URL override
    #[must_use]
    pub fn with_aggregator_base(mut self, base: impl Into<String>) -> Self {
        self.aggregator_base = Some(base.into());
        self
    }

    /// Set upstream timeout override
    #[must_use]
    pub fn with_upstream_timeout_secs(mut self, secs: u64) -> Self {
        self.upstream_timeout_secs = Some(secs);
        self
    }

    /// Set cache TTL override
    #[must_use]
    pub fn with_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = Some(secs);
        self
    }

    /// Set server URL override
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns a validation error if the overridden config is invalid.
    pub fn apply(&self, config: &mut DanmuConfig) -> Result<(), ConfigError> {
        if self.bind.is_some()
            || self.aggregator_base.is_some()
            || self.upstream_timeout_secs.is_some()
            || self.cache_ttl_secs.is_some()
            || self.server_url.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref bind) = self.bind {
            config.bind.clone_from(bind);
        }
        if let Some(ref base) = self.aggregator_base {
            config.aggregator_base = non_blank(base);
        }
        if let Some(secs) = self.upstream_timeout_secs {
            config.upstream_timeout = timeout_from_secs(secs);
        }
        if let Some(secs) = self.cache_ttl_secs {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(ref url) = self.server_url {
            config.server_url.clone_from(url);
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = DanmuConfig::default();

        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.aggregator_base, None);
        assert_eq!(config.upstream_timeout, None);
        assert_eq!(config.cache_ttl, Duration::from_secs(30 * 60));
        assert_eq!(config.default_provider, "caiji");
        assert_eq!(config.default_limit, 300);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.to_string_lossy().ends_with("danmu.toml"));
        }
    }

    #[tokio::test]
    async fn test_parse_valid_toml() {
        let file = toml_file(
            r#"
[server]
bind = "0.0.0.0:8080"

[upstream]
base_url = "https://agg.example.com/"
timeout_secs = 5

[cache]
ttl_secs = 60

[captions]
default_provider = "Bili"
default_limit = 50
"#,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env)
            .await
            .unwrap();

        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(
            config.aggregator_base.as_deref(),
            Some("https://agg.example.com/")
        );
        assert_eq!(config.upstream_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.default_provider, "bili");
        assert_eq!(config.default_limit, 50);
        assert_eq!(config.source(), ConfigSource::File);
        assert_eq!(config.config_file_path, Some(file.path().to_path_buf()));
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let path = PathBuf::from("/nonexistent/path/danmu.toml");
        let config = load_config_with_env(Some(path), no_env).await.unwrap();

        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[tokio::test]
    async fn test_malformed_toml_error() {
        let file = toml_file("[server\nbind = 3");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env).await;
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_env_overrides_file() {
        let file = toml_file(
            r#"
[server]
bind = "0.0.0.0:8080"

[cache]
ttl_secs = 60
"#,
        );
        let vars: HashMap<&str, &str> = [
            (env::BIND, "127.0.0.1:9000"),
            (env::CACHE_TTL_SECS, "120"),
            (env::AGGREGATOR_BASE, "  "),
            (env::UPSTREAM_TIMEOUT_SECS, "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = load_config_with_env(Some(file.path().to_path_buf()), |name| {
            vars.get(name).map(|v| (*v).to_string())
        })
        .await
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.cache_ttl, Duration::from_secs(120));
        assert_eq!(config.aggregator_base, None);
        assert_eq!(config.upstream_timeout, None);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let file = toml_file("[cache]\nttl_secs = 0\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env).await;
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_cli_overrides_everything() {
        let mut config = DanmuConfig::default();
        ConfigOverrides::new()
            .with_bind("[::1]:4000")
            .with_aggregator_base("http://upstream.local")
            .with_upstream_timeout_secs(0)
            .with_cache_ttl_secs(10)
            .apply(&mut config)
            .unwrap();

        assert_eq!(config.bind, "[::1]:4000");
        assert_eq!(config.aggregator_base.as_deref(), Some("http://upstream.local"));
        assert_eq!(config.upstream_timeout, None);
        assert_eq!(config.cache_ttl, Duration::from_secs(10));
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = DanmuConfig::default();
        ConfigOverrides::new().apply(&mut config).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
    }
}
