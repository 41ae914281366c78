//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub fallback: FallbackConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend the monitor polls
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    5000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Threshold monitor timing and defaults
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_clock_interval")]
    pub clock_interval_ms: u64,

    #[serde(default = "default_threshold")]
    pub default_threshold: u32,

    /// Where the threshold is persisted (default: config dir)
    pub settings_path: Option<String>,
}

fn default_poll_interval() -> u64 {
    2000 // 2 seconds
}

fn default_clock_interval() -> u64 {
    1000 // 1 second
}

fn default_threshold() -> u32 {
    5
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            clock_interval_ms: default_clock_interval(),
            default_threshold: default_threshold(),
            settings_path: None,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms.max(1))
    }

    /// Resolve the settings file location
    pub fn settings_file(&self) -> PathBuf {
        match &self.settings_path {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .map(|p| p.join("crowdwatch").join("settings.toml"))
                .unwrap_or_else(|| PathBuf::from("./crowdwatch_settings.toml")),
        }
    }
}

/// Synthetic sample substituted when a poll fails
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_fallback_enabled")]
    pub enabled: bool,

    #[serde(default = "default_fallback_probability")]
    pub probability: f64,

    #[serde(default = "default_fallback_min")]
    pub min_count: u32,

    #[serde(default = "default_fallback_max")]
    pub max_count: u32,

    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

fn default_fallback_enabled() -> bool {
    true
}

fn default_fallback_probability() -> f64 {
    0.3
}

fn default_fallback_min() -> u32 {
    1
}

fn default_fallback_max() -> u32 {
    15
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: default_fallback_enabled(),
            probability: default_fallback_probability(),
            min_count: default_fallback_min(),
            max_count: default_fallback_max(),
            seed: None,
        }
    }
}

/// Demo mode that injects random counts on its own timer
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_simulation_interval")]
    pub interval_ms: u64,

    #[serde(default = "default_simulation_max")]
    pub max_count: u32,
}

fn default_simulation_interval() -> u64 {
    5000
}

fn default_simulation_max() -> u32 {
    15
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_simulation_interval(),
            max_count: default_simulation_max(),
        }
    }
}

/// Aggregation backend server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// Nothing is logged here since this runs before the subscriber exists;
    /// call [`LoadedConfig::log`] once logging is up.
    pub fn load_default() -> LoadedConfig {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("crowdwatch").join("config.toml")),
            Some(PathBuf::from("/etc/crowdwatch/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// First candidate that exists and loads wins
    fn load_first(paths: &[PathBuf]) -> LoadedConfig {
        let mut skipped = Vec::new();

        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    return LoadedConfig {
                        config,
                        source: Some(path.clone()),
                        skipped,
                    }
                }
                Err(e) => skipped.push(e),
            }
        }

        LoadedConfig {
            config: Self::from_env(),
            source: None,
            skipped,
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Backend overrides
        if let Some(url) = var("CROWDWATCH_BACKEND_URL") {
            self.backend.url = url;
        }

        // Monitor overrides
        if let Some(threshold) = var("CROWDWATCH_THRESHOLD") {
            if let Ok(t) = threshold.trim().parse::<u32>() {
                if t > 0 {
                    self.monitor.default_threshold = t;
                }
            }
        }

        // Server overrides
        if let Some(host) = var("CROWDWATCH_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("CROWDWATCH_SERVER_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = var("CROWDWATCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("CROWDWATCH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Result of loading the configuration
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// File the config came from; `None` means defaults
    pub source: Option<PathBuf>,
    /// Candidate files that exist but failed to load
    pub skipped: Vec<ConfigError>,
}

impl LoadedConfig {
    /// Load an explicitly given file; errors are fatal
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            config: Config::load_with_env(path)?,
            source: Some(path.to_path_buf()),
            skipped: Vec::new(),
        })
    }

    /// Report where the config came from
    pub fn log(&self) {
        for error in &self.skipped {
            tracing::warn!("Ignoring config: {}", error);
        }

        match &self.source {
            Some(path) => tracing::info!("Loaded config from {:?}", path),
            None => tracing::info!("Using default config with environment overrides"),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Crowdwatch Configuration
#
# Environment variables override these settings:
# - CROWDWATCH_BACKEND_URL
# - CROWDWATCH_THRESHOLD
# - CROWDWATCH_SERVER_HOST
# - CROWDWATCH_SERVER_PORT
# - CROWDWATCH_LOG_LEVEL
# - CROWDWATCH_LOG_FORMAT

[backend]
# Aggregation backend polled by `crowdwatch watch`
url = "http://localhost:8000"

# Request timeout (ms)
request_timeout_ms = 5000

[monitor]
# How often to poll the backend (ms)
poll_interval_ms = 2000

# How often the dashboard clock ticks (ms)
clock_interval_ms = 1000

# Threshold used until one is saved with `crowdwatch threshold set`
default_threshold = 5

# Where the saved threshold lives (default: <config dir>/crowdwatch/settings.toml)
# settings_path = "/var/lib/crowdwatch/settings.toml"

[fallback]
# Substitute a synthetic count when the backend is unreachable
enabled = true

# Chance of producing a synthetic count per failed poll
probability = 0.3

# Inclusive range of synthetic counts
min_count = 1
max_count = 15

# Fixed seed for reproducible runs
# seed = 42

[simulation]
# Inject a random count on its own timer (demo mode)
enabled = false
interval_ms = 5000
max_count = 15

[server]
# Backend server host
host = "0.0.0.0"

# Backend server port
port = 8000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/crowdwatch/crowdwatch.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend.url, "http://localhost:8000");
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.monitor.clock_interval(), Duration::from_secs(1));
        assert_eq!(config.monitor.default_threshold, 5);
        assert!(config.fallback.enabled);
        assert_eq!(config.fallback.probability, 0.3);
        assert_eq!((config.fallback.min_count, config.fallback.max_count), (1, 15));
        assert!(!config.simulation.enabled);
        assert_eq!(config.server.addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_generated_config_parses_to_defaults() {
        let config = Config::parse(&generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.backend.url, defaults.backend.url);
        assert_eq!(config.monitor.poll_interval_ms, defaults.monitor.poll_interval_ms);
        assert_eq!(config.fallback.max_count, defaults.fallback.max_count);
        assert_eq!(config.server.port, defaults.server.port);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            r#"
[backend]
url = "http://10.0.0.5:8000"

[fallback]
enabled = false
"#,
        )
        .unwrap();

        assert_eq!(config.backend.url, "http://10.0.0.5:8000");
        assert_eq!(config.backend.request_timeout_ms, 5000);
        assert!(!config.fallback.enabled);
        assert_eq!(config.monitor.default_threshold, 5);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[monitor]\npoll_interval_ms = \"fast\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));

        let missing = Config::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }

    #[test]
    fn test_broken_candidate_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.toml");
        let valid = dir.path().join("valid.toml");
        std::fs::write(&broken, "[fallback\nenabled = false\n").unwrap();
        std::fs::write(&valid, "[fallback]\nenabled = false\n").unwrap();

        let candidates = [dir.path().join("absent.toml"), broken.clone(), valid.clone()];
        let loaded = Config::load_first(&candidates);

        assert_eq!(loaded.source.as_deref(), Some(valid.as_path()));
        assert!(!loaded.config.fallback.enabled);
        assert_eq!(loaded.skipped.len(), 1);
        assert!(matches!(
            &loaded.skipped[0],
            ConfigError::Parse { path, .. } if path == &broken
        ));
    }

    #[test]
    fn test_only_broken_candidate_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("config.toml");
        std::fs::write(&broken, "[fallback]\nenabled = \"maybe\"\n").unwrap();

        let loaded = Config::load_first(&[broken.clone()]);

        assert!(loaded.source.is_none());
        assert!(loaded.config.fallback.enabled);
        assert_eq!(loaded.skipped.len(), 1);
        assert!(loaded.skipped[0].to_string().contains("config.toml"));
    }

    #[test]
    fn test_explicit_file_errors_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not toml at all [").unwrap();

        assert!(LoadedConfig::from_file(&path).is_err());

        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();
        let loaded = LoadedConfig::from_file(&path).unwrap();
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
        assert!(loaded.skipped.is_empty());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CROWDWATCH_BACKEND_URL", "http://backend:9000"),
            ("CROWDWATCH_THRESHOLD", "12"),
            ("CROWDWATCH_SERVER_PORT", "not-a-port"),
            ("CROWDWATCH_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.url, "http://backend:9000");
        assert_eq!(config.monitor.default_threshold, 12);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_threshold_override_rejects_zero() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "CROWDWATCH_THRESHOLD").then(|| "0".to_string()));
        assert_eq!(config.monitor.default_threshold, 5);
    }
}
