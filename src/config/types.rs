//! Configuration type definitions

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub performance: PerformanceConfig,
}

/// Server binding configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads. Defaults to the number of CPU cores.
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Whether access logging is enabled
    pub access_log: bool,
    /// Access log format: "combined", "common" or "json"
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path. Logs to stdout when unset.
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path. Logs to stderr when unset.
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Request handling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Include error detail in error response bodies
    pub debug: bool,
    /// Largest request body a handler may read, in bytes
    pub max_body_size: u64,
}

/// Performance tuning configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Maximum concurrent connections. Unlimited when unset.
    #[serde(default)]
    pub max_connections: Option<u64>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}
