//! Configuration module
//!
//! Loads settings from an optional `config.toml` (or `.json`/`.yaml`) in the
//! working directory, overridable through `SERVER_*` environment variables.
//! Every key has a default, so the engine starts with no config file at all.

mod types;

pub use types::{Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig};

use std::net::SocketAddr;

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is malformed or a value fails to
    /// deserialize into the expected type.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific file stem
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SERVER"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("http.debug", false)?
            .set_default("http.max_body_size", 10_485_760)?
            .set_default("performance.keep_alive", true)?
            .build()?;

        settings.try_deserialize()
    }

    /// Resolve the configured host and port into a socket address
    ///
    /// # Errors
    ///
    /// Returns an error if the host/port pair does not parse as a socket
    /// address.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid server address: {e}"))
    }
}
