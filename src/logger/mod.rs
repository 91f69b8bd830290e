//! Logger module
//!
//! Provides logging utilities for the dispatch engine including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging
//! - Engine events (lazy handler loads, fatal handler errors)
//!
//! Before [`init`] runs, everything falls back to stdout/stderr so early
//! startup and unit tests still produce output.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::net::SocketAddr;

use crate::config::Config;
use crate::error::HttpError;

/// Initialize the logger from configuration
///
/// Should be called once at startup, before the server starts accepting.
///
/// # Errors
///
/// Returns an error if a configured log file cannot be opened.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write_info(message: &str) {
    if writer::is_initialized() {
        if let Some(w) = writer::get() {
            w.write_info(message);
        }
    } else {
        println!("{message}");
    }
}

fn write_error(message: &str) {
    if writer::is_initialized() {
        if let Some(w) = writer::get() {
            w.write_error(message);
        }
    } else {
        eprintln!("{message}");
    }
}

fn write_access(message: &str) {
    if writer::is_initialized() {
        if let Some(w) = writer::get() {
            w.write_access(message);
        }
    } else {
        println!("{message}");
    }
}

/// Log the startup banner
pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Dispatch engine started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if config.logging.access_log {
        write_info(&format!(
            "Access log format: {}",
            config.logging.access_log_format
        ));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log file: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log file: {path}"));
    }
    if config.http.debug {
        write_info("Debug mode: error responses include detail");
    }
    write_info("======================================\n");
}

/// Log an accepted connection
pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

/// Log a connection-level failure
pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

/// Log an error message
pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

/// Log a warning message
pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Log a formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}

/// Log the start of a lazy handler load (first request to hit the route)
pub fn log_lazy_load(pattern: &str) {
    write_info(&format!("[Lazy] Loading handler for {pattern}"));
}

/// Log a failed lazy handler load. The route stays unloaded and the next
/// matching request retries the loader.
pub fn log_lazy_load_failed(pattern: &str, error: &HttpError) {
    write_error(&format!("[ERROR] Lazy load failed for {pattern}: {error}"));
}

/// Log an error marked fatal. The engine keeps serving; whether the process
/// should be restarted is left to supervision.
pub fn log_fatal_error(method: &str, path: &str, error: &HttpError) {
    write_error(&format!("[FATAL] {method} {path}: {error}"));
}
