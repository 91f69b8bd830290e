//! Log writer module
//!
//! Thread-safe log writing to files or stdout/stderr. Targets are fixed at
//! initialization: the access stream defaults to stdout and the error stream
//! to stderr, each optionally redirected to a file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

static LOG_WRITER: OnceLock<LogWriter> = OnceLock::new();

/// Log output target
enum LogTarget {
    Stdout,
    Stderr,
    File(Mutex<File>),
}

/// Thread-safe log writer with separate access and error streams
pub struct LogWriter {
    access: LogTarget,
    error: LogTarget,
}

impl LogWriter {
    fn new(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<Self> {
        let access = match access_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stdout,
        };

        let error = match error_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stderr,
        };

        Ok(Self { access, error })
    }

    /// Write an access log line
    pub fn write_access(&self, message: &str) {
        write_to_target(&self.access, message);
    }

    /// Write an error log line
    pub fn write_error(&self, message: &str) {
        write_to_target(&self.error, message);
    }

    /// Write an informational line (goes to the access stream)
    pub fn write_info(&self, message: &str) {
        write_to_target(&self.access, message);
    }
}

/// Open a log file for appending, creating parent directories if needed
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Write a message to the given target
fn write_to_target(target: &LogTarget, message: &str) {
    match target {
        LogTarget::Stdout => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            let _ = writeln!(lock, "{message}");
        }
        LogTarget::Stderr => {
            let stderr = io::stderr();
            let mut lock = stderr.lock();
            let _ = writeln!(lock, "{message}");
        }
        LogTarget::File(file) => {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{message}");
            }
        }
    }
}

/// Initialize the global log writer
///
/// Returns an error if a log file cannot be opened. Subsequent calls are
/// no-ops.
pub fn init(access_log_file: Option<&str>, error_log_file: Option<&str>) -> io::Result<()> {
    let writer = LogWriter::new(access_log_file, error_log_file)?;
    let _ = LOG_WRITER.set(writer);
    Ok(())
}

/// Get the global log writer, if initialized
pub fn get() -> Option<&'static LogWriter> {
    LOG_WRITER.get()
}

/// Check whether the global log writer has been initialized
pub fn is_initialized() -> bool {
    LOG_WRITER.get().is_some()
}
