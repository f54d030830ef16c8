//! Defines application-specific error types.
//!
//! This module provides the `AppError` enum, which categorizes the errors the
//! lifecycle can produce. None of them is recoverable: the hook wrappers hand
//! them to [`fatal`], which reports the message and terminates the process.

use crate::constants::EXIT_FATAL;
use thiserror::Error;

/// Application-specific errors used throughout `mirror-lifecycle`.
#[derive(Error, Debug)]
pub enum AppError {
    // --- I/O Errors ---
    /// Writing to one of the command's output streams failed.
    #[error("failed to write to output stream: {0}")]
    StreamWrite(#[source] std::io::Error),

    /// The persistent log file could not be opened or created.
    #[error("failed to open log file '{path}': {source}")]
    LogFileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The persistent log file could not be synced or closed during teardown.
    #[error("failed to close log file '{path}': {source}")]
    LogFileClose {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Flushing a log sink failed during teardown.
    #[error("failed to flush log output: {0}")]
    Flush(#[source] std::io::Error),

    // --- Configuration Errors ---
    /// Installing or reconfiguring one of the logging facilities failed.
    #[error("invalid logger configuration: {0}")]
    LoggerConfig(String),

    /// The verbosity level is outside the accepted `0..=9` range.
    #[error("invalid verbosity level {0} (valid 0-9)")]
    InvalidVerbosity(u8),

    /// A lifecycle hook was invoked in a state that does not allow it.
    #[error("invalid logging lifecycle transition: {0}")]
    InvalidLifecycle(&'static str),

    // --- Signal Handling ---
    /// The OS signal listener could not be installed.
    #[error("failed to register signal handler: {0}")]
    SignalRegistration(#[source] std::io::Error),

    /// A background listener thread could not be started.
    #[error("failed to spawn background thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    /// The operation was cancelled by SIGINT or SIGTERM.
    #[error("Operation cancelled by signal")]
    Interrupted,

    /// The operation's context was cancelled by its owner.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, AppError>;

/// Reports an unrecoverable error on stderr and terminates the process.
///
/// Used at the hook boundary only; library functions return [`Result`].
pub fn fatal(err: AppError) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(EXIT_FATAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_stream_write_is_not_a_path_error() {
        let err = AppError::StreamWrite(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        let msg = err.to_string();
        assert_eq!(msg, "failed to write to output stream: pipe closed");
        assert!(!msg.contains("path"));
    }

    #[test]
    fn test_messages_carry_underlying_error() {
        let err = AppError::LogFileOpen {
            path: ".oc-mirror.log".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "Access denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains(".oc-mirror.log"));
        assert!(msg.contains("Access denied"));

        assert_eq!(
            AppError::InvalidVerbosity(12).to_string(),
            "invalid verbosity level 12 (valid 0-9)"
        );
    }
}
