//! Log-file lifecycle around a single operation.
//!
//! [`setup`] attaches the persistent log file: the primary (`tracing`) logger
//! writes to the output stream and the file, the secondary (`log`) logger
//! reports on the error stream and into the file through hooks, and the
//! option's stream handles are rebound so that anything written through them
//! is persisted too. [`teardown`] undoes all of it exactly once.
//!
//! ```text
//! Uninitialized --setup--> Active --teardown--> TornDown
//! ```

use crate::constants::{LOG_FILE_NAME, MAX_VERBOSITY};
use crate::errors::{AppError, Result};
use crate::options::{IoStreams, LifecycleOptions};
use std::path::Path;
use std::sync::Arc;

pub mod format;
pub mod hooks;
pub mod levels;
mod router;
pub mod sink;

pub use format::TextFormatter;
pub use hooks::{LogHook, WriterHook};
pub use levels::{primary_level, secondary_level};
pub use sink::{CaptureBuffer, InputStream, LogFile, OutputStream};

use router::router;

/// Where an options aggregate is in the logging lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Active,
    TornDown,
}

/// Resources held while logging is active; consumed by [`teardown`].
#[derive(Debug)]
pub(crate) struct LoggingSession {
    log_file: LogFile,
    original: IoStreams,
}

impl LoggingSession {
    /// Releases every resource, returning the original streams and the first
    /// error encountered. Every step runs regardless of earlier failures.
    fn close(self) -> (IoStreams, Result<()>) {
        let router = router();

        let flushed = router.flush_primary().map_err(AppError::Flush);
        router.reroute_primary(self.original.out.clone());
        let hooks_closed = router.clear_hooks().map_err(AppError::Flush);
        log::set_max_level(log::LevelFilter::Off);
        let file_closed = self.log_file.close();

        (self.original, flushed.and(hooks_closed).and(file_closed))
    }
}

/// Attaches `.oc-mirror.log` in the working directory. See [`setup_at`].
pub fn setup(options: &mut LifecycleOptions) -> Result<()> {
    setup_at(options, Path::new(LOG_FILE_NAME))
}

/// Configures both loggers around the log file at `path`.
///
/// # Errors
/// Fails if `options` is not [`LifecycleState::Uninitialized`], if the
/// verbosity is above 9, if the file cannot be opened, or if a logging
/// facility cannot be installed.
pub fn setup_at(options: &mut LifecycleOptions, path: &Path) -> Result<()> {
    match options.state {
        LifecycleState::Uninitialized => {}
        LifecycleState::Active => {
            return Err(AppError::InvalidLifecycle("logging is already set up"))
        }
        LifecycleState::TornDown => {
            return Err(AppError::InvalidLifecycle("logging was already torn down"))
        }
    }

    let verbosity = options.verbosity;
    if verbosity > MAX_VERBOSITY {
        return Err(AppError::InvalidVerbosity(verbosity));
    }

    let log_file = LogFile::open(path)?;
    let file_stream = log_file.stream();
    let original = options.streams.clone();
    let router = router();

    // Primary: all output goes through the output stream + file fan-out.
    router.configure_primary(
        primary_level(verbosity),
        verbosity,
        original.out.tee(&file_stream),
    )?;

    // Secondary: no default destination, only hooks at the resolved level.
    let level = secondary_level(verbosity);
    router.set_secondary_level(level)?;
    router.clear_hooks().map_err(AppError::Flush)?;
    router.add_hook(Arc::new(WriterHook::new(
        original.err_out.clone(),
        level,
        TextFormatter::console(),
    )));
    router.add_hook(Arc::new(WriterHook::new(
        file_stream.clone(),
        level,
        TextFormatter::persisted(),
    )));

    options.streams = IoStreams {
        input: original.input.clone(),
        out: original.out.tee(&file_stream),
        err_out: original.err_out.tee(&file_stream),
    };
    options.session = Some(LoggingSession { log_file, original });
    options.state = LifecycleState::Active;

    tracing::debug!(path = %path.display(), verbosity, "log file attached");
    Ok(())
}

/// Flushes and detaches everything [`setup`] attached.
///
/// A no-op when logging was never set up or was already torn down.
///
/// # Errors
/// Returns the first flush or close failure; all cleanup steps still run.
pub fn teardown(options: &mut LifecycleOptions) -> Result<()> {
    let Some(session) = options.session.take() else {
        return Ok(());
    };
    let (original, result) = session.close();
    options.streams = original;
    options.state = LifecycleState::TornDown;
    result
}

/// Whether messages at verbosity `level` should be emitted, given the
/// verbosity configured by the last [`setup`].
pub fn verbosity_enabled(level: u8) -> bool {
    router().verbosity() >= level
}

/// Number of hooks currently attached to the secondary logger.
pub fn active_hooks() -> usize {
    router().hook_count()
}

#[cfg(test)]
pub(crate) fn test_guard() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
