//! Process-wide routing for both logging facilities.
//!
//! The `tracing` subscriber and the `log` logger can each be installed only
//! once per process, so they are installed on the first setup and point at
//! this router. Later setups and teardowns only swap the router's
//! destinations, hooks and thresholds.

use super::hooks::LogHook;
use super::sink::OutputStream;
use crate::errors::{AppError, Result};
use once_cell::sync::{Lazy, OnceCell};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{reload, Registry};

pub(crate) type PrimaryFilterHandle = reload::Handle<LevelFilter, Registry>;

static ROUTER: Lazy<LogRouter> = Lazy::new(LogRouter::new);
static SECONDARY_LOGGER: SecondaryLogger = SecondaryLogger;

pub(crate) fn router() -> &'static LogRouter {
    &ROUTER
}

pub(crate) struct LogRouter {
    installed: OnceCell<PrimaryFilterHandle>,
    primary: RwLock<OutputStream>,
    hooks: RwLock<Vec<Arc<dyn LogHook>>>,
    verbosity: AtomicU8,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LogRouter {
    fn new() -> Self {
        Self {
            installed: OnceCell::new(),
            primary: RwLock::new(OutputStream::discard()),
            hooks: RwLock::new(Vec::new()),
            verbosity: AtomicU8::new(0),
        }
    }

    /// Installs the global subscriber and logger on first call.
    pub(crate) fn install(&self) -> Result<&PrimaryFilterHandle> {
        self.installed.get_or_try_init(|| {
            let (filter, handle) = reload::Layer::new(LevelFilter::OFF);
            // Header-less lines: no timestamp, level or target decoration.
            let lines = fmt::layer()
                .with_writer(PrimaryWriter)
                .with_ansi(false)
                .without_time()
                .with_level(false)
                .with_target(false);
            let subscriber = tracing_subscriber::registry().with(filter).with(lines);

            tracing::subscriber::set_global_default(subscriber)
                .map_err(|e| AppError::LoggerConfig(e.to_string()))?;
            log::set_logger(&SECONDARY_LOGGER)
                .map_err(|e| AppError::LoggerConfig(e.to_string()))?;
            log::set_max_level(log::LevelFilter::Off);
            Ok(handle)
        })
    }

    /// Points the primary logger at `output` with the given threshold.
    ///
    /// Nothing is mirrored straight to stderr; `output` is the only destination.
    pub(crate) fn configure_primary(
        &self,
        level: LevelFilter,
        verbosity: u8,
        output: OutputStream,
    ) -> Result<()> {
        let handle = self.install()?;
        handle
            .reload(level)
            .map_err(|e| AppError::LoggerConfig(e.to_string()))?;
        self.verbosity.store(verbosity, Ordering::SeqCst);

        *write(&self.primary) = output;
        Ok(())
    }

    /// Re-targets the primary logger without touching its threshold.
    pub(crate) fn reroute_primary(&self, output: OutputStream) {
        *write(&self.primary) = output;
    }

    pub(crate) fn flush_primary(&self) -> io::Result<()> {
        let mut output = read(&self.primary).clone();
        output.flush()
    }

    pub(crate) fn verbosity(&self) -> u8 {
        self.verbosity.load(Ordering::SeqCst)
    }

    /// Sets the secondary logger's global threshold.
    pub(crate) fn set_secondary_level(&self, level: log::LevelFilter) -> Result<()> {
        self.install()?;
        log::set_max_level(level);
        Ok(())
    }

    pub(crate) fn add_hook(&self, hook: Arc<dyn LogHook>) {
        write(&self.hooks).push(hook);
    }

    /// Removes every hook, closing each one. All hooks are closed even if one
    /// fails; the first error is returned.
    pub(crate) fn clear_hooks(&self) -> io::Result<()> {
        let hooks = std::mem::take(&mut *write(&self.hooks));
        let mut first_err = None;
        for hook in hooks {
            if let Err(e) = hook.close() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub(crate) fn hook_count(&self) -> usize {
        read(&self.hooks).len()
    }

    fn dispatch(&self, record: &log::Record<'_>) {
        for hook in read(&self.hooks).iter() {
            if record.level() > hook.threshold() {
                continue;
            }
            if let Err(e) = hook.fire(record) {
                eprintln!("Failed to fire log hook: {}", e);
            }
        }
    }

    fn primary_writer(&self) -> OutputStream {
        read(&self.primary).clone()
    }
}

/// `MakeWriter` handing the fmt layer the router's current primary output.
#[derive(Debug, Clone, Copy)]
struct PrimaryWriter;

impl<'a> MakeWriter<'a> for PrimaryWriter {
    type Writer = OutputStream;

    fn make_writer(&'a self) -> Self::Writer {
        router().primary_writer()
    }
}

/// `log::Log` implementation that only feeds the router's hooks.
struct SecondaryLogger;

impl log::Log for SecondaryLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            router().dispatch(record);
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::sink::CaptureBuffer;
    use crate::logging::test_guard;

    #[test]
    fn test_primary_events_reach_configured_output() {
        let _guard = test_guard();
        let buf = CaptureBuffer::new();
        let r = router();

        let output = buf.stream();
        r.configure_primary(LevelFilter::INFO, 0, output.clone()).unwrap();
        assert!(r.primary_writer().same_stream(&output));
        tracing::info!("routed line");
        tracing::debug!("filtered line");
        r.reroute_primary(OutputStream::discard());

        let contents = buf.contents();
        assert!(contents.contains("routed line"));
        assert!(!contents.contains("filtered line"));
    }

    #[test]
    fn test_clear_hooks_closes_all() {
        use crate::logging::{TextFormatter, WriterHook};

        let _guard = test_guard();
        let r = router();
        r.clear_hooks().unwrap();
        r.add_hook(Arc::new(WriterHook::new(
            OutputStream::discard(),
            log::LevelFilter::Info,
            TextFormatter::console(),
        )));
        assert_eq!(r.hook_count(), 1);
        r.clear_hooks().unwrap();
        assert_eq!(r.hook_count(), 0);
    }
}
