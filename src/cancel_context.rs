// src/cancel_context.rs

//! Derives contexts that are cancelled by SIGINT/SIGTERM.
//!
//! The signal bridge is registered lazily, exactly once per factory, the first
//! time a context is derived. Each derived context gets a watcher thread that
//! races the cancellation events against the context's own completion.

use crate::cancellation::{CancelHandle, CancelReason, Context};
use crate::errors::{fatal, AppError, Result};
use crate::signal::{self, CancellationSource, WATCHED_SIGNALS};
use crossbeam_channel::{select, Receiver};
use once_cell::sync::{Lazy, OnceCell};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

type Registrar = Box<dyn Fn() -> Result<Receiver<()>> + Send + Sync>;

static GLOBAL: Lazy<CancelContextFactory> =
    Lazy::new(|| CancelContextFactory::new(|| signal::register(&WATCHED_SIGNALS)));

/// Produces cancellable contexts tied to a single event source.
///
/// # Examples
///
/// ```
/// use crossbeam_channel::unbounded;
/// use mirror_lifecycle::cancel_context::CancelContextFactory;
/// use mirror_lifecycle::cancellation::Context;
/// use std::time::Duration;
///
/// let (events, rx) = unbounded();
/// let factory = CancelContextFactory::new(move || Ok(rx.clone()));
///
/// let (ctx, _cancel) = factory.derive(&Context::background()).unwrap();
/// events.send(()).unwrap();
/// assert!(ctx.wait_timeout(Duration::from_secs(1)));
/// ```
pub struct CancelContextFactory {
    registrar: Registrar,
    source: OnceCell<Arc<CancellationSource>>,
    watchers: Arc<AtomicUsize>,
}

impl fmt::Debug for CancelContextFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelContextFactory")
            .field("initialized", &self.is_initialized())
            .field("active_watchers", &self.active_watchers())
            .finish()
    }
}

impl CancelContextFactory {
    /// Creates a factory whose event source is produced by `registrar` on first use.
    pub fn new<F>(registrar: F) -> Self
    where
        F: Fn() -> Result<Receiver<()>> + Send + Sync + 'static,
    {
        Self {
            registrar: Box::new(registrar),
            source: OnceCell::new(),
            watchers: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The process-wide factory, watching [`WATCHED_SIGNALS`].
    pub fn global() -> &'static CancelContextFactory {
        &GLOBAL
    }

    /// Registers the event source if that has not happened yet.
    ///
    /// Safe to call concurrently; the registrar runs at most once on success.
    pub fn idempotent_init(&self) -> Result<&Arc<CancellationSource>> {
        self.source.get_or_try_init(|| {
            log::debug!("registering cancellation event source");
            let events = (self.registrar)()?;
            CancellationSource::start(events)
        })
    }

    /// Whether the event source has been registered.
    pub fn is_initialized(&self) -> bool {
        self.source.get().is_some()
    }

    /// Number of watcher threads currently running.
    pub fn active_watchers(&self) -> usize {
        self.watchers.load(Ordering::SeqCst)
    }

    /// Derives a child of `parent` that is also cancelled by the event source.
    ///
    /// The returned handle must stay alive for as long as the operation runs;
    /// cancelling or dropping it stops the watcher thread.
    ///
    /// # Errors
    /// Returns an error if the event source cannot be registered or the
    /// watcher thread cannot be spawned.
    pub fn derive(&self, parent: &Context) -> Result<(Context, CancelHandle)> {
        let source = self.idempotent_init()?;
        let (ctx, cancel) = Context::with_cancel(parent);

        let subscription = source.subscribe();
        let done = ctx.done();
        let watched = ctx.clone();
        let watchers = Arc::clone(&self.watchers);

        watchers.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name("cancel-watcher".to_string())
            .spawn(move || {
                select! {
                    recv(subscription.receiver()) -> event => match event {
                        Ok(()) => {
                            log::debug!("cancelling context after termination signal");
                            watched.cancel_with(CancelReason::Interrupted);
                        }
                        // Source gone; nothing left to race against.
                        Err(_) => watched.wait(),
                    },
                    recv(done) -> _ => {}
                }
                drop(subscription);
                watchers.fetch_sub(1, Ordering::SeqCst);
            });

        if let Err(e) = spawned {
            self.watchers.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::ThreadSpawn(e));
        }

        Ok((ctx, cancel))
    }
}

/// Derives a signal-cancellable context from the process-wide factory.
pub fn try_cancel_context(parent: &Context) -> Result<(Context, CancelHandle)> {
    CancelContextFactory::global().derive(parent)
}

/// Like [`try_cancel_context`], but terminates the process if the signal
/// listener cannot be installed.
pub fn cancel_context(parent: &Context) -> (Context, CancelHandle) {
    try_cancel_context(parent).unwrap_or_else(|e| fatal(e))
}
