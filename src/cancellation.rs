//! Provides a cancellable context for long-running operations.
//!
//! A [`Context`] represents the lifetime of an operation. It can be derived
//! from a parent with [`Context::with_cancel`], which hands back a
//! [`CancelHandle`]; cancelling the handle, dropping it, or cancelling any
//! ancestor marks the context done. Consumers either poll
//! [`Context::is_cancelled`] or block on [`Context::done`].

use crate::errors::{AppError, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Why a context was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Cancelled through its handle (or an ancestor's handle).
    Cancelled,
    /// Cancelled because SIGINT or SIGTERM was received.
    Interrupted,
}

#[derive(Debug)]
struct State {
    reason: Option<CancelReason>,
    // Dropped on cancellation so every `done()` receiver disconnects.
    done_tx: Option<Sender<()>>,
    children: Vec<Weak<Inner>>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    state: Mutex<State>,
    done_rx: Receiver<()>,
}

impl Inner {
    fn new() -> Self {
        let (done_tx, done_rx) = bounded(0);
        Self {
            cancelled: AtomicBool::new(false),
            state: Mutex::new(State {
                reason: None,
                done_tx: Some(done_tx),
                children: Vec::new(),
            }),
            done_rx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // The state is only mutated in short, non-panicking sections.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancel(&self, reason: CancelReason) {
        let children = {
            let mut state = self.lock();
            if state.reason.is_some() {
                return;
            }
            state.reason = Some(reason);
            self.cancelled.store(true, Ordering::SeqCst);
            state.done_tx.take();
            std::mem::take(&mut state.children)
        };

        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel(reason);
        }
    }
}

/// A cloneable, thread-safe handle on an operation's lifetime.
///
/// # Examples
///
/// ```
/// use mirror_lifecycle::cancellation::{CancelReason, Context};
///
/// let root = Context::background();
/// let (ctx, cancel) = Context::with_cancel(&root);
/// assert!(!ctx.is_cancelled());
///
/// cancel.cancel();
/// assert!(ctx.is_cancelled());
/// assert_eq!(ctx.reason(), Some(CancelReason::Cancelled));
/// assert!(!root.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// Returns a root context that is never cancelled.
    pub fn background() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
        }
    }

    /// Derives a child context that is cancelled when `parent` is, or when
    /// the returned handle is cancelled or dropped.
    pub fn with_cancel(parent: &Context) -> (Context, CancelHandle) {
        let child = Context::background();

        let inherited = {
            let mut state = parent.inner.lock();
            match state.reason {
                Some(reason) => Some(reason),
                None => {
                    state.children.retain(|c| c.strong_count() > 0);
                    state.children.push(Arc::downgrade(&child.inner));
                    None
                }
            }
        };
        if let Some(reason) = inherited {
            child.inner.cancel(reason);
        }

        let handle = CancelHandle {
            inner: Arc::clone(&child.inner),
        };
        (child, handle)
    }

    /// Checks if the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Relaxed)
    }

    /// Returns the reason of the first cancellation, if any.
    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.lock().reason
    }

    /// Returns a receiver that disconnects once the context is cancelled.
    ///
    /// Nothing is ever sent on it, so `recv` returning `Err` is the done signal.
    /// This makes the context usable inside `crossbeam_channel::select!`.
    pub fn done(&self) -> Receiver<()> {
        self.inner.done_rx.clone()
    }

    /// Blocks until the context is cancelled.
    pub fn wait(&self) {
        let _ = self.inner.done_rx.recv();
    }

    /// Blocks until the context is cancelled or `timeout` elapses.
    ///
    /// Returns `true` if the context was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.inner.done_rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) | Ok(()) => self.is_cancelled(),
        }
    }

    /// Returns an error describing the cancellation, or `Ok(())` if the
    /// operation may continue.
    pub fn check(&self) -> Result<()> {
        match self.reason() {
            None => Ok(()),
            Some(CancelReason::Interrupted) => Err(AppError::Interrupted),
            Some(CancelReason::Cancelled) => Err(AppError::Cancelled),
        }
    }

    pub(crate) fn cancel_with(&self, reason: CancelReason) {
        self.inner.cancel(reason);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

/// Cancels the context it was created with.
///
/// Dropping the handle cancels the context too, so binding it to `_` cancels
/// immediately; keep it in a named binding for the lifetime of the operation.
#[derive(Debug)]
#[must_use = "dropping a CancelHandle cancels its context immediately"]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

impl CancelHandle {
    /// Cancels the associated context. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel(CancelReason::Cancelled);
    }
}

impl Drop for CancelHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
