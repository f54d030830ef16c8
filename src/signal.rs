// src/signal.rs

//! Bridges OS termination signals into cancellation events.
//!
//! [`register`] installs the OS-level listener and yields one event per
//! delivered signal. [`CancellationSource`] fans those events out to every
//! context watcher subscribed at the time.

use crate::errors::{AppError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::os::raw::c_int;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread;

/// Signals that cancel derived contexts.
pub const WATCHED_SIGNALS: [c_int; 2] = [SIGINT, SIGTERM];

/// Installs a listener for `signals` and returns a stream of cancellation events.
///
/// Every delivered signal produces one event; repeated signals are not
/// deduplicated. Must be called at most once per process for a given signal
/// set; [`crate::cancel_context::CancelContextFactory`] guarantees that.
///
/// # Errors
/// Returns an error if the signal handler or its listener thread cannot be set up.
pub fn register(signals: &[c_int]) -> Result<Receiver<()>> {
    let mut listener = Signals::new(signals).map_err(AppError::SignalRegistration)?;
    let (tx, rx) = unbounded();

    thread::Builder::new()
        .name("signal-listener".to_string())
        .spawn(move || {
            for signal in listener.forever() {
                tracing::debug!(signal, "termination signal received");
                if tx.send(()).is_err() {
                    break;
                }
            }
        })
        .map_err(AppError::ThreadSpawn)?;

    Ok(rx)
}

#[derive(Debug, Default)]
struct Subscribers {
    next_id: u64,
    senders: Vec<(u64, Sender<()>)>,
    // Set when an event arrived while nobody was subscribed. At most one
    // event is held back, however many signals arrived.
    pending: bool,
}

/// Process-lived fan-out of cancellation events.
#[derive(Debug)]
pub struct CancellationSource {
    subscribers: Mutex<Subscribers>,
}

/// A live registration with a [`CancellationSource`].
///
/// Dropping it removes the registration.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    events: Receiver<()>,
    source: Weak<CancellationSource>,
}

impl Subscription {
    /// Receives one `()` per cancellation event, collapsed to at most one queued.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.events
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(source) = self.source.upgrade() {
            source.lock().senders.retain(|(id, _)| *id != self.id);
        }
    }
}

impl CancellationSource {
    /// Starts dispatching `events` to subscribers on a background thread.
    pub fn start(events: Receiver<()>) -> Result<Arc<Self>> {
        let source = Arc::new(Self {
            subscribers: Mutex::new(Subscribers::default()),
        });

        let dispatcher = Arc::clone(&source);
        thread::Builder::new()
            .name("cancel-broadcast".to_string())
            .spawn(move || {
                for _event in events.iter() {
                    dispatcher.broadcast();
                }
            })
            .map_err(AppError::ThreadSpawn)?;

        Ok(source)
    }

    /// Subscribes to cancellation events.
    ///
    /// If an event arrived while nobody was listening, the new subscriber
    /// receives it immediately.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = bounded(1);
        let mut subs = self.lock();
        if std::mem::take(&mut subs.pending) {
            // Cannot fail: the channel is empty and `rx` is alive.
            let _ = tx.try_send(());
        }
        let id = subs.next_id;
        subs.next_id += 1;
        subs.senders.push((id, tx));
        Subscription {
            id,
            events: rx,
            source: Arc::downgrade(self),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().senders.len()
    }

    fn broadcast(&self) {
        let mut subs = self.lock();
        let mut delivered = 0;
        subs.senders.retain(|(_, tx)| match tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Disconnected(())) => false,
        });
        if delivered == 0 {
            subs.pending = true;
        }
        log::debug!("cancellation event delivered to {} watcher(s)", delivered);
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
