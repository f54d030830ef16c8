// tests/signal_watched.rs
//
// Raises real signals in this test process, so it holds a single test.

use mirror_lifecycle::prelude::*;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::low_level::raise;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_watched_signals_cancel_derived_contexts() {
    let factory = CancelContextFactory::global();

    // Concurrent first use registers the listener once, without errors.
    let derived: Vec<(Context, CancelHandle)> = (0..8)
        .map(|_| thread::spawn(|| try_cancel_context(&Context::background()).unwrap()))
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();
    assert!(factory.is_initialized());

    raise(SIGTERM).unwrap();
    for (ctx, _cancel) in &derived {
        assert!(ctx.wait_timeout(Duration::from_secs(5)));
        assert_eq!(ctx.reason(), Some(CancelReason::Interrupted));
    }

    // A burst of signals against a fresh context neither deadlocks nor
    // leaves it uncancelled.
    let (parent, _parent_cancel) = Context::with_cancel(&Context::background());
    let (ctx, _cancel) = try_cancel_context(&parent).unwrap();
    for _ in 0..3 {
        raise(SIGINT).unwrap();
    }
    assert!(ctx.wait_timeout(Duration::from_secs(5)));
    assert!(!parent.is_cancelled());

    drop(derived);
    let deadline = Instant::now() + Duration::from_secs(5);
    while factory.active_watchers() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(factory.active_watchers(), 0);
}
