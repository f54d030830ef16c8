// tests/signal_unwatched.rs
//
// Raises real signals in this test process, so it holds a single test.

use mirror_lifecycle::prelude::*;
use signal_hook::consts::signal::SIGUSR1;
use signal_hook::low_level::raise;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_unwatched_signal_does_not_cancel() {
    // Keep SIGUSR1 from terminating the test process.
    let delivered = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGUSR1, Arc::clone(&delivered)).unwrap();

    let (ctx, _cancel) = try_cancel_context(&Context::background()).unwrap();
    raise(SIGUSR1).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !delivered.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(delivered.load(Ordering::SeqCst));
    assert!(!ctx.wait_timeout(Duration::from_millis(300)));
    assert!(ctx.check().is_ok());
}
