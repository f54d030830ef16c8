//! Stand-in for the mirroring work that runs inside the lifecycle.
//!
//! It announces the workspace, reports through both loggers, and then holds
//! the context until it is cancelled or the requested duration runs out.

use crate::cancellation::Context;
use crate::errors::{AppError, Result};
use crate::logging::verbosity_enabled;
use crate::options::LifecycleOptions;
use std::io::Write;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Runs until `ctx` is cancelled or `duration` elapses.
///
/// # Errors
/// Returns `AppError::Interrupted`/`AppError::Cancelled` when the context
/// ends the operation early, or an I/O error if the output stream fails.
pub fn run(ctx: &Context, options: &LifecycleOptions, duration: Option<Duration>) -> Result<()> {
    let mut out = options.streams.out.clone();
    writeln!(out, "workspace: {}", options.dir).map_err(AppError::StreamWrite)?;

    tracing::info!("operation started");
    log::info!("watching for SIGINT/SIGTERM");
    if verbosity_enabled(2) {
        tracing::debug!(dir = %options.dir, ?duration, "operation parameters");
    }

    let started = Instant::now();
    let mut ticks = 0u64;
    loop {
        let remaining = match duration {
            Some(limit) => match limit.checked_sub(started.elapsed()) {
                Some(left) if !left.is_zero() => left,
                _ => break,
            },
            None => PROGRESS_INTERVAL,
        };

        if ctx.wait_timeout(remaining.min(PROGRESS_INTERVAL)) {
            log::warn!("operation interrupted after {} tick(s)", ticks);
            return ctx.check();
        }
        ticks += 1;
        log::debug!("tick {}", ticks);
    }

    ctx.check()?;
    tracing::info!("operation finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancelReason;
    use crate::logging::{CaptureBuffer, InputStream, OutputStream};
    use crate::options::IoStreams;
    use std::thread;

    fn options(out: &CaptureBuffer) -> LifecycleOptions {
        LifecycleOptions::new(IoStreams::new(
            InputStream::empty(),
            out.stream(),
            OutputStream::discard(),
        ))
    }

    #[test]
    fn test_completes_after_duration() {
        let out = CaptureBuffer::new();
        let opts = options(&out);
        let ctx = Context::background();
        run(&ctx, &opts, Some(Duration::from_millis(50))).unwrap();
        assert_eq!(out.contents(), "workspace: oc-mirror-workspace\n");
    }

    #[test]
    fn test_stops_when_cancelled() {
        let out = CaptureBuffer::new();
        let opts = options(&out);
        let (ctx, cancel) = Context::with_cancel(&Context::background());

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            cancel.cancel();
        });
        let started = Instant::now();
        let result = run(&ctx, &opts, None);
        canceller.join().unwrap();

        assert!(matches!(result, Err(AppError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "reader went away"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_failure_reports_stream_write() {
        let opts = LifecycleOptions::new(IoStreams::new(
            InputStream::empty(),
            OutputStream::new(BrokenPipe),
            OutputStream::discard(),
        ));
        let err = run(&Context::background(), &opts, Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(err, AppError::StreamWrite(_)));
        assert!(err.to_string().contains("reader went away"));
    }

    #[test]
    fn test_interrupted_context_reports_interrupted() {
        let out = CaptureBuffer::new();
        let opts = options(&out);
        let (ctx, _cancel) = Context::with_cancel(&Context::background());
        ctx.cancel_with(CancelReason::Interrupted);
        let result = run(&ctx, &opts, Some(Duration::from_secs(30)));
        assert!(matches!(result, Err(AppError::Interrupted)));
    }
}
