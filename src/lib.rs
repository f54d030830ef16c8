//! `mirror-lifecycle` manages the lifetime of a long-running mirroring command.
//!
//! It provides two independent pieces that a command layer wires around its
//! operation:
//! 1.  **Cancellation**: SIGINT/SIGTERM are bridged into a cancellable
//!     [`Context`], registered lazily and exactly once per process.
//! 2.  **Logging**: a pre-run hook tees the `tracing` and `log` output, plus
//!     the command's own stdout/stderr, into a persistent `.oc-mirror.log`;
//!     a post-run hook flushes and closes everything again.
//!
//! # Example: Library Usage
//!
//! ```no_run
//! use mirror_lifecycle::prelude::*;
//!
//! let mut options = LifecycleOptions::new(IoStreams::system());
//! options.verbosity = 1;
//!
//! options.logfile_pre_run(&[]);
//! let result = {
//!     let (ctx, _cancel) = cancel_context(&Context::background());
//!     tracing::info!("mirroring started");
//!     log::debug!("resolving catalogs");
//!     ctx.check()
//! };
//! options.logfile_post_run(&[]);
//! result.unwrap();
//! ```

#[cfg(not(unix))]
compile_error!("mirror-lifecycle relies on Unix signals and file modes");

pub mod cancel_context;
pub mod cancellation;
pub mod cli;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod operation;
pub mod options;
pub mod prelude;
pub mod signal;

// Re-export key public types for easier use as a library
pub use cancel_context::{cancel_context, try_cancel_context, CancelContextFactory};
pub use cancellation::{CancelHandle, CancelReason, Context};
pub use errors::{AppError, Result};
pub use options::{IoStreams, LifecycleOptions};
