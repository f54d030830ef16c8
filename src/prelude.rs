//! The `mirror-lifecycle` prelude for convenient library usage.
//!
//! # Example
//!
//! ```
//! use mirror_lifecycle::prelude::*;
//!
//! let (ctx, cancel) = Context::with_cancel(&Context::background());
//! cancel.cancel();
//! assert!(matches!(ctx.check(), Err(AppError::Cancelled)));
//! ```

pub use crate::cancel_context::{cancel_context, try_cancel_context, CancelContextFactory};
pub use crate::cancellation::{CancelHandle, CancelReason, Context};
pub use crate::errors::{AppError, Result};
pub use crate::logging::{
    primary_level, secondary_level, setup, teardown, LifecycleState, OutputStream,
};
pub use crate::options::{IoStreams, LifecycleOptions};
pub use crate::signal::WATCHED_SIGNALS;
