//! The options aggregate shared between flag binding and the lifecycle hooks.

use crate::cli::RootArgs;
use crate::constants::DEFAULT_WORKSPACE_DIR;
use crate::errors::fatal;
use crate::logging::{self, InputStream, LifecycleState, LoggingSession, OutputStream};

/// The three standard I/O endpoints an operation writes through.
#[derive(Debug, Clone)]
pub struct IoStreams {
    pub input: InputStream,
    pub out: OutputStream,
    pub err_out: OutputStream,
}

impl IoStreams {
    pub fn new(input: InputStream, out: OutputStream, err_out: OutputStream) -> Self {
        Self {
            input,
            out,
            err_out,
        }
    }

    /// stdin, stdout and stderr of the current process.
    pub fn system() -> Self {
        Self::new(
            InputStream::stdin(),
            OutputStream::stdout(),
            OutputStream::stderr(),
        )
    }
}

/// Root options of a command: its streams, workspace and verbosity.
///
/// While logging is active, `streams.out` and `streams.err_out` also write
/// into the log file; they are restored when logging is torn down.
#[derive(Debug)]
pub struct LifecycleOptions {
    pub streams: IoStreams,
    /// Workspace directory (hidden `--dir` flag).
    pub dir: String,
    /// Log verbosity, 0-9.
    pub verbosity: u8,
    pub(crate) state: LifecycleState,
    pub(crate) session: Option<LoggingSession>,
}

impl LifecycleOptions {
    /// Options with default workspace and verbosity 0.
    pub fn new(streams: IoStreams) -> Self {
        Self {
            streams,
            dir: DEFAULT_WORKSPACE_DIR.to_string(),
            verbosity: 0,
            state: LifecycleState::Uninitialized,
            session: None,
        }
    }

    /// Options bound from parsed root flags.
    pub fn from_args(args: &RootArgs, streams: IoStreams) -> Self {
        Self {
            dir: args.dir.clone(),
            verbosity: args.verbose,
            ..Self::new(streams)
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Pre-run hook: attaches the log file. Positional arguments are ignored.
    ///
    /// Terminates the process if logging cannot be configured.
    pub fn logfile_pre_run(&mut self, _args: &[String]) {
        if let Err(e) = logging::setup(self) {
            fatal(e);
        }
    }

    /// Post-run hook: detaches the log file. Must run whether or not the
    /// operation succeeded; safe to call when pre-run never ran.
    ///
    /// Terminates the process if the log file cannot be closed.
    pub fn logfile_post_run(&mut self, _args: &[String]) {
        if let Err(e) = logging::teardown(self) {
            fatal(e);
        }
    }
}
