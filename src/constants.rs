// src/constants.rs

/// Name of the persistent log file, created in the process working directory.
pub const LOG_FILE_NAME: &str = ".oc-mirror.log";

/// Permission bits applied when the log file is created (owner read/write only).
pub const LOG_FILE_MODE: u32 = 0o600;

/// Default value of the hidden `--dir` workspace flag.
pub const DEFAULT_WORKSPACE_DIR: &str = "oc-mirror-workspace";

/// Highest accepted `--verbose` value.
pub const MAX_VERBOSITY: u8 = 9;

/// Exit status used when the operation was stopped by SIGINT/SIGTERM.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Exit status used for fatal setup/teardown errors.
pub const EXIT_FATAL: i32 = 1;
