// src/cli.rs

use crate::constants::{DEFAULT_WORKSPACE_DIR, MAX_VERBOSITY};
use clap::{Args, Parser};

/// Flags every command inherits from the root command.
#[derive(Args, Debug, Clone)]
pub struct RootArgs {
    /// Assets directory
    #[arg(short = 'd', long, hide = true, default_value = DEFAULT_WORKSPACE_DIR)]
    pub dir: String,

    /// Number for the log level verbosity (valid 1-9, default is 0)
    #[arg(
        short = 'v',
        long,
        value_name = "LEVEL",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=MAX_VERBOSITY as i64)
    )]
    pub verbose: u8,
}

/// Runs a long operation with signal-driven cancellation and a persistent
/// `.oc-mirror.log` capturing everything printed along the way.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub root: RootArgs,

    /// Stop the operation after this many seconds (default: run until interrupted).
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["mirror-lifecycle"]);
        assert_eq!(cli.root.dir, "oc-mirror-workspace");
        assert_eq!(cli.root.verbose, 0);
        assert_eq!(cli.duration, None);
    }

    #[test]
    fn test_verbose_short_and_long() {
        let cli = Cli::parse_from(["mirror-lifecycle", "-v", "2"]);
        assert_eq!(cli.root.verbose, 2);
        let cli = Cli::parse_from(["mirror-lifecycle", "--verbose", "9"]);
        assert_eq!(cli.root.verbose, 9);
    }

    #[test]
    fn test_verbose_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["mirror-lifecycle", "-v", "10"]).is_err());
        assert!(Cli::try_parse_from(["mirror-lifecycle", "-v", "-1"]).is_err());
    }

    #[test]
    fn test_dir_is_hidden_from_help() {
        use clap::CommandFactory;
        let help = Cli::command().render_help().to_string();
        assert!(!help.contains("--dir"));
        assert!(help.contains("--verbose"));
    }
}
