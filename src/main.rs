// src/main.rs

use anyhow::Result;
use clap::Parser;
use mirror_lifecycle::cancel_context::cancel_context;
use mirror_lifecycle::cancellation::Context;
use mirror_lifecycle::cli::Cli;
use mirror_lifecycle::constants::EXIT_INTERRUPTED;
use mirror_lifecycle::errors::AppError;
use mirror_lifecycle::operation;
use mirror_lifecycle::options::{IoStreams, LifecycleOptions};
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut options = LifecycleOptions::from_args(&cli.root, IoStreams::system());

    // --- Setup ---
    options.logfile_pre_run(&[]);
    log::debug!("Raw arguments: {:?}", std::env::args().collect::<Vec<_>>());

    // --- Execution ---
    let result = {
        let (ctx, cancel) = cancel_context(&Context::background());
        let result = operation::run(&ctx, &options, cli.duration.map(Duration::from_secs));
        cancel.cancel();
        result
    };

    // --- Teardown (always) ---
    options.logfile_post_run(&[]);

    // --- Error Handling ---
    match result {
        Ok(()) => Ok(()),
        Err(AppError::Interrupted) | Err(AppError::Cancelled) => {
            eprintln!("\nOperation cancelled.");
            std::process::exit(EXIT_INTERRUPTED);
        }
        Err(e) => Err(e.into()),
    }
}
