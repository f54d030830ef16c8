//! Maps the `--verbose` numeral onto each logger's severity threshold.

use tracing_subscriber::filter::LevelFilter;

/// Threshold for the primary (`tracing`) logger.
///
/// 0 keeps informational output only, 1-4 add debug events, 5 and above
/// add trace events.
pub fn primary_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1..=4 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Threshold for the secondary (`log`) logger.
///
/// Levels 1 and 2 intentionally share the debug tier, and every level from
/// 3 up maps to trace.
pub fn secondary_level(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Info,
        1 | 2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}
