//! Text formatting for secondary-logger records.
//!
//! Produces logfmt-style lines such as `level=debug msg=pulling catalog`.

use chrono::{SecondsFormat, Utc};
use log::{Level, Record};
use std::fmt::Write as _;

/// Formatting switches for one hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextFormatter {
    /// Omit the leading `time="..."` field.
    pub disable_timestamp: bool,
    /// Print the full level name instead of its first four characters.
    pub disable_level_truncation: bool,
    /// Never wrap field values in quotes.
    pub disable_quote: bool,
}

impl TextFormatter {
    /// The console formatting: bare level, unquoted message, no time.
    pub fn console() -> Self {
        Self {
            disable_timestamp: true,
            disable_level_truncation: true,
            disable_quote: true,
        }
    }

    /// The persisted formatting: like [`TextFormatter::console`] with timestamps.
    pub fn persisted() -> Self {
        Self {
            disable_timestamp: false,
            ..Self::console()
        }
    }

    /// Formats `record` into one newline-terminated line.
    pub fn format(&self, record: &Record<'_>) -> String {
        let message = record.args().to_string();
        self.format_parts(record.level(), message.trim_end_matches(['\n', '\r']))
    }

    fn format_parts(&self, level: Level, message: &str) -> String {
        let mut line = String::with_capacity(message.len() + 32);
        if !self.disable_timestamp {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
            let _ = write!(line, "time=\"{}\" ", now);
        }

        let level_text = level_name(level);
        let level_text = if self.disable_level_truncation {
            level_text
        } else {
            &level_text[..level_text.len().min(4)]
        };
        let _ = write!(line, "level={} msg=", level_text);

        if !self.disable_quote && needs_quoting(message) {
            let _ = write!(line, "{:?}", message);
        } else {
            line.push_str(message);
        }
        line.push('\n');
        line
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warn => "warning",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || "-._/@^+".contains(c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_format_has_no_timestamp_or_quotes() {
        let line = TextFormatter::console().format_parts(Level::Debug, "pulling catalog index");
        assert_eq!(line, "level=debug msg=pulling catalog index\n");
    }

    #[test]
    fn test_level_truncation() {
        let truncating = TextFormatter {
            disable_timestamp: true,
            disable_level_truncation: false,
            disable_quote: true,
        };
        assert_eq!(
            truncating.format_parts(Level::Warn, "careful"),
            "level=warn msg=careful\n"
        );
        assert_eq!(
            TextFormatter::console().format_parts(Level::Warn, "careful"),
            "level=warning msg=careful\n"
        );
    }

    #[test]
    fn test_quoting_only_when_enabled_and_needed() {
        let quoting = TextFormatter {
            disable_timestamp: true,
            disable_level_truncation: true,
            disable_quote: false,
        };
        assert_eq!(
            quoting.format_parts(Level::Info, "two words"),
            "level=info msg=\"two words\"\n"
        );
        assert_eq!(
            quoting.format_parts(Level::Info, "single"),
            "level=info msg=single\n"
        );
    }

    #[test]
    fn test_persisted_format_starts_with_timestamp() {
        let line = TextFormatter::persisted().format_parts(Level::Trace, "layer copied");
        assert!(line.starts_with("time=\""));
        assert!(line.ends_with(" level=trace msg=layer copied\n"));
    }

    #[test]
    fn test_trailing_newlines_are_trimmed() {
        assert_eq!(
            TextFormatter::console().format(
                &Record::builder()
                    .args(format_args!("done\n\n"))
                    .level(Level::Info)
                    .build()
            ),
            "level=info msg=done\n"
        );
    }
}
