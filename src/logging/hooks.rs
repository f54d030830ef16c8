//! Hooks fired for every record of the secondary logger.

use super::format::TextFormatter;
use super::sink::OutputStream;
use log::{LevelFilter, Record};
use std::io::{self, Write};

/// A destination attached to the secondary logger.
pub trait LogHook: Send + Sync {
    /// Most verbose level this hook accepts.
    fn threshold(&self) -> LevelFilter;

    /// Handles one record that passed [`LogHook::threshold`].
    fn fire(&self, record: &Record<'_>) -> io::Result<()>;

    /// Flushes whatever the hook buffers. Called once when the hook is removed.
    fn close(&self) -> io::Result<()>;
}

/// Formats records with a [`TextFormatter`] and writes them to a stream.
pub struct WriterHook {
    writer: OutputStream,
    threshold: LevelFilter,
    formatter: TextFormatter,
}

impl WriterHook {
    pub fn new(writer: OutputStream, threshold: LevelFilter, formatter: TextFormatter) -> Self {
        Self {
            writer,
            threshold,
            formatter,
        }
    }
}

impl LogHook for WriterHook {
    fn threshold(&self) -> LevelFilter {
        self.threshold
    }

    fn fire(&self, record: &Record<'_>) -> io::Result<()> {
        let line = self.formatter.format(record);
        self.writer.clone().write_all(line.as_bytes())
    }

    fn close(&self) -> io::Result<()> {
        self.writer.clone().flush()
    }
}
