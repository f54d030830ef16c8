//! Shared output streams and the persistent log file.
//!
//! Every sink is an [`OutputStream`]: a cloneable handle that serializes each
//! `write` call under a lock, so records written concurrently from several
//! threads never interleave. [`OutputStream::tee`] builds the fan-out writer
//! that duplicates every write to several destinations.

use crate::constants::LOG_FILE_MODE;
use crate::errors::{AppError, Result};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock_poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "output stream lock poisoned")
}

/// A cloneable, thread-safe writer.
#[derive(Clone)]
pub struct OutputStream {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream").finish_non_exhaustive()
    }
}

impl OutputStream {
    /// Wraps any writer.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// The process's standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// The process's standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// A stream that accepts and drops everything.
    pub fn discard() -> Self {
        Self::new(io::sink())
    }

    /// Builds a stream that duplicates every write to all `targets`.
    pub fn fan_out(targets: Vec<OutputStream>) -> Self {
        Self::new(FanOut { targets })
    }

    /// Shorthand for a two-way fan-out of `self` and `other`.
    pub fn tee(&self, other: &OutputStream) -> Self {
        Self::fan_out(vec![self.clone(), other.clone()])
    }

    /// Whether both handles refer to the same underlying writer.
    pub fn same_stream(&self, other: &OutputStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Box<dyn Write + Send>>> {
        self.inner.lock().map_err(|_| lock_poisoned())
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // The whole buffer goes out under one lock acquisition.
        self.lock()?.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

/// Duplicates writes to several streams.
///
/// Every target receives the bytes even if an earlier one fails; the first
/// error is reported after all targets were attempted.
struct FanOut {
    targets: Vec<OutputStream>,
}

impl Write for FanOut {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut first_err = None;
        for target in &mut self.targets {
            if let Err(e) = target.write_all(buf) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut first_err = None;
        for target in &mut self.targets {
            if let Err(e) = target.flush() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// A cloneable, thread-safe reader. Passed through the lifecycle untouched.
#[derive(Clone)]
pub struct InputStream {
    inner: Arc<Mutex<Box<dyn Read + Send>>>,
}

impl fmt::Debug for InputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputStream").finish_non_exhaustive()
    }
}

impl InputStream {
    pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(reader))),
        }
    }

    /// The process's standard input.
    pub fn stdin() -> Self {
        Self::new(io::stdin())
    }

    /// A reader that is always at end of input.
    pub fn empty() -> Self {
        Self::new(io::empty())
    }

    /// Whether both handles refer to the same underlying reader.
    pub fn same_stream(&self, other: &InputStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.lock().map_err(|_| lock_poisoned())?.read(buf)
    }
}

/// The persistent, append-only log file.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    file: Arc<Mutex<Option<File>>>,
}

impl LogFile {
    /// Opens `path` for appending, creating it with owner-only permissions
    /// if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .mode(LOG_FILE_MODE)
            .open(&path)
            .map_err(|source| AppError::LogFileOpen {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(Some(file))),
        })
    }

    /// Path the file was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A stream writing into this file.
    pub fn stream(&self) -> OutputStream {
        OutputStream::new(LogFileWriter {
            file: Arc::clone(&self.file),
        })
    }

    /// Whether [`LogFile::close`] has already run.
    pub fn is_closed(&self) -> bool {
        self.file.lock().map(|f| f.is_none()).unwrap_or(true)
    }

    /// Flushes, syncs and releases the file handle.
    ///
    /// Closing an already closed file is a no-op.
    pub fn close(&self) -> Result<()> {
        let close_err = |source: io::Error| AppError::LogFileClose {
            path: self.path().display().to_string(),
            source,
        };

        let taken = self.file.lock().map_err(|_| close_err(lock_poisoned()))?.take();
        match taken {
            Some(mut file) => {
                file.flush().map_err(close_err)?;
                file.sync_all().map_err(close_err)?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

struct LogFileWriter {
    file: Arc<Mutex<Option<File>>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.file.lock().map_err(|_| lock_poisoned())?;
        match guard.as_mut() {
            Some(file) => {
                file.write_all(buf)?;
                Ok(buf.len())
            }
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "log file is closed",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self.file.lock().map_err(|_| lock_poisoned())?;
        match guard.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// An in-memory stream whose contents can be read back. Used by tests.
#[derive(Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream appending into this buffer.
    pub fn stream(&self) -> OutputStream {
        OutputStream::new(self.clone())
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .map_err(|_| lock_poisoned())?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
