use std::io::{self, Stdout, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::encode::ffmpeg::{OutputFormat, PipeCommand, is_ffmpeg_on_path};
use crate::foundation::error::{VideogenError, VideogenResult};
use crate::frameloop::PanicSource;

/// Byte sink the frame loop writes into, chosen by [`OutputFormat`].
#[derive(Debug)]
pub enum OutputSink {
    /// Raw RGBA bytes straight to our stdout.
    Raw(Stdout),
    /// An encoder subprocess fed through its stdin.
    Encoder(PipeCommand),
    /// In-memory capture (tests, debugging).
    Memory(InMemorySink),
}

impl OutputSink {
    /// Open the sink for `format` with the given stream geometry.
    pub fn open(format: OutputFormat, width: u32, height: u32, rate: u32) -> VideogenResult<Self> {
        if format == OutputFormat::Raw {
            return Ok(Self::Raw(io::stdout()));
        }
        if !is_ffmpeg_on_path() {
            return Err(VideogenError::encode(format!(
                "ffmpeg is required for {format} output, but was not found on PATH"
            )));
        }
        Ok(Self::Encoder(PipeCommand::ffmpeg(format, width, height, rate)?))
    }

    /// Flush and close the sink, waiting for an encoder process to exit.
    pub fn close(self) -> VideogenResult<()> {
        match self {
            Self::Raw(mut out) => out
                .flush()
                .map_err(|e| VideogenError::encode(format!("failed to flush stdout: {e}"))),
            Self::Encoder(cmd) => cmd.close(),
            Self::Memory(mem) => {
                mem.close();
                Ok(())
            }
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Raw(out) => out.write(buf),
            Self::Encoder(cmd) => cmd.write(buf),
            Self::Memory(mem) => mem.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Raw(out) => out.write_all(buf),
            Self::Encoder(cmd) => cmd.write_all(buf),
            Self::Memory(mem) => mem.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Raw(out) => out.flush(),
            Self::Encoder(cmd) => cmd.flush(),
            Self::Memory(mem) => mem.flush(),
        }
    }
}

/// In-memory sink for tests and debugging.
///
/// Clones share the same log, so a test can keep one handle while the frame loop owns another.
/// Faults can be injected on a given write attempt.
#[derive(Clone, Debug, Default)]
pub struct InMemorySink {
    log: Arc<Mutex<MemoryLog>>,
}

#[derive(Debug, Default)]
struct MemoryLog {
    writes: Vec<Vec<u8>>,
    attempts: usize,
    fail_from: Option<usize>,
    panic_at: Option<usize>,
    closed: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `n`th write attempt (1-based) and every later one fails.
    pub fn failing_from(n: usize) -> Self {
        let sink = Self::new();
        sink.lock().fail_from = Some(n);
        sink
    }

    /// A sink that panics on its `n`th write attempt (1-based).
    ///
    /// The payload is a [`PanicSource`] wrapping an `io::Error`.
    pub fn panicking_at(n: usize) -> Self {
        let sink = Self::new();
        sink.lock().panic_at = Some(n);
        sink
    }

    /// Successful writes, one entry per `write` call.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// All successfully written bytes, concatenated.
    pub fn bytes(&self) -> Vec<u8> {
        self.lock().writes.concat()
    }

    /// Number of `write` calls, including failed ones.
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Reject every later write.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for InMemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut log = self.lock();
        log.attempts += 1;
        let attempt = log.attempts;
        if log.panic_at == Some(attempt) {
            drop(log);
            let err = io::Error::other(format!("injected panic on write {attempt}"));
            std::panic::panic_any(Arc::new(err) as PanicSource);
        }
        if log.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink is closed"));
        }
        if log.fail_from.is_some_and(|n| attempt >= n) {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                format!("injected failure on write {attempt}"),
            ));
        }
        log.writes.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
