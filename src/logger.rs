//! In-memory sink for the `log` facade.
//!
//! Every record becomes one `[LEVEL] target: message` line in a fixed-size
//! ring buffer. When the buffer is full the oldest bytes are dropped.

use core::fmt::{self, Write};

use log::{LevelFilter, Metadata, Record};
use spin::{Mutex, MutexGuard, Once};

use crate::config::{LOG_BUFFER_SIZE, LOG_LEVEL};
use crate::sync::IrqGuard;

const _: () = assert!(LOG_BUFFER_SIZE > 0);

/// The global log buffer. Only ever locked with IRQs masked.
static LOG: Mutex<Log> = Mutex::new(Log::new());

static LOGGER: KernelLogger = KernelLogger;
static INIT: Once = Once::new();

/// Installs the logger and applies the configured level. Later calls do
/// nothing.
pub fn init() {
    INIT.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LOG_LEVEL);
        }
    });
}

/// Level the sink was configured with.
pub fn level() -> LevelFilter {
    LOG_LEVEL
}

/// Copies the buffered log, oldest byte first, into `buf`. Returns the number
/// of bytes copied.
pub fn read(buf: &mut [u8]) -> usize {
    let _guard = IrqGuard::new();
    LOG.lock().copy_to(buf)
}

/// A circular buffer of log bytes.
pub struct Log<const SIZE: usize = LOG_BUFFER_SIZE> {
    data: [u8; SIZE],
    /// Index of the oldest byte.
    head: usize,
    len: usize,
}

impl<const SIZE: usize> Log<SIZE> {
    pub const fn new() -> Self {
        Log {
            data: [0; SIZE],
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the log buffer as a pair of slices, oldest first.
    pub fn read(&self) -> (&[u8], &[u8]) {
        let end = self.head + self.len;
        if end <= SIZE {
            (&self.data[self.head..end], &[])
        } else {
            (&self.data[self.head..], &self.data[..end - SIZE])
        }
    }

    /// Writes to the log buffer.
    pub fn write(&mut self, buf: &[u8]) {
        for &b in buf {
            if self.len == SIZE {
                self.head = (self.head + 1) % SIZE;
                self.len -= 1;
            }
            self.data[(self.head + self.len) % SIZE] = b;
            self.len += 1;
        }
    }

    fn copy_to(&self, buf: &mut [u8]) -> usize {
        let (first, second) = self.read();
        let mut copied = 0;
        for part in [first, second] {
            let count = part.len().min(buf.len() - copied);
            buf[copied..copied + count].copy_from_slice(&part[..count]);
            copied += count;
        }
        copied
    }
}

impl<const SIZE: usize> fmt::Debug for Log<SIZE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Log")
            .field("len", &self.len)
            .field("capacity", &SIZE)
            .finish()
    }
}

/// A log writer holding the buffer lock.
struct Writer<'a> {
    log: MutexGuard<'a, Log>,
}

impl Write for Writer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.log.write(s.as_bytes());
        Ok(())
    }
}

struct KernelLogger;

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // IRQs stay masked while the lock is held, so the tick handler can
        // log without finding it taken.
        let _guard = IrqGuard::new();
        let mut writer = Writer { log: LOG.lock() };
        let _ = writeln!(
            writer,
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}
