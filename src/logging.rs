//! Kernel logging facility.
//!
//! Routes the `log` crate's macros to the serial port. Debug builds log at
//! `Debug`, release builds at `Info`.

use log::{LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Global logger instance registered with the `log` facade.
pub static LOGGER: SerialLogger = SerialLogger::new();

/// Logger that writes records to the serial port, one line per record.
pub struct SerialLogger {
    inner: Mutex<()>,
}

impl SerialLogger {
    pub const fn new() -> SerialLogger {
        SerialLogger {
            inner: Mutex::new(()),
        }
    }
}

impl Default for SerialLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _guard = self.inner.lock();
            crate::serial_println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Registers the serial logger with the `log` facade.
///
/// Must be called once, before the first log record is emitted.
pub fn init() {
    log::set_logger(&LOGGER)
        .map(|()| {
            log::set_max_level(
                #[cfg(debug_assertions)]
                LevelFilter::Debug,
                #[cfg(not(debug_assertions))]
                LevelFilter::Info,
            )
        })
        .expect("Logger initialization failed");
}
