//! Logger utility for application-wide logging
//!
//! A `log::Log` implementation that appends `[LEVEL] message` lines to a log
//! file and mirrors them on stderr, keeping stdout free for command output.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use log::{Log, Record, Metadata, LevelFilter};

/// File + console logger
pub struct Logger {
    /// File handle for log output
    file: Mutex<Option<File>>,
    /// Most verbose level that is written
    level: LevelFilter,
    /// Whether records are echoed to stderr
    console: bool,
}

impl Logger {
    /// Creates a logger appending to `log_file`
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the log file, created if missing
    /// * `level` - Most verbose level to record
    pub fn new(log_file: impl AsRef<Path>, level: LevelFilter) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(log_file)?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            level,
            console: true,
        })
    }

    /// Stop echoing records to stderr
    pub fn quiet(mut self) -> Self {
        self.console = false;
        self
    }

    /// Writes one line to the log file
    pub fn write_line(&self, message: &str) -> io::Result<()> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Installs a logger as the global `log` backend
    ///
    /// Only the first call takes effect; later calls warn on stderr.
    pub fn init_global_logger(log_file: impl AsRef<Path>, level: LevelFilter) -> io::Result<()> {
        let global_logger = Logger::new(log_file, level)?;

        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
            return Ok(());
        }

        log::set_max_level(level);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            if let Err(e) = self.write_line(&message) {
                eprintln!("Cannot write log file: {}", e);
            }

            if self.console {
                eprintln!("{}", message);
            }
        }
    }

    fn flush(&self) {
        // write_line flushes every record
    }
}
