//! Process logger for the `log` facade
//!
//! Library code only uses the `log` macros. Binaries call [`init`] once to
//! send records to stderr or to a log file.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

/// Log levels accepted on the command line and in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Nothing = 0,
    Error = 2,
    Warning = 3,
    #[default]
    Info = 4,
    Debug = 5,
    All = 6,
}

impl LogLevel {
    /// Create a LogLevel from an integer
    pub fn from_i32(level: i32) -> Self {
        match level {
            i32::MIN..=0 => LogLevel::Nothing,
            1 | 2 => LogLevel::Error,
            3 => LogLevel::Warning,
            4 => LogLevel::Info,
            5 => LogLevel::Debug,
            _ => LogLevel::All,
        }
    }

    /// Filter handed to the `log` facade
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Nothing => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::All => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<i32>() {
            return Ok(LogLevel::from_i32(n));
        }
        match s.to_ascii_lowercase().as_str() {
            "nothing" | "off" | "none" => Ok(LogLevel::Nothing),
            "error" => Ok(LogLevel::Error),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "all" | "trace" => Ok(LogLevel::All),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Formats one record as a single line
fn format_record(record: &Record<'_>) -> String {
    format!("[{:<5} {}] {}", record.level(), record.target(), record.args())
}

/// Writes records to stderr, or to a file when one is given
struct StreamLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
}

impl Log for StreamLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_record(record);
        match &self.file {
            Some(file) => {
                let mut file = file.lock();
                let _ = writeln!(file, "{}", line);
            }
            None => eprintln!("{}", line),
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Installs the process logger
///
/// # Arguments
/// * `level` - Most verbose level to emit
/// * `log_file` - File to create (truncated) instead of writing to stderr
///
/// # Returns
/// An error if the file cannot be created or a logger is already installed
pub fn init(level: LogLevel, log_file: Option<&Path>) -> io::Result<()> {
    let file = log_file.map(File::create).transpose()?.map(Mutex::new);
    let logger = Box::new(StreamLogger {
        level: level.to_filter(),
        file,
    });
    log::set_logger(Box::leak(logger))
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;
    log::set_max_level(level.to_filter());
    Ok(())
}
