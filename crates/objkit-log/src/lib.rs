//! Minimal, zero-dependency leveled logging for the `objkit` workspace.
//!
//! Messages go to stderr so they never interleave with payload written to
//! stdout by embedding applications. The filter level is a process-wide
//! atomic; it can be set programmatically or bootstrapped from the
//! `RUNTIME_LOG` environment variable.
//!
//! # Example
//!
//! ```
//! use objkit_log::{info, debug, Level};
//!
//! objkit_log::set_level(Level::Debug);
//!
//! info!("registry ready with {} classes", 4);
//! debug!("resolving hierarchy {:?}", "Base:Derived");
//! ```

use std::fmt::Arguments;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

/// Message severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Failures the process likely cannot recover from.
    Error = 0,
    /// Suspicious but survivable conditions.
    Warn = 1,
    /// High-level lifecycle events.
    Info = 2,
    /// Per-operation diagnostics.
    Debug = 3,
    /// Very chatty, per-instance diagnostics.
    Trace = 4,
}

impl Level {
    /// Fixed-width tag used in the output line.
    pub const fn tag(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "INFO ",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Level {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

/// Error returned when parsing an unrecognized level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl std::fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unrecognized log level '{}'", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "trace" => Ok(Level::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Process-wide filter; messages above the stored level are dropped.
pub struct Logger {
    filter: AtomicU8,
}

impl Logger {
    const fn with_filter(level: Level) -> Logger {
        Logger {
            filter: AtomicU8::new(level as u8),
        }
    }

    /// Replaces the filter level.
    pub fn set_filter(&self, level: Level) {
        self.filter.store(level as u8, Ordering::SeqCst);
    }

    /// Current filter level.
    pub fn filter(&self) -> Level {
        Level::from_u8(self.filter.load(Ordering::Relaxed))
    }

    /// Whether a message at `level` would currently be emitted.
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.filter.load(Ordering::Relaxed)
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// The global logger. First access reads `RUNTIME_LOG` for the initial
/// filter; an absent or unparsable value falls back to `Level::Warn`.
pub fn logger() -> &'static Logger {
    LOGGER.get_or_init(|| {
        let initial = std::env::var("RUNTIME_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Level::Warn);
        Logger::with_filter(initial)
    })
}

/// Sets the global filter level.
pub fn set_level(level: Level) {
    logger().set_filter(level);
}

/// Sets the global filter level from a name such as `"debug"`.
pub fn set_level_by_name(name: &str) -> Result<(), ParseLevelError> {
    set_level(name.parse()?);
    Ok(())
}

/// Emits one formatted line. Called by the macros after the level check.
#[doc(hidden)]
pub fn __emit(level: Level, target: &str, args: Arguments) {
    if !logger().enabled(level) {
        return;
    }
    eprintln!("{} {}: {}", level.tag(), target, args);
}

/// Logs at an explicit level, capturing the calling module as the target.
#[macro_export]
macro_rules! log {
    ($level:expr, $($arg:tt)*) => {
        if $crate::logger().enabled($level) {
            $crate::__emit($level, module_path!(), format_args!($($arg)*));
        }
    };
}

/// Logs at `Level::Error`.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log!($crate::Level::Error, $($arg)*) };
}

/// Logs at `Level::Warn`.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log!($crate::Level::Warn, $($arg)*) };
}

/// Logs at `Level::Info`.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log!($crate::Level::Info, $($arg)*) };
}

/// Logs at `Level::Debug`.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log!($crate::Level::Debug, $($arg)*) };
}

/// Logs at `Level::Trace`.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log!($crate::Level::Trace, $($arg)*) };
}
