//! A minimal, zero-dependency logging crate for the `libpy` workspace.
//!
//! The host runtime and the handle layer both log through this crate. Output
//! goes to stderr so it never interleaves with anything the embedding program
//! writes to stdout.
//!
//! The level is a single process-wide atomic. It can be set programmatically
//! or read once from the `LIBPY_LOG` environment variable.
//!
//! # Example
//!
//! ```
//! use libpy_log::{debug, info, trace, Level};
//!
//! libpy_log::set_level(Level::Debug);
//!
//! info!("handle layer ready");
//! debug!("cached {} literals", 3);
//! trace!("not shown at debug level");
//! ```

use std::fmt::Arguments;
use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable consulted by [`init_from_env`].
pub const ENV_VAR: &str = "LIBPY_LOG";

/// Log levels, most severe first.
///
/// `Off` sits below `Error` so that a logger set to `Off` rejects every
/// message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Logging disabled
    Off = 0,
    /// Unrecoverable failures
    Error = 1,
    /// Suspicious but tolerated situations
    Warn = 2,
    /// Lifecycle messages
    Info = 3,
    /// Diagnostic detail (cache fills, failed kind checks)
    Debug = 4,
    /// Per-object detail (deallocation, argument parsing failures)
    Trace = 5,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Off => "",
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Returns the upper-case name of this level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Off => "OFF",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Level {
        match raw {
            0 => Level::Off,
            1 => Level::Error,
            2 => Level::Warn,
            3 => Level::Info,
            4 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    /// Parses a level name, ignoring case.
    ///
    /// ```
    /// use libpy_log::Level;
    ///
    /// assert_eq!("trace".parse::<Level>(), Ok(Level::Trace));
    /// assert_eq!("OFF".parse::<Level>(), Ok(Level::Off));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OFF" => Ok(Level::Off),
            "ERROR" => Ok(Level::Error),
            "WARN" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

/// The global logger.
pub struct Logger {
    level: AtomicU8,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
        }
    }

    /// Sets the minimum level that will be emitted.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    /// Returns the current minimum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Checks whether a message at `level` would be emitted.
    pub fn enabled(&self, level: Level) -> bool {
        level != Level::Off && level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

// Warn by default: the handle layer is a library and stays quiet unless asked.
static LOGGER: Logger = Logger::new(Level::Warn);

/// Returns the global logger.
pub fn get_logger() -> &'static Logger {
    &LOGGER
}

/// Sets the minimum level of the global logger.
pub fn set_level(level: Level) {
    LOGGER.set_level(level);
}

/// Sets the minimum level from a level name.
///
/// # Errors
///
/// Returns the parse error message if `s` is not a level name.
pub fn set_level_from_str(s: &str) -> Result<(), String> {
    set_level(s.parse()?);
    Ok(())
}

/// Configures the level from the `LIBPY_LOG` environment variable.
///
/// Returns the level that is in effect afterwards. An unset variable leaves
/// the level untouched; an unparsable one is reported once at `Warn`.
pub fn init_from_env() -> Level {
    if let Ok(value) = std::env::var(ENV_VAR) {
        if let Err(msg) = set_level_from_str(&value) {
            __log_with_target(Level::Warn, module_path!(), format_args!("{ENV_VAR}: {msg}"));
        }
    }
    LOGGER.level()
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments) {
    static RESET: &str = "\x1b[0m";

    if !LOGGER.enabled(level) {
        return;
    }

    let color = level.color_code();
    let level_str = level.as_str();
    eprintln!("{color}[{level_str}]{RESET} {target}: {args}");
}

/// Logs at an explicit level, capturing the caller's module path.
///
/// ```
/// use libpy_log::{log, Level};
///
/// log!(level: Level::Info, "refcount is {}", 1);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {
        {
            if $crate::get_logger().enabled($level) {
                $crate::__log_with_target(
                    $level,
                    module_path!(),
                    format_args!($($arg)*)
                );
            }
        }
    };
}

/// Logs at the Error level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Error, $($arg)*)
    };
}

/// Logs at the Warn level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)*)
    };
}

/// Logs at the Info level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Info, $($arg)*)
    };
}

/// Logs at the Debug level.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)*)
    };
}

/// Logs at the Trace level.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)*)
    };
}
