//! Element Logging
//!
//! Structured logging shared by the Element rollout crates, controlled by the
//! `ELEMENT_DEBUG` environment variable.
//!
//! # Features
//!
//! - **Environment-controlled**: `ELEMENT_DEBUG=1` enables debug logging
//! - **Cheap when disabled**: macros check the level before formatting
//! - **Pluggable sinks**: stderr, the `log` facade, or a per-thread capture
//!   buffer for tests
//! - **Optional `tracing` bridge** behind the `tracing` feature
//!
//! # Usage
//!
//! ```rust
//! use element_log::{debug, info, warn, error, trace};
//!
//! debug!("Bucketing user");
//! info!("Loaded {} feature definitions", 3);
//! warn!("Remote config unavailable");
//! error!("Settings file is corrupt");
//!
//! let feature = "crypto-sdk";
//! debug!(target: "element::features", "Evaluating {}", feature);
//! ```
//!
//! # Environment Variables
//!
//! - `ELEMENT_DEBUG=1` - Enable debug logging
//! - `ELEMENT_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `ELEMENT_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `ELEMENT_LOG_COLOR=1|0` - Enable/disable colors
//! - `ELEMENT_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `ELEMENT_LOG_MODULE=1|0` - Include the record target

use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::env;
use std::io::Write;
use std::rc::Rc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Log Levels
// ============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Per-user decisions
    Trace = 0,
    /// State transitions
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// No logging
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }

    /// Matching `log` crate level, `None` for [`Level::Off`].
    pub fn to_log_level(self) -> Option<log::Level> {
        match self {
            Level::Trace => Some(log::Level::Trace),
            Level::Debug => Some(log::Level::Debug),
            Level::Info => Some(log::Level::Info),
            Level::Warn => Some(log::Level::Warn),
            Level::Error => Some(log::Level::Error),
            Level::Off => None,
        }
    }

    #[cfg(feature = "color")]
    fn colored(&self) -> colored::ColoredString {
        use colored::Colorize;
        match self {
            Level::Trace => "TRACE".magenta(),
            Level::Debug => "DEBUG".blue(),
            Level::Info => "INFO".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERROR".red().bold(),
            Level::Off => "OFF".white(),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for the stderr sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Compact,
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Global Configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

static SINK: Lazy<RwLock<Sink>> = Lazy::new(|| RwLock::new(Sink::Stderr));

/// Logging configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub color: bool,
    pub timestamps: bool,
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            timestamps: true,
            module_path: true,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Build from `ELEMENT_*` environment variables and publish the level to
    /// the global filter.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let debug = env_flag("ELEMENT_DEBUG").unwrap_or(false);

        let level = env::var("ELEMENT_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { defaults.level });

        let format = env::var("ELEMENT_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(defaults.format);

        // Color only makes sense on a terminal that has not opted out
        let color = env_flag("ELEMENT_LOG_COLOR")
            .unwrap_or_else(|| env::var("NO_COLOR").is_err() && env::var("TERM").is_ok());

        let config = Self {
            debug,
            level,
            format,
            color,
            timestamps: env_flag("ELEMENT_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps),
            module_path: env_flag("ELEMENT_LOG_MODULE").unwrap_or(defaults.module_path),
        };

        DEBUG_ENABLED.store(config.debug, Ordering::SeqCst);
        LOG_LEVEL.store(config.level as u8, Ordering::SeqCst);
        config
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Destination for records that pass the level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// Formatted lines on stderr (default)
    Stderr,
    /// Forward to whatever `log` logger the host application installed
    Facade,
    /// Drop everything
    Discard,
}

/// Replace the process-wide sink.
pub fn set_sink(sink: Sink) {
    match SINK.write() {
        Ok(mut current) => *current = sink,
        Err(poisoned) => *poisoned.into_inner() = sink,
    }
}

pub fn current_sink() -> Sink {
    match SINK.read() {
        Ok(current) => *current,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

/// A record captured by [`capture`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub target: String,
    pub message: String,
}

type CaptureBuffer = Rc<RefCell<Vec<Record>>>;

thread_local! {
    static CAPTURE: RefCell<Option<(Level, CaptureBuffer)>> = const { RefCell::new(None) };
}

/// Collects records emitted on the current thread while alive.
///
/// Capture is per thread so parallel tests do not see each other's records.
/// Captured records bypass the global sink.
pub struct CaptureGuard {
    buffer: CaptureBuffer,
    previous: Option<(Level, CaptureBuffer)>,
}

impl CaptureGuard {
    pub fn records(&self) -> Vec<Record> {
        self.buffer.borrow().clone()
    }

    /// True if any captured message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.buffer
            .borrow()
            .iter()
            .any(|record| record.message.contains(needle))
    }

    pub fn count_at(&self, level: Level) -> usize {
        self.buffer
            .borrow()
            .iter()
            .filter(|record| record.level == level)
            .count()
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CAPTURE.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Start capturing records at `min_level` and above on this thread.
pub fn capture_at(min_level: Level) -> CaptureGuard {
    let buffer: CaptureBuffer = Rc::new(RefCell::new(Vec::new()));
    let previous = CAPTURE.with(|slot| slot.borrow_mut().replace((min_level, buffer.clone())));
    CaptureGuard { buffer, previous }
}

/// Capture every record on this thread.
pub fn capture() -> CaptureGuard {
    capture_at(Level::Trace)
}

fn capture_level() -> Option<Level> {
    CAPTURE.with(|slot| slot.borrow().as_ref().map(|(level, _)| *level))
}

// ============================================================================
// Public API
// ============================================================================

/// Read the environment. Level checks call this, so runtime overrides
/// made afterwards are never clobbered by the environment.
#[inline]
pub fn init() {
    Lazy::force(&CONFIG);
}

#[inline]
pub fn is_debug_enabled() -> bool {
    init();
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Check whether a record at `level` would be emitted on this thread.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    if level == Level::Off {
        return false;
    }
    init();
    if level as u8 >= LOG_LEVEL.load(Ordering::Relaxed) {
        return true;
    }
    capture_level().is_some_and(|min| level >= min)
}

pub fn current_level() -> Level {
    init();
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level at runtime.
pub fn set_level(level: Level) {
    init();
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode at runtime; enabling lowers the level to debug.
pub fn set_debug(enabled: bool) {
    init();
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Log Output
// ============================================================================

#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    let config = config();

    let captured = CAPTURE.with(|slot| match slot.borrow().as_ref() {
        Some((min, buffer)) if level >= *min => {
            buffer.borrow_mut().push(Record {
                level,
                target: target.to_string(),
                message: message.to_string(),
            });
            true
        }
        _ => false,
    });
    if captured || (level as u8) < LOG_LEVEL.load(Ordering::Relaxed) {
        return;
    }

    match current_sink() {
        Sink::Discard => {}
        Sink::Facade => log_facade(level, target, message),
        Sink::Stderr => match config.format {
            Format::Pretty => log_pretty(level, target, message, config),
            Format::Compact => log_compact(level, target, message, config),
            Format::Json => log_json(level, target, message),
        },
    }
}

fn log_facade(level: Level, target: &str, message: &str) {
    if let Some(level) = level.to_log_level() {
        log::log!(target: target, level, "{}", message);
    }
}

fn log_pretty(level: Level, target: &str, message: &str, config: &LogConfig) {
    let mut stderr = std::io::stderr().lock();

    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(stderr, "{} ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
    }

    #[cfg(feature = "color")]
    if config.color {
        let _ = write!(stderr, "{:5} ", level.colored());
    } else {
        let _ = write!(stderr, "{:5} ", level.as_str());
    }
    #[cfg(not(feature = "color"))]
    let _ = write!(stderr, "{:5} ", level.as_str());

    if config.module_path && !target.is_empty() {
        let _ = write!(stderr, "[{}] ", target);
    }

    let _ = writeln!(stderr, "{}", message);
}

fn log_compact(level: Level, target: &str, message: &str, config: &LogConfig) {
    let mut stderr = std::io::stderr().lock();

    if config.timestamps {
        let _ = write!(stderr, "{} ", chrono::Local::now().format("%H:%M:%S"));
    }

    let _ = write!(stderr, "{} ", level.as_str().chars().next().unwrap_or('?'));

    if config.module_path && !target.is_empty() {
        let _ = write!(stderr, "{}: ", target);
    }

    let _ = writeln!(stderr, "{}", message);
}

#[cfg(feature = "json")]
fn log_json(level: Level, target: &str, message: &str) {
    use serde::Serialize;

    #[derive(Serialize)]
    struct Entry<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let entry = Entry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
    };

    if let Ok(json) = serde_json::to_string(&entry) {
        eprintln!("{}", json);
    }
}

#[cfg(not(feature = "json"))]
fn log_json(level: Level, target: &str, message: &str) {
    eprintln!(
        r#"{{"timestamp":"{}","level":"{}","target":"{}","message":"{}"}}"#,
        chrono::Utc::now().to_rfc3339(),
        level.as_str(),
        escape_json(target),
        escape_json(message)
    );
}

#[cfg(not(feature = "json"))]
fn escape_json(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

// ============================================================================
// Macros
// ============================================================================

/// Log a trace message.
///
/// Emitted when `ELEMENT_LOG_LEVEL=trace` or while a capture is active.
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a debug message.
///
/// # Example
///
/// ```rust
/// use element_log::debug;
///
/// let feature = "crypto-sdk";
/// debug!("Enabling {}", feature);
/// debug!(target: "element::features", "Resetting {}", feature);
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::is_level_enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::is_level_enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log an info message.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a warning message.
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log an error message.
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, module_path!(), &format!($($arg)+));
        }
    };
}

// ============================================================================
// Tracing Integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Subscriber honoring the `ELEMENT_*` level, for hosts already on `tracing`.

    use super::*;

    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let config = config();
        let level = match config.level {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(config.color))
    }
}

// ============================================================================
// Tests
// ============================================================================
