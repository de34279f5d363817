//! # sketchysensor-core
//!
//! Core library for the sketchysensor-rs sensor suite providing shared functionality
//! for feeding system metrics into a SketchyBar-style status bar.
//!
//! ## Features
//!
//! - **Event protocol** - `--add event` / `--trigger` commands with named payload fields
//! - **Sinks** - Deliver commands to the status bar executable or to any writer
//! - **Common sampler trait** - Standardized refresh/publish interface
//! - **Publisher loop** - Fixed-interval refresh → publish ticks on a tokio timer
//! - **Error handling** - Comprehensive error types with context
//!
//! ## Quick Start
//!
//! ```rust
//! use sketchysensor_core::{EventField, Sampler, SensorError};
//!
//! // Implement the Sampler trait for your custom sensor
//! struct UptimeSampler {
//!     seconds: u64,
//! }
//!
//! impl Sampler for UptimeSampler {
//!     type Error = SensorError;
//!
//!     fn name(&self) -> &str {
//!         "uptime"
//!     }
//!
//!     fn refresh(&mut self) -> Result<(), Self::Error> {
//!         self.seconds += 1;
//!         Ok(())
//!     }
//!
//!     fn fields(&self) -> Vec<EventField> {
//!         vec![EventField::new("uptime", self.seconds.to_string())]
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub mod publisher;
pub mod sink;

pub use publisher::Publisher;
pub use sink::{EventSink, SketchybarSink, WriterSink};

/// A single named payload field carried by a trigger command.
///
/// Rendered as `key='value'` in the textual protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventField {
    /// Field name as seen by the status bar (e.g. `memory_percent`)
    pub key: String,
    /// Already formatted field value
    pub value: String,
}

impl EventField {
    /// Create a new field from a key and a preformatted value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Render the argv form (`key=value`) without shell quoting.
    #[must_use]
    pub fn to_arg(&self) -> String {
        format!("{}={}", self.key, self.value)
    }
}

impl fmt::Display for EventField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}='{}'", self.key, self.value)
    }
}

/// Commands understood by the status bar host.
///
/// The [`Display`](fmt::Display) implementation produces the exact textual
/// protocol, while [`EventCommand::to_args`] produces the argument vector used
/// when invoking the host executable directly.
///
/// # Examples
///
/// ```rust
/// use sketchysensor_core::{EventCommand, EventField};
///
/// let add = EventCommand::add_event("ram");
/// assert_eq!(add.to_string(), "--add event 'ram'");
///
/// let trigger = EventCommand::trigger("ram", vec![EventField::new("memory_percent", "07")]);
/// assert_eq!(trigger.to_string(), "--trigger 'ram' memory_percent='07'");
/// assert_eq!(trigger.to_args(), vec!["--trigger", "ram", "memory_percent=07"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EventCommand {
    /// Declare an event channel the host should listen for.
    AddEvent {
        /// Event channel name
        event: String,
    },
    /// Fire an event channel with a payload.
    Trigger {
        /// Event channel name
        event: String,
        /// Payload fields in publication order
        #[serde(serialize_with = "serialize_fields")]
        fields: Vec<EventField>,
    },
}

impl EventCommand {
    /// Build a registration command.
    #[must_use]
    pub fn add_event(event: impl Into<String>) -> Self {
        Self::AddEvent {
            event: event.into(),
        }
    }

    /// Build a trigger command.
    #[must_use]
    pub fn trigger(event: impl Into<String>, fields: Vec<EventField>) -> Self {
        Self::Trigger {
            event: event.into(),
            fields,
        }
    }

    /// Name of the event channel this command refers to.
    #[must_use]
    pub fn event(&self) -> &str {
        match self {
            Self::AddEvent { event } | Self::Trigger { event, .. } => event,
        }
    }

    /// Argument vector handed to the host executable.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        match self {
            Self::AddEvent { event } => vec!["--add".to_owned(), "event".to_owned(), event.clone()],
            Self::Trigger { event, fields } => {
                let mut args = Vec::with_capacity(fields.len() + 2);
                args.push("--trigger".to_owned());
                args.push(event.clone());
                args.extend(fields.iter().map(EventField::to_arg));
                args
            }
        }
    }
}

impl fmt::Display for EventCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddEvent { event } => write!(f, "--add event '{event}'"),
            Self::Trigger { event, fields } => {
                write!(f, "--trigger '{event}'")?;
                for field in fields {
                    write!(f, " {field}")?;
                }
                Ok(())
            }
        }
    }
}

/// Serialize fields as an ordered JSON object instead of a list of pairs.
fn serialize_fields<S>(fields: &[EventField], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(fields.iter().map(|field| (&field.key, &field.value)))
}

/// Where published commands are delivered.
///
/// # Examples
///
/// ```rust
/// use sketchysensor_core::OutputMode;
///
/// let mode: OutputMode = "json".parse().unwrap();
/// assert_eq!(mode, OutputMode::Json);
/// assert_eq!(OutputMode::default(), OutputMode::Sketchybar);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Invoke the status bar executable for every command
    Sketchybar,
    /// Print the textual protocol, one command per line, on stdout
    Text,
    /// Print one JSON object per command on stdout
    Json,
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Sketchybar
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sketchybar => "sketchybar",
            Self::Text => "text",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for OutputMode {
    type Err = OutputModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sketchybar" | "bar" => Ok(Self::Sketchybar),
            "text" | "stdout" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(OutputModeParseError {
                input: s.to_owned(),
                valid_options: &["sketchybar", "text", "json"],
            }),
        }
    }
}

/// Error type for parsing [`OutputMode`] from string.
#[derive(Debug, thiserror::Error)]
#[error("Invalid output mode '{input}'. Valid options: {}", valid_options.join(", "))]
pub struct OutputModeParseError {
    input: String,
    valid_options: &'static [&'static str],
}

/// Configuration for a publisher process.
///
/// # Examples
///
/// ```rust
/// use sketchysensor_core::{OutputMode, PublisherConfig};
/// use std::time::Duration;
///
/// let config = PublisherConfig::new("ram", Duration::from_secs(2))
///     .with_output(OutputMode::Text);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherConfig {
    /// Event channel registered with and triggered on the host
    pub event_name: String,
    /// Pause between two samples
    pub update_interval: Duration,
    /// Destination of published commands
    pub output: OutputMode,
    /// Host executable used with [`OutputMode::Sketchybar`]
    pub program: PathBuf,
}

impl PublisherConfig {
    /// Executable name used when none is configured.
    pub const DEFAULT_PROGRAM: &'static str = "sketchybar";

    /// Create a configuration publishing `event_name` every `update_interval`.
    #[must_use]
    pub fn new(event_name: impl Into<String>, update_interval: Duration) -> Self {
        Self {
            event_name: event_name.into(),
            update_interval,
            output: OutputMode::default(),
            program: PathBuf::from(Self::DEFAULT_PROGRAM),
        }
    }

    /// Set the output mode.
    #[must_use]
    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Set the host executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Check that the configuration can drive a publisher.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Config`] for an empty event name or a zero interval.
    pub fn validate(&self) -> Result<(), SensorError> {
        if self.event_name.trim().is_empty() {
            return Err(SensorError::config("Event name must not be empty"));
        }
        if self.update_interval.is_zero() {
            return Err(SensorError::config("Update interval must be greater than zero"));
        }
        Ok(())
    }
}

/// Parse an interval given as a decimal number of seconds.
///
/// # Errors
///
/// Returns [`SensorError::Config`] when the text is not a number, or the
/// number is not finite, negative or zero.
///
/// # Examples
///
/// ```rust
/// use sketchysensor_core::parse_interval_seconds;
/// use std::time::Duration;
///
/// assert_eq!(parse_interval_seconds("2.0").unwrap(), Duration::from_secs(2));
/// assert_eq!(parse_interval_seconds("0.5").unwrap(), Duration::from_millis(500));
/// assert!(parse_interval_seconds("abc").is_err());
/// ```
pub fn parse_interval_seconds(s: &str) -> Result<Duration, SensorError> {
    let seconds = s
        .trim()
        .parse::<f64>()
        .map_err(|_| SensorError::config_with_value("Interval must be a number of seconds", s))?;

    let interval = Duration::try_from_secs_f64(seconds)
        .map_err(|_| SensorError::config_with_value("Interval must be a finite, non-negative number of seconds", s))?;

    if interval.is_zero() {
        return Err(SensorError::config_with_value("Interval must be greater than zero", s));
    }

    Ok(interval)
}

/// Trait for all samplers feeding the status bar.
///
/// A sampler owns whatever platform handles it needs, refreshes its figures on
/// demand and exposes them as event fields.
pub trait Sampler {
    /// Error type for sampler operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Re-read live statistics and recompute derived figures.
    ///
    /// On failure the previously computed figures must be left untouched.
    fn refresh(&mut self) -> Result<(), Self::Error>;

    /// Current payload, formatted for publication.
    fn fields(&self) -> Vec<EventField>;

    /// Check if the platform source can be read without mutating state.
    fn check_availability(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Utility functions for formatting sampled values.
pub mod format {
    /// Render a percentage with at least two digits.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sketchysensor_core::format;
    ///
    /// assert_eq!(format::percent_field(7), "07");
    /// assert_eq!(format::percent_field(42), "42");
    /// assert_eq!(format::percent_field(100), "100");
    /// ```
    #[must_use]
    pub fn percent_field(percent: u32) -> String {
        format!("{percent:02}")
    }

    /// Format bytes into a human-readable string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sketchysensor_core::format;
    ///
    /// assert_eq!(format::bytes_to_human(512), "512B");
    /// assert_eq!(format::bytes_to_human(1024), "1.0KB");
    /// assert_eq!(format::bytes_to_human(1536), "1.5KB");
    /// assert_eq!(format::bytes_to_human(1048576), "1.0MB");
    /// ```
    #[must_use]
    pub fn bytes_to_human(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
        const THRESHOLD: f64 = 1024.0;

        if bytes == 0 {
            return "0B".to_owned();
        }

        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= THRESHOLD && unit_idx < UNITS.len() - 1 {
            size /= THRESHOLD;
            unit_idx += 1;
        }

        if unit_idx == 0 {
            format!("{size:.0}{}", UNITS[unit_idx])
        } else {
            format!("{size:.1}{}", UNITS[unit_idx])
        }
    }
}

/// Common error types for sensor operations.
///
/// This enum covers the failure modes of samplers, their platform providers
/// and the sinks they publish to.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// I/O error occurred while reading sensor data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing sensor data from text format.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what failed to parse
        message: String,
        /// Optional source error for chaining
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error (invalid settings, bad arguments).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration issue
        message: String,
        /// The invalid configuration value if applicable
        value: Option<String>,
    },

    /// Sensor is not available on this system.
    #[error("Sensor unavailable: {reason}")]
    Unavailable {
        /// Reason why the sensor is unavailable
        reason: String,
        /// Whether this is a temporary or permanent condition
        is_temporary: bool,
    },

    /// An operating system statistics call returned a failure status.
    #[error("{operation} failed with status {code}")]
    Query {
        /// The call that failed
        operation: String,
        /// Raw status code reported by the kernel
        code: i32,
    },

    /// Startup values could not be determined.
    #[error("Initialization failed: {message}")]
    Initialization {
        /// What could not be determined
        message: String,
    },

    /// The event sink could not be reached.
    #[error("Sink error: {message}")]
    Sink {
        /// Description of the delivery failure
        message: String,
        /// Optional source error for chaining
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SensorError {
    /// Create a new parse error with a simple message.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new parse error with a source error.
    pub fn parse_with_source<S: Into<String>, E>(message: S, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Parse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            value: None,
        }
    }

    /// Create a new configuration error with the invalid value.
    pub fn config_with_value<S: Into<String>, V: Into<String>>(message: S, value: V) -> Self {
        Self::Config {
            message: message.into(),
            value: Some(value.into()),
        }
    }

    /// Create a new unavailable error.
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
            is_temporary: false,
        }
    }

    /// Create a new temporary unavailable error.
    pub fn temporarily_unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable {
            reason: reason.into(),
            is_temporary: true,
        }
    }

    /// Create a new query error from a kernel status code.
    pub fn query<S: Into<String>>(operation: S, code: i32) -> Self {
        Self::Query {
            operation: operation.into(),
            code,
        }
    }

    /// Create a new initialization error.
    pub fn initialization<S: Into<String>>(message: S) -> Self {
        Self::Initialization {
            message: message.into(),
        }
    }

    /// Create a new sink error with a source error.
    pub fn sink<S: Into<String>, E>(message: S, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Sink {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Check if this error represents a temporary condition.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        match self {
            Self::Unavailable { is_temporary, .. } => *is_temporary,
            Self::Query { .. } => true,
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_fields() -> Vec<EventField> {
        vec![
            EventField::new("memory_percent", "47"),
            EventField::new("used_memory", "8192000000"),
            EventField::new("total_memory", "17179869184"),
        ]
    }

    #[test]
    fn test_add_event_rendering() {
        let cmd = EventCommand::add_event("ram");
        assert_eq!(cmd.to_string(), "--add event 'ram'");
        assert_eq!(cmd.to_args(), vec!["--add", "event", "ram"]);
        assert_eq!(cmd.event(), "ram");
    }

    #[test]
    fn test_trigger_rendering_is_byte_exact() {
        let cmd = EventCommand::trigger("ram", memory_fields());
        assert_eq!(
            cmd.to_string(),
            "--trigger 'ram' memory_percent='47' used_memory='8192000000' total_memory='17179869184'"
        );
        assert_eq!(
            cmd.to_args(),
            vec![
                "--trigger",
                "ram",
                "memory_percent=47",
                "used_memory=8192000000",
                "total_memory=17179869184",
            ]
        );
    }

    #[test]
    fn test_trigger_json_keeps_field_order() {
        let cmd = EventCommand::trigger("ram", memory_fields());
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(
            json,
            r#"{"command":"trigger","event":"ram","fields":{"memory_percent":"47","used_memory":"8192000000","total_memory":"17179869184"}}"#
        );

        let json = serde_json::to_string(&EventCommand::add_event("ram")).unwrap();
        assert_eq!(json, r#"{"command":"add_event","event":"ram"}"#);
    }

    #[test]
    fn test_percent_field_padding() {
        assert_eq!(format::percent_field(0), "00");
        assert_eq!(format::percent_field(7), "07");
        assert_eq!(format::percent_field(99), "99");
        assert_eq!(format::percent_field(100), "100");
    }

    #[test]
    fn test_bytes_to_human() {
        assert_eq!(format::bytes_to_human(0), "0B");
        assert_eq!(format::bytes_to_human(512), "512B");
        assert_eq!(format::bytes_to_human(1024), "1.0KB");
        assert_eq!(format::bytes_to_human(1073741824), "1.0GB");
        assert_eq!(format::bytes_to_human(17179869184), "16.0GB");
    }

    #[test]
    fn test_parse_interval_seconds() {
        assert_eq!(parse_interval_seconds("2.0").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_interval_seconds("1").unwrap(), Duration::from_secs(1));
        assert_eq!(parse_interval_seconds(" 0.25 ").unwrap(), Duration::from_millis(250));

        for bad in ["abc", "", "-1", "0", "0.0", "NaN", "inf", "2s"] {
            let err = parse_interval_seconds(bad).unwrap_err();
            assert!(matches!(err, SensorError::Config { .. }), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_output_mode_parse() {
        assert_eq!("sketchybar".parse::<OutputMode>().unwrap(), OutputMode::Sketchybar);
        assert_eq!("TEXT".parse::<OutputMode>().unwrap(), OutputMode::Text);
        assert_eq!("stdout".parse::<OutputMode>().unwrap(), OutputMode::Text);
        assert_eq!("json".parse::<OutputMode>().unwrap(), OutputMode::Json);
        assert!("waybar".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::Json.to_string(), "json");
    }

    #[test]
    fn test_publisher_config_builder() {
        let config = PublisherConfig::new("ram", Duration::from_secs(2))
            .with_output(OutputMode::Json)
            .with_program("/opt/homebrew/bin/sketchybar");

        assert_eq!(config.event_name, "ram");
        assert_eq!(config.output, OutputMode::Json);
        assert_eq!(config.program, PathBuf::from("/opt/homebrew/bin/sketchybar"));
        assert!(config.validate().is_ok());

        assert!(PublisherConfig::new("  ", Duration::from_secs(1)).validate().is_err());
        assert!(PublisherConfig::new("ram", Duration::ZERO).validate().is_err());
    }

    #[test]
    fn test_sensor_error_constructors() {
        let err = SensorError::parse("Invalid format");
        assert!(matches!(err, SensorError::Parse { .. }));

        let err = SensorError::config_with_value("Invalid setting", "bad_value");
        assert!(matches!(err, SensorError::Config { .. }));

        let err = SensorError::query("host_statistics64", 5);
        assert!(err.is_temporary());
        assert_eq!(err.to_string(), "host_statistics64 failed with status 5");

        let err = SensorError::temporarily_unavailable("Service down");
        assert!(err.is_temporary());

        let err = SensorError::unavailable("Not supported");
        assert!(!err.is_temporary());

        let err = SensorError::initialization("total memory is zero");
        assert!(!err.is_temporary());
    }
}
