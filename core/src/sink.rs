//! Event sinks: where registration and trigger commands are delivered.
//!
//! Delivery is fire-and-forget. A sink reports failures to reach its target,
//! but never inspects what the target did with the command.

use crate::{EventCommand, EventField, OutputMode, SensorError};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Capability to register and trigger event channels on a status bar host.
pub trait EventSink {
    /// Declare `event` so the host starts listening for it.
    fn register(&mut self, event: &str) -> Result<(), SensorError>;

    /// Fire `event` with the given payload.
    fn trigger(&mut self, event: &str, fields: &[EventField]) -> Result<(), SensorError>;
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn register(&mut self, event: &str) -> Result<(), SensorError> {
        (**self).register(event)
    }

    fn trigger(&mut self, event: &str, fields: &[EventField]) -> Result<(), SensorError> {
        (**self).trigger(event, fields)
    }
}

/// Sink invoking the status bar executable once per command.
///
/// The host's output is discarded and its exit status is ignored.
#[derive(Debug, Clone)]
pub struct SketchybarSink {
    program: PathBuf,
}

impl SketchybarSink {
    /// Create a sink calling `program` (a name looked up in `PATH` or a path).
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn send(&self, command: &EventCommand) -> Result<(), SensorError> {
        tracing::trace!(program = %self.program.display(), %command, "invoking host");

        // Waiting reaps the child so a long-running sampler leaves no zombies.
        Command::new(&self.program)
            .args(command.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(drop)
            .map_err(|e| {
                SensorError::sink(
                    format!("Failed to run {}", self.program.display()),
                    e,
                )
            })
    }
}

impl Default for SketchybarSink {
    fn default() -> Self {
        Self::new(crate::PublisherConfig::DEFAULT_PROGRAM)
    }
}

impl EventSink for SketchybarSink {
    fn register(&mut self, event: &str) -> Result<(), SensorError> {
        self.send(&EventCommand::add_event(event))
    }

    fn trigger(&mut self, event: &str, fields: &[EventField]) -> Result<(), SensorError> {
        self.send(&EventCommand::trigger(event, fields.to_vec()))
    }
}

/// Sink writing one line per command to any writer.
///
/// In [`OutputMode::Text`] lines use the textual host protocol; in
/// [`OutputMode::Json`] each line is a JSON object.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
    mode: OutputMode,
}

impl<W: Write> WriterSink<W> {
    /// Create a sink over `writer`.
    ///
    /// [`OutputMode::Sketchybar`] has no line format and falls back to text.
    pub fn new(writer: W, mode: OutputMode) -> Self {
        let mode = match mode {
            OutputMode::Sketchybar => OutputMode::Text,
            other => other,
        };
        Self { writer, mode }
    }

    /// Unwrap the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_command(&mut self, command: &EventCommand) -> Result<(), SensorError> {
        let line = match self.mode {
            OutputMode::Json => serde_json::to_string(command)
                .map_err(|e| SensorError::sink("Failed to serialize command", e))?,
            _ => command.to_string(),
        };

        writeln!(self.writer, "{line}")
            .and_then(|()| self.writer.flush())
            .map_err(|e| SensorError::sink("Failed to write command", e))
    }
}

impl WriterSink<std::io::Stdout> {
    /// Sink printing to standard output.
    #[must_use]
    pub fn stdout(mode: OutputMode) -> Self {
        Self::new(std::io::stdout(), mode)
    }
}

impl<W: Write> EventSink for WriterSink<W> {
    fn register(&mut self, event: &str) -> Result<(), SensorError> {
        self.write_command(&EventCommand::add_event(event))
    }

    fn trigger(&mut self, event: &str, fields: &[EventField]) -> Result<(), SensorError> {
        self.write_command(&EventCommand::trigger(event, fields.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(sink: WriterSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_writer_sink_text() {
        let mut sink = WriterSink::new(Vec::new(), OutputMode::Text);
        sink.register("ram").unwrap();
        sink.trigger("ram", &[EventField::new("memory_percent", "07")]).unwrap();

        assert_eq!(
            output(sink),
            "--add event 'ram'\n--trigger 'ram' memory_percent='07'\n"
        );
    }

    #[test]
    fn test_writer_sink_json() {
        let mut sink = WriterSink::new(Vec::new(), OutputMode::Json);
        sink.trigger("ram", &[EventField::new("used_memory", "42")]).unwrap();

        let text = output(sink);
        let value: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(value["command"], "trigger");
        assert_eq!(value["event"], "ram");
        assert_eq!(value["fields"]["used_memory"], "42");
    }

    #[test]
    fn test_writer_sink_sketchybar_mode_falls_back_to_text() {
        let mut sink = WriterSink::new(Vec::new(), OutputMode::Sketchybar);
        sink.register("ram").unwrap();
        assert_eq!(output(sink), "--add event 'ram'\n");
    }

    #[test]
    fn test_sketchybar_sink_missing_program() {
        let mut sink = SketchybarSink::new("/nonexistent/sketchysensor/sketchybar");
        let err = sink.register("ram").unwrap_err();
        assert!(matches!(err, SensorError::Sink { .. }));
    }

    #[test]
    fn test_sketchybar_sink_ignores_exit_status() {
        // `false` runs and fails; the sink must not care.
        let mut sink = SketchybarSink::new("false");
        if Command::new("false").status().is_ok() {
            assert!(sink.trigger("ram", &[]).is_ok());
        }
    }
}
