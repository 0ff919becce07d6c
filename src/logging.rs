//! The single log sink shared by the outcome recorder and ambient `tracing` output.
//!
//! Every line has the shape `{YYYY-MM-DD HH:MM:SS} - {target} - {LEVEL} - {message}`.
//! Writers are serialized through one mutex, so concurrent simulated users never
//! interleave partial lines.

use std::{
    fmt::Write as _,
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use chrono::Local;
use tracing::{Event, Level, Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{
    fmt::{
        FmtContext, MakeWriter,
        format::{self, FormatEvent, FormatFields},
    },
    registry::LookupSpan,
};

use crate::{
    config::LogLevel,
    error::{ConfigError, RecorderError},
};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct LogSink {
    writer: Mutex<Box<dyn Write + Send>>,
    level: LogLevel,
}

impl LogSink {
    pub fn new<W: Write + Send + 'static>(writer: W, level: LogLevel) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            level,
        }
    }

    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path, level: LogLevel) -> Result<Self, ConfigError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ConfigError::LogSink {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self::new(file, level))
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    /// Format and append one line. Lines below the configured level are dropped.
    pub fn append(&self, target: &str, level: LogLevel, message: &str) -> Result<(), RecorderError> {
        if !self.enabled(level) {
            return Ok(());
        }
        let line = format!(
            "{} - {target} - {level} - {message}\n",
            Local::now().format(TIMESTAMP_FORMAT)
        );
        self.write_raw(line.as_bytes())
    }

    fn write_raw(&self, bytes: &[u8]) -> Result<(), RecorderError> {
        let mut writer = self.writer.lock().map_err(|_| RecorderError::Poisoned)?;
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }
}

/// Route ambient `tracing` events into `sink`, filtered at the sink's level.
pub fn init(sink: Arc<LogSink>) -> Result<(), ConfigError> {
    let filter = level_filter(sink.level());
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(filter)
        .event_format(LineFormat)
        .with_writer(SinkWriter(sink))
        .try_init()
        .map_err(|e| ConfigError::Subscriber(e.to_string()))
}

/// tracing has no level above ERROR, so at CRITICAL no ambient event is recorded.
pub fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warning => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Critical => LevelFilter::OFF,
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARNING",
        Level::ERROR => "ERROR",
    }
}

/// Event formatter producing the sink's line format.
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        write!(
            writer,
            "{} - {} - {} - ",
            Local::now().format(TIMESTAMP_FORMAT),
            meta.target(),
            level_name(meta.level())
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[derive(Clone)]
pub struct SinkWriter(Arc<LogSink>);

pub struct SinkLine<'a>(&'a LogSink);

impl Write for SinkLine<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_raw(buf).map_err(|e| match e {
            RecorderError::Io(e) => e,
            other => io::Error::other(other),
        })?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SinkWriter {
    type Writer = SinkLine<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkLine(&self.0)
    }
}

/// In-memory writer for inspecting what reached a sink.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub(crate) fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
