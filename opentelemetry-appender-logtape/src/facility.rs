//! The application logging facility, as seen from the appender.
//!
//! The facility owns logger registration, filtering and dispatch. This module
//! only models the parts the appender consumes ([`Record`], [`Sink`]) and the
//! parts the diagnostic bridge calls back into ([`Facility`]). [`Dispatcher`]
//! is a minimal facility that renders message templates and fans records out
//! to sinks.

use crate::error::Result;
use crate::value::Value;
use std::{
    collections::BTreeMap,
    fmt,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Property bag attached to a [`Record`].
pub type Properties = BTreeMap<String, Value>;

/// Severity of an application log record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Level {
    /// trace
    Trace,
    /// debug
    Debug,
    /// info
    Info,
    /// warning
    Warning,
    /// error
    Error,
    /// fatal
    Fatal,
}

impl Level {
    /// Returns the facility's name for this level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log record produced by the application logging facility.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Category path of the logger, e.g. `["app", "db"]`.
    pub category: Vec<String>,
    /// Severity.
    pub level: Level,
    /// Message parts: literal text at even indices, interpolated values at
    /// odd indices.
    pub message: Vec<Value>,
    /// Structured properties.
    pub properties: Properties,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Record {
    /// Creates a record with an empty message and no properties, stamped
    /// with the current time.
    pub fn new<I, S>(category: I, level: Level) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Record {
            category: category.into_iter().map(Into::into).collect(),
            level,
            message: Vec::new(),
            properties: Properties::new(),
            timestamp: to_millis(SystemTime::now()),
        }
    }

    /// Sets the message parts.
    pub fn with_message<I, V>(mut self, message: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.message = message.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets the timestamp in milliseconds since the Unix epoch.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The record's timestamp as a [`SystemTime`].
    pub fn time(&self) -> SystemTime {
        from_millis(self.timestamp)
    }
}

/// Converts milliseconds since the Unix epoch into a [`SystemTime`].
pub fn from_millis(millis: i64) -> SystemTime {
    let offset = Duration::from_millis(millis.unsigned_abs());
    if millis >= 0 {
        UNIX_EPOCH + offset
    } else {
        UNIX_EPOCH - offset
    }
}

/// Converts a [`SystemTime`] into milliseconds since the Unix epoch.
pub fn to_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

/// A per-record emission endpoint registered with the facility.
pub trait Sink: Send + Sync {
    /// Handles one record.
    fn log(&self, record: &Record) -> Result<()>;
}

impl<T: Sink + ?Sized> Sink for Arc<T> {
    fn log(&self, record: &Record) -> Result<()> {
        (**self).log(record)
    }
}

/// Entry point of the application logging facility.
pub trait Facility: Send + Sync {
    /// Logs a message template under `category`.
    ///
    /// Placeholders in `template` are written `{name}` and resolved against
    /// `properties`; a literal brace is written `{{` or `}}`.
    fn log(
        &self,
        category: &[&str],
        level: Level,
        template: &str,
        properties: Properties,
    ) -> Result<()>;
}

/// A minimal [`Facility`] delivering every record to a fixed set of sinks.
#[derive(Clone, Default)]
pub struct Dispatcher {
    sinks: Vec<Arc<dyn Sink>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with no sinks.
    pub fn new() -> Self {
        Dispatcher::default()
    }

    /// Adds a sink. Sinks are invoked in the order they are added.
    pub fn with_sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Delivers `record` to every sink, stopping at the first failure.
    pub fn dispatch(&self, record: &Record) -> Result<()> {
        for sink in &self.sinks {
            sink.log(record)?;
        }
        Ok(())
    }
}

impl Facility for Dispatcher {
    fn log(
        &self,
        category: &[&str],
        level: Level,
        template: &str,
        properties: Properties,
    ) -> Result<()> {
        let message = parse_template(template, &properties);
        let mut record = Record::new(category.iter().copied(), level);
        record.message = message;
        record.properties = properties;
        self.dispatch(&record)
    }
}

/// Splits a message template into alternating literal and value parts.
///
/// The result always starts and ends with a literal, so its length is odd.
/// Placeholders without a matching property resolve to
/// [`Value::Undefined`].
pub fn parse_template(template: &str, properties: &Properties) -> Vec<Value> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    name.push(n);
                }
                if closed {
                    parts.push(Value::from(std::mem::take(&mut literal)));
                    parts.push(properties.get(name.trim()).cloned().unwrap_or_default());
                } else {
                    // unterminated placeholder stays literal text
                    literal.push('{');
                    literal.push_str(&name);
                }
            }
            _ => literal.push(c),
        }
    }
    parts.push(Value::from(literal));
    parts
}
