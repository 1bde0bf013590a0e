//! Bridges OpenTelemetry's own diagnostics into the application logging
//! facility.
//!
//! The OpenTelemetry crates report internal problems (failed exports,
//! shutdown errors, misconfiguration) as `tracing` events. [`DiagnosticsLayer`]
//! picks those events up and hands them to the process-wide [`DiagLogger`]
//! installed with [`set_diag_logger`]. [`MetaDiagLogger`] is the logger that
//! forwards them to the application facility under [`META_CATEGORY`], where
//! [`OpenTelemetrySink`](crate::OpenTelemetrySink) recognizes and drops them
//! again.

use crate::facility::{Facility, Level, Properties};
use crate::value::Value;
use opentelemetry::{otel_info, Context};
use std::{
    cell::Cell,
    collections::BTreeMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::{field::Field, Event, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, Layer};

/// Category under which backend diagnostics are logged.
pub const META_CATEGORY: [&str; 3] = ["logtape", "meta", "otel"];

/// Returns `true` if the first three segments of `category` are
/// [`META_CATEGORY`].
pub fn is_meta_category(category: &[String]) -> bool {
    category.len() >= META_CATEGORY.len()
        && category.iter().zip(META_CATEGORY).all(|(a, b)| a == b)
}

/// Receiver of backend diagnostics.
pub trait DiagLogger: Send + Sync {
    /// Reports an error.
    fn error(&self, message: &str, args: &[Value]);
    /// Reports a warning.
    fn warn(&self, message: &str, args: &[Value]);
    /// Reports an informational message.
    fn info(&self, message: &str, args: &[Value]);
    /// Reports a debug message.
    fn debug(&self, message: &str, args: &[Value]);
    /// Reports a verbose message.
    fn verbose(&self, message: &str, args: &[Value]);
}

/// Verbosity threshold of the installed [`DiagLogger`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagLogLevel {
    /// Nothing is reported.
    None,
    /// Errors only.
    Error,
    /// Warnings and above.
    #[default]
    Warn,
    /// Informational messages and above.
    Info,
    /// Debug messages and above.
    Debug,
    /// Verbose messages and above.
    Verbose,
    /// Everything.
    All,
}

struct Installed {
    logger: Arc<dyn DiagLogger>,
    level: DiagLogLevel,
}

static DIAG_LOGGER: RwLock<Option<Installed>> = RwLock::new(None);

/// Installs `logger` as the process-wide diagnostic logger.
///
/// There is one diagnostic logger per process and the last installation
/// wins. The previously installed logger, if any, is returned.
pub fn set_diag_logger(
    logger: impl DiagLogger + 'static,
    level: DiagLogLevel,
) -> Option<Arc<dyn DiagLogger>> {
    let previous = DIAG_LOGGER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(Installed {
            logger: Arc::new(logger),
            level,
        })
        .map(|installed| installed.logger);

    // the lock must be released before logging: the event may come straight back here
    if previous.is_some() {
        otel_info!(
            name: "DiagLogger.Replaced",
            message = "A diagnostic logger was already installed and has been replaced."
        );
    }
    previous
}

/// Removes the process-wide diagnostic logger, returning it.
pub fn disable_diag_logger() -> Option<Arc<dyn DiagLogger>> {
    DIAG_LOGGER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .map(|installed| installed.logger)
}

/// Returns the installed diagnostic logger and its threshold.
pub fn diag_logger() -> Option<(Arc<dyn DiagLogger>, DiagLogLevel)> {
    DIAG_LOGGER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(|installed| (installed.logger.clone(), installed.level))
}

/// Sends a message to the installed diagnostic logger if `level` passes its
/// threshold. `DiagLogLevel::None` and `DiagLogLevel::All` are not message
/// levels and are ignored.
pub fn diag(level: DiagLogLevel, message: &str, args: &[Value]) {
    let Some((logger, threshold)) = diag_logger() else {
        return;
    };
    if level > threshold {
        return;
    }
    match level {
        DiagLogLevel::Error => logger.error(message, args),
        DiagLogLevel::Warn => logger.warn(message, args),
        DiagLogLevel::Info => logger.info(message, args),
        DiagLogLevel::Debug => logger.debug(message, args),
        DiagLogLevel::Verbose => logger.verbose(message, args),
        DiagLogLevel::None | DiagLogLevel::All => {}
    }
}

/// Doubles the template delimiters `{` and `}` so that `message` is taken
/// literally by the facility.
pub fn escape_template(message: &str) -> String {
    message.replace('{', "{{").replace('}', "}}")
}

/// A [`DiagLogger`] forwarding to the application logging facility under
/// [`META_CATEGORY`].
///
/// Each call logs one record whose template is the escaped message followed
/// by a `{values}` placeholder; the `values` property holds the extra
/// arguments. Forwarding happens inside a telemetry-suppressed scope, and
/// failures reported by the facility are discarded.
#[derive(Clone)]
pub struct MetaDiagLogger {
    facility: Arc<dyn Facility>,
}

impl fmt::Debug for MetaDiagLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MetaDiagLogger")
    }
}

impl MetaDiagLogger {
    /// Creates a logger forwarding to `facility`.
    pub fn new(facility: Arc<dyn Facility>) -> Self {
        MetaDiagLogger { facility }
    }

    fn forward(&self, level: Level, message: &str, args: &[Value]) {
        let _guard = Context::enter_telemetry_suppressed_scope();
        let template = format!("{}: {{values}}", escape_template(message));
        let mut properties = Properties::new();
        properties.insert("values".to_string(), Value::Array(args.to_vec()));
        let _ = self
            .facility
            .log(&META_CATEGORY, level, &template, properties);
    }
}

impl DiagLogger for MetaDiagLogger {
    fn error(&self, message: &str, args: &[Value]) {
        self.forward(Level::Error, message, args)
    }

    fn warn(&self, message: &str, args: &[Value]) {
        self.forward(Level::Warning, message, args)
    }

    fn info(&self, message: &str, args: &[Value]) {
        self.forward(Level::Info, message, args)
    }

    fn debug(&self, message: &str, args: &[Value]) {
        self.forward(Level::Debug, message, args)
    }

    fn verbose(&self, message: &str, args: &[Value]) {
        self.forward(Level::Debug, message, args)
    }
}

/// Installs a [`MetaDiagLogger`] for `facility` at debug verbosity,
/// returning the previously installed logger.
pub fn install_meta_logger(facility: Arc<dyn Facility>) -> Option<Arc<dyn DiagLogger>> {
    set_diag_logger(MetaDiagLogger::new(facility), DiagLogLevel::Debug)
}

/// Collects the fields of an OpenTelemetry internal event.
#[derive(Default)]
struct EventVisitor {
    name: Option<String>,
    message: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl tracing::field::Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "name" => self.name = Some(value.to_owned()),
            "message" => self.message = Some(value.to_owned()),
            other => {
                self.fields.insert(other.to_owned(), Value::from(value.to_owned()));
            }
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_str(field, &format!("{value:?}"));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_owned(), Value::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        let value = i64::try_from(value)
            .map_or_else(|_| Value::from(value.to_string()), Value::Int);
        self.fields.insert(field.name().to_owned(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_owned(), Value::Double(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_owned(), Value::Bool(value));
    }
}

thread_local! {
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as forwarding until dropped.
struct ForwardingGuard;

impl ForwardingGuard {
    fn enter() -> Self {
        FORWARDING.with(|forwarding| forwarding.set(true));
        ForwardingGuard
    }
}

impl Drop for ForwardingGuard {
    fn drop(&mut self) {
        FORWARDING.with(|forwarding| forwarding.set(false));
    }
}

fn map_level(level: tracing::Level) -> DiagLogLevel {
    match level {
        tracing::Level::ERROR => DiagLogLevel::Error,
        tracing::Level::WARN => DiagLogLevel::Warn,
        tracing::Level::INFO => DiagLogLevel::Info,
        tracing::Level::DEBUG => DiagLogLevel::Debug,
        tracing::Level::TRACE => DiagLogLevel::Verbose,
    }
}

/// A [`Layer`] routing OpenTelemetry's internal `tracing` events to the
/// installed [`DiagLogger`].
///
/// Events are selected by target prefix, `opentelemetry` by default, which
/// covers `opentelemetry`, `opentelemetry_sdk`, `opentelemetry-otlp` and this
/// crate. Events raised while an event is being forwarded on the same thread
/// are dropped.
#[derive(Debug, Clone)]
pub struct DiagnosticsLayer {
    target_prefix: &'static str,
}

impl Default for DiagnosticsLayer {
    fn default() -> Self {
        DiagnosticsLayer {
            target_prefix: "opentelemetry",
        }
    }
}

impl DiagnosticsLayer {
    /// Creates a layer forwarding events whose target starts with
    /// `opentelemetry`.
    pub fn new() -> Self {
        DiagnosticsLayer::default()
    }

    /// Forwards events whose target starts with `prefix` instead.
    pub fn with_target_prefix(mut self, prefix: &'static str) -> Self {
        self.target_prefix = prefix;
        self
    }
}

impl<S> Layer<S> for DiagnosticsLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let meta = event.metadata();
        if !meta.target().starts_with(self.target_prefix) || FORWARDING.with(Cell::get) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        let message = visitor
            .message
            .or(visitor.name)
            .unwrap_or_else(|| meta.name().to_owned());
        let args = if visitor.fields.is_empty() {
            Vec::new()
        } else {
            vec![Value::Map(visitor.fields)]
        };

        let _forwarding = ForwardingGuard::enter();
        diag(map_level(*meta.level()), &message, &args);
    }
}
