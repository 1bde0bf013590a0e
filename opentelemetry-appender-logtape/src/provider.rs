use crate::error::{Error, Result};
use crate::record::TelemetryRecord;
use opentelemetry::{
    logs::{LogRecord, Logger, LoggerProvider},
    InstrumentationScope,
};
use opentelemetry_otlp::{WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{
    logs::{SdkLoggerProvider, SimpleLogProcessor},
    Resource,
};
use std::{collections::HashMap, fmt, time::Duration, time::SystemTime};

/// Accepts converted records for one instrumentation scope.
pub trait TelemetryLogger: Send + Sync {
    /// Hands a record to the backend.
    fn emit(&self, record: TelemetryRecord);
}

struct OtelLogger<L>(L);

impl<L> TelemetryLogger for OtelLogger<L>
where
    L: Logger + Send + Sync,
{
    fn emit(&self, record: TelemetryRecord) {
        let mut log_record = self.0.create_log_record();
        log_record.set_timestamp(record.timestamp);
        log_record.set_observed_timestamp(SystemTime::now());
        if let Some(severity) = record.severity_number {
            log_record.set_severity_number(severity);
        }
        log_record.set_severity_text(record.severity_text);
        log_record.set_body(record.body.into());
        log_record.add_attributes(record.attributes);
        self.0.emit(log_record);
    }
}

/// A type-erased [`TelemetryLogger`].
pub struct BoxedLogger(Box<dyn TelemetryLogger>);

impl BoxedLogger {
    /// Boxes a [`TelemetryLogger`].
    pub fn new(logger: impl TelemetryLogger + 'static) -> Self {
        BoxedLogger(Box::new(logger))
    }

    /// Wraps an OpenTelemetry [`Logger`], translating records into its
    /// native log record type.
    pub fn otel<L>(logger: L) -> Self
    where
        L: Logger + Send + Sync + 'static,
    {
        BoxedLogger(Box::new(OtelLogger(logger)))
    }
}

impl fmt::Debug for BoxedLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoxedLogger")
    }
}

impl TelemetryLogger for BoxedLogger {
    fn emit(&self, record: TelemetryRecord) {
        self.0.emit(record)
    }
}

/// The capabilities the appender needs from a logger provider.
///
/// Only [`logger`](LogRecordProvider::logger) is required. Providers that
/// cannot flush or shut down keep the default implementations, which report
/// the capability as unsupported.
pub trait LogRecordProvider: fmt::Debug + Send + Sync {
    /// Returns a logger for the given instrumentation scope.
    fn logger(&self, scope: InstrumentationScope) -> BoxedLogger;

    /// Flushes buffered records.
    fn force_flush(&self) -> Result<()> {
        Err(Error::FlushUnsupported)
    }

    /// Shuts the provider down.
    fn shutdown(&self) -> Result<()> {
        Err(Error::ShutdownUnsupported)
    }
}

impl LogRecordProvider for SdkLoggerProvider {
    fn logger(&self, scope: InstrumentationScope) -> BoxedLogger {
        BoxedLogger::otel(self.logger_with_scope(scope))
    }

    fn force_flush(&self) -> Result<()> {
        Ok(SdkLoggerProvider::force_flush(self)?)
    }

    fn shutdown(&self) -> Result<()> {
        Ok(SdkLoggerProvider::shutdown(self)?)
    }
}

/// Adapts any OpenTelemetry [`LoggerProvider`] that has no lifecycle
/// operations of its own.
#[derive(Debug, Clone)]
pub struct ApiLoggerProvider<P>(pub P);

impl<P> LogRecordProvider for ApiLoggerProvider<P>
where
    P: LoggerProvider + fmt::Debug + Send + Sync,
    P::Logger: Send + Sync + 'static,
{
    fn logger(&self, scope: InstrumentationScope) -> BoxedLogger {
        BoxedLogger::otel(self.0.logger_with_scope(scope))
    }
}

/// Settings for the OTLP/HTTP exporter of the default provider.
///
/// Unset fields are resolved by the exporter itself, from the
/// `OTEL_EXPORTER_OTLP_*` environment variables or its built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtlpExporterConfig {
    /// Collector endpoint, e.g. `http://localhost:4318/v1/logs`.
    pub endpoint: Option<String>,
    /// Export timeout.
    pub timeout: Option<Duration>,
    /// Extra HTTP headers sent with every export request.
    pub headers: HashMap<String, String>,
}

/// Builds the resource used by the default provider.
///
/// Environment-provided attributes (`OTEL_RESOURCE_ATTRIBUTES`,
/// `OTEL_SERVICE_NAME`) and SDK defaults are merged; an explicit
/// `service_name` wins over all of them.
pub fn default_resource(service_name: Option<&str>) -> Resource {
    let builder = Resource::builder();
    match service_name {
        Some(name) => builder.with_service_name(name.to_owned()).build(),
        None => builder.build(),
    }
}

/// Builds a provider exporting over OTLP/HTTP through a simple, non-batching
/// processor.
pub fn default_provider(
    service_name: Option<&str>,
    config: &OtlpExporterConfig,
) -> Result<SdkLoggerProvider> {
    let mut builder = opentelemetry_otlp::LogExporter::builder().with_http();
    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint.clone());
    }
    if let Some(timeout) = config.timeout {
        builder = builder.with_timeout(timeout);
    }
    if !config.headers.is_empty() {
        builder = builder.with_headers(config.headers.clone());
    }
    let exporter = builder.build()?;

    Ok(SdkLoggerProvider::builder()
        .with_resource(default_resource(service_name))
        .with_log_processor(SimpleLogProcessor::new(exporter))
        .build())
}
