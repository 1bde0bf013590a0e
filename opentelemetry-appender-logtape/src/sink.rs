use crate::body::MessageMode;
use crate::diagnostics::{install_meta_logger, is_meta_category};
use crate::error::Result;
use crate::facility::{Facility, Record, Sink};
use crate::provider::{
    default_provider, BoxedLogger, LogRecordProvider, OtlpExporterConfig, TelemetryLogger,
};
use crate::record::{to_telemetry_record, TelemetryRecord};
use crate::stringify::RenderMode;
use opentelemetry::{otel_debug, Context, InstrumentationScope};
use std::{fmt, sync::Arc};

const INSTRUMENTATION_LIBRARY_NAME: &str = env!("CARGO_PKG_NAME");
const INSTRUMENTATION_LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A [`Sink`] converting application records into OpenTelemetry log records.
///
/// Records logged under [`META_CATEGORY`](crate::META_CATEGORY), or while
/// telemetry is suppressed in the current [`Context`], are dropped: they are
/// the backend's own diagnostics coming back through the facility.
pub struct OpenTelemetrySink {
    provider: Arc<dyn LogRecordProvider>,
    logger: BoxedLogger,
    message_mode: MessageMode,
    render_mode: RenderMode,
}

impl fmt::Debug for OpenTelemetrySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenTelemetrySink")
            .field("provider", &self.provider)
            .field("message_mode", &self.message_mode)
            .field("render_mode", &self.render_mode)
            .finish()
    }
}

impl OpenTelemetrySink {
    /// Creates a sink emitting through `provider` with default settings.
    pub fn new(provider: impl LogRecordProvider + 'static) -> Self {
        OpenTelemetrySink::from_parts(
            Arc::new(provider),
            MessageMode::default(),
            RenderMode::default(),
        )
    }

    /// Creates a builder.
    pub fn builder() -> OpenTelemetrySinkBuilder {
        OpenTelemetrySinkBuilder::default()
    }

    fn from_parts(
        provider: Arc<dyn LogRecordProvider>,
        message_mode: MessageMode,
        render_mode: RenderMode,
    ) -> Self {
        let scope = InstrumentationScope::builder(INSTRUMENTATION_LIBRARY_NAME)
            .with_version(INSTRUMENTATION_LIBRARY_VERSION)
            .build();
        let logger = provider.logger(scope);
        otel_debug!(
            name: "OpenTelemetrySink.Created",
            message_type = format!("{message_mode:?}"),
            object_renderer = format!("{render_mode:?}"),
        );
        OpenTelemetrySink {
            provider,
            logger,
            message_mode,
            render_mode,
        }
    }

    /// Converts `record` without emitting it or applying suppression.
    pub fn convert(&self, record: &Record) -> Result<TelemetryRecord> {
        to_telemetry_record(record, self.message_mode, self.render_mode)
    }

    /// Converts and emits one record.
    ///
    /// Fails only if a value in the record cannot be rendered; nothing is
    /// emitted in that case.
    pub fn handle(&self, record: &Record) -> Result<()> {
        if is_meta_category(&record.category) || Context::is_current_telemetry_suppressed() {
            return Ok(());
        }
        let converted = self.convert(record)?;
        self.logger.emit(converted);
        Ok(())
    }

    /// Flushes the provider, if it supports flushing.
    pub fn force_flush(&self) -> Result<()> {
        self.provider.force_flush()
    }

    /// Shuts the provider down, if it supports shutting down.
    ///
    /// The sink never does this on its own; call it once when the
    /// application stops logging.
    pub fn shutdown(&self) -> Result<()> {
        otel_debug!(name: "OpenTelemetrySink.Shutdown");
        self.provider.shutdown()
    }
}

impl Sink for OpenTelemetrySink {
    fn log(&self, record: &Record) -> Result<()> {
        self.handle(record)
    }
}

/// Builder for [`OpenTelemetrySink`].
#[derive(Default)]
pub struct OpenTelemetrySinkBuilder {
    provider: Option<Arc<dyn LogRecordProvider>>,
    message_mode: MessageMode,
    render_mode: RenderMode,
    diagnostics: Option<Arc<dyn Facility>>,
    service_name: Option<String>,
    exporter_config: OtlpExporterConfig,
}

impl fmt::Debug for OpenTelemetrySinkBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenTelemetrySinkBuilder")
            .field("provider", &self.provider)
            .field("message_mode", &self.message_mode)
            .field("render_mode", &self.render_mode)
            .field("diagnostics", &self.diagnostics.is_some())
            .field("service_name", &self.service_name)
            .field("exporter_config", &self.exporter_config)
            .finish()
    }
}

impl OpenTelemetrySinkBuilder {
    /// Emits through `provider` instead of building the default OTLP
    /// provider. Service name and exporter settings are then ignored.
    pub fn with_logger_provider(mut self, provider: impl LogRecordProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Sets the body shape. Defaults to [`MessageMode::String`].
    pub fn with_message_type(mut self, mode: MessageMode) -> Self {
        self.message_mode = mode;
        self
    }

    /// Sets how non-string values are rendered. Defaults to
    /// [`RenderMode::Inspect`].
    pub fn with_object_renderer(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// Installs a [`MetaDiagLogger`](crate::MetaDiagLogger) forwarding to
    /// `facility` as the process-wide diagnostic logger when the sink is
    /// built.
    pub fn with_diagnostics(mut self, facility: Arc<dyn Facility>) -> Self {
        self.diagnostics = Some(facility);
        self
    }

    /// Sets the service name of the default provider's resource.
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Sets the OTLP exporter settings of the default provider.
    pub fn with_exporter_config(mut self, config: OtlpExporterConfig) -> Self {
        self.exporter_config = config;
        self
    }

    /// Builds the sink, creating the default provider if none was supplied.
    pub fn build(self) -> Result<OpenTelemetrySink> {
        let provider: Arc<dyn LogRecordProvider> = match self.provider {
            Some(provider) => provider,
            None => {
                let provider =
                    default_provider(self.service_name.as_deref(), &self.exporter_config)?;
                otel_debug!(name: "OpenTelemetrySink.DefaultProviderBuilt");
                Arc::new(provider)
            }
        };
        if let Some(facility) = self.diagnostics {
            install_meta_logger(facility);
        }
        Ok(OpenTelemetrySink::from_parts(provider, self.message_mode, self.render_mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::tests::{RecordingFacility, GLOBAL};
    use crate::diagnostics::{diag_logger, disable_diag_logger, DiagLogLevel};
    use crate::error::Error;
    use crate::facility::Level;
    use crate::record::Body;
    use crate::value::Value;
    use opentelemetry::logs::AnyValue;
    use opentelemetry::Key;
    use opentelemetry_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
    use opentelemetry_sdk::Resource;
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    #[derive(Debug, Default, Clone)]
    struct RecordingProvider {
        records: Arc<Mutex<Vec<TelemetryRecord>>>,
        scopes: Arc<Mutex<Vec<InstrumentationScope>>>,
    }

    struct RecordingLogger(Arc<Mutex<Vec<TelemetryRecord>>>);

    impl TelemetryLogger for RecordingLogger {
        fn emit(&self, record: TelemetryRecord) {
            self.0.lock().unwrap().push(record);
        }
    }

    impl LogRecordProvider for RecordingProvider {
        fn logger(&self, scope: InstrumentationScope) -> BoxedLogger {
            self.scopes.lock().unwrap().push(scope);
            BoxedLogger::new(RecordingLogger(self.records.clone()))
        }
    }

    impl RecordingProvider {
        fn records(&self) -> Vec<TelemetryRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[test]
    fn emits_converted_records() {
        let provider = RecordingProvider::default();
        let sink = OpenTelemetrySink::new(provider.clone());

        let record = Record::new(["app"], Level::Info)
            .with_message(vec![Value::from("hello "), Value::from("world"), Value::from("")])
            .with_property("n", 1)
            .with_timestamp(42);
        sink.handle(&record).unwrap();

        let records = provider.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].body, Body::String("hello world".into()));
        assert_eq!(
            records[0].attribute("category"),
            Some(&AnyValue::ListAny(Box::new(vec!["app".into()])))
        );
        assert_eq!(records[0].attribute("attributes.n"), Some(&AnyValue::from("1")));
    }

    #[test]
    fn logger_is_scoped_to_this_crate() {
        let provider = RecordingProvider::default();
        let _sink = OpenTelemetrySink::new(provider.clone());

        let scopes = provider.scopes.lock().unwrap();
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].name(), "opentelemetry-appender-logtape");
        assert_eq!(scopes[0].version(), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn meta_records_are_never_emitted() {
        let provider = RecordingProvider::default();
        let sink = OpenTelemetrySink::new(provider.clone());

        for level in [Level::Debug, Level::Error, Level::Fatal] {
            sink.handle(&Record::new(["logtape", "meta", "otel"], level)).unwrap();
            sink.handle(&Record::new(["logtape", "meta", "otel", "exporter"], level)).unwrap();
        }
        assert!(provider.records().is_empty());

        sink.handle(&Record::new(["logtape", "meta", "other"], Level::Info)).unwrap();
        sink.handle(&Record::new(["app"], Level::Info)).unwrap();
        assert_eq!(provider.records().len(), 2);
    }

    #[test]
    fn suppressed_context_drops_records() {
        let provider = RecordingProvider::default();
        let sink = OpenTelemetrySink::new(provider.clone());
        {
            let _guard = Context::enter_telemetry_suppressed_scope();
            sink.handle(&Record::new(["app"], Level::Error)).unwrap();
        }
        assert!(provider.records().is_empty());
        sink.handle(&Record::new(["app"], Level::Error)).unwrap();
        assert_eq!(provider.records().len(), 1);
    }

    #[test]
    fn builder_applies_modes() {
        let provider = RecordingProvider::default();
        let sink = OpenTelemetrySink::builder()
            .with_logger_provider(provider.clone())
            .with_message_type(MessageMode::Array)
            .with_object_renderer(RenderMode::Json)
            .build()
            .unwrap();

        let record = Record::new(["app"], Level::Warning)
            .with_message(vec![Value::from("v="), vec![1, 2].into()]);
        sink.handle(&record).unwrap();

        assert_eq!(
            provider.records()[0].body,
            Body::Fragments(vec!["v=".into(), "[1,2]".into()])
        );
    }

    #[test]
    fn rendering_failure_surfaces_and_emits_nothing() {
        struct Broken;
        impl serde::Serialize for Broken {
            fn serialize<S: serde::Serializer>(
                &self,
                _: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("cycle"))
            }
        }

        let provider = RecordingProvider::default();
        let sink = OpenTelemetrySink::builder()
            .with_logger_provider(provider.clone())
            .with_object_renderer(RenderMode::Json)
            .build()
            .unwrap();
        let record =
            Record::new(["app"], Level::Info).with_property("bad", Value::serialized(Broken));

        assert!(matches!(sink.handle(&record), Err(Error::Serialize(_))));
        assert!(provider.records().is_empty());
    }

    #[test]
    fn lifecycle_is_delegated() {
        let sink = OpenTelemetrySink::new(RecordingProvider::default());
        assert!(matches!(sink.shutdown(), Err(Error::ShutdownUnsupported)));
        assert!(matches!(sink.force_flush(), Err(Error::FlushUnsupported)));
    }

    #[test]
    fn builder_installs_meta_logger() {
        let _lock = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
        disable_diag_logger();

        let facility = Arc::new(RecordingFacility::default());
        let _sink = OpenTelemetrySink::builder()
            .with_logger_provider(RecordingProvider::default())
            .with_diagnostics(facility.clone())
            .build()
            .unwrap();

        let (logger, level) = diag_logger().expect("diagnostic logger installed");
        assert_eq!(level, DiagLogLevel::Debug);
        logger.warn("export failed", &[]);
        disable_diag_logger();

        let calls = facility.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, Level::Warning);
    }

    fn localhost_config() -> OtlpExporterConfig {
        OtlpExporterConfig {
            endpoint: Some("http://localhost:4318/v1/logs".into()),
            timeout: Some(Duration::from_secs(1)),
            ..Default::default()
        }
    }

    #[test]
    fn external_provider_ignores_default_provider_settings() {
        let exporter = InMemoryLogExporter::default();
        let provider = SdkLoggerProvider::builder()
            .with_resource(Resource::builder().with_service_name("external").build())
            .with_simple_exporter(exporter.clone())
            .build();

        let sink = OpenTelemetrySink::builder()
            .with_logger_provider(provider.clone())
            .with_service_name("ignored")
            .with_exporter_config(localhost_config())
            .build()
            .unwrap();
        sink.handle(&Record::new(["app"], Level::Info)).unwrap();

        let logs = exporter.get_emitted_logs().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(
            logs[0].resource.get(&Key::from_static_str("service.name")),
            Some(opentelemetry::Value::from("external"))
        );
    }

    #[test]
    fn build_without_provider_uses_default_provider() {
        let sink = OpenTelemetrySink::builder()
            .with_service_name("svc")
            .with_exporter_config(localhost_config())
            .build()
            .unwrap();

        // the default provider supports the full lifecycle
        assert!(sink.force_flush().is_ok());
        assert!(sink.shutdown().is_ok());
        assert!(matches!(sink.shutdown(), Err(Error::Provider(_))));
    }
}
