//! # OpenTelemetry-Appender-LogTape
//!
//! This crate bridges a LogTape-style application logging facility and
//! OpenTelemetry logs. Records produced by the facility (a category path, a
//! level, a message split into literal text and interpolated values, and a
//! property bag) are converted into OpenTelemetry `LogRecord`s and emitted
//! through a logger provider.
//!
//! ## Background
//!
//! OpenTelemetry does not provide a logging API for end-users. Instead, it
//! recommends keeping an existing logging library and bridging it to
//! OpenTelemetry logs. [`OpenTelemetrySink`] is such a bridge: it registers
//! with the facility as one more [`Sink`].
//!
//! ## Getting Started
//!
//! ### 1. Set Up a Logger Provider
//!
//! ```rust
//! use opentelemetry_sdk::logs::SdkLoggerProvider;
//!
//! let provider = SdkLoggerProvider::builder().build();
//! ```
//!
//! Without an explicit provider, [`OpenTelemetrySinkBuilder::build`] creates
//! one exporting over OTLP/HTTP, configured by [`OtlpExporterConfig`] and the
//! standard `OTEL_*` environment variables.
//!
//! ### 2. Create the Sink and Register It
//!
//! ```rust
//! # use opentelemetry_sdk::logs::SdkLoggerProvider;
//! # let provider = SdkLoggerProvider::builder().build();
//! use opentelemetry_appender_logtape::{
//!     Dispatcher, Facility, Level, MessageMode, OpenTelemetrySink, Properties,
//! };
//!
//! let sink = OpenTelemetrySink::builder()
//!     .with_logger_provider(provider.clone())
//!     .with_message_type(MessageMode::String)
//!     .build()
//!     .unwrap();
//! let facility = Dispatcher::new().with_sink(sink);
//!
//! let mut properties = Properties::new();
//! properties.insert("user".into(), "alice".into());
//! facility
//!     .log(&["app", "auth"], Level::Info, "{user} logged in", properties)
//!     .unwrap();
//! # provider.shutdown().unwrap();
//! ```
//!
//! ### 3. Route OpenTelemetry Diagnostics Back (optional)
//!
//! OpenTelemetry reports its own problems, such as failed exports, as
//! `tracing` events. With [`DiagnosticsLayer`] registered and a
//! [`MetaDiagLogger`] installed (see
//! [`OpenTelemetrySinkBuilder::with_diagnostics`]), those events are logged
//! through the facility under the `["logtape", "meta", "otel"]` category.
//! Other sinks see them; the OpenTelemetry sink drops them.
//!
//! ## Mapping details
//!
//! | Application record | OpenTelemetry           | Notes                                                         |
//! |--------------------|-------------------------|---------------------------------------------------------------|
//! | level              | `Severity`, `SeverityText` | `trace` has no severity number; the text is always the level name |
//! | message            | `Body`                  | A joined string, or a list of fragments with [`MessageMode::Array`] |
//! | properties         | `Attributes`            | Keyed `attributes.<name>`; null and undefined are dropped      |
//! | category           | `category` attribute    | A list of strings                                             |
//! | timestamp          | `Timestamp`             | `ObservedTimestamp` is set at emission                        |
//!
//! ### Level Mapping
//!
//! | Level     | `Severity`    |
//! |-----------|---------------|
//! | `trace`   | unspecified   |
//! | `debug`   | `Debug`       |
//! | `info`    | `Info`        |
//! | `warning` | `Warn`        |
//! | `error`   | `Error`       |
//! | `fatal`   | `Fatal`       |
//!
//! ### Value Rendering
//!
//! Strings are kept as-is. Everything else is rendered as text according to
//! [`RenderMode`]: JSON, or a readable form based on `Debug`. Arrays of a
//! single primitive kind become typed attribute lists; mixed arrays have
//! each element rendered.
//!
//! ## Feature Flags
//!
//! `internal-logs` (enabled by default): emits this crate's internal logs
//! through `tracing`.
#![warn(missing_debug_implementations, missing_docs)]

mod attributes;
mod body;
mod diagnostics;
mod error;
mod facility;
mod provider;
mod record;
mod severity;
mod sink;
mod stringify;
mod value;

pub use attributes::{to_attributes, ATTRIBUTE_PREFIX};
pub use body::{join_body, to_body, MessageMode};
pub use diagnostics::{
    diag, diag_logger, disable_diag_logger, escape_template, install_meta_logger,
    is_meta_category, set_diag_logger, DiagLogLevel, DiagLogger, DiagnosticsLayer,
    MetaDiagLogger, META_CATEGORY,
};
pub use error::{Error, Result};
pub use facility::{
    from_millis, parse_template, to_millis, Dispatcher, Facility, Level, Properties, Record,
    Sink,
};
pub use provider::{
    default_provider, default_resource, ApiLoggerProvider, BoxedLogger, LogRecordProvider,
    OtlpExporterConfig, TelemetryLogger,
};
pub use record::{to_telemetry_record, Body, TelemetryRecord, CATEGORY_ATTRIBUTE};
pub use severity::map_severity;
pub use sink::{OpenTelemetrySink, OpenTelemetrySinkBuilder};
pub use stringify::{stringify, RenderMode};
pub use value::{Fragment, ObjectValue, Value};
