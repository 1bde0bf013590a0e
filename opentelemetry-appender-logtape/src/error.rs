use opentelemetry_sdk::error::OTelSdkError;
use thiserror::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the appender.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A property or message value could not be rendered as JSON.
    ///
    /// Rendering failures are not recovered: the log call that carried the
    /// value fails with this error.
    #[error("failed to render value as JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The default OTLP log exporter could not be built.
    #[error("failed to build the default OTLP log exporter: {0}")]
    ExporterBuild(#[from] opentelemetry_otlp::ExporterBuildError),

    /// The logger provider failed to flush or shut down.
    #[error(transparent)]
    Provider(#[from] OTelSdkError),

    /// The logger provider in use does not expose a shutdown operation.
    #[error("logger provider does not support shutdown")]
    ShutdownUnsupported,

    /// The logger provider in use does not expose a flush operation.
    #[error("logger provider does not support force_flush")]
    FlushUnsupported,
}
