use opentelemetry::logs::Severity;

/// Maps a facility level name onto an OpenTelemetry [`Severity`].
///
/// Names with no counterpart, `trace` included, return `None`, which
/// exporters report as `SEVERITY_NUMBER_UNSPECIFIED`.
pub fn map_severity(level: &str) -> Option<Severity> {
    match level {
        "debug" => Some(Severity::Debug),
        "info" => Some(Severity::Info),
        "warning" => Some(Severity::Warn),
        "error" => Some(Severity::Error),
        "fatal" => Some(Severity::Fatal),
        _ => None,
    }
}
