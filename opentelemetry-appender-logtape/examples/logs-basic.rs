//! Sends application logs to an OTLP/HTTP collector.
//!
//! run with `$ cargo run --example logs-basic`
//!
//! The collector endpoint defaults to `http://localhost:4318/v1/logs` and can
//! be changed with `OTEL_EXPORTER_OTLP_LOGS_ENDPOINT`. Export failures are
//! printed by the console sink under the `logtape.meta.otel` category.

use opentelemetry_appender_logtape::{
    install_meta_logger, DiagnosticsLayer, Dispatcher, Facility, Level, OpenTelemetrySink,
    OtlpExporterConfig, Properties, Record, Sink, Value,
};
use std::{sync::Arc, time::Duration};
use tracing_subscriber::prelude::*;

#[derive(Debug)]
struct ConsoleSink;

impl Sink for ConsoleSink {
    fn log(&self, record: &Record) -> opentelemetry_appender_logtape::Result<()> {
        let message: String = record
            .message
            .iter()
            .map(|part| match part {
                Value::String(text) => text.to_string(),
                other => format!("{other:?}"),
            })
            .collect();
        println!(
            "[{}] {} {}",
            record.level,
            record.category.join("."),
            message
        );
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink = Arc::new(
        OpenTelemetrySink::builder()
            .with_service_name("logs-basic-example")
            .with_exporter_config(OtlpExporterConfig {
                timeout: Some(Duration::from_secs(3)),
                ..Default::default()
            })
            .build()?,
    );
    let facility = Arc::new(Dispatcher::new().with_sink(sink.clone()).with_sink(ConsoleSink));
    install_meta_logger(facility.clone());
    tracing_subscriber::registry()
        .with(DiagnosticsLayer::new())
        .init();

    let mut properties = Properties::new();
    properties.insert("user".into(), "otel".into());
    properties.insert("attempts".into(), 3.into());
    properties.insert("roles".into(), vec!["admin", "dev"].into());
    facility.log(
        &["my-app", "auth"],
        Level::Info,
        "{user} logged in after {attempts} attempts",
        properties,
    )?;
    facility.log(
        &["my-app", "auth"],
        Level::Error,
        "token store unreachable",
        Properties::new(),
    )?;

    sink.shutdown()?;
    Ok(())
}
