use crate::attributes::to_attributes;
use crate::body::{join_body, to_body, MessageMode};
use crate::error::Result;
use crate::facility::Record;
use crate::severity::map_severity;
use crate::stringify::RenderMode;
use crate::value::Fragment;
use opentelemetry::{
    logs::{AnyValue, Severity},
    Key,
};
use std::time::SystemTime;

/// Attribute carrying the record's category path.
pub const CATEGORY_ATTRIBUTE: &str = "category";

/// Body of a [`TelemetryRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Fragments joined into one string.
    String(String),
    /// Fragments kept apart, `null` and `undefined` included.
    Fragments(Vec<Fragment>),
}

impl From<Body> for AnyValue {
    /// `AnyValue` cannot express null, so `null` and `undefined` fragments
    /// are carried as their textual spelling.
    fn from(body: Body) -> Self {
        match body {
            Body::String(text) => AnyValue::from(text),
            Body::Fragments(fragments) => fragments
                .into_iter()
                .map(|fragment| AnyValue::from(fragment.to_string()))
                .collect(),
        }
    }
}

/// An application record converted into the shape of an OpenTelemetry log
/// record.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// Normalized severity; `None` stands for "unspecified".
    pub severity_number: Option<Severity>,
    /// The facility's level name.
    pub severity_text: &'static str,
    /// Rendered message.
    pub body: Body,
    /// Property attributes followed by the `category` attribute.
    pub attributes: Vec<(Key, AnyValue)>,
    /// Time the application record was created.
    pub timestamp: SystemTime,
}

impl TelemetryRecord {
    /// Looks up an attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&AnyValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }
}

/// Converts an application record.
///
/// This is a pure function of its inputs; it applies no suppression.
pub fn to_telemetry_record(
    record: &Record,
    message_mode: MessageMode,
    render_mode: RenderMode,
) -> Result<TelemetryRecord> {
    let mut attributes = to_attributes(&record.properties, render_mode)?;
    attributes.push((
        Key::from_static_str(CATEGORY_ATTRIBUTE),
        record.category.iter().cloned().collect(),
    ));

    let fragments = to_body(&record.message, render_mode)?;
    let body = match message_mode {
        MessageMode::String => Body::String(join_body(&fragments)),
        MessageMode::Array => Body::Fragments(fragments),
    };

    Ok(TelemetryRecord {
        severity_number: map_severity(record.level.as_str()),
        severity_text: record.level.as_str(),
        body,
        attributes,
        timestamp: record.time(),
    })
}
