use crate::error::Result;
use crate::value::{number_to_string, to_iso_string, Fragment, Value};
use std::fmt::Write as _;

/// How values that are not strings are turned into text.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// JSON serialization. Numbers and booleans use their plain textual
    /// form and date-times render as ISO-8601.
    Json,
    /// Human-readable rendering through the value's [`Debug`](std::fmt::Debug)
    /// form. Application objects that provide no readable form fall back to
    /// JSON.
    #[default]
    Inspect,
}

/// Renders `value` as text under `mode`.
///
/// `null`, `undefined` and strings pass through unchanged. Fails only when
/// JSON rendering of an application object fails, at any nesting depth.
pub fn stringify(value: &Value, mode: RenderMode) -> Result<Fragment> {
    let text = match (value, mode) {
        (Value::Null, _) => return Ok(Fragment::Null),
        (Value::Undefined, _) => return Ok(Fragment::Undefined),
        (Value::String(s), _) => s.to_string(),
        (_, RenderMode::Inspect) => {
            let mut out = String::new();
            inspect(value, &mut out)?;
            out
        }
        (Value::Bool(b), RenderMode::Json) => b.to_string(),
        (Value::Int(i), RenderMode::Json) => i.to_string(),
        (Value::Double(d), RenderMode::Json) => number_to_string(*d),
        (Value::DateTime(t), RenderMode::Json) => to_iso_string(*t),
        (_, RenderMode::Json) => serde_json::to_string(value)?,
    };
    Ok(Fragment::Text(text))
}

/// Writes the readable form of `value`, the same text as its `Debug`
/// output, failing if an application object cannot be rendered.
fn inspect(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                inspect(item, out)?;
            }
            out.push(']');
        }
        Value::Map(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{key:?}: ");
                inspect(item, out)?;
            }
            out.push('}');
        }
        Value::Object(obj) => match obj.inspect() {
            Some(text) => out.push_str(&text),
            None => out.push_str(&serde_json::to_string(&obj.to_json()?)?),
        },
        _ => {
            let _ = write!(out, "{value:?}");
        }
    }
    Ok(())
}
