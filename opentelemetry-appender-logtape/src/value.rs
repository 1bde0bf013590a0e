use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use std::{borrow::Cow, collections::BTreeMap, fmt, sync::Arc, time::SystemTime};

/// An application type carried in a [`Value::Object`].
///
/// Implementations render themselves as JSON and, optionally, in a
/// human-readable form. Types without a readable form fall back to JSON
/// when the inspector is requested.
pub trait ObjectValue: Send + Sync {
    /// Converts the value into a JSON document.
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;

    /// Returns a human-readable rendering, if the type provides one.
    fn inspect(&self) -> Option<String> {
        None
    }
}

struct Inspectable<T>(T);

impl<T> ObjectValue for Inspectable<T>
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }

    fn inspect(&self) -> Option<String> {
        Some(format!("{:?}", self.0))
    }
}

struct Serialized<T>(T);

impl<T> ObjectValue for Serialized<T>
where
    T: Serialize + Send + Sync,
{
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}

/// A value carried by an application log record, either as an interpolated
/// message part or as a property.
#[derive(Clone, Default)]
pub enum Value {
    /// An explicit null.
    Null,
    /// An absent value, e.g. a template placeholder with no matching property.
    #[default]
    Undefined,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Double(f64),
    /// A string.
    String(Cow<'static, str>),
    /// A point in time.
    DateTime(SystemTime),
    /// An ordered list of values.
    Array(Vec<Value>),
    /// A string-keyed map of values.
    Map(BTreeMap<String, Value>),
    /// An application type.
    Object(Arc<dyn ObjectValue>),
}

impl Value {
    /// Wraps a type that can be rendered both as JSON and through its
    /// [`Debug`](fmt::Debug) implementation.
    pub fn object<T>(value: T) -> Self
    where
        T: Serialize + fmt::Debug + Send + Sync + 'static,
    {
        Value::Object(Arc::new(Inspectable(value)))
    }

    /// Wraps a type that can only be rendered as JSON.
    pub fn serialized<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Value::Object(Arc::new(Serialized(value)))
    }

    /// Returns `true` for [`Value::Null`] and [`Value::Undefined`].
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }
}

pub(crate) fn to_iso_string(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Textual form of a number; non-finite values are spelled `Infinity`,
/// `-Infinity` and `NaN`.
pub(crate) fn number_to_string(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_owned()
    } else if number == f64::INFINITY {
        "Infinity".to_owned()
    } else if number == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else {
        number.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Readable rendering, the text [`RenderMode::Inspect`](crate::RenderMode::Inspect)
/// produces. Objects that cannot be rendered print as `[object]` here, while
/// [`stringify`](crate::stringify) reports them as an error.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Undefined => f.write_str("undefined"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) => f.write_str(&number_to_string(*d)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::DateTime(t) => f.write_str(&to_iso_string(*t)),
            Value::Array(items) => f.debug_list().entries(items).finish(),
            Value::Map(map) => f.debug_map().entries(map).finish(),
            Value::Object(obj) => match obj.inspect() {
                Some(text) => f.write_str(&text),
                None => match obj.to_json() {
                    Ok(json) => write!(f, "{json}"),
                    Err(_) => f.write_str("[object]"),
                },
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::Undefined => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::String(s) => serializer.serialize_str(s),
            Value::DateTime(t) => serializer.serialize_str(&to_iso_string(*t)),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                // undefined members are left out of JSON objects
                let mut out = serializer.serialize_map(None)?;
                for (key, value) in map {
                    if !matches!(value, Value::Undefined) {
                        out.serialize_entry(key, value)?;
                    }
                }
                out.end()
            }
            Value::Object(obj) => obj
                .to_json()
                .map_err(S::Error::custom)?
                .serialize(serializer),
        }
    }
}

macro_rules! impl_trivial_from {
    ($t:ty, $variant:path) => {
        impl From<$t> for Value {
            fn from(val: $t) -> Value {
                $variant(val.into())
            }
        }
    };
}

impl_trivial_from!(bool, Value::Bool);

impl_trivial_from!(i8, Value::Int);
impl_trivial_from!(i16, Value::Int);
impl_trivial_from!(i32, Value::Int);
impl_trivial_from!(i64, Value::Int);
impl_trivial_from!(u8, Value::Int);
impl_trivial_from!(u16, Value::Int);
impl_trivial_from!(u32, Value::Int);

impl_trivial_from!(f32, Value::Double);
impl_trivial_from!(f64, Value::Double);

impl_trivial_from!(&'static str, Value::String);
impl_trivial_from!(String, Value::String);
impl_trivial_from!(Cow<'static, str>, Value::String);

impl_trivial_from!(SystemTime, Value::DateTime);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Value {
        val.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(val: Vec<T>) -> Value {
        Value::Array(val.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> FromIterator<T> for Value {
    /// Creates a [`Value::Array`] from a sequence of values.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Value::Array(iter.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    /// Creates a [`Value::Map`] from a sequence of key-value pairs.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A rendered message or attribute fragment.
///
/// Rendering keeps `null` and `undefined` apart from text so that callers can
/// decide how to represent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Rendered text.
    Text(String),
    /// Rendered from [`Value::Null`].
    Null,
    /// Rendered from [`Value::Undefined`].
    Undefined,
}

impl Fragment {
    /// Returns the fragment's text, spelling out `null` and `undefined`.
    pub fn as_str(&self) -> &str {
        match self {
            Fragment::Text(text) => text,
            Fragment::Null => "null",
            Fragment::Undefined => "undefined",
        }
    }

    /// Returns the text of a [`Fragment::Text`], `None` otherwise.
    pub fn into_text(self) -> Option<String> {
        match self {
            Fragment::Text(text) => Some(text),
            Fragment::Null | Fragment::Undefined => None,
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::Text(text.to_owned())
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Fragment::Text(text)
    }
}
