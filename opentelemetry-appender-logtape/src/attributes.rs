use crate::error::Result;
use crate::facility::Properties;
use crate::stringify::{stringify, RenderMode};
use crate::value::Value;
use opentelemetry::{logs::AnyValue, Key};

/// Prefix applied to every attribute derived from a record property, keeping
/// them apart from the `category` attribute.
pub const ATTRIBUTE_PREFIX: &str = "attributes.";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PrimitiveKind {
    Bool,
    Number,
    String,
}

fn primitive_kind(value: &Value) -> Option<PrimitiveKind> {
    match value {
        Value::Bool(_) => Some(PrimitiveKind::Bool),
        Value::Int(_) | Value::Double(_) => Some(PrimitiveKind::Number),
        Value::String(_) => Some(PrimitiveKind::String),
        _ => None,
    }
}

fn primitive_any_value(value: &Value) -> Option<AnyValue> {
    match value {
        Value::Bool(b) => Some(AnyValue::from(*b)),
        Value::Int(i) => Some(AnyValue::from(*i)),
        Value::Double(d) => Some(AnyValue::from(*d)),
        Value::String(s) => Some(AnyValue::from(s.clone())),
        _ => None,
    }
}

/// Whether every non-nullish element is a primitive of one kind.
///
/// A single mismatch anywhere decides for the whole array, independent of
/// where it occurs.
fn is_homogeneous(items: &[Value]) -> bool {
    let mut seen = None;
    for item in items.iter().filter(|item| !item.is_nullish()) {
        match (primitive_kind(item), seen) {
            (None, _) => return false,
            (Some(kind), Some(prev)) if kind != prev => return false,
            (kind, _) => seen = kind,
        }
    }
    true
}

fn convert_array(items: &[Value], mode: RenderMode) -> Result<AnyValue> {
    let list = if is_homogeneous(items) {
        // a typed list cannot hold null, so nullish elements are left out
        items.iter().filter_map(primitive_any_value).collect()
    } else {
        let mut list = Vec::with_capacity(items.len());
        for item in items {
            list.push(AnyValue::from(stringify(item, mode)?.to_string()));
        }
        list
    };
    Ok(AnyValue::ListAny(Box::new(list)))
}

/// Converts a record's properties into log attributes.
///
/// Each property becomes one attribute named `attributes.<name>`:
/// - `null` and `undefined` properties are dropped;
/// - arrays whose elements share one primitive kind are kept as typed lists,
///   any other array has every element rendered as text;
/// - everything else is rendered as text with [`stringify`].
pub fn to_attributes(properties: &Properties, mode: RenderMode) -> Result<Vec<(Key, AnyValue)>> {
    let mut attributes = Vec::with_capacity(properties.len() + 1);
    for (name, value) in properties {
        let converted = match value {
            Value::Null | Value::Undefined => continue,
            Value::Array(items) => Some(convert_array(items, mode)?),
            _ => stringify(value, mode)?.into_text().map(AnyValue::from),
        };
        if let Some(converted) = converted {
            attributes.push((Key::new(format!("{ATTRIBUTE_PREFIX}{name}")), converted));
        }
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn props(entries: Vec<(&str, Value)>) -> Properties {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn get<'a>(attributes: &'a [(Key, AnyValue)], key: &str) -> Option<&'a AnyValue> {
        attributes
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    fn list(items: Vec<AnyValue>) -> AnyValue {
        AnyValue::ListAny(Box::new(items))
    }

    #[test]
    fn one_prefixed_key_per_property() {
        let properties = props(vec![
            ("user", Value::from("alice")),
            ("count", Value::Int(3)),
            ("ok", Value::Bool(true)),
        ]);
        let attributes = to_attributes(&properties, RenderMode::Json).unwrap();

        assert_eq!(attributes.len(), 3);
        assert!(attributes
            .iter()
            .all(|(k, _)| k.as_str().starts_with(ATTRIBUTE_PREFIX)));
        assert_eq!(
            get(&attributes, "attributes.user"),
            Some(&AnyValue::from("alice"))
        );
        // scalars go through the stringifier
        assert_eq!(
            get(&attributes, "attributes.count"),
            Some(&AnyValue::from("3"))
        );
        assert_eq!(
            get(&attributes, "attributes.ok"),
            Some(&AnyValue::from("true"))
        );
    }

    #[test]
    fn nullish_properties_are_dropped() {
        let properties = props(vec![
            ("a", Value::Null),
            ("b", Value::Undefined),
            ("c", Value::Int(0)),
        ]);
        let attributes = to_attributes(&properties, RenderMode::Inspect).unwrap();
        assert_eq!(attributes.len(), 1);
        assert!(get(&attributes, "attributes.a").is_none());
        assert!(get(&attributes, "attributes.b").is_none());
    }

    #[test]
    fn homogeneous_arrays_keep_their_primitives() {
        let properties = props(vec![
            ("ints", vec![1, 2, 3].into()),
            ("numbers", vec![Value::Int(1), Value::Double(2.5)].into()),
            ("names", vec!["a", "b"].into()),
            ("empty", Value::Array(Vec::new())),
        ]);
        let attributes = to_attributes(&properties, RenderMode::Json).unwrap();

        assert_eq!(
            get(&attributes, "attributes.ints"),
            Some(&list(vec![1.into(), 2.into(), 3.into()]))
        );
        assert_eq!(
            get(&attributes, "attributes.numbers"),
            Some(&list(vec![AnyValue::Int(1), AnyValue::Double(2.5)]))
        );
        assert_eq!(
            get(&attributes, "attributes.names"),
            Some(&list(vec!["a".into(), "b".into()]))
        );
        assert_eq!(get(&attributes, "attributes.empty"), Some(&list(vec![])));
    }

    #[test]
    fn mixed_arrays_are_stringified_whatever_the_mismatch_position() {
        for items in [
            vec![Value::Int(1), Value::from("two"), Value::Int(3)],
            vec![Value::Int(1), Value::Int(3), Value::from("two")],
            vec![Value::from("two"), Value::Int(1), Value::Int(3)],
        ] {
            let properties = props(vec![("mixed", Value::Array(items.clone()))]);
            let attributes = to_attributes(&properties, RenderMode::Json).unwrap();
            let expected: Vec<AnyValue> = items
                .iter()
                .map(|item| match item {
                    Value::Int(i) => AnyValue::from(i.to_string()),
                    Value::String(s) => AnyValue::from(s.to_string()),
                    _ => unreachable!(),
                })
                .collect();
            assert_eq!(get(&attributes, "attributes.mixed"), Some(&list(expected)));
        }
    }

    #[test]
    fn arrays_of_structures_are_stringified() {
        let inner: Value = [("k", Value::Int(1))].into_iter().collect();
        let properties = props(vec![("objs", Value::Array(vec![inner.clone(), inner]))]);
        let attributes = to_attributes(&properties, RenderMode::Json).unwrap();
        assert_eq!(
            get(&attributes, "attributes.objs"),
            Some(&list(vec![r#"{"k":1}"#.into(), r#"{"k":1}"#.into()]))
        );
    }

    #[test]
    fn nullish_array_elements_do_not_break_homogeneity() {
        let properties = props(vec![(
            "sparse",
            vec![Value::Int(1), Value::Null, Value::Undefined, Value::Int(2)].into(),
        )]);
        let attributes = to_attributes(&properties, RenderMode::Json).unwrap();
        assert_eq!(
            get(&attributes, "attributes.sparse"),
            Some(&list(vec![1.into(), 2.into()]))
        );
    }

    #[test]
    fn mixed_arrays_keep_every_position() {
        let properties = props(vec![(
            "mixed",
            vec![Value::Int(1), Value::Null, Value::from("x"), Value::Undefined].into(),
        )]);
        let attributes = to_attributes(&properties, RenderMode::Json).unwrap();
        assert_eq!(
            get(&attributes, "attributes.mixed"),
            Some(&list(vec![
                "1".into(),
                "null".into(),
                "x".into(),
                "undefined".into()
            ]))
        );
    }

    #[test]
    fn structures_follow_the_render_mode() {
        let map: Value = [("a", Value::Int(1))].into_iter().collect();
        let properties = props(vec![("m", map)]);

        let json = to_attributes(&properties, RenderMode::Json).unwrap();
        assert_eq!(get(&json, "attributes.m"), Some(&AnyValue::from(r#"{"a":1}"#)));

        let inspect = to_attributes(&properties, RenderMode::Inspect).unwrap();
        assert_eq!(
            get(&inspect, "attributes.m"),
            Some(&AnyValue::from(r#"{"a": 1}"#))
        );
    }

    #[test]
    fn rendering_failure_propagates() {
        struct Broken;
        impl serde::Serialize for Broken {
            fn serialize<S: serde::Serializer>(
                &self,
                _: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("cycle"))
            }
        }
        let properties = props(vec![("broken", Value::serialized(Broken))]);
        assert!(matches!(
            to_attributes(&properties, RenderMode::Json),
            Err(Error::Serialize(_))
        ));
    }
}
