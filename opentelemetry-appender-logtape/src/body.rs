use crate::error::Result;
use crate::stringify::{stringify, RenderMode};
use crate::value::{Fragment, Value};

/// Shape of the log record body.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum MessageMode {
    /// All fragments joined into a single string.
    #[default]
    String,
    /// The fragments as an ordered list.
    Array,
}

/// Renders message parts into body fragments.
///
/// Even indices hold literal text and odd indices hold interpolated values;
/// both go through [`stringify`], so literals come out unchanged. The
/// output has exactly one fragment per message part.
pub fn to_body(message: &[Value], mode: RenderMode) -> Result<Vec<Fragment>> {
    let mut body = Vec::with_capacity(message.len());
    for pair in message.chunks(2) {
        body.push(stringify(&pair[0], mode)?);
        if let Some(value) = pair.get(1) {
            body.push(stringify(value, mode)?);
        }
    }
    Ok(body)
}

/// Joins body fragments, spelling out `null` and `undefined`.
pub fn join_body(fragments: &[Fragment]) -> String {
    fragments.iter().map(Fragment::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_literals_and_values() {
        let message = vec![Value::from("a"), Value::Int(1), Value::from("b")];
        assert_eq!(
            to_body(&message, RenderMode::Json).unwrap(),
            vec![Fragment::from("a"), Fragment::from("1"), Fragment::from("b")]
        );
    }

    #[test]
    fn single_literal() {
        assert_eq!(
            to_body(&[Value::from("only")], RenderMode::Json).unwrap(),
            vec![Fragment::from("only")]
        );
    }

    #[test]
    fn even_length_ends_with_value() {
        let message = vec![Value::from("x="), Value::Bool(true)];
        assert_eq!(
            to_body(&message, RenderMode::Inspect).unwrap(),
            vec![Fragment::from("x="), Fragment::from("true")]
        );
    }

    #[test]
    fn empty_message() {
        assert!(to_body(&[], RenderMode::Json).unwrap().is_empty());
    }

    #[test]
    fn values_follow_the_render_mode() {
        let message = vec![Value::from("v="), vec!["a", "b"].into(), Value::from("")];
        assert_eq!(
            to_body(&message, RenderMode::Json).unwrap()[1],
            Fragment::from(r#"["a","b"]"#)
        );
        assert_eq!(
            to_body(&message, RenderMode::Inspect).unwrap()[1],
            Fragment::from(r#"["a", "b"]"#)
        );
    }

    #[test]
    fn nullish_values_stay_distinct() {
        let message = vec![
            Value::from("x="),
            Value::Null,
            Value::from(",y="),
            Value::Undefined,
        ];
        let body = to_body(&message, RenderMode::Json).unwrap();
        assert_eq!(
            body,
            vec![
                Fragment::from("x="),
                Fragment::Null,
                Fragment::from(",y="),
                Fragment::Undefined
            ]
        );
        assert_eq!(join_body(&body), "x=null,y=undefined");
    }
}
