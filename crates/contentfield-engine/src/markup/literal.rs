//! JSON-like literal values used in tag attributes.
//!
//! Accepts JSON plus unquoted object keys and trailing commas, which both
//! Markdoc attributes and MDX expression attributes allow.

use serde_json::{Map, Value};

use super::cursor::Cursor;
use crate::{FieldError, Result};

pub fn parse_value(cur: &mut Cursor<'_>) -> Result<Value> {
    cur.skip_ws();
    match cur.peek() {
        Some(b'"') => parse_string(cur).map(Value::String),
        Some(b'[') => parse_array(cur),
        Some(b'{') => parse_object(cur),
        Some(b'-' | b'0'..=b'9') => parse_number(cur),
        Some(_) => {
            let start = cur.i;
            match cur.ident() {
                Some("true") => Ok(Value::Bool(true)),
                Some("false") => Ok(Value::Bool(false)),
                Some("null") => Ok(Value::Null),
                Some(other) => Err(FieldError::syntax(
                    start,
                    format!("unsupported value `{other}`"),
                )),
                None => Err(cur.error("expected a value")),
            }
        }
        None => Err(cur.error("unexpected end of input")),
    }
}

/// A double-quoted string with JSON escapes.
pub fn parse_string(cur: &mut Cursor<'_>) -> Result<String> {
    let start = cur.i;
    cur.expect("\"")?;
    loop {
        match cur.bump() {
            Some(b'\\') => {
                cur.bump();
            }
            Some(b'"') => break,
            Some(_) => {}
            None => return Err(FieldError::syntax(start, "unterminated string")),
        }
    }
    serde_json::from_str(&cur.s[start..cur.i])
        .map_err(|e| FieldError::syntax(start, format!("invalid string: {e}")))
}

fn parse_number(cur: &mut Cursor<'_>) -> Result<Value> {
    let start = cur.i;
    cur.eat("-");
    while cur
        .peek()
        .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        cur.i += 1;
    }
    serde_json::from_str(&cur.s[start..cur.i])
        .map_err(|_| FieldError::syntax(start, "invalid number"))
}

fn parse_array(cur: &mut Cursor<'_>) -> Result<Value> {
    cur.expect("[")?;
    let mut items = Vec::new();
    loop {
        cur.skip_ws();
        if cur.eat("]") {
            return Ok(Value::Array(items));
        }
        items.push(parse_value(cur)?);
        cur.skip_ws();
        if !cur.eat(",") {
            cur.skip_ws();
            cur.expect("]")?;
            return Ok(Value::Array(items));
        }
    }
}

fn parse_object(cur: &mut Cursor<'_>) -> Result<Value> {
    cur.expect("{")?;
    let mut map = Map::new();
    loop {
        cur.skip_ws();
        if cur.eat("}") {
            return Ok(Value::Object(map));
        }
        let key = if cur.peek() == Some(b'"') {
            parse_string(cur)?
        } else {
            cur.ident()
                .ok_or_else(|| cur.error("expected an object key"))?
                .to_string()
        };
        cur.skip_ws();
        cur.expect(":")?;
        let value = parse_value(cur)?;
        map.insert(key, value);
        cur.skip_ws();
        if !cur.eat(",") {
            cur.skip_ws();
            cur.expect("}")?;
            return Ok(Value::Object(map));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(src: &str) -> Result<Value> {
        parse_value(&mut Cursor::new(src, 0))
    }

    #[test]
    fn test_parses_scalars() {
        assert_eq!(parse("\"a \\\"b\\\"\"").unwrap(), json!("a \"b\""));
        assert_eq!(parse("-2.5").unwrap(), json!(-2.5));
        assert_eq!(parse("42").unwrap(), json!(42));
        assert_eq!(parse("true").unwrap(), json!(true));
        assert_eq!(parse("null").unwrap(), json!(null));
    }

    #[test]
    fn test_parses_nested_with_bare_keys_and_trailing_commas() {
        let value = parse(r#"{ title: "Hi", "tags": [1, 2,], nested: {ok: false} }"#).unwrap();
        assert_eq!(
            value,
            json!({"title": "Hi", "tags": [1, 2], "nested": {"ok": false}})
        );
    }

    #[test]
    fn test_stops_after_value() {
        let mut cur = Cursor::new("\"x\" rest", 0);
        parse_value(&mut cur).unwrap();
        assert_eq!(&cur.s[cur.i..], " rest");
    }

    #[test]
    fn test_rejects_variables() {
        let err = parse("$page").unwrap_err();
        assert!(matches!(err, FieldError::Syntax { offset: 0, .. }));
    }

    #[test]
    fn test_unterminated_string_points_at_quote() {
        let err = parse("  \"abc").unwrap_err();
        assert!(matches!(err, FieldError::Syntax { offset: 2, .. }));
    }
}
