//! MDX component tags: `<Name attrs>`, `</Name>` and `<Name attrs />`.
//!
//! Only capitalized names are component tags; lowercase HTML is left to
//! Markdown. Attribute values are `"strings"`, `{expressions}` holding
//! JSON-like literals, or bare names meaning `true`.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{
    Node,
    cursor::Cursor,
    literal::parse_value,
    printer,
    tags::{RawTag, TagKind, TagSyntax},
    tree,
};
use crate::{FieldError, Result};

pub struct JsxSyntax;

fn component_name<'a>(cur: &mut Cursor<'a>) -> Option<&'a str> {
    let start = cur.i;
    if !cur.peek().is_some_and(|b| b.is_ascii_uppercase()) {
        return None;
    }
    while cur.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
        cur.i += 1;
    }
    Some(&cur.s[start..cur.i])
}

fn attribute_value(cur: &mut Cursor<'_>) -> Result<Value> {
    match cur.peek() {
        Some(quote @ (b'"' | b'\'')) => {
            let start = cur.i;
            cur.bump();
            let text = cur
                .take_until(quote)
                .ok_or_else(|| FieldError::syntax(start, "unterminated string"))?;
            cur.bump();
            Ok(Value::from(text))
        }
        Some(b'{') => {
            cur.bump();
            let value = parse_value(cur)?;
            cur.skip_ws();
            cur.expect("}")?;
            Ok(value)
        }
        _ => Err(cur.error("expected an attribute value")),
    }
}

impl TagSyntax for JsxSyntax {
    const OPENER: u8 = b'<';
    const ESCAPED: &'static [char] = &['{', '}'];

    fn lex(cur: &mut Cursor<'_>) -> Result<Option<RawTag>> {
        let offset = cur.i;
        if !cur.eat("<") {
            return Ok(None);
        }

        if cur.eat("/") {
            let Some(name) = component_name(cur) else {
                return Ok(None);
            };
            cur.skip_ws();
            cur.expect(">")?;
            return Ok(Some(RawTag {
                name: name.to_string(),
                attributes: BTreeMap::new(),
                kind: TagKind::Close,
                offset,
            }));
        }

        let Some(name) = component_name(cur) else {
            return Ok(None);
        };
        let mut attributes = BTreeMap::new();
        let kind = loop {
            cur.skip_ws();
            if cur.eat("/>") {
                break TagKind::SelfClosing;
            }
            if cur.eat(">") {
                break TagKind::Open;
            }
            if cur.eof() {
                return Err(FieldError::syntax(offset, "unterminated tag"));
            }
            let key = cur
                .ident()
                .ok_or_else(|| cur.error("expected an attribute name"))?;
            let value = if cur.eat("=") {
                attribute_value(cur)?
            } else {
                Value::Bool(true)
            };
            attributes.insert(key.to_string(), value);
        };

        Ok(Some(RawTag {
            name: name.to_string(),
            attributes,
            kind,
            offset,
        }))
    }

    fn write_open(
        out: &mut String,
        name: &str,
        attributes: &BTreeMap<String, Value>,
        self_closing: bool,
    ) {
        out.push('<');
        out.push_str(name);
        for (key, value) in attributes {
            out.push(' ');
            out.push_str(key);
            match value {
                Value::Bool(true) => {}
                Value::String(s) if !s.contains(['"', '\n']) => {
                    out.push_str("=\"");
                    out.push_str(s);
                    out.push('"');
                }
                other => {
                    out.push_str("={");
                    out.push_str(&other.to_string());
                    out.push('}');
                }
            }
        }
        out.push_str(if self_closing { " />" } else { ">" });
    }

    fn write_close(out: &mut String, name: &str) {
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }

    fn write_variable(out: &mut String, path: &[&str]) {
        out.push('{');
        out.push_str(&path.join("."));
        out.push('}');
    }
}

/// Whether `name` can be written as an MDX component name.
pub fn is_component_name(name: &str) -> bool {
    let mut cur = Cursor::new(name, 0);
    component_name(&mut cur).is_some() && cur.eof()
}

/// Parse MDX text into a markup tree.
pub fn parse(src: &str) -> Result<Node> {
    tree::parse::<JsxSyntax>(src)
}

/// Print a markup tree as MDX text.
pub fn format(doc: &Node) -> String {
    printer::print::<JsxSyntax>(doc)
}
