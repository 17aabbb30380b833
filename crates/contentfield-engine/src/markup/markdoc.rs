//! Markdoc tags: `{% name attrs %}`, `{% /name %}` and `{% name attrs /%}`.
//!
//! Attributes are `key=value` pairs with JSON-like values, plus the
//! shorthands `#id` and `.class` and one leading bare value stored as the
//! `primary` attribute. A value may also be a variable reference
//! (`$page.title`), and `{% $name %}` prints a variable in place. Function
//! calls are not supported.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{
    Node, as_variable_ref,
    cursor::Cursor,
    literal::parse_value,
    printer,
    tags::{RawTag, TagKind, TagSyntax},
    tree, variable_ref,
};
use crate::{FieldError, Result};

pub struct MarkdocSyntax;

const PRIMARY: &str = "primary";

/// `$name` followed by any number of `.field` segments.
fn variable_path(cur: &mut Cursor<'_>) -> Result<Vec<String>> {
    cur.expect("$")?;
    let mut path = vec![
        cur.ident()
            .ok_or_else(|| cur.error("expected a variable name"))?
            .to_string(),
    ];
    while cur.eat(".") {
        let segment = cur.ident().ok_or_else(|| cur.error("expected a field name"))?;
        path.push(segment.to_string());
    }
    Ok(path)
}

fn attribute_value(cur: &mut Cursor<'_>) -> Result<Value> {
    cur.skip_ws();
    if cur.peek() == Some(b'$') {
        variable_path(cur).map(variable_ref)
    } else {
        parse_value(cur)
    }
}

fn attribute_text(value: &Value) -> String {
    match as_variable_ref(value) {
        Some(path) => format!("${}", path.join(".")),
        None => value.to_string(),
    }
}

impl TagSyntax for MarkdocSyntax {
    const OPENER: u8 = b'{';
    const ESCAPED: &'static [char] = &['{'];

    fn lex(cur: &mut Cursor<'_>) -> Result<Option<RawTag>> {
        let offset = cur.i;
        if !cur.eat("{%") {
            return Ok(None);
        }
        cur.skip_ws();

        if cur.peek() == Some(b'$') {
            let path = variable_path(cur)?;
            cur.skip_ws();
            if !cur.eat("/%}") {
                cur.expect("%}")?;
            }
            return Ok(Some(RawTag {
                name: String::new(),
                attributes: BTreeMap::from([("path".to_string(), Value::from(path))]),
                kind: TagKind::Variable,
                offset,
            }));
        }

        if cur.eat("/") {
            let name = cur.ident().ok_or_else(|| cur.error("expected a tag name"))?;
            cur.skip_ws();
            cur.expect("%}")?;
            return Ok(Some(RawTag {
                name: name.to_string(),
                attributes: BTreeMap::new(),
                kind: TagKind::Close,
                offset,
            }));
        }

        let name = cur.ident().ok_or_else(|| cur.error("expected a tag name"))?;
        let mut attributes = BTreeMap::new();
        let kind = loop {
            cur.skip_ws();
            if cur.eat("/%}") {
                break TagKind::SelfClosing;
            }
            if cur.eat("%}") {
                break TagKind::Open;
            }
            match cur.peek() {
                None => return Err(FieldError::syntax(offset, "unterminated tag")),
                Some(b'#') => {
                    cur.bump();
                    let id = cur.ident().ok_or_else(|| cur.error("expected an id"))?;
                    attributes.insert("id".to_string(), Value::from(id));
                }
                Some(b'.') => {
                    cur.bump();
                    let class = cur.ident().ok_or_else(|| cur.error("expected a class"))?;
                    let joined = match attributes.get("class").and_then(Value::as_str) {
                        Some(existing) => format!("{existing} {class}"),
                        None => class.to_string(),
                    };
                    attributes.insert("class".to_string(), Value::from(joined));
                }
                Some(_) => {
                    let start = cur.i;
                    if let Some(key) = cur.ident()
                        && cur.eat("=")
                    {
                        attributes.insert(key.to_string(), attribute_value(cur)?);
                        continue;
                    }
                    cur.i = start;
                    if !attributes.is_empty() {
                        return Err(cur.error("expected `key=value`"));
                    }
                    attributes.insert(PRIMARY.to_string(), attribute_value(cur)?);
                }
            }
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
        out.push_str("{% ");
        out.push_str(name);
        if let Some(primary) = attributes.get(PRIMARY) {
            out.push(' ');
            out.push_str(&attribute_text(primary));
        }
        for (key, value) in attributes.iter().filter(|(k, _)| k.as_str() != PRIMARY) {
            out.push(' ');
            out.push_str(key);
            out.push('=');
            out.push_str(&attribute_text(value));
        }
        out.push_str(if self_closing { " /%}" } else { " %}" });
    }

    fn write_close(out: &mut String, name: &str) {
        out.push_str("{% /");
        out.push_str(name);
        out.push_str(" %}");
    }

    fn write_variable(out: &mut String, path: &[&str]) {
        out.push_str("{% $");
        out.push_str(&path.join("."));
        out.push_str(" %}");
    }
}

/// Whether `name` can be written as a Markdoc tag name.
pub fn is_tag_name(name: &str) -> bool {
    let mut cur = Cursor::new(name, 0);
    cur.ident().is_some() && cur.eof()
}

/// Parse Markdoc text into a markup tree.
pub fn parse(src: &str) -> Result<Node> {
    tree::parse::<MarkdocSyntax>(src)
}

/// Parse Markdoc text for reading, keeping unbalanced tags with an error
/// attached instead of failing.
pub fn read(src: &str) -> Result<Node> {
    tree::read::<MarkdocSyntax>(src)
}

/// Print a markup tree as Markdoc text.
pub fn format(doc: &Node) -> String {
    printer::print::<MarkdocSyntax>(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn lex(src: &str) -> Result<Option<RawTag>> {
        MarkdocSyntax::lex(&mut Cursor::new(src, 0))
    }

    #[test]
    fn test_lexes_open_tag_with_attributes() {
        let tag = lex(r#"{% callout type="warning" #intro .wide .dark open=true %}"#)
            .unwrap()
            .unwrap();
        assert_eq!(tag.name, "callout");
        assert_eq!(tag.kind, TagKind::Open);
        assert_eq!(
            serde_json::to_value(&tag.attributes).unwrap(),
            json!({"type": "warning", "id": "intro", "class": "wide dark", "open": true})
        );
    }

    #[test]
    fn test_lexes_primary_value() {
        let tag = lex(r#"{% partial "header.md" /%}"#).unwrap().unwrap();
        assert_eq!(tag.kind, TagKind::SelfClosing);
        assert_eq!(tag.attributes.get("primary"), Some(&json!("header.md")));
    }

    #[test]
    fn test_lexes_closing_tag() {
        let tag = lex("{%/callout%}").unwrap().unwrap();
        assert_eq!(tag.kind, TagKind::Close);
        assert_eq!(tag.name, "callout");
    }

    #[test]
    fn test_plain_brace_is_not_a_tag() {
        assert_eq!(lex("{ not a tag }").unwrap(), None);
    }

    #[test]
    fn test_unterminated_tag_is_an_error() {
        let err = lex("{% callout").unwrap_err();
        assert!(matches!(err, FieldError::Syntax { offset: 0, .. }));
    }

    #[test]
    fn test_writes_tags() {
        let mut out = String::new();
        let attributes = BTreeMap::from([
            ("primary".to_string(), json!("x")),
            ("count".to_string(), json!(2)),
        ]);
        MarkdocSyntax::write_open(&mut out, "note", &attributes, true);
        out.push('|');
        MarkdocSyntax::write_close(&mut out, "note");
        assert_eq!(out, r#"{% note "x" count=2 /%}|{% /note %}"#);
    }

    #[test]
    fn test_lexes_variable_attributes() {
        let tag = lex("{% if $flag %}").unwrap().unwrap();
        assert_eq!(tag.attributes.get("primary"), Some(&variable_ref(vec!["flag".into()])));

        let tag = lex("{% link href=$page.url /%}").unwrap().unwrap();
        assert_eq!(
            tag.attributes.get("href"),
            Some(&variable_ref(vec!["page".into(), "url".into()]))
        );
    }

    #[test]
    fn test_lexes_variable_interpolation() {
        let tag = lex("{% $user.name %}").unwrap().unwrap();
        assert_eq!(tag.kind, TagKind::Variable);
        assert_eq!(tag.attributes.get("path"), Some(&json!(["user", "name"])));
    }

    #[test]
    fn test_format_round_trips_variables() {
        let src = "{% if $flag %}\n\nHello {% $name %}\n\n{% /if %}\n";
        assert_eq!(format(&parse(src).unwrap()), src);
    }

    #[test]
    fn test_tag_names() {
        assert!(is_tag_name("callout"));
        assert!(is_tag_name("side-note_2"));
        assert!(!is_tag_name("2col"));
        assert!(!is_tag_name("a b"));
        assert!(!is_tag_name(""));
    }

    #[test]
    fn test_format_round_trips_block_tag() {
        let src = "{% callout type=\"note\" %}\n\nHello *there*\n\n{% /callout %}\n";
        assert_eq!(format(&parse(src).unwrap()), src);
    }
}
