//! # Collaboration
//!
//! Bridges editor documents and shared `yrs` documents, so several editors
//! can work on one field at once.
//!
//! ## Layout
//!
//! The document body lives in an XML fragment named `prosemirror`:
//!
//! - every non-text node is an element tagged with its node type name, with
//!   one attribute per node attribute, stored as JSON text (element attributes
//!   are plain strings in `yrs`)
//! - each run of adjacent text nodes is one text item, with every mark as a
//!   formatting attribute (mark name → attribute map, or `true` when the mark
//!   has no attributes)
//!
//! Reading back goes through the field's editor schema: unknown element or
//! mark names are rejected, missing attributes take their defaults.

use std::{collections::HashMap, sync::Arc};

use yrs::{
    Any, Doc, Out, ReadTxn, Text, Transact, TransactionMut, Xml, XmlElementPrelim, XmlFragment,
    XmlFragmentRef, XmlOut, XmlTextPrelim, XmlTextRef,
    sync::Awareness,
    types::{Attrs, text::YChange},
};

use crate::{
    FieldError, Result,
    dialect::CollaborativeDialect,
    field::ContentField,
    models::{AttrValue, CollaborationBinding, EditorState, Mark, Node, NodeType, merge_text},
    schema::EditorSchema,
};

/// Name of the fragment holding the document body.
pub const FRAGMENT_NAME: &str = "prosemirror";

/// A document body written into a fresh `yrs` document.
pub struct YjsFragment {
    pub doc: Doc,
    pub fragment: XmlFragmentRef,
}

/// Moves editor state in and out of shared documents.
pub trait CollaborationBridge {
    fn to_yjs(&self, value: &EditorState) -> YjsFragment;

    /// Read the fragment through the awareness' document and bind the
    /// resulting state to the awareness' client.
    fn from_yjs(&self, fragment: &XmlFragmentRef, awareness: &Awareness) -> Result<EditorState>;
}

impl<D: CollaborativeDialect> CollaborationBridge for ContentField<D> {
    fn to_yjs(&self, value: &EditorState) -> YjsFragment {
        to_fragment(&value.doc)
    }

    fn from_yjs(&self, fragment: &XmlFragmentRef, awareness: &Awareness) -> Result<EditorState> {
        let txn = awareness.doc().transact();
        let doc = read_fragment(fragment, &txn, self.schema()?)?;
        Ok(EditorState::new(doc).with_collaboration(CollaborationBinding {
            client_id: awareness.client_id(),
        }))
    }
}

/// Write a document's children into a new `yrs` document.
pub fn to_fragment(doc: &Node) -> YjsFragment {
    let ydoc = Doc::new();
    let fragment = ydoc.get_or_insert_xml_fragment(FRAGMENT_NAME);
    {
        let mut txn = ydoc.transact_mut();
        write_children(&fragment, &mut txn, &doc.content);
    }
    YjsFragment {
        doc: ydoc,
        fragment,
    }
}

/// Read a fragment back into a document.
pub fn read_fragment<T: ReadTxn>(
    fragment: &XmlFragmentRef,
    txn: &T,
    schema: &EditorSchema,
) -> Result<Node> {
    let content = read_children(fragment, txn, schema)?;
    let content = if content.is_empty() {
        vec![Node::new(NodeType::Paragraph)]
    } else {
        content
    };
    Ok(Node::new(NodeType::Doc).with_content(content))
}

fn to_any(value: &AttrValue) -> Any {
    match value {
        AttrValue::Null => Any::Null,
        AttrValue::Bool(b) => Any::Bool(*b),
        AttrValue::Number(n) => Any::Number(*n),
        AttrValue::String(s) => Any::String(Arc::from(s.as_str())),
        AttrValue::Bytes(bytes) => Any::Buffer(Arc::from(bytes.as_slice())),
        AttrValue::List(items) => Any::Array(Arc::from(
            items.iter().map(to_any).collect::<Vec<_>>(),
        )),
        AttrValue::Map(map) => Any::Map(Arc::new(
            map.iter()
                .map(|(k, v)| (k.clone(), to_any(v)))
                .collect::<HashMap<_, _>>(),
        )),
    }
}

fn from_any(value: &Any) -> AttrValue {
    match value {
        Any::Null | Any::Undefined => AttrValue::Null,
        Any::Bool(b) => AttrValue::Bool(*b),
        Any::Number(n) => AttrValue::Number(*n),
        Any::BigInt(n) => AttrValue::Number(*n as f64),
        Any::String(s) => AttrValue::String(s.to_string()),
        Any::Buffer(bytes) => AttrValue::Bytes(bytes.to_vec()),
        Any::Array(items) => AttrValue::List(items.iter().map(from_any).collect()),
        Any::Map(map) => AttrValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), from_any(v)))
                .collect(),
        ),
    }
}

/// Marks an encoded byte buffer. Map keys starting with `$` are stored with
/// an extra leading `$`, so no user map decodes as bytes.
const BYTES_KEY: &str = "$bytes";

fn encode_attr(value: &AttrValue) -> String {
    attr_to_json(value).to_string()
}

fn decode_attr(raw: &str) -> Option<AttrValue> {
    serde_json::from_str(raw).ok().map(attr_from_json)
}

fn attr_to_json(value: &AttrValue) -> serde_json::Value {
    use serde_json::Value;
    match value {
        AttrValue::Null => Value::Null,
        AttrValue::Bool(b) => Value::Bool(*b),
        AttrValue::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        AttrValue::String(s) => Value::String(s.clone()),
        AttrValue::Bytes(bytes) => {
            let mut map = serde_json::Map::new();
            map.insert(
                BYTES_KEY.to_string(),
                Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            );
            Value::Object(map)
        }
        AttrValue::List(items) => Value::Array(items.iter().map(attr_to_json).collect()),
        AttrValue::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let key = if k.starts_with('$') { format!("${k}") } else { k.clone() };
                    (key, attr_to_json(v))
                })
                .collect(),
        ),
    }
}

fn attr_from_json(value: serde_json::Value) -> AttrValue {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            if let (1, Some(Value::Array(items))) = (map.len(), map.get(BYTES_KEY)) {
                let bytes = items
                    .iter()
                    .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect::<Option<Vec<u8>>>();
                if let Some(bytes) = bytes {
                    return AttrValue::Bytes(bytes);
                }
            }
            AttrValue::Map(
                map.into_iter()
                    .map(|(k, v)| {
                        let key = k.strip_prefix('$').map_or_else(|| k.clone(), str::to_string);
                        (key, attr_from_json(v))
                    })
                    .collect(),
            )
        }
        Value::Array(items) => AttrValue::List(items.into_iter().map(attr_from_json).collect()),
        other => AttrValue::from(other),
    }
}

fn mark_attrs(marks: &[Mark]) -> Attrs {
    marks
        .iter()
        .map(|mark| {
            let value = if mark.attrs.is_empty() {
                Any::Bool(true)
            } else {
                to_any(&AttrValue::Map(mark.attrs.clone()))
            };
            (Arc::from(mark.kind.name()), value)
        })
        .collect()
}

fn write_children<F: XmlFragment>(parent: &F, txn: &mut TransactionMut, nodes: &[Node]) {
    let mut index = 0;
    let mut i = 0;
    while i < nodes.len() {
        if nodes[i].is_text() {
            let text: XmlTextRef = parent.insert(txn, index, XmlTextPrelim::new(""));
            while let Some(node) = nodes.get(i).filter(|n| n.is_text()) {
                let chunk = node.text.as_deref().unwrap_or_default();
                let end = text.len(&*txn);
                text.insert_with_attributes(txn, end, chunk, mark_attrs(&node.marks));
                i += 1;
            }
        } else {
            let node = &nodes[i];
            let element = parent.insert(txn, index, XmlElementPrelim::empty(node.kind.name()));
            for (name, value) in &node.attrs {
                element.insert_attribute(txn, name.as_str(), encode_attr(value));
            }
            write_children(&element, txn, &node.content);
            i += 1;
        }
        index += 1;
    }
}

fn read_children<F: XmlFragment, T: ReadTxn>(
    parent: &F,
    txn: &T,
    schema: &EditorSchema,
) -> Result<Vec<Node>> {
    let mut out = Vec::new();
    for index in 0..parent.len(txn) {
        match parent.get(txn, index) {
            Some(XmlOut::Element(element)) => {
                let tag = element.tag().to_string();
                let spec = schema
                    .node(&tag)
                    .ok_or_else(|| FieldError::InvalidYjs(format!("unknown node type {tag}")))?;
                let mut node = Node::new(spec.kind.clone());
                for attr in &spec.attrs {
                    let value = element
                        .get_attribute(txn, attr.name)
                        .as_deref()
                        .and_then(decode_attr)
                        .unwrap_or_else(|| attr.default.clone());
                    node.attrs.insert(attr.name.to_string(), value);
                }
                node.content = read_children(&element, txn, schema)?;
                out.push(node);
            }
            Some(XmlOut::Text(text)) => out.extend(read_text(&text, txn, schema)?),
            Some(XmlOut::Fragment(_)) => {
                return Err(FieldError::InvalidYjs("nested fragment".to_string()));
            }
            None => {}
        }
    }
    Ok(merge_text(out))
}

fn read_text<T: ReadTxn>(text: &XmlTextRef, txn: &T, schema: &EditorSchema) -> Result<Vec<Node>> {
    let mut out = Vec::new();
    for diff in text.diff(txn, YChange::identity) {
        let Out::Any(Any::String(chunk)) = diff.insert else {
            continue;
        };
        let mut marks = Vec::new();
        for (name, value) in diff.attributes.iter().flat_map(|attrs| attrs.iter()) {
            if matches!(value, Any::Null | Any::Undefined) {
                continue;
            }
            let spec = schema
                .mark(name)
                .ok_or_else(|| FieldError::InvalidYjs(format!("unknown mark {name}")))?;
            let mut mark = Mark::new(spec.kind.clone());
            if let Any::Map(attrs) = value {
                mark.attrs = attrs
                    .iter()
                    .map(|(k, v)| (k.clone(), from_any(v)))
                    .collect();
            }
            marks.push(mark);
        }
        out.push(Node::text(chunk.to_string(), marks));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::MarkType,
        schema::{ComponentRegistry, ContentComponent, EditorConfig, FieldSchema},
    };
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn schema() -> EditorSchema {
        EditorSchema::new(
            EditorConfig::default(),
            &ComponentRegistry::new(),
            "test",
            |_| true,
        )
        .unwrap()
    }

    fn round_trip(doc: &Node) -> Node {
        let shared = to_fragment(doc);
        let txn = shared.doc.transact();
        read_fragment(&shared.fragment, &txn, &schema()).unwrap()
    }

    #[test]
    fn test_any_conversion_round_trips() {
        let value = AttrValue::Map(
            [
                ("n".to_string(), AttrValue::Number(2.0)),
                ("b".to_string(), AttrValue::Bytes(vec![1, 2])),
                (
                    "l".to_string(),
                    AttrValue::List(vec![AttrValue::Null, AttrValue::from("x")]),
                ),
            ]
            .into(),
        );
        assert_eq!(from_any(&to_any(&value)), value);
    }

    #[test]
    fn test_formatted_text_round_trips() {
        let link = Mark::new(MarkType::Link)
            .with_attr("href", "/a")
            .with_attr("title", "");
        let doc = Node::new(NodeType::Doc).with_content(vec![
            Node::new(NodeType::Heading)
                .with_attr("level", 2.0)
                .with_content(vec![Node::text("Title", vec![])]),
            Node::new(NodeType::Paragraph).with_content(vec![
                Node::text("plain ", vec![]),
                Node::text("bold", vec![Mark::new(MarkType::Bold)]),
                Node::text(" and ", vec![]),
                Node::text("linked", vec![link]),
                Node::new(NodeType::HardBreak),
                Node::text("after", vec![]),
            ]),
        ]);
        assert_eq!(round_trip(&doc), doc);
    }

    #[test]
    fn test_attribute_codec_keeps_bytes_apart_from_maps() {
        let value = AttrValue::Map(
            [
                ("$bytes".to_string(), AttrValue::List(vec![AttrValue::Number(1.0)])),
                ("data".to_string(), AttrValue::Bytes(vec![0, 255])),
            ]
            .into(),
        );
        assert_eq!(decode_attr(&encode_attr(&value)), Some(value));
        assert_eq!(decode_attr("not json"), None);
    }

    #[test]
    fn test_typed_attributes_round_trip() {
        let components = ComponentRegistry::from([(
            "chart".to_string(),
            ContentComponent::block(IndexMap::from([
                ("height".to_string(), FieldSchema::Number { default: None }),
                (
                    "series".to_string(),
                    FieldSchema::Array {
                        element: Box::new(FieldSchema::Number { default: None }),
                    },
                ),
            ])),
        )]);
        let schema =
            EditorSchema::new(EditorConfig::default(), &components, "test", |_| true).unwrap();
        let props = AttrValue::Map(
            [
                ("height".to_string(), AttrValue::Number(240.0)),
                (
                    "series".to_string(),
                    AttrValue::List(vec![AttrValue::Number(1.0), AttrValue::Number(2.5)]),
                ),
            ]
            .into(),
        );
        let doc = Node::new(NodeType::Doc).with_content(vec![
            Node::new(NodeType::Heading)
                .with_attr("level", 3.0)
                .with_content(vec![Node::text("Results", vec![])]),
            Node::new(NodeType::Paragraph).with_content(vec![
                Node::new(NodeType::Image)
                    .with_attr("src", "chart.png")
                    .with_attr("alt", "Chart")
                    .with_attr("title", "")
                    .with_attr("filename", "chart.png")
                    .with_attr("data", AttrValue::Bytes(vec![137, 80, 78, 71])),
            ]),
            Node::new(NodeType::Component("chart".into())).with_attr("props", props),
        ]);

        let shared = to_fragment(&doc);
        let txn = shared.doc.transact();
        let read = read_fragment(&shared.fragment, &txn, &schema).unwrap();

        assert_eq!(read, doc);
        assert_eq!(read.content[0].attrs["level"], AttrValue::Number(3.0));
    }

    #[test]
    fn test_unknown_element_is_rejected() {
        let shared = to_fragment(
            &Node::new(NodeType::Doc)
                .with_content(vec![Node::new(NodeType::Component("widget".into()))]),
        );
        let txn = shared.doc.transact();
        let err = read_fragment(&shared.fragment, &txn, &schema()).unwrap_err();
        assert!(matches!(err, FieldError::InvalidYjs(message) if message.contains("widget")));
    }

    #[test]
    fn test_empty_fragment_reads_as_empty_doc() {
        let doc = Doc::new();
        let fragment = doc.get_or_insert_xml_fragment(FRAGMENT_NAME);
        let txn = doc.transact();
        assert_eq!(read_fragment(&fragment, &txn, &schema()).unwrap(), schema().empty_doc());
    }
}
