use std::collections::BTreeMap;

use serde::Serialize;

/// Attribute value carried by editor nodes and marks.
///
/// Mirrors the JSON value space plus raw bytes, which image nodes use to hold
/// the file they point at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttrValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Convert back into a JSON value. Bytes have no JSON form.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value;
        Some(match self {
            AttrValue::Null => Value::Null,
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Number(n) => json_number(*n),
            AttrValue::String(s) => Value::String(s.clone()),
            AttrValue::Bytes(_) => return None,
            AttrValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(AttrValue::to_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            AttrValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                    .collect::<Option<serde_json::Map<_, _>>>()?,
            ),
        })
    }
}

/// Integral floats print without a fractional part (`3`, not `3.0`).
fn json_number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl From<serde_json::Value> for AttrValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(b),
            Value::Number(n) => AttrValue::Number(n.as_f64().unwrap_or_default()),
            Value::String(s) => AttrValue::String(s),
            Value::Array(items) => AttrValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                AttrValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

/// Node types known to the editor. Components registered by the caller are
/// carried by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    OrderedList,
    UnorderedList,
    ListItem,
    CodeBlock,
    Divider,
    HardBreak,
    Image,
    Table,
    TableRow,
    TableHeader,
    TableCell,
    Text,
    Component(String),
}

impl NodeType {
    pub const BUILTIN: [NodeType; 16] = [
        NodeType::Doc,
        NodeType::Paragraph,
        NodeType::Heading,
        NodeType::Blockquote,
        NodeType::OrderedList,
        NodeType::UnorderedList,
        NodeType::ListItem,
        NodeType::CodeBlock,
        NodeType::Divider,
        NodeType::HardBreak,
        NodeType::Image,
        NodeType::Table,
        NodeType::TableRow,
        NodeType::TableHeader,
        NodeType::TableCell,
        NodeType::Text,
    ];

    /// The name used for this type in schemas and collaborative documents.
    pub fn name(&self) -> &str {
        match self {
            NodeType::Doc => "doc",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::Blockquote => "blockquote",
            NodeType::OrderedList => "ordered_list",
            NodeType::UnorderedList => "unordered_list",
            NodeType::ListItem => "list_item",
            NodeType::CodeBlock => "code_block",
            NodeType::Divider => "divider",
            NodeType::HardBreak => "hard_break",
            NodeType::Image => "image",
            NodeType::Table => "table",
            NodeType::TableRow => "table_row",
            NodeType::TableHeader => "table_header",
            NodeType::TableCell => "table_cell",
            NodeType::Text => "text",
            NodeType::Component(name) => name,
        }
    }

    pub fn builtin(name: &str) -> Option<NodeType> {
        Self::BUILTIN.into_iter().find(|t| t.name() == name)
    }
}

/// Mark types, declared in nesting order: earlier marks wrap later ones
/// when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MarkType {
    Link,
    Bold,
    Italic,
    Strikethrough,
    Component(String),
    Code,
}

impl MarkType {
    pub const BUILTIN: [MarkType; 5] = [
        MarkType::Link,
        MarkType::Bold,
        MarkType::Italic,
        MarkType::Strikethrough,
        MarkType::Code,
    ];

    pub fn name(&self) -> &str {
        match self {
            MarkType::Link => "link",
            MarkType::Bold => "bold",
            MarkType::Italic => "italic",
            MarkType::Strikethrough => "strikethrough",
            MarkType::Code => "code",
            MarkType::Component(name) => name,
        }
    }

    pub fn builtin(name: &str) -> Option<MarkType> {
        Self::BUILTIN.into_iter().find(|t| t.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mark {
    pub kind: MarkType,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Mark {
    pub fn new(kind: MarkType) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }
}

/// A node in the editor document tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub kind: NodeType,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttrValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    pub fn new(kind: NodeType) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
            content: Vec::new(),
            text: None,
            marks: Vec::new(),
        }
    }

    /// A text node. Marks are kept in nesting order.
    pub fn text(text: impl Into<String>, mut marks: Vec<Mark>) -> Self {
        marks.sort_by(|a, b| a.kind.cmp(&b.kind));
        Self {
            text: Some(text.into()),
            marks,
            ..Self::new(NodeType::Text)
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn with_content(mut self, content: Vec<Node>) -> Self {
        self.content = content;
        self
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeType::Text
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.content {
            child.collect_text(out);
        }
    }
}

/// Merge adjacent text nodes that carry the same marks and drop empty ones.
pub(crate) fn merge_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.is_text() && node.text.as_deref().is_none_or(str::is_empty) {
            continue;
        }
        if let Some(prev) = out.last_mut()
            && prev.is_text()
            && node.is_text()
            && prev.marks == node.marks
        {
            let prev_text = prev.text.get_or_insert_with(String::new);
            prev_text.push_str(node.text.as_deref().unwrap_or_default());
            continue;
        }
        out.push(node);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_node_type_names_round_trip() {
        for kind in NodeType::BUILTIN {
            assert_eq!(NodeType::builtin(kind.name()), Some(kind.clone()));
        }
        assert_eq!(NodeType::builtin("callout"), None);
    }

    #[test]
    fn test_text_marks_are_sorted_in_nesting_order() {
        let node = Node::text(
            "x",
            vec![Mark::new(MarkType::Code), Mark::new(MarkType::Link)],
        );
        let kinds: Vec<_> = node.marks.iter().map(|m| m.kind.clone()).collect();
        assert_eq!(kinds, vec![MarkType::Link, MarkType::Code]);
    }

    #[test]
    fn test_merge_text_joins_equal_marks_and_drops_empty() {
        let bold = vec![Mark::new(MarkType::Bold)];
        let merged = merge_text(vec![
            Node::text("a", vec![]),
            Node::text("b", vec![]),
            Node::text("", vec![]),
            Node::text("c", bold.clone()),
            Node::new(NodeType::HardBreak),
            Node::text("d", vec![]),
        ]);
        assert_eq!(
            merged,
            vec![
                Node::text("ab", vec![]),
                Node::text("c", bold),
                Node::new(NodeType::HardBreak),
                Node::text("d", vec![]),
            ]
        );
    }

    #[test]
    fn test_attr_value_json_conversion() {
        let value: AttrValue = serde_json::json!({"a": [1, "two", true, null]}).into();
        assert_eq!(
            value.to_json(),
            Some(serde_json::json!({"a": [1, "two", true, null]}))
        );
        assert_eq!(AttrValue::Bytes(vec![1]).to_json(), None);
    }
}
