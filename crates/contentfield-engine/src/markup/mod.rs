//! # Markup Trees
//!
//! Dialect-neutral syntax trees for Markdoc and MDX documents.
//!
//! ## Pipeline
//!
//! ```text
//! text → tags::extract (placeholders) → pulldown-cmark → tree::build → Node
//! Node → printer::print::<Syntax> → text
//! ```
//!
//! Markdown itself is parsed by `pulldown-cmark`. Dialect tags
//! (`{% callout %}` in Markdoc, `<Callout>` in MDX) are found by a pre-pass
//! that skips code, swapped for private-use placeholders, and re-attached
//! to the tree once Markdown structure is known.
//!
//! ## Modules
//!
//! - **`cursor`**: byte cursor shared by the tag lexers
//! - **`literal`**: JSON-like attribute values
//! - **`tags`**: `TagSyntax` trait, placeholder pre-pass, tag nesting
//! - **`markdoc`** / **`mdx`**: the two tag syntaxes
//! - **`tree`**: pulldown-cmark events to [`Node`]
//! - **`printer`**: [`Node`] back to text

pub mod cursor;
pub mod literal;
pub mod markdoc;
pub mod mdx;
pub mod printer;
pub mod tags;
pub mod tree;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Node types of the markup tree. Names follow Markdoc's AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Document,
    Paragraph,
    Heading,
    Blockquote,
    List,
    Item,
    Fence,
    Hr,
    Table,
    Thead,
    Tbody,
    Tr,
    Th,
    Td,
    Image,
    Link,
    Strong,
    Em,
    S,
    Code,
    Text,
    Softbreak,
    Hardbreak,
    Tag,
    /// A Markdoc variable printed in place, `{% $name %}`.
    Variable,
}

impl NodeType {
    /// Whether nodes of this type hold inline content directly.
    pub fn holds_inline(self) -> bool {
        matches!(
            self,
            NodeType::Paragraph
                | NodeType::Heading
                | NodeType::Th
                | NodeType::Td
                | NodeType::Link
                | NodeType::Strong
                | NodeType::Em
                | NodeType::S
        )
    }

    pub fn is_inline(self) -> bool {
        matches!(
            self,
            NodeType::Image
                | NodeType::Link
                | NodeType::Strong
                | NodeType::Em
                | NodeType::S
                | NodeType::Code
                | NodeType::Text
                | NodeType::Softbreak
                | NodeType::Hardbreak
                | NodeType::Variable
        )
    }
}

/// Attribute value standing for a Markdoc variable reference such as
/// `$page.title`, shaped like Markdoc's own AST.
pub fn variable_ref(path: Vec<String>) -> Value {
    serde_json::json!({ "$$mdtype": "Variable", "path": path })
}

/// The path of a variable reference made by [`variable_ref`].
pub fn as_variable_ref(value: &Value) -> Option<Vec<&str>> {
    let object = value.as_object()?;
    if object.get("$$mdtype").and_then(Value::as_str) != Some("Variable") {
        return None;
    }
    object
        .get("path")?
        .as_array()?
        .iter()
        .map(Value::as_str)
        .collect()
}

/// A markup tree node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    /// Tag name, for [`NodeType::Tag`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub inline: bool,
    /// Problems found while reading leniently, such as an unclosed tag.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Node {
    pub fn new(kind: NodeType) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            tag: None,
            inline: kind.is_inline(),
            errors: Vec::new(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeType::Text).with_attr("content", Value::String(content.into()))
    }

    pub fn tag(
        name: impl Into<String>,
        attributes: BTreeMap<String, Value>,
        children: Vec<Node>,
        inline: bool,
    ) -> Self {
        Self {
            kind: NodeType::Tag,
            attributes,
            children,
            tag: Some(name.into()),
            inline,
            errors: Vec::new(),
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn attr_u64(&self, key: &str) -> Option<u64> {
        self.attributes.get(key).and_then(Value::as_u64)
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(Value::as_bool)
    }

    /// Path of a `variable` node.
    pub fn variable_path(&self) -> Vec<&str> {
        self.attributes
            .get("path")
            .and_then(Value::as_array)
            .map(|path| path.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Text of a `text` or `code` node.
    pub fn content(&self) -> &str {
        self.attr_str("content").unwrap_or_default()
    }

    /// Depth-first iterator over this node and its descendants.
    pub fn walk(&self) -> impl Iterator<Item = &Node> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_is_depth_first_in_order() {
        let doc = Node::new(NodeType::Document).with_children(vec![
            Node::new(NodeType::Paragraph).with_children(vec![Node::text("a")]),
            Node::new(NodeType::Hr),
        ]);
        let kinds: Vec<_> = doc.walk().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeType::Document,
                NodeType::Paragraph,
                NodeType::Text,
                NodeType::Hr
            ]
        );
    }

    #[test]
    fn test_serializes_type_field() {
        let json = serde_json::to_value(Node::text("hi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "text", "attributes": {"content": "hi"}, "inline": true})
        );
    }
}
