use std::collections::BTreeMap;

use serde_json::Value;

use super::assets::{AssetSink, place_image};
use crate::{
    markup::{self, NodeType as Markup},
    models::{AttrValue, Mark, MarkType, Node, NodeType},
    schema::{ImageConfig, PROPS_ATTR},
};

/// Convert an editor document into a markup tree, moving image bytes into
/// `assets`.
pub fn from_editor(
    doc: &Node,
    image: Option<&ImageConfig>,
    slug: Option<&str>,
    assets: &mut AssetSink,
) -> markup::Node {
    let mut converter = FromEditor {
        image,
        slug,
        assets,
    };
    markup::Node::new(Markup::Document).with_children(converter.blocks(&doc.content))
}

/// Props as tag attributes. Nulls are left out: a null prop always equals
/// its default, which parsing restores.
fn attributes(node_attrs: Option<&AttrValue>) -> BTreeMap<String, Value> {
    match node_attrs {
        Some(AttrValue::Map(props)) => props
            .iter()
            .filter(|(_, value)| !value.is_null())
            .filter_map(|(key, value)| value.to_json().map(|json| (key.clone(), json)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn number(node: &Node, key: &str) -> Option<u64> {
    node.attr(key)
        .and_then(AttrValue::as_f64)
        .map(|n| n.max(0.0) as u64)
}

fn string<'n>(node: &'n Node, key: &str) -> &'n str {
    node.attr(key).and_then(AttrValue::as_str).unwrap_or_default()
}

/// Marks whose Markdown delimiters cannot sit next to whitespace.
fn is_delimited(mark: &Mark) -> bool {
    matches!(
        mark.kind,
        MarkType::Bold | MarkType::Italic | MarkType::Strikethrough
    )
}

/// Move leading and trailing whitespace out of delimited marks, so
/// `**bold **` prints as `**bold** `.
fn split_mark_whitespace(nodes: &[Node]) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let Some(text) = node.text.as_deref() else {
            out.push(node.clone());
            continue;
        };
        if !node.marks.iter().any(is_delimited) {
            out.push(node.clone());
            continue;
        }
        let plain: Vec<Mark> = node
            .marks
            .iter()
            .filter(|m| !is_delimited(m))
            .cloned()
            .collect();
        let start = text.trim_start();
        let core = start.trim_end();
        let lead = &text[..text.len() - start.len()];
        let trail = &start[core.len()..];
        for (piece, marks) in [(lead, &plain), (core, &node.marks), (trail, &plain)] {
            if !piece.is_empty() {
                out.push(Node::text(piece, marks.clone()));
            }
        }
    }
    out
}

struct FromEditor<'a> {
    image: Option<&'a ImageConfig>,
    slug: Option<&'a str>,
    assets: &'a mut AssetSink,
}

impl FromEditor<'_> {
    fn blocks(&mut self, nodes: &[Node]) -> Vec<markup::Node> {
        nodes.iter().map(|node| self.block(node)).collect()
    }

    fn block(&mut self, node: &Node) -> markup::Node {
        match &node.kind {
            NodeType::Doc => {
                markup::Node::new(Markup::Document).with_children(self.blocks(&node.content))
            }
            NodeType::Paragraph => {
                markup::Node::new(Markup::Paragraph).with_children(self.inline(&node.content))
            }
            NodeType::Heading => markup::Node::new(Markup::Heading)
                .with_attr("level", number(node, "level").unwrap_or(1))
                .with_children(self.inline(&node.content)),
            NodeType::Blockquote => {
                markup::Node::new(Markup::Blockquote).with_children(self.blocks(&node.content))
            }
            NodeType::OrderedList => markup::Node::new(Markup::List)
                .with_attr("ordered", true)
                .with_attr("start", number(node, "start").unwrap_or(1))
                .with_children(self.blocks(&node.content)),
            NodeType::UnorderedList => markup::Node::new(Markup::List)
                .with_attr("ordered", false)
                .with_children(self.blocks(&node.content)),
            NodeType::ListItem => {
                markup::Node::new(Markup::Item).with_children(self.blocks(&node.content))
            }
            NodeType::CodeBlock => {
                let mut content = node.text_content();
                if !content.is_empty() {
                    content.push('\n');
                }
                markup::Node::new(Markup::Fence)
                    .with_attr("language", string(node, "language"))
                    .with_attr("content", content)
            }
            NodeType::Divider => markup::Node::new(Markup::Hr),
            NodeType::Table => self.table(node),
            NodeType::Component(name) => markup::Node::tag(
                name.clone(),
                attributes(node.attr(PROPS_ATTR)),
                self.blocks(&node.content),
                false,
            ),
            NodeType::TableRow | NodeType::TableHeader | NodeType::TableCell => {
                markup::Node::new(Markup::Paragraph).with_children(self.cell(node))
            }
            NodeType::Text | NodeType::HardBreak | NodeType::Image => {
                markup::Node::new(Markup::Paragraph)
                    .with_children(self.inline(std::slice::from_ref(node)))
            }
        }
    }

    /// GFM tables always have a header row, so the first row becomes the
    /// header whatever its cells are.
    fn table(&mut self, node: &Node) -> markup::Node {
        let mut rows = node.content.iter();
        let mut sections = Vec::new();
        if let Some(first) = rows.next() {
            let cells = first
                .content
                .iter()
                .map(|cell| markup::Node::new(Markup::Th).with_children(self.cell(cell)))
                .collect();
            let head = markup::Node::new(Markup::Tr).with_children(cells);
            sections.push(markup::Node::new(Markup::Thead).with_children(vec![head]));
        }
        let body: Vec<markup::Node> = rows
            .map(|row| {
                let cells = row
                    .content
                    .iter()
                    .map(|cell| markup::Node::new(Markup::Td).with_children(self.cell(cell)))
                    .collect();
                markup::Node::new(Markup::Tr).with_children(cells)
            })
            .collect();
        if !body.is_empty() {
            sections.push(markup::Node::new(Markup::Tbody).with_children(body));
        }
        markup::Node::new(Markup::Table).with_children(sections)
    }

    /// Table cells hold one line of inline content.
    fn cell(&mut self, cell: &Node) -> Vec<markup::Node> {
        let mut out = Vec::new();
        for (i, block) in cell.content.iter().enumerate() {
            if i > 0 {
                out.push(markup::Node::text(" "));
            }
            if block.content.is_empty() && block.text.is_some() {
                out.extend(self.inline(std::slice::from_ref(block)));
            } else {
                out.extend(self.inline(&block.content));
            }
        }
        out
    }

    /// Inline nodes to markup, nesting marks in their canonical order. Runs
    /// that share a prefix of marks share the enclosing markup nodes.
    fn inline(&mut self, nodes: &[Node]) -> Vec<markup::Node> {
        let nodes = split_mark_whitespace(nodes);
        let mut root = Vec::new();
        let mut open: Vec<(Mark, Vec<markup::Node>)> = Vec::new();

        for node in &nodes {
            let marks: Vec<&Mark> = node
                .marks
                .iter()
                .filter(|m| m.kind != MarkType::Code)
                .collect();
            let shared = open
                .iter()
                .zip(&marks)
                .take_while(|((mark, _), next)| mark == **next)
                .count();
            while open.len() > shared {
                close(&mut open, &mut root);
            }
            for mark in &marks[shared..] {
                open.push(((*mark).clone(), Vec::new()));
            }
            let leaf = self.leaf(node);
            match open.last_mut() {
                Some((_, children)) => children.push(leaf),
                None => root.push(leaf),
            }
        }
        while !open.is_empty() {
            close(&mut open, &mut root);
        }
        root
    }

    fn leaf(&mut self, node: &Node) -> markup::Node {
        match &node.kind {
            NodeType::Text => {
                let text = node.text.as_deref().unwrap_or_default();
                if node.marks.iter().any(|m| m.kind == MarkType::Code) {
                    markup::Node::new(Markup::Code).with_attr("content", text)
                } else {
                    markup::Node::text(text)
                }
            }
            NodeType::HardBreak => markup::Node::new(Markup::Hardbreak),
            NodeType::Image => self.image(node),
            NodeType::Component(name) => {
                markup::Node::tag(name.clone(), attributes(node.attr(PROPS_ATTR)), Vec::new(), true)
            }
            _ => markup::Node::text(node.text_content()),
        }
    }

    fn image(&mut self, node: &Node) -> markup::Node {
        let data = node.attr("data").and_then(AttrValue::as_bytes);
        let filename = node.attr("filename").and_then(AttrValue::as_str);
        let src = match (self.image, data, filename) {
            (Some(config), Some(data), Some(filename)) => {
                place_image(config, filename, data.to_vec(), self.slug, self.assets)
            }
            _ => string(node, "src").to_string(),
        };
        markup::Node::new(Markup::Image)
            .with_attr("src", src)
            .with_attr("alt", string(node, "alt"))
            .with_attr("title", string(node, "title"))
    }
}

fn close(open: &mut Vec<(Mark, Vec<markup::Node>)>, root: &mut Vec<markup::Node>) {
    let Some((mark, children)) = open.pop() else {
        return;
    };
    let node = match mark.kind {
        MarkType::Link => markup::Node::new(Markup::Link)
            .with_attr(
                "href",
                mark.attrs.get("href").and_then(AttrValue::as_str).unwrap_or_default(),
            )
            .with_attr(
                "title",
                mark.attrs.get("title").and_then(AttrValue::as_str).unwrap_or_default(),
            )
            .with_children(children),
        MarkType::Bold => markup::Node::new(Markup::Strong).with_children(children),
        MarkType::Italic => markup::Node::new(Markup::Em).with_children(children),
        MarkType::Strikethrough => markup::Node::new(Markup::S).with_children(children),
        MarkType::Component(name) => {
            markup::Node::tag(name, attributes(mark.attrs.get(PROPS_ATTR)), children, true)
        }
        MarkType::Code => markup::Node::new(Markup::Paragraph).with_children(children),
    };
    match open.last_mut() {
        Some((_, siblings)) => siblings.push(node),
        None => root.push(node),
    }
}
