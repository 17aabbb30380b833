//! Building markup trees from `pulldown-cmark` events.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use serde_json::Value;

use super::{
    Node, NodeType,
    tags::{self, Delimiters, Item, Nesting, Piece, RawTag, TagKind, TagSyntax},
};
use crate::{FieldError, Result};

/// Markdown extensions shared by both dialects.
pub(crate) fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH
}

/// Parse a document written in the dialect `S`. Malformed or unbalanced
/// tags are errors.
pub fn parse<S: TagSyntax>(src: &str) -> Result<Node> {
    parse_with::<S>(src, Nesting::Strict)
}

/// Parse a document for reading. Malformed tags stay text and unbalanced
/// tags are kept with an error attached, so this only fails when the
/// document cannot be split into tags at all.
pub fn read<S: TagSyntax>(src: &str) -> Result<Node> {
    parse_with::<S>(src, Nesting::Lenient)
}

fn parse_with<S: TagSyntax>(src: &str, mode: Nesting) -> Result<Node> {
    let extracted = tags::extract::<S>(src, mode)?;
    let doc = build(&extracted.text);
    let resolver = Resolver {
        tags: &extracted.tags,
        delimiters: extracted.delimiters,
        mode,
    };
    let mut items = resolver.resolve(doc)?;
    match items.pop() {
        Some(Item::Node(doc)) if items.is_empty() => Ok(doc),
        _ => Err(FieldError::syntax(0, "document did not resolve to a single root")),
    }
}

struct Frame {
    node: Node,
    /// Children are spliced into the parent instead of the node itself.
    transparent: bool,
}

/// Build the tree for placeholder-substituted text.
fn build(text: &str) -> Node {
    let mut stack = vec![Frame {
        node: Node::new(NodeType::Document),
        transparent: false,
    }];
    let mut in_head = false;

    let push = |stack: &mut Vec<Frame>, node: Node| {
        let Some(top) = stack.last_mut() else {
            return;
        };
        if node.kind == NodeType::Text
            && let Some(last) = top.node.children.last_mut()
            && last.kind == NodeType::Text
        {
            let joined = format!("{}{}", last.content(), node.content());
            last.attributes
                .insert("content".to_string(), Value::String(joined));
        } else {
            top.node.children.push(node);
        }
    };

    for event in Parser::new_ext(text, options()) {
        match event {
            Event::Start(tag) => {
                let (node, transparent) = match tag {
                    Tag::Paragraph => (Node::new(NodeType::Paragraph), false),
                    Tag::Heading { level, .. } => (
                        Node::new(NodeType::Heading).with_attr("level", level as u8),
                        false,
                    ),
                    Tag::BlockQuote(_) => (Node::new(NodeType::Blockquote), false),
                    Tag::CodeBlock(kind) => {
                        let language = match kind {
                            CodeBlockKind::Fenced(info) => {
                                info.split_whitespace().next().unwrap_or_default().to_string()
                            }
                            CodeBlockKind::Indented => String::new(),
                        };
                        (
                            Node::new(NodeType::Fence)
                                .with_attr("language", language)
                                .with_attr("content", ""),
                            false,
                        )
                    }
                    Tag::List(start) => {
                        let mut list = Node::new(NodeType::List).with_attr("ordered", start.is_some());
                        if let Some(start) = start {
                            list = list.with_attr("start", start);
                        }
                        (list, false)
                    }
                    Tag::Item => (Node::new(NodeType::Item), false),
                    Tag::HtmlBlock => (Node::new(NodeType::Paragraph), false),
                    Tag::Table(_) => (Node::new(NodeType::Table), false),
                    Tag::TableHead => {
                        in_head = true;
                        stack.push(Frame {
                            node: Node::new(NodeType::Thead),
                            transparent: false,
                        });
                        (Node::new(NodeType::Tr), false)
                    }
                    Tag::TableRow => (Node::new(NodeType::Tr), false),
                    Tag::TableCell => (
                        Node::new(if in_head { NodeType::Th } else { NodeType::Td }),
                        false,
                    ),
                    Tag::Emphasis => (Node::new(NodeType::Em), false),
                    Tag::Strong => (Node::new(NodeType::Strong), false),
                    Tag::Strikethrough => (Node::new(NodeType::S), false),
                    Tag::Link {
                        dest_url, title, ..
                    } => (
                        Node::new(NodeType::Link)
                            .with_attr("href", dest_url.to_string())
                            .with_attr("title", title.to_string()),
                        false,
                    ),
                    Tag::Image {
                        dest_url, title, ..
                    } => (
                        Node::new(NodeType::Image)
                            .with_attr("src", dest_url.to_string())
                            .with_attr("title", title.to_string()),
                        false,
                    ),
                    _ => (Node::new(NodeType::Paragraph), true),
                };
                stack.push(Frame { node, transparent });
            }
            Event::End(end) => {
                let Some(mut frame) = stack.pop() else {
                    continue;
                };
                match end {
                    TagEnd::Image => {
                        let alt: String = frame.node.walk().skip(1).map(Node::content).collect();
                        frame.node.children.clear();
                        frame.node = frame.node.with_attr("alt", alt);
                    }
                    TagEnd::Item => {
                        frame.node.children = wrap_inline_runs(std::mem::take(&mut frame.node.children));
                    }
                    TagEnd::Table => group_body_rows(&mut frame.node),
                    TagEnd::TableHead => {
                        in_head = false;
                        if let Some(mut head) = stack.pop() {
                            head.node.children.push(frame.node);
                            frame = head;
                        }
                    }
                    _ => {}
                }
                if frame.transparent {
                    for child in frame.node.children {
                        push(&mut stack, child);
                    }
                } else {
                    push(&mut stack, frame.node);
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut()
                    && top.node.kind == NodeType::Fence
                {
                    let content = format!("{}{}", top.node.content(), text);
                    top.node
                        .attributes
                        .insert("content".to_string(), Value::String(content));
                } else {
                    push(&mut stack, Node::text(text.to_string()));
                }
            }
            Event::Code(code) => push(
                &mut stack,
                Node::new(NodeType::Code).with_attr("content", code.to_string()),
            ),
            Event::Html(html) | Event::InlineHtml(html) => {
                push(&mut stack, Node::text(html.to_string()))
            }
            Event::SoftBreak => push(&mut stack, Node::new(NodeType::Softbreak)),
            Event::HardBreak => push(&mut stack, Node::new(NodeType::Hardbreak)),
            Event::Rule => push(&mut stack, Node::new(NodeType::Hr)),
            _ => {}
        }
    }

    while stack.len() > 1 {
        if let Some(frame) = stack.pop() {
            push(&mut stack, frame.node);
        }
    }
    stack
        .pop()
        .map(|frame| frame.node)
        .unwrap_or_else(|| Node::new(NodeType::Document))
}

/// Tight list items hold inline content directly. Wrap each run of inline
/// nodes in a paragraph so items always contain blocks.
fn wrap_inline_runs(children: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    let mut run: Vec<Node> = Vec::new();
    for child in children {
        if child.kind.is_inline() {
            run.push(child);
            continue;
        }
        if !run.is_empty() {
            out.push(Node::new(NodeType::Paragraph).with_children(std::mem::take(&mut run)));
        }
        out.push(child);
    }
    if !run.is_empty() {
        out.push(Node::new(NodeType::Paragraph).with_children(run));
    }
    out
}

fn group_body_rows(table: &mut Node) {
    let (head, rows): (Vec<Node>, Vec<Node>) = std::mem::take(&mut table.children)
        .into_iter()
        .partition(|child| child.kind == NodeType::Thead);
    table.children = head;
    if !rows.is_empty() {
        table
            .children
            .push(Node::new(NodeType::Tbody).with_children(rows));
    }
}

/// Swaps placeholders for their tags and nests tags among their siblings.
struct Resolver<'a> {
    tags: &'a [RawTag],
    delimiters: Delimiters,
    mode: Nesting,
}

impl Resolver<'_> {
    fn resolve(&self, mut node: Node) -> Result<Vec<Item>> {
        match node.kind {
            NodeType::Text => tags::split_placeholders(node.content(), self.delimiters)
                .into_iter()
                .map(|piece| match piece {
                    Piece::Text(text) => Ok(Item::Node(Node::text(text))),
                    Piece::Tag(index) => self
                        .tags
                        .get(index)
                        .cloned()
                        .map(Item::Tag)
                        .ok_or_else(|| FieldError::syntax(0, "dangling tag placeholder")),
                })
                .collect(),
            NodeType::Paragraph => {
                let items = self.resolve_all(node.children)?;
                self.split_tag_lines(items)
            }
            _ => {
                let items = self.resolve_all(std::mem::take(&mut node.children))?;
                node.children = tags::nest(items, node.kind.holds_inline(), self.mode)?;
                Ok(vec![Item::Node(node)])
            }
        }
    }

    fn resolve_all(&self, children: Vec<Node>) -> Result<Vec<Item>> {
        let mut out = Vec::new();
        for child in children {
            out.extend(self.resolve(child)?);
        }
        Ok(out)
    }

    /// A tag alone on its line is a block-level tag. Split a paragraph around
    /// such lines; the remaining lines stay paragraphs with inline tags.
    fn split_tag_lines(&self, items: Vec<Item>) -> Result<Vec<Item>> {
        let mut lines: Vec<Vec<Item>> = vec![Vec::new()];
        for item in items {
            match item {
                Item::Node(node) if node.kind == NodeType::Softbreak => lines.push(Vec::new()),
                item => {
                    if let Some(line) = lines.last_mut() {
                        line.push(item);
                    }
                }
            }
        }

        let mut out = Vec::new();
        let mut pending: Vec<Item> = Vec::new();
        let flush = |pending: &mut Vec<Item>, out: &mut Vec<Item>| -> Result<()> {
            if !pending.is_empty() {
                let children = tags::nest(std::mem::take(pending), true, self.mode)?;
                out.push(Item::Node(
                    Node::new(NodeType::Paragraph).with_children(children),
                ));
            }
            Ok(())
        };

        for mut line in lines {
            let block_tag = matches!(
                line.as_slice(),
                [Item::Tag(tag)] if tag.kind != TagKind::Variable
            );
            if block_tag {
                flush(&mut pending, &mut out)?;
                out.append(&mut line);
                continue;
            }
            if !pending.is_empty() {
                pending.push(Item::Node(Node::new(NodeType::Softbreak)));
            }
            pending.append(&mut line);
        }
        flush(&mut pending, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::markdoc::MarkdocSyntax;
    use pretty_assertions::assert_eq;

    fn kinds(node: &Node) -> Vec<NodeType> {
        node.children.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn test_builds_block_structure() {
        let doc = parse::<MarkdocSyntax>("# Title\n\n> quote\n\n- a\n- b\n\n---\n").unwrap();
        assert_eq!(
            kinds(&doc),
            vec![
                NodeType::Heading,
                NodeType::Blockquote,
                NodeType::List,
                NodeType::Hr
            ]
        );
        assert_eq!(doc.children[0].attr_u64("level"), Some(1));
        let item = &doc.children[2].children[0];
        assert_eq!(kinds(item), vec![NodeType::Paragraph]);
    }

    #[test]
    fn test_fence_keeps_language_and_content() {
        let doc = parse::<MarkdocSyntax>("```rust\nfn main() {}\n```\n").unwrap();
        let fence = &doc.children[0];
        assert_eq!(fence.attr_str("language"), Some("rust"));
        assert_eq!(fence.content(), "fn main() {}\n");
    }

    #[test]
    fn test_image_alt_comes_from_text() {
        let doc = parse::<MarkdocSyntax>("![a *cat*](cat.png \"Cat\")\n").unwrap();
        let image = &doc.children[0].children[0];
        assert_eq!(image.kind, NodeType::Image);
        assert_eq!(image.attr_str("alt"), Some("a cat"));
        assert_eq!(image.attr_str("title"), Some("Cat"));
        assert!(image.children.is_empty());
    }

    #[test]
    fn test_table_rows_are_grouped() {
        let doc = parse::<MarkdocSyntax>("| a | b |\n| - | - |\n| 1 | 2 |\n").unwrap();
        let table = &doc.children[0];
        assert_eq!(kinds(table), vec![NodeType::Thead, NodeType::Tbody]);
        assert_eq!(table.children[0].children[0].children[0].kind, NodeType::Th);
        assert_eq!(table.children[1].children[0].children[1].kind, NodeType::Td);
    }

    #[test]
    fn test_tag_lines_split_paragraphs() {
        let doc = parse::<MarkdocSyntax>("{% callout %}\nHello\n{% /callout %}\n").unwrap();
        assert_eq!(kinds(&doc), vec![NodeType::Tag]);
        let callout = &doc.children[0];
        assert!(!callout.inline);
        assert_eq!(kinds(callout), vec![NodeType::Paragraph]);
    }

    #[test]
    fn test_inline_tags_stay_in_paragraph() {
        let doc = parse::<MarkdocSyntax>("Hi {% badge /%} there\n").unwrap();
        let paragraph = &doc.children[0];
        assert_eq!(
            kinds(paragraph),
            vec![NodeType::Text, NodeType::Tag, NodeType::Text]
        );
        assert!(paragraph.children[1].inline);
    }

    #[test]
    fn test_private_use_text_does_not_hide_tags() {
        let doc = parse::<MarkdocSyntax>("x\u{E000}y {% pill /%}\n").unwrap();
        let paragraph = &doc.children[0];
        assert_eq!(kinds(paragraph), vec![NodeType::Text, NodeType::Tag]);
        assert_eq!(paragraph.children[0].content(), "x\u{E000}y ");
        assert_eq!(paragraph.children[1].tag.as_deref(), Some("pill"));
    }

    #[test]
    fn test_placeholder_lookalike_stays_text() {
        let doc = parse::<MarkdocSyntax>("\u{E000}0\u{E001} text\n").unwrap();
        let paragraph = &doc.children[0];
        assert_eq!(kinds(paragraph), vec![NodeType::Text]);
        assert_eq!(paragraph.children[0].content(), "\u{E000}0\u{E001} text");
    }

    #[test]
    fn test_read_keeps_unclosed_tag_with_error() {
        let doc = read::<MarkdocSyntax>("{% callout %}\n\nunclosed\n").unwrap();
        assert_eq!(kinds(&doc), vec![NodeType::Tag]);
        let callout = &doc.children[0];
        assert_eq!(callout.tag.as_deref(), Some("callout"));
        assert_eq!(callout.errors, vec!["Unclosed tag: callout"]);
        assert_eq!(kinds(callout), vec![NodeType::Paragraph]);
    }

    #[test]
    fn test_read_keeps_stray_closing_tag_with_error() {
        let doc = read::<MarkdocSyntax>("{% /stray %}").unwrap();
        assert_eq!(kinds(&doc), vec![NodeType::Tag]);
        assert_eq!(doc.children[0].errors, vec!["Unexpected closing tag: stray"]);
    }

    #[test]
    fn test_read_accepts_variables() {
        let doc = read::<MarkdocSyntax>("{% if $flag %}\nShown\n{% /if %}\n\nHello {% $name %}\n")
            .unwrap();
        assert_eq!(kinds(&doc), vec![NodeType::Tag, NodeType::Paragraph]);

        let condition = &doc.children[0];
        assert_eq!(condition.tag.as_deref(), Some("if"));
        assert!(condition.errors.is_empty());
        assert_eq!(
            condition.attributes.get("primary"),
            Some(&crate::markup::variable_ref(vec!["flag".into()]))
        );
        assert_eq!(kinds(condition), vec![NodeType::Paragraph]);

        let greeting = &doc.children[1];
        assert_eq!(kinds(greeting), vec![NodeType::Text, NodeType::Variable]);
        assert_eq!(greeting.children[1].variable_path(), vec!["name"]);
    }

    #[test]
    fn test_read_keeps_malformed_tag_as_text() {
        let doc = read::<MarkdocSyntax>("a {% callout\n").unwrap();
        assert_eq!(doc.children[0].children[0].content(), "a {% callout");
    }

    #[test]
    fn test_unclosed_block_tag_is_an_error() {
        let err = parse::<MarkdocSyntax>("{% callout %}\n\ntext\n").unwrap_err();
        assert!(matches!(err, FieldError::UnclosedTag(name) if name == "callout"));
    }
}
