use std::collections::BTreeMap;

use super::assets::{AssetSource, resolve_image};
use crate::{
    FieldError, Result,
    markup::{self, NodeType as Markup},
    models::{AttrValue, Mark, MarkType, Node, NodeType, merge_text},
    schema::{ComponentKind, ContentComponent, EditorSchema, PROPS_ATTR, validate_props},
};

/// Convert a markup tree into an editor document, degrading constructs the
/// schema does not allow.
pub fn to_editor(
    doc: &markup::Node,
    schema: &EditorSchema,
    assets: &AssetSource<'_>,
) -> Result<Node> {
    let converter = ToEditor { schema, assets };
    let content = converter.blocks(&doc.children)?;
    Ok(Node::new(NodeType::Doc).with_content(non_empty(content)))
}

/// Containers of blocks always hold at least one paragraph.
fn non_empty(blocks: Vec<Node>) -> Vec<Node> {
    if blocks.is_empty() {
        vec![Node::new(NodeType::Paragraph)]
    } else {
        blocks
    }
}

fn paragraph(content: Vec<Node>) -> Node {
    Node::new(NodeType::Paragraph).with_content(content)
}

struct ToEditor<'s, 'a> {
    schema: &'s EditorSchema,
    assets: &'s AssetSource<'a>,
}

impl ToEditor<'_, '_> {
    fn is_inline(node: &markup::Node) -> bool {
        node.kind.is_inline() || (node.kind == Markup::Tag && node.inline)
    }

    fn blocks(&self, nodes: &[markup::Node]) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        let mut run: Vec<markup::Node> = Vec::new();
        for node in nodes {
            if Self::is_inline(node) {
                run.push(node.clone());
                continue;
            }
            if !run.is_empty() {
                out.push(paragraph(self.inlines(&std::mem::take(&mut run), &[])?));
            }
            self.block(node, &mut out)?;
        }
        if !run.is_empty() {
            out.push(paragraph(self.inlines(&run, &[])?));
        }
        Ok(out)
    }

    fn block(&self, node: &markup::Node, out: &mut Vec<Node>) -> Result<()> {
        match node.kind {
            Markup::Paragraph => out.push(paragraph(self.inlines(&node.children, &[])?)),
            Markup::Heading => {
                let level = node.attr_u64("level").unwrap_or(1).min(6) as u8;
                let content = self.inlines(&node.children, &[])?;
                out.push(if self.schema.allows_heading(level) {
                    Node::new(NodeType::Heading)
                        .with_attr("level", f64::from(level))
                        .with_content(content)
                } else {
                    paragraph(content)
                });
            }
            Markup::Blockquote => {
                let inner = self.blocks(&node.children)?;
                if self.schema.allows(&NodeType::Blockquote) {
                    out.push(Node::new(NodeType::Blockquote).with_content(non_empty(inner)));
                } else {
                    out.extend(inner);
                }
            }
            Markup::List => self.list(node, out)?,
            Markup::Fence => {
                let mut text = node.content().to_string();
                if text.ends_with('\n') {
                    text.pop();
                }
                let content: Vec<Node> = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::text(text, Vec::new())]
                };
                out.push(if self.schema.allows(&NodeType::CodeBlock) {
                    Node::new(NodeType::CodeBlock)
                        .with_attr("language", node.attr_str("language").unwrap_or_default())
                        .with_content(content)
                } else {
                    paragraph(content)
                });
            }
            Markup::Hr => {
                if self.schema.allows(&NodeType::Divider) {
                    out.push(Node::new(NodeType::Divider));
                }
            }
            Markup::Table => self.table(node, out)?,
            Markup::Tag => self.block_component(node, out)?,
            _ => out.extend(self.blocks(&node.children)?),
        }
        Ok(())
    }

    fn list(&self, node: &markup::Node, out: &mut Vec<Node>) -> Result<()> {
        let ordered = node.attr_bool("ordered").unwrap_or(false);
        let kind = if ordered {
            NodeType::OrderedList
        } else {
            NodeType::UnorderedList
        };
        if !self.schema.allows(&kind) {
            for item in &node.children {
                out.extend(self.blocks(&item.children)?);
            }
            return Ok(());
        }

        let items = node
            .children
            .iter()
            .map(|item| {
                Ok(Node::new(NodeType::ListItem).with_content(non_empty(self.blocks(&item.children)?)))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut list = Node::new(kind).with_content(items);
        if ordered {
            list = list.with_attr("start", node.attr_u64("start").unwrap_or(1) as f64);
        }
        out.push(list);
        Ok(())
    }

    fn table(&self, node: &markup::Node, out: &mut Vec<Node>) -> Result<()> {
        let rows = node.children.iter().flat_map(|section| &section.children);
        if !self.schema.allows(&NodeType::Table) {
            for row in rows {
                let mut content = Vec::new();
                for (i, cell) in row.children.iter().enumerate() {
                    if i > 0 {
                        content.push(Node::text(" ", Vec::new()));
                    }
                    content.extend(self.inlines(&cell.children, &[])?);
                }
                out.push(paragraph(merge_text(content)));
            }
            return Ok(());
        }

        let mut table_rows = Vec::new();
        for row in rows {
            let cells = row
                .children
                .iter()
                .map(|cell| {
                    let kind = if cell.kind == Markup::Th {
                        NodeType::TableHeader
                    } else {
                        NodeType::TableCell
                    };
                    Ok(Node::new(kind).with_content(vec![paragraph(self.inlines(&cell.children, &[])?)]))
                })
                .collect::<Result<Vec<_>>>()?;
            table_rows.push(Node::new(NodeType::TableRow).with_content(cells));
        }
        out.push(Node::new(NodeType::Table).with_content(table_rows));
        Ok(())
    }

    /// Resolve a tag against the registry and validate its props.
    fn component<'n>(
        &self,
        node: &'n markup::Node,
    ) -> Result<(&'n str, &ContentComponent, BTreeMap<String, AttrValue>)> {
        let name = node.tag.as_deref().unwrap_or_default();
        let component = self
            .schema
            .component(name)
            .ok_or_else(|| FieldError::UnknownComponent(name.to_string()))?;
        let props = node
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), AttrValue::from(value.clone())))
            .collect();
        let props = validate_props(name, &component.schema, props)?;
        Ok((name, component, props))
    }

    fn block_component(&self, node: &markup::Node, out: &mut Vec<Node>) -> Result<()> {
        let (name, component, props) = self.component(node)?;
        let base = Node::new(NodeType::Component(name.to_string()))
            .with_attr(PROPS_ATTR, AttrValue::Map(props));
        match component.kind {
            ComponentKind::Block => out.push(base),
            ComponentKind::Wrapper => {
                out.push(base.with_content(non_empty(self.blocks(&node.children)?)))
            }
            // An inline component alone on its line.
            ComponentKind::Inline => out.push(paragraph(vec![base])),
            ComponentKind::Mark => {
                return Err(FieldError::MisplacedComponent {
                    name: name.to_string(),
                    placement: "as a block",
                });
            }
        }
        Ok(())
    }

    fn inlines(&self, nodes: &[markup::Node], marks: &[Mark]) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        for node in nodes {
            self.inline(node, marks, &mut out)?;
        }
        Ok(merge_text(out))
    }

    fn inline(&self, node: &markup::Node, marks: &[Mark], out: &mut Vec<Node>) -> Result<()> {
        match node.kind {
            Markup::Text => out.push(Node::text(node.content(), marks.to_vec())),
            Markup::Softbreak => out.push(Node::text(" ", marks.to_vec())),
            Markup::Hardbreak => out.push(Node::new(NodeType::HardBreak)),
            Markup::Strong => self.marked(node, marks, Mark::new(MarkType::Bold), out)?,
            Markup::Em => self.marked(node, marks, Mark::new(MarkType::Italic), out)?,
            Markup::S => self.marked(node, marks, Mark::new(MarkType::Strikethrough), out)?,
            Markup::Link => {
                let mark = Mark::new(MarkType::Link)
                    .with_attr("href", node.attr_str("href").unwrap_or_default())
                    .with_attr("title", node.attr_str("title").unwrap_or_default());
                self.marked(node, marks, mark, out)?;
            }
            Markup::Code => {
                let mut marks = marks.to_vec();
                if self.schema.allows_mark(&MarkType::Code) {
                    marks.push(Mark::new(MarkType::Code));
                }
                out.push(Node::text(node.content(), marks));
            }
            Markup::Image => out.push(self.image(node, marks)),
            Markup::Tag => self.inline_component(node, marks, out)?,
            Markup::Variable => {
                return Err(FieldError::Unsupported(format!(
                    "variable ${}",
                    node.variable_path().join(".")
                )));
            }
            _ => {
                for child in &node.children {
                    self.inline(child, marks, out)?;
                }
            }
        }
        Ok(())
    }

    fn marked(
        &self,
        node: &markup::Node,
        marks: &[Mark],
        mark: Mark,
        out: &mut Vec<Node>,
    ) -> Result<()> {
        let mut marks = marks.to_vec();
        if self.schema.allows_mark(&mark.kind) && !marks.iter().any(|m| m.kind == mark.kind) {
            marks.push(mark);
        }
        for child in &node.children {
            self.inline(child, &marks, out)?;
        }
        Ok(())
    }

    fn image(&self, node: &markup::Node, marks: &[Mark]) -> Node {
        let alt = node.attr_str("alt").unwrap_or_default();
        let Some(config) = self.schema.config().image.as_ref() else {
            return Node::text(alt, marks.to_vec());
        };
        let src = node.attr_str("src").unwrap_or_default();
        let (filename, data) = match resolve_image(config, src, self.assets) {
            Some((filename, data)) => (AttrValue::String(filename), AttrValue::Bytes(data)),
            None => (AttrValue::Null, AttrValue::Null),
        };
        Node::new(NodeType::Image)
            .with_attr("src", src)
            .with_attr("alt", alt)
            .with_attr("title", node.attr_str("title").unwrap_or_default())
            .with_attr("filename", filename)
            .with_attr("data", data)
    }

    fn inline_component(
        &self,
        node: &markup::Node,
        marks: &[Mark],
        out: &mut Vec<Node>,
    ) -> Result<()> {
        let (name, component, props) = self.component(node)?;
        match component.kind {
            ComponentKind::Inline => out.push(
                Node::new(NodeType::Component(name.to_string()))
                    .with_attr(PROPS_ATTR, AttrValue::Map(props)),
            ),
            ComponentKind::Mark => {
                let mark = Mark::new(MarkType::Component(name.to_string()))
                    .with_attr(PROPS_ATTR, AttrValue::Map(props));
                self.marked(node, marks, mark, out)?;
            }
            ComponentKind::Block | ComponentKind::Wrapper => {
                return Err(FieldError::MisplacedComponent {
                    name: name.to_string(),
                    placement: "inline",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        convert::assets::{ExternalFiles, Files},
        markup::markdoc,
        schema::{
            ComponentRegistry, EditorOptions, FieldSchema, HeadingOption,
            editor_options_to_config,
        },
    };
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn schema(options: EditorOptions, components: ComponentRegistry) -> EditorSchema {
        EditorSchema::new(
            editor_options_to_config(&options).unwrap(),
            &components,
            "markdoc",
            markdoc::is_tag_name,
        )
        .unwrap()
    }

    fn convert(src: &str, schema: &EditorSchema) -> Result<Node> {
        let other = Files::new();
        let external = ExternalFiles::new();
        let assets = AssetSource {
            other: &other,
            external: &external,
            slug: None,
        };
        to_editor(&markdoc::parse(src)?, schema, &assets)
    }

    fn kinds(node: &Node) -> Vec<NodeType> {
        node.content.iter().map(|n| n.kind.clone()).collect()
    }

    #[test]
    fn test_empty_document_has_one_paragraph() {
        let doc = convert("", &schema(EditorOptions::default(), ComponentRegistry::new())).unwrap();
        assert_eq!(doc, Node::new(NodeType::Doc).with_content(vec![paragraph(vec![])]));
    }

    #[test]
    fn test_marks_are_collected_on_text() {
        let doc = convert(
            "a **b *c*** [d](/x)\n",
            &schema(EditorOptions::default(), ComponentRegistry::new()),
        )
        .unwrap();
        let content = &doc.content[0].content;
        assert_eq!(content[0], Node::text("a ", vec![]));
        assert_eq!(content[1], Node::text("b ", vec![Mark::new(MarkType::Bold)]));
        assert_eq!(
            content[2],
            Node::text(
                "c",
                vec![Mark::new(MarkType::Bold), Mark::new(MarkType::Italic)]
            )
        );
        assert_eq!(
            content[4].marks,
            vec![
                Mark::new(MarkType::Link)
                    .with_attr("href", "/x")
                    .with_attr("title", "")
            ]
        );
    }

    #[test]
    fn test_disabled_constructs_degrade() {
        let options = EditorOptions {
            heading: Some(HeadingOption::Levels(vec![1])),
            blockquote: Some(false),
            bold: Some(false),
            divider: Some(false),
            ..Default::default()
        };
        let doc = convert(
            "## Two\n\n> quoted **text**\n\n---\n",
            &schema(options, ComponentRegistry::new()),
        )
        .unwrap();
        assert_eq!(kinds(&doc), vec![NodeType::Paragraph, NodeType::Paragraph]);
        assert_eq!(doc.content[1].content, vec![Node::text("quoted text", vec![])]);
    }

    #[test]
    fn test_unknown_component_is_an_error() {
        let err = convert(
            "{% mystery /%}\n",
            &schema(EditorOptions::default(), ComponentRegistry::new()),
        )
        .unwrap_err();
        assert!(matches!(err, FieldError::UnknownComponent(name) if name == "mystery"));
    }

    #[test]
    fn test_wrapper_component_holds_blocks_and_props() {
        let components = ComponentRegistry::from([(
            "callout".to_string(),
            ContentComponent::wrapper(IndexMap::from([(
                "tone".to_string(),
                FieldSchema::Select {
                    options: vec!["note".into(), "warning".into()],
                    default: None,
                },
            )])),
        )]);
        let doc = convert(
            "{% callout tone=\"warning\" %}\nCareful\n{% /callout %}\n",
            &schema(EditorOptions::default(), components),
        )
        .unwrap();
        let callout = &doc.content[0];
        assert_eq!(callout.kind, NodeType::Component("callout".into()));
        assert_eq!(
            callout.attr(PROPS_ATTR).and_then(AttrValue::to_json),
            Some(serde_json::json!({"tone": "warning"}))
        );
        assert_eq!(callout.content[0].text_content(), "Careful");
    }

    #[test]
    fn test_block_component_used_inline_is_misplaced() {
        let components = ComponentRegistry::from([(
            "figure".to_string(),
            ContentComponent::block(IndexMap::new()),
        )]);
        let err = convert(
            "Text {% figure /%} more\n",
            &schema(EditorOptions::default(), components),
        )
        .unwrap_err();
        assert!(matches!(err, FieldError::MisplacedComponent { placement: "inline", .. }));
    }

    #[test]
    fn test_fence_drops_trailing_newline() {
        let doc = convert(
            "```js\nlet a;\n```\n",
            &schema(EditorOptions::default(), ComponentRegistry::new()),
        )
        .unwrap();
        let code = &doc.content[0];
        assert_eq!(code.kind, NodeType::CodeBlock);
        assert_eq!(code.attr("language"), Some(&AttrValue::from("js")));
        assert_eq!(code.text_content(), "let a;");
    }
}
