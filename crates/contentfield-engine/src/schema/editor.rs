use indexmap::IndexMap;

use super::{
    components::{ComponentKind, ComponentRegistry, ContentComponent},
    options::EditorConfig,
};
use crate::{
    FieldError, Result,
    models::{AttrValue, EditorState, MarkType, Node, NodeType},
};

/// Where a node may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeGroup {
    Top,
    Block,
    Inline,
    /// Only inside a specific parent (list items, table rows and cells).
    Nested,
}

/// What a node may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    Empty,
    Text,
    Inline,
    Blocks,
    ListItems,
    TableRows,
    TableCells,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub default: AttrValue,
}

impl AttrSpec {
    fn new(name: &'static str, default: impl Into<AttrValue>) -> Self {
        Self {
            name,
            default: default.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub kind: NodeType,
    pub group: NodeGroup,
    pub content: ContentRule,
    pub attrs: Vec<AttrSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkSpec {
    pub kind: MarkType,
    pub attrs: Vec<AttrSpec>,
}

/// The attribute that holds a component's validated props.
pub const PROPS_ATTR: &str = "props";

/// The set of constructs an editor instance accepts, derived from an
/// [`EditorConfig`] and a component registry. Immutable once built.
#[derive(Debug)]
pub struct EditorSchema {
    config: EditorConfig,
    nodes: IndexMap<String, NodeSpec>,
    marks: IndexMap<String, MarkSpec>,
    components: ComponentRegistry,
}

impl EditorSchema {
    /// Build a schema. `dialect` names the markup dialect and
    /// `is_component_name` decides which component names it can express.
    pub fn new(
        config: EditorConfig,
        components: &ComponentRegistry,
        dialect: &'static str,
        is_component_name: fn(&str) -> bool,
    ) -> Result<Self> {
        let mut nodes = IndexMap::new();
        let mut add = |kind: NodeType, group: NodeGroup, content: ContentRule, attrs: Vec<AttrSpec>| {
            nodes.insert(
                kind.name().to_string(),
                NodeSpec {
                    kind,
                    group,
                    content,
                    attrs,
                },
            );
        };

        add(NodeType::Doc, NodeGroup::Top, ContentRule::Blocks, vec![]);
        add(NodeType::Paragraph, NodeGroup::Block, ContentRule::Inline, vec![]);
        add(NodeType::Text, NodeGroup::Inline, ContentRule::Empty, vec![]);
        add(NodeType::HardBreak, NodeGroup::Inline, ContentRule::Empty, vec![]);
        if let Some(levels) = &config.heading {
            let first = levels.first().copied().unwrap_or(1);
            add(
                NodeType::Heading,
                NodeGroup::Block,
                ContentRule::Inline,
                vec![AttrSpec::new("level", f64::from(first))],
            );
        }
        if config.blockquote {
            add(NodeType::Blockquote, NodeGroup::Block, ContentRule::Blocks, vec![]);
        }
        if config.ordered_list {
            add(
                NodeType::OrderedList,
                NodeGroup::Block,
                ContentRule::ListItems,
                vec![AttrSpec::new("start", 1.0)],
            );
        }
        if config.unordered_list {
            add(NodeType::UnorderedList, NodeGroup::Block, ContentRule::ListItems, vec![]);
        }
        if config.ordered_list || config.unordered_list {
            add(NodeType::ListItem, NodeGroup::Nested, ContentRule::Blocks, vec![]);
        }
        if config.code_block.is_some() {
            add(
                NodeType::CodeBlock,
                NodeGroup::Block,
                ContentRule::Text,
                vec![AttrSpec::new("language", "")],
            );
        }
        if config.divider {
            add(NodeType::Divider, NodeGroup::Block, ContentRule::Empty, vec![]);
        }
        if config.image.is_some() {
            add(
                NodeType::Image,
                NodeGroup::Inline,
                ContentRule::Empty,
                vec![
                    AttrSpec::new("src", ""),
                    AttrSpec::new("alt", ""),
                    AttrSpec::new("title", ""),
                    AttrSpec::new("filename", AttrValue::Null),
                    AttrSpec::new("data", AttrValue::Null),
                ],
            );
        }
        if config.table {
            add(NodeType::Table, NodeGroup::Block, ContentRule::TableRows, vec![]);
            add(NodeType::TableRow, NodeGroup::Nested, ContentRule::TableCells, vec![]);
            add(NodeType::TableHeader, NodeGroup::Nested, ContentRule::Blocks, vec![]);
            add(NodeType::TableCell, NodeGroup::Nested, ContentRule::Blocks, vec![]);
        }

        let mut marks = IndexMap::new();
        let mut add_mark = |kind: MarkType, attrs: Vec<AttrSpec>| {
            marks.insert(kind.name().to_string(), MarkSpec { kind, attrs });
        };
        if config.link {
            add_mark(
                MarkType::Link,
                vec![AttrSpec::new("href", ""), AttrSpec::new("title", "")],
            );
        }
        for (enabled, kind) in [
            (config.bold, MarkType::Bold),
            (config.italic, MarkType::Italic),
            (config.strikethrough, MarkType::Strikethrough),
            (config.code, MarkType::Code),
        ] {
            if enabled {
                add_mark(kind, vec![]);
            }
        }

        for (name, component) in components {
            if !is_component_name(name) {
                return Err(FieldError::InvalidComponentName {
                    dialect,
                    name: name.clone(),
                });
            }
            if NodeType::builtin(name).is_some() || MarkType::builtin(name).is_some() {
                return Err(FieldError::ComponentNameConflict(name.clone()));
            }
            let props = vec![AttrSpec {
                name: PROPS_ATTR,
                default: AttrValue::Map(
                    component
                        .schema
                        .iter()
                        .map(|(k, f)| (k.clone(), f.default_value()))
                        .collect(),
                ),
            }];
            let kind = NodeType::Component(name.clone());
            match component.kind {
                ComponentKind::Block => add(kind, NodeGroup::Block, ContentRule::Empty, props),
                ComponentKind::Wrapper => add(kind, NodeGroup::Block, ContentRule::Blocks, props),
                ComponentKind::Inline => add(kind, NodeGroup::Inline, ContentRule::Empty, props),
                ComponentKind::Mark => add_mark(MarkType::Component(name.clone()), props),
            }
        }

        log::debug!(
            "Built {dialect} editor schema: {} node types, {} mark types",
            nodes.len(),
            marks.len()
        );

        Ok(Self {
            config,
            nodes,
            marks,
            components: components.clone(),
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.get(name)
    }

    pub fn mark(&self, name: &str) -> Option<&MarkSpec> {
        self.marks.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.values()
    }

    pub fn allows(&self, kind: &NodeType) -> bool {
        self.nodes.contains_key(kind.name())
    }

    pub fn allows_mark(&self, kind: &MarkType) -> bool {
        self.marks.contains_key(kind.name())
    }

    pub fn allows_heading(&self, level: u8) -> bool {
        self.config
            .heading
            .as_ref()
            .is_some_and(|levels| levels.contains(&level))
    }

    pub fn component(&self, name: &str) -> Option<&ContentComponent> {
        self.components.get(name)
    }

    /// The empty document: a single empty paragraph.
    pub fn empty_doc(&self) -> Node {
        Node::new(NodeType::Doc).with_content(vec![Node::new(NodeType::Paragraph)])
    }

    pub fn default_state(&self) -> EditorState {
        EditorState::new(self.empty_doc())
    }
}
