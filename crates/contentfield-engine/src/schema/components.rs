use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::fields::{FieldSchema, collect_directories, object};

/// How a component sits in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Block-level, no children.
    Block,
    /// Block-level, wraps other blocks.
    Wrapper,
    /// Inline, no children.
    Inline,
    /// Inline, applies to a run of text.
    Mark,
}

impl ComponentKind {
    pub fn is_block(self) -> bool {
        matches!(self, ComponentKind::Block | ComponentKind::Wrapper)
    }
}

/// An embeddable custom component and the schema of its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentComponent {
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub schema: IndexMap<String, FieldSchema>,
}

impl ContentComponent {
    pub fn new(kind: ComponentKind, schema: IndexMap<String, FieldSchema>) -> Self {
        Self {
            kind,
            label: None,
            schema,
        }
    }

    pub fn block(schema: IndexMap<String, FieldSchema>) -> Self {
        Self::new(ComponentKind::Block, schema)
    }

    pub fn wrapper(schema: IndexMap<String, FieldSchema>) -> Self {
        Self::new(ComponentKind::Wrapper, schema)
    }

    pub fn inline(schema: IndexMap<String, FieldSchema>) -> Self {
        Self::new(ComponentKind::Inline, schema)
    }

    pub fn mark(schema: IndexMap<String, FieldSchema>) -> Self {
        Self::new(ComponentKind::Mark, schema)
    }
}

/// Components by name, in declaration order.
pub type ComponentRegistry = IndexMap<String, ContentComponent>;

/// Directories referenced by any component's parameters. Each component's
/// schema is wrapped as an object field and the registry as an object of
/// those.
pub fn component_directories(components: &ComponentRegistry) -> Vec<String> {
    let fields = components
        .iter()
        .map(|(name, component)| (name.clone(), object(component.schema.clone())))
        .collect();
    collect_directories(&object(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directories_follow_registry_order() {
        let image = |dir: &str| FieldSchema::Image {
            directory: Some(dir.to_string()),
            public_path: None,
        };
        let components = ComponentRegistry::from([
            (
                "gallery".to_string(),
                ContentComponent::block(IndexMap::from([
                    ("first".to_string(), image("a/b")),
                    ("second".to_string(), image("c/d")),
                ])),
            ),
            (
                "figure".to_string(),
                ContentComponent::block(IndexMap::from([("src".to_string(), image("c/d"))])),
            ),
        ]);

        assert_eq!(component_directories(&components), vec!["a/b", "c/d", "c/d"]);
    }

    #[test]
    fn test_kind_deserializes_snake_case() {
        let component: ContentComponent = serde_json::from_value(serde_json::json!({
            "kind": "wrapper",
            "schema": {"title": {"type": "text"}}
        }))
        .unwrap();
        assert_eq!(component.kind, ComponentKind::Wrapper);
        assert!(component.kind.is_block());
        assert_eq!(component.schema.len(), 1);
    }
}
