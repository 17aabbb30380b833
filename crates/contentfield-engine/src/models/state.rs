use serde::Serialize;

use super::node::{Node, NodeType};

/// Cursor or range selection as positions in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }
}

/// Set when a state was created from a collaborative document; identifies
/// the local peer in the awareness it was bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollaborationBinding {
    pub client_id: u64,
}

/// Editor-native document state.
///
/// Two states are equivalent when their documents are equal; selection and
/// collaboration binding are session details.
#[derive(Debug, Clone, Serialize)]
pub struct EditorState {
    pub doc: Node,
    pub selection: Selection,
    #[serde(skip)]
    pub collaboration: Option<CollaborationBinding>,
}

impl EditorState {
    pub fn new(doc: Node) -> Self {
        debug_assert_eq!(doc.kind, NodeType::Doc);
        Self {
            doc,
            selection: Selection::default(),
            collaboration: None,
        }
    }

    pub fn with_collaboration(mut self, binding: CollaborationBinding) -> Self {
        self.collaboration = Some(binding);
        self
    }
}

impl PartialEq for EditorState {
    fn eq(&self, other: &Self) -> bool {
        self.doc == other.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalence_ignores_selection_and_binding() {
        let doc = Node::new(NodeType::Doc).with_content(vec![Node::new(NodeType::Paragraph)]);
        let mut a = EditorState::new(doc.clone());
        a.selection = Selection::cursor(3);
        let b = EditorState::new(doc).with_collaboration(CollaborationBinding { client_id: 7 });
        assert_eq!(a, b);
    }
}
