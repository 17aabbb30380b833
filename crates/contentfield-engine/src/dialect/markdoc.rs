use serde::Serialize;

use super::{CollaborativeDialect, Dialect};
use crate::{
    Result, collab::CollaborationBridge, field::ContentField, markup, markup::markdoc,
};

/// Markdoc (`.mdoc`): Markdown with `{% tag %}` components.
#[derive(Debug, Clone, Copy, Default)]
pub struct Markdoc;

/// Reader output for Markdoc: the parsed markup tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkdocDocument {
    pub node: markup::Node,
}

impl Dialect for Markdoc {
    const NAME: &'static str = "Markdoc";
    const CONTENT_EXTENSION: &'static str = ".mdoc";

    type ReaderOutput = MarkdocDocument;

    fn is_component_name(name: &str) -> bool {
        markdoc::is_tag_name(name)
    }

    fn parse_markup(content: &str) -> Result<markup::Node> {
        markdoc::parse(content)
    }

    fn format_markup(doc: &markup::Node) -> String {
        markdoc::format(doc)
    }

    fn read(text: String) -> Result<MarkdocDocument> {
        Ok(MarkdocDocument {
            node: markdoc::read(&text)?,
        })
    }

    fn collaboration(field: &ContentField<Self>) -> Option<&dyn CollaborationBridge> {
        Some(field)
    }
}

impl CollaborativeDialect for Markdoc {}
