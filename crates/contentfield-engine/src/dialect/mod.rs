//! # Dialects
//!
//! A dialect is the small set of behaviours that differ between the
//! Markdoc and MDX fields: the tag syntax, the file extension, what the
//! reader hands back and whether a collaboration bridge exists. Everything
//! else lives in [`ContentField`](crate::field::ContentField), which is
//! generic over the dialect.

mod markdoc;
mod mdx;

pub use markdoc::{Markdoc, MarkdocDocument};
pub use mdx::Mdx;

use crate::{
    Result,
    collab::CollaborationBridge,
    convert::{AssetSink, AssetSource, from_editor, to_editor},
    field::ContentField,
    markup,
    models::EditorState,
    schema::{EditorSchema, ImageConfig},
};

pub trait Dialect: Sized + 'static {
    /// Human-readable name, used in errors and logs.
    const NAME: &'static str;
    /// Stored file extension, with leading dot.
    const CONTENT_EXTENSION: &'static str;

    /// What [`Reader::parse`](crate::field::Reader::parse) returns.
    type ReaderOutput;

    /// Whether a component name can be written as a tag in this dialect.
    fn is_component_name(name: &str) -> bool;

    fn parse_markup(content: &str) -> Result<markup::Node>;

    fn format_markup(doc: &markup::Node) -> String;

    /// Turn decoded reader input into the reader output. Never touches the
    /// editor schema.
    fn read(text: String) -> Result<Self::ReaderOutput>;

    fn parse(content: &str, schema: &EditorSchema, assets: &AssetSource<'_>) -> Result<EditorState> {
        let tree = Self::parse_markup(content)?;
        Ok(EditorState::new(to_editor(&tree, schema, assets)?))
    }

    fn serialize(
        value: &EditorState,
        image: Option<&ImageConfig>,
        slug: Option<&str>,
        assets: &mut AssetSink,
    ) -> String {
        Self::format_markup(&from_editor(&value.doc, image, slug, assets))
    }

    fn collaboration(_field: &ContentField<Self>) -> Option<&dyn CollaborationBridge> {
        None
    }
}

/// Dialects whose fields can be edited collaboratively.
pub trait CollaborativeDialect: Dialect {}
