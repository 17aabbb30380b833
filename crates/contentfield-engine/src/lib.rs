//! Rich-text content fields stored as Markdoc (`.mdoc`) or MDX (`.mdx`).
//!
//! A [`ContentField`] connects an editor document to its stored text, to a
//! read-only rendering path and, for Markdoc, to a shared `yrs` document.

pub mod collab;
pub mod convert;
pub mod dialect;
pub mod error;
pub mod field;
pub mod io;
pub mod markup;
pub mod models;
pub mod paths;
pub mod render;
pub mod schema;

pub use collab::{CollaborationBridge, YjsFragment};
pub use dialect::{CollaborativeDialect, Dialect, Markdoc, MarkdocDocument, Mdx};
pub use error::{FieldError, Result};
pub use field::{
    AnyField, ContentField, ContentFormField, DocumentFieldInput, FieldArgs, FieldKind, FormKind,
    ParseContext, Reader, ReaderOutput, SerializeContext, SerializedContent, markdoc, mdx,
};
pub use models::{ContentFile, EditorState};
pub use render::{MarkdocConfig, create_markdoc_config, render_html};
