//! # Content fields
//!
//! [`ContentField`] is the descriptor a host form system registers for a
//! rich-text field. It is generic over a [`Dialect`]; [`markdoc`] and
//! [`mdx`] build the two concrete variants.
//!
//! ## Lifecycle
//!
//! Construction normalizes the editor options and computes the directory
//! list. The editor schema is built on the first call that needs it
//! (`schema`, `default_value`, `parse`, `from_yjs`) and reused for the rest of
//! the descriptor's life. The cell holding it is not `Sync`, so a descriptor
//! cannot be shared between threads.

use std::{cell::OnceCell, marker::PhantomData};

use crate::{
    Result,
    collab::CollaborationBridge,
    convert::{AssetSink, AssetSource, ExternalFiles, Files},
    dialect::{Dialect, Markdoc, MarkdocDocument, Mdx},
    models::EditorState,
    schema::{
        ComponentRegistry, EditorConfig, EditorOptions, EditorSchema, ImageConfig,
        component_directories, editor_options_to_config,
    },
};

/// Everything needed to declare a content field.
#[derive(Debug, Clone, Default)]
pub struct FieldArgs {
    pub label: String,
    pub description: Option<String>,
    pub options: EditorOptions,
    pub components: ComponentRegistry,
}

/// Stored text plus the assets that came with it.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub content: &'a str,
    pub other: &'a Files,
    pub external: &'a ExternalFiles,
    pub slug: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SerializeContext<'a> {
    pub slug: Option<&'a str>,
}

/// Serialized output: the stored text and the assets to write next to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerializedContent {
    pub content: Vec<u8>,
    pub other: Files,
    pub external: ExternalFiles,
}

/// What the host's input renderer receives.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFieldInput<P> {
    pub label: String,
    pub description: Option<String>,
    pub props: P,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Content,
}

pub struct ContentField<D: Dialect> {
    label: String,
    description: Option<String>,
    config: EditorConfig,
    components: ComponentRegistry,
    directories: Vec<String>,
    schema: OnceCell<EditorSchema>,
    dialect: PhantomData<D>,
}

impl<D: Dialect> std::fmt::Debug for ContentField<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentField")
            .field("dialect", &D::NAME)
            .field("label", &self.label)
            .field("directories", &self.directories)
            .field("schema_built", &self.is_schema_built())
            .finish_non_exhaustive()
    }
}

impl<D: Dialect> ContentField<D> {
    pub fn new(args: FieldArgs) -> Result<Self> {
        let config = editor_options_to_config(&args.options)?;
        let mut directories = component_directories(&args.components);
        if let Some(directory) = config.image.as_ref().and_then(ImageConfig::directory) {
            directories.push(directory);
        }
        Ok(Self {
            label: args.label,
            description: args.description,
            config,
            components: args.components,
            directories,
            schema: OnceCell::new(),
            dialect: PhantomData,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn kind(&self) -> FieldKind {
        FieldKind::Form
    }

    pub fn form_kind(&self) -> FormKind {
        FormKind::Content
    }

    /// The editor schema, built on first use.
    pub fn schema(&self) -> Result<&EditorSchema> {
        if let Some(schema) = self.schema.get() {
            return Ok(schema);
        }
        let schema = EditorSchema::new(
            self.config.clone(),
            &self.components,
            D::NAME,
            D::is_component_name,
        )?;
        Ok(self.schema.get_or_init(|| schema))
    }

    pub fn is_schema_built(&self) -> bool {
        self.schema.get().is_some()
    }

    pub fn default_value(&self) -> Result<EditorState> {
        Ok(self.schema()?.default_state())
    }

    pub fn input<P>(&self, props: P) -> DocumentFieldInput<P> {
        DocumentFieldInput {
            label: self.label.clone(),
            description: self.description.clone(),
            props,
        }
    }

    pub fn parse(&self, ctx: ParseContext<'_>) -> Result<EditorState> {
        let assets = AssetSource {
            other: ctx.other,
            external: ctx.external,
            slug: ctx.slug,
        };
        D::parse(ctx.content, self.schema()?, &assets)
    }

    pub fn content_extension(&self) -> &'static str {
        D::CONTENT_EXTENSION
    }

    pub fn validate(&self, value: EditorState) -> EditorState {
        value
    }

    /// Directories this field may write assets into: those of component
    /// parameters first, then the image directory.
    pub fn directories(&self) -> &[String] {
        &self.directories
    }

    pub fn serialize(&self, value: &EditorState, ctx: SerializeContext<'_>) -> SerializedContent {
        let mut assets = AssetSink::default();
        let text = D::serialize(value, self.config.image.as_ref(), ctx.slug, &mut assets);
        SerializedContent {
            content: text.into_bytes(),
            other: assets.other,
            external: assets.external,
        }
    }

    pub fn reader(&self) -> Reader<D> {
        Reader {
            dialect: PhantomData,
        }
    }

    pub fn collaboration(&self) -> Option<&dyn CollaborationBridge> {
        D::collaboration(self)
    }
}

/// Read-only parsing for display. Does not need the editor schema.
#[derive(Debug, Clone, Copy)]
pub struct Reader<D: Dialect> {
    dialect: PhantomData<D>,
}

impl<D: Dialect> Reader<D> {
    /// Decode `content` as UTF-8 (invalid sequences become U+FFFD, a leading
    /// byte order mark is dropped) and hand it to the dialect.
    pub fn parse(&self, content: &[u8]) -> Result<D::ReaderOutput> {
        let text = String::from_utf8_lossy(content);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        D::read(text.to_string())
    }
}

pub fn markdoc(args: FieldArgs) -> Result<ContentField<Markdoc>> {
    ContentField::new(args)
}

pub fn mdx(args: FieldArgs) -> Result<ContentField<Mdx>> {
    ContentField::new(args)
}

/// The descriptor surface a host form system depends on.
pub trait ContentFormField {
    type ReaderOutput;

    fn kind(&self) -> FieldKind;
    fn form_kind(&self) -> FormKind;
    fn default_value(&self) -> Result<EditorState>;
    fn parse(&self, ctx: ParseContext<'_>) -> Result<EditorState>;
    fn content_extension(&self) -> &'static str;
    fn validate(&self, value: EditorState) -> EditorState;
    fn directories(&self) -> &[String];
    fn serialize(&self, value: &EditorState, ctx: SerializeContext<'_>) -> SerializedContent;
    fn read(&self, content: &[u8]) -> Result<Self::ReaderOutput>;
    fn collaboration(&self) -> Option<&dyn CollaborationBridge>;
}

impl<D: Dialect> ContentFormField for ContentField<D> {
    type ReaderOutput = D::ReaderOutput;

    fn kind(&self) -> FieldKind {
        ContentField::kind(self)
    }

    fn form_kind(&self) -> FormKind {
        ContentField::form_kind(self)
    }

    fn default_value(&self) -> Result<EditorState> {
        ContentField::default_value(self)
    }

    fn parse(&self, ctx: ParseContext<'_>) -> Result<EditorState> {
        ContentField::parse(self, ctx)
    }

    fn content_extension(&self) -> &'static str {
        ContentField::content_extension(self)
    }

    fn validate(&self, value: EditorState) -> EditorState {
        ContentField::validate(self, value)
    }

    fn directories(&self) -> &[String] {
        ContentField::directories(self)
    }

    fn serialize(&self, value: &EditorState, ctx: SerializeContext<'_>) -> SerializedContent {
        ContentField::serialize(self, value, ctx)
    }

    fn read(&self, content: &[u8]) -> Result<D::ReaderOutput> {
        self.reader().parse(content)
    }

    fn collaboration(&self) -> Option<&dyn CollaborationBridge> {
        ContentField::collaboration(self)
    }
}

/// Reader output of a field whose dialect is chosen at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderOutput {
    Markdoc(MarkdocDocument),
    Mdx(String),
}

/// A content field whose dialect is chosen at runtime, e.g. from
/// configuration.
#[derive(Debug)]
pub enum AnyField {
    Markdoc(ContentField<Markdoc>),
    Mdx(ContentField<Mdx>),
}

macro_rules! with_field {
    ($self:expr, $field:ident => $body:expr) => {
        match $self {
            AnyField::Markdoc($field) => $body,
            AnyField::Mdx($field) => $body,
        }
    };
}

impl AnyField {
    pub fn dialect_name(&self) -> &'static str {
        match self {
            AnyField::Markdoc(_) => Markdoc::NAME,
            AnyField::Mdx(_) => Mdx::NAME,
        }
    }

    pub fn label(&self) -> &str {
        with_field!(self, field => field.label())
    }

    pub fn schema(&self) -> Result<&EditorSchema> {
        with_field!(self, field => field.schema())
    }

    pub fn default_value(&self) -> Result<EditorState> {
        with_field!(self, field => field.default_value())
    }

    pub fn parse(&self, ctx: ParseContext<'_>) -> Result<EditorState> {
        with_field!(self, field => field.parse(ctx))
    }

    pub fn content_extension(&self) -> &'static str {
        with_field!(self, field => field.content_extension())
    }

    pub fn directories(&self) -> &[String] {
        with_field!(self, field => field.directories())
    }

    pub fn serialize(&self, value: &EditorState, ctx: SerializeContext<'_>) -> SerializedContent {
        with_field!(self, field => field.serialize(value, ctx))
    }

    pub fn read(&self, content: &[u8]) -> Result<ReaderOutput> {
        match self {
            AnyField::Markdoc(field) => field.reader().parse(content).map(ReaderOutput::Markdoc),
            AnyField::Mdx(field) => field.reader().parse(content).map(ReaderOutput::Mdx),
        }
    }

    pub fn collaboration(&self) -> Option<&dyn CollaborationBridge> {
        with_field!(self, field => field.collaboration())
    }
}

impl From<ContentField<Markdoc>> for AnyField {
    fn from(field: ContentField<Markdoc>) -> Self {
        AnyField::Markdoc(field)
    }
}

impl From<ContentField<Mdx>> for AnyField {
    fn from(field: ContentField<Mdx>) -> Self {
        AnyField::Mdx(field)
    }
}
