//! Editor schemas and the configuration they are built from.
//!
//! - **`options`**: user-facing editor options and their normalized form
//! - **`fields`**: schemas of component parameters
//! - **`components`**: the component registry
//! - **`editor`**: [`EditorSchema`], the constructs one editor accepts

pub mod components;
pub mod editor;
pub mod fields;
pub mod options;

pub use components::{ComponentKind, ComponentRegistry, ContentComponent, component_directories};
pub use editor::{AttrSpec, ContentRule, EditorSchema, MarkSpec, NodeGroup, NodeSpec, PROPS_ATTR};
pub use fields::{FieldSchema, collect_directories, object, validate_props};
pub use options::{
    CodeBlockConfig, CodeBlockOption, EditorConfig, EditorOptions, HeadingOption, ImageConfig,
    ImageOption, editor_options_to_config,
};
