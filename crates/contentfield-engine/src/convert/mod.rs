//! Conversion between markup trees and editor documents.

pub mod assets;
mod from_editor;
mod to_editor;

pub use assets::{AssetSink, AssetSource, ExternalFiles, Files};
pub use from_editor::from_editor;
pub use to_editor::to_editor;
