pub mod content_file;
pub mod node;
pub mod state;

pub use content_file::ContentFile;
pub use node::*;
pub use state::*;
