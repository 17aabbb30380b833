/// Errors raised while building schemas or moving content between its
/// text, editor and collaboration representations.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("Syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
    #[error("Unclosed tag: {0}")]
    UnclosedTag(String),
    #[error("Unexpected closing tag: {0}")]
    UnexpectedClosingTag(String),
    #[error("Missing component definition for {0}")]
    UnknownComponent(String),
    #[error("Component {name} cannot be used {placement}")]
    MisplacedComponent {
        name: String,
        placement: &'static str,
    },
    #[error("Invalid value for {component}.{field}: expected {expected}")]
    InvalidProp {
        component: String,
        field: String,
        expected: &'static str,
    },
    #[error("Invalid component name for {dialect}: {name}")]
    InvalidComponentName { dialect: &'static str, name: String },
    #[error("Component name conflicts with a built-in node or mark: {0}")]
    ComponentNameConflict(String),
    #[error("Invalid heading level: {0}")]
    InvalidHeadingLevel(u8),
    #[error("Cannot be edited: {0}")]
    Unsupported(String),
    #[error("Invalid collaborative document: {0}")]
    InvalidYjs(String),
}

impl FieldError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }
}

pub type Result<T, E = FieldError> = std::result::Result<T, E>;
