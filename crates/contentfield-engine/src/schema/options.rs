use serde::{Deserialize, Serialize};

use crate::{FieldError, Result, paths::fix_path};

/// Editor options as written by the user. Every construct is enabled unless
/// switched off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorOptions {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub strikethrough: Option<bool>,
    pub code: Option<bool>,
    pub heading: Option<HeadingOption>,
    pub blockquote: Option<bool>,
    pub ordered_list: Option<bool>,
    pub unordered_list: Option<bool>,
    pub table: Option<bool>,
    pub link: Option<bool>,
    pub image: Option<ImageOption>,
    pub divider: Option<bool>,
    pub code_block: Option<CodeBlockOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeadingOption {
    Enabled(bool),
    Levels(Vec<u8>),
    Config { levels: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodeBlockOption {
    Enabled(bool),
    Config(CodeBlockConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageOption {
    Enabled(bool),
    Config(ImageConfig),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeBlockConfig {
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Where image files live. Without a directory, images are stored next to
/// the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub public_path: Option<String>,
}

impl ImageConfig {
    /// The configured directory, path-normalized.
    pub fn directory(&self) -> Option<String> {
        self.directory.as_deref().map(fix_path)
    }
}

/// Normalized editor configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
    /// Allowed heading levels, sorted; `None` when headings are disabled.
    pub heading: Option<Vec<u8>>,
    pub blockquote: bool,
    pub ordered_list: bool,
    pub unordered_list: bool,
    pub table: bool,
    pub link: bool,
    pub image: Option<ImageConfig>,
    pub divider: bool,
    pub code_block: Option<CodeBlockConfig>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            bold: true,
            italic: true,
            strikethrough: true,
            code: true,
            heading: Some(ALL_LEVELS.to_vec()),
            blockquote: true,
            ordered_list: true,
            unordered_list: true,
            table: true,
            link: true,
            image: Some(ImageConfig::default()),
            divider: true,
            code_block: Some(CodeBlockConfig::default()),
        }
    }
}

const ALL_LEVELS: [u8; 6] = [1, 2, 3, 4, 5, 6];

pub fn editor_options_to_config(options: &EditorOptions) -> Result<EditorConfig> {
    let enabled = |flag: Option<bool>| flag.unwrap_or(true);

    let heading = match &options.heading {
        None | Some(HeadingOption::Enabled(true)) => Some(ALL_LEVELS.to_vec()),
        Some(HeadingOption::Enabled(false)) => None,
        Some(HeadingOption::Levels(levels)) | Some(HeadingOption::Config { levels }) => {
            let mut levels = levels.clone();
            if let Some(bad) = levels.iter().find(|l| !ALL_LEVELS.contains(l)) {
                return Err(FieldError::InvalidHeadingLevel(*bad));
            }
            levels.sort_unstable();
            levels.dedup();
            (!levels.is_empty()).then_some(levels)
        }
    };

    let image = match &options.image {
        None | Some(ImageOption::Enabled(true)) => Some(ImageConfig::default()),
        Some(ImageOption::Enabled(false)) => None,
        Some(ImageOption::Config(config)) => Some(config.clone()),
    };

    let code_block = match &options.code_block {
        None | Some(CodeBlockOption::Enabled(true)) => Some(CodeBlockConfig::default()),
        Some(CodeBlockOption::Enabled(false)) => None,
        Some(CodeBlockOption::Config(config)) => Some(config.clone()),
    };

    Ok(EditorConfig {
        bold: enabled(options.bold),
        italic: enabled(options.italic),
        strikethrough: enabled(options.strikethrough),
        code: enabled(options.code),
        heading,
        blockquote: enabled(options.blockquote),
        ordered_list: enabled(options.ordered_list),
        unordered_list: enabled(options.unordered_list),
        table: enabled(options.table),
        link: enabled(options.link),
        image,
        divider: enabled(options.divider),
        code_block,
    })
}
