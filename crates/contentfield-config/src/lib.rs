use contentfield_engine::{
    AnyField, FieldArgs, FieldError, markdoc, mdx,
    schema::{ComponentRegistry, EditorOptions},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("No field named {0} in the configuration")]
    UnknownField(String),

    #[error("Invalid configuration for field {name}: {source}")]
    InvalidField { name: String, source: FieldError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectName {
    Markdoc,
    Mdx,
}

/// One content field as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub dialect: DialectName,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub options: EditorOptions,
    #[serde(default)]
    pub components: ComponentRegistry,
}

impl FieldConfig {
    /// Build the field descriptor this entry describes.
    pub fn build(&self) -> Result<AnyField, FieldError> {
        let args = FieldArgs {
            label: self.label.clone(),
            description: self.description.clone(),
            options: self.options.clone(),
            components: self.components.clone(),
        };
        Ok(match self.dialect {
            DialectName::Markdoc => markdoc(args)?.into(),
            DialectName::Mdx => mdx(args)?.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub content_path: PathBuf,
    #[serde(default)]
    pub fields: IndexMap<String, FieldConfig>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the content path
        config.content_path =
            Self::expand_path(&config.content_path).unwrap_or(config.content_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/contentfield");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn field(&self, name: &str) -> Result<&FieldConfig, ConfigError> {
        self.fields
            .get(name)
            .ok_or_else(|| ConfigError::UnknownField(name.to_string()))
    }

    /// Build the named field.
    pub fn build_field(&self, name: &str) -> Result<AnyField, ConfigError> {
        self.field(name)?
            .build()
            .map_err(|source| ConfigError::InvalidField {
                name: name.to_string(),
                source,
            })
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentfield_engine::schema::{ComponentKind, FieldSchema, HeadingOption, ImageOption};
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    const EXAMPLE: &str = r#"
content_path = "/tmp/site/content"

[fields.body]
dialect = "markdoc"
label = "Body"
description = "Main content"

[fields.body.options]
heading = [1, 2, 3]
image = { directory = "public/images", public_path = "/images/" }

[fields.body.components.callout]
kind = "wrapper"

[fields.body.components.callout.schema.tone]
type = "select"
options = ["note", "warning"]
default = "note"

[fields.page]
dialect = "mdx"
label = "Page"
"#;

    fn example() -> Config {
        toml::from_str(EXAMPLE).unwrap()
    }

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/contentfield/config.toml"));
    }

    #[test]
    fn test_parse_example_config() {
        let config = example();
        let body = config.field("body").unwrap();

        assert_eq!(body.dialect, DialectName::Markdoc);
        assert_eq!(body.description.as_deref(), Some("Main content"));
        assert_eq!(body.options.heading, Some(HeadingOption::Levels(vec![1, 2, 3])));
        assert!(matches!(body.options.image, Some(ImageOption::Config(_))));

        let callout = &body.components["callout"];
        assert_eq!(callout.kind, ComponentKind::Wrapper);
        assert_eq!(
            callout.schema["tone"],
            FieldSchema::Select {
                options: vec!["note".to_string(), "warning".to_string()],
                default: Some("note".to_string()),
            }
        );

        assert_eq!(config.field("page").unwrap().dialect, DialectName::Mdx);
    }

    #[test]
    fn test_build_fields() {
        let config = example();

        let body = config.build_field("body").unwrap();
        assert_eq!(body.content_extension(), ".mdoc");
        assert_eq!(body.directories(), ["public/images"]);

        let page = config.build_field("page").unwrap();
        assert_eq!(page.content_extension(), ".mdx");
        assert!(page.collaboration().is_none());
    }

    #[test]
    fn test_unknown_field() {
        let err = example().build_field("missing").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownField(name) if name == "missing"));
    }

    #[test]
    fn test_invalid_field_reports_its_name() {
        let mut config = example();
        config.fields["body"].options.heading = Some(HeadingOption::Levels(vec![7]));

        let err = config.build_field("body").unwrap_err();

        assert!(matches!(err, ConfigError::InvalidField { ref name, .. } if name == "body"));
        assert!(err.to_string().contains("Invalid heading level: 7"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = example();

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("CONTENTFIELD_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$CONTENTFIELD_TEST_VAR/subdir");
        let expanded = Config::expand_path(&path);

        assert_eq!(expanded, Some(PathBuf::from("/test/env/path/subdir")));

        unsafe {
            env::remove_var("CONTENTFIELD_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_absolute_path() {
        let path = PathBuf::from("/absolute/path");
        assert_eq!(Config::expand_path(&path), Some(path));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "content_path = 3").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested/config.toml");
        let test_config = example();

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }
}
