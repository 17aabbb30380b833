use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{FieldError, Result, models::AttrValue, paths::fix_path};

/// Schema of a component parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldSchema {
    Text {
        #[serde(default)]
        default: String,
        #[serde(default)]
        multiline: bool,
    },
    Integer {
        #[serde(default)]
        default: Option<i64>,
    },
    Number {
        #[serde(default)]
        default: Option<f64>,
    },
    Checkbox {
        #[serde(default)]
        default: bool,
    },
    Select {
        options: Vec<String>,
        #[serde(default)]
        default: Option<String>,
    },
    Url,
    Image {
        #[serde(default)]
        directory: Option<String>,
        #[serde(default)]
        public_path: Option<String>,
    },
    File {
        #[serde(default)]
        directory: Option<String>,
    },
    Object {
        fields: IndexMap<String, FieldSchema>,
    },
    Array {
        element: Box<FieldSchema>,
    },
}

/// Wrap a set of fields as an object field.
pub fn object(fields: IndexMap<String, FieldSchema>) -> FieldSchema {
    FieldSchema::Object { fields }
}

/// Directories referenced by asset fields anywhere in `schema`, in field
/// order. Repeated directories are reported each time they occur.
pub fn collect_directories(schema: &FieldSchema) -> Vec<String> {
    let mut out = Vec::new();
    collect_into(schema, &mut out);
    out
}

fn collect_into(schema: &FieldSchema, out: &mut Vec<String>) {
    match schema {
        FieldSchema::Image {
            directory: Some(directory),
            ..
        }
        | FieldSchema::File {
            directory: Some(directory),
        } => out.push(fix_path(directory)),
        FieldSchema::Object { fields } => {
            for field in fields.values() {
                collect_into(field, out);
            }
        }
        FieldSchema::Array { element } => collect_into(element, out),
        _ => {}
    }
}

impl FieldSchema {
    pub fn default_value(&self) -> AttrValue {
        match self {
            FieldSchema::Text { default, .. } => AttrValue::String(default.clone()),
            FieldSchema::Integer { default } => {
                default.map_or(AttrValue::Null, |n| AttrValue::Number(n as f64))
            }
            FieldSchema::Number { default } => default.map_or(AttrValue::Null, AttrValue::Number),
            FieldSchema::Checkbox { default } => AttrValue::Bool(*default),
            FieldSchema::Select { options, default } => default
                .as_ref()
                .or(options.first())
                .map_or(AttrValue::Null, |s| AttrValue::String(s.clone())),
            FieldSchema::Url | FieldSchema::Image { .. } | FieldSchema::File { .. } => {
                AttrValue::Null
            }
            FieldSchema::Object { fields } => AttrValue::Map(
                fields
                    .iter()
                    .map(|(k, f)| (k.clone(), f.default_value()))
                    .collect(),
            ),
            FieldSchema::Array { .. } => AttrValue::List(Vec::new()),
        }
    }

    /// Check `value` against this schema, substituting the default when it is
    /// absent. On mismatch returns the expected type name.
    pub fn validate(&self, value: Option<AttrValue>) -> Result<AttrValue, &'static str> {
        let value = match value {
            None | Some(AttrValue::Null) => return Ok(self.default_value()),
            Some(value) => value,
        };
        match (self, value) {
            (FieldSchema::Text { .. } | FieldSchema::Url, v @ AttrValue::String(_)) => Ok(v),
            (FieldSchema::Text { .. }, _) => Err("text"),
            (FieldSchema::Url, _) => Err("url"),
            (FieldSchema::Integer { .. }, AttrValue::Number(n)) if n.fract() == 0.0 => {
                Ok(AttrValue::Number(n))
            }
            (FieldSchema::Integer { .. }, _) => Err("integer"),
            (FieldSchema::Number { .. }, v @ AttrValue::Number(_)) => Ok(v),
            (FieldSchema::Number { .. }, _) => Err("number"),
            (FieldSchema::Checkbox { .. }, v @ AttrValue::Bool(_)) => Ok(v),
            (FieldSchema::Checkbox { .. }, _) => Err("checkbox"),
            (FieldSchema::Select { options, .. }, AttrValue::String(s)) if options.contains(&s) => {
                Ok(AttrValue::String(s))
            }
            (FieldSchema::Select { .. }, _) => Err("one of the select options"),
            (FieldSchema::Image { .. } | FieldSchema::File { .. }, v @ AttrValue::String(_)) => {
                Ok(v)
            }
            (FieldSchema::Image { .. } | FieldSchema::File { .. }, _) => Err("file path"),
            (FieldSchema::Object { fields }, AttrValue::Map(mut map)) => {
                let mut out = BTreeMap::new();
                for (name, field) in fields {
                    out.insert(name.clone(), field.validate(map.remove(name))?);
                }
                Ok(AttrValue::Map(out))
            }
            (FieldSchema::Object { .. }, _) => Err("object"),
            (FieldSchema::Array { element }, AttrValue::List(items)) => items
                .into_iter()
                .map(|item| element.validate(Some(item)))
                .collect::<Result<Vec<_>, _>>()
                .map(AttrValue::List),
            (FieldSchema::Array { .. }, _) => Err("array"),
        }
    }
}

/// Validate component props against the component's parameter schema.
///
/// Missing props take their defaults; props the schema does not declare are
/// dropped.
pub fn validate_props(
    component: &str,
    schema: &IndexMap<String, FieldSchema>,
    mut props: BTreeMap<String, AttrValue>,
) -> Result<BTreeMap<String, AttrValue>> {
    let mut out = BTreeMap::new();
    for (name, field) in schema {
        let value = field
            .validate(props.remove(name))
            .map_err(|expected| FieldError::InvalidProp {
                component: component.to_string(),
                field: name.clone(),
                expected,
            })?;
        out.insert(name.clone(), value);
    }
    for unknown in props.keys() {
        log::warn!("Dropping unknown prop {unknown} on component {component}");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn image(directory: &str) -> FieldSchema {
        FieldSchema::Image {
            directory: Some(directory.to_string()),
            public_path: None,
        }
    }

    #[test]
    fn test_collects_nested_directories_in_order() {
        let schema = object(IndexMap::from([
            ("hero".to_string(), image("/a/b/")),
            (
                "gallery".to_string(),
                FieldSchema::Array {
                    element: Box::new(object(IndexMap::from([
                        ("src".to_string(), image("c/d")),
                        ("caption".to_string(), FieldSchema::Url),
                    ]))),
                },
            ),
            (
                "attachment".to_string(),
                FieldSchema::File {
                    directory: Some("./c/d".to_string()),
                },
            ),
            (
                "inline".to_string(),
                FieldSchema::Image {
                    directory: None,
                    public_path: None,
                },
            ),
        ]));

        assert_eq!(collect_directories(&schema), vec!["a/b", "c/d", "c/d"]);
    }

    #[test]
    fn test_validate_fills_defaults() {
        let schema = IndexMap::from([
            (
                "tone".to_string(),
                FieldSchema::Select {
                    options: vec!["note".into(), "warning".into()],
                    default: None,
                },
            ),
            ("open".to_string(), FieldSchema::Checkbox { default: true }),
        ]);

        let props = validate_props("callout", &schema, BTreeMap::new()).unwrap();

        assert_eq!(props.get("tone"), Some(&AttrValue::from("note")));
        assert_eq!(props.get("open"), Some(&AttrValue::Bool(true)));
    }

    #[test]
    fn test_validate_rejects_type_mismatch() {
        let schema = IndexMap::from([("count".to_string(), FieldSchema::Integer { default: None })]);
        let props = BTreeMap::from([("count".to_string(), AttrValue::from(1.5))]);

        let err = validate_props("counter", &schema, props).unwrap_err();

        assert!(matches!(
            err,
            FieldError::InvalidProp { ref field, expected: "integer", .. } if field == "count"
        ));
    }

    #[test]
    fn test_validate_drops_unknown_props() {
        let schema = IndexMap::from([("title".to_string(), FieldSchema::Url)]);
        let props = BTreeMap::from([
            ("title".to_string(), AttrValue::from("https://example.com")),
            ("extra".to_string(), AttrValue::Bool(true)),
        ]);

        let props = validate_props("link", &schema, props).unwrap();

        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_deserializes_from_tagged_toml_shape() {
        let schema: FieldSchema = serde_json::from_value(serde_json::json!({
            "type": "object",
            "fields": {
                "tone": {"type": "select", "options": ["a", "b"], "default": "b"},
                "photo": {"type": "image", "directory": "public/photos"}
            }
        }))
        .unwrap();

        assert_eq!(collect_directories(&schema), vec!["public/photos"]);
        assert_eq!(
            schema.default_value().to_json(),
            Some(serde_json::json!({"tone": "b", "photo": null}))
        );
    }
}
