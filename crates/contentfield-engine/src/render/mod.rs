//! HTML rendering of markup trees for read-only display.
//!
//! Component tags render through a [`MarkdocConfig`] built from the
//! component registry. Tags the config does not know render their children
//! only.

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::{
    markup::{Node, NodeType},
    schema::{ComponentKind, ComponentRegistry},
};

/// How one component tag renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagConfig {
    /// Element name to render.
    pub render: String,
    pub self_closing: bool,
    pub inline: bool,
    /// Attributes copied onto the element, in declaration order.
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkdocConfig {
    pub tags: IndexMap<String, TagConfig>,
}

/// Describe how each registered component renders.
pub fn create_markdoc_config(components: &ComponentRegistry) -> MarkdocConfig {
    let tags = components
        .iter()
        .map(|(name, component)| {
            let tag = TagConfig {
                render: name.clone(),
                self_closing: matches!(component.kind, ComponentKind::Block | ComponentKind::Inline),
                inline: !component.kind.is_block(),
                attributes: component
                    .schema
                    .keys()
                    .filter(|key| {
                        let valid = is_attribute_name(key);
                        if !valid {
                            log::warn!("Not rendering {name}.{key}: not an HTML attribute name");
                        }
                        valid
                    })
                    .cloned()
                    .collect(),
            };
            (name.clone(), tag)
        })
        .collect();
    MarkdocConfig { tags }
}

/// Whether `name` can be written as an HTML attribute name unescaped.
fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| {
            !c.is_control() && !c.is_whitespace() && !matches!(c, '"' | '\'' | '>' | '<' | '/' | '=' | '&')
        })
}

/// Render a markup tree to HTML.
pub fn render_html(node: &Node, config: &MarkdocConfig) -> String {
    let mut out = String::new();
    render(node, config, &mut out);
    out
}

fn render_children(node: &Node, config: &MarkdocConfig, out: &mut String) {
    for child in &node.children {
        render(child, config, out);
    }
}

fn element(name: &str, attrs: &[(&str, String)], node: &Node, config: &MarkdocConfig, out: &mut String) {
    open(name, attrs, out);
    render_children(node, config, out);
    let _ = write!(out, "</{name}>");
}

fn open(name: &str, attrs: &[(&str, String)], out: &mut String) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        let _ = write!(out, " {key}=\"{}\"", encode_double_quoted_attribute(value));
    }
    out.push('>');
}

fn attr_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render(node: &Node, config: &MarkdocConfig, out: &mut String) {
    match node.kind {
        NodeType::Document => render_children(node, config, out),
        NodeType::Paragraph => element("p", &[], node, config, out),
        NodeType::Heading => {
            let level = node.attr_u64("level").unwrap_or(1).clamp(1, 6);
            element(&format!("h{level}"), &[], node, config, out);
        }
        NodeType::Blockquote => element("blockquote", &[], node, config, out),
        NodeType::List => {
            if node.attr_bool("ordered").unwrap_or(false) {
                let attrs: Vec<_> = node
                    .attr_u64("start")
                    .filter(|start| *start != 1)
                    .map(|start| ("start", start.to_string()))
                    .into_iter()
                    .collect();
                element("ol", &attrs, node, config, out);
            } else {
                element("ul", &[], node, config, out);
            }
        }
        NodeType::Item => element("li", &[], node, config, out),
        NodeType::Fence => {
            let language = node.attr_str("language").unwrap_or_default();
            out.push_str("<pre>");
            if language.is_empty() {
                out.push_str("<code>");
            } else {
                open("code", &[("class", format!("language-{language}"))], out);
            }
            out.push_str(&encode_text(node.attr_str("content").unwrap_or_default()));
            out.push_str("</code></pre>");
        }
        NodeType::Hr => out.push_str("<hr>"),
        NodeType::Table => element("table", &[], node, config, out),
        NodeType::Thead => element("thead", &[], node, config, out),
        NodeType::Tbody => element("tbody", &[], node, config, out),
        NodeType::Tr => element("tr", &[], node, config, out),
        NodeType::Th => element("th", &[], node, config, out),
        NodeType::Td => element("td", &[], node, config, out),
        NodeType::Image => {
            let mut attrs = vec![
                ("src", node.attr_str("src").unwrap_or_default().to_string()),
                ("alt", node.attr_str("alt").unwrap_or_default().to_string()),
            ];
            if let Some(title) = node.attr_str("title").filter(|t| !t.is_empty()) {
                attrs.push(("title", title.to_string()));
            }
            open("img", &attrs, out);
        }
        NodeType::Link => {
            let mut attrs = vec![("href", node.attr_str("href").unwrap_or_default().to_string())];
            if let Some(title) = node.attr_str("title").filter(|t| !t.is_empty()) {
                attrs.push(("title", title.to_string()));
            }
            element("a", &attrs, node, config, out);
        }
        NodeType::Strong => element("strong", &[], node, config, out),
        NodeType::Em => element("em", &[], node, config, out),
        NodeType::S => element("s", &[], node, config, out),
        NodeType::Code => {
            out.push_str("<code>");
            out.push_str(&encode_text(node.attr_str("content").unwrap_or_default()));
            out.push_str("</code>");
        }
        NodeType::Text => out.push_str(&encode_text(node.attr_str("content").unwrap_or_default())),
        NodeType::Softbreak => out.push('\n'),
        NodeType::Hardbreak => out.push_str("<br>"),
        NodeType::Tag => render_tag(node, config, out),
        // No variables are supplied when rendering.
        NodeType::Variable => {}
    }
}

fn render_tag(node: &Node, config: &MarkdocConfig, out: &mut String) {
    let Some(tag) = node.tag.as_deref().and_then(|name| config.tags.get(name)) else {
        render_children(node, config, out);
        return;
    };
    let attrs: Vec<(&str, String)> = tag
        .attributes
        .iter()
        .filter_map(|name| {
            node.attributes
                .get(name)
                .filter(|value| !value.is_null())
                .map(|value| (name.as_str(), attr_text(value)))
        })
        .collect();
    if tag.self_closing && node.children.is_empty() {
        out.push('<');
        out.push_str(&tag.render);
        for (key, value) in &attrs {
            let _ = write!(out, " {key}=\"{}\"", encode_double_quoted_attribute(value));
        }
        out.push_str(" />");
    } else {
        element(&tag.render, &attrs, node, config, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        markup::markdoc,
        schema::{ContentComponent, FieldSchema},
    };
    use indexmap::IndexMap;

    fn components() -> ComponentRegistry {
        ComponentRegistry::from([
            (
                "callout".to_string(),
                ContentComponent::wrapper(IndexMap::from([(
                    "tone".to_string(),
                    FieldSchema::Text {
                        default: String::new(),
                        multiline: false,
                    },
                )])),
            ),
            (
                "youtube".to_string(),
                ContentComponent::block(IndexMap::from([(
                    "id".to_string(),
                    FieldSchema::Text {
                        default: String::new(),
                        multiline: false,
                    },
                )])),
            ),
        ])
    }

    fn render_markdoc(src: &str) -> String {
        let tree = markdoc::parse(src).unwrap();
        render_html(&tree, &create_markdoc_config(&components()))
    }

    #[test]
    fn test_config_describes_each_component() {
        let config = create_markdoc_config(&components());
        let callout = &config.tags["callout"];
        assert_eq!(callout.render, "callout");
        assert!(!callout.self_closing);
        assert!(!callout.inline);
        assert_eq!(callout.attributes, vec!["tone".to_string()]);
        assert!(config.tags["youtube"].self_closing);
    }

    #[test]
    fn test_config_skips_invalid_attribute_names() {
        let text = || FieldSchema::Text {
            default: String::new(),
            multiline: false,
        };
        let components = ComponentRegistry::from([(
            "widget".to_string(),
            ContentComponent::block(IndexMap::from([
                ("data-size".to_string(), text()),
                ("x\" onclick=\"alert(1)".to_string(), text()),
                ("a b".to_string(), text()),
                (String::new(), text()),
            ])),
        )]);

        let config = create_markdoc_config(&components);

        assert_eq!(config.tags["widget"].attributes, vec!["data-size".to_string()]);
    }

    #[test]
    fn test_renders_markdown() {
        insta::assert_snapshot!(
            render_markdoc("# Salt & pepper\n\nSome **bold** and `code`.\n"),
            @"<h1>Salt &amp; pepper</h1><p>Some <strong>bold</strong> and <code>code</code>.</p>"
        );
    }

    #[test]
    fn test_renders_known_tags_as_elements() {
        insta::assert_snapshot!(
            render_markdoc("{% callout tone=\"warn\" %}\n\nCareful\n\n{% /callout %}\n\n{% youtube id=\"abc\" /%}\n"),
            @r#"<callout tone="warn"><p>Careful</p></callout><youtube id="abc" />"#
        );
    }

    #[test]
    fn test_unknown_tags_render_children() {
        assert_eq!(
            render_markdoc("{% aside %}\n\nInside\n\n{% /aside %}\n"),
            "<p>Inside</p>"
        );
    }

    #[test]
    fn test_variables_render_nothing() {
        let tree = markdoc::read("Hello {% $name %}\n").unwrap();
        assert_eq!(render_html(&tree, &MarkdocConfig::default()), "<p>Hello </p>");
    }

    #[test]
    fn test_fences_escape_content() {
        assert_eq!(
            render_markdoc("```html\n<b>\n```\n"),
            "<pre><code class=\"language-html\">&lt;b&gt;\n</code></pre>"
        );
    }
}
