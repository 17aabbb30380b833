use super::Dialect;
use crate::{Result, markup, markup::mdx};

/// MDX (`.mdx`): Markdown with JSX components. The reader passes text
/// through untouched and there is no collaboration bridge.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mdx;

impl Dialect for Mdx {
    const NAME: &'static str = "MDX";
    const CONTENT_EXTENSION: &'static str = ".mdx";

    type ReaderOutput = String;

    fn is_component_name(name: &str) -> bool {
        mdx::is_component_name(name)
    }

    fn parse_markup(content: &str) -> Result<markup::Node> {
        mdx::parse(content)
    }

    fn format_markup(doc: &markup::Node) -> String {
        mdx::format(doc)
    }

    fn read(text: String) -> Result<String> {
        Ok(text)
    }
}
