//! Dialect tags: lexing hooks, the placeholder pre-pass and nesting.
//!
//! Tags are lifted out of the text before Markdown parsing so that
//! `pulldown-cmark` never sees them. Each tag becomes a placeholder made of
//! two private-use characters around its index, which survives Markdown
//! parsing as ordinary text and is swapped back for the tag afterwards. The
//! two characters are picked per document from those the source does not
//! use, so text can never be mistaken for a placeholder.

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::{Range, RangeInclusive},
};

use pulldown_cmark::{Event, Parser, Tag};
use serde_json::Value;

use super::{Node, cursor::Cursor};
use crate::{FieldError, Result};

/// Private-use planes, in the order delimiters are picked from.
const PRIVATE_USE: [RangeInclusive<u32>; 3] = [
    0xE000..=0xF8FF,
    0xF0000..=0xFFFFD,
    0x100000..=0x10FFFD,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    SelfClosing,
    /// A variable printed in place (`{% $name %}`); the path is held in the
    /// `path` attribute.
    Variable,
}

/// A tag as written, before nesting.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTag {
    pub name: String,
    pub attributes: BTreeMap<String, Value>,
    pub kind: TagKind,
    /// Byte offset of the tag in the source.
    pub offset: usize,
}

/// How unbalanced tags are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// Unbalanced or malformed tags are errors.
    Strict,
    /// Malformed tags stay text; unbalanced ones become tag nodes carrying
    /// an error.
    Lenient,
}

/// How one dialect writes tags.
pub trait TagSyntax {
    /// Byte that starts every tag.
    const OPENER: u8;

    /// Characters that must be backslash-escaped in text, beyond the ones
    /// every Markdown printer escapes.
    const ESCAPED: &'static [char];

    /// Lex a tag starting at `cur`. `Ok(None)` means the text there is not a
    /// tag and should be left alone; the cursor position is then unspecified.
    fn lex(cur: &mut Cursor<'_>) -> Result<Option<RawTag>>;

    fn write_open(
        out: &mut String,
        name: &str,
        attributes: &BTreeMap<String, Value>,
        self_closing: bool,
    );

    fn write_close(out: &mut String, name: &str);

    fn write_variable(out: &mut String, path: &[&str]);
}

/// The characters around placeholder indices in one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub start: char,
    pub end: char,
}

impl Delimiters {
    /// The first two private-use characters absent from `src`.
    pub fn unused_in(src: &str) -> Result<Self> {
        let used: BTreeSet<char> = src.chars().filter(|c| is_private_use(*c)).collect();
        let mut free = PRIVATE_USE
            .into_iter()
            .flatten()
            .filter_map(char::from_u32)
            .filter(|c| !used.contains(c));
        match (free.next(), free.next()) {
            (Some(start), Some(end)) => Ok(Self { start, end }),
            _ => Err(FieldError::syntax(0, "no private-use characters left for tag placeholders")),
        }
    }
}

fn is_private_use(c: char) -> bool {
    PRIVATE_USE.iter().any(|range| range.contains(&u32::from(c)))
}

/// Text with its tags swapped for placeholders.
#[derive(Debug)]
pub struct Extracted {
    pub text: String,
    /// Tags in source order; placeholder `n` stands for `tags[n]`.
    pub tags: Vec<RawTag>,
    pub delimiters: Delimiters,
}

/// Replace every tag outside code with a placeholder.
pub fn extract<S: TagSyntax>(src: &str, mode: Nesting) -> Result<Extracted> {
    let delimiters = Delimiters::unused_in(src)?;
    let code = code_ranges(src);
    let bytes = src.as_bytes();
    let mut text = String::with_capacity(src.len());
    let mut tags = Vec::new();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == S::OPENER && !is_escaped(bytes, i) && !code.iter().any(|r| r.contains(&i)) {
            let mut cur = Cursor::new(src, i);
            match S::lex(&mut cur) {
                Ok(Some(tag)) => {
                    text.push_str(&src[copied..i]);
                    text.push(delimiters.start);
                    text.push_str(&tags.len().to_string());
                    text.push(delimiters.end);
                    tags.push(tag);
                    i = cur.i;
                    copied = i;
                    continue;
                }
                Ok(None) => {}
                Err(err) if mode == Nesting::Lenient => {
                    log::debug!("Keeping malformed tag as text: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        i += 1;
    }
    text.push_str(&src[copied..]);
    Ok(Extracted {
        text,
        tags,
        delimiters,
    })
}

/// Byte ranges of code spans and code blocks, where tags are literal text.
fn code_ranges(src: &str) -> Vec<Range<usize>> {
    Parser::new_ext(src, super::tree::options())
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::CodeBlock(_)) | Event::Code(_) => Some(range),
            _ => None,
        })
        .collect()
}

fn is_escaped(bytes: &[u8], at: usize) -> bool {
    let backslashes = bytes[..at].iter().rev().take_while(|&&b| b == b'\\').count();
    backslashes % 2 == 1
}

/// A piece of text after placeholder splitting.
#[derive(Debug, PartialEq)]
pub enum Piece<'a> {
    Text(&'a str),
    Tag(usize),
}

/// Split text at placeholders. A start delimiter not followed by digits and
/// an end delimiter is kept as text.
pub fn split_placeholders(text: &str, delimiters: Delimiters) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut copied = 0;
    let mut from = 0;
    while let Some(found) = text[from..].find(delimiters.start) {
        let start = from + found;
        let digits = start + delimiters.start.len_utf8();
        from = digits;
        let Some(len) = text[digits..].find(delimiters.end) else {
            break;
        };
        let number = &text[digits..digits + len];
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(index) = number.parse() else {
            continue;
        };
        if start > copied {
            pieces.push(Piece::Text(&text[copied..start]));
        }
        pieces.push(Piece::Tag(index));
        from = digits + len + delimiters.end.len_utf8();
        copied = from;
    }
    if copied < text.len() {
        pieces.push(Piece::Text(&text[copied..]));
    }
    pieces
}

/// A sibling that is either a finished node or a tag awaiting nesting.
#[derive(Debug, Clone)]
pub enum Item {
    Node(Node),
    Tag(RawTag),
}

type OpenTags = Vec<(RawTag, Vec<Node>)>;

/// Pair opening and closing tags among siblings, moving whatever sits
/// between them into the tag's children.
pub fn nest(items: Vec<Item>, inline: bool, mode: Nesting) -> Result<Vec<Node>> {
    let mut root = Vec::new();
    let mut open: OpenTags = Vec::new();

    for item in items {
        let node = match item {
            Item::Node(node) => node,
            Item::Tag(tag) => match tag.kind {
                TagKind::Open => {
                    open.push((tag, Vec::new()));
                    continue;
                }
                TagKind::SelfClosing => Node::tag(tag.name, tag.attributes, Vec::new(), inline),
                TagKind::Variable => {
                    let mut node = Node::new(super::NodeType::Variable);
                    node.attributes = tag.attributes;
                    node
                }
                TagKind::Close => close(&mut open, tag, inline, mode)?,
            },
        };
        match open.last_mut() {
            Some((_, children)) => children.push(node),
            None => root.push(node),
        }
    }

    while let Some((start, children)) = open.pop() {
        if mode == Nesting::Strict {
            return Err(FieldError::UnclosedTag(start.name));
        }
        let node = unclosed(start, children, inline);
        match open.last_mut() {
            Some((_, parent)) => parent.push(node),
            None => root.push(node),
        }
    }
    Ok(root)
}

fn close(open: &mut OpenTags, tag: RawTag, inline: bool, mode: Nesting) -> Result<Node> {
    let matching = open.iter().rposition(|(start, _)| start.name == tag.name);

    if mode == Nesting::Strict {
        return match open.pop() {
            Some((start, children)) if matching == Some(open.len()) => {
                Ok(Node::tag(start.name, start.attributes, children, inline))
            }
            Some((start, _)) => Err(FieldError::UnclosedTag(start.name)),
            None => Err(FieldError::UnexpectedClosingTag(tag.name)),
        };
    }

    let Some(at) = matching else {
        let message = format!("Unexpected closing tag: {}", tag.name);
        return Ok(Node::tag(tag.name, tag.attributes, Vec::new(), inline).with_error(message));
    };
    while open.len() > at + 1 {
        if let Some((start, children)) = open.pop() {
            let node = unclosed(start, children, inline);
            if let Some((_, parent)) = open.last_mut() {
                parent.push(node);
            }
        }
    }
    Ok(match open.pop() {
        Some((start, children)) => Node::tag(start.name, start.attributes, children, inline),
        None => Node::tag(tag.name, tag.attributes, Vec::new(), inline),
    })
}

fn unclosed(start: RawTag, children: Vec<Node>, inline: bool) -> Node {
    let message = format!("Unclosed tag: {}", start.name);
    Node::tag(start.name, start.attributes, children, inline).with_error(message)
}
