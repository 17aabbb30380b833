//! Printing markup trees as Markdown text with dialect tags.
//!
//! Blocks are separated by a blank line and the document ends with a
//! newline. Output re-parses to the same tree, not to the same bytes as the
//! original input.

use super::{Node, NodeType, tags::TagSyntax};

/// Characters escaped in text by every dialect.
const ALWAYS_ESCAPED: &[char] = &['\\', '`', '*', '_', '[', ']', '<', '~', '&'];

/// Characters escaped only at the start of a line.
const LINE_START_ESCAPED: &[char] = &['#', '>', '-', '+', '='];

pub fn print<S: TagSyntax>(doc: &Node) -> String {
    let mut out = blocks::<S>(&doc.children);
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn blocks<S: TagSyntax>(nodes: &[Node]) -> String {
    blocks_joined::<S>(nodes, "\n\n")
}

fn blocks_joined<S: TagSyntax>(nodes: &[Node], separator: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    // Adjacent lists of one kind would merge on re-parse, so alternate markers.
    let mut last_list: Option<(bool, bool)> = None;
    for node in nodes {
        let (text, list) = if node.kind == NodeType::List {
            let ordered = node.attr_bool("ordered").unwrap_or(false);
            let alternate = matches!(last_list, Some((o, alt)) if o == ordered && !alt);
            (list::<S>(node, ordered, alternate), Some((ordered, alternate)))
        } else {
            (block::<S>(node), None)
        };
        if !text.is_empty() {
            parts.push(text);
            last_list = list;
        }
    }
    parts.join(separator)
}

fn block<S: TagSyntax>(node: &Node) -> String {
    match node.kind {
        NodeType::Document | NodeType::Item => blocks::<S>(&node.children),
        NodeType::Paragraph => inline::<S>(&node.children),
        NodeType::Heading => {
            let level = node.attr_u64("level").unwrap_or(1).clamp(1, 6) as usize;
            let text = inline::<S>(&node.children);
            if text.is_empty() {
                "#".repeat(level)
            } else {
                format!("{} {text}", "#".repeat(level))
            }
        }
        NodeType::Blockquote => {
            let body = blocks::<S>(&node.children);
            prefix_lines(&body, "> ", ">")
        }
        NodeType::List => list::<S>(node, node.attr_bool("ordered").unwrap_or(false), false),
        NodeType::Fence => fence(node),
        NodeType::Hr => "---".to_string(),
        NodeType::Table => table::<S>(node),
        NodeType::Tag => {
            let name = node.tag.as_deref().unwrap_or_default();
            let body = blocks::<S>(&node.children);
            let mut out = String::new();
            if body.is_empty() {
                S::write_open(&mut out, name, &node.attributes, true);
            } else {
                S::write_open(&mut out, name, &node.attributes, false);
                out.push_str("\n\n");
                out.push_str(&body);
                out.push_str("\n\n");
                S::write_close(&mut out, name);
            }
            out
        }
        _ => inline::<S>(std::slice::from_ref(node)),
    }
}

fn prefix_lines(text: &str, prefix: &str, blank: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                blank.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A list prints tight when no item needs a blank line to keep its blocks
/// apart: each item is at most a leading paragraph followed by lists.
fn is_tight(list: &Node) -> bool {
    list.children.iter().all(|item| {
        item.children
            .iter()
            .enumerate()
            .all(|(i, child)| match child.kind {
                NodeType::Paragraph => i == 0,
                NodeType::List => true,
                _ => false,
            })
    })
}

fn list<S: TagSyntax>(node: &Node, ordered: bool, alternate: bool) -> String {
    let start = node.attr_u64("start").unwrap_or(1);
    let tight = is_tight(node);
    let separator = if tight { "\n" } else { "\n\n" };
    node.children
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = if ordered {
                format!("{}{}", start + i as u64, if alternate { ')' } else { '.' })
            } else {
                (if alternate { "*" } else { "-" }).to_string()
            };
            let body = blocks_joined::<S>(&item.children, separator);
            if body.is_empty() {
                return marker;
            }
            let indent = " ".repeat(marker.len() + 1);
            let mut lines = body.lines();
            let mut out = format!("{marker} {}", lines.next().unwrap_or_default());
            for line in lines {
                out.push('\n');
                if !line.is_empty() {
                    out.push_str(&indent);
                    out.push_str(line);
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn longest_run(text: &str, c: char) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for ch in text.chars() {
        if ch == c {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

fn fence(node: &Node) -> String {
    let content = node.content();
    let ticks = "`".repeat((longest_run(content, '`') + 1).max(3));
    let language = node.attr_str("language").unwrap_or_default();
    let mut out = format!("{ticks}{language}\n{content}");
    if !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&ticks);
    out
}

fn table<S: TagSyntax>(node: &Node) -> String {
    let rows: Vec<Vec<String>> = node
        .children
        .iter()
        .flat_map(|section| &section.children)
        .map(|row| {
            row.children
                .iter()
                .map(|cell| {
                    inline::<S>(&cell.children)
                        .replace('|', "\\|")
                        .replace('\n', " ")
                })
                .collect()
        })
        .collect();
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let line = |cells: &[String]| {
        let mut padded: Vec<&str> = cells.iter().map(String::as_str).collect();
        padded.resize(columns, "");
        format!("| {} |", padded.join(" | "))
    };
    let mut lines = vec![line(&rows[0]), line(&vec!["---".to_string(); columns])];
    lines.extend(rows[1..].iter().map(|row| line(row)));
    lines.join("\n")
}

fn inline<S: TagSyntax>(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        inline_node::<S>(node, &mut out);
    }
    out
}

fn inline_node<S: TagSyntax>(node: &Node, out: &mut String) {
    let wrap = |delimiter: &str, out: &mut String| {
        out.push_str(delimiter);
        for child in &node.children {
            inline_node::<S>(child, out);
        }
        out.push_str(delimiter);
    };
    match node.kind {
        NodeType::Text => escape::<S>(node.content(), out),
        NodeType::Softbreak => out.push('\n'),
        NodeType::Hardbreak => out.push_str("\\\n"),
        NodeType::Strong => wrap("**", out),
        NodeType::Em => wrap("*", out),
        NodeType::S => wrap("~~", out),
        NodeType::Code => code_span(node.content(), out),
        NodeType::Link => {
            out.push('[');
            for child in &node.children {
                inline_node::<S>(child, out);
            }
            out.push_str("](");
            destination(node.attr_str("href").unwrap_or_default(), out);
            title(node.attr_str("title").unwrap_or_default(), out);
            out.push(')');
        }
        NodeType::Image => {
            out.push_str("![");
            escape::<S>(node.attr_str("alt").unwrap_or_default(), out);
            out.push_str("](");
            destination(node.attr_str("src").unwrap_or_default(), out);
            title(node.attr_str("title").unwrap_or_default(), out);
            out.push(')');
        }
        NodeType::Variable => S::write_variable(out, &node.variable_path()),
        NodeType::Tag => {
            let name = node.tag.as_deref().unwrap_or_default();
            if node.children.is_empty() {
                S::write_open(out, name, &node.attributes, true);
            } else {
                S::write_open(out, name, &node.attributes, false);
                for child in &node.children {
                    inline_node::<S>(child, out);
                }
                S::write_close(out, name);
            }
        }
        _ => {
            for child in &node.children {
                inline_node::<S>(child, out);
            }
        }
    }
}

fn escape<S: TagSyntax>(text: &str, out: &mut String) {
    let mut line_start = out.is_empty() || out.ends_with('\n');
    let mut leading_digits = false;
    for c in text.chars() {
        let escaped = if line_start {
            LINE_START_ESCAPED.contains(&c)
        } else {
            leading_digits && matches!(c, '.' | ')')
        } || ALWAYS_ESCAPED.contains(&c)
            || S::ESCAPED.contains(&c);
        leading_digits = (line_start || leading_digits) && c.is_ascii_digit();
        if escaped {
            out.push('\\');
        }
        out.push(c);
        line_start = c == '\n';
    }
}

fn code_span(content: &str, out: &mut String) {
    if content.is_empty() {
        return;
    }
    let ticks = "`".repeat(longest_run(content, '`') + 1);
    let pad = content.starts_with('`')
        || content.ends_with('`')
        || (content.starts_with(' ') && content.ends_with(' ') && !content.trim().is_empty());
    out.push_str(&ticks);
    if pad {
        out.push(' ');
    }
    out.push_str(content);
    if pad {
        out.push(' ');
    }
    out.push_str(&ticks);
}

fn destination(url: &str, out: &mut String) {
    if url.is_empty() || url.contains([' ', '(', ')', '<', '>']) {
        out.push('<');
        out.push_str(&url.replace('<', "%3C").replace('>', "%3E"));
        out.push('>');
    } else {
        out.push_str(url);
    }
}

fn title(title: &str, out: &mut String) {
    if !title.is_empty() {
        out.push_str(" \"");
        out.push_str(&title.replace('\\', "\\\\").replace('"', "\\\""));
        out.push('"');
    }
}
