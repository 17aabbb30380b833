// Benchmark helpers - Rust's dead code analysis doesn't understand that
// these are used by benchmark files in the same directory

#[allow(dead_code)]
pub fn generate_markdoc_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with **bold**, *italic* and `code`.\n\n- Bullet point\n  - Nested item\n- Another item\n\n{% callout tone=\"note\" %}\n\nInside a callout with a [link](/somewhere).\n\n{% /callout %}\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_mdx_content(size: usize) -> String {
    let base = "# Title\n\nParagraph with **bold** and *italic*.\n\n<Callout tone=\"note\">\n\nInside a callout.\n\n</Callout>\n\n| a | b |\n| --- | --- |\n| 1 | 2 |\n\n";
    base.repeat(size)
}
