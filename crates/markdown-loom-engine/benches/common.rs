// Shared by several bench targets; each compiles this module separately.
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with *some* **content** and `code`.\n\n- Bullet point\n  - Nested item\n- Another [link](/url \"title\")\n\n> Quoted text\n> over two lines\n\n```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n";
    base.repeat(size)
}

/// Inline-heavy paragraphs that exercise the delimiter stack.
#[allow(dead_code)]
pub fn generate_inline_heavy(paragraphs: usize) -> String {
    let mut content = String::new();
    for i in 0..paragraphs {
        content.push_str(&format!(
            "Para {i} with *em*, __strong__, ***both***, `code`, <http://x.y/{i}>, \
             [ref][r{i}] and an unclosed *run plus _mixed_ **markers*.\n\n[r{i}]: /target/{i}\n\n"
        ));
    }
    content
}
