//! Markdown formatter.
//!
//! Output is normalized to ATX headings and fenced code, with literal
//! punctuation backslash-escaped, and parses back to a tree with the same text.

use indextree::NodeId;

use crate::ast::{Alignment, BlockRefSubtype, LinkType, NodeKind, SuperBlockLayout};
use crate::token::is_ascii_punct;
use crate::tree::Tree;

/// Format a tree back to Markdown
pub fn format_markdown(tree: &Tree) -> String {
    let mut out = blocks(tree, tree.root(), false);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Children of a container, separated by blank lines unless `tight`
fn blocks(tree: &Tree, parent: NodeId, tight: bool) -> String {
    let parts: Vec<String> = tree
        .children(parent)
        .map(|child| block(tree, child))
        .filter(|part| !part.is_empty())
        .collect();
    parts.join(if tight { "" } else { "\n" })
}

/// Prefix the first line with `first` and the rest with `rest`, leaving blank lines bare
fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for (i, line) in text.lines().enumerate() {
        let prefix = if i == 0 { first } else { rest };
        if line.is_empty() {
            out.push_str(prefix.trim_end());
        } else {
            out.push_str(prefix);
            out.push_str(line);
        }
        out.push('\n');
    }
    if out.is_empty() {
        out.push_str(first.trim_end());
        out.push('\n');
    }
    out
}

fn fence_for(content: &str, ch: char) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == ch {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    ch.to_string().repeat((longest + 1).max(3))
}

fn block(tree: &Tree, id: NodeId) -> String {
    let node = tree.node(id);
    match &node.kind {
        NodeKind::Document => blocks(tree, id, false),
        NodeKind::Paragraph => format!("{}\n", inlines(tree, id)),
        NodeKind::Heading(data) => {
            format!("{} {}\n", "#".repeat(data.level as usize), inlines(tree, id))
        }
        NodeKind::ThematicBreak => "***\n".to_string(),
        NodeKind::Blockquote => prefix_lines(&blocks(tree, id, false), "> ", "> "),
        NodeKind::Callout(data) => {
            let mut header = format!("[!{}]", data.kind);
            if !data.title.is_empty() {
                header.push(' ');
                header.push_str(&data.title);
            }
            let body = blocks(tree, id, false);
            let text = if body.is_empty() {
                format!("{}\n", header)
            } else {
                format!("{}\n{}", header, body)
            };
            prefix_lines(&text, "> ", "> ")
        }
        NodeKind::List(data) => {
            let mut out = String::new();
            for (i, item) in tree.children(id).enumerate() {
                if i > 0 && !data.tight {
                    out.push('\n');
                }
                let marker = if data.is_ordered() {
                    format!(
                        "{}{}",
                        data.start as usize + i,
                        data.delimiter.unwrap_or('.')
                    )
                } else {
                    data.bullet_char.unwrap_or('-').to_string()
                };
                let mut content = blocks(tree, item, data.tight);
                if let NodeKind::ListItem(item_data) = tree.kind(item)
                    && item_data.kind == crate::ast::ListKind::Task
                {
                    let check = if item_data.checked { "[x] " } else { "[ ] " };
                    content.insert_str(0, check);
                }
                let indent = " ".repeat(marker.len() + 1);
                out.push_str(&prefix_lines(&content, &format!("{} ", marker), &indent));
            }
            out
        }
        NodeKind::ListItem(_) => blocks(tree, id, true),
        NodeKind::CodeBlock(data) => {
            let ch = if data.info.contains('`') { '~' } else { '`' };
            let fence = fence_for(&data.literal, ch);
            let mut literal = data.literal.clone();
            if !literal.is_empty() && !literal.ends_with('\n') {
                literal.push('\n');
            }
            format!("{}{}\n{}{}\n", fence, data.info, literal, fence)
        }
        NodeKind::HtmlBlock { .. } => format!("{}\n", node.tokens.trim_end_matches('\n')),
        NodeKind::MathBlock { .. } => format!("$$\n{}\n$$\n", node.tokens),
        NodeKind::YamlFrontMatter => format!("---\n{}\n---\n", node.tokens),
        NodeKind::GitConflict => format!("<<<<<<<\n{}\n>>>>>>>\n", node.tokens),
        NodeKind::CustomBlock(data) => {
            let mut body = node.tokens.clone();
            if !body.is_empty() && !body.ends_with('\n') {
                body.push('\n');
            }
            format!(";;;{}\n{};;;\n", data.info, body)
        }
        NodeKind::SuperBlock(layout) => {
            let layout = match layout {
                SuperBlockLayout::Default => "",
                SuperBlockLayout::Row => "row",
                SuperBlockLayout::Col => "col",
            };
            format!("{{{{{{{}\n{}}}}}}}\n", layout, blocks(tree, id, false))
        }
        NodeKind::Toc => "[toc]\n".to_string(),
        NodeKind::KramdownBlockIal => format!("{}\n", node.tokens),
        NodeKind::FootnotesDefBlock => blocks(tree, id, false),
        NodeKind::FootnotesDef { label } => {
            let body = blocks(tree, id, false);
            prefix_lines(&body, &format!("[^{}]: ", label), "    ")
        }
        NodeKind::Table(aligns) => table(tree, id, aligns),
        // Inline or table-internal kinds never appear at block level
        _ => String::new(),
    }
}

fn table_row(tree: &Tree, row: NodeId) -> String {
    let cells: Vec<String> = tree.children(row).map(|cell| inlines(tree, cell)).collect();
    format!("| {} |\n", cells.join(" | "))
}

fn table(tree: &Tree, id: NodeId, aligns: &[Alignment]) -> String {
    let mut out = String::new();
    for child in tree.children(id) {
        match tree.kind(child) {
            NodeKind::TableHead => {
                if let Some(row) = tree.first_child(child) {
                    out.push_str(&table_row(tree, row));
                }
                let delimiters: Vec<&str> = aligns
                    .iter()
                    .map(|align| match align {
                        Alignment::None => "---",
                        Alignment::Left => ":--",
                        Alignment::Right => "--:",
                        Alignment::Center => ":-:",
                    })
                    .collect();
                out.push_str(&format!("| {} |\n", delimiters.join(" | ")));
            }
            _ => out.push_str(&table_row(tree, child)),
        }
    }
    out
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() && is_ascii_punct(c as u8) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn code_span(content: &str) -> String {
    let fence = {
        let mut longest = 0;
        let mut run = 0;
        for c in content.chars() {
            if c == '`' {
                run += 1;
                longest = longest.max(run);
            } else {
                run = 0;
            }
        }
        "`".repeat(longest + 1)
    };
    let pad = content.starts_with('`')
        || content.ends_with('`')
        || (content.starts_with(' ') && content.ends_with(' ') && content.bytes().any(|b| b != b' '));
    if pad {
        format!("{0} {1} {0}", fence, content)
    } else {
        format!("{0}{1}{0}", fence, content)
    }
}

fn link_tail(destination: &str, title: &str) -> String {
    let destination = if destination.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", destination.replace('<', "%3C").replace('>', "%3E"))
    } else {
        destination.to_string()
    };
    if title.is_empty() {
        format!("({})", destination)
    } else {
        let title = title.replace('\\', "\\\\").replace('"', "\\\"");
        format!("({} \"{}\")", destination, title)
    }
}

fn inlines(tree: &Tree, parent: NodeId) -> String {
    let mut out = String::new();
    for child in tree.children(parent) {
        inline(tree, child, &mut out);
    }
    out
}

fn marker_or(tree: &Tree, id: NodeId, open: bool, default: &str) -> String {
    let marker = if open {
        tree.first_child(id)
    } else {
        tree.last_child(id)
    };
    marker
        .filter(|&m| tree.kind(m).is_marker())
        .map(|m| tree.tokens(m).to_string())
        .unwrap_or_else(|| default.to_string())
}

fn inline(tree: &Tree, id: NodeId, out: &mut String) {
    let node = tree.node(id);
    match &node.kind {
        NodeKind::Text => out.push_str(&escape_text(&node.tokens)),
        NodeKind::SoftBreak => out.push('\n'),
        NodeKind::HardBreak => out.push_str("\\\n"),
        NodeKind::CodeSpan { .. } => out.push_str(&code_span(&node.tokens)),
        NodeKind::Emphasis
        | NodeKind::Strong
        | NodeKind::Strikethrough
        | NodeKind::Mark
        | NodeKind::Sup
        | NodeKind::Sub
        | NodeKind::Tag => {
            let default = match &node.kind {
                NodeKind::Emphasis => "*",
                NodeKind::Strong => "**",
                NodeKind::Strikethrough => "~~",
                NodeKind::Mark => "==",
                NodeKind::Sup => "^",
                NodeKind::Sub => "~",
                _ => "#",
            };
            out.push_str(&marker_or(tree, id, true, default));
            out.push_str(&inlines(tree, id));
            out.push_str(&marker_or(tree, id, false, default));
        }
        NodeKind::OpenMarker | NodeKind::CloseMarker => {}
        NodeKind::Link(data) if data.link_type == LinkType::Autolink => {
            let text = tree.text(id);
            if data.destination == text || data.destination == format!("mailto:{}", text) {
                out.push_str(&format!("<{}>", text));
            } else {
                out.push_str(&text);
            }
        }
        NodeKind::Link(data) => {
            out.push('[');
            out.push_str(&inlines(tree, id));
            out.push(']');
            out.push_str(&link_tail(&data.destination, &data.title));
        }
        NodeKind::Image(data) => {
            out.push_str("![");
            out.push_str(&inlines(tree, id));
            out.push(']');
            out.push_str(&link_tail(&data.destination, &data.title));
        }
        NodeKind::InlineHtml | NodeKind::Emoji(_) | NodeKind::KramdownSpanIal => {
            out.push_str(&node.tokens)
        }
        NodeKind::InlineMath => out.push_str(&format!("${}$", node.tokens)),
        NodeKind::FootnotesRef(footnote) => out.push_str(&format!("[^{}]", footnote.label)),
        NodeKind::BlockRef(block_ref) => match (&block_ref.text, block_ref.subtype) {
            (Some(text), BlockRefSubtype::Static) => {
                out.push_str(&format!("(({} \"{}\"))", block_ref.id, text))
            }
            (Some(text), BlockRefSubtype::Dynamic) => {
                out.push_str(&format!("(({} '{}'))", block_ref.id, text))
            }
            (None, _) => out.push_str(&format!("(({}))", block_ref.id)),
        },
        NodeKind::TextMark(mark) => {
            out.push_str(&format!(
                "<span data-type=\"{}\">{}</span>",
                mark.types.join(" "),
                crate::renderer::escape_html(&node.tokens)
            ));
        }
        _ => {}
    }
}
