//! Passes over the finished inline tree

use std::collections::HashSet;

use indextree::NodeId;
use log::{debug, trace};

use super::{Document, autolink, emoji, ial};
use crate::ast::{EmojiData, HeadingData, Node, NodeKind};
use crate::tree::Tree;

pub(crate) fn run(doc: &mut Document) {
    let options = doc.options;
    if options.kramdown_span_ial {
        span_ial(&mut doc.tree);
    }
    if options.gfm_autolink {
        autolink::link_bare_urls(&mut doc.tree, options);
    }
    if options.emoji {
        emojify(doc);
    }
    if options.auto_space {
        auto_space(&mut doc.tree);
    }
    if options.footnotes {
        gather_footnotes(&mut doc.tree);
    }
    if options.auto_heading_id {
        heading_ids(&mut doc.tree);
    }
}

fn closed(tree: &mut Tree, node: Node) -> NodeId {
    let mut node = node;
    node.open = false;
    tree.new_node_with(node)
}

/// Inline kinds a trailing `{: ...}` may decorate
fn takes_span_ial(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Emphasis
            | NodeKind::Strong
            | NodeKind::CodeSpan { .. }
            | NodeKind::Strikethrough
            | NodeKind::Tag
            | NodeKind::Mark
            | NodeKind::Image(_)
    )
}

fn span_ial(tree: &mut Tree) {
    let root = tree.root();
    let targets = tree.collect(root, |n| takes_span_ial(&n.kind));
    for target in targets {
        let Some(next) = tree.next_sibling(target) else {
            continue;
        };
        if !matches!(tree.kind(next), NodeKind::Text) {
            continue;
        }
        let Some((entries, consumed)) = ial::parse_ial(tree.tokens(next)) else {
            continue;
        };
        let raw = tree.tokens(next)[..consumed].to_string();
        let mut node = Node::with_tokens(NodeKind::KramdownSpanIal, raw);
        node.ial = entries;
        let list = closed(tree, node);
        tree.insert_after(target, list);
        let rest = tree.tokens(next)[consumed..].to_string();
        if rest.is_empty() {
            tree.unlink(next);
        } else {
            tree.node_mut(next).tokens = rest;
        }
    }
}

fn is_alias_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'+' | b'-')
}

/// Next `:alias:` in `text` at or after `from` that resolves, as (start, end, data)
fn next_emoji(doc: &Document, text: &str, from: usize) -> Option<(usize, usize, EmojiData)> {
    let bytes = text.as_bytes();
    let mut i = from;
    while let Some(offset) = text[i..].find(':') {
        let start = i + offset;
        let mut end = start + 1;
        while end < bytes.len() && is_alias_char(bytes[end]) {
            end += 1;
        }
        if end > start + 1 && end < bytes.len() && bytes[end] == b':' {
            let alias = &text[start + 1..end];
            let unicode = doc
                .options
                .emoji_aliases
                .get(alias)
                .map(String::as_str)
                .or_else(|| emoji::lookup_emoji(alias));
            if let Some(unicode) = unicode {
                let data = EmojiData {
                    alias: alias.to_string(),
                    unicode: unicode.to_string(),
                };
                return Some((start, end + 1, data));
            }
            // The closing colon may open the next alias
            i = end;
        } else {
            i = start + 1;
        }
    }
    None
}

fn emojify(doc: &mut Document) {
    let root = doc.tree.root();
    let texts = doc.tree.collect(root, |n| matches!(n.kind, NodeKind::Text));
    for text_node in texts {
        let text = doc.tree.tokens(text_node).to_string();
        if !text.contains(':') {
            continue;
        }
        let mut anchor = text_node;
        let mut last = 0;
        let mut from = 0;
        let mut replaced = false;
        while let Some((start, end, data)) = next_emoji(doc, &text, from) {
            replaced = true;
            if start > last {
                let before = closed(&mut doc.tree, Node::with_tokens(NodeKind::Text, &text[last..start]));
                doc.tree.insert_after(anchor, before);
                anchor = before;
            }
            let emoji = closed(
                &mut doc.tree,
                Node::with_tokens(NodeKind::Emoji(data), &text[start..end]),
            );
            doc.tree.insert_after(anchor, emoji);
            anchor = emoji;
            last = end;
            from = end;
        }
        if !replaced {
            continue;
        }
        if last < text.len() {
            let after = closed(&mut doc.tree, Node::with_tokens(NodeKind::Text, &text[last..]));
            doc.tree.insert_after(anchor, after);
        }
        doc.tree.unlink(text_node);
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
    )
}

/// Insert a space wherever a CJK character touches an ASCII letter or digit
pub(crate) fn space_cjk(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if let Some(p) = prev
            && ((is_cjk(p) && c.is_ascii_alphanumeric()) || (p.is_ascii_alphanumeric() && is_cjk(c)))
        {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn auto_space(tree: &mut Tree) {
    let root = tree.root();
    let texts = tree.collect(root, |n| matches!(n.kind, NodeKind::Text));
    for text in texts {
        let spaced = space_cjk(tree.tokens(text));
        tree.node_mut(text).tokens = spaced;
    }
}

/// Move every footnote definition into one block at the end of the document
fn gather_footnotes(tree: &mut Tree) {
    let root = tree.root();
    let defs = tree.collect(root, |n| matches!(n.kind, NodeKind::FootnotesDef { .. }));
    if defs.is_empty() {
        return;
    }
    debug!("gathering {} footnote definitions", defs.len());
    let block = closed(tree, Node::new(NodeKind::FootnotesDefBlock));
    for def in defs {
        tree.append_child(block, def);
    }
    tree.append_child(root, block);
}

/// GitHub-style anchor: lowercase, spaces to `-`, other punctuation dropped
pub(crate) fn slugify(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

fn heading_ids(tree: &mut Tree) {
    let root = tree.root();
    let headings = tree.collect(root, |n| matches!(n.kind, NodeKind::Heading(_)));
    let mut seen: HashSet<String> = headings
        .iter()
        .filter_map(|&h| match tree.kind(h) {
            NodeKind::Heading(HeadingData { id: Some(id), .. }) => Some(id.clone()),
            _ => None,
        })
        .collect();

    for heading in headings {
        let NodeKind::Heading(data) = tree.kind(heading) else {
            continue;
        };
        if data.id.is_some() {
            continue;
        }
        let mut data = data.clone();
        let base = slugify(&tree.text(heading));
        let mut slug = base.clone();
        let mut n = 0;
        while seen.contains(&slug) {
            n += 1;
            slug = format!("{}-{}", base, n);
        }
        trace!("heading on line {} gets id {}", tree.node(heading).line, slug);
        seen.insert(slug.clone());
        data.id = Some(slug);
        tree.reclassify(heading, NodeKind::Heading(data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use pretty_assertions::assert_eq;

    fn parse(input: &str, options: &Options) -> Tree {
        crate::parser::parse(input.as_bytes(), options).unwrap()
    }

    fn heading_ids_of(tree: &Tree) -> Vec<Option<String>> {
        tree.collect(tree.root(), |n| matches!(n.kind, NodeKind::Heading(_)))
            .into_iter()
            .map(|h| match tree.kind(h) {
                NodeKind::Heading(data) => data.id.clone(),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  API v2 "), "api-v2");
        assert_eq!(slugify("中文 标题"), "中文-标题");
    }

    #[test]
    fn test_auto_heading_ids_dedupe() {
        let options = Options {
            auto_heading_id: true,
            ..Options::default()
        };
        let tree = parse("# Intro\n## Intro\n# Intro\n# Other {#intro-1}\n", &options);
        assert_eq!(
            heading_ids_of(&tree),
            vec![
                Some("intro".to_string()),
                Some("intro-2".to_string()),
                Some("intro-3".to_string()),
                Some("intro-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_emoji_nodes() {
        let mut options = Options::default();
        options
            .emoji_aliases
            .insert("custom".to_string(), "https://cdn/custom.png".to_string());
        let tree = parse("hi :smile: :nope: :custom:", &options);
        let emojis: Vec<_> = tree
            .collect(tree.root(), |n| matches!(n.kind, NodeKind::Emoji(_)))
            .into_iter()
            .map(|e| match tree.kind(e) {
                NodeKind::Emoji(data) => (data.alias.clone(), data.unicode.clone()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            emojis,
            vec![
                ("smile".to_string(), "😄".to_string()),
                ("custom".to_string(), "https://cdn/custom.png".to_string())
            ]
        );
    }

    #[test]
    fn test_emoji_skips_time_like_text() {
        let tree = parse("at 10:30:45 sharp", &Options::default());
        let para = tree.first_child(tree.root()).unwrap();
        assert_eq!(tree.children(para).count(), 1);
    }

    #[test]
    fn test_auto_space() {
        assert_eq!(space_cjk("使用Rust编写2个"), "使用 Rust 编写 2 个");
        assert_eq!(space_cjk("plain text"), "plain text");
    }

    #[test]
    fn test_footnotes_gathered_at_end() {
        let tree = parse("a[^n]\n\n[^n]: note\n\nb\n", &Options::default());
        let kinds: Vec<_> = tree.children(tree.root()).map(|c| tree.kind(c).name()).collect();
        assert_eq!(
            kinds,
            vec!["NodeParagraph", "NodeParagraph", "NodeFootnotesDefBlock"]
        );
    }

    #[test]
    fn test_span_ial_binds_to_emphasis() {
        let options = Options {
            kramdown_span_ial: true,
            ..Options::default()
        };
        let tree = parse("*a*{: style=\"color: red\"} b", &options);
        let para = tree.first_child(tree.root()).unwrap();
        let em = tree.first_child(para).unwrap();
        assert_eq!(tree.node(em).ial_value("style"), Some("color: red"));
        let rest = tree.last_child(para).unwrap();
        assert_eq!(tree.tokens(rest), " b");
    }
}
