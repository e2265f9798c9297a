//! Non-CommonMark blocks: front matter, math, custom and git-conflict
//! fences, callouts, superblocks, footnote definitions and block IALs

use indextree::NodeId;
use log::trace;

use super::block_start::Start;
use super::blocks::{BlockParser, Continuation};
use super::{emoji, ial};
use crate::ast::{CalloutData, CustomBlockData, NodeKind, SuperBlockLayout};
use crate::token::{accept, is_space_or_tab, is_whitespace, peek, trim_whitespace};

fn rest<'a>(p: &'a BlockParser<'_>) -> &'a str {
    p.line.get(p.next_nonspace..).unwrap_or("")
}

/// Skip up to `count` leading spaces or tabs of a fenced block's content line
fn skip_fence_offset(p: &mut BlockParser, mut count: usize) {
    while count > 0 && is_space_or_tab(peek(p.line.as_bytes(), p.offset)) {
        p.advance_offset(1, true);
        count -= 1;
    }
}

/// A line made of `marker` only, at least `min` of them
fn is_fence_line(text: &str, marker: u8, min: usize) -> bool {
    let trimmed = trim_whitespace(text);
    trimmed.len() >= min && trimmed.bytes().all(|b| b == marker)
}

pub(crate) fn start_yaml_front_matter(p: &mut BlockParser) -> Start {
    if p.indented || p.line_number != 1 || !p.tree.is_empty() || p.line != "---" {
        return Start::None;
    }
    p.close_unmatched_blocks();
    p.add_child(NodeKind::YamlFrontMatter);
    p.advance_to_end();
    Start::Leaf
}

pub(crate) fn start_math_block(p: &mut BlockParser) -> Start {
    if p.indented || accept(rest(p).as_bytes(), b'$') < 2 {
        return Start::None;
    }
    p.close_unmatched_blocks();
    let dollar_offset = p.indent;
    p.add_child(NodeKind::MathBlock { dollar_offset });
    p.advance_next_nonspace();
    Start::Leaf
}

pub(crate) fn start_custom_block(p: &mut BlockParser) -> Start {
    if p.indented {
        return Start::None;
    }
    let rest = rest(p);
    let fence_len = accept(rest.as_bytes(), b';');
    if fence_len < 3 {
        return Start::None;
    }
    let raw_info = &rest[fence_len..];
    if raw_info.contains(';') {
        return Start::None;
    }
    let info = super::link_ref::unescape_string(trim_whitespace(raw_info));
    let info = info.split(' ').next().unwrap_or_default().to_string();
    if info.is_empty() {
        return Start::None;
    }

    p.close_unmatched_blocks();
    let fence_offset = p.indent;
    p.add_child(NodeKind::CustomBlock(CustomBlockData { info, fence_offset }));
    p.advance_next_nonspace();
    p.advance_offset(fence_len, false);
    Start::Leaf
}

pub(crate) fn start_git_conflict(p: &mut BlockParser) -> Start {
    if !p.line.starts_with("<<<<<<<") {
        return Start::None;
    }
    p.close_unmatched_blocks();
    p.add_child(NodeKind::GitConflict);
    Start::Leaf
}

/// Type, title and icon of a `[!TYPE] title` header
fn callout_header(header: &str) -> Option<CalloutData> {
    let inner = trim_whitespace(header).strip_prefix("[!")?;
    let end = inner.find(']')?;
    let kind = trim_whitespace(&inner[..end]).to_string();
    if kind.is_empty() {
        return None;
    }
    let mut title = trim_whitespace(&inner[end + 1..]).to_string();

    let mut icon = match kind.to_ascii_uppercase().as_str() {
        "NOTE" => "✏️",
        "TIP" => "💡",
        "IMPORTANT" => "❗",
        "WARNING" => "⚠️",
        "CAUTION" => "🚨",
        _ => "",
    }
    .to_string();
    let leading = title.split(' ').next().unwrap_or_default().to_string();
    if !leading.is_empty() && emoji::alias_of(&leading).is_some() {
        title = trim_whitespace(&title[leading.len()..]).to_string();
        icon = leading;
    }
    Some(CalloutData { kind, title, icon })
}

/// `> [!TYPE] title`; the whole header line is consumed so later lines
/// can never turn it into a heading or table header
pub(crate) fn start_callout(p: &mut BlockParser) -> Start {
    if p.indented || peek(p.line.as_bytes(), p.next_nonspace) != b'>' {
        return Start::None;
    }
    let Some(data) = callout_header(&rest(p)[1..]) else {
        return Start::None;
    };

    p.advance_next_nonspace();
    p.advance_to_end();
    p.close_unmatched_blocks();
    p.add_child(NodeKind::Callout(data));
    Start::Container
}

pub(crate) fn start_footnote_def(p: &mut BlockParser) -> Start {
    if p.indented {
        return Start::None;
    }
    let rest = rest(p);
    let Some(after) = rest.strip_prefix("[^") else {
        return Start::None;
    };
    let Some(end) = after.find(']') else {
        return Start::None;
    };
    let label = &after[..end];
    if label.is_empty() || label.bytes().any(is_whitespace) || peek(after.as_bytes(), end + 1) != b':' {
        return Start::None;
    }
    let label = label.to_string();
    let marker_len = label.len() + 4;

    p.advance_next_nonspace();
    p.advance_offset(marker_len, false);
    p.close_unmatched_blocks();
    p.add_child(NodeKind::FootnotesDef {
        label: label.clone(),
    });
    let key = super::normalize_label(&label);
    if !p.footnotes.contains(&key) {
        p.footnotes.push(key);
    }
    Start::Container
}

pub(crate) fn start_block_ial(p: &mut BlockParser) -> Start {
    if p.indented {
        return Start::None;
    }
    // An empty list item takes its attributes from the first block inside
    if matches!(p.tree.kind(p.tip), NodeKind::ListItem(_)) && p.tree.first_child(p.tip).is_none() {
        return Start::None;
    }
    let Some(entries) = ial::parse_block_ial(rest(p)) else {
        return Start::None;
    };
    p.close_unmatched_blocks();
    let tokens = trim_whitespace(rest(p)).to_string();
    let node = p.add_child(NodeKind::KramdownBlockIal);
    let node = p.tree.node_mut(node);
    node.tokens = tokens;
    node.ial = entries;
    p.advance_to_end();
    Start::Leaf
}

pub(crate) fn start_super_block(p: &mut BlockParser) -> Start {
    if p.indented {
        return Start::None;
    }
    let rest = rest(p);
    if accept(rest.as_bytes(), b'{') != 3 {
        return Start::None;
    }
    let layout = match trim_whitespace(&rest[3..]).to_ascii_lowercase().as_str() {
        "" => SuperBlockLayout::Default,
        "row" => SuperBlockLayout::Row,
        "col" => SuperBlockLayout::Col,
        _ => return Start::None,
    };
    p.close_unmatched_blocks();
    p.add_child(NodeKind::SuperBlock(layout));
    p.advance_to_end();
    Start::Container
}

/// Continuation for the extension kinds
pub(crate) fn continue_block(p: &mut BlockParser, container: NodeId) -> Continuation {
    match p.tree.kind(container).clone() {
        NodeKind::MathBlock { dollar_offset } => {
            let rest = rest(p);
            if p.indent <= 3 && rest.starts_with("$$") && is_fence_line(rest, b'$', 2) {
                p.finalize(container);
                return Continuation::Consumed;
            }
            skip_fence_offset(p, dollar_offset);
            Continuation::Matched
        }
        NodeKind::CustomBlock(data) => {
            if p.indent <= 3 && is_fence_line(rest(p), b';', 3) {
                p.finalize(container);
                return Continuation::Consumed;
            }
            skip_fence_offset(p, data.fence_offset);
            Continuation::Matched
        }
        NodeKind::YamlFrontMatter => {
            if p.line == "---" {
                p.finalize(container);
                return Continuation::Consumed;
            }
            Continuation::Matched
        }
        NodeKind::GitConflict => {
            if p.line.starts_with(">>>>>>>") {
                p.finalize(container);
                return Continuation::Consumed;
            }
            Continuation::Matched
        }
        NodeKind::SuperBlock(_) => continue_super_block(p, container),
        _ => Continuation::Failed,
    }
}

/// A `}}}` line closes the innermost open superblock, unless the open leaf
/// takes raw lines
fn continue_super_block(p: &mut BlockParser, container: NodeId) -> Continuation {
    if trim_whitespace(rest(p)) != "}}}" {
        return Continuation::Matched;
    }
    let tip_kind = p.tree.kind(p.tip);
    if tip_kind.accepts_lines() && !matches!(tip_kind, NodeKind::Paragraph) {
        return Continuation::Matched;
    }
    let innermost = std::iter::once(p.tip)
        .chain(p.tree.ancestors(p.tip))
        .find(|&id| matches!(p.tree.kind(id), NodeKind::SuperBlock(_)));
    if innermost != Some(container) {
        return Continuation::Matched;
    }

    trace!("line {}: close superblock", p.line_number);
    loop {
        let tip = p.tip;
        p.finalize(tip);
        if tip == container {
            break;
        }
    }
    Continuation::Consumed
}

/// Strip fences and surrounding whitespace from the raw-content extension blocks
pub(crate) fn finalize_leaf(p: &mut BlockParser, block: NodeId) {
    let tokens = std::mem::take(&mut p.tree.node_mut(block).tokens);
    let content = match p.tree.kind(block) {
        NodeKind::MathBlock { .. } => {
            let inner = tokens.strip_prefix("$$").unwrap_or(&tokens);
            let inner = trim_whitespace(inner);
            trim_whitespace(inner.strip_suffix("$$").unwrap_or(inner)).to_string()
        }
        NodeKind::CustomBlock(_) | NodeKind::GitConflict => {
            let body = tokens.split_once('\n').map(|(_, body)| body).unwrap_or("");
            match p.tree.kind(block) {
                NodeKind::GitConflict => trim_whitespace(body).to_string(),
                _ => body.to_string(),
            }
        }
        _ => trim_whitespace(&tokens).to_string(),
    };
    p.tree.node_mut(block).tokens = content;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::tree::Tree;

    fn parse_blocks(input: &str, options: &Options) -> Tree {
        let mut parser = BlockParser::new(options);
        for line in crate::lexer::Lexer::new(input.as_bytes()) {
            parser.incorporate_line(&line);
        }
        parser.finish().tree
    }

    #[test]
    fn test_math_block_content() {
        let tree = parse_blocks("$$\na^2 + b^2\n$$\nafter\n", &Options::default());
        let math = tree.first_child(tree.root()).unwrap();
        assert!(matches!(tree.kind(math), NodeKind::MathBlock { .. }));
        assert_eq!(tree.tokens(math), "a^2 + b^2");
        let para = tree.next_sibling(math).unwrap();
        assert!(matches!(tree.kind(para), NodeKind::Paragraph));
    }

    #[test]
    fn test_yaml_front_matter_only_at_start() {
        let tree = parse_blocks("---\ntitle: x\n---\nbody\n", &Options::default());
        let yaml = tree.first_child(tree.root()).unwrap();
        assert!(matches!(tree.kind(yaml), NodeKind::YamlFrontMatter));
        assert_eq!(tree.tokens(yaml), "title: x");

        let tree = parse_blocks("text\n\n---\n", &Options::default());
        assert!(!tree
            .children(tree.root())
            .any(|id| matches!(tree.kind(id), NodeKind::YamlFrontMatter)));
    }

    #[test]
    fn test_callout_header() {
        let tree = parse_blocks("> [!TIP] Speed up\n> Use the cache.\n", &Options::default());
        let callout = tree.first_child(tree.root()).unwrap();
        match tree.kind(callout) {
            NodeKind::Callout(data) => {
                assert_eq!(data.kind, "TIP");
                assert_eq!(data.title, "Speed up");
                assert_eq!(data.icon, "💡");
            }
            other => panic!("unexpected {:?}", other),
        }
        let para = tree.first_child(callout).unwrap();
        assert_eq!(tree.tokens(para), "Use the cache.\n");
    }

    #[test]
    fn test_callout_header_is_not_a_setext_heading() {
        let tree = parse_blocks("> [!NOTE]\n> ---\n> body\n", &Options::default());
        let callout = tree.first_child(tree.root()).unwrap();
        match tree.kind(callout) {
            NodeKind::Callout(data) => {
                assert_eq!(data.kind, "NOTE");
                assert_eq!(data.icon, "✏️");
            }
            other => panic!("unexpected {:?}", other),
        }
        let kinds: Vec<_> = tree.children(callout).map(|c| tree.kind(c).name()).collect();
        assert_eq!(kinds, vec!["NodeThematicBreak", "NodeParagraph"]);
    }

    #[test]
    fn test_nested_super_blocks_close_innermost_first() {
        let options = Options {
            super_block: true,
            ..Options::default()
        };
        let tree = parse_blocks("{{{row\n{{{col\na\n}}}\nb\n}}}\nc\n", &options);
        let outer = tree.first_child(tree.root()).unwrap();
        assert!(matches!(
            tree.kind(outer),
            NodeKind::SuperBlock(SuperBlockLayout::Row)
        ));
        let kinds: Vec<_> = tree.children(outer).map(|c| tree.kind(c).name()).collect();
        assert_eq!(kinds, vec!["NodeSuperBlock", "NodeParagraph"]);
        let last = tree.last_child(tree.root()).unwrap();
        assert_eq!(tree.tokens(last), "c\n");
    }

    #[test]
    fn test_custom_block_info() {
        let options = Options {
            custom_block: true,
            ..Options::default()
        };
        let tree = parse_blocks(";;;chart extra\nbody\n;;;\n", &options);
        let block = tree.first_child(tree.root()).unwrap();
        match tree.kind(block) {
            NodeKind::CustomBlock(data) => assert_eq!(data.info, "chart"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(tree.tokens(block), "body\n");
    }

    #[test]
    fn test_footnote_definition_registers_label() {
        let options = Options::default();
        let mut parser = BlockParser::new(&options);
        for line in crate::lexer::Lexer::new(b"[^Note]: text\n    more\n") {
            parser.incorporate_line(&line);
        }
        let doc = parser.finish();
        assert_eq!(doc.footnotes, vec!["note".to_string()]);
        let def = doc.tree.first_child(doc.tree.root()).unwrap();
        assert!(matches!(doc.tree.kind(def), NodeKind::FootnotesDef { .. }));
    }
}
