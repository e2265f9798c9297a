//! Block recognizers and the order in which they are tried

use indextree::NodeId;
use log::debug;

use super::blocks::BlockParser;
use super::{extension_blocks, html_block, list, table};
use crate::ast::{CodeBlockData, HeadingData, NodeKind};
use crate::token::{CODE_INDENT, accept, is_space_or_tab, peek};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Start {
    None,
    /// A container opened; keep looking for blocks inside it
    Container,
    /// A leaf opened; the rest of the line belongs to it
    Leaf,
}

/// Block constructs that can begin on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStart {
    YamlFrontMatter,
    Callout,
    Blockquote,
    AtxHeading,
    FencedCode,
    MathBlock,
    CustomBlock,
    GitConflict,
    HtmlBlock,
    SetextHeading,
    ThematicBreak,
    FootnoteDef,
    ListItem,
    IndentedCode,
    KramdownBlockIal,
    SuperBlock,
}

/// Recognizers in priority order; the first that matches wins.
///
/// A callout is a blockquote with a `[!TYPE]` header, so it comes first. A
/// Setext underline also checks whether the line is a table delimiter row for
/// the paragraph above, and yields to the table when it is.
pub const BLOCK_STARTS: &[BlockStart] = &[
    BlockStart::YamlFrontMatter,
    BlockStart::Callout,
    BlockStart::Blockquote,
    BlockStart::AtxHeading,
    BlockStart::FencedCode,
    BlockStart::MathBlock,
    BlockStart::CustomBlock,
    BlockStart::GitConflict,
    BlockStart::HtmlBlock,
    BlockStart::SetextHeading,
    BlockStart::ThematicBreak,
    BlockStart::FootnoteDef,
    BlockStart::ListItem,
    BlockStart::IndentedCode,
    BlockStart::KramdownBlockIal,
    BlockStart::SuperBlock,
];

pub(crate) fn try_starts(p: &mut BlockParser, container: NodeId) -> Start {
    for start in BLOCK_STARTS {
        let result = start.try_open(p, container);
        if result != Start::None {
            return result;
        }
    }
    Start::None
}

impl BlockStart {
    fn try_open(self, p: &mut BlockParser, container: NodeId) -> Start {
        let options = p.options;
        match self {
            BlockStart::YamlFrontMatter if options.yaml_front_matter => {
                extension_blocks::start_yaml_front_matter(p)
            }
            BlockStart::Callout if options.callout => {
                if !room_for_container(p, container) {
                    return Start::None;
                }
                extension_blocks::start_callout(p)
            }
            BlockStart::Blockquote => start_blockquote(p, container),
            BlockStart::AtxHeading => start_atx_heading(p),
            BlockStart::FencedCode => start_fenced_code(p),
            BlockStart::MathBlock if options.math_block => extension_blocks::start_math_block(p),
            BlockStart::CustomBlock if options.custom_block => {
                extension_blocks::start_custom_block(p)
            }
            BlockStart::GitConflict if options.git_conflict => {
                extension_blocks::start_git_conflict(p)
            }
            BlockStart::HtmlBlock => html_block::start(p, container),
            BlockStart::SetextHeading if options.setext => start_setext_heading(p, container),
            BlockStart::ThematicBreak => start_thematic_break(p, container),
            BlockStart::FootnoteDef if options.footnotes => {
                if !room_for_container(p, container) {
                    return Start::None;
                }
                extension_blocks::start_footnote_def(p)
            }
            BlockStart::ListItem => {
                if !room_for_container(p, container) {
                    return Start::None;
                }
                list::start(p, container)
            }
            BlockStart::IndentedCode if options.indented_code_block => start_indented_code(p),
            BlockStart::KramdownBlockIal if options.kramdown_block_ial => {
                extension_blocks::start_block_ial(p)
            }
            BlockStart::SuperBlock if options.super_block => {
                if !room_for_container(p, container) {
                    return Start::None;
                }
                extension_blocks::start_super_block(p)
            }
            _ => Start::None,
        }
    }
}

fn room_for_container(p: &BlockParser, container: NodeId) -> bool {
    let max = p.options.limits.max_container_depth;
    if p.depth(container) + 1 > max {
        debug!(
            "line {}: container depth limit {} reached, treating marker as text",
            p.line_number, max
        );
        return false;
    }
    true
}

fn rest<'a>(p: &'a BlockParser<'_>) -> &'a [u8] {
    p.line.as_bytes().get(p.next_nonspace..).unwrap_or(&[])
}

fn start_blockquote(p: &mut BlockParser, container: NodeId) -> Start {
    if p.indented || peek(p.line.as_bytes(), p.next_nonspace) != b'>' {
        return Start::None;
    }
    if !room_for_container(p, container) {
        return Start::None;
    }
    p.advance_next_nonspace();
    p.advance_offset(1, false);
    if is_space_or_tab(peek(p.line.as_bytes(), p.offset)) {
        p.advance_offset(1, true);
    }
    p.close_unmatched_blocks();
    p.add_child(NodeKind::Blockquote);
    Start::Container
}

fn start_atx_heading(p: &mut BlockParser) -> Start {
    if p.indented {
        return Start::None;
    }
    let rest = rest(p);
    let level = accept(rest, b'#');
    if level == 0 || level > 6 {
        return Start::None;
    }
    let after = peek(rest, level);
    if after != 0 && !is_space_or_tab(after) {
        return Start::None;
    }

    p.advance_next_nonspace();
    p.advance_offset(level, false);
    p.close_unmatched_blocks();

    let raw = p.line[p.offset..].to_string();
    let mut content = strip_closing_sequence(raw.trim_start_matches([' ', '\t'])).to_string();
    let id = if p.options.heading_id {
        extract_heading_id(&mut content)
    } else {
        None
    };

    let heading = p.add_child(NodeKind::Heading(HeadingData {
        level: level as u8,
        setext: false,
        id,
    }));
    p.tree.node_mut(heading).tokens = content;
    p.advance_to_end();
    Start::Leaf
}

/// Drop an optional closing `#` sequence, which must follow a space or fill the line
fn strip_closing_sequence(content: &str) -> &str {
    let trimmed = content.trim_end_matches([' ', '\t']);
    let without_hashes = trimmed.trim_end_matches('#');
    if without_hashes.len() == trimmed.len() {
        return trimmed;
    }
    if without_hashes.is_empty() {
        return "";
    }
    if without_hashes.ends_with([' ', '\t']) {
        return without_hashes.trim_end_matches([' ', '\t']);
    }
    trimmed
}

/// Pull a trailing `{id}` or `{#id}` off heading content
pub(crate) fn extract_heading_id(content: &mut String) -> Option<String> {
    let trimmed = content.trim_end();
    if !trimmed.ends_with('}') {
        return None;
    }
    let open = trimmed.rfind('{')?;
    if open == 0 {
        return None;
    }
    let id = trimmed[open + 1..trimmed.len() - 1].trim_start_matches('#');
    if id.is_empty() || id.contains(char::is_whitespace) || id.contains('{') {
        return None;
    }
    let id = id.to_string();
    let keep = trimmed[..open].trim_end().len();
    content.truncate(keep);
    Some(id)
}

fn start_fenced_code(p: &mut BlockParser) -> Start {
    if p.indented {
        return Start::None;
    }
    let rest = rest(p);
    let fence_char = peek(rest, 0);
    if fence_char != b'`' && fence_char != b'~' {
        return Start::None;
    }
    let fence_len = accept(rest, fence_char);
    if fence_len < 3 {
        return Start::None;
    }
    if fence_char == b'`' && rest[fence_len..].contains(&b'`') {
        return Start::None;
    }

    p.close_unmatched_blocks();
    let fence_offset = p.indent;
    p.add_child(NodeKind::CodeBlock(CodeBlockData {
        fenced: true,
        fence_char: fence_char as char,
        fence_len,
        fence_offset,
        info: String::new(),
        literal: String::new(),
    }));
    p.advance_next_nonspace();
    p.advance_offset(fence_len, false);
    Start::Leaf
}

fn start_setext_heading(p: &mut BlockParser, container: NodeId) -> Start {
    if p.indented || !matches!(p.tree.kind(container), NodeKind::Paragraph) {
        return Start::None;
    }
    let rest = rest(p);
    let marker = peek(rest, 0);
    if marker != b'=' && marker != b'-' {
        return Start::None;
    }
    let run = accept(rest, marker);
    if !rest[run..].iter().all(|&b| is_space_or_tab(b)) {
        return Start::None;
    }
    if p.options.gfm_table && table::continues_paragraph(p, container) {
        return Start::None;
    }

    p.close_unmatched_blocks();
    if p.options.link_ref {
        p.strip_reference_definitions(container);
    }
    if p.tree.tokens(container).is_empty() {
        return Start::None;
    }

    let mut content = p.tree.tokens(container).trim_end().to_string();
    let id = if p.options.heading_id {
        extract_heading_id(&mut content)
    } else {
        None
    };
    p.tree.node_mut(container).tokens = content;
    p.tree.reclassify(
        container,
        NodeKind::Heading(HeadingData {
            level: if marker == b'=' { 1 } else { 2 },
            setext: true,
            id,
        }),
    );
    p.tip = container;
    p.advance_to_end();
    Start::Leaf
}

pub(crate) fn is_thematic_break(rest: &[u8]) -> bool {
    let marker = peek(rest, 0);
    if !matches!(marker, b'*' | b'-' | b'_') {
        return false;
    }
    let mut count = 0;
    for &b in rest {
        if b == marker {
            count += 1;
        } else if !is_space_or_tab(b) {
            return false;
        }
    }
    count >= 3
}

fn start_thematic_break(p: &mut BlockParser, container: NodeId) -> Start {
    if p.indented || !is_thematic_break(rest(p)) {
        return Start::None;
    }
    if p.options.gfm_table && table::continues_paragraph(p, container) {
        return Start::None;
    }
    p.close_unmatched_blocks();
    p.add_child(NodeKind::ThematicBreak);
    p.advance_to_end();
    Start::Leaf
}

fn start_indented_code(p: &mut BlockParser) -> Start {
    if !p.indented || p.blank || matches!(p.tree.kind(p.tip), NodeKind::Paragraph) {
        return Start::None;
    }
    p.advance_offset(CODE_INDENT, true);
    p.close_unmatched_blocks();
    p.add_child(NodeKind::CodeBlock(CodeBlockData {
        fenced: false,
        fence_char: '\0',
        fence_len: 0,
        fence_offset: 0,
        info: String::new(),
        literal: String::new(),
    }));
    Start::Leaf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let position = |s: BlockStart| BLOCK_STARTS.iter().position(|&b| b == s).unwrap();
        assert!(position(BlockStart::Callout) < position(BlockStart::Blockquote));
        assert!(position(BlockStart::SetextHeading) < position(BlockStart::ThematicBreak));
        assert!(position(BlockStart::ThematicBreak) < position(BlockStart::ListItem));
        assert!(position(BlockStart::YamlFrontMatter) < position(BlockStart::ThematicBreak));
        assert!(position(BlockStart::GitConflict) < position(BlockStart::HtmlBlock));
        assert!(position(BlockStart::FootnoteDef) < position(BlockStart::ListItem));
        assert_eq!(BLOCK_STARTS.len(), 16);
    }

    #[test]
    fn test_strip_closing_sequence() {
        assert_eq!(strip_closing_sequence("foo ##"), "foo");
        assert_eq!(strip_closing_sequence("foo#"), "foo#");
        assert_eq!(strip_closing_sequence("###"), "");
        assert_eq!(strip_closing_sequence("foo ### b"), "foo ### b");
        assert_eq!(strip_closing_sequence("foo \\#"), "foo \\#");
    }

    #[test]
    fn test_extract_heading_id() {
        let mut content = "Intro {#intro}".to_string();
        assert_eq!(extract_heading_id(&mut content).as_deref(), Some("intro"));
        assert_eq!(content, "Intro");

        let mut content = "{only}".to_string();
        assert_eq!(extract_heading_id(&mut content), None);

        let mut content = "a {b c}".to_string();
        assert_eq!(extract_heading_id(&mut content), None);
    }

    #[test]
    fn test_thematic_break_shapes() {
        assert!(is_thematic_break(b"* * *"));
        assert!(is_thematic_break(b"___"));
        assert!(!is_thematic_break(b"--"));
        assert!(!is_thematic_break(b"-- a"));
        assert!(!is_thematic_break(b"*-*"));
    }
}
