//! Line-by-line block structure parsing over the open container chain

use std::collections::HashMap;

use indextree::NodeId;
use log::trace;

use super::block_start::{self, Start};
use super::{Document, extension_blocks, html_block, link_ref, list, table};
use crate::ast::{CodeBlockData, Node, NodeKind};
use crate::options::Options;
use crate::token::{CODE_INDENT, TAB_STOP, is_marker, is_space_or_tab, peek};
use crate::tree::Tree;

/// Outcome of testing an open block against the current line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Continuation {
    Matched,
    Failed,
    /// The line closed the block (a closing fence) and nothing else applies
    Consumed,
}

pub(crate) struct BlockParser<'o> {
    pub tree: Tree,
    pub options: &'o Options,
    pub refmap: HashMap<String, super::LinkRef>,
    pub footnotes: Vec<String>,
    pub tip: NodeId,
    oldtip: NodeId,
    last_matched_container: NodeId,
    pub all_closed: bool,
    /// Current line without its terminating newline
    pub line: String,
    pub line_number: usize,
    pub offset: usize,
    pub column: usize,
    pub next_nonspace: usize,
    pub next_nonspace_column: usize,
    pub indent: usize,
    pub indented: bool,
    pub blank: bool,
    partially_consumed_tab: bool,
}

impl<'o> BlockParser<'o> {
    pub fn new(options: &'o Options) -> Self {
        let tree = Tree::new();
        let root = tree.root();
        BlockParser {
            tree,
            options,
            refmap: HashMap::new(),
            footnotes: Vec::new(),
            tip: root,
            oldtip: root,
            last_matched_container: root,
            all_closed: true,
            line: String::new(),
            line_number: 0,
            offset: 0,
            column: 0,
            next_nonspace: 0,
            next_nonspace_column: 0,
            indent: 0,
            indented: false,
            blank: false,
            partially_consumed_tab: false,
        }
    }

    pub fn incorporate_line(&mut self, line: &str) {
        let root = self.tree.root();
        let mut container = root;
        let mut all_matched = true;
        self.oldtip = self.tip;
        self.offset = 0;
        self.column = 0;
        self.blank = false;
        self.partially_consumed_tab = false;
        self.line_number += 1;
        self.line = line.strip_suffix('\n').unwrap_or(line).to_string();

        // Walk down the open chain, checking each container's continuation
        while let Some(last) = self.tree.last_child(container) {
            if !self.tree.node(last).open {
                break;
            }
            container = last;
            self.find_next_nonspace();
            match self.continue_block(container) {
                Continuation::Matched => {}
                Continuation::Failed => all_matched = false,
                Continuation::Consumed => return,
            }
            if !all_matched {
                container = self.tree.parent(container).unwrap_or(root);
                break;
            }
        }

        self.all_closed = container == self.oldtip;
        self.last_matched_container = container;

        let mut matched_leaf = {
            let kind = self.tree.kind(container);
            !matches!(kind, NodeKind::Paragraph) && kind.accepts_lines()
        };

        // Try to open new blocks at the first unmatched position
        while !matched_leaf {
            self.find_next_nonspace();
            if !self.indented && !is_marker(peek(self.line.as_bytes(), self.next_nonspace)) {
                self.advance_next_nonspace();
                break;
            }
            match block_start::try_starts(self, container) {
                Start::Container => container = self.tip,
                Start::Leaf => {
                    container = self.tip;
                    matched_leaf = true;
                }
                Start::None => {
                    self.advance_next_nonspace();
                    break;
                }
            }
        }

        if !self.all_closed && !self.blank && matches!(self.tree.kind(self.tip), NodeKind::Paragraph)
        {
            // Lazy paragraph continuation
            self.add_line();
            return;
        }

        self.close_unmatched_blocks();
        if self.blank
            && let Some(last) = self.tree.last_child(container)
        {
            self.tree.node_mut(last).last_line_blank = true;
        }

        let last_line_blank = self.blank && !self.blank_is_ignored(container);
        let mut cont = Some(container);
        while let Some(c) = cont {
            self.tree.node_mut(c).last_line_blank = last_line_blank;
            cont = self.tree.parent(c);
        }

        if self.tree.kind(container).accepts_lines() {
            self.add_line();
            if let NodeKind::HtmlBlock { html_type } = *self.tree.kind(container)
                && html_block::closes(html_type, &self.line[self.offset..])
            {
                self.finalize(container);
            }
        } else if self.offset < self.line.len() && !self.blank {
            self.add_child(NodeKind::Paragraph);
            self.advance_next_nonspace();
            self.add_line();
        }
    }

    /// Blank lines inside these blocks never loosen a list
    fn blank_is_ignored(&self, container: NodeId) -> bool {
        match self.tree.kind(container) {
            NodeKind::Blockquote | NodeKind::Callout(_) => true,
            NodeKind::CodeBlock(data) => data.fenced,
            NodeKind::MathBlock { .. }
            | NodeKind::CustomBlock(_)
            | NodeKind::YamlFrontMatter
            | NodeKind::GitConflict => true,
            NodeKind::ListItem(_) => {
                self.tree.first_child(container).is_none()
                    && self.tree.node(container).line == self.line_number
            }
            _ => false,
        }
    }

    fn continue_block(&mut self, container: NodeId) -> Continuation {
        match self.tree.kind(container).clone() {
            NodeKind::Document | NodeKind::List(_) | NodeKind::FootnotesDefBlock => {
                Continuation::Matched
            }
            NodeKind::Blockquote | NodeKind::Callout(_) => {
                if !self.indented && peek(self.line.as_bytes(), self.next_nonspace) == b'>' {
                    self.advance_next_nonspace();
                    self.advance_offset(1, false);
                    if is_space_or_tab(peek(self.line.as_bytes(), self.offset)) {
                        self.advance_offset(1, true);
                    }
                    Continuation::Matched
                } else {
                    Continuation::Failed
                }
            }
            NodeKind::ListItem(data) => {
                if self.blank {
                    if self.tree.first_child(container).is_none() {
                        return Continuation::Failed;
                    }
                    self.advance_next_nonspace();
                } else if self.indent >= data.marker_offset + data.padding {
                    self.advance_offset(data.marker_offset + data.padding, true);
                } else {
                    return Continuation::Failed;
                }
                Continuation::Matched
            }
            NodeKind::CodeBlock(data) => self.continue_code_block(container, &data),
            NodeKind::HtmlBlock { html_type } => {
                if self.blank && (html_type == 6 || html_type == 7) {
                    Continuation::Failed
                } else {
                    Continuation::Matched
                }
            }
            NodeKind::Paragraph => {
                if self.blank {
                    Continuation::Failed
                } else {
                    Continuation::Matched
                }
            }
            NodeKind::FootnotesDef { .. } => {
                if self.blank {
                    self.advance_next_nonspace();
                } else if self.indent >= CODE_INDENT {
                    self.advance_offset(CODE_INDENT, true);
                } else {
                    return Continuation::Failed;
                }
                Continuation::Matched
            }
            NodeKind::MathBlock { .. }
            | NodeKind::CustomBlock(_)
            | NodeKind::YamlFrontMatter
            | NodeKind::GitConflict
            | NodeKind::SuperBlock(_) => extension_blocks::continue_block(self, container),
            _ => Continuation::Failed,
        }
    }

    fn continue_code_block(&mut self, container: NodeId, data: &CodeBlockData) -> Continuation {
        if data.fenced {
            let rest = &self.line.as_bytes()[self.next_nonspace..];
            let run = rest
                .iter()
                .take_while(|&&b| b as char == data.fence_char)
                .count();
            let closes = self.indent <= 3
                && run >= 3
                && run >= data.fence_len
                && rest[run..].iter().all(|&b| is_space_or_tab(b));
            if closes {
                self.finalize(container);
                return Continuation::Consumed;
            }
            // Skip optional spaces of the fence offset
            let mut i = data.fence_offset;
            while i > 0 && is_space_or_tab(peek(self.line.as_bytes(), self.offset)) {
                self.advance_offset(1, true);
                i -= 1;
            }
        } else if self.indent >= CODE_INDENT {
            self.advance_offset(CODE_INDENT, true);
        } else if self.blank {
            self.advance_next_nonspace();
        } else {
            return Continuation::Failed;
        }
        Continuation::Matched
    }

    pub fn finalize(&mut self, block: NodeId) {
        let root = self.tree.root();
        let above = self.tree.parent(block).unwrap_or(root);
        self.tree.node_mut(block).open = false;

        match self.tree.kind(block).clone() {
            NodeKind::Paragraph => self.finalize_paragraph(block),
            NodeKind::CodeBlock(data) => {
                let tokens = std::mem::take(&mut self.tree.node_mut(block).tokens);
                let mut data = data;
                if data.fenced {
                    let (first, rest) = tokens.split_once('\n').unwrap_or((tokens.as_str(), ""));
                    data.info = link_ref::unescape_string(first.trim());
                    data.literal = rest.to_string();
                } else {
                    data.literal = trim_blank_tail(&tokens, "\n");
                }
                self.tree.reclassify(block, NodeKind::CodeBlock(data));
            }
            NodeKind::HtmlBlock { .. } => {
                let node = self.tree.node_mut(block);
                node.tokens = trim_blank_tail(&node.tokens, "");
            }
            NodeKind::List(_) => list::finalize(self, block),
            NodeKind::MathBlock { .. }
            | NodeKind::YamlFrontMatter
            | NodeKind::CustomBlock(_)
            | NodeKind::GitConflict => extension_blocks::finalize_leaf(self, block),
            _ => {}
        }

        self.tip = above;
    }

    fn finalize_paragraph(&mut self, block: NodeId) {
        if self.options.link_ref
            && self.strip_reference_definitions(block)
            && crate::token::is_blank(self.tree.tokens(block))
        {
            self.tree.unlink(block);
            return;
        }

        if self.options.gfm_table && table::extract_table(self, block) {
            return;
        }

        if self.options.toc && self.tree.tokens(block).trim().eq_ignore_ascii_case("[toc]") {
            self.tree.node_mut(block).tokens.clear();
            self.tree.reclassify(block, NodeKind::Toc);
        }
    }

    /// Consume leading link reference definitions from a paragraph's tokens
    pub fn strip_reference_definitions(&mut self, block: NodeId) -> bool {
        let mut found = false;
        loop {
            let tokens = self.tree.tokens(block);
            if !tokens.starts_with('[') {
                break;
            }
            match link_ref::parse_reference(tokens, &mut self.refmap) {
                Some(consumed) => {
                    self.tree.node_mut(block).tokens.drain(..consumed);
                    found = true;
                }
                None => break,
            }
        }
        found
    }

    /// Append a child block, closing the tip until it can hold `kind`
    pub fn add_child(&mut self, kind: NodeKind) -> NodeId {
        let root = self.tree.root();
        while !self.tree.kind(self.tip).can_contain(&kind) && self.tip != root {
            self.finalize(self.tip);
        }
        trace!("line {}: open {}", self.line_number, kind.name());
        let mut node = Node::new(kind);
        node.line = self.line_number;
        let id = self.tree.new_node_with(node);
        self.tree.append_child(self.tip, id);
        self.tip = id;
        id
    }

    pub fn add_line(&mut self) {
        let tip = self.tip;
        if self.partially_consumed_tab {
            // Replace the rest of a partially consumed tab with spaces
            self.offset += 1;
            let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
            self.tree
                .node_mut(tip)
                .tokens
                .push_str(&" ".repeat(chars_to_tab));
        }
        let rest = self.line.get(self.offset..).unwrap_or("");
        let node = self.tree.node_mut(tip);
        node.tokens.push_str(rest);
        node.tokens.push('\n');
    }

    pub fn close_unmatched_blocks(&mut self) {
        if self.all_closed {
            return;
        }
        let root = self.tree.root();
        while self.oldtip != self.last_matched_container {
            let parent = self.tree.parent(self.oldtip).unwrap_or(root);
            self.finalize(self.oldtip);
            if self.oldtip == root {
                break;
            }
            self.oldtip = parent;
        }
        self.all_closed = true;
    }

    pub fn find_next_nonspace(&mut self) {
        let bytes = self.line.as_bytes();
        let mut i = self.offset;
        let mut cols = self.column;
        while i < bytes.len() {
            match bytes[i] {
                b' ' => {
                    i += 1;
                    cols += 1;
                }
                b'\t' => {
                    i += 1;
                    cols += TAB_STOP - (cols % TAB_STOP);
                }
                _ => break,
            }
        }
        self.blank = i >= bytes.len();
        self.next_nonspace = i;
        self.next_nonspace_column = cols;
        self.indent = self.next_nonspace_column - self.column;
        self.indented = self.indent >= CODE_INDENT;
    }

    pub fn advance_next_nonspace(&mut self) {
        self.offset = self.next_nonspace;
        self.column = self.next_nonspace_column;
        self.partially_consumed_tab = false;
    }

    /// Advance by `count` characters, or by `count` columns when `columns` is set
    pub fn advance_offset(&mut self, mut count: usize, columns: bool) {
        while count > 0 {
            let Some(c) = self.line.get(self.offset..).and_then(|s| s.chars().next()) else {
                break;
            };
            if c == '\t' {
                let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                if columns {
                    self.partially_consumed_tab = chars_to_tab > count;
                    let chars_to_advance = chars_to_tab.min(count);
                    self.column += chars_to_advance;
                    if !self.partially_consumed_tab {
                        self.offset += 1;
                    }
                    count -= chars_to_advance;
                } else {
                    self.partially_consumed_tab = false;
                    self.column += chars_to_tab;
                    self.offset += 1;
                    count -= 1;
                }
            } else {
                self.partially_consumed_tab = false;
                self.offset += c.len_utf8();
                self.column += 1;
                count -= 1;
            }
        }
    }

    /// Move the cursor to the end of the line
    pub fn advance_to_end(&mut self) {
        let remaining = self.line.len().saturating_sub(self.offset);
        self.advance_offset(remaining, false);
    }

    /// Nesting depth of `container`, the document being at depth 0
    pub fn depth(&self, container: NodeId) -> usize {
        self.tree.ancestors(container).count()
    }

    /// Close every open block and hand the tree over to the inline phase
    pub fn finish(mut self) -> Document<'o> {
        let root = self.tree.root();
        loop {
            let tip = self.tip;
            self.finalize(tip);
            if tip == root {
                break;
            }
        }
        Document {
            tree: self.tree,
            options: self.options,
            refmap: self.refmap,
            footnotes: self.footnotes,
        }
    }
}

/// Replace a trailing run of blank lines (`(\n *)+$`) with `replacement`
pub(crate) fn trim_blank_tail(s: &str, replacement: &str) -> String {
    let bytes = s.as_bytes();
    let mut i = bytes.len();
    while i > 0 && (bytes[i - 1] == b' ' || bytes[i - 1] == b'\n') {
        i -= 1;
    }
    match s[i..].find('\n') {
        Some(nl) => format!("{}{}", &s[..i + nl], replacement),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_blocks(input: &str) -> Tree {
        let options = Options::commonmark();
        let mut parser = BlockParser::new(&options);
        for line in crate::lexer::Lexer::new(input.as_bytes()) {
            parser.incorporate_line(&line);
        }
        parser.finish().tree
    }

    fn outline(tree: &Tree, id: NodeId, depth: usize, out: &mut Vec<String>) {
        out.push(format!("{}{}", "  ".repeat(depth), tree.kind(id).name()));
        for child in tree.children(id).collect::<Vec<_>>() {
            outline(tree, child, depth + 1, out);
        }
    }

    fn shape(input: &str) -> Vec<String> {
        let tree = parse_blocks(input);
        let mut out = Vec::new();
        outline(&tree, tree.root(), 0, &mut out);
        out
    }

    #[test]
    fn test_trim_blank_tail() {
        assert_eq!(trim_blank_tail("a\n  \n\n", "\n"), "a\n");
        assert_eq!(trim_blank_tail("a\nb\n", ""), "a\nb");
        assert_eq!(trim_blank_tail("abc", ""), "abc");
    }

    #[test]
    fn test_lazy_continuation_keeps_blockquote() {
        assert_eq!(
            shape("> foo\nbar\n"),
            vec!["NodeDocument", "  NodeBlockquote", "    NodeParagraph"]
        );
    }

    #[test]
    fn test_lazy_line_cannot_be_setext_underline() {
        assert_eq!(
            shape("> foo\n---\n"),
            vec![
                "NodeDocument",
                "  NodeBlockquote",
                "    NodeParagraph",
                "  NodeThematicBreak"
            ]
        );
    }

    #[test]
    fn test_fenced_code_info_and_literal() {
        let tree = parse_blocks("```rust extra\nfn main() {}\n```\n");
        let code = tree.first_child(tree.root()).unwrap();
        match tree.kind(code) {
            NodeKind::CodeBlock(data) => {
                assert!(data.fenced);
                assert_eq!(data.info, "rust extra");
                assert_eq!(data.literal, "fn main() {}\n");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tab_after_blockquote_marker() {
        let tree = parse_blocks(">\t\tfoo\n");
        let quote = tree.first_child(tree.root()).unwrap();
        let code = tree.first_child(quote).unwrap();
        match tree.kind(code) {
            NodeKind::CodeBlock(data) => assert_eq!(data.literal, "  foo\n"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reference_only_paragraph_is_pruned() {
        let options = Options::commonmark();
        let mut parser = BlockParser::new(&options);
        for line in crate::lexer::Lexer::new(b"[foo]: /url \"title\"\n") {
            parser.incorporate_line(&line);
        }
        let doc = parser.finish();
        assert!(doc.tree.is_empty());
        assert_eq!(doc.refmap["foo"].destination, "/url");
        assert_eq!(doc.refmap["foo"].title, "title");
    }
}
