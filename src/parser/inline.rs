//! Inline parsing: expands the raw tokens of paragraphs, headings and table
//! cells into inline nodes, resolving emphasis and links with a delimiter
//! stack and a bracket stack.

mod brackets;
mod delimiters;
mod scanners;

use std::collections::HashMap;

use indextree::NodeId;
use log::trace;

use self::brackets::Bracket;
use self::delimiters::Delimiter;
use super::{Document, LinkRef, link_ref};
use crate::ast::{Node, NodeKind};
use crate::options::Options;
use crate::token::{is_ascii_punct, peek, trim_whitespace};
use crate::tree::Tree;

/// Bytes that end a plain text run
fn is_special(b: u8) -> bool {
    matches!(
        b,
        b'\n'
            | b'\\'
            | b'`'
            | b'*'
            | b'_'
            | b'~'
            | b'='
            | b'^'
            | b'#'
            | b'['
            | b']'
            | b'!'
            | b'<'
            | b'&'
            | b'$'
            | b'('
    )
}

pub(crate) struct InlineParser<'a> {
    tree: &'a mut Tree,
    options: &'a Options,
    refmap: &'a HashMap<String, LinkRef>,
    footnotes: &'a [String],
    block: NodeId,
    subject: String,
    pos: usize,
    /// Delimiter runs of the current leaf, linked through `prev`/`next`
    delimiters: Vec<Delimiter>,
    last_delimiter: Option<usize>,
    brackets: Vec<Bracket>,
    /// Start offsets of backtick runs keyed by run length, built on first use
    backtick_runs: Option<HashMap<usize, Vec<usize>>>,
}

/// Expand every leaf with inline content
pub(crate) fn parse_inlines(doc: &mut Document) {
    let root = doc.tree.root();
    let leaves = doc.tree.collect(root, |n| n.kind.has_inline_content());
    trace!("inline phase over {} leaves", leaves.len());
    let mut parser = InlineParser::new(&mut doc.tree, doc.options, &doc.refmap, &doc.footnotes);
    for leaf in leaves {
        parser.parse_block(leaf);
    }
}

impl<'a> InlineParser<'a> {
    pub(crate) fn new(
        tree: &'a mut Tree,
        options: &'a Options,
        refmap: &'a HashMap<String, LinkRef>,
        footnotes: &'a [String],
    ) -> Self {
        let block = tree.root();
        InlineParser {
            tree,
            options,
            refmap,
            footnotes,
            block,
            subject: String::new(),
            pos: 0,
            delimiters: Vec::new(),
            last_delimiter: None,
            brackets: Vec::new(),
            backtick_runs: None,
        }
    }

    pub(crate) fn parse_block(&mut self, block: NodeId) {
        let tokens = std::mem::take(&mut self.tree.node_mut(block).tokens);
        self.subject = trim_whitespace(&tokens).to_string();
        self.block = block;
        self.pos = 0;
        self.delimiters.clear();
        self.last_delimiter = None;
        self.brackets.clear();
        self.backtick_runs = None;

        while self.pos < self.subject.len() {
            self.parse_inline();
        }
        self.process_emphasis(None);
        merge_text(self.tree, block);
    }

    fn peek(&self) -> u8 {
        peek(self.subject.as_bytes(), self.pos)
    }

    fn append(&mut self, kind: NodeKind, tokens: impl Into<String>) -> NodeId {
        let mut node = Node::with_tokens(kind, tokens);
        node.open = false;
        let id = self.tree.new_node_with(node);
        self.tree.append_child(self.block, id);
        id
    }

    fn append_text(&mut self, text: impl Into<String>) -> NodeId {
        self.append(NodeKind::Text, text)
    }

    fn parse_inline(&mut self) {
        let c = self.peek();
        let handled = match c {
            b'\n' => self.parse_newline(),
            b'\\' => self.parse_backslash(),
            b'`' => self.parse_backticks(),
            b'*' | b'_' => self.handle_delim(c),
            b'~' | b'=' | b'^' | b'#' => self.handle_extension_delim(c),
            b'[' => self.parse_open_bracket(),
            b'!' => self.parse_bang(),
            b']' => self.parse_close_bracket(),
            b'<' => self.parse_autolink() || self.parse_text_mark() || self.parse_html_tag(),
            b'&' => self.parse_entity(),
            b'$' => self.parse_inline_math(),
            b'(' => self.parse_block_ref(),
            _ => self.parse_string(),
        };
        if !handled {
            // Every special byte is ASCII, so this stays on a char boundary
            self.pos += 1;
            let literal = (c as char).to_string();
            self.append_text(literal);
        }
    }

    fn parse_string(&mut self) -> bool {
        let bytes = self.subject.as_bytes();
        let start = self.pos;
        let mut end = start;
        while end < bytes.len() && !is_special(bytes[end]) {
            end += 1;
        }
        if end == start {
            return false;
        }
        self.pos = end;
        let text = self.subject[start..end].to_string();
        self.append_text(text);
        true
    }

    /// A line ending becomes a hard break after two or more spaces, else a soft break
    fn parse_newline(&mut self) -> bool {
        self.pos += 1;
        let mut hard = false;
        if let Some(last) = self.tree.last_child(self.block)
            && matches!(self.tree.kind(last), NodeKind::Text)
            && self.tree.tokens(last).ends_with(' ')
        {
            let node = self.tree.node_mut(last);
            hard = node.tokens.ends_with("  ");
            let kept = node.tokens.trim_end_matches(' ').len();
            node.tokens.truncate(kept);
        }
        self.append(
            if hard {
                NodeKind::HardBreak
            } else {
                NodeKind::SoftBreak
            },
            "",
        );
        while self.peek() == b' ' {
            self.pos += 1;
        }
        true
    }

    fn parse_backslash(&mut self) -> bool {
        self.pos += 1;
        let next = self.peek();
        if next == b'\n' {
            self.pos += 1;
            self.append(NodeKind::HardBreak, "");
            while self.peek() == b' ' {
                self.pos += 1;
            }
        } else if is_ascii_punct(next) {
            self.pos += 1;
            self.append_text((next as char).to_string());
        } else {
            self.append_text("\\");
        }
        true
    }

    fn parse_entity(&mut self) -> bool {
        match link_ref::decode_entity(&self.subject[self.pos..]) {
            Some((decoded, len)) => {
                self.pos += len;
                self.append_text(decoded);
                true
            }
            None => false,
        }
    }

    /// Prefix a relative destination with the configured link base
    fn apply_link_base(&self, destination: String) -> String {
        let base = &self.options.link_base;
        if base.is_empty() || destination.is_empty() || destination.starts_with(['#', '/']) {
            return destination;
        }
        let has_scheme = destination
            .split_once(':')
            .is_some_and(|(scheme, _)| {
                !scheme.is_empty() && scheme.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'.' || b == b'-')
            });
        if has_scheme {
            return destination;
        }
        format!("{}{}", base, destination)
    }
}

/// Join adjacent text nodes and drop empty ones under `root`
pub(crate) fn merge_text(tree: &mut Tree, root: NodeId) {
    let parents = tree.collect(root, |n| tree_can_hold_inlines(&n.kind));
    for parent in parents {
        let mut child = tree.first_child(parent);
        while let Some(current) = child {
            let next = tree.next_sibling(current);
            if !matches!(tree.kind(current), NodeKind::Text) {
                child = next;
                continue;
            }
            if tree.tokens(current).is_empty() {
                tree.unlink(current);
                child = next;
                continue;
            }
            let mut following = next;
            while let Some(n) = following {
                if !matches!(tree.kind(n), NodeKind::Text) {
                    break;
                }
                let text = std::mem::take(&mut tree.node_mut(n).tokens);
                tree.node_mut(current).tokens.push_str(&text);
                following = tree.next_sibling(n);
                tree.unlink(n);
            }
            child = following;
        }
    }
}

fn tree_can_hold_inlines(kind: &NodeKind) -> bool {
    kind.has_inline_content() || (!kind.is_block() && kind.can_contain(&NodeKind::Text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use pretty_assertions::assert_eq;

    fn parse(input: &str, options: &Options) -> Tree {
        crate::parser::parse(input.as_bytes(), options).unwrap()
    }

    /// Compact s-expression of the inline tree under the first block
    fn inlines(tree: &Tree) -> String {
        fn render(tree: &Tree, id: NodeId, out: &mut String) {
            let node = tree.node(id);
            match &node.kind {
                NodeKind::Text => out.push_str(&format!("{:?}", node.tokens)),
                NodeKind::OpenMarker | NodeKind::CloseMarker => return,
                kind => {
                    out.push_str(kind.name().trim_start_matches("Node"));
                    if !node.tokens.is_empty() {
                        out.push_str(&format!("[{}]", node.tokens));
                    }
                    let children: Vec<_> = tree
                        .children(id)
                        .filter(|&c| !tree.kind(c).is_marker())
                        .collect();
                    if !children.is_empty() {
                        out.push('(');
                        for (i, child) in children.into_iter().enumerate() {
                            if i > 0 {
                                out.push(' ');
                            }
                            render(tree, child, out);
                        }
                        out.push(')');
                    }
                }
            }
        }
        let block = tree.first_child(tree.root()).unwrap();
        let mut out = String::new();
        for (i, child) in tree.children(block).enumerate() {
            if i > 0 {
                out.push(' ');
            }
            render(tree, child, &mut out);
        }
        out
    }

    #[test]
    fn test_emphasis_and_strong() {
        let tree = parse("*foo* **bar**", &Options::commonmark());
        assert_eq!(inlines(&tree), r#"Emphasis("foo") " " Strong("bar")"#);
    }

    #[test]
    fn test_rule_of_three() {
        let tree = parse("*foo**bar**baz*", &Options::commonmark());
        assert_eq!(
            inlines(&tree),
            r#"Emphasis("foo" Strong("bar") "baz")"#
        );
        let tree = parse("*foo *bar**", &Options::commonmark());
        assert_eq!(inlines(&tree), r#"Emphasis("foo " Emphasis("bar"))"#);
    }

    #[test]
    fn test_intraword_underscore_stays_literal() {
        let tree = parse("snake_case_name", &Options::commonmark());
        assert_eq!(inlines(&tree), r#""snake_case_name""#);
    }

    #[test]
    fn test_breaks() {
        let tree = parse("a  \nb\\\nc\nd", &Options::commonmark());
        assert_eq!(
            inlines(&tree),
            r#""a" HardBreak "b" HardBreak "c" SoftBreak "d""#
        );
    }

    #[test]
    fn test_code_span_strips_one_space() {
        let tree = parse("`` `a` `` and ` `", &Options::commonmark());
        assert_eq!(inlines(&tree), r#"CodeSpan[`a`] " and " CodeSpan[ ]"#);
    }

    #[test]
    fn test_unmatched_backticks_are_literal() {
        let tree = parse("```foo``", &Options::commonmark());
        assert_eq!(inlines(&tree), r#""```foo``""#);
    }

    #[test]
    fn test_inline_link_and_reference() {
        let tree = parse(
            "[a](/u \"t\") [b][ref] [ref]\n\n[ref]: /r\n",
            &Options::commonmark(),
        );
        assert_eq!(
            inlines(&tree),
            r#"Link("a") " " Link("b") " " Link("ref")"#
        );
    }

    #[test]
    fn test_no_links_inside_links() {
        let tree = parse("[a [b](/inner) c](/outer)", &Options::commonmark());
        assert_eq!(
            inlines(&tree),
            r#""[a " Link("b") " c](/outer)""#
        );
    }

    #[test]
    fn test_bracket_degradation() {
        let tree = parse("[]() [foo", &Options::commonmark());
        assert_eq!(inlines(&tree), r#"Link " [foo""#);
        let tree = parse("[foo](bar \"baz\n", &Options::commonmark());
        assert_eq!(inlines(&tree), r#""[foo](bar \"baz""#);
    }

    #[test]
    fn test_autolink_and_html() {
        let tree = parse("<https://a.b/c> <span class=\"x\">", &Options::commonmark());
        assert_eq!(
            inlines(&tree),
            r#"Link("https://a.b/c") " " InlineHTML[<span class="x">]"#
        );
    }

    #[test]
    fn test_extension_delimiters() {
        let options = Options {
            mark: true,
            sup: true,
            sub: true,
            gfm_strikethrough_single_tilde: false,
            ..Options::default()
        };
        let tree = parse("~~s~~ ==m== ^p^ ~b~", &options);
        assert_eq!(
            inlines(&tree),
            r#"Strikethrough("s") " " Mark("m") " " Sup("p") " " Sub("b")"#
        );
    }

    #[test]
    fn test_extension_runs_need_equal_length() {
        let tree = parse("~~a~ b", &Options::default());
        assert_eq!(inlines(&tree), r#""~~a~ b""#);
    }

    #[test]
    fn test_inline_math_rules() {
        let tree = parse("$x^2$ costs $5 and $6", &Options::default());
        assert_eq!(
            inlines(&tree),
            r#"InlineMath[x^2] " costs $5 and $6""#
        );
    }

    #[test]
    fn test_footnote_reference() {
        let tree = parse("see[^1]\n\n[^1]: note\n", &Options::default());
        assert_eq!(inlines(&tree), r#""see" FootnotesRef"#);
    }

    #[test]
    fn test_block_ref() {
        let options = Options {
            block_ref: true,
            ..Options::default()
        };
        let tree = parse("((20210101-abc \"anchor\")) ((id2))", &options);
        let block = tree.first_child(tree.root()).unwrap();
        let refs: Vec<_> = tree
            .children(block)
            .filter_map(|c| match tree.kind(c) {
                NodeKind::BlockRef(data) => Some((data.id.clone(), data.text.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(
            refs,
            vec![
                ("20210101-abc".to_string(), Some("anchor".to_string())),
                ("id2".to_string(), None)
            ]
        );
    }

    #[test]
    fn test_delimiter_limit_degrades_to_text() {
        let mut options = Options::commonmark();
        options.limits.max_delimiters = 1;
        let tree = parse("*a* *b*", &options);
        assert_eq!(inlines(&tree), r#""*a* *b*""#);
    }

    #[test]
    fn test_link_base() {
        let options = Options {
            link_base: "https://base/".to_string(),
            ..Options::commonmark()
        };
        let tree = parse("[a](img.png) [b](https://x/) [c](#top)", &options);
        let block = tree.first_child(tree.root()).unwrap();
        let dests: Vec<_> = tree
            .children(block)
            .filter_map(|c| match tree.kind(c) {
                NodeKind::Link(link) => Some(link.destination.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(dests, vec!["https://base/img.png", "https://x/", "#top"]);
    }
}
