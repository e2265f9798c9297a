//! `[` / `![` openers and link, image and footnote reference resolution

use indextree::NodeId;
use log::debug;

use super::InlineParser;
use crate::ast::{FootnoteRef, LinkData, LinkType, Node, NodeKind};
use crate::parser::link_ref::{normalize_label, scan_link_destination, scan_link_label, scan_link_title, spnl};
use crate::token::{is_whitespace, peek};

#[derive(Debug, Clone)]
pub(super) struct Bracket {
    /// Text node holding `[` or `![`
    pub node: NodeId,
    /// Position of the `[` in the subject
    pub index: usize,
    pub image: bool,
    /// Cleared once a link closes around it; links may not nest
    pub active: bool,
    /// Whether another bracket opened after this one
    pub bracket_after: bool,
    pub previous_delimiter: Option<usize>,
}

impl InlineParser<'_> {
    fn push_bracket(&mut self, node: NodeId, index: usize, image: bool) {
        if let Some(top) = self.brackets.last_mut() {
            top.bracket_after = true;
        }
        self.brackets.push(Bracket {
            node,
            index,
            image,
            active: true,
            bracket_after: false,
            previous_delimiter: self.last_delimiter,
        });
    }

    fn bracket_limit_reached(&self) -> bool {
        if self.brackets.len() < self.options.limits.max_bracket_depth {
            return false;
        }
        debug!(
            "bracket limit of {} reached, opener stays literal",
            self.options.limits.max_bracket_depth
        );
        true
    }

    pub(super) fn parse_open_bracket(&mut self) -> bool {
        let start = self.pos;
        self.pos += 1;
        let node = self.append_text("[");
        if !self.bracket_limit_reached() {
            self.push_bracket(node, start, false);
        }
        true
    }

    pub(super) fn parse_bang(&mut self) -> bool {
        let start = self.pos;
        self.pos += 1;
        if self.peek() != b'[' {
            self.append_text("!");
            return true;
        }
        self.pos += 1;
        let node = self.append_text("![");
        if !self.bracket_limit_reached() {
            self.push_bracket(node, start + 1, true);
        }
        true
    }

    /// Try `(destination "title")` right after the closing bracket
    fn parse_inline_destination(&mut self) -> Option<(String, String)> {
        let subject = self.subject.as_str();
        if peek(subject.as_bytes(), self.pos) != b'(' {
            return None;
        }
        let pos = spnl(subject, self.pos + 1);
        let (destination, after_dest) = scan_link_destination(subject, pos)?;
        let mut title = String::new();
        let mut end = after_dest;
        let title_start = spnl(subject, after_dest);
        if title_start != after_dest
            && is_whitespace(peek(subject.as_bytes(), title_start - 1))
            && let Some((text, after_title)) = scan_link_title(subject, title_start)
        {
            title = text;
            end = after_title;
        }
        let end = spnl(subject, end);
        if peek(subject.as_bytes(), end) != b')' {
            return None;
        }
        self.pos = end + 1;
        Some((destination, title))
    }

    /// `[^label]` referring to a known footnote definition
    fn footnote_ref(&self, opener: &Bracket, close_start: usize) -> Option<FootnoteRef> {
        if !self.options.footnotes || opener.image {
            return None;
        }
        let inner = &self.subject[opener.index + 1..close_start];
        let label = inner.strip_prefix('^')?;
        if label.is_empty() {
            return None;
        }
        let label = normalize_label(label);
        let index = self.footnotes.iter().position(|l| *l == label)?;
        Some(FootnoteRef {
            label,
            index: index + 1,
        })
    }

    /// Drop delimiters above `bottom` without resolving them
    fn discard_delimiters(&mut self, bottom: Option<usize>) {
        while let Some(d) = self.last_delimiter {
            if Some(d) == bottom {
                break;
            }
            self.remove_delimiter(d);
        }
    }

    pub(super) fn parse_close_bracket(&mut self) -> bool {
        let close_start = self.pos;
        self.pos += 1;
        let start = self.pos;

        let Some(opener) = self.brackets.last().cloned() else {
            self.append_text("]");
            return true;
        };
        if !opener.active {
            self.append_text("]");
            self.brackets.pop();
            return true;
        }

        if let Some(footnote) = self.footnote_ref(&opener, close_start) {
            let mut node = Some(opener.node);
            while let Some(n) = node {
                node = self.tree.next_sibling(n);
                self.tree.unlink(n);
            }
            self.discard_delimiters(opener.previous_delimiter);
            self.brackets.pop();
            self.append(NodeKind::FootnotesRef(footnote), "");
            return true;
        }

        let mut resolved = self
            .parse_inline_destination()
            .map(|(destination, title)| (LinkType::Inline, destination, title));

        if resolved.is_none() {
            self.pos = start;
            let label_len = scan_link_label(&self.subject, self.pos);
            let label = if label_len > 2 {
                Some(self.subject[self.pos + 1..self.pos + label_len - 1].to_string())
            } else if !opener.bracket_after {
                Some(self.subject[opener.index + 1..close_start].to_string())
            } else {
                None
            };
            if label_len == 0 {
                self.pos = start;
            } else {
                self.pos += label_len;
            }
            resolved = label
                .filter(|_| self.options.link_ref)
                .and_then(|label| self.refmap.get(&normalize_label(&label)))
                .map(|link| {
                    (
                        LinkType::Reference,
                        link.destination.clone(),
                        link.title.clone(),
                    )
                });
        }

        let Some((link_type, destination, title)) = resolved else {
            self.brackets.pop();
            self.pos = start;
            self.append_text("]");
            return true;
        };

        let data = LinkData {
            link_type,
            destination: self.apply_link_base(destination),
            title,
        };
        let mut link = Node::new(if opener.image {
            NodeKind::Image(data)
        } else {
            NodeKind::Link(data)
        });
        link.open = false;
        let link = self.tree.new_node_with(link);
        let mut inner = self.tree.next_sibling(opener.node);
        while let Some(node) = inner {
            inner = self.tree.next_sibling(node);
            self.tree.append_child(link, node);
        }
        self.tree.append_child(self.block, link);
        self.process_emphasis(opener.previous_delimiter);
        self.brackets.pop();
        self.tree.unlink(opener.node);

        if !opener.image {
            for bracket in self.brackets.iter_mut().filter(|b| !b.image) {
                bracket.active = false;
            }
        }
        true
    }
}
