//! Emphasis and extension delimiter runs

use std::collections::HashMap;

use indextree::NodeId;
use log::debug;

use super::InlineParser;
use crate::ast::{Node, NodeKind};
use crate::token::{char_at, char_before, is_unicode_punct, is_unicode_whitespace};

#[derive(Debug, Clone)]
pub(super) struct Delimiter {
    pub ch: u8,
    /// Characters still available in the run
    pub num: usize,
    /// Length of the run as written
    pub orig: usize,
    /// Text node holding the run
    pub node: NodeId,
    pub can_open: bool,
    pub can_close: bool,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

struct Flanking {
    num: usize,
    can_open: bool,
    can_close: bool,
}

fn is_emphasis(ch: u8) -> bool {
    ch == b'*' || ch == b'_'
}

impl InlineParser<'_> {
    /// Measure the run at `pos` and decide whether it may open or close
    fn scan_delims(&self, ch: u8) -> Flanking {
        let bytes = self.subject.as_bytes();
        let start = self.pos;
        let mut end = start;
        while end < bytes.len() && bytes[end] == ch {
            end += 1;
        }
        let before = char_before(&self.subject, start).unwrap_or('\n');
        let after = char_at(&self.subject, end).unwrap_or('\n');

        let after_ws = is_unicode_whitespace(after);
        let after_punct = is_unicode_punct(after);
        let before_ws = is_unicode_whitespace(before);
        let before_punct = is_unicode_punct(before);

        let left = !after_ws && (!after_punct || before_ws || before_punct);
        let right = !before_ws && (!before_punct || after_ws || after_punct);
        let (can_open, can_close) = if ch == b'_' {
            (left && (!right || before_punct), right && (!left || after_punct))
        } else {
            (left, right)
        };
        Flanking {
            num: end - start,
            can_open,
            can_close,
        }
    }

    pub(super) fn handle_delim(&mut self, ch: u8) -> bool {
        let run = self.scan_delims(ch);
        self.push_run(ch, run);
        true
    }

    /// `~`, `=`, `^` and `#` runs; only enabled lengths become delimiters
    pub(super) fn handle_extension_delim(&mut self, ch: u8) -> bool {
        let run = self.scan_delims(ch);
        let options = self.options;
        let eligible = match (ch, run.num) {
            (b'~', 2) => options.gfm_strikethrough,
            (b'~', 1) => {
                options.sub || (options.gfm_strikethrough && options.gfm_strikethrough_single_tilde)
            }
            (b'=', 2) => options.mark,
            (b'^', 1) => options.sup,
            (b'#', 1) => options.tag,
            _ => false,
        };
        if !eligible {
            let literal = self.subject[self.pos..self.pos + run.num].to_string();
            self.pos += run.num;
            self.append_text(literal);
            return true;
        }
        self.push_run(ch, run);
        true
    }

    fn push_run(&mut self, ch: u8, run: Flanking) {
        let start = self.pos;
        self.pos += run.num;
        let node = self.append_text(self.subject[start..self.pos].to_string());
        if !(run.can_open || run.can_close) {
            return;
        }
        if self.delimiters.len() >= self.options.limits.max_delimiters {
            debug!(
                "delimiter limit of {} reached, run stays literal",
                self.options.limits.max_delimiters
            );
            return;
        }
        let index = self.delimiters.len();
        self.delimiters.push(Delimiter {
            ch,
            num: run.num,
            orig: run.num,
            node,
            can_open: run.can_open,
            can_close: run.can_close,
            prev: self.last_delimiter,
            next: None,
        });
        if let Some(prev) = self.last_delimiter {
            self.delimiters[prev].next = Some(index);
        }
        self.last_delimiter = Some(index);
    }

    pub(super) fn remove_delimiter(&mut self, index: usize) {
        let (prev, next) = (self.delimiters[index].prev, self.delimiters[index].next);
        if let Some(prev) = prev {
            self.delimiters[prev].next = next;
        }
        match next {
            Some(next) => self.delimiters[next].prev = prev,
            None => self.last_delimiter = prev,
        }
    }

    /// Whether `opener` and `closer` may pair up
    fn pair_allowed(&self, opener: usize, closer: usize) -> bool {
        let (o, c) = (&self.delimiters[opener], &self.delimiters[closer]);
        if is_emphasis(c.ch) {
            let odd_match =
                (c.can_open || o.can_close) && c.orig % 3 != 0 && (o.orig + c.orig) % 3 == 0;
            !odd_match
        } else {
            o.num == c.num
        }
    }

    /// Resolve delimiters above `stack_bottom` into emphasis-like nodes
    pub(super) fn process_emphasis(&mut self, stack_bottom: Option<usize>) {
        let mut openers_bottom: HashMap<(u8, bool, usize), Option<usize>> = HashMap::new();

        let mut closer = self.last_delimiter;
        while let Some(c) = closer {
            if self.delimiters[c].prev == stack_bottom {
                break;
            }
            closer = self.delimiters[c].prev;
        }

        while let Some(c) = closer {
            let cd = &self.delimiters[c];
            if !cd.can_close {
                closer = cd.next;
                continue;
            }
            let key = (cd.ch, cd.can_open, cd.orig % 3);
            let bottom = openers_bottom.get(&key).copied().flatten();

            let mut opener = cd.prev;
            let mut found = None;
            while let Some(o) = opener {
                if Some(o) == stack_bottom || Some(o) == bottom {
                    break;
                }
                let od = &self.delimiters[o];
                if od.ch == self.delimiters[c].ch && od.can_open && self.pair_allowed(o, c) {
                    found = Some(o);
                    break;
                }
                opener = od.prev;
            }

            match found {
                Some(o) => closer = self.match_delimiters(o, c),
                None => {
                    openers_bottom.insert(key, self.delimiters[c].prev);
                    closer = self.delimiters[c].next;
                    if !self.delimiters[c].can_open {
                        self.remove_delimiter(c);
                    }
                }
            }
        }

        while let Some(d) = self.last_delimiter {
            if Some(d) == stack_bottom {
                break;
            }
            self.remove_delimiter(d);
        }
    }

    fn span_kind(&self, ch: u8, used: usize) -> NodeKind {
        match (ch, used) {
            (b'*' | b'_', 1) => NodeKind::Emphasis,
            (b'*' | b'_', _) => NodeKind::Strong,
            (b'~', 2) => NodeKind::Strikethrough,
            (b'~', _) => {
                if self.options.gfm_strikethrough && self.options.gfm_strikethrough_single_tilde {
                    NodeKind::Strikethrough
                } else {
                    NodeKind::Sub
                }
            }
            (b'=', _) => NodeKind::Mark,
            (b'^', _) => NodeKind::Sup,
            _ => NodeKind::Tag,
        }
    }

    /// Wrap the nodes between a matched pair and return the next closer to try
    fn match_delimiters(&mut self, opener: usize, closer: usize) -> Option<usize> {
        let ch = self.delimiters[closer].ch;
        let used = if is_emphasis(ch) {
            if self.delimiters[closer].num >= 2 && self.delimiters[opener].num >= 2 {
                2
            } else {
                1
            }
        } else {
            self.delimiters[closer].num
        };
        let opener_node = self.delimiters[opener].node;
        let closer_node = self.delimiters[closer].node;
        self.delimiters[opener].num -= used;
        self.delimiters[closer].num -= used;
        for node in [opener_node, closer_node] {
            let tokens = &mut self.tree.node_mut(node).tokens;
            tokens.truncate(tokens.len() - used);
        }

        let marker = (ch as char).to_string().repeat(used);
        let mut span = Node::new(self.span_kind(ch, used));
        span.open = false;
        let span = self.tree.new_node_with(span);
        let mut open = Node::with_tokens(NodeKind::OpenMarker, marker.clone());
        open.open = false;
        let open = self.tree.new_node_with(open);
        self.tree.append_child(span, open);

        let mut inner = self.tree.next_sibling(opener_node);
        while let Some(node) = inner {
            if node == closer_node {
                break;
            }
            inner = self.tree.next_sibling(node);
            self.tree.append_child(span, node);
        }

        let mut close = Node::with_tokens(NodeKind::CloseMarker, marker);
        close.open = false;
        let close = self.tree.new_node_with(close);
        self.tree.append_child(span, close);
        self.tree.insert_after(opener_node, span);

        // Delimiters strictly between the pair can no longer match
        if self.delimiters[opener].next != Some(closer) {
            self.delimiters[opener].next = Some(closer);
            self.delimiters[closer].prev = Some(opener);
        }

        if self.delimiters[opener].num == 0 {
            self.tree.unlink(opener_node);
            self.remove_delimiter(opener);
        }
        if self.delimiters[closer].num == 0 {
            let next = self.delimiters[closer].next;
            self.tree.unlink(closer_node);
            self.remove_delimiter(closer);
            next
        } else {
            Some(closer)
        }
    }
}
