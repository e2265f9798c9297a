//! Kramdown inline attribute lists: `{: key="value" ...}`

use indextree::NodeId;
use log::trace;

use super::Document;
use crate::ast::NodeKind;
use crate::id::IdSource;
use crate::token::{is_ascii_letter, is_ascii_letter_num, is_space_or_tab, is_whitespace, peek};

fn is_name_start(b: u8) -> bool {
    is_ascii_letter(b) || b == b'_' || b == b':'
}

fn is_name_char(b: u8) -> bool {
    is_ascii_letter_num(b) || matches!(b, b'_' | b'.' | b':' | b'-')
}

/// Parse an attribute list at the start of `text`.
///
/// Returns the entries in source order and the number of bytes up to and
/// including the closing `}`. At least one entry is required.
pub fn parse_ial(text: &str) -> Option<(Vec<(String, String)>, usize)> {
    let bytes = text.as_bytes();
    if !text.starts_with("{:") {
        return None;
    }
    let mut entries = Vec::new();
    let mut i = 2;
    loop {
        while is_whitespace(peek(bytes, i)) {
            i += 1;
        }
        match peek(bytes, i) {
            b'}' => break,
            b if is_name_start(b) => {}
            _ => return None,
        }
        let name_start = i;
        while is_name_char(peek(bytes, i)) {
            i += 1;
        }
        let name = &text[name_start..i];
        if peek(bytes, i) != b'=' {
            return None;
        }
        i += 1;
        let quote = peek(bytes, i);
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        let value_start = i + 1;
        let value_len = bytes[value_start..].iter().position(|&b| b == quote)?;
        let value = &text[value_start..value_start + value_len];
        i = value_start + value_len + 1;
        entries.push((name.to_string(), value.to_string()));
        // Attributes are separated by whitespace
        let next = peek(bytes, i);
        if next != b'}' && !is_whitespace(next) {
            return None;
        }
    }
    if entries.is_empty() {
        return None;
    }
    Some((entries, i + 1))
}

/// Whether `line` holds nothing but an attribute list
pub(crate) fn parse_block_ial(line: &str) -> Option<Vec<(String, String)>> {
    let (entries, consumed) = parse_ial(line)?;
    if line.as_bytes()[consumed..].iter().all(|&b| is_space_or_tab(b) || b == b'\n') {
        Some(entries)
    } else {
        None
    }
}

fn merge(doc: &mut Document, target: NodeId, entries: &[(String, String)]) {
    let node = doc.tree.node_mut(target);
    for (key, value) in entries {
        node.set_ial(key, value);
    }
}

/// Bind attribute lists to their targets, then mint ids for unnamed blocks.
///
/// A block list binds to the nearest preceding sibling that is not itself an
/// attribute list, or to its parent when there is none. A span list binds to
/// the inline right before it.
pub(crate) fn attach(doc: &mut Document, ids: &mut dyn IdSource) {
    let root = doc.tree.root();
    let lists = doc.tree.collect(root, |n| {
        matches!(n.kind, NodeKind::KramdownBlockIal | NodeKind::KramdownSpanIal)
    });

    for list in lists {
        let entries = doc.tree.node(list).ial.clone();
        let target = match doc.tree.kind(list) {
            NodeKind::KramdownBlockIal => {
                let mut sibling = doc.tree.previous_sibling(list);
                while let Some(s) = sibling {
                    if !matches!(doc.tree.kind(s), NodeKind::KramdownBlockIal) {
                        break;
                    }
                    sibling = doc.tree.previous_sibling(s);
                }
                sibling.or_else(|| doc.tree.parent(list))
            }
            _ => doc.tree.previous_sibling(list),
        };
        if let Some(target) = target {
            trace!(
                "attribute list binds to {} on line {}",
                doc.tree.kind(target).name(),
                doc.tree.node(target).line
            );
            merge(doc, target, &entries);
        }
    }

    if !doc.options.kramdown_block_ial {
        return;
    }
    let unnamed = doc.tree.collect(root, |n| {
        n.id.is_none()
            && n.kind.is_block()
            && !matches!(
                n.kind,
                NodeKind::Document
                    | NodeKind::KramdownBlockIal
                    | NodeKind::TableHead
                    | NodeKind::TableRow
                    | NodeKind::TableCell(_)
            )
    });
    for block in unnamed {
        let id = ids.next_id();
        doc.tree.node_mut(block).set_ial("id", &id);
    }
}
