//! List markers and tightness

use indextree::NodeId;

use super::block_start::Start;
use super::blocks::BlockParser;
use crate::ast::{ListData, ListKind, NodeKind};
use crate::token::{is_digit, is_space_or_tab, peek};

/// Parse a list marker at the next non-space position.
///
/// Returns the marker data with the cursor left at the start of the item's
/// content, or `None` without moving the cursor.
fn parse_list_marker(p: &mut BlockParser, container: NodeId) -> Option<ListData> {
    if p.indent >= 4 {
        return None;
    }
    let interrupts_paragraph = matches!(p.tree.kind(container), NodeKind::Paragraph);
    let rest = &p.line.as_bytes()[p.next_nonspace..];

    let (marker_len, mut data) = match peek(rest, 0) {
        b'*' | b'+' | b'-' => (
            1,
            ListData {
                kind: ListKind::Bullet,
                tight: true,
                bullet_char: Some(rest[0] as char),
                delimiter: None,
                start: 0,
                num: 0,
                padding: 0,
                marker_offset: p.indent,
                checked: false,
            },
        ),
        b if is_digit(b) => {
            let digits = rest.iter().take_while(|&&b| is_digit(b)).count();
            let delimiter = peek(rest, digits);
            if digits > 9 || (delimiter != b'.' && delimiter != b')') {
                return None;
            }
            let start: u32 = std::str::from_utf8(&rest[..digits]).ok()?.parse().ok()?;
            if interrupts_paragraph && start != 1 {
                return None;
            }
            (
                digits + 1,
                ListData {
                    kind: ListKind::Ordered,
                    tight: true,
                    bullet_char: None,
                    delimiter: Some(delimiter as char),
                    start,
                    num: start,
                    padding: 0,
                    marker_offset: p.indent,
                    checked: false,
                },
            )
        }
        _ => return None,
    };

    // The marker must be followed by whitespace or the end of the line
    let next = peek(rest, marker_len);
    if next != 0 && !is_space_or_tab(next) {
        return None;
    }
    // An empty item cannot interrupt a paragraph
    if interrupts_paragraph && rest[marker_len..].iter().all(|&b| is_space_or_tab(b)) {
        return None;
    }

    p.advance_next_nonspace();
    p.advance_offset(marker_len, true);
    let spaces_start_col = p.column;
    let spaces_start_offset = p.offset;
    loop {
        p.advance_offset(1, true);
        let next = peek(p.line.as_bytes(), p.offset);
        if !(p.column - spaces_start_col < 5 && is_space_or_tab(next)) {
            break;
        }
    }
    let blank_item = p.offset >= p.line.len();
    let spaces_after_marker = p.column - spaces_start_col;
    if !(1..5).contains(&spaces_after_marker) || blank_item {
        data.padding = marker_len + 1;
        p.column = spaces_start_col;
        p.offset = spaces_start_offset;
        if is_space_or_tab(peek(p.line.as_bytes(), p.offset)) {
            p.advance_offset(1, true);
        }
    } else {
        data.padding = marker_len + spaces_after_marker;
    }

    if p.options.gfm_task_list_item && !blank_item {
        detect_task_marker(p, &mut data);
    }
    Some(data)
}

/// `[ ]`, `[x]` or `[X]` followed by whitespace turns the item into a task
fn detect_task_marker(p: &mut BlockParser, data: &mut ListData) {
    let rest = &p.line.as_bytes()[p.offset..];
    if rest.len() < 4 || rest[0] != b'[' || rest[2] != b']' || !is_space_or_tab(rest[3]) {
        return;
    }
    let checked = match rest[1] {
        b' ' => false,
        b'x' | b'X' => true,
        _ => return,
    };
    data.kind = ListKind::Task;
    data.checked = checked;
    p.advance_offset(3, false);
    if is_space_or_tab(peek(p.line.as_bytes(), p.offset)) {
        p.advance_offset(1, true);
    }
}

pub(crate) fn start(p: &mut BlockParser, container: NodeId) -> Start {
    if p.indented && !matches!(p.tree.kind(container), NodeKind::List(_)) {
        return Start::None;
    }
    let Some(data) = parse_list_marker(p, container) else {
        return Start::None;
    };

    p.close_unmatched_blocks();
    let continues_list = matches!(p.tree.kind(p.tip), NodeKind::List(existing) if existing.matches(&data));
    if !continues_list {
        let mut list_data = data.clone();
        if list_data.kind == ListKind::Task {
            list_data.kind = if data.is_ordered() {
                ListKind::Ordered
            } else {
                ListKind::Bullet
            };
        }
        list_data.checked = false;
        p.add_child(NodeKind::List(list_data));
    }
    p.add_child(NodeKind::ListItem(data));
    Start::Container
}

/// Whether a block ends with a blank line, looking through trailing lists and items
fn ends_with_blank_line(p: &mut BlockParser, block: NodeId) -> bool {
    let mut current = Some(block);
    while let Some(block) = current {
        let node = p.tree.node_mut(block);
        if node.last_line_blank {
            return true;
        }
        let descend = !node.last_line_checked
            && matches!(node.kind, NodeKind::List(_) | NodeKind::ListItem(_));
        node.last_line_checked = true;
        if !descend {
            break;
        }
        current = p.tree.last_child(block);
    }
    false
}

/// A list is loose if any item is followed by a blank line, or if any item's
/// direct children are separated by one
pub(crate) fn finalize(p: &mut BlockParser, list: NodeId) {
    let mut tight = true;
    let mut item = p.tree.first_child(list);
    'items: while let Some(it) = item {
        let next_item = p.tree.next_sibling(it);
        if ends_with_blank_line(p, it) && next_item.is_some() {
            tight = false;
            break;
        }
        let mut sub = p.tree.first_child(it);
        while let Some(s) = sub {
            let next_sub = p.tree.next_sibling(s);
            if ends_with_blank_line(p, s) && (next_item.is_some() || next_sub.is_some()) {
                tight = false;
                break 'items;
            }
            sub = next_sub;
        }
        item = next_item;
    }

    let children: Vec<NodeId> = p.tree.children(list).collect();
    for child in children.into_iter().chain(std::iter::once(list)) {
        match &mut p.tree.node_mut(child).kind {
            NodeKind::List(data) | NodeKind::ListItem(data) => data.tight = tight,
            _ => {}
        }
    }
}
