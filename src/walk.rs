//! Depth-first traversal

use indextree::NodeId;

use crate::tree::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStatus {
    Continue,
    /// Do not descend; the leaving event still fires
    SkipChildren,
    Stop,
}

/// Visit `root` and its subtree, calling `visitor(node, entering)` on the way
/// in and on the way out of every node.
///
/// The tree is borrowed immutably for the whole walk. Passes that need to
/// restructure it collect the nodes first with [`Tree::collect`].
pub fn walk<F>(tree: &Tree, root: NodeId, mut visitor: F)
where
    F: FnMut(NodeId, bool) -> WalkStatus,
{
    let mut current = root;
    let mut entering = true;
    loop {
        let status = visitor(current, entering);
        if status == WalkStatus::Stop {
            return;
        }

        if entering {
            match tree.first_child(current) {
                Some(child) if status != WalkStatus::SkipChildren => current = child,
                _ => entering = false,
            }
            continue;
        }

        if current == root {
            return;
        }
        match tree.next_sibling(current) {
            Some(next) => {
                current = next;
                entering = true;
            }
            None => match tree.parent(current) {
                Some(parent) => current = parent,
                None => return,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;

    fn sample() -> Tree {
        let mut tree = Tree::new();
        let root = tree.root();
        let quote = tree.new_node(NodeKind::Blockquote);
        let p1 = tree.new_node(NodeKind::Paragraph);
        let p2 = tree.new_node(NodeKind::Paragraph);
        let t1 = tree.new_text("a");
        let t2 = tree.new_text("b");
        tree.append_child(root, quote);
        tree.append_child(quote, p1);
        tree.append_child(p1, t1);
        tree.append_child(root, p2);
        tree.append_child(p2, t2);
        tree
    }

    fn trace(tree: &Tree, skip: &str, stop: &str) -> Vec<String> {
        let mut events = Vec::new();
        walk(tree, tree.root(), |id, entering| {
            let name = tree.kind(id).name().trim_start_matches("Node").to_string();
            let text = tree.tokens(id).to_string();
            events.push(format!("{}{}{}", if entering { "+" } else { "-" }, name, text));
            if entering && text == stop {
                return WalkStatus::Stop;
            }
            if entering && name == skip {
                return WalkStatus::SkipChildren;
            }
            WalkStatus::Continue
        });
        events
    }

    #[test]
    fn test_enter_and_leave_order() {
        let tree = sample();
        assert_eq!(
            trace(&tree, "", "?"),
            vec![
                "+Document",
                "+Blockquote",
                "+Paragraph",
                "+Texta",
                "-Texta",
                "-Paragraph",
                "-Blockquote",
                "+Paragraph",
                "+Textb",
                "-Textb",
                "-Paragraph",
                "-Document"
            ]
        );
    }

    #[test]
    fn test_skip_children_still_leaves() {
        let tree = sample();
        let events = trace(&tree, "Blockquote", "?");
        assert_eq!(&events[..3], &["+Document", "+Blockquote", "-Blockquote"]);
    }

    #[test]
    fn test_stop_ends_walk() {
        let tree = sample();
        let events = trace(&tree, "", "a");
        assert_eq!(events.last().map(String::as_str), Some("+Texta"));
    }
}
