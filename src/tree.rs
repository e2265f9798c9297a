//! Arena-backed document tree

use indextree::{Arena, NodeId};

use crate::ast::{Node, NodeKind};

/// A parsed document.
///
/// Nodes live in an arena and are addressed by [`NodeId`] handles. Unlinked
/// nodes stay in the arena but are no longer reachable from the root.
#[derive(Debug, Clone)]
pub struct Tree {
    arena: Arena<Node>,
    root: NodeId,
}

impl Tree {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let mut document = Node::new(NodeKind::Document);
        document.line = 1;
        let root = arena.new_node(document);
        Tree { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn new_node(&mut self, kind: NodeKind) -> NodeId {
        self.arena.new_node(Node::new(kind))
    }

    pub fn new_node_with(&mut self, node: Node) -> NodeId {
        self.arena.new_node(node)
    }

    pub fn new_text(&mut self, text: impl Into<String>) -> NodeId {
        self.arena.new_node(Node::with_tokens(NodeKind::Text, text))
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.arena[id].get()
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.arena[id].get_mut()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn tokens(&self, id: NodeId) -> &str {
        &self.node(id).tokens
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].first_child()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].last_child()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].next_sibling()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].previous_sibling()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// The node itself followed by all of its descendants in document order
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.arena).skip(1)
    }

    /// Materialize the nodes under `root` that satisfy `pred`, for passes that mutate
    pub fn collect<F>(&self, root: NodeId, pred: F) -> Vec<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        self.descendants(root)
            .filter(|&id| pred(self.node(id)))
            .collect()
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        parent.append(child, &mut self.arena);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        parent.prepend(child, &mut self.arena);
    }

    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        anchor.insert_before(node, &mut self.arena);
    }

    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        anchor.insert_after(node, &mut self.arena);
    }

    /// Detach a node (and its subtree) from its parent and siblings
    pub fn unlink(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Swap the kind of a node in place, returning the previous kind
    pub fn reclassify(&mut self, id: NodeId, kind: NodeKind) -> NodeKind {
        std::mem::replace(&mut self.node_mut(id).kind, kind)
    }

    /// Plain text content of a subtree
    pub fn text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            let node = self.node(node);
            match &node.kind {
                NodeKind::Text
                | NodeKind::CodeSpan { .. }
                | NodeKind::InlineMath
                | NodeKind::TextMark(_) => out.push_str(&node.tokens),
                NodeKind::Emoji(emoji) => out.push_str(&emoji.unicode),
                NodeKind::BlockRef(block_ref) => {
                    out.push_str(block_ref.text.as_deref().unwrap_or(&block_ref.id))
                }
                NodeKind::SoftBreak | NodeKind::HardBreak => out.push('\n'),
                _ => {}
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.first_child(self.root).is_none()
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tree: &Tree, parent: NodeId) -> Vec<&'static str> {
        tree.children(parent).map(|c| tree.kind(c).name()).collect()
    }

    #[test]
    fn test_links_stay_consistent() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = tree.new_node(NodeKind::Paragraph);
        let b = tree.new_node(NodeKind::ThematicBreak);
        let c = tree.new_node(NodeKind::Blockquote);
        tree.append_child(root, b);
        tree.prepend_child(root, a);
        tree.insert_after(b, c);
        assert_eq!(
            kinds(&tree, root),
            vec!["NodeParagraph", "NodeThematicBreak", "NodeBlockquote"]
        );

        tree.unlink(b);
        assert_eq!(tree.next_sibling(a), Some(c));
        assert_eq!(tree.previous_sibling(c), Some(a));
        assert_eq!(tree.parent(b), None);

        tree.unlink(a);
        tree.unlink(c);
        assert_eq!(tree.first_child(root), None);
        assert_eq!(tree.last_child(root), None);
    }

    #[test]
    fn test_reclassify_keeps_position() {
        let mut tree = Tree::new();
        let root = tree.root();
        let p = tree.new_node(NodeKind::Paragraph);
        let hr = tree.new_node(NodeKind::ThematicBreak);
        tree.append_child(root, p);
        tree.append_child(root, hr);
        let old = tree.reclassify(p, NodeKind::Toc);
        assert_eq!(old, NodeKind::Paragraph);
        assert_eq!(tree.first_child(root), Some(p));
        assert_eq!(tree.kind(p), &NodeKind::Toc);
    }

    #[test]
    fn test_text_skips_markers() {
        let mut tree = Tree::new();
        let root = tree.root();
        let em = tree.new_node(NodeKind::Emphasis);
        let open = tree.new_node_with(Node::with_tokens(NodeKind::OpenMarker, "*"));
        let text = tree.new_text("foo");
        let close = tree.new_node_with(Node::with_tokens(NodeKind::CloseMarker, "*"));
        tree.append_child(root, em);
        tree.append_child(em, open);
        tree.append_child(em, text);
        tree.append_child(em, close);
        assert_eq!(tree.text(root), "foo");
    }
}
