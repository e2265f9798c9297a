//! Node kinds, payloads and classification predicates

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    None,
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKind {
    Bullet,
    Ordered,
    Task,
}

/// Marker metadata shared by list and list item nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListData {
    pub kind: ListKind,
    pub tight: bool,
    pub bullet_char: Option<char>,
    pub delimiter: Option<char>,
    pub start: u32,
    /// Number of an ordered item as written
    pub num: u32,
    /// Marker width plus the spaces after it
    pub padding: usize,
    /// Indentation before the marker
    pub marker_offset: usize,
    pub checked: bool,
}

impl ListData {
    /// Two markers belong to the same list when they use the same bullet or delimiter
    pub fn matches(&self, other: &ListData) -> bool {
        self.bullet_char == other.bullet_char && self.delimiter == other.delimiter
    }

    pub fn is_ordered(&self) -> bool {
        self.delimiter.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockData {
    pub fenced: bool,
    pub fence_char: char,
    pub fence_len: usize,
    pub fence_offset: usize,
    pub info: String,
    pub literal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingData {
    pub level: u8,
    pub setext: bool,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    Inline,
    Reference,
    Autolink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkData {
    pub link_type: LinkType,
    pub destination: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalloutData {
    pub kind: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuperBlockLayout {
    Default,
    Row,
    Col,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomBlockData {
    pub info: String,
    pub fence_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootnoteRef {
    pub label: String,
    /// 1-based position of the definition
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockRefSubtype {
    /// Anchor text written with double quotes, kept as is
    Static,
    /// Anchor text written with single quotes, refreshed by the host
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRefData {
    pub id: String,
    pub text: Option<String>,
    pub subtype: BlockRefSubtype,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiData {
    pub alias: String,
    pub unicode: String,
}

/// Fields of a `<span data-type="...">` text mark
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMarkData {
    pub types: Vec<String>,
    pub href: String,
    pub title: String,
    pub block_ref_id: String,
    pub block_ref_subtype: String,
    pub inline_math_content: String,
}

impl TextMarkData {
    pub fn has_type(&self, typ: &str) -> bool {
        self.types.iter().any(|t| t == typ)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    // Blocks
    Paragraph,
    Heading(HeadingData),
    ThematicBreak,
    Blockquote,
    Callout(CalloutData),
    List(ListData),
    ListItem(ListData),
    CodeBlock(CodeBlockData),
    HtmlBlock { html_type: u8 },
    Table(Vec<Alignment>),
    TableHead,
    TableRow,
    TableCell(Alignment),
    MathBlock { dollar_offset: usize },
    YamlFrontMatter,
    FootnotesDefBlock,
    FootnotesDef { label: String },
    KramdownBlockIal,
    SuperBlock(SuperBlockLayout),
    GitConflict,
    CustomBlock(CustomBlockData),
    Toc,
    // Inlines
    Text,
    SoftBreak,
    HardBreak,
    CodeSpan { backticks: usize },
    Emphasis,
    Strong,
    Strikethrough,
    Mark,
    Sup,
    Sub,
    Tag,
    OpenMarker,
    CloseMarker,
    Link(LinkData),
    Image(LinkData),
    InlineHtml,
    InlineMath,
    FootnotesRef(FootnoteRef),
    BlockRef(BlockRefData),
    Emoji(EmojiData),
    KramdownSpanIal,
    TextMark(TextMarkData),
}

impl NodeKind {
    /// Stable name of the kind, as used by serializers and debug dumps
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "NodeDocument",
            NodeKind::Paragraph => "NodeParagraph",
            NodeKind::Heading(_) => "NodeHeading",
            NodeKind::ThematicBreak => "NodeThematicBreak",
            NodeKind::Blockquote => "NodeBlockquote",
            NodeKind::Callout(_) => "NodeCallout",
            NodeKind::List(_) => "NodeList",
            NodeKind::ListItem(_) => "NodeListItem",
            NodeKind::CodeBlock(_) => "NodeCodeBlock",
            NodeKind::HtmlBlock { .. } => "NodeHTMLBlock",
            NodeKind::Table(_) => "NodeTable",
            NodeKind::TableHead => "NodeTableHead",
            NodeKind::TableRow => "NodeTableRow",
            NodeKind::TableCell(_) => "NodeTableCell",
            NodeKind::MathBlock { .. } => "NodeMathBlock",
            NodeKind::YamlFrontMatter => "NodeYamlFrontMatter",
            NodeKind::FootnotesDefBlock => "NodeFootnotesDefBlock",
            NodeKind::FootnotesDef { .. } => "NodeFootnotesDef",
            NodeKind::KramdownBlockIal => "NodeKramdownBlockIAL",
            NodeKind::SuperBlock(_) => "NodeSuperBlock",
            NodeKind::GitConflict => "NodeGitConflict",
            NodeKind::CustomBlock(_) => "NodeCustomBlock",
            NodeKind::Toc => "NodeToC",
            NodeKind::Text => "NodeText",
            NodeKind::SoftBreak => "NodeSoftBreak",
            NodeKind::HardBreak => "NodeHardBreak",
            NodeKind::CodeSpan { .. } => "NodeCodeSpan",
            NodeKind::Emphasis => "NodeEmphasis",
            NodeKind::Strong => "NodeStrong",
            NodeKind::Strikethrough => "NodeStrikethrough",
            NodeKind::Mark => "NodeMark",
            NodeKind::Sup => "NodeSup",
            NodeKind::Sub => "NodeSub",
            NodeKind::Tag => "NodeTag",
            NodeKind::OpenMarker => "NodeOpenMarker",
            NodeKind::CloseMarker => "NodeCloseMarker",
            NodeKind::Link(_) => "NodeLink",
            NodeKind::Image(_) => "NodeImage",
            NodeKind::InlineHtml => "NodeInlineHTML",
            NodeKind::InlineMath => "NodeInlineMath",
            NodeKind::FootnotesRef(_) => "NodeFootnotesRef",
            NodeKind::BlockRef(_) => "NodeBlockRef",
            NodeKind::Emoji(_) => "NodeEmoji",
            NodeKind::KramdownSpanIal => "NodeKramdownSpanIAL",
            NodeKind::TextMark(_) => "NodeTextMark",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Document
                | NodeKind::Paragraph
                | NodeKind::Heading(_)
                | NodeKind::ThematicBreak
                | NodeKind::Blockquote
                | NodeKind::Callout(_)
                | NodeKind::List(_)
                | NodeKind::ListItem(_)
                | NodeKind::CodeBlock(_)
                | NodeKind::HtmlBlock { .. }
                | NodeKind::Table(_)
                | NodeKind::TableHead
                | NodeKind::TableRow
                | NodeKind::TableCell(_)
                | NodeKind::MathBlock { .. }
                | NodeKind::YamlFrontMatter
                | NodeKind::FootnotesDefBlock
                | NodeKind::FootnotesDef { .. }
                | NodeKind::KramdownBlockIal
                | NodeKind::SuperBlock(_)
                | NodeKind::GitConflict
                | NodeKind::CustomBlock(_)
                | NodeKind::Toc
        )
    }

    /// Blocks whose children are other blocks
    pub fn is_container_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Document
                | NodeKind::Blockquote
                | NodeKind::Callout(_)
                | NodeKind::List(_)
                | NodeKind::ListItem(_)
                | NodeKind::FootnotesDefBlock
                | NodeKind::FootnotesDef { .. }
                | NodeKind::SuperBlock(_)
        )
    }

    /// Leaves whose raw tokens expand into inline children
    pub fn has_inline_content(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph | NodeKind::Heading(_) | NodeKind::TableCell(_)
        )
    }

    pub fn can_contain(&self, child: &NodeKind) -> bool {
        match self {
            NodeKind::List(_) => matches!(child, NodeKind::ListItem(_)),
            NodeKind::FootnotesDefBlock => matches!(child, NodeKind::FootnotesDef { .. }),
            NodeKind::FootnotesDef { .. } => {
                child.is_block()
                    && !matches!(child, NodeKind::ListItem(_) | NodeKind::FootnotesDef { .. })
            }
            NodeKind::Document
            | NodeKind::Blockquote
            | NodeKind::Callout(_)
            | NodeKind::ListItem(_)
            | NodeKind::SuperBlock(_) => {
                child.is_block() && !matches!(child, NodeKind::ListItem(_) | NodeKind::Document)
            }
            NodeKind::Table(_) => matches!(child, NodeKind::TableHead | NodeKind::TableRow),
            NodeKind::TableHead => matches!(child, NodeKind::TableRow),
            NodeKind::TableRow => matches!(child, NodeKind::TableCell(_)),
            NodeKind::Paragraph
            | NodeKind::Heading(_)
            | NodeKind::TableCell(_)
            | NodeKind::Emphasis
            | NodeKind::Strong
            | NodeKind::Strikethrough
            | NodeKind::Mark
            | NodeKind::Sup
            | NodeKind::Sub
            | NodeKind::Tag
            | NodeKind::Link(_)
            | NodeKind::Image(_) => !child.is_block(),
            _ => false,
        }
    }

    /// Leaves that keep absorbing raw lines while open
    pub fn accepts_lines(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::CodeBlock(_)
                | NodeKind::HtmlBlock { .. }
                | NodeKind::MathBlock { .. }
                | NodeKind::YamlFrontMatter
                | NodeKind::GitConflict
                | NodeKind::CustomBlock(_)
        )
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, NodeKind::OpenMarker | NodeKind::CloseMarker)
    }

    pub fn is_close_marker(&self) -> bool {
        matches!(self, NodeKind::CloseMarker)
    }
}

/// A node in the tree arena
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Raw content: unexpanded lines for leaf blocks, literal text for inlines
    pub tokens: String,
    pub id: Option<String>,
    /// Attribute list entries in source order
    pub ial: Vec<(String, String)>,
    /// 1-based line where the node starts, 0 for inline nodes
    pub line: usize,
    pub(crate) open: bool,
    pub(crate) last_line_blank: bool,
    pub(crate) last_line_checked: bool,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            tokens: String::new(),
            id: None,
            ial: Vec::new(),
            line: 0,
            open: true,
            last_line_blank: false,
            last_line_checked: false,
        }
    }

    pub fn with_tokens(kind: NodeKind, tokens: impl Into<String>) -> Self {
        Node {
            tokens: tokens.into(),
            ..Node::new(kind)
        }
    }

    pub fn ial_value(&self, key: &str) -> Option<&str> {
        self.ial
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace an attribute, keeping the position of an existing key
    pub fn set_ial(&mut self, key: &str, value: &str) {
        match self.ial.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.ial.push((key.to_string(), value.to_string())),
        }
        if key == "id" {
            self.id = Some(value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_only_contains_items() {
        let list = NodeKind::List(ListData {
            kind: ListKind::Bullet,
            tight: true,
            bullet_char: Some('-'),
            delimiter: None,
            start: 1,
            num: 0,
            padding: 2,
            marker_offset: 0,
            checked: false,
        });
        let item = NodeKind::ListItem(match &list {
            NodeKind::List(data) => data.clone(),
            _ => unreachable!(),
        });
        assert!(list.can_contain(&item));
        assert!(!list.can_contain(&NodeKind::Paragraph));
        assert!(!NodeKind::Document.can_contain(&item));
        assert!(NodeKind::Blockquote.can_contain(&NodeKind::Paragraph));
    }

    #[test]
    fn test_leaf_predicates() {
        assert!(NodeKind::Paragraph.accepts_lines());
        assert!(!NodeKind::Paragraph.is_container_block());
        assert!(NodeKind::Paragraph.can_contain(&NodeKind::Text));
        assert!(!NodeKind::ThematicBreak.can_contain(&NodeKind::Text));
        assert!(NodeKind::CloseMarker.is_marker());
        assert!(NodeKind::CloseMarker.is_close_marker());
        assert!(!NodeKind::OpenMarker.is_close_marker());
    }

    #[test]
    fn test_kind_names_are_stable() {
        assert_eq!(NodeKind::Document.name(), "NodeDocument");
        assert_eq!(NodeKind::KramdownBlockIal.name(), "NodeKramdownBlockIAL");
        assert_eq!(NodeKind::Text.name(), "NodeText");
    }

    #[test]
    fn test_set_ial_replaces_in_place() {
        let mut node = Node::new(NodeKind::Paragraph);
        node.set_ial("id", "a");
        node.set_ial("style", "color: red");
        node.set_ial("id", "b");
        assert_eq!(
            node.ial,
            vec![
                ("id".to_string(), "b".to_string()),
                ("style".to_string(), "color: red".to_string())
            ]
        );
        assert_eq!(node.id.as_deref(), Some("b"));
    }
}
