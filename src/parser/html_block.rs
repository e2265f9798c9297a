//! HTML block start and end conditions

use std::sync::LazyLock;

use indextree::NodeId;
use regex::Regex;

use super::block_start::Start;
use super::blocks::BlockParser;
use crate::ast::NodeKind;
use crate::token::peek;

const TAG_NAME: &str = "[A-Za-z][A-Za-z0-9-]*";
const ATTRIBUTE: &str = r#"(?:\s+[a-zA-Z_:][a-zA-Z0-9:._-]*(?:\s*=\s*(?:[^"'=<>`\x00-\x20]+|'[^']*'|"[^"]*"))?)"#;

pub(crate) fn open_tag() -> String {
    format!("<{}{}*\\s*/?>", TAG_NAME, ATTRIBUTE)
}

pub(crate) fn close_tag() -> String {
    format!("</{}\\s*>", TAG_NAME)
}

const BLOCK_TAGS: &str = "address|article|aside|base|basefont|blockquote|body|caption|center|col|colgroup|dd|details|dialog|dir|div|dl|dt|fieldset|figcaption|figure|footer|form|frame|frameset|h1|h2|h3|h4|h5|h6|head|header|hr|html|iframe|legend|li|link|main|menu|menuitem|nav|noframes|ol|optgroup|option|p|param|search|section|summary|table|tbody|td|tfoot|th|thead|title|tr|track|ul";

/// Start conditions for types 1 through 7, indexed by `type - 1`
static BLOCK_OPEN: LazyLock<[Regex; 7]> = LazyLock::new(|| {
    let compile = |pattern: &str| Regex::new(pattern).expect("valid html block regex");
    [
        compile(r"(?i)^<(?:script|pre|textarea|style)(?:\s|>|$)"),
        compile(r"^<!--"),
        compile(r"^<\?"),
        compile(r"^<![A-Za-z]"),
        compile(r"^<!\[CDATA\["),
        compile(&format!(r"(?i)^</?(?:{})(?:\s|/?>|$)", BLOCK_TAGS)),
        compile(&format!(r"(?i)^(?:{}|{})\s*$", open_tag(), close_tag())),
    ]
});

/// End conditions for types 1 through 5
static BLOCK_CLOSE: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    let compile = |pattern: &str| Regex::new(pattern).expect("valid html block regex");
    [
        compile(r"(?i)</(?:script|pre|textarea|style)>"),
        compile(r"-->"),
        compile(r"\?>"),
        compile(r">"),
        compile(r"\]\]>"),
    ]
});

/// Which start condition, if any, the text at the line's next non-space matches
pub(crate) fn block_type(text: &str) -> Option<u8> {
    BLOCK_OPEN
        .iter()
        .position(|re| re.is_match(text))
        .map(|i| i as u8 + 1)
}

pub(crate) fn start(p: &mut BlockParser, container: NodeId) -> Start {
    if p.indented || peek(p.line.as_bytes(), p.next_nonspace) != b'<' {
        return Start::None;
    }
    let Some(html_type) = block_type(&p.line[p.next_nonspace..]) else {
        return Start::None;
    };
    // Type 7 cannot interrupt a paragraph, lazy or not
    if html_type == 7 {
        let lazy_paragraph =
            !p.all_closed && !p.blank && matches!(p.tree.kind(p.tip), NodeKind::Paragraph);
        if matches!(p.tree.kind(container), NodeKind::Paragraph) || lazy_paragraph {
            return Start::None;
        }
    }
    p.close_unmatched_blocks();
    p.add_child(NodeKind::HtmlBlock { html_type });
    Start::Leaf
}

/// Whether `line` satisfies the end condition of a type 1 to 5 block
pub(crate) fn closes(html_type: u8, line: &str) -> bool {
    match html_type {
        1..=5 => BLOCK_CLOSE[html_type as usize - 1].is_match(line),
        _ => false,
    }
}
