//! Self-contained inline constructs: code spans, autolinks, raw HTML,
//! text marks, inline math and block references.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::InlineParser;
use crate::ast::{BlockRefData, BlockRefSubtype, LinkData, LinkType, Node, NodeKind, TextMarkData};
use crate::parser::html_block::{close_tag, open_tag};
use crate::parser::link_ref::{decode_entity, normalize_uri};
use crate::token::{is_ascii_letter_num, is_digit, is_space_or_tab, peek};

static URI_AUTOLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<[A-Za-z][A-Za-z0-9.+-]{1,31}:[^<>\x00-\x20]*>").expect("valid autolink regex")
});

static EMAIL_AUTOLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^<([a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*)>",
    )
    .expect("valid email autolink regex")
});

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?i)^(?:{}|{}|<!-->|<!--->|<!--[\s\S]*?-->|<[?][\s\S]*?[?]>|<![A-Za-z][^>]*>|<!\[CDATA\[[\s\S]*?\]\]>)",
        open_tag(),
        close_tag()
    );
    Regex::new(&pattern).expect("valid inline html regex")
});

static TEXT_MARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<span((?:\s+[a-z-]+="[^"]*")+)\s*>([\s\S]*?)</span>"#).expect("valid text mark regex")
});

static TEXT_MARK_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-([a-z-]+)="([^"]*)""#).expect("valid text mark attribute regex"));

/// Start offsets of every maximal backtick run, keyed by run length
fn index_backtick_runs(subject: &str) -> HashMap<usize, Vec<usize>> {
    let bytes = subject.as_bytes();
    let mut runs: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        runs.entry(i - start).or_default().push(start);
    }
    runs
}

fn is_block_ref_id_char(b: u8) -> bool {
    is_ascii_letter_num(b) || b == b'-'
}

impl InlineParser<'_> {
    pub(super) fn parse_backticks(&mut self) -> bool {
        let bytes = self.subject.as_bytes();
        let start = self.pos;
        let mut after_open = start;
        while after_open < bytes.len() && bytes[after_open] == b'`' {
            after_open += 1;
        }
        let ticks = after_open - start;

        let runs = self
            .backtick_runs
            .get_or_insert_with(|| index_backtick_runs(&self.subject));
        let closer = runs.get(&ticks).and_then(|starts| {
            let i = starts.partition_point(|&s| s < after_open);
            starts.get(i).copied()
        });

        let Some(close) = closer else {
            self.pos = after_open;
            let literal = self.subject[start..after_open].to_string();
            self.append_text(literal);
            return true;
        };

        let mut content = self.subject[after_open..close].replace('\n', " ");
        if content.len() >= 2
            && content.starts_with(' ')
            && content.ends_with(' ')
            && content.bytes().any(|b| b != b' ')
        {
            content = content[1..content.len() - 1].to_string();
        }
        self.pos = close + ticks;
        self.append(NodeKind::CodeSpan { backticks: ticks }, content);
        true
    }

    pub(super) fn parse_autolink(&mut self) -> bool {
        let rest = &self.subject[self.pos..];
        let (destination, text, len) = if let Some(m) = EMAIL_AUTOLINK.captures(rest) {
            let address = m[1].to_string();
            (format!("mailto:{}", normalize_uri(&address)), address, m[0].len())
        } else if let Some(m) = URI_AUTOLINK.find(rest) {
            let uri = rest[1..m.end() - 1].to_string();
            (normalize_uri(&uri), uri, m.end())
        } else {
            return false;
        };
        self.pos += len;
        let mut link = Node::new(NodeKind::Link(LinkData {
            link_type: LinkType::Autolink,
            destination,
            title: String::new(),
        }));
        link.open = false;
        let link = self.tree.new_node_with(link);
        let text = self.tree.new_text(text);
        self.tree.node_mut(text).open = false;
        self.tree.append_child(link, text);
        self.tree.append_child(self.block, link);
        true
    }

    pub(super) fn parse_html_tag(&mut self) -> bool {
        let Some(m) = HTML_TAG.find(&self.subject[self.pos..]) else {
            return false;
        };
        let raw = m.as_str().to_string();
        self.pos += raw.len();
        self.append(NodeKind::InlineHtml, raw);
        true
    }

    /// `<span data-type="...">content</span>` produced by rich-text editors
    pub(super) fn parse_text_mark(&mut self) -> bool {
        if !self.options.text_mark {
            return false;
        }
        let Some(caps) = TEXT_MARK.captures(&self.subject[self.pos..]) else {
            return false;
        };
        let mut data = TextMarkData::default();
        let mut typed = false;
        for attr in TEXT_MARK_ATTR.captures_iter(&caps[1]) {
            let value = attr[2].to_string();
            match &attr[1] {
                "type" => {
                    typed = true;
                    data.types = value.split_whitespace().map(str::to_string).collect();
                }
                "href" => data.href = value,
                "title" => data.title = value,
                "id" => data.block_ref_id = value,
                "subtype" => data.block_ref_subtype = value,
                "content" => data.inline_math_content = value,
                _ => {}
            }
        }
        if !typed || data.types.is_empty() {
            return false;
        }

        let raw = &caps[2];
        let mut content = String::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw.as_bytes()[i] == b'&'
                && let Some((decoded, len)) = decode_entity(&raw[i..])
            {
                content.push_str(&decoded);
                i += len;
                continue;
            }
            let ch_len = raw[i..].chars().next().map_or(1, char::len_utf8);
            content.push_str(&raw[i..i + ch_len]);
            i += ch_len;
        }
        let len = caps[0].len();
        self.pos += len;
        self.append(NodeKind::TextMark(data), content);
        true
    }

    /// `$...$` on one line, or `$$...$$` inside a paragraph
    pub(super) fn parse_inline_math(&mut self) -> bool {
        if !self.options.inline_math {
            return false;
        }
        let bytes = self.subject.as_bytes();
        let start = self.pos;
        let allow_digit = self.options.inline_math_allow_digit_after_open_marker;

        if peek(bytes, start + 1) == b'$' {
            let body = start + 2;
            let Some(len) = self.subject[body..].find("$$") else {
                return false;
            };
            let content = &self.subject[body..body + len];
            if content.trim().is_empty() || content.contains('\n') {
                return false;
            }
            let content = content.to_string();
            self.pos = body + len + 2;
            self.append(NodeKind::InlineMath, content);
            return true;
        }

        if !allow_digit && is_digit(peek(bytes, start + 1)) {
            return false;
        }
        let mut i = start + 1;
        let close = loop {
            match peek(bytes, i) {
                0 if i >= bytes.len() => return false,
                b'\n' => return false,
                b'$' if i > start + 1 && bytes[i - 1] != b'\\' => {
                    if !allow_digit && is_digit(peek(bytes, i + 1)) {
                        i += 1;
                        continue;
                    }
                    break i;
                }
                _ => i += 1,
            }
        };
        let content = &self.subject[start + 1..close];
        if content.trim().is_empty() {
            return false;
        }
        let content = content.to_string();
        self.pos = close + 1;
        self.append(NodeKind::InlineMath, content);
        true
    }

    /// `((id))`, `((id "static text"))` or `((id 'dynamic text'))`
    pub(super) fn parse_block_ref(&mut self) -> bool {
        if !self.options.block_ref {
            return false;
        }
        let bytes = self.subject.as_bytes();
        let start = self.pos;
        if peek(bytes, start + 1) != b'(' {
            return false;
        }
        let id_start = start + 2;
        let mut i = id_start;
        while is_block_ref_id_char(peek(bytes, i)) {
            i += 1;
        }
        if i == id_start {
            return false;
        }
        let id = self.subject[id_start..i].to_string();

        let mut text = None;
        let mut subtype = BlockRefSubtype::Dynamic;
        if is_space_or_tab(peek(bytes, i)) {
            while is_space_or_tab(peek(bytes, i)) {
                i += 1;
            }
            let quote = peek(bytes, i);
            if quote != b'"' && quote != b'\'' {
                return false;
            }
            let text_start = i + 1;
            let Some(len) = bytes[text_start..].iter().position(|&b| b == quote || b == b'\n') else {
                return false;
            };
            if bytes[text_start + len] != quote {
                return false;
            }
            text = Some(self.subject[text_start..text_start + len].to_string());
            if quote == b'"' {
                subtype = BlockRefSubtype::Static;
            }
            i = text_start + len + 1;
            while is_space_or_tab(peek(bytes, i)) {
                i += 1;
            }
        }
        if !self.subject[i..].starts_with("))") {
            return false;
        }
        self.pos = i + 2;
        self.append(NodeKind::BlockRef(BlockRefData { id, text, subtype }), "");
        true
    }
}
