//! Link labels, destinations, titles and reference definitions

use std::collections::HashMap;

use unicode_casefold::UnicodeCaseFold;

use super::LinkRef;
use crate::token::{is_ascii_punct, is_hex_digit, is_space_or_tab, peek};

/// Longest link label, in characters, between the brackets
const MAX_LABEL_LEN: usize = 999;

/// Normalize a link label for reference lookup: trim, collapse internal
/// whitespace and apply Unicode case folding.
///
/// The label is given without its surrounding brackets.
pub fn normalize_label(label: &str) -> String {
    label
        .split([' ', '\t', '\n', '\r'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .case_fold()
        .collect()
}

/// Process backslash escapes and entity references
pub(crate) fn unescape_string(text: &str) -> String {
    if !text.contains(['\\', '&']) {
        return text.to_string();
    }
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut plain_start = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if is_ascii_punct(peek(bytes, i + 1)) => {
                out.push_str(&text[plain_start..i]);
                out.push(bytes[i + 1] as char);
                i += 2;
                plain_start = i;
            }
            b'&' => match decode_entity(&text[i..]) {
                Some((decoded, len)) => {
                    out.push_str(&text[plain_start..i]);
                    out.push_str(&decoded);
                    i += len;
                    plain_start = i;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    out.push_str(&text[plain_start..]);
    out
}

/// Named references that expand to two code points, which html-escape
/// truncates to the first. Sorted by name.
static TWO_CODE_POINT_ENTITIES: &[(&str, &str)] = &[
    ("NotEqualTilde", "\u{2242}\u{0338}"),
    ("NotGreaterFullEqual", "\u{2267}\u{0338}"),
    ("NotGreaterGreater", "\u{226B}\u{0338}"),
    ("NotGreaterSlantEqual", "\u{2A7E}\u{0338}"),
    ("NotHumpDownHump", "\u{224E}\u{0338}"),
    ("NotHumpEqual", "\u{224F}\u{0338}"),
    ("NotLeftTriangleBar", "\u{29CF}\u{0338}"),
    ("NotLessLess", "\u{226A}\u{0338}"),
    ("NotLessSlantEqual", "\u{2A7D}\u{0338}"),
    ("NotNestedGreaterGreater", "\u{2AA2}\u{0338}"),
    ("NotNestedLessLess", "\u{2AA1}\u{0338}"),
    ("NotPrecedesEqual", "\u{2AAF}\u{0338}"),
    ("NotRightTriangleBar", "\u{29D0}\u{0338}"),
    ("NotSquareSubset", "\u{228F}\u{0338}"),
    ("NotSquareSuperset", "\u{2290}\u{0338}"),
    ("NotSubset", "\u{2282}\u{20D2}"),
    ("NotSucceedsEqual", "\u{2AB0}\u{0338}"),
    ("NotSucceedsTilde", "\u{227F}\u{0338}"),
    ("NotSuperset", "\u{2283}\u{20D2}"),
    ("ThickSpace", "\u{205F}\u{200A}"),
    ("acE", "\u{223E}\u{0333}"),
    ("bne", "\u{003D}\u{20E5}"),
    ("bnequiv", "\u{2261}\u{20E5}"),
    ("caps", "\u{2229}\u{FE00}"),
    ("cups", "\u{222A}\u{FE00}"),
    ("fjlig", "\u{0066}\u{006A}"),
    ("gesl", "\u{22DB}\u{FE00}"),
    ("gvertneqq", "\u{2269}\u{FE00}"),
    ("gvnE", "\u{2269}\u{FE00}"),
    ("lates", "\u{2AAD}\u{FE00}"),
    ("lesg", "\u{22DA}\u{FE00}"),
    ("lvertneqq", "\u{2268}\u{FE00}"),
    ("lvnE", "\u{2268}\u{FE00}"),
    ("nGg", "\u{22D9}\u{0338}"),
    ("nGt", "\u{226B}\u{20D2}"),
    ("nGtv", "\u{226B}\u{0338}"),
    ("nLl", "\u{22D8}\u{0338}"),
    ("nLt", "\u{226A}\u{20D2}"),
    ("nLtv", "\u{226A}\u{0338}"),
    ("nang", "\u{2220}\u{20D2}"),
    ("napE", "\u{2A70}\u{0338}"),
    ("napid", "\u{224B}\u{0338}"),
    ("nbump", "\u{224E}\u{0338}"),
    ("nbumpe", "\u{224F}\u{0338}"),
    ("ncongdot", "\u{2A6D}\u{0338}"),
    ("nedot", "\u{2250}\u{0338}"),
    ("nesim", "\u{2242}\u{0338}"),
    ("ngE", "\u{2267}\u{0338}"),
    ("ngeqq", "\u{2267}\u{0338}"),
    ("ngeqslant", "\u{2A7E}\u{0338}"),
    ("nges", "\u{2A7E}\u{0338}"),
    ("nlE", "\u{2266}\u{0338}"),
    ("nleqq", "\u{2266}\u{0338}"),
    ("nleqslant", "\u{2A7D}\u{0338}"),
    ("nles", "\u{2A7D}\u{0338}"),
    ("nparsl", "\u{2AFD}\u{20E5}"),
    ("npart", "\u{2202}\u{0338}"),
    ("npre", "\u{2AAF}\u{0338}"),
    ("npreceq", "\u{2AAF}\u{0338}"),
    ("nrarrc", "\u{2933}\u{0338}"),
    ("nrarrw", "\u{219D}\u{0338}"),
    ("nsce", "\u{2AB0}\u{0338}"),
    ("nsubE", "\u{2AC5}\u{0338}"),
    ("nsubset", "\u{2282}\u{20D2}"),
    ("nsubseteqq", "\u{2AC5}\u{0338}"),
    ("nsucceq", "\u{2AB0}\u{0338}"),
    ("nsupE", "\u{2AC6}\u{0338}"),
    ("nsupset", "\u{2283}\u{20D2}"),
    ("nsupseteqq", "\u{2AC6}\u{0338}"),
    ("nvap", "\u{224D}\u{20D2}"),
    ("nvge", "\u{2265}\u{20D2}"),
    ("nvgt", "\u{003E}\u{20D2}"),
    ("nvle", "\u{2264}\u{20D2}"),
    ("nvlt", "\u{003C}\u{20D2}"),
    ("nvltrie", "\u{22B4}\u{20D2}"),
    ("nvrtrie", "\u{22B5}\u{20D2}"),
    ("nvsim", "\u{223C}\u{20D2}"),
    ("race", "\u{223D}\u{0331}"),
    ("smtes", "\u{2AAC}\u{FE00}"),
    ("sqcaps", "\u{2293}\u{FE00}"),
    ("sqcups", "\u{2294}\u{FE00}"),
    ("varsubsetneq", "\u{228A}\u{FE00}"),
    ("varsubsetneqq", "\u{2ACB}\u{FE00}"),
    ("varsupsetneq", "\u{228B}\u{FE00}"),
    ("varsupsetneqq", "\u{2ACC}\u{FE00}"),
    ("vnsub", "\u{2282}\u{20D2}"),
    ("vnsup", "\u{2283}\u{20D2}"),
    ("vsubnE", "\u{2ACB}\u{FE00}"),
    ("vsubne", "\u{228A}\u{FE00}"),
    ("vsupnE", "\u{2ACC}\u{FE00}"),
    ("vsupne", "\u{228B}\u{FE00}"),
];

/// Decode an entity or numeric character reference at the start of `text`.
///
/// Returns the decoded text and the number of bytes consumed.
pub(crate) fn decode_entity(text: &str) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    if peek(bytes, 0) != b'&' {
        return None;
    }

    if peek(bytes, 1) == b'#' {
        let hex = matches!(peek(bytes, 2), b'x' | b'X');
        let digits_start = if hex { 3 } else { 2 };
        let max_digits = if hex { 6 } else { 7 };
        let digits = bytes[digits_start.min(bytes.len())..]
            .iter()
            .take_while(|&&b| if hex { is_hex_digit(b) } else { b.is_ascii_digit() })
            .count();
        let end = digits_start + digits;
        if digits == 0 || digits > max_digits || peek(bytes, end) != b';' {
            return None;
        }
        let radix = if hex { 16 } else { 10 };
        let code = u32::from_str_radix(&text[digits_start..end], radix).ok()?;
        let c = match code {
            0 => '\u{FFFD}',
            code => char::from_u32(code).unwrap_or('\u{FFFD}'),
        };
        return Some((c.to_string(), end + 1));
    }

    let name_len = bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    let end = 1 + name_len;
    if name_len == 0 || name_len > 32 || peek(bytes, end) != b';' {
        return None;
    }
    let name = &text[1..end];
    if let Ok(i) = TWO_CODE_POINT_ENTITIES.binary_search_by(|(entry, _)| entry.cmp(&name)) {
        return Some((TWO_CODE_POINT_ENTITIES[i].1.to_string(), end + 1));
    }
    let candidate = &text[..=end];
    let decoded = html_escape::decode_html_entities(candidate);
    // Only complete entities count; legacy forms without `;` decode to a prefix
    if decoded == candidate || (decoded.ends_with(';') && name != "semi") {
        return None;
    }
    Some((decoded.into_owned(), end + 1))
}

/// Percent-encode a destination, keeping URL punctuation and valid `%XX` escapes
pub(crate) fn normalize_uri(uri: &str) -> String {
    const SAFE: &[u8] = b";/?:@&=+$,-_.!~*'()#";
    let bytes = uri.as_bytes();
    let mut out = String::with_capacity(uri.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' && is_hex_digit(peek(bytes, i + 1)) && is_hex_digit(peek(bytes, i + 2)) {
            out.push_str(&uri[i..i + 3]);
            i += 3;
            continue;
        }
        if b.is_ascii_alphanumeric() || SAFE.contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
        i += 1;
    }
    out
}

/// Skip spaces and tabs with at most one newline
pub(crate) fn spnl(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = pos;
    while is_space_or_tab(peek(bytes, i)) {
        i += 1;
    }
    if peek(bytes, i) == b'\n' {
        i += 1;
        while is_space_or_tab(peek(bytes, i)) {
            i += 1;
        }
    }
    i
}

/// Length in bytes of a link label `[...]` at `pos`, brackets included, or 0
pub(crate) fn scan_link_label(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    if peek(bytes, pos) != b'[' {
        return 0;
    }
    let mut i = pos + 1;
    let mut chars = 0;
    while i < bytes.len() {
        match bytes[i] {
            b']' => return i + 1 - pos,
            b'[' => return 0,
            b'\\' if i + 1 < bytes.len() => {
                i += 1;
                chars += 1;
                i += utf8_len(bytes[i]);
            }
            b => i += utf8_len(b),
        }
        chars += 1;
        if chars > MAX_LABEL_LEN {
            return 0;
        }
    }
    0
}

fn utf8_len(first: u8) -> usize {
    match first {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

/// Scan a link destination at `pos`, returning the normalized URI and the end position
pub(crate) fn scan_link_destination(text: &str, pos: usize) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    if peek(bytes, pos) == b'<' {
        let mut i = pos + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'>' => {
                    let raw = &text[pos + 1..i];
                    return Some((normalize_uri(&unescape_string(raw)), i + 1));
                }
                b'<' | b'\n' => return None,
                b'\\' if i + 1 < bytes.len() && bytes[i + 1] != b'\n' => i += 2,
                _ => i += 1,
            }
        }
        return None;
    }

    let mut i = pos;
    let mut open_parens = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if is_ascii_punct(peek(bytes, i + 1)) => i += 2,
            b'(' => {
                open_parens += 1;
                i += 1;
            }
            b')' => {
                if open_parens == 0 {
                    break;
                }
                open_parens -= 1;
                i += 1;
            }
            b if b <= b' ' => break,
            _ => i += 1,
        }
    }
    if i == pos && peek(bytes, i) != b')' {
        return None;
    }
    if open_parens != 0 {
        return None;
    }
    let raw = &text[pos..i];
    Some((normalize_uri(&unescape_string(raw)), i))
}

/// Scan a quoted or parenthesized title at `pos`, returning its unescaped text and end
pub(crate) fn scan_link_title(text: &str, pos: usize) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    let close = match peek(bytes, pos) {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            b if b == close => {
                let raw = &text[pos + 1..i];
                return Some((unescape_string(raw), i + 1));
            }
            b'(' if close == b')' => return None,
            _ => i += 1,
        }
    }
    None
}

/// Whether only spaces remain before the end of the line at `pos`
fn at_line_end(text: &str, pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = pos;
    while is_space_or_tab(peek(bytes, i)) {
        i += 1;
    }
    match peek(bytes, i) {
        b'\n' => Some(i + 1),
        0 if i >= bytes.len() => Some(i),
        _ => None,
    }
}

/// Parse one link reference definition at the start of `text`.
///
/// On success the definition is added to `refmap` unless its label is
/// already defined, and the number of bytes consumed is returned.
pub(crate) fn parse_reference(text: &str, refmap: &mut HashMap<String, LinkRef>) -> Option<usize> {
    let label_len = scan_link_label(text, 0);
    if label_len == 0 {
        return None;
    }
    let raw_label = &text[1..label_len - 1];
    if peek(text.as_bytes(), label_len) != b':' {
        return None;
    }
    let pos = spnl(text, label_len + 1);
    let (destination, after_dest) = scan_link_destination(text, pos)?;
    // A bare destination may not be empty in a definition
    if after_dest == pos {
        return None;
    }

    let before_title = after_dest;
    let title_pos = spnl(text, before_title);
    let titled = if title_pos != before_title {
        scan_link_title(text, title_pos)
    } else {
        None
    };

    let end = match titled {
        Some((title, after_title)) => match at_line_end(text, after_title) {
            Some(end) => Some((title, end)),
            // Junk after the title: retry with the title as not part of the definition
            None => at_line_end(text, before_title).map(|end| (String::new(), end)),
        },
        None => at_line_end(text, before_title).map(|end| (String::new(), end)),
    };
    let (title, consumed) = end?;

    let key = normalize_label(raw_label);
    if key.is_empty() {
        return None;
    }
    refmap.entry(key).or_insert(LinkRef { destination, title });
    Some(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Foo \n  BAR "), "foo bar");
        assert_eq!(normalize_label("ẞ"), "ss");
        assert_eq!(normalize_label(" \n"), "");
    }

    #[test]
    fn test_unescape_string() {
        assert_eq!(unescape_string(r"\*foo\*"), "*foo*");
        assert_eq!(unescape_string(r"a\b"), r"a\b");
        assert_eq!(unescape_string("&amp; &#35; &#x41; &#0;"), "& # A \u{FFFD}");
        assert_eq!(unescape_string("&nosuchentity;"), "&nosuchentity;");
    }

    #[test]
    fn test_decode_two_code_point_entities() {
        assert_eq!(decode_entity("&ngE; x"), Some(("\u{2267}\u{0338}".to_string(), 5)));
        assert_eq!(decode_entity("&fjlig;"), Some(("fj".to_string(), 7)));
        assert_eq!(decode_entity("&ge;"), Some(("\u{2265}".to_string(), 4)));
        assert!(TWO_CODE_POINT_ENTITIES.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_normalize_uri() {
        assert_eq!(normalize_uri("/url?a=b&c#frag"), "/url?a=b&c#frag");
        assert_eq!(normalize_uri("a b"), "a%20b");
        assert_eq!(normalize_uri("%20ok%zz"), "%20ok%25zz");
        assert_eq!(normalize_uri("ä"), "%C3%A4");
        assert_eq!(normalize_uri("[x]\\"), "%5Bx%5D%5C");
    }

    #[test]
    fn test_scan_destination() {
        assert_eq!(
            scan_link_destination("<a b>", 0),
            Some(("a%20b".to_string(), 5))
        );
        assert_eq!(
            scan_link_destination("a(b)c) rest", 0),
            Some(("a(b)c".to_string(), 5))
        );
        assert_eq!(scan_link_destination("a(b", 0), None);
        assert_eq!(scan_link_destination(")", 0), Some((String::new(), 0)));
        assert_eq!(scan_link_destination("<a\nb>", 0), None);
    }

    #[test]
    fn test_scan_label() {
        assert_eq!(scan_link_label("[foo] x", 0), 5);
        assert_eq!(scan_link_label("[a\\]b]", 0), 6);
        assert_eq!(scan_link_label("[a[b]", 0), 0);
        assert_eq!(scan_link_label("[unclosed", 0), 0);
    }

    #[test]
    fn test_parse_reference() {
        let mut refmap = HashMap::new();
        let text = "[Foo]: /url \"title\"\nrest";
        assert_eq!(parse_reference(text, &mut refmap), Some(20));
        assert_eq!(
            refmap["foo"],
            LinkRef {
                destination: "/url".to_string(),
                title: "title".to_string()
            }
        );

        // first definition wins
        assert_eq!(parse_reference("[foo]: /other\n", &mut refmap), Some(14));
        assert_eq!(refmap["foo"].destination, "/url");
    }

    #[test]
    fn test_parse_reference_title_junk_falls_back() {
        let mut refmap = HashMap::new();
        let text = "[foo]: /url\n\"title\" ok\n";
        assert_eq!(parse_reference(text, &mut refmap), Some(12));
        assert_eq!(refmap["foo"].title, "");

        assert_eq!(parse_reference("[bar]: /url \"title\" ok\n", &mut refmap), None);
        assert_eq!(parse_reference("[]: /url\n", &mut refmap), None);
        assert_eq!(parse_reference("[baz]:\n", &mut refmap), None);
    }
}
