//! Character-class predicates shared by the block and inline phases

use unicode_categories::UnicodeCategories;

pub const TAB_STOP: usize = 4;
pub const CODE_INDENT: usize = 4;

/// Space, tab, newline, carriage return, vertical tab or form feed
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

pub fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Unicode Zs category plus tab, line feed, form feed and carriage return
pub fn is_unicode_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0c' | '\r') || c.is_separator_space()
}

pub fn is_digit(b: u8) -> bool {
    b.is_ascii_digit()
}

pub fn is_hex_digit(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

pub fn is_ascii_letter(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

pub fn is_ascii_letter_num(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

/// Check if a byte is ASCII punctuation (can be backslash-escaped)
pub fn is_ascii_punct(b: u8) -> bool {
    matches!(
        b,
        b'!' | b'"'
            | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b'-'
            | b'.'
            | b'/'
            | b':'
            | b';'
            | b'<'
            | b'='
            | b'>'
            | b'?'
            | b'@'
            | b'['
            | b'\\'
            | b']'
            | b'^'
            | b'_'
            | b'`'
            | b'{'
            | b'|'
            | b'}'
            | b'~'
    )
}

/// Characters in the Unicode P (punctuation) or S (symbol) categories
pub fn is_unicode_punct(c: char) -> bool {
    if c.is_ascii() {
        return is_ascii_punct(c as u8);
    }
    c.is_punctuation() || c.is_symbol()
}

/// Bytes that may start a block construct; lines starting with anything
/// else skip the block-start recognizers.
pub fn is_marker(b: u8) -> bool {
    matches!(
        b,
        b'*' | b'_'
            | b'~'
            | b'^'
            | b'='
            | b'#'
            | b'`'
            | b'$'
            | b'['
            | b']'
            | b'('
            | b')'
            | b'!'
            | b'<'
            | b'>'
            | b'&'
            | b'\\'
            | b'{'
            | b'}'
            | b'|'
            | b':'
            | b';'
            | b'-'
            | b'+'
    ) || is_digit(b)
}

/// Byte at `i`, or 0 past the end
pub fn peek(s: &[u8], i: usize) -> u8 {
    s.get(i).copied().unwrap_or(0)
}

/// Length of the run of `b` at the start of `s`
pub fn accept(s: &[u8], b: u8) -> usize {
    s.iter().take_while(|&&c| c == b).count()
}

pub fn is_blank(s: &str) -> bool {
    s.bytes().all(is_whitespace)
}

pub fn trim_whitespace(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_ascii() && is_whitespace(c as u8))
}

/// Split on `sep`, skipping separators escaped with a backslash
pub fn split_unescaped(s: &str, sep: u8) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == sep {
            parts.push(&s[start..i]);
            start = i + 1;
        }
        i += 1;
    }
    parts.push(&s[start..]);
    parts
}

/// Char ending right before byte offset `pos`
pub fn char_before(s: &str, pos: usize) -> Option<char> {
    s.get(..pos).and_then(|p| p.chars().next_back())
}

/// Char starting at byte offset `pos`
pub fn char_at(s: &str, pos: usize) -> Option<char> {
    s.get(pos..).and_then(|p| p.chars().next())
}
