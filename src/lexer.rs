//! Line splitter for raw input bytes

use std::borrow::Cow;

/// Forward-only cursor yielding normalized lines.
///
/// Every line ends with `\n`. `\r\n` and lone `\r` become `\n`, NUL becomes
/// U+FFFD, invalid UTF-8 is replaced and a leading byte order mark is dropped.
pub struct Lexer<'a> {
    input: Cow<'a, str>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        let input = input.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(input);
        Lexer {
            input: String::from_utf8_lossy(input),
            pos: 0,
        }
    }

    pub fn next_line(&mut self) -> Option<String> {
        let bytes = self.input.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }

        let start = self.pos;
        let mut end = start;
        while end < bytes.len() && bytes[end] != b'\n' && bytes[end] != b'\r' {
            end += 1;
        }

        let mut line = self.input[start..end].replace('\0', "\u{FFFD}");
        line.push('\n');

        self.pos = end;
        if self.pos < bytes.len() {
            if bytes[self.pos] == b'\r' && self.pos + 1 < bytes.len() && bytes[self.pos + 1] == b'\n' {
                self.pos += 2;
            } else {
                self.pos += 1;
            }
        }
        Some(line)
    }
}

impl Iterator for Lexer<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(input: &[u8]) -> Vec<String> {
        Lexer::new(input).collect()
    }

    #[test]
    fn test_line_endings_are_normalized() {
        assert_eq!(lines(b"a\r\nb\rc\n"), vec!["a\n", "b\n", "c\n"]);
    }

    #[test]
    fn test_missing_final_newline_is_added() {
        assert_eq!(lines(b"foo"), vec!["foo\n"]);
        assert!(lines(b"").is_empty());
    }

    #[test]
    fn test_blank_lines_survive() {
        assert_eq!(lines(b"a\n\n\nb"), vec!["a\n", "\n", "\n", "b\n"]);
    }

    #[test]
    fn test_nul_and_invalid_utf8() {
        assert_eq!(lines(b"a\0b"), vec!["a\u{FFFD}b\n"]);
        assert_eq!(lines(b"x\xFFy"), vec!["x\u{FFFD}y\n"]);
    }

    #[test]
    fn test_bom_is_skipped() {
        assert_eq!(lines(b"\xEF\xBB\xBF# hi"), vec!["# hi\n"]);
    }
}
