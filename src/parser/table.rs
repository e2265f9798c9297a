//! GFM tables, recognized when a paragraph closes

use indextree::NodeId;
use log::trace;

use super::blocks::BlockParser;
use crate::ast::{Alignment, Node, NodeKind};
use crate::token::{split_unescaped, trim_whitespace};

/// Split a table row into trimmed cells, honouring escaped pipes
fn split_row(line: &str) -> Vec<String> {
    let mut row = trim_whitespace(line);
    if let Some(rest) = row.strip_prefix('|') {
        row = rest;
    }
    if row.ends_with('|') && !row.ends_with("\\|") {
        row = &row[..row.len() - 1];
    }
    split_unescaped(row, b'|')
        .into_iter()
        .map(|cell| trim_whitespace(cell).replace("\\|", "|"))
        .collect()
}

/// Parse a delimiter row such as `| :-- | :-: | --: |` into column alignments
fn parse_delimiter_row(line: &str) -> Option<Vec<Alignment>> {
    let trimmed = trim_whitespace(line);
    if trimmed.is_empty() || !trimmed.contains('-') {
        return None;
    }
    split_row(trimmed)
        .iter()
        .map(|cell| {
            let left = cell.starts_with(':');
            let right = cell.ends_with(':') && cell.len() > 1;
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Alignment::Center,
                (true, false) => Alignment::Left,
                (false, true) => Alignment::Right,
                (false, false) => Alignment::None,
            })
        })
        .collect()
}

/// Alignments when `header` and `delimiter` form the top of a table
fn header_alignments(header: &str, delimiter: &str) -> Option<Vec<Alignment>> {
    if !header.contains('|') && !delimiter.contains('|') {
        return None;
    }
    let aligns = parse_delimiter_row(delimiter)?;
    if split_row(header).len() != aligns.len() {
        return None;
    }
    Some(aligns)
}

/// Whether the current line is a delimiter row completing a table header
/// with the last line of the open paragraph
pub(crate) fn continues_paragraph(p: &BlockParser, container: NodeId) -> bool {
    if !matches!(p.tree.kind(container), NodeKind::Paragraph) {
        return false;
    }
    let Some(header) = p.tree.tokens(container).lines().next_back() else {
        return false;
    };
    header_alignments(header, &p.line[p.next_nonspace..]).is_some()
}

fn closed_node(kind: NodeKind, line: usize) -> Node {
    let mut node = Node::new(kind);
    node.open = false;
    node.line = line;
    node
}

fn append_row(p: &mut BlockParser, parent: NodeId, cells: Vec<String>, aligns: &[Alignment], line: usize) {
    let row = p.tree.new_node_with(closed_node(NodeKind::TableRow, line));
    p.tree.append_child(parent, row);
    let mut cells = cells.into_iter();
    for &align in aligns {
        let mut cell = closed_node(NodeKind::TableCell(align), line);
        cell.tokens = cells.next().unwrap_or_default();
        let cell = p.tree.new_node_with(cell);
        p.tree.append_child(row, cell);
    }
}

/// Turn the table part of a closing paragraph into a `Table` node.
///
/// Lines before the header row stay in the paragraph; when none remain the
/// paragraph is removed.
pub(crate) fn extract_table(p: &mut BlockParser, block: NodeId) -> bool {
    let tokens = p.tree.tokens(block).to_string();
    let lines: Vec<&str> = tokens.lines().collect();
    let Some((header_index, aligns)) = (1..lines.len()).find_map(|i| {
        header_alignments(lines[i - 1], lines[i]).map(|aligns| (i - 1, aligns))
    }) else {
        return false;
    };

    let first_line = p.tree.node(block).line + header_index;
    trace!(
        "line {}: table with {} columns",
        first_line,
        aligns.len()
    );
    let table = p
        .tree
        .new_node_with(closed_node(NodeKind::Table(aligns.clone()), first_line));
    p.tree.insert_after(block, table);

    let head = p.tree.new_node_with(closed_node(NodeKind::TableHead, first_line));
    p.tree.append_child(table, head);
    append_row(p, head, split_row(lines[header_index]), &aligns, first_line);
    for (offset, line) in lines[header_index + 2..].iter().enumerate() {
        append_row(p, table, split_row(line), &aligns, first_line + 2 + offset);
    }

    if header_index == 0 {
        p.tree.unlink(block);
    } else {
        let kept = lines[..header_index].join("\n") + "\n";
        p.tree.node_mut(block).tokens = kept;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::tree::Tree;

    fn parse_blocks(input: &str) -> Tree {
        let options = Options::default();
        let mut parser = BlockParser::new(&options);
        for line in crate::lexer::Lexer::new(input.as_bytes()) {
            parser.incorporate_line(&line);
        }
        parser.finish().tree
    }

    #[test]
    fn test_split_row() {
        assert_eq!(split_row("| a | b \\| c |"), vec!["a", "b | c"]);
        assert_eq!(split_row("a|b"), vec!["a", "b"]);
    }

    #[test]
    fn test_delimiter_row() {
        assert_eq!(
            parse_delimiter_row("| :-- | :-: | --: | - |"),
            Some(vec![
                Alignment::Left,
                Alignment::Center,
                Alignment::Right,
                Alignment::None
            ])
        );
        assert_eq!(parse_delimiter_row("| -x- |"), None);
        assert_eq!(parse_delimiter_row("| : |"), None);
    }

    #[test]
    fn test_table_after_paragraph_lines() {
        let tree = parse_blocks("intro\n| a | b |\n| - | - |\n| 1 | 2 |\n");
        let kinds: Vec<_> = tree
            .children(tree.root())
            .map(|id| tree.kind(id).name())
            .collect();
        assert_eq!(kinds, vec!["NodeParagraph", "NodeTable"]);
        let table = tree.last_child(tree.root()).unwrap();
        assert_eq!(tree.children(table).count(), 2);
        let body_row = tree.last_child(table).unwrap();
        let cells: Vec<_> = tree
            .children(body_row)
            .map(|c| tree.tokens(c).to_string())
            .collect();
        assert_eq!(cells, vec!["1", "2"]);
    }

    #[test]
    fn test_delimiter_row_beats_setext() {
        let tree = parse_blocks("a | b\n--|--\n");
        let first = tree.first_child(tree.root()).unwrap();
        assert!(matches!(tree.kind(first), NodeKind::Table(_)));
    }

    #[test]
    fn test_mismatched_columns_stay_paragraph() {
        let tree = parse_blocks("| a | b |\n| - |\n");
        let first = tree.first_child(tree.root()).unwrap();
        assert!(matches!(tree.kind(first), NodeKind::Paragraph));
    }
}
