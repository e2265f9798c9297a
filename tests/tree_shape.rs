use markloom::{NodeKind, Options, Tree, parse, parse_with_ids};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Compact outline of a tree: `Kind(child child)`, text as a quoted string
fn outline(tree: &Tree) -> String {
    fn render(tree: &Tree, id: indextree::NodeId, out: &mut String) {
        let node = tree.node(id);
        if node.kind.is_marker() {
            return;
        }
        if let NodeKind::Text = node.kind {
            out.push_str(&format!("{:?}", node.tokens));
            return;
        }
        out.push_str(node.kind.name().trim_start_matches("Node"));
        match &node.kind {
            NodeKind::ListItem(data) if data.kind == markloom::ast::ListKind::Task => {
                out.push_str(if data.checked { "[x]" } else { "[ ]" });
            }
            NodeKind::List(data) => out.push_str(if data.tight { "[tight]" } else { "[loose]" }),
            _ => {}
        }
        let children: Vec<_> = tree
            .children(id)
            .filter(|&c| !tree.kind(c).is_marker())
            .collect();
        if !children.is_empty() {
            out.push('(');
            for (i, child) in children.into_iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                render(tree, child, out);
            }
            out.push(')');
        }
    }
    let mut out = String::new();
    for (i, child) in tree.children(tree.root()).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        render(tree, child, &mut out);
    }
    out
}

fn shape(input: &str, options: &Options) -> String {
    outline(&parse(input.as_bytes(), options).expect("parse"))
}

#[rstest]
#[case("*foo*", r#"Paragraph(Emphasis("foo"))"#)]
#[case("> foo\n", r#"Blockquote(Paragraph("foo"))"#)]
#[case("[foo](bar \"baz\n", r#"Paragraph("[foo](bar \"baz")"#)]
#[case(
    "1. foo\n2.\n3. bar\n",
    r#"List[tight](ListItem(Paragraph("foo")) ListItem ListItem(Paragraph("bar")))"#
)]
#[case("# Title\n\ntext\n", r#"Heading("Title") Paragraph("text")"#)]
#[case("```rust\nfn main() {}\n```\n", "CodeBlock")]
#[case("***\n", "ThematicBreak")]
fn test_commonmark_shapes(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(shape(input, &Options::commonmark()), expected);
}

#[rstest]
#[case("café ok\n", r#"Paragraph("café ok")"#)]
#[case("naïve résumé\n", r#"Paragraph("naïve résumé")"#)]
#[case("中文段落\n", r#"Paragraph("中文段落")"#)]
#[case("señor café\n", r#"Paragraph("señor café")"#)]
#[case("caf\u{FFFD} https://example.com\n", r#"Paragraph("caf� " Link("https://example.com"))"#)]
fn test_non_ascii_text_with_default_options(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(shape(input, &Options::default()), expected);
}

#[test]
fn test_task_list_items() {
    assert_eq!(
        shape("- [ ] foo\n- [x] bar\n", &Options::default()),
        r#"List[tight](ListItem[ ](Paragraph("foo")) ListItem[x](Paragraph("bar")))"#
    );
}

#[rstest]
#[case("*foo *bar**", r#"Paragraph(Emphasis("foo " Emphasis("bar")))"#)]
#[case("*foo**bar*", r#"Paragraph(Emphasis("foo**bar"))"#)]
#[case("**foo*bar**", r#"Paragraph(Strong("foo*bar"))"#)]
#[case("foo***bar***baz", r#"Paragraph("foo" Emphasis(Strong("bar")) "baz")"#)]
#[case("***foo** bar*", r#"Paragraph(Emphasis(Strong("foo") " bar"))"#)]
fn test_rule_of_three(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(shape(input, &Options::commonmark()), expected);
}

#[rstest]
#[case("[]()", "Paragraph(Link)")]
#[case("[foo", r#"Paragraph("[foo")"#)]
#[case("[foo]", r#"Paragraph("[foo]")"#)]
#[case("![foo", r#"Paragraph("![foo")"#)]
#[case("foo]", r#"Paragraph("foo]")"#)]
#[case("[link](/uri \"title\"", r#"Paragraph("[link](/uri \"title\"")"#)]
fn test_bracket_degradation(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(shape(input, &Options::commonmark()), expected);
}

#[rstest]
#[case("- a\n- b\n", "List[tight]")]
#[case("- a\n\n- b\n", "List[loose]")]
#[case("- a\n\n  b\n", "List[loose]")]
#[case("- a\n  - b\n\n  c\n", "List[loose]")]
#[case("- a\n  - b\n\n    c\n- d\n", "List[tight]")]
#[case("- a\n- b\n\n", "List[tight]")]
fn test_list_tightness(#[case] input: &str, #[case] expected: &str) {
    let outline = shape(input, &Options::commonmark());
    assert!(
        outline.starts_with(expected),
        "{:?} gave {}",
        input,
        outline
    );
}

fn ial_options() -> Options {
    Options {
        kramdown_block_ial: true,
        ..Options::default()
    }
}

#[test]
fn test_ial_binds_to_previous_sibling() {
    let mut counter = 0;
    let mut ids = || {
        counter += 1;
        format!("gen-{}", counter)
    };
    let tree = parse_with_ids(b"first\n\nsecond\n{: id=\"x\"}\n", &ial_options(), &mut ids).unwrap();
    let paragraphs: Vec<_> = tree
        .children(tree.root())
        .filter(|&c| matches!(tree.kind(c), NodeKind::Paragraph))
        .collect();
    assert_eq!(tree.node(paragraphs[1]).id.as_deref(), Some("x"));
    assert_ne!(tree.node(paragraphs[0]).id.as_deref(), Some("x"));
    assert!(tree.node(paragraphs[0]).id.as_deref().is_some_and(|id| id.starts_with("gen-")));
}

#[test]
fn test_ial_without_sibling_binds_to_parent() {
    let tree = parse(b"> {: id=\"quote\"}\n", &ial_options()).unwrap();
    let quote = tree.first_child(tree.root()).unwrap();
    assert!(matches!(tree.kind(quote), NodeKind::Blockquote));
    assert_eq!(tree.node(quote).id.as_deref(), Some("quote"));
}

#[test]
fn test_ial_inside_list_item_binds_to_block_in_item() {
    let tree = parse(b"- item\n  {: id=\"para\"}\n", &ial_options()).unwrap();
    let list = tree.first_child(tree.root()).unwrap();
    let item = tree.first_child(list).unwrap();
    let para = tree.first_child(item).unwrap();
    assert_eq!(tree.node(para).id.as_deref(), Some("para"));
    assert_ne!(tree.node(item).id.as_deref(), Some("para"));
}

#[test]
fn test_extension_blocks_shapes() {
    let options = Options {
        super_block: true,
        custom_block: true,
        git_conflict: true,
        ..Options::default()
    };
    assert_eq!(
        shape("$$\nx\n$$\n\n> [!NOTE]\n> body\n", &options),
        r#"MathBlock Callout(Paragraph("body"))"#
    );
    assert_eq!(
        shape("{{{col\na\n\nb\n}}}\n", &options),
        r#"SuperBlock(Paragraph("a") Paragraph("b"))"#
    );
}

#[test]
fn test_links_resolve_through_definitions() {
    let tree = parse(b"[Foo Bar]\n\n[foo   bar]: /dest 'T'\n", &Options::commonmark()).unwrap();
    let para = tree.first_child(tree.root()).unwrap();
    let link = tree.first_child(para).unwrap();
    match tree.kind(link) {
        NodeKind::Link(data) => {
            assert_eq!(data.destination, "/dest");
            assert_eq!(data.title, "T");
        }
        other => panic!("expected a link, got {:?}", other),
    }
}
