//! HTML and Markdown output for a parsed tree

mod markdown;

use indextree::NodeId;

use crate::ast::{Alignment, ListKind, Node, NodeKind};
use crate::options::Options;
use crate::tree::Tree;
use crate::walk::{WalkStatus, walk};

pub use markdown::format_markdown;

/// HTML renderer over a [`Tree`]
pub struct HtmlRenderer<'a> {
    tree: &'a Tree,
    options: &'a Options,
    out: String,
    /// Nonzero inside image descriptions, where only text is emitted
    disable_tags: usize,
    footnote_index: usize,
}

impl<'a> HtmlRenderer<'a> {
    pub fn new(tree: &'a Tree, options: &'a Options) -> Self {
        HtmlRenderer {
            tree,
            options,
            out: String::new(),
            disable_tags: 0,
            footnote_index: 0,
        }
    }

    pub fn render(mut self) -> String {
        let tree = self.tree;
        walk(tree, tree.root(), |id, entering| self.visit(id, entering));
        self.out
    }

    fn lit(&mut self, s: &str) {
        self.out.push_str(s);
    }

    /// Newline unless output is empty or already ends with one
    fn cr(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn text(&mut self, s: &str) {
        self.out.push_str(&escape_html(s));
    }

    /// Open tag with the node's attribute list appended
    fn open(&mut self, tag: &str, node: &Node, extra: &[(&str, String)]) {
        self.out.push('<');
        self.out.push_str(tag);
        for (key, value) in extra {
            if node.ial_value(key).is_none() {
                self.out.push_str(&format!(" {}=\"{}\"", key, escape_html(value)));
            }
        }
        if self.attribute_lists() {
            for (key, value) in &node.ial {
                self.out.push_str(&format!(" {}=\"{}\"", key, escape_html(value)));
            }
        }
        self.out.push('>');
    }

    fn attribute_lists(&self) -> bool {
        self.options.kramdown_block_ial || self.options.kramdown_span_ial
    }

    fn in_tight_list(&self, id: NodeId) -> bool {
        let Some(item) = self.tree.parent(id) else {
            return false;
        };
        if !matches!(self.tree.kind(item), NodeKind::ListItem(_)) {
            return false;
        }
        self.tree
            .parent(item)
            .is_some_and(|list| matches!(self.tree.kind(list), NodeKind::List(data) if data.tight))
    }

    fn visit(&mut self, id: NodeId, entering: bool) -> WalkStatus {
        let tree = self.tree;
        let node = tree.node(id);
        if !entering && renders_once(&node.kind) {
            return WalkStatus::Continue;
        }
        if self.disable_tags > 0 {
            return self.visit_plain(node, entering);
        }
        match &node.kind {
            NodeKind::Document | NodeKind::YamlFrontMatter => {}
            NodeKind::KramdownBlockIal | NodeKind::KramdownSpanIal => {}
            NodeKind::OpenMarker | NodeKind::CloseMarker => {}
            NodeKind::Paragraph => {
                if self.in_tight_list(id) {
                    return WalkStatus::Continue;
                }
                if entering {
                    self.cr();
                    self.open("p", node, &[]);
                } else {
                    self.lit("</p>");
                    self.cr();
                }
            }
            NodeKind::Heading(data) => {
                let tag = format!("h{}", data.level);
                if entering {
                    self.cr();
                    let extra: Vec<(&str, String)> =
                        data.id.iter().map(|anchor| ("id", anchor.clone())).collect();
                    self.open(&tag, node, &extra);
                } else {
                    self.lit(&format!("</{}>", tag));
                    self.cr();
                }
            }
            NodeKind::ThematicBreak => {
                self.cr();
                self.lit("<hr />");
                self.cr();
            }
            NodeKind::Blockquote => {
                if entering {
                    self.cr();
                    self.open("blockquote", node, &[]);
                    self.cr();
                } else {
                    self.cr();
                    self.lit("</blockquote>");
                    self.cr();
                }
            }
            NodeKind::Callout(data) => {
                if entering {
                    self.cr();
                    self.open(
                        "div",
                        node,
                        &[("class", "callout".to_string()), ("data-type", data.kind.to_ascii_lowercase())],
                    );
                    self.lit("<div class=\"callout-title\">");
                    let title = if data.title.is_empty() {
                        capitalize(&data.kind)
                    } else {
                        data.title.clone()
                    };
                    if !data.icon.is_empty() {
                        self.text(&data.icon);
                        self.lit(" ");
                    }
                    self.text(&title);
                    self.lit("</div>\n");
                } else {
                    self.cr();
                    self.lit("</div>");
                    self.cr();
                }
            }
            NodeKind::List(data) => {
                let tag = if data.is_ordered() { "ol" } else { "ul" };
                if entering {
                    self.cr();
                    let extra: Vec<(&str, String)> = if data.is_ordered() && data.start != 1 {
                        vec![("start", data.start.to_string())]
                    } else {
                        Vec::new()
                    };
                    self.open(tag, node, &extra);
                    self.cr();
                } else {
                    self.cr();
                    self.lit(&format!("</{}>", tag));
                    self.cr();
                }
            }
            NodeKind::ListItem(data) => {
                if entering {
                    if data.kind == ListKind::Task {
                        self.open("li", node, &[("class", "task-list-item".to_string())]);
                        let checked = if data.checked { " checked=\"\"" } else { "" };
                        self.lit(&format!("<input{} disabled=\"\" type=\"checkbox\" /> ", checked));
                    } else {
                        self.open("li", node, &[]);
                    }
                } else {
                    self.lit("</li>");
                    self.cr();
                }
            }
            NodeKind::CodeBlock(data) => {
                self.cr();
                let lang = data.info.split_whitespace().next().unwrap_or_default();
                self.lit("<pre>");
                if lang.is_empty() {
                    self.open("code", node, &[]);
                } else {
                    self.open("code", node, &[("class", format!("language-{}", lang))]);
                }
                self.text(&data.literal);
                self.lit("</code></pre>");
                self.cr();
            }
            NodeKind::HtmlBlock { .. } => {
                self.cr();
                self.lit(&node.tokens);
                self.cr();
            }
            NodeKind::MathBlock { .. } => {
                self.cr();
                self.open("div", node, &[("class", "language-math".to_string())]);
                self.text(&node.tokens);
                self.lit("</div>");
                self.cr();
            }
            NodeKind::GitConflict => {
                self.cr();
                self.open("div", node, &[("class", "git-conflict".to_string())]);
                self.text(&node.tokens);
                self.lit("</div>");
                self.cr();
            }
            NodeKind::CustomBlock(data) => {
                self.cr();
                self.open("div", node, &[("data-type", data.info.clone())]);
                self.text(&node.tokens);
                self.lit("</div>");
                self.cr();
            }
            NodeKind::SuperBlock(layout) => {
                if entering {
                    self.cr();
                    let layout = match layout {
                        crate::ast::SuperBlockLayout::Default => "row",
                        crate::ast::SuperBlockLayout::Row => "row",
                        crate::ast::SuperBlockLayout::Col => "col",
                    };
                    self.open(
                        "div",
                        node,
                        &[("data-type", "super-block".to_string()), ("data-sb-layout", layout.to_string())],
                    );
                    self.cr();
                } else {
                    self.cr();
                    self.lit("</div>");
                    self.cr();
                }
            }
            NodeKind::Toc => self.render_toc(),
            NodeKind::Table(_) => {
                if entering {
                    self.cr();
                    self.open("table", node, &[]);
                    self.cr();
                } else {
                    if tree.children(id).count() > 1 {
                        self.lit("</tbody>");
                        self.cr();
                    }
                    self.lit("</table>");
                    self.cr();
                }
            }
            NodeKind::TableHead => {
                if entering {
                    self.lit("<thead>");
                    self.cr();
                } else {
                    self.lit("</thead>");
                    self.cr();
                }
            }
            NodeKind::TableRow => {
                if entering {
                    let first_body_row = tree
                        .previous_sibling(id)
                        .is_some_and(|prev| matches!(tree.kind(prev), NodeKind::TableHead));
                    if first_body_row {
                        self.lit("<tbody>");
                        self.cr();
                    }
                    self.lit("<tr>");
                    self.cr();
                } else {
                    self.lit("</tr>");
                    self.cr();
                }
            }
            NodeKind::TableCell(align) => {
                let in_head = tree
                    .parent(id)
                    .and_then(|row| tree.parent(row))
                    .is_some_and(|p| matches!(tree.kind(p), NodeKind::TableHead));
                let tag = if in_head { "th" } else { "td" };
                if entering {
                    let extra: Vec<(&str, String)> = match align {
                        Alignment::None => Vec::new(),
                        Alignment::Left => vec![("align", "left".to_string())],
                        Alignment::Right => vec![("align", "right".to_string())],
                        Alignment::Center => vec![("align", "center".to_string())],
                    };
                    self.open(tag, node, &extra);
                } else {
                    self.lit(&format!("</{}>", tag));
                    self.cr();
                }
            }
            NodeKind::FootnotesDefBlock => {
                if entering {
                    self.cr();
                    self.lit("<div class=\"footnotes-defs-div\">");
                    self.lit("<hr class=\"footnotes-defs-hr\" />\n");
                    self.lit("<ol class=\"footnotes-defs-ol\">");
                    self.cr();
                } else {
                    self.lit("</ol></div>");
                    self.cr();
                }
            }
            NodeKind::FootnotesDef { .. } => {
                if entering {
                    self.footnote_index += 1;
                    let anchor = format!("footnotes-def-{}", self.footnote_index);
                    self.open("li", node, &[("id", anchor)]);
                    self.cr();
                } else {
                    self.cr();
                    self.lit("</li>");
                    self.cr();
                }
            }
            NodeKind::Text => self.text(&node.tokens),
            NodeKind::SoftBreak => self.lit("\n"),
            NodeKind::HardBreak => self.lit("<br />\n"),
            NodeKind::CodeSpan { .. } => {
                self.open("code", node, &[]);
                self.text(&node.tokens);
                self.lit("</code>");
            }
            NodeKind::Emphasis => self.inline_tag("em", node, entering),
            NodeKind::Strong => self.inline_tag("strong", node, entering),
            NodeKind::Strikethrough => self.inline_tag("del", node, entering),
            NodeKind::Mark => self.inline_tag("mark", node, entering),
            NodeKind::Sup => self.inline_tag("sup", node, entering),
            NodeKind::Sub => self.inline_tag("sub", node, entering),
            NodeKind::Tag => {
                if entering {
                    self.open("em", node, &[("data-type", "tag".to_string())]);
                } else {
                    self.lit("</em>");
                }
            }
            NodeKind::Link(data) => {
                if entering {
                    let mut extra = vec![("href", data.destination.clone())];
                    if !data.title.is_empty() {
                        extra.push(("title", data.title.clone()));
                    }
                    self.open("a", node, &extra);
                } else {
                    self.lit("</a>");
                }
            }
            NodeKind::Image(data) => {
                if entering {
                    self.lit(&format!("<img src=\"{}\" alt=\"", escape_html(&data.destination)));
                    self.disable_tags += 1;
                }
            }
            NodeKind::InlineHtml => self.lit(&node.tokens),
            NodeKind::InlineMath => {
                self.open("span", node, &[("class", "language-math".to_string())]);
                self.text(&node.tokens);
                self.lit("</span>");
            }
            NodeKind::FootnotesRef(footnote) => {
                self.lit(&format!(
                    "<sup class=\"footnotes-ref\" id=\"footnotes-ref-{0}\"><a href=\"#footnotes-def-{0}\">{0}</a></sup>",
                    footnote.index
                ));
            }
            NodeKind::BlockRef(block_ref) => {
                let subtype = match block_ref.subtype {
                    crate::ast::BlockRefSubtype::Static => "s",
                    crate::ast::BlockRefSubtype::Dynamic => "d",
                };
                self.open(
                    "span",
                    node,
                    &[
                        ("data-type", "block-ref".to_string()),
                        ("data-id", block_ref.id.clone()),
                        ("data-subtype", subtype.to_string()),
                    ],
                );
                self.text(block_ref.text.as_deref().unwrap_or(&block_ref.id));
                self.lit("</span>");
            }
            NodeKind::Emoji(emoji) => {
                if emoji.unicode.contains(['.', '/']) {
                    self.lit(&format!(
                        "<img alt=\"{0}\" class=\"emoji\" src=\"{1}\" title=\"{0}\" />",
                        escape_html(&emoji.alias),
                        escape_html(&emoji.unicode)
                    ));
                } else {
                    self.text(&emoji.unicode);
                }
            }
            NodeKind::TextMark(mark) => {
                let mut extra = vec![("data-type", mark.types.join(" "))];
                if mark.has_type("a") && !mark.href.is_empty() {
                    extra.push(("data-href", mark.href.clone()));
                }
                if mark.has_type("block-ref") && !mark.block_ref_id.is_empty() {
                    extra.push(("data-id", mark.block_ref_id.clone()));
                }
                if mark.has_type("inline-math") && !mark.inline_math_content.is_empty() {
                    extra.push(("data-content", mark.inline_math_content.clone()));
                }
                self.open("span", node, &extra);
                self.text(&node.tokens);
                self.lit("</span>");
            }
        }
        WalkStatus::Continue
    }

    /// Image descriptions render as plain text
    fn visit_plain(&mut self, node: &Node, entering: bool) -> WalkStatus {
        match &node.kind {
            NodeKind::Text | NodeKind::CodeSpan { .. } | NodeKind::InlineMath | NodeKind::TextMark(_) => {
                self.text(&node.tokens)
            }
            NodeKind::SoftBreak | NodeKind::HardBreak => self.lit(" "),
            NodeKind::Emoji(emoji) => self.text(&emoji.unicode),
            NodeKind::Image(data) if !entering => {
                self.disable_tags -= 1;
                if self.disable_tags == 0 {
                    self.lit("\"");
                    if !data.title.is_empty() {
                        self.lit(&format!(" title=\"{}\"", escape_html(&data.title)));
                    }
                    if self.attribute_lists() {
                        for (key, value) in &node.ial {
                            self.lit(&format!(" {}=\"{}\"", key, escape_html(value)));
                        }
                    }
                    self.lit(" />");
                }
            }
            NodeKind::Image(_) => self.disable_tags += 1,
            _ => {}
        }
        WalkStatus::Continue
    }

    fn inline_tag(&mut self, tag: &str, node: &Node, entering: bool) {
        if entering {
            self.open(tag, node, &[]);
        } else {
            self.lit(&format!("</{}>", tag));
        }
    }

    /// Flat list of links to every heading with an id
    fn render_toc(&mut self) {
        let tree = self.tree;
        let headings = tree.collect(tree.root(), |n| matches!(n.kind, NodeKind::Heading(_)));
        self.cr();
        self.lit("<div class=\"toc-div\">");
        if !headings.is_empty() {
            self.lit("<ul class=\"toc-ul\">");
            for heading in headings {
                let NodeKind::Heading(data) = tree.kind(heading) else {
                    continue;
                };
                let text = tree.text(heading);
                match &data.id {
                    Some(id) => self.lit(&format!(
                        "<li class=\"toc-li\"><a class=\"toc-a\" href=\"#{}\">{}</a></li>",
                        escape_html(id),
                        escape_html(&text)
                    )),
                    None => self.lit(&format!("<li class=\"toc-li\">{}</li>", escape_html(&text))),
                }
            }
            self.lit("</ul>");
        }
        self.lit("</div>");
        self.cr();
    }
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Render a tree to HTML
pub fn render_html(tree: &Tree, options: &Options) -> String {
    HtmlRenderer::new(tree, options).render()
}

/// Kinds whose whole output is written on the enter event
fn renders_once(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::ThematicBreak
            | NodeKind::CodeBlock(_)
            | NodeKind::HtmlBlock { .. }
            | NodeKind::MathBlock { .. }
            | NodeKind::GitConflict
            | NodeKind::CustomBlock(_)
            | NodeKind::Toc
            | NodeKind::Text
            | NodeKind::SoftBreak
            | NodeKind::HardBreak
            | NodeKind::CodeSpan { .. }
            | NodeKind::InlineHtml
            | NodeKind::InlineMath
            | NodeKind::FootnotesRef(_)
            | NodeKind::BlockRef(_)
            | NodeKind::Emoji(_)
            | NodeKind::TextMark(_)
    )
}

/// Escape `&`, `<`, `>` and `"`
pub(crate) fn escape_html(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn html(input: &str, options: &Options) -> String {
        render_html(&parse(input.as_bytes(), options).unwrap(), options)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }

    #[test]
    fn test_tight_and_loose_lists() {
        let options = Options::commonmark();
        assert_eq!(html("- a\n- b\n", &options), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n");
        assert_eq!(
            html("- a\n\n- b\n", &options),
            "<ul>\n<li>\n<p>a</p>\n</li>\n<li>\n<p>b</p>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_leaves_render_once() {
        let options = Options::commonmark();
        assert_eq!(
            html("***\n\n```\ncode\n```\n\n`span` <b>x</b>\n", &options),
            "<hr />\n<pre><code>code\n</code></pre>\n<p><code>span</code> <b>x</b></p>\n"
        );
        assert_eq!(html("~~gone~~ ==hi==\n", &options), "<p>~~gone~~ ==hi==</p>\n");
    }

    #[test]
    fn test_non_ascii_text_with_default_options() {
        let options = Options::default();
        assert_eq!(html("café naïve résumé\n", &options), "<p>café naïve résumé</p>\n");
        assert_eq!(html("中文段落\n", &options), "<p>中文段落</p>\n");
    }

    #[test]
    fn test_image_alt_is_plain_text() {
        let options = Options::commonmark();
        assert_eq!(
            html("![*foo* bar](/u \"t\")\n", &options),
            "<p><img src=\"/u\" alt=\"foo bar\" title=\"t\" /></p>\n"
        );
    }

    #[test]
    fn test_table() {
        let options = Options::default();
        assert_eq!(
            html("| a | b |\n| :- | -: |\n| 1 | 2 |\n", &options),
            "<table>\n<thead>\n<tr>\n<th align=\"left\">a</th>\n<th align=\"right\">b</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td align=\"left\">1</td>\n<td align=\"right\">2</td>\n</tr>\n</tbody>\n</table>\n"
        );
    }

    #[test]
    fn test_task_list() {
        let options = Options::default();
        assert_eq!(
            html("- [x] done\n", &options),
            "<ul>\n<li class=\"task-list-item\"><input checked=\"\" disabled=\"\" type=\"checkbox\" /> done</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_block_ial_becomes_attributes() {
        let options = Options {
            kramdown_block_ial: true,
            ..Options::default()
        };
        let tree = crate::parser::parse_with_ids(
            b"para\n{: id=\"p1\" class=\"note\"}\n",
            &options,
            &mut || "unused".to_string(),
        )
        .unwrap();
        assert_eq!(render_html(&tree, &options), "<p id=\"p1\" class=\"note\">para</p>\n");
    }

    #[test]
    fn test_footnotes() {
        let options = Options::default();
        assert_eq!(
            html("a[^1]\n\n[^1]: note\n", &options),
            "<p>a<sup class=\"footnotes-ref\" id=\"footnotes-ref-1\"><a href=\"#footnotes-def-1\">1</a></sup></p>\n<div class=\"footnotes-defs-div\"><hr class=\"footnotes-defs-hr\" />\n<ol class=\"footnotes-defs-ol\">\n<li id=\"footnotes-def-1\">\n<p>note</p>\n</li>\n</ol></div>\n"
        );
    }

    #[test]
    fn test_emoji_image_for_custom_alias() {
        let mut options = Options::default();
        options
            .emoji_aliases
            .insert("logo".to_string(), "/img/logo.png".to_string());
        assert_eq!(
            html(":logo: :tada:", &options),
            "<p><img alt=\"logo\" class=\"emoji\" src=\"/img/logo.png\" title=\"logo\" /> 🎉</p>\n"
        );
    }

    #[test]
    fn test_text_mark_attributes_follow_type() {
        let options = Options {
            text_mark: true,
            ..Options::default()
        };
        assert_eq!(
            html("x <span data-type=\"a\" data-href=\"/u\" data-id=\"zz\">t</span>\n", &options),
            "<p>x <span data-type=\"a\" data-href=\"/u\">t</span></p>\n"
        );
    }
}
