//! A Markdown engine: CommonMark block and inline parsing with GFM and
//! Lute-style extensions, an arena AST, attribute lists and HTML output

pub mod ast;
pub mod error;
pub mod id;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod renderer;
pub mod token;
pub mod tree;
pub mod walk;

use log::error;

pub use ast::{Node, NodeKind};
pub use error::{ParseError, Result};
pub use id::{IdSource, SequentialIds};
pub use options::{Limits, Options};
pub use parser::{parse, parse_with_ids};
pub use renderer::{HtmlRenderer, format_markdown, render_html};
pub use tree::Tree;
pub use walk::{WalkStatus, walk};

/// Parse Markdown with the given options and render it to HTML
pub fn to_html(markdown: &str, options: &Options) -> Result<String> {
    let tree = parse(markdown.as_bytes(), options)?;
    Ok(render_html(&tree, options))
}

/// Parse CommonMark text and render to HTML
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::commonmark();
    match to_html(markdown, &options) {
        Ok(html) => html,
        Err(err) => {
            error!("rendering failed: {}", err);
            String::new()
        }
    }
}
