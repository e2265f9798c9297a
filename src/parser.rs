//! Markdown parsing pipeline: lines → blocks → inlines → post passes

mod autolink;
mod block_start;
mod blocks;
mod emoji;
mod extension_blocks;
mod html_block;
mod ial;
mod inline;
mod link_ref;
mod list;
mod postprocess;
mod table;

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, error};

use crate::error::{ParseError, Result};
use crate::id::{IdSource, SequentialIds};
use crate::lexer::Lexer;
use crate::options::Options;
use crate::tree::Tree;

pub use block_start::{BLOCK_STARTS, BlockStart};
pub use emoji::lookup_emoji;
pub use ial::parse_ial;
pub use link_ref::normalize_label;

/// A link reference definition: `[label]: destination "title"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub destination: String,
    pub title: String,
}

/// State shared by the phases of a single parse call
pub(crate) struct Document<'o> {
    pub tree: Tree,
    pub options: &'o Options,
    pub refmap: HashMap<String, LinkRef>,
    /// Footnote labels, normalized, in definition order
    pub footnotes: Vec<String>,
}

pub struct Parser<'o> {
    options: &'o Options,
}

impl<'o> Parser<'o> {
    pub fn new(options: &'o Options) -> Self {
        Parser { options }
    }

    /// Parse `input` into a tree, converting internal panics into [`ParseError::Internal`]
    pub fn parse(&self, input: &[u8], ids: &mut dyn IdSource) -> Result<Tree> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(input, ids)));
        outcome.map_err(|cause| {
            let message = cause
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| cause.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            error!("parser aborted on internal failure: {}", message);
            ParseError::Internal
        })
    }

    fn run(&self, input: &[u8], ids: &mut dyn IdSource) -> Tree {
        let mut blocks = blocks::BlockParser::new(self.options);
        for line in Lexer::new(input) {
            blocks.incorporate_line(&line);
        }
        let mut doc = blocks.finish();
        debug!(
            "block phase done: {} reference definitions, {} footnotes",
            doc.refmap.len(),
            doc.footnotes.len()
        );

        inline::parse_inlines(&mut doc);
        postprocess::run(&mut doc);
        ial::attach(&mut doc, ids);
        doc.tree
    }
}

/// Parse with a fresh deterministic id source
pub fn parse(input: &[u8], options: &Options) -> Result<Tree> {
    parse_with_ids(input, options, &mut SequentialIds::default())
}

pub fn parse_with_ids(input: &[u8], options: &Options, ids: &mut dyn IdSource) -> Result<Tree> {
    Parser::new(options).parse(input, ids)
}
