//! Markdown to HTML.
//!
//! The parser job only needs "body in, HTML out", so the converter sits
//! behind [`MarkdownRenderer`]. [`Cmark`] is the production implementation;
//! tests swap in renderers that fail on demand.

use pulldown_cmark::{Options, Parser, html};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("{0}")]
pub struct MarkdownError(pub String);

pub trait MarkdownRenderer: Sync {
    fn render(&self, markdown: &str) -> Result<String, MarkdownError>;
}

/// CommonMark plus tables, footnotes, strikethrough and task lists.
#[derive(Debug, Clone, Copy)]
pub struct Cmark {
    options: Options,
}

impl Default for Cmark {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl MarkdownRenderer for Cmark {
    fn render(&self, markdown: &str) -> Result<String, MarkdownError> {
        let parser = Parser::new_ext(markdown, self.options);
        let mut body = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut body, parser);
        Ok(body)
    }
}
