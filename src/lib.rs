//! An extensible CommonMark engine.
//!
//! Parsing runs in two phases: a line-oriented block phase builds the
//! document tree, then an inline phase parses the text collected in
//! paragraphs, headings, and table cells. Both phases and all six renderers
//! expose seams for [`SyntaxExtension`] implementations; the reference
//! extensions live in [`extensions`].

pub mod extension;
pub mod extensions;
pub mod iter;
pub mod options;
pub mod parser;
pub mod render;
pub mod tree;

use std::sync::Arc;

pub use extension::BlockContinue;
pub use extension::RenderFormat;
pub use extension::SyntaxExtension;
pub use iter::IterEvent;
pub use iter::TreeIter;
pub use options::Options;
pub use options::OptionsBuilder;
pub use parser::Parser;
pub use tree::NodeId;
pub use tree::NodeValue;
pub use tree::Sourcepos;
pub use tree::Tree;

/// Parses `input` into a document tree with the given extensions attached.
///
/// # Examples
///
/// ```
/// use quillmark::{parse_document, Options};
///
/// let tree = parse_document("# Hello\n", &Options::default(), &[]);
/// assert_eq!(tree.child_count(tree.root()), 1);
/// ```
pub fn parse_document(
    input: &str,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
) -> Tree {
    let mut parser = Parser::new(options);
    for ext in extensions {
        parser.attach(ext.clone());
    }
    parser.feed(input.as_bytes());
    parser.finish()
}

/// Parses `input` and renders it to HTML in one call.
///
/// # Examples
///
/// ```
/// use quillmark::{markdown_to_html, Options};
///
/// let html = markdown_to_html("*hi*\n", &Options::default(), &[]);
/// assert_eq!(html, "<p><em>hi</em></p>\n");
/// ```
pub fn markdown_to_html(
    input: &str,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
) -> String {
    let tree = parse_document(input, options, extensions);
    render::html(&tree, options, extensions)
}

/// Parses `input` and renders it back to CommonMark, wrapping at `width`
/// columns (0 disables wrapping).
pub fn markdown_to_commonmark(
    input: &str,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
    width: usize,
) -> String {
    let tree = parse_document(input, options, extensions);
    render::commonmark(&tree, options, extensions, width)
}

#[cfg(test)]
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_call_conversion() {
        init_logger();
        assert_eq!(
            markdown_to_html("# T\n\ntext\n", &Options::default(), &[]),
            "<h1>T</h1>\n<p>text</p>\n"
        );
    }

    #[test]
    fn extensions_thread_through() {
        let exts = vec![extensions::strikethrough()];
        assert_eq!(
            markdown_to_html("~~x~~\n", &Options::default(), &exts),
            "<p><del>x</del></p>\n"
        );
    }

    #[test]
    fn commonmark_one_call() {
        assert_eq!(
            markdown_to_commonmark("__x__\n", &Options::default(), &[], 0),
            "**x**\n"
        );
    }
}
