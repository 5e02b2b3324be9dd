//! Strikethrough spans delimited by tildes, like `~~this~~`.

use std::sync::Arc;

use crate::extension::{RenderFormat, SyntaxExtension};
use crate::options::Options;
use crate::render::{HtmlRenderer, TextRenderer};
use crate::tree::{NodeId, NodeValue, Tree};

pub fn strikethrough() -> Arc<dyn SyntaxExtension> {
    Arc::new(Strikethrough)
}

struct Strikethrough;

impl SyntaxExtension for Strikethrough {
    fn name(&self) -> &'static str {
        "strikethrough"
    }

    fn special_characters(&self) -> &[char] {
        &['~']
    }

    fn is_delimiter_char(&self, ch: char) -> bool {
        ch == '~'
    }

    fn delimiter_match(
        &self,
        ch: char,
        opener_len: usize,
        closer_len: usize,
        options: &Options,
    ) -> Option<(NodeValue, usize)> {
        if ch != '~' || opener_len != closer_len {
            return None;
        }
        let allowed = if options.strikethrough_double_tilde {
            opener_len == 2
        } else {
            opener_len == 1 || opener_len == 2
        };
        allowed.then_some((NodeValue::Strikethrough, opener_len))
    }

    fn commonmark_escape(&self, ch: char) -> bool {
        ch == '~'
    }

    fn render_html(
        &self,
        renderer: &mut HtmlRenderer,
        _tree: &Tree,
        _node: NodeId,
        entering: bool,
    ) -> bool {
        renderer.write(if entering { "<del>" } else { "</del>" });
        true
    }

    fn render_text(
        &self,
        format: RenderFormat,
        renderer: &mut TextRenderer,
        _tree: &Tree,
        _node: NodeId,
        _entering: bool,
    ) -> bool {
        match format {
            RenderFormat::CommonMark => {
                renderer.lit("~~");
                true
            }
            // other formats fall through to the children
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::render;

    fn html_of(input: &str, options: &Options) -> String {
        let ext = strikethrough();
        let mut parser = Parser::new(options);
        parser.attach(ext.clone());
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        render::html(&tree, options, &[ext])
    }

    #[test]
    fn double_tilde_becomes_del() {
        assert_eq!(
            html_of("a ~~gone~~ b\n", &Options::default()),
            "<p>a <del>gone</del> b</p>\n"
        );
    }

    #[test]
    fn single_tilde_also_matches_by_default() {
        assert_eq!(
            html_of("~one~\n", &Options::default()),
            "<p><del>one</del></p>\n"
        );
    }

    #[test]
    fn double_tilde_option_rejects_single() {
        let options = Options {
            strikethrough_double_tilde: true,
            ..Options::default()
        };
        assert_eq!(html_of("~one~\n", &options), "<p>~one~</p>\n");
        assert_eq!(html_of("~~two~~\n", &options), "<p><del>two</del></p>\n");
    }

    #[test]
    fn mismatched_runs_stay_literal() {
        assert_eq!(html_of("~~a~\n", &Options::default()), "<p>~~a~</p>\n");
    }

    #[test]
    fn commonmark_output_round_trips() {
        let ext = strikethrough();
        let options = Options::default();
        let mut parser = Parser::new(&options);
        parser.attach(ext.clone());
        parser.feed(b"~~gone~~ and a literal ~ tilde\n");
        let tree = parser.finish();
        let out = render::commonmark(&tree, &options, &[ext], 0);
        assert_eq!(out, "~~gone~~ and a literal \\~ tilde\n");
    }
}
