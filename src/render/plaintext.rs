//! Plain text renderer: document text with block spacing and list markers,
//! all inline markup dropped.

use std::sync::Arc;

use crate::extension::{RenderFormat, SyntaxExtension};
use crate::options::Options;
use crate::render::{Escaping, TextRenderer, render_text_format};
use crate::tree::{ListDelimType, ListType, NodeId, NodeValue, Tree};

pub(crate) fn render(
    tree: &Tree,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
    width: usize,
) -> String {
    render_text_format(
        RenderFormat::Plaintext,
        tree,
        options,
        extensions,
        width,
        escape_char,
        render_node,
    )
}

fn escape_char(rr: &mut TextRenderer, c: char, _next: Option<char>, _escaping: Escaping) {
    rr.putc(c);
}

fn item_marker(tree: &Tree, item: NodeId) -> String {
    let Some(list) = tree.parent(item) else {
        return "- ".to_string();
    };
    match tree.list_type(list) {
        Some(ListType::Ordered) => {
            let start = tree.list_start(list).unwrap_or(1);
            let index = tree.children(list).take_while(|&c| c != item).count();
            let delim = match tree.list_delim(list) {
                Some(ListDelimType::Paren) => ')',
                _ => '.',
            };
            format!("{}{} ", start + index, delim)
        }
        _ => "- ".to_string(),
    }
}

fn in_tight_item(tree: &Tree, paragraph: NodeId) -> bool {
    tree.parent(paragraph)
        .filter(|&item| {
            matches!(
                tree.value(item),
                NodeValue::Item(_) | NodeValue::TaskItem(_)
            )
        })
        .and_then(|item| tree.parent(item))
        .and_then(|list| tree.list_tight(list))
        .unwrap_or(false)
}

fn render_node(rr: &mut TextRenderer, tree: &Tree, node: NodeId, entering: bool) {
    match tree.value(node).clone() {
        NodeValue::Document | NodeValue::List(_) => {}
        NodeValue::BlockQuote => {
            if entering {
                rr.push_prefix("  ");
            } else {
                rr.pop_prefix(2);
                rr.blankline();
            }
        }
        NodeValue::Item(_) => {
            if entering {
                rr.cr();
                let marker = item_marker(tree, node);
                rr.lit(&marker);
                rr.push_prefix(&" ".repeat(marker.len()));
            } else {
                rr.pop_prefix(item_marker(tree, node).len());
                rr.cr();
            }
        }
        NodeValue::Heading(_) => {
            if entering {
                rr.cr();
                rr.set_no_linebreaks(true);
            } else {
                rr.set_no_linebreaks(false);
                rr.blankline();
            }
        }
        NodeValue::CodeBlock(data) => {
            if entering {
                rr.blankline();
                rr.out(&data.literal, false, Escaping::Literal);
                rr.blankline();
            }
        }
        NodeValue::HtmlBlock(_) | NodeValue::HtmlInline(_) => {}
        NodeValue::ThematicBreak => {
            if entering {
                rr.blankline();
            }
        }
        NodeValue::Paragraph => {
            if !entering {
                if in_tight_item(tree, node) {
                    rr.cr();
                } else {
                    rr.blankline();
                }
            }
        }
        NodeValue::FootnoteDefinition(name) => {
            if entering {
                rr.cr();
                rr.lit(&format!("[{name}] "));
            } else {
                rr.blankline();
            }
        }
        NodeValue::Text(text) => rr.out(&text, true, Escaping::Normal),
        NodeValue::Code(literal) => rr.out(&literal, true, Escaping::Normal),
        NodeValue::SoftBreak | NodeValue::LineBreak => {
            if rr.width() == 0 {
                rr.cr();
            } else {
                rr.out(" ", true, Escaping::Literal);
            }
        }
        NodeValue::Emph | NodeValue::Strong | NodeValue::Link(_) | NodeValue::Image(_) => {}
        NodeValue::FootnoteReference(name) => {
            if entering {
                rr.lit(&format!("[{name}]"));
            }
        }
        NodeValue::CustomBlock(_) | NodeValue::CustomInline(_) => {}
        NodeValue::Table(_)
        | NodeValue::TableRow(_)
        | NodeValue::TableCell
        | NodeValue::TaskItem(_)
        | NodeValue::Strikethrough => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn plain_of(input: &str) -> String {
        let options = Options::default();
        let mut parser = Parser::new(&options);
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        render(&tree, &options, &[], 0)
    }

    #[test]
    fn markup_disappears() {
        assert_eq!(plain_of("# *Title* `x`\n"), "Title x\n");
        assert_eq!(plain_of("[text](/url)\n"), "text\n");
    }

    #[test]
    fn block_spacing_remains() {
        assert_eq!(plain_of("a\n\nb\n"), "a\n\nb\n");
        assert_eq!(plain_of("- one\n- two\n"), "- one\n- two\n");
    }

    #[test]
    fn plaintext_is_a_fixpoint() {
        let once = plain_of("# H\n\n*a* [b](/u)\n\n- c\n");
        let twice = plain_of(&once);
        assert_eq!(once, twice);
    }
}
