//! Groff man page renderer.

use std::sync::Arc;

use crate::extension::{RenderFormat, SyntaxExtension};
use crate::options::Options;
use crate::render::{Escaping, TextRenderer, render_text_format};
use crate::tree::{ListType, NodeId, NodeValue, Tree};

pub(crate) fn render(
    tree: &Tree,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
    width: usize,
) -> String {
    render_text_format(
        RenderFormat::Man,
        tree,
        options,
        extensions,
        width,
        escape_char,
        render_node,
    )
}

fn escape_char(rr: &mut TextRenderer, c: char, _next: Option<char>, escaping: Escaping) {
    if escaping == Escaping::Literal {
        rr.putc(c);
        return;
    }
    match c {
        // roff control characters at line start must be neutralized
        '.' | '\'' if rr.begin_content() => {
            rr.lit("\\&");
            rr.putc(c);
        }
        '-' => rr.lit("\\-"),
        '\\' => rr.lit("\\e"),
        '\u{2014}' => rr.lit("\\[em]"),
        '\u{2013}' => rr.lit("\\[en]"),
        _ => rr.putc(c),
    }
}

fn render_node(rr: &mut TextRenderer, tree: &Tree, node: NodeId, entering: bool) {
    match tree.value(node).clone() {
        NodeValue::Document => {}
        NodeValue::Heading(data) => {
            if entering {
                rr.cr();
                rr.lit(if data.level == 1 { ".SH" } else { ".SS" });
                rr.cr();
                rr.set_no_linebreaks(true);
            } else {
                rr.set_no_linebreaks(false);
                rr.cr();
            }
        }
        NodeValue::Paragraph => {
            if entering {
                // list items carry their own .IP request
                let in_item = tree
                    .parent(node)
                    .is_some_and(|p| matches!(tree.value(p), NodeValue::Item(_)));
                if !in_item {
                    rr.cr();
                    rr.lit(".PP");
                }
                rr.cr();
            } else {
                rr.cr();
            }
        }
        NodeValue::BlockQuote => {
            if entering {
                rr.cr();
                rr.lit(".RS");
                rr.cr();
            } else {
                rr.cr();
                rr.lit(".RE");
                rr.cr();
            }
        }
        NodeValue::List(_) => {
            if !entering {
                rr.cr();
            }
        }
        NodeValue::Item(_) => {
            if entering {
                rr.cr();
                let list_type = tree
                    .parent(node)
                    .and_then(|l| tree.list_type(l))
                    .unwrap_or(ListType::Bullet);
                match list_type {
                    ListType::Bullet => rr.lit(".IP \\[bu] 2"),
                    ListType::Ordered => {
                        let list = tree.parent(node);
                        let start = list.and_then(|l| tree.list_start(l)).unwrap_or(1);
                        let index = list
                            .map(|l| tree.children(l).take_while(|&c| c != node).count())
                            .unwrap_or(0);
                        rr.lit(&format!(".IP \"{}.\" 4", start + index));
                    }
                }
                rr.cr();
            } else {
                rr.cr();
            }
        }
        NodeValue::CodeBlock(data) => {
            if entering {
                rr.cr();
                rr.lit(".IP\n.nf\n\\f[C]");
                rr.cr();
                rr.out(&data.literal, false, Escaping::Literal);
                rr.cr();
                rr.lit("\\f[]\n.fi");
                rr.cr();
            }
        }
        // raw HTML has no roff rendition
        NodeValue::HtmlBlock(_) | NodeValue::HtmlInline(_) => {}
        NodeValue::ThematicBreak => {
            if entering {
                rr.cr();
                rr.lit(".PP\n  *  *  *  *  *");
                rr.cr();
            }
        }
        NodeValue::FootnoteDefinition(name) => {
            if entering {
                rr.cr();
                rr.lit(&format!(".IP \"[{name}]\" 4"));
                rr.cr();
            } else {
                rr.cr();
            }
        }
        NodeValue::Text(text) => rr.out(&text, true, Escaping::Normal),
        NodeValue::Code(literal) => {
            rr.lit("\\f[C]");
            rr.out(&literal, false, Escaping::Normal);
            rr.lit("\\f[]");
        }
        NodeValue::SoftBreak => {
            if rr.width() == 0 {
                rr.cr();
            } else {
                rr.out(" ", true, Escaping::Literal);
            }
        }
        NodeValue::LineBreak => {
            rr.lit(".PD 0\n.P\n.PD");
            rr.cr();
        }
        NodeValue::Emph => rr.lit(if entering { "\\f[I]" } else { "\\f[]" }),
        NodeValue::Strong => rr.lit(if entering { "\\f[B]" } else { "\\f[]" }),
        NodeValue::Link(data) => {
            if !entering {
                rr.lit(" (");
                rr.out(&data.url, false, Escaping::Url);
                rr.lit(")");
            }
        }
        NodeValue::Image(data) => {
            if !entering {
                rr.lit(" [IMAGE: ");
                rr.out(&data.url, false, Escaping::Url);
                rr.lit("]");
            }
        }
        NodeValue::FootnoteReference(name) => {
            if entering {
                rr.lit(&format!("[{name}]"));
            }
        }
        NodeValue::CustomBlock(data) | NodeValue::CustomInline(data) => {
            rr.lit(if entering { &data.on_enter } else { &data.on_exit });
        }
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

    fn man_of(input: &str) -> String {
        let options = Options::default();
        let mut parser = Parser::new(&options);
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        render(&tree, &options, &[], 0)
    }

    #[test]
    fn headings_use_section_requests() {
        assert_eq!(man_of("# One\n"), ".SH\nOne\n");
        assert_eq!(man_of("## Two\n"), ".SS\nTwo\n");
    }

    #[test]
    fn emphasis_uses_font_requests() {
        let out = man_of("*a* **b**\n");
        assert!(out.contains("\\f[I]a\\f[]"));
        assert!(out.contains("\\f[B]b\\f[]"));
    }

    #[test]
    fn hyphens_and_dots_are_escaped() {
        let out = man_of("a-b\n");
        assert!(out.contains("a\\-b"));
        let out = man_of(".leading dot\n");
        assert!(out.contains("\\&.leading"), "{out}");
    }

    #[test]
    fn bullet_items() {
        let out = man_of("- x\n");
        assert!(out.contains(".IP \\[bu] 2\nx"), "{out}");
    }
}
