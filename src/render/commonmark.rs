//! CommonMark renderer: serializes the tree back to markdown that reparses
//! to the same document.

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
        RenderFormat::CommonMark,
        tree,
        options,
        extensions,
        width,
        escape_char,
        render_node,
    )
}

fn escape_char(rr: &mut TextRenderer, c: char, next: Option<char>, escaping: Escaping) {
    match escaping {
        Escaping::Literal => rr.putc(c),
        Escaping::Normal => {
            let begin = rr.begin_content();
            let needs_escape = matches!(
                c,
                '*' | '_' | '[' | ']' | '#' | '<' | '>' | '\\' | '`' | '!'
            ) || rr.extension_escape(c)
                || (c == '&' && next.is_some_and(|n| n.is_ascii_alphabetic()))
                || (begin
                    && matches!(c, '-' | '+' | '=')
                    && !next.is_some_and(|n| n.is_ascii_alphanumeric()));
            if needs_escape {
                rr.putc('\\');
            }
            rr.putc(c);
        }
        Escaping::Url => {
            if matches!(c, '(' | ')') {
                rr.putc('\\');
            }
            rr.putc(c);
        }
        Escaping::Title => {
            if c == '"' {
                rr.putc('\\');
            }
            rr.putc(c);
        }
    }
}

/// Longest run of `ch` in `s`.
fn longest_run(s: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in s.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn item_marker(tree: &Tree, item: NodeId) -> String {
    let Some(list) = tree.parent(item) else {
        return "- ".to_string();
    };
    match tree.list_type(list) {
        Some(ListType::Ordered) => {
            let start = tree.list_start(list).unwrap_or(1);
            let index = tree
                .children(list)
                .take_while(|&c| c != item)
                .count();
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
        NodeValue::Document => {}
        NodeValue::BlockQuote => {
            if entering {
                rr.lit("> ");
                rr.push_prefix("> ");
            } else {
                rr.pop_prefix(2);
                rr.blankline();
            }
        }
        NodeValue::List(_) => {
            if !entering {
                rr.blankline();
                // a break comment keeps adjacent lists apart on reparse
                if let Some(next) = tree.next_sibling(node)
                    && matches!(tree.value(next), NodeValue::List(_))
                {
                    rr.lit("<!-- end list -->");
                    rr.blankline();
                }
            }
        }
        NodeValue::Item(_) => {
            if entering {
                rr.cr();
                let marker = item_marker(tree, node);
                rr.lit(&marker);
                rr.push_prefix(&" ".repeat(marker.len()));
                rr.set_in_tight_list_item(
                    tree.parent(node)
                        .and_then(|l| tree.list_tight(l))
                        .unwrap_or(false),
                );
            } else {
                let marker_len = item_marker(tree, node).len();
                rr.pop_prefix(marker_len);
                rr.cr();
            }
        }
        NodeValue::Heading(data) => {
            if entering {
                rr.cr();
                for _ in 0..data.level {
                    rr.lit("#");
                }
                rr.lit(" ");
                rr.set_no_linebreaks(true);
            } else {
                rr.set_no_linebreaks(false);
                rr.blankline();
            }
        }
        NodeValue::CodeBlock(data) => {
            if !entering {
                return;
            }
            rr.blankline();
            let ticks = longest_run(&data.literal, '`').max(2) + 1;
            let fence = "`".repeat(ticks);
            rr.lit(&fence);
            rr.out(&data.info, false, Escaping::Literal);
            rr.cr();
            rr.out(&data.literal, false, Escaping::Literal);
            rr.cr();
            rr.lit(&fence);
            rr.blankline();
        }
        NodeValue::HtmlBlock(raw) => {
            if entering {
                rr.blankline();
                rr.out(&raw, false, Escaping::Literal);
                rr.blankline();
            }
        }
        NodeValue::ThematicBreak => {
            if entering {
                rr.blankline();
                rr.lit("-----");
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
                rr.lit(&format!("[^{name}]: "));
                rr.push_prefix("    ");
            } else {
                rr.pop_prefix(4);
                rr.blankline();
            }
        }
        NodeValue::Text(text) => rr.out(&text, true, Escaping::Normal),
        NodeValue::Code(literal) => {
            let ticks = if literal.contains('`') {
                longest_run(&literal, '`') + 1
            } else {
                1
            };
            let fence = "`".repeat(ticks);
            let pad = literal.starts_with('`')
                || literal.ends_with('`')
                || (literal.starts_with(' ') && literal.ends_with(' ') && !literal.is_empty());
            rr.lit(&fence);
            if pad {
                rr.lit(" ");
            }
            rr.out(&literal, false, Escaping::Literal);
            if pad {
                rr.lit(" ");
            }
            rr.lit(&fence);
        }
        NodeValue::HtmlInline(raw) => rr.out(&raw, false, Escaping::Literal),
        NodeValue::SoftBreak => {
            if rr.no_linebreaks() {
                rr.out(" ", true, Escaping::Literal);
            } else if rr.width() == 0 && !rr.options().hardbreaks {
                rr.cr();
            } else {
                rr.out(" ", true, Escaping::Literal);
            }
        }
        NodeValue::LineBreak => {
            rr.lit("  ");
            rr.cr();
        }
        NodeValue::Emph => rr.lit("*"),
        NodeValue::Strong => rr.lit("**"),
        NodeValue::Link(data) => {
            if entering {
                rr.lit("[");
            } else {
                rr.lit("](");
                rr.out(&data.url, false, Escaping::Url);
                if !data.title.is_empty() {
                    rr.lit(" \"");
                    rr.out(&data.title, false, Escaping::Title);
                    rr.lit("\"");
                }
                rr.lit(")");
            }
        }
        NodeValue::Image(data) => {
            if entering {
                rr.lit("![");
            } else {
                rr.lit("](");
                rr.out(&data.url, false, Escaping::Url);
                if !data.title.is_empty() {
                    rr.lit(" \"");
                    rr.out(&data.title, false, Escaping::Title);
                    rr.lit("\"");
                }
                rr.lit(")");
            }
        }
        NodeValue::FootnoteReference(name) => {
            if entering {
                rr.lit(&format!("[^{name}]"));
            }
        }
        NodeValue::CustomBlock(data) => {
            if entering {
                rr.cr();
                rr.lit(&data.on_enter);
            } else {
                rr.lit(&data.on_exit);
                rr.blankline();
            }
        }
        NodeValue::CustomInline(data) => {
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

    fn roundtrip(input: &str) -> String {
        let options = Options::default();
        let mut parser = Parser::new(&options);
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        render(&tree, &options, &[], 0)
    }

    fn html_of(input: &str) -> String {
        let options = Options::default();
        let mut parser = Parser::new(&options);
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        crate::render::html(&tree, &options, &[])
    }

    #[test]
    fn simple_shapes_round_trip() {
        assert_eq!(roundtrip("# Title\n"), "# Title\n");
        assert_eq!(roundtrip("plain paragraph\n"), "plain paragraph\n");
        assert_eq!(roundtrip("> quoted\n"), "> quoted\n");
        assert_eq!(roundtrip("- a\n- b\n"), "- a\n- b\n");
    }

    #[test]
    fn emphasis_normalizes_to_stars() {
        assert_eq!(roundtrip("_em_ and __strong__\n"), "*em* and **strong**\n");
    }

    #[test]
    fn special_characters_are_escaped() {
        let out = roundtrip("literal \\*stars\\* and [brackets]\n");
        assert_eq!(html_of(&out), html_of("literal \\*stars\\* and [brackets]\n"));
    }

    #[test]
    fn reparse_reaches_a_fixpoint() {
        let input = "# H\n\n> quote with *em*\n\n- one\n- two\n\n```rust\ncode();\n```\n";
        let once = roundtrip(input);
        let twice = roundtrip(&once);
        assert_eq!(once, twice);
        assert_eq!(html_of(input), html_of(&once));
    }

    #[test]
    fn adjacent_lists_stay_separate() {
        let out = roundtrip("- a\n\n1. b\n");
        let mut parser = Parser::new(&Options::default());
        parser.feed(out.as_bytes());
        let tree = parser.finish();
        let lists: Vec<_> = tree
            .children(tree.root())
            .filter(|&n| matches!(tree.value(n), NodeValue::List(_)))
            .collect();
        assert_eq!(lists.len(), 2, "{out:?}");
        assert_eq!(tree.list_type(lists[0]), Some(ListType::Bullet));
        assert_eq!(tree.list_type(lists[1]), Some(ListType::Ordered));
    }

    #[test]
    fn code_fence_grows_past_embedded_ticks() {
        let out = roundtrip("````\n``` inner\n````\n");
        assert!(out.starts_with("````"), "{out}");
        assert_eq!(html_of(&out), html_of("````\n``` inner\n````\n"));
    }

    #[test]
    fn wrapping_preserves_semantics() {
        let input = "word ".repeat(20) + "\n";
        let options = Options::default();
        let mut parser = Parser::new(&options);
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        let wrapped = render(&tree, &options, &[], 30);
        assert!(wrapped.lines().count() > 1);
        // soft breaks render as newlines, so compare modulo whitespace kind
        assert_eq!(
            html_of(&wrapped).replace('\n', " "),
            html_of(&input).replace('\n', " ")
        );
    }
}
