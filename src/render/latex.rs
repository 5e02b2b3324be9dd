//! LaTeX fragment renderer.

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
        RenderFormat::Latex,
        tree,
        options,
        extensions,
        width,
        escape_char,
        render_node,
    )
}

fn escape_char(rr: &mut TextRenderer, c: char, _next: Option<char>, escaping: Escaping) {
    match escaping {
        Escaping::Literal => rr.putc(c),
        Escaping::Url => match c {
            '%' => rr.lit("\\%"),
            '#' => rr.lit("\\#"),
            '&' => rr.lit("\\&"),
            _ => rr.putc(c),
        },
        Escaping::Normal | Escaping::Title => match c {
            '{' => rr.lit("\\{"),
            '}' => rr.lit("\\}"),
            '#' => rr.lit("\\#"),
            '%' => rr.lit("\\%"),
            '&' => rr.lit("\\&"),
            '$' => rr.lit("\\$"),
            '_' => rr.lit("\\_"),
            '\\' => rr.lit("\\textbackslash{}"),
            '~' => rr.lit("\\textasciitilde{}"),
            '^' => rr.lit("\\textasciicircum{}"),
            '<' => rr.lit("\\textless{}"),
            '>' => rr.lit("\\textgreater{}"),
            _ => rr.putc(c),
        },
    }
}

fn list_env(tree: &Tree, list: NodeId) -> &'static str {
    match tree.list_type(list) {
        Some(ListType::Ordered) => "enumerate",
        _ => "itemize",
    }
}

fn render_node(rr: &mut TextRenderer, tree: &Tree, node: NodeId, entering: bool) {
    match tree.value(node).clone() {
        NodeValue::Document => {}
        NodeValue::Heading(data) => {
            if entering {
                rr.cr();
                rr.lit(match data.level {
                    1 => "\\section{",
                    2 => "\\subsection{",
                    3 => "\\subsubsection{",
                    _ => "\\paragraph{",
                });
                rr.set_no_linebreaks(true);
            } else {
                rr.set_no_linebreaks(false);
                rr.lit("}");
                rr.blankline();
            }
        }
        NodeValue::Paragraph => {
            if !entering {
                rr.blankline();
            }
        }
        NodeValue::BlockQuote => {
            if entering {
                rr.cr();
                rr.lit("\\begin{quote}");
                rr.cr();
            } else {
                rr.cr();
                rr.lit("\\end{quote}");
                rr.blankline();
            }
        }
        NodeValue::List(data) => {
            let env = list_env(tree, node);
            if entering {
                rr.cr();
                rr.lit(&format!("\\begin{{{env}}}"));
                rr.cr();
                if env == "enumerate" && data.start != 1 {
                    rr.lit(&format!("\\setcounter{{enumi}}{{{}}}", data.start - 1));
                    rr.cr();
                }
            } else {
                rr.cr();
                rr.lit(&format!("\\end{{{env}}}"));
                rr.blankline();
            }
        }
        NodeValue::Item(_) => {
            if entering {
                rr.cr();
                rr.lit("\\item ");
            } else {
                rr.cr();
            }
        }
        NodeValue::CodeBlock(data) => {
            if entering {
                rr.cr();
                rr.lit("\\begin{verbatim}");
                rr.cr();
                rr.out(&data.literal, false, Escaping::Literal);
                rr.cr();
                rr.lit("\\end{verbatim}");
                rr.blankline();
            }
        }
        NodeValue::HtmlBlock(_) | NodeValue::HtmlInline(_) => {}
        NodeValue::ThematicBreak => {
            if entering {
                rr.blankline();
                rr.lit("\\begin{center}\\rule{0.5\\linewidth}{0.5pt}\\end{center}");
                rr.blankline();
            }
        }
        NodeValue::FootnoteDefinition(_) => {
            if entering {
                rr.cr();
                rr.lit("\\footnotetext{");
            } else {
                rr.lit("}");
                rr.blankline();
            }
        }
        NodeValue::Text(text) => rr.out(&text, true, Escaping::Normal),
        NodeValue::Code(literal) => {
            rr.lit("\\texttt{");
            rr.out(&literal, false, Escaping::Normal);
            rr.lit("}");
        }
        NodeValue::SoftBreak => {
            if rr.width() == 0 {
                rr.cr();
            } else {
                rr.out(" ", true, Escaping::Literal);
            }
        }
        NodeValue::LineBreak => {
            rr.lit("\\\\");
            rr.cr();
        }
        NodeValue::Emph => rr.lit(if entering { "\\emph{" } else { "}" }),
        NodeValue::Strong => rr.lit(if entering { "\\textbf{" } else { "}" }),
        NodeValue::Link(data) => {
            if entering {
                rr.lit("\\href{");
                rr.out(&data.url, false, Escaping::Url);
                rr.lit("}{");
            } else {
                rr.lit("}");
            }
        }
        NodeValue::Image(data) => {
            // the alt text becomes the visible label
            if entering {
                rr.lit("\\href{");
                rr.out(&data.url, false, Escaping::Url);
                rr.lit("}{");
            } else {
                rr.lit("}");
            }
        }
        NodeValue::FootnoteReference(_) => {
            if entering {
                rr.lit("\\footnotemark{}");
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

    fn latex_of(input: &str) -> String {
        let options = Options::default();
        let mut parser = Parser::new(&options);
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        render(&tree, &options, &[], 0)
    }

    #[test]
    fn sectioning_by_level() {
        assert_eq!(latex_of("# A\n"), "\\section{A}\n");
        assert_eq!(latex_of("### C\n"), "\\subsubsection{C}\n");
    }

    #[test]
    fn special_characters() {
        let out = latex_of("50% of $x_1 & {y}\n");
        assert!(out.contains("50\\% of \\$x\\_1 \\& \\{y\\}"), "{out}");
    }

    #[test]
    fn lists_and_links() {
        let out = latex_of("1. [x](http://e.com/a%20b)\n");
        assert!(out.contains("\\begin{enumerate}"));
        assert!(out.contains("\\item \\href{http://e.com/a\\%20b}{x}"), "{out}");
        assert!(out.contains("\\end{enumerate}"));
    }

    #[test]
    fn code_block_verbatim() {
        let out = latex_of("```\nx & y\n```\n");
        assert_eq!(out, "\\begin{verbatim}\nx & y\n\\end{verbatim}\n");
    }
}
