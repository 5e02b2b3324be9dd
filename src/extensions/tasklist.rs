//! Task lists: list items whose text starts with `[ ]` or `[x]` become
//! checkbox items.

use std::sync::Arc;

use crate::extension::{RenderFormat, SyntaxExtension};
use crate::iter::{IterEvent, TreeIter};
use crate::options::Options;
use crate::render::{HtmlRenderer, TextRenderer};
use crate::tree::{ListDelimType, ListType, NodeId, NodeValue, TaskItemData, Tree};

pub fn tasklist() -> Arc<dyn SyntaxExtension> {
    Arc::new(TaskList)
}

/// Whether a task item is checked. `None` for nodes that are not task items.
pub fn is_checked(tree: &Tree, node: NodeId) -> Option<bool> {
    match tree.value(node) {
        NodeValue::TaskItem(data) => Some(data.checked),
        _ => None,
    }
}

/// The marker character as written (` `, `x`, or `X`).
pub fn symbol(tree: &Tree, node: NodeId) -> Option<char> {
    match tree.value(node) {
        NodeValue::TaskItem(data) => Some(data.symbol),
        _ => None,
    }
}

struct TaskList;

/// Parse a checkbox marker at the start of `text`. Returns the marker symbol.
fn checkbox_symbol(text: &str) -> Option<char> {
    let bytes = text.as_bytes();
    if bytes.len() >= 4
        && bytes[0] == b'['
        && matches!(bytes[1], b' ' | b'x' | b'X')
        && bytes[2] == b']'
        && bytes[3] == b' '
    {
        Some(bytes[1] as char)
    } else {
        None
    }
}

impl TaskList {
    /// Convert one list item in place if its paragraph opens with a checkbox
    /// marker.
    fn convert_item(&self, tree: &mut Tree, item: NodeId) -> bool {
        let Some(paragraph) = tree.first_child(item) else {
            return false;
        };
        if !matches!(tree.value(paragraph), NodeValue::Paragraph) {
            return false;
        }
        // the inline phase may have split the marker across text nodes
        let mut leading = Vec::new();
        let mut combined = String::new();
        let mut child = tree.first_child(paragraph);
        while combined.len() < 4 {
            let Some(id) = child else {
                break;
            };
            let NodeValue::Text(text) = tree.value(id) else {
                break;
            };
            combined.push_str(text);
            leading.push(id);
            child = tree.next_sibling(id);
        }
        let Some(symbol) = checkbox_symbol(&combined) else {
            return false;
        };

        // strip the four marker bytes off the front
        let mut strip = 4usize;
        for id in leading {
            if strip == 0 {
                break;
            }
            let NodeValue::Text(text) = tree.value(id).clone() else {
                break;
            };
            if text.len() <= strip {
                strip -= text.len();
                tree.unlink(id);
            } else {
                *tree.value_mut(id) = NodeValue::Text(text[strip..].to_string());
                strip = 0;
            }
        }

        let NodeValue::Item(list) = tree.value(item).clone() else {
            return false;
        };
        *tree.value_mut(item) = NodeValue::TaskItem(TaskItemData {
            list,
            checked: symbol != ' ',
            symbol,
        });
        tree.mark_extension(item, "tasklist");
        true
    }
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

impl SyntaxExtension for TaskList {
    fn name(&self) -> &'static str {
        "tasklist"
    }

    fn postprocess(&self, tree: &mut Tree, _options: &Options) {
        let items: Vec<NodeId> = TreeIter::new(tree, tree.root())
            .filter(|&(node, event)| {
                event == IterEvent::Enter && matches!(tree.value(node), NodeValue::Item(_))
            })
            .map(|(node, _)| node)
            .collect();
        for item in items {
            if self.convert_item(tree, item) {
                log::debug!("task item at {}", tree.sourcepos(item));
            }
        }
    }

    fn render_html(
        &self,
        renderer: &mut HtmlRenderer,
        tree: &Tree,
        node: NodeId,
        entering: bool,
    ) -> bool {
        let NodeValue::TaskItem(data) = tree.value(node) else {
            return false;
        };
        if entering {
            renderer.cr();
            renderer.write("<li");
            renderer.sourcepos(tree, node);
            renderer.write(">");
            renderer.write("<input type=\"checkbox\" disabled=\"\"");
            if data.checked {
                renderer.write(" checked=\"\"");
            }
            renderer.write(" /> ");
        } else {
            renderer.write("</li>\n");
        }
        true
    }

    fn render_text(
        &self,
        format: RenderFormat,
        renderer: &mut TextRenderer,
        tree: &Tree,
        node: NodeId,
        entering: bool,
    ) -> bool {
        let NodeValue::TaskItem(data) = tree.value(node) else {
            return false;
        };
        let checkbox = if data.checked {
            format!("[{}] ", data.symbol)
        } else {
            "[ ] ".to_string()
        };
        match format {
            RenderFormat::CommonMark | RenderFormat::Plaintext => {
                let marker = item_marker(tree, node);
                if entering {
                    renderer.cr();
                    renderer.lit(&marker);
                    renderer.lit(&checkbox);
                    renderer.push_prefix(&" ".repeat(marker.len()));
                    renderer.set_in_tight_list_item(
                        tree.parent(node)
                            .and_then(|l| tree.list_tight(l))
                            .unwrap_or(false),
                    );
                } else {
                    renderer.pop_prefix(marker.len());
                    renderer.cr();
                }
            }
            RenderFormat::Man => {
                if entering {
                    renderer.cr();
                    renderer.lit(".IP \\[bu] 2");
                    renderer.cr();
                    renderer.lit(&checkbox);
                } else {
                    renderer.cr();
                }
            }
            RenderFormat::Latex => {
                if entering {
                    renderer.cr();
                    renderer.lit("\\item ");
                    renderer.lit(&checkbox);
                } else {
                    renderer.cr();
                }
            }
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::render;

    fn parse(input: &str, options: &Options) -> Tree {
        let mut parser = Parser::new(options);
        parser.attach(tasklist());
        parser.feed(input.as_bytes());
        parser.finish()
    }

    fn html_of(input: &str, options: &Options) -> String {
        let tree = parse(input, options);
        render::html(&tree, options, &[tasklist()])
    }

    #[test]
    fn checkbox_items_render_inputs() {
        assert_eq!(
            html_of("- [ ] open\n- [x] done\n", &Options::default()),
            "<ul>\n<li><input type=\"checkbox\" disabled=\"\" /> open</li>\n\
             <li><input type=\"checkbox\" disabled=\"\" checked=\"\" /> done</li>\n</ul>\n"
        );
    }

    #[test]
    fn uppercase_x_counts_as_checked() {
        let tree = parse("- [X] shout\n", &Options::default());
        let list = tree.first_child(tree.root()).unwrap();
        let item = tree.first_child(list).unwrap();
        assert_eq!(is_checked(&tree, item), Some(true));
        assert_eq!(symbol(&tree, item), Some('X'));
        assert_eq!(is_checked(&tree, list), None);
    }

    #[test]
    fn marker_requires_trailing_space() {
        let out = html_of("- [x]tight\n", &Options::default());
        assert!(out.contains("[x]tight"), "{out}");
        assert!(!out.contains("checkbox"), "{out}");
    }

    #[test]
    fn plain_items_are_untouched() {
        let out = html_of("- just text\n", &Options::default());
        assert_eq!(out, "<ul>\n<li>just text</li>\n</ul>\n");
    }

    #[test]
    fn commonmark_output_keeps_the_marker() {
        let tree = parse("- [x] done\n", &Options::default());
        let out = render::commonmark(&tree, &Options::default(), &[tasklist()], 0);
        assert_eq!(out, "- [x] done\n");
    }
}
