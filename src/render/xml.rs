//! XML renderer for the document tree, matching the CommonMark AST schema:
//! one element per node, nested and indented, with type-specific attributes.

use std::sync::Arc;

use crate::extension::SyntaxExtension;
use crate::iter::{IterEvent, TreeIter};
use crate::options::Options;
use crate::tree::{ListDelimType, ListType, NodeId, NodeValue, TableAlignment, Tree};

fn escape_xml(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

pub(crate) fn render(
    tree: &Tree,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<!DOCTYPE document SYSTEM \"CommonMark.dtd\">\n");
    let mut depth = 0usize;
    for (node, event) in TreeIter::new(tree, tree.root()) {
        match event {
            IterEvent::Enter => {
                let value = tree.value(node);
                for _ in 0..depth {
                    out.push_str("  ");
                }
                out.push('<');
                out.push_str(value.type_string());
                if node == tree.root() {
                    out.push_str(" xmlns=\"http://commonmark.org/xml/1.0\"");
                }
                if options.sourcepos {
                    let pos = tree.sourcepos(node);
                    out.push_str(&format!(" sourcepos=\"{pos}\""));
                }
                write_attributes(&mut out, tree, node, extensions);
                match literal_of(value) {
                    Some(literal) => {
                        out.push_str(" xml:space=\"preserve\">");
                        escape_xml(&mut out, literal);
                        out.push_str("</");
                        out.push_str(value.type_string());
                        out.push_str(">\n");
                    }
                    None if value.can_have_children() => {
                        out.push_str(">\n");
                        depth += 1;
                    }
                    None => out.push_str(" />\n"),
                }
            }
            IterEvent::Exit => {
                depth = depth.saturating_sub(1);
                for _ in 0..depth {
                    out.push_str("  ");
                }
                out.push_str("</");
                out.push_str(tree.value(node).type_string());
                out.push_str(">\n");
            }
            IterEvent::Done => {}
        }
    }
    out
}

fn literal_of(value: &NodeValue) -> Option<&str> {
    match value {
        NodeValue::Text(s)
        | NodeValue::Code(s)
        | NodeValue::HtmlInline(s)
        | NodeValue::HtmlBlock(s) => Some(s),
        NodeValue::CodeBlock(data) => Some(&data.literal),
        _ => None,
    }
}

fn write_attributes(
    out: &mut String,
    tree: &Tree,
    node: NodeId,
    extensions: &[Arc<dyn SyntaxExtension>],
) {
    match tree.value(node) {
        NodeValue::List(data) => {
            match data.list_type {
                ListType::Bullet => out.push_str(" type=\"bullet\""),
                ListType::Ordered => {
                    out.push_str(" type=\"ordered\"");
                    out.push_str(&format!(" start=\"{}\"", data.start));
                    out.push_str(match data.delimiter {
                        ListDelimType::Period => " delim=\"period\"",
                        ListDelimType::Paren => " delim=\"paren\"",
                    });
                }
            }
            out.push_str(&format!(" tight=\"{}\"", data.tight));
        }
        NodeValue::Heading(data) => out.push_str(&format!(" level=\"{}\"", data.level)),
        NodeValue::CodeBlock(data) if !data.info.is_empty() => {
            out.push_str(" info=\"");
            escape_xml(out, &data.info);
            out.push('"');
        }
        NodeValue::Link(data) | NodeValue::Image(data) => {
            out.push_str(" destination=\"");
            escape_xml(out, &data.url);
            out.push('"');
            if !data.title.is_empty() {
                out.push_str(" title=\"");
                escape_xml(out, &data.title);
                out.push('"');
            }
        }
        NodeValue::FootnoteDefinition(name) | NodeValue::FootnoteReference(name) => {
            out.push_str(" label=\"");
            escape_xml(out, name);
            out.push('"');
        }
        NodeValue::Table(data) => {
            let cols: Vec<&str> = data
                .alignments
                .iter()
                .map(|a| match a {
                    TableAlignment::None => "none",
                    TableAlignment::Left => "left",
                    TableAlignment::Center => "center",
                    TableAlignment::Right => "right",
                })
                .collect();
            out.push_str(&format!(" alignments=\"{}\"", cols.join(" ")));
        }
        NodeValue::TaskItem(data) => {
            out.push_str(&format!(" completed=\"{}\"", data.checked));
        }
        _ => {}
    }
    if let Some(name) = tree.extension_name(node)
        && let Some(ext) = extensions.iter().find(|e| e.name() == name)
    {
        for (key, value) in ext.xml_attributes(tree, node) {
            out.push_str(&format!(" {key}=\""));
            escape_xml(out, &value);
            out.push('"');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn xml_of(input: &str, options: &Options) -> String {
        let mut parser = Parser::new(options);
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        render(&tree, options, &[])
    }

    #[test]
    fn document_skeleton() {
        let out = xml_of("hi\n", &Options::default());
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(out.contains("<document xmlns=\"http://commonmark.org/xml/1.0\">"));
        assert!(out.contains("  <paragraph>\n"));
        assert!(out.contains("    <text xml:space=\"preserve\">hi</text>\n"));
        assert!(out.ends_with("</document>\n"));
    }

    #[test]
    fn list_and_heading_attributes() {
        let out = xml_of("## H\n\n2. x\n", &Options::default());
        assert!(out.contains("<heading level=\"2\">"));
        assert!(
            out.contains("<list type=\"ordered\" start=\"2\" delim=\"period\" tight=\"true\">")
        );
    }

    #[test]
    fn literals_are_escaped() {
        let options = Options {
            normalize: true,
            ..Options::default()
        };
        let out = xml_of("a <&> b\n", &options);
        assert!(out.contains("a &lt;&amp;&gt; b"), "{out}");
    }

    #[test]
    fn sourcepos_attribute() {
        let options = Options {
            sourcepos: true,
            ..Options::default()
        };
        let out = xml_of("hi\n", &options);
        assert!(out.contains("<paragraph sourcepos=\"1:1-1:2\">"), "{out}");
    }
}
