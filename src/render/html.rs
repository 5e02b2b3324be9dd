//! HTML renderer.

use std::sync::Arc;

use crate::extension::SyntaxExtension;
use crate::iter::{IterEvent, TreeIter};
use crate::options::Options;
use crate::tree::{NodeId, NodeValue, Tree};

/// Accumulates HTML output. Extension `render_html` hooks receive a `&mut`
/// to this and use the same escaping and raw-HTML policy as the built-in
/// node rendering.
pub struct HtmlRenderer {
    options: Options,
    extensions: Vec<Arc<dyn SyntaxExtension>>,
    output: String,
}

impl HtmlRenderer {
    fn new(options: &Options, extensions: &[Arc<dyn SyntaxExtension>]) -> Self {
        Self {
            options: options.clone(),
            extensions: extensions.to_vec(),
            output: String::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Append markup verbatim.
    pub fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    /// Append text content, escaping `&`, `<`, `>`, and `"`.
    pub fn escape(&mut self, s: &str) {
        for c in s.chars() {
            match c {
                '&' => self.output.push_str("&amp;"),
                '<' => self.output.push_str("&lt;"),
                '>' => self.output.push_str("&gt;"),
                '"' => self.output.push_str("&quot;"),
                _ => self.output.push(c),
            }
        }
    }

    /// Append a link target, percent-encoding bytes outside the href-safe
    /// set.
    pub fn escape_href(&mut self, s: &str) {
        for &b in s.as_bytes() {
            match b {
                b'&' => self.output.push_str("&amp;"),
                b'\'' => self.output.push_str("&#x27;"),
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => self.output.push(b as char),
                b'-' | b'_' | b'.' | b'+' | b'!' | b'*' | b'(' | b')' | b',' | b'%' | b'#'
                | b'@' | b'?' | b'=' | b';' | b':' | b'/' | b'$' | b'~' => {
                    self.output.push(b as char)
                }
                _ => {
                    self.output.push_str(&format!("%{b:02X}"));
                }
            }
        }
    }

    /// Make sure output continues on a fresh line.
    pub fn cr(&mut self) {
        if !self.output.is_empty() && !self.output.ends_with('\n') {
            self.output.push('\n');
        }
    }

    /// Emit the `data-sourcepos` attribute for a block tag when enabled.
    pub fn sourcepos(&mut self, tree: &Tree, node: NodeId) {
        if self.options.sourcepos {
            let pos = tree.sourcepos(node);
            self.output
                .push_str(&format!(" data-sourcepos=\"{pos}\""));
        }
    }

    /// Emit raw HTML under the configured policy: pass through (subject to
    /// tag filtering) when raw HTML is allowed, escape it as text when it is
    /// to be neutralized, otherwise drop it with a placeholder comment.
    pub fn write_raw_html(&mut self, raw: &str) {
        if self.options.raw_html_allowed() {
            self.write_filtered(raw);
        } else if self.options.raw_html_escaped() {
            self.escape(raw);
        } else {
            self.output.push_str("<!-- raw HTML omitted -->");
        }
    }

    /// Pass raw HTML through, neutralizing tags an extension disallows by
    /// escaping their opening angle bracket.
    fn write_filtered(&mut self, raw: &str) {
        let bytes = raw.as_bytes();
        let mut last = 0;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'<'
                && let Some(name) = tag_name_at(raw, i)
                && self.extensions.iter().any(|e| !e.html_tag_allowed(&name))
            {
                self.output.push_str(&raw[last..i]);
                self.output.push_str("&lt;");
                last = i + 1;
            }
            i += 1;
        }
        self.output.push_str(&raw[last..]);
    }

    fn finish(self) -> String {
        self.output
    }
}

/// Lowercased element name of the tag starting at byte `at` (which holds
/// `<`), or `None` if no name follows.
fn tag_name_at(raw: &str, at: usize) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut i = at + 1;
    if bytes.get(i) == Some(&b'/') {
        i += 1;
    }
    let start = i;
    while let Some(&b) = bytes.get(i) {
        if b.is_ascii_alphanumeric() || b == b'-' {
            i += 1;
        } else {
            break;
        }
    }
    if i == start || !bytes[start].is_ascii_alphabetic() {
        return None;
    }
    Some(raw[start..i].to_ascii_lowercase())
}

pub(crate) fn render(
    tree: &Tree,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
) -> String {
    let mut rr = HtmlRenderer::new(options, extensions);
    let mut iter = TreeIter::new(tree, tree.root());
    while let Some((node, event)) = iter.next() {
        let entering = event == IterEvent::Enter;
        if let Some(name) = tree.extension_name(node) {
            if let Some(ext) = extensions.iter().find(|e| e.name() == name) {
                ext.render_html(&mut rr, tree, node, entering);
            }
            continue;
        }
        render_node(&mut rr, tree, node, entering, &mut iter);
    }
    rr.finish()
}

fn render_node(
    rr: &mut HtmlRenderer,
    tree: &Tree,
    node: NodeId,
    entering: bool,
    iter: &mut TreeIter<'_>,
) {
    match tree.value(node).clone() {
        NodeValue::Document => {}
        NodeValue::BlockQuote => {
            if entering {
                rr.cr();
                rr.write("<blockquote");
                rr.sourcepos(tree, node);
                rr.write(">\n");
            } else {
                rr.cr();
                rr.write("</blockquote>\n");
            }
        }
        NodeValue::List(data) => {
            let (tag, start_attr) = match data.list_type {
                crate::tree::ListType::Bullet => ("ul", None),
                crate::tree::ListType::Ordered => ("ol", (data.start != 1).then_some(data.start)),
            };
            if entering {
                rr.cr();
                rr.write("<");
                rr.write(tag);
                if let Some(start) = start_attr {
                    rr.write(&format!(" start=\"{start}\""));
                }
                rr.sourcepos(tree, node);
                rr.write(">\n");
            } else {
                rr.write("</");
                rr.write(tag);
                rr.write(">\n");
            }
        }
        NodeValue::Item(_) => {
            if entering {
                rr.cr();
                rr.write("<li");
                rr.sourcepos(tree, node);
                rr.write(">");
            } else {
                rr.write("</li>\n");
            }
        }
        NodeValue::Heading(data) => {
            if entering {
                rr.cr();
                rr.write(&format!("<h{}", data.level));
                rr.sourcepos(tree, node);
                rr.write(">");
            } else {
                rr.write(&format!("</h{}>\n", data.level));
            }
        }
        NodeValue::CodeBlock(data) => {
            if !entering {
                return;
            }
            rr.cr();
            let lang = data.info.split_whitespace().next().unwrap_or("");
            let meta = data.info.split_once(char::is_whitespace).map(|(_, m)| m);
            rr.write("<pre");
            rr.sourcepos(tree, node);
            if rr.options().github_pre_lang && !lang.is_empty() {
                rr.write(" lang=\"");
                rr.escape(lang);
                if rr.options().full_info_string
                    && let Some(meta) = meta
                {
                    rr.write("\" data-meta=\"");
                    rr.escape(meta);
                }
                rr.write("\"><code>");
            } else if !lang.is_empty() {
                rr.write("><code class=\"language-");
                rr.escape(lang);
                if rr.options().full_info_string
                    && let Some(meta) = meta
                {
                    rr.write("\" data-meta=\"");
                    rr.escape(meta);
                }
                rr.write("\">");
            } else {
                rr.write("><code>");
            }
            rr.escape(&data.literal);
            rr.write("</code></pre>\n");
        }
        NodeValue::HtmlBlock(raw) => {
            if entering {
                rr.cr();
                rr.write_raw_html(&raw);
                rr.cr();
            }
        }
        NodeValue::ThematicBreak => {
            if entering {
                rr.cr();
                rr.write("<hr");
                rr.sourcepos(tree, node);
                rr.write(" />\n");
            }
        }
        NodeValue::Paragraph => {
            if in_tight_list(tree, node) {
                return;
            }
            if entering {
                rr.cr();
                rr.write("<p");
                rr.sourcepos(tree, node);
                rr.write(">");
            } else {
                rr.write("</p>\n");
            }
        }
        NodeValue::FootnoteDefinition(name) => {
            if entering {
                rr.cr();
                rr.write("<div class=\"footnote-definition\" id=\"fn-");
                rr.escape_href(&name);
                rr.write("\">\n");
            } else {
                rr.cr();
                rr.write("</div>\n");
            }
        }
        NodeValue::Text(text) => rr.escape(&text),
        NodeValue::Code(literal) => {
            rr.write("<code>");
            rr.escape(&literal);
            rr.write("</code>");
        }
        NodeValue::HtmlInline(raw) => rr.write_raw_html(&raw),
        NodeValue::SoftBreak => {
            if rr.options().hardbreaks {
                rr.write("<br />\n");
            } else if rr.options().nobreaks {
                rr.write(" ");
            } else {
                rr.write("\n");
            }
        }
        NodeValue::LineBreak => rr.write("<br />\n"),
        NodeValue::Emph => rr.write(if entering { "<em>" } else { "</em>" }),
        NodeValue::Strong => rr.write(if entering { "<strong>" } else { "</strong>" }),
        NodeValue::Link(data) => {
            if entering {
                rr.write("<a href=\"");
                rr.escape_href(&data.url);
                if !data.title.is_empty() {
                    rr.write("\" title=\"");
                    rr.escape(&data.title);
                }
                rr.write("\">");
            } else {
                rr.write("</a>");
            }
        }
        NodeValue::Image(data) => {
            if entering {
                rr.write("<img src=\"");
                rr.escape_href(&data.url);
                rr.write("\" alt=\"");
                rr.escape(&tree.text_content(node));
                if !data.title.is_empty() {
                    rr.write("\" title=\"");
                    rr.escape(&data.title);
                }
                rr.write("\" />");
                // alt text replaces the children
                iter.reset(node, IterEvent::Exit);
                iter.next();
            }
        }
        NodeValue::FootnoteReference(name) => {
            if entering {
                rr.write("<sup class=\"footnote-ref\"><a href=\"#fn-");
                rr.escape_href(&name);
                rr.write("\">");
                rr.escape(&name);
                rr.write("</a></sup>");
            }
        }
        NodeValue::CustomBlock(data) => {
            if entering {
                rr.cr();
                rr.write(&data.on_enter);
            } else {
                rr.write(&data.on_exit);
                rr.cr();
            }
        }
        NodeValue::CustomInline(data) => {
            rr.write(if entering { &data.on_enter } else { &data.on_exit });
        }
        // extension-owned kinds reach here only without their extension;
        // render children bare
        NodeValue::Table(_)
        | NodeValue::TableRow(_)
        | NodeValue::TableCell
        | NodeValue::TaskItem(_)
        | NodeValue::Strikethrough => {}
    }
}

/// Paragraphs directly inside an item of a tight list render bare.
fn in_tight_list(tree: &Tree, paragraph: NodeId) -> bool {
    let Some(item) = tree.parent(paragraph) else {
        return false;
    };
    if !matches!(
        tree.value(item),
        NodeValue::Item(_) | NodeValue::TaskItem(_)
    ) {
        return false;
    }
    tree.parent(item)
        .and_then(|list| tree.list_tight(list))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn html_of(input: &str, options: &Options) -> String {
        let mut parser = Parser::new(options);
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        render(&tree, options, &[])
    }

    #[test]
    fn basic_blocks() {
        assert_eq!(html_of("# H\n", &Options::default()), "<h1>H</h1>\n");
        assert_eq!(html_of("p1\n\np2\n", &Options::default()), "<p>p1</p>\n<p>p2</p>\n");
        assert_eq!(
            html_of("> q\n", &Options::default()),
            "<blockquote>\n<p>q</p>\n</blockquote>\n"
        );
    }

    #[test]
    fn tight_and_loose_lists() {
        assert_eq!(
            html_of("- a\n- b\n", &Options::default()),
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n"
        );
        assert_eq!(
            html_of("- a\n\n- b\n", &Options::default()),
            "<ul>\n<li>\n<p>a</p>\n</li>\n<li>\n<p>b</p>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn ordered_list_start() {
        assert_eq!(
            html_of("3. a\n4. b\n", &Options::default()),
            "<ol start=\"3\">\n<li>a</li>\n<li>b</li>\n</ol>\n"
        );
    }

    #[test]
    fn code_block_language_class() {
        assert_eq!(
            html_of("```rust\nlet x = 1;\n```\n", &Options::default()),
            "<pre><code class=\"language-rust\">let x = 1;\n</code></pre>\n"
        );
    }

    #[test]
    fn github_pre_lang_moves_language() {
        let options = Options {
            github_pre_lang: true,
            ..Options::default()
        };
        assert_eq!(
            html_of("```rust\nx\n```\n", &options),
            "<pre lang=\"rust\"><code>x\n</code></pre>\n"
        );
    }

    #[test]
    fn raw_html_policies() {
        let input = "<div>x</div>\n";
        assert_eq!(
            html_of(input, &Options::default()),
            "<!-- raw HTML omitted -->\n"
        );
        let safe = Options {
            safe: true,
            ..Options::default()
        };
        assert_eq!(html_of(input, &safe), "&lt;div&gt;x&lt;/div&gt;\n");
        let unsafe_ = Options {
            unsafe_: true,
            ..Options::default()
        };
        assert_eq!(html_of(input, &unsafe_), "<div>x</div>\n");
    }

    #[test]
    fn image_alt_text_is_plain() {
        assert_eq!(
            html_of("![an *alt*](/i.png \"t\")\n", &Options::default()),
            "<p><img src=\"/i.png\" alt=\"an alt\" title=\"t\" /></p>\n"
        );
    }

    #[test]
    fn href_escaping() {
        assert_eq!(
            html_of("[x](/a b)\n", &Options::default()),
            "<p>[x](/a b)</p>\n"
        );
        assert_eq!(
            html_of("[x](/a%20b?q=1&r=2)\n", &Options::default()),
            "<p><a href=\"/a%20b?q=1&amp;r=2\">x</a></p>\n"
        );
    }

    #[test]
    fn sourcepos_attributes() {
        let options = Options {
            sourcepos: true,
            ..Options::default()
        };
        let out = html_of("hello\n", &options);
        assert!(out.starts_with("<p data-sourcepos=\"1:1-1:5\""), "{out}");
    }

    #[test]
    fn softbreak_variants() {
        assert_eq!(html_of("a\nb\n", &Options::default()), "<p>a\nb</p>\n");
        let hard = Options {
            hardbreaks: true,
            ..Options::default()
        };
        assert_eq!(html_of("a\nb\n", &hard), "<p>a<br />\nb</p>\n");
        let nob = Options {
            nobreaks: true,
            ..Options::default()
        };
        assert_eq!(html_of("a\nb\n", &nob), "<p>a b</p>\n");
    }
}
