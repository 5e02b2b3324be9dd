//! Renderers over the finished tree.
//!
//! HTML and XML walk the tree directly. The four text-based formats
//! (CommonMark, man, LaTeX, plaintext) share [`TextRenderer`], a prefix- and
//! width-aware line writer; each format contributes a per-node function and
//! a character escaper.

pub mod commonmark;
pub mod html;
pub mod latex;
pub mod man;
pub mod plaintext;
pub mod xml;

use std::sync::Arc;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::extension::{RenderFormat, SyntaxExtension};
use crate::iter::{IterEvent, TreeIter};
use crate::options::Options;
use crate::tree::{NodeId, Tree};

pub use html::HtmlRenderer;

/// Render to HTML.
pub fn html(tree: &Tree, options: &Options, extensions: &[Arc<dyn SyntaxExtension>]) -> String {
    html::render(tree, options, extensions)
}

/// Render to the CommonMark AST XML format.
pub fn xml(tree: &Tree, options: &Options, extensions: &[Arc<dyn SyntaxExtension>]) -> String {
    xml::render(tree, options, extensions)
}

/// Render back to CommonMark. `width` of 0 disables wrapping.
pub fn commonmark(
    tree: &Tree,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
    width: usize,
) -> String {
    commonmark::render(tree, options, extensions, width)
}

/// Render to a groff man page body.
pub fn man(
    tree: &Tree,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
    width: usize,
) -> String {
    man::render(tree, options, extensions, width)
}

/// Render to a LaTeX fragment.
pub fn latex(
    tree: &Tree,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
    width: usize,
) -> String {
    latex::render(tree, options, extensions, width)
}

/// Render to plain text, dropping all markup.
pub fn plaintext(
    tree: &Tree,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
    width: usize,
) -> String {
    plaintext::render(tree, options, extensions, width)
}

/// How [`TextRenderer::out`] treats each character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escaping {
    /// Verbatim.
    Literal,
    /// Running-text escaping for the format.
    Normal,
    /// Link destination position.
    Url,
    /// Link title position.
    Title,
}

type Escaper = fn(&mut TextRenderer, char, Option<char>, Escaping);

/// Line writer shared by the text-based renderers. Tracks the line prefix
/// (for block quotes and list continuations), display columns for wrapping,
/// and pending line breaks so blank lines never stack.
pub struct TextRenderer {
    options: Options,
    buffer: String,
    prefix: String,
    column: usize,
    width: usize,
    need_cr: u8,
    /// Byte position in `buffer` of the last space a wrap may break at.
    last_breakable: usize,
    begin_line: bool,
    begin_content: bool,
    no_linebreaks: bool,
    in_tight_list_item: bool,
    /// Characters extensions want backslash-escaped (CommonMark output only).
    extension_escapes: Vec<char>,
    escaper: Escaper,
}

impl TextRenderer {
    fn new(options: &Options, width: usize, escaper: Escaper) -> Self {
        Self {
            options: options.clone(),
            buffer: String::new(),
            prefix: String::new(),
            column: 0,
            width,
            need_cr: 0,
            last_breakable: 0,
            begin_line: true,
            begin_content: true,
            no_linebreaks: false,
            in_tight_list_item: false,
            extension_escapes: Vec::new(),
            escaper,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether nothing has been written on the current line yet (after the
    /// prefix). Escapers use this for line-start-sensitive characters.
    pub fn begin_content(&self) -> bool {
        self.begin_content
    }

    /// Whether an attached extension asked for `c` to be escaped.
    pub fn extension_escape(&self, c: char) -> bool {
        self.extension_escapes.contains(&c)
    }

    pub fn in_tight_list_item(&self) -> bool {
        self.in_tight_list_item
    }

    pub fn set_in_tight_list_item(&mut self, tight: bool) {
        self.in_tight_list_item = tight;
    }

    /// Suppress wrapping and soft breaks (inside headings and table cells).
    pub fn set_no_linebreaks(&mut self, no: bool) {
        self.no_linebreaks = no;
    }

    pub fn no_linebreaks(&self) -> bool {
        self.no_linebreaks
    }

    pub fn push_prefix(&mut self, prefix: &str) {
        self.prefix.push_str(prefix);
    }

    pub fn pop_prefix(&mut self, len: usize) {
        let keep = self.prefix.len().saturating_sub(len);
        self.prefix.truncate(keep);
    }

    /// Request a line break before the next output.
    pub fn cr(&mut self) {
        if self.need_cr < 1 {
            self.need_cr = 1;
        }
    }

    /// Request a blank line before the next output.
    pub fn blankline(&mut self) {
        if self.need_cr < 2 {
            self.need_cr = 2;
        }
    }

    /// Write literal text, no escaping.
    pub fn lit(&mut self, s: &str) {
        for c in s.chars() {
            self.putc(c);
        }
    }

    /// Write text through the format's escaper, optionally wrapping at the
    /// configured width.
    pub fn out(&mut self, text: &str, wrap: bool, escaping: Escaping) {
        let wrap = wrap && self.width > 0 && !self.no_linebreaks;
        let chars: Vec<char> = text.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            let next = chars.get(i + 1).copied();
            if c == ' ' && wrap && !self.begin_line && self.need_cr == 0 {
                self.putc(' ');
                self.last_breakable = self.buffer.len();
                continue;
            }
            (self.escaper)(self, c, next, escaping);
            if wrap && self.column > self.width && self.last_breakable > 0 {
                self.break_line();
            }
        }
    }

    /// Append one character to the buffer, flushing pending breaks and the
    /// line prefix first.
    pub fn putc(&mut self, c: char) {
        self.flush_cr();
        if self.begin_line {
            self.buffer.push_str(&self.prefix);
            self.column = UnicodeWidthStr::width(self.prefix.as_str());
            self.begin_line = false;
        }
        if c == '\n' {
            while self.buffer.ends_with(' ') {
                self.buffer.pop();
            }
            self.buffer.push('\n');
            self.begin_line = true;
            self.begin_content = true;
            self.column = 0;
            self.last_breakable = 0;
            return;
        }
        self.buffer.push(c);
        self.column += UnicodeWidthChar::width(c).unwrap_or(0);
        self.begin_content = false;
    }

    fn flush_cr(&mut self) {
        if self.need_cr == 0 {
            return;
        }
        while self.buffer.ends_with(' ') {
            self.buffer.pop();
        }
        if !self.buffer.is_empty() {
            if !self.buffer.ends_with('\n') {
                self.buffer.push('\n');
            }
            if self.need_cr > 1 && !self.buffer.ends_with("\n\n") {
                // blank lines inside a prefixed context keep the prefix
                let line = self.prefix.trim_end().to_string();
                self.buffer.push_str(&line);
                self.buffer.push('\n');
            }
        }
        self.need_cr = 0;
        self.begin_line = true;
        self.begin_content = true;
        self.column = 0;
        self.last_breakable = 0;
    }

    /// Turn the last breakable space into a newline and re-prefix what
    /// followed it.
    fn break_line(&mut self) {
        let tail = self.buffer.split_off(self.last_breakable);
        let tail = tail.trim_start_matches(' ').to_string();
        while self.buffer.ends_with(' ') {
            self.buffer.pop();
        }
        self.buffer.push('\n');
        self.buffer.push_str(&self.prefix);
        self.buffer.push_str(&tail);
        self.column = UnicodeWidthStr::width(self.prefix.as_str()) + UnicodeWidthStr::width(tail.as_str());
        self.last_breakable = 0;
        self.begin_line = false;
    }

    fn finish(mut self) -> String {
        if !self.buffer.is_empty() && !self.buffer.ends_with('\n') {
            self.buffer.push('\n');
        }
        self.buffer
    }
}

type NodeFn = fn(&mut TextRenderer, &Tree, NodeId, bool);

/// Shared driver for the text-based formats: walks the tree, delegating
/// extension-owned nodes to their extension and everything else to the
/// format's node function.
fn render_text_format(
    format: RenderFormat,
    tree: &Tree,
    options: &Options,
    extensions: &[Arc<dyn SyntaxExtension>],
    width: usize,
    escaper: Escaper,
    node_fn: NodeFn,
) -> String {
    let mut rr = TextRenderer::new(options, width, escaper);
    if format == RenderFormat::CommonMark {
        rr.extension_escapes = (0x21u8..0x7f)
            .map(char::from)
            .filter(|&c| extensions.iter().any(|e| e.commonmark_escape(c)))
            .collect();
    }
    for (node, event) in TreeIter::new(tree, tree.root()) {
        let entering = event == IterEvent::Enter;
        if let Some(name) = tree.extension_name(node) {
            if let Some(ext) = extensions.iter().find(|e| e.name() == name) {
                ext.render_text(format, &mut rr, tree, node, entering);
            }
            continue;
        }
        node_fn(&mut rr, tree, node, entering);
    }
    rr.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_escaper(rr: &mut TextRenderer, c: char, _next: Option<char>, _e: Escaping) {
        rr.putc(c);
    }

    #[test]
    fn blank_lines_never_stack() {
        let mut rr = TextRenderer::new(&Options::default(), 0, noop_escaper);
        rr.lit("a");
        rr.blankline();
        rr.blankline();
        rr.cr();
        rr.lit("b");
        assert_eq!(rr.finish(), "a\n\nb\n");
    }

    #[test]
    fn prefix_applies_to_each_line() {
        let mut rr = TextRenderer::new(&Options::default(), 0, noop_escaper);
        rr.push_prefix("> ");
        rr.lit("a\nb");
        assert_eq!(rr.finish(), "> a\n> b\n");
    }

    #[test]
    fn wrapping_breaks_at_spaces() {
        let mut rr = TextRenderer::new(&Options::default(), 10, noop_escaper);
        rr.out("one two three four", true, Escaping::Literal);
        let text = rr.finish();
        assert!(text.lines().all(|l| l.len() <= 10), "{text:?}");
        assert_eq!(text.split_whitespace().count(), 4);
    }

    #[test]
    fn wide_characters_count_double() {
        let mut rr = TextRenderer::new(&Options::default(), 0, noop_escaper);
        rr.lit("漢字");
        assert_eq!(rr.column, 4);
    }
}
