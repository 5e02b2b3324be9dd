//! Inline structure parsing.
//!
//! Runs once per leaf block after the block phase. A single left-to-right
//! scan emits literal text and pushes candidate emphasis delimiters and
//! brackets onto stacks; emphasis pairing happens back to front when a
//! bracket closes and once more at the end of the block.

pub mod autolinks;
pub mod code_spans;
pub mod entities;

use std::sync::Arc;

use autolinks::{Autolink, try_parse_autolink, try_parse_html_tag};
use code_spans::try_parse_code_span;
use entities::{parse_entity, unescape_all};

use crate::extension::SyntaxExtension;
use crate::options::Options;
use crate::parser::block_parser::ReferenceMap;
use crate::tree::{LinkData, NodeId, NodeValue, Sourcepos, Tree};

/// A candidate emphasis delimiter run: the text node holding it plus pairing
/// state. Entries form a doubly linked list through `prev`/`next` so matched
/// and discarded runs can drop out without shifting indices.
struct Delimiter {
    node: NodeId,
    ch: u8,
    length: usize,
    can_open: bool,
    can_close: bool,
    prev: Option<usize>,
    next: Option<usize>,
}

/// An open `[` or `![`, waiting for its `]`.
struct Bracket {
    node: NodeId,
    /// Byte position just after the bracket, for slicing the raw label.
    position: usize,
    image: bool,
    /// Cleared on enclosing link construction; links do not nest.
    active: bool,
    previous_delimiter: Option<usize>,
}

/// Inline scanner over one block's content. Extensions get a `&mut` to this
/// from their `match_inline` hook.
pub struct InlineParser<'a> {
    tree: &'a mut Tree,
    block: NodeId,
    input: &'a str,
    pos: usize,
    options: &'a Options,
    refmap: &'a ReferenceMap,
    extensions: &'a [Arc<dyn SyntaxExtension>],
    special: [bool; 128],
    delimiters: Vec<Delimiter>,
    last_delimiter: Option<usize>,
    brackets: Vec<Bracket>,
    base: Sourcepos,
}

impl<'a> InlineParser<'a> {
    /// Parse `content` into inline children of `block`.
    pub(crate) fn parse(
        tree: &'a mut Tree,
        block: NodeId,
        content: &'a str,
        refmap: &'a ReferenceMap,
        options: &'a Options,
        extensions: &'a [Arc<dyn SyntaxExtension>],
    ) {
        let input = content.trim_end_matches(['\n', '\r', ' ', '\t']);
        let mut special = [false; 128];
        for c in ['\n', '\r', '`', '\\', '&', '<', '[', ']', '!', '*', '_'] {
            special[c as usize] = true;
        }
        if options.smart {
            for c in ['\'', '"', '-', '.'] {
                special[c as usize] = true;
            }
        }
        for ext in extensions {
            for &c in ext.special_characters() {
                if (c as usize) < 128 {
                    special[c as usize] = true;
                }
            }
            for c in 0u8..128 {
                if ext.is_delimiter_char(c as char) {
                    special[c as usize] = true;
                }
            }
        }
        let base = tree.sourcepos(block);
        let mut this = InlineParser {
            tree,
            block,
            input,
            pos: 0,
            options,
            refmap,
            extensions,
            special,
            delimiters: Vec::new(),
            last_delimiter: None,
            brackets: Vec::new(),
            base,
        };
        while this.parse_next() {}
        this.process_emphasis(None);
    }

    // ----- state exposed to extension hooks -----

    /// The block content being scanned.
    pub fn input(&self) -> &str {
        self.input
    }

    /// Current byte position in [`InlineParser::input`].
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Move the scan position forward by `n` bytes.
    pub fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        self.tree
    }

    /// The block whose inline children are being built.
    pub fn block(&self) -> NodeId {
        self.block
    }

    /// Create an inline node positioned at the scanner, without inserting it.
    pub fn make_inline(&mut self, value: NodeValue) -> NodeId {
        let pos = self.spos(self.pos, self.pos);
        let node = self.tree.create(value);
        self.tree.set_sourcepos(node, pos);
        node
    }

    /// Create an inline node and append it to the current block.
    pub fn append_inline(&mut self, value: NodeValue) -> NodeId {
        let node = self.make_inline(value);
        self.tree.append_child(self.block, node);
        node
    }

    // ----- the scan loop -----

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn char_before(&self, pos: usize) -> char {
        self.input[..pos].chars().next_back().unwrap_or('\n')
    }

    fn char_after(&self, pos: usize) -> char {
        self.input[pos..].chars().next().unwrap_or('\n')
    }

    fn is_special(&self, c: char) -> bool {
        (c as usize) < 128 && self.special[c as usize]
    }

    fn parse_next(&mut self) -> bool {
        let Some(c) = self.peek_char() else {
            return false;
        };

        // extension-owned characters first
        let extensions = self.extensions;
        for ext in extensions {
            if ext.special_characters().contains(&c) && ext.match_inline(self, c).is_some() {
                return true;
            }
            if ext.is_delimiter_char(c) {
                self.handle_delim(c);
                return true;
            }
        }

        match c {
            '\n' | '\r' => self.handle_newline(),
            '`' => self.handle_backticks(),
            '\\' => self.handle_backslash(),
            '&' => self.handle_entity(),
            '<' => self.handle_pointy_brace(),
            '*' | '_' => self.handle_delim(c),
            '\'' | '"' if self.options.smart => self.handle_delim(c),
            '-' if self.options.smart => self.handle_hyphen(),
            '.' if self.options.smart => self.handle_period(),
            '[' => self.handle_open_bracket(),
            ']' => self.handle_close_bracket(),
            '!' => self.handle_bang(),
            _ => self.handle_text(),
        }
        true
    }

    fn handle_text(&mut self) {
        let start = self.pos;
        let mut iter = self.input[self.pos..].char_indices();
        iter.next();
        self.pos = iter
            .find(|&(_, c)| self.is_special(c))
            .map(|(i, _)| start + i)
            .unwrap_or(self.input.len());
        let text = self.input[start..self.pos].to_string();
        self.append_text(text, start);
    }

    fn append_text(&mut self, text: String, start: usize) {
        let pos = self.spos(start, self.pos);
        let node = self.tree.create(NodeValue::Text(text));
        self.tree.set_sourcepos(node, pos);
        self.tree.append_child(self.block, node);
    }

    fn handle_newline(&mut self) {
        let start = self.pos;
        if self.peek_char() == Some('\r') {
            self.pos += 1;
        }
        if self.peek_char() == Some('\n') {
            self.pos += 1;
        }

        // two or more trailing spaces force a hard break
        let mut hard = false;
        if let Some(last) = self.tree.last_child(self.block)
            && let NodeValue::Text(s) = self.tree.value(last)
        {
            let trimmed = s.trim_end_matches(' ');
            hard = s.len() - trimmed.len() >= 2;
            let trimmed = trimmed.to_string();
            if trimmed.is_empty() {
                self.tree.unlink(last);
            } else if let NodeValue::Text(s) = self.tree.value_mut(last) {
                *s = trimmed;
            }
        }

        let value = if hard || self.options.hardbreaks {
            NodeValue::LineBreak
        } else if self.options.nobreaks {
            NodeValue::Text(" ".to_string())
        } else {
            NodeValue::SoftBreak
        };
        let pos = self.spos(start, self.pos);
        let node = self.tree.create(value);
        self.tree.set_sourcepos(node, pos);
        self.tree.append_child(self.block, node);

        while self.peek_char() == Some(' ') {
            self.pos += 1;
        }
    }

    fn handle_backticks(&mut self) {
        match try_parse_code_span(self.input, self.pos) {
            Some((literal, len)) => {
                let start = self.pos;
                self.pos += len;
                let pos = self.spos(start, self.pos);
                let node = self.tree.create(NodeValue::Code(literal));
                self.tree.set_sourcepos(node, pos);
                self.tree.append_child(self.block, node);
            }
            None => {
                let start = self.pos;
                let run = self.input[self.pos..]
                    .bytes()
                    .take_while(|&b| b == b'`')
                    .count();
                self.pos += run;
                self.append_text("`".repeat(run), start);
            }
        }
    }

    fn handle_backslash(&mut self) {
        let start = self.pos;
        self.pos += 1;
        match self.peek_char() {
            Some(c) if c.is_ascii_punctuation() => {
                self.pos += 1;
                self.append_text(c.to_string(), start);
            }
            Some('\n') | Some('\r') => {
                if self.peek_char() == Some('\r') {
                    self.pos += 1;
                }
                if self.peek_char() == Some('\n') {
                    self.pos += 1;
                }
                let pos = self.spos(start, self.pos);
                let node = self.tree.create(NodeValue::LineBreak);
                self.tree.set_sourcepos(node, pos);
                self.tree.append_child(self.block, node);
                while self.peek_char() == Some(' ') {
                    self.pos += 1;
                }
            }
            _ => self.append_text("\\".to_string(), start),
        }
    }

    fn handle_entity(&mut self) {
        let start = self.pos;
        match parse_entity(&self.input[self.pos..]) {
            Some((decoded, len)) => {
                self.pos += len;
                self.append_text(decoded, start);
            }
            None => {
                self.pos += 1;
                self.append_text("&".to_string(), start);
            }
        }
    }

    fn handle_pointy_brace(&mut self) {
        let tail = &self.input[self.pos..];
        if let Some((kind, len)) = try_parse_autolink(tail) {
            let inner = self.input[self.pos + 1..self.pos + len - 1].to_string();
            let url = match kind {
                Autolink::Uri => inner.clone(),
                Autolink::Email => format!("mailto:{inner}"),
            };
            let start = self.pos;
            self.pos += len;
            let pos = self.spos(start, self.pos);
            let link = self.tree.create(NodeValue::Link(LinkData {
                url,
                title: String::new(),
            }));
            self.tree.set_sourcepos(link, pos);
            let text = self.tree.create(NodeValue::Text(inner));
            self.tree.set_sourcepos(text, pos);
            self.tree.append_child(link, text);
            self.tree.append_child(self.block, link);
            return;
        }
        if let Some(len) = try_parse_html_tag(tail, self.options.liberal_html_tag) {
            let raw = self.input[self.pos..self.pos + len].to_string();
            let start = self.pos;
            self.pos += len;
            let pos = self.spos(start, self.pos);
            let node = self.tree.create(NodeValue::HtmlInline(raw));
            self.tree.set_sourcepos(node, pos);
            self.tree.append_child(self.block, node);
            return;
        }
        let start = self.pos;
        self.pos += 1;
        self.append_text("<".to_string(), start);
    }

    // ----- delimiters and emphasis -----

    fn handle_delim(&mut self, c: char) {
        let start = self.pos;
        let length = if c == '\'' || c == '"' {
            1
        } else {
            self.input[self.pos..]
                .chars()
                .take_while(|&x| x == c)
                .count()
        };
        self.pos += length * c.len_utf8();

        let before = self.char_before(start);
        let after = self.char_after(self.pos);
        let before_ws = before.is_whitespace();
        let after_ws = after.is_whitespace();
        let before_punct = is_punctuation(before);
        let after_punct = is_punctuation(after);

        let left_flanking = !after_ws && !(after_punct && !before_ws && !before_punct);
        let right_flanking = !before_ws && !(before_punct && !after_ws && !after_punct);
        let (can_open, can_close) = match c {
            '_' => (
                left_flanking && (!right_flanking || before_punct),
                right_flanking && (!left_flanking || after_punct),
            ),
            '\'' | '"' => (
                left_flanking && !right_flanking && before != ']' && before != ')',
                right_flanking,
            ),
            _ => (left_flanking, right_flanking),
        };

        let text: String = std::iter::repeat_n(c, length).collect();
        let spos = self.spos(start, self.pos);
        let node = self.tree.create(NodeValue::Text(text));
        self.tree.set_sourcepos(node, spos);
        self.tree.append_child(self.block, node);

        let idx = self.delimiters.len();
        self.delimiters.push(Delimiter {
            node,
            ch: c as u8,
            length,
            can_open,
            can_close,
            prev: self.last_delimiter,
            next: None,
        });
        if let Some(last) = self.last_delimiter {
            self.delimiters[last].next = Some(idx);
        }
        self.last_delimiter = Some(idx);
    }

    fn remove_delimiter(&mut self, idx: usize) {
        let (prev, next) = (self.delimiters[idx].prev, self.delimiters[idx].next);
        if let Some(p) = prev {
            self.delimiters[p].next = next;
        }
        if let Some(n) = next {
            self.delimiters[n].prev = prev;
        } else {
            self.last_delimiter = prev;
        }
    }

    /// Pair delimiters above `stack_bottom`, back to front, wrapping matched
    /// spans in emphasis (or extension) nodes. Everything above the bottom is
    /// discarded afterwards.
    fn process_emphasis(&mut self, stack_bottom: Option<usize>) {
        // walk to the first delimiter above the bottom
        let mut closer = match stack_bottom {
            Some(b) => self.delimiters[b].next,
            None => {
                let mut first = self.last_delimiter;
                while let Some(i) = first
                    && let Some(p) = self.delimiters[i].prev
                {
                    first = Some(p);
                }
                first
            }
        };

        // for each closer kind, the position below which no opener can match
        let mut openers_bottom: std::collections::HashMap<(u8, usize), Option<usize>> =
            std::collections::HashMap::new();

        while let Some(cl) = closer {
            if !self.delimiters[cl].can_close {
                closer = self.delimiters[cl].next;
                continue;
            }
            let ch = self.delimiters[cl].ch;
            let key = (ch, self.delimiters[cl].length % 3);
            let bottom = *openers_bottom.get(&key).unwrap_or(&stack_bottom);

            let mut opener = None;
            let mut probe = self.delimiters[cl].prev;
            while probe != bottom && probe.is_some() {
                let op = probe.unwrap_or_default();
                if self.delimiters[op].can_open && self.delimiters[op].ch == ch {
                    // the length-mod-three rule for intraword emphasis
                    let odd = (self.delimiters[cl].can_open || self.delimiters[op].can_close)
                        && self.delimiters[cl].length % 3 != 0
                        && (self.delimiters[op].length + self.delimiters[cl].length) % 3 == 0;
                    if !(matches!(ch, b'*' | b'_') && odd) {
                        opener = Some(op);
                        break;
                    }
                }
                probe = self.delimiters[op].prev;
            }

            match ch {
                b'*' | b'_' => {
                    if let Some(op) = opener {
                        closer = self.insert_emphasis(op, cl);
                    } else {
                        openers_bottom.insert(key, self.delimiters[cl].prev);
                        let next = self.delimiters[cl].next;
                        if !self.delimiters[cl].can_open {
                            self.remove_delimiter(cl);
                        }
                        closer = next;
                    }
                }
                b'\'' | b'"' => {
                    let right = if ch == b'\'' { "\u{2019}" } else { "\u{201d}" };
                    let left = if ch == b'\'' { "\u{2018}" } else { "\u{201c}" };
                    self.set_text(self.delimiters[cl].node, right);
                    if let Some(op) = opener {
                        self.set_text(self.delimiters[op].node, left);
                        self.remove_delimiter(op);
                    }
                    let next = self.delimiters[cl].next;
                    self.remove_delimiter(cl);
                    closer = next;
                }
                _ => {
                    // extension delimiter
                    let mut matched = None;
                    if let Some(op) = opener {
                        for ext in self.extensions {
                            if ext.is_delimiter_char(ch as char)
                                && let Some((value, use_delims)) = ext.delimiter_match(
                                    ch as char,
                                    self.delimiters[op].length,
                                    self.delimiters[cl].length,
                                    self.options,
                                )
                            {
                                matched = Some((op, value, use_delims, ext.name()));
                                break;
                            }
                        }
                    }
                    match matched {
                        Some((op, value, use_delims, ext_name)) => {
                            closer = self.wrap_span(op, cl, value, use_delims, Some(ext_name));
                        }
                        None => {
                            openers_bottom.insert(key, self.delimiters[cl].prev);
                            let next = self.delimiters[cl].next;
                            if !self.delimiters[cl].can_open {
                                self.remove_delimiter(cl);
                            }
                            closer = next;
                        }
                    }
                }
            }
        }

        // drop everything above the bottom
        while self.last_delimiter != stack_bottom {
            match self.last_delimiter {
                Some(i) => self.remove_delimiter(i),
                None => break,
            }
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let NodeValue::Text(s) = self.tree.value_mut(node) {
            s.clear();
            s.push_str(text);
        }
    }

    fn insert_emphasis(&mut self, opener: usize, closer: usize) -> Option<usize> {
        let use_delims = if self.delimiters[opener].length >= 2 && self.delimiters[closer].length >= 2
        {
            2
        } else {
            1
        };
        let value = if use_delims == 2 {
            NodeValue::Strong
        } else {
            NodeValue::Emph
        };
        self.wrap_span(opener, closer, value, use_delims, None)
    }

    /// Wrap everything between two delimiter runs in `value`, consuming
    /// `use_delims` characters from each run. Returns the closer to resume
    /// pairing at.
    fn wrap_span(
        &mut self,
        opener: usize,
        closer: usize,
        value: NodeValue,
        use_delims: usize,
        extension: Option<&'static str>,
    ) -> Option<usize> {
        let opener_node = self.delimiters[opener].node;
        let closer_node = self.delimiters[closer].node;

        self.delimiters[opener].length -= use_delims;
        self.delimiters[closer].length -= use_delims;
        let opener_len = self.delimiters[opener].length;
        let closer_len = self.delimiters[closer].length;
        if let NodeValue::Text(s) = self.tree.value_mut(opener_node) {
            s.truncate(opener_len);
        }
        if let NodeValue::Text(s) = self.tree.value_mut(closer_node) {
            s.drain(..use_delims);
        }

        // delimiters between the pair can never match anything now
        let mut d = self.delimiters[opener].next;
        while let Some(i) = d
            && i != closer
        {
            let next = self.delimiters[i].next;
            self.remove_delimiter(i);
            d = next;
        }

        let span = self.tree.create(value);
        self.tree
            .set_sourcepos(span, self.tree.sourcepos(opener_node));
        if let Some(name) = extension {
            self.tree.mark_extension(span, name);
        }
        self.tree.insert_after(opener_node, span);
        loop {
            let Some(next) = self.tree.next_sibling(span) else {
                break;
            };
            if next == closer_node {
                break;
            }
            self.tree.unlink(next);
            self.tree.append_child(span, next);
        }

        if opener_len == 0 {
            self.tree.unlink(opener_node);
            self.remove_delimiter(opener);
        }
        if closer_len == 0 {
            self.tree.unlink(closer_node);
            let next = self.delimiters[closer].next;
            self.remove_delimiter(closer);
            next
        } else {
            Some(closer)
        }
    }

    // ----- brackets, links, images -----

    fn handle_open_bracket(&mut self) {
        let start = self.pos;
        self.pos += 1;
        self.append_text("[".to_string(), start);
        let node = self
            .tree
            .last_child(self.block)
            .unwrap_or_else(|| self.tree.root());
        self.brackets.push(Bracket {
            node,
            position: self.pos,
            image: false,
            active: true,
            previous_delimiter: self.last_delimiter,
        });
    }

    fn handle_bang(&mut self) {
        let start = self.pos;
        self.pos += 1;
        if self.peek_char() == Some('[') {
            self.pos += 1;
            self.append_text("![".to_string(), start);
            let node = self
                .tree
                .last_child(self.block)
                .unwrap_or_else(|| self.tree.root());
            self.brackets.push(Bracket {
                node,
                position: self.pos,
                image: true,
                active: true,
                previous_delimiter: self.last_delimiter,
            });
        } else {
            self.append_text("!".to_string(), start);
        }
    }

    fn handle_close_bracket(&mut self) {
        let start = self.pos;
        self.pos += 1;

        let Some(bracket) = self.brackets.pop() else {
            self.append_text("]".to_string(), start);
            return;
        };
        if !bracket.active {
            self.append_text("]".to_string(), start);
            return;
        }

        let raw_label = &self.input[bracket.position..start];

        if self.options.footnotes
            && !bracket.image
            && let Some(name) = raw_label.strip_prefix('^')
            && !name.is_empty()
            && !name.contains([' ', '\t', '\n', '[', ']'])
        {
            let name = name.to_string();
            self.collapse_bracket_into(&bracket, NodeValue::FootnoteReference(name));
            return;
        }

        // inline form: (destination "title")
        let mut target = None;
        if self.peek_char() == Some('(')
            && let Some((url, title, end)) = scan_inline_link(self.input, self.pos)
        {
            target = Some((url, title));
            self.pos = end;
        }

        // reference forms: full, collapsed, shortcut
        if target.is_none() {
            let mut label = raw_label;
            let mut label_end = self.pos;
            if self.peek_char() == Some('[')
                && let Some((explicit, end)) = scan_link_label(self.input, self.pos)
            {
                if !explicit.is_empty() {
                    label = explicit;
                }
                label_end = end;
            }
            if let Some(reference) = self.refmap.lookup(label) {
                target = Some((reference.url.clone(), reference.title.clone()));
                self.pos = label_end;
            }
        }

        let Some((url, title)) = target else {
            self.append_text("]".to_string(), start);
            return;
        };

        log::debug!(
            "{} to {url:?}",
            if bracket.image { "image" } else { "link" }
        );
        let data = LinkData { url, title };
        let value = if bracket.image {
            NodeValue::Image(data)
        } else {
            NodeValue::Link(data)
        };
        let link = self.tree.create(value);
        self.tree
            .set_sourcepos(link, self.tree.sourcepos(bracket.node));
        self.tree.insert_before(bracket.node, link);
        loop {
            let Some(next) = self.tree.next_sibling(bracket.node) else {
                break;
            };
            self.tree.unlink(next);
            self.tree.append_child(link, next);
        }
        self.process_emphasis(bracket.previous_delimiter);
        self.tree.unlink(bracket.node);

        if !bracket.image {
            for b in &mut self.brackets {
                if !b.image {
                    b.active = false;
                }
            }
        }
    }

    /// Replace the bracket's opener text and everything after it with a
    /// single childless node (footnote references keep no label inlines).
    fn collapse_bracket_into(&mut self, bracket: &Bracket, value: NodeValue) {
        while let Some(next) = self.tree.next_sibling(bracket.node) {
            self.tree.unlink(next);
        }
        let node = self.tree.create(value);
        self.tree
            .set_sourcepos(node, self.tree.sourcepos(bracket.node));
        self.tree.insert_after(bracket.node, node);
        self.tree.unlink(bracket.node);
        // delimiters inside the label point at unlinked nodes now
        while self.last_delimiter != bracket.previous_delimiter {
            match self.last_delimiter {
                Some(i) => self.remove_delimiter(i),
                None => break,
            }
        }
    }

    // ----- smart punctuation -----

    fn handle_hyphen(&mut self) {
        let start = self.pos;
        let run = self.input[self.pos..]
            .bytes()
            .take_while(|&b| b == b'-')
            .count();
        self.pos += run;
        if run == 1 {
            self.append_text("-".to_string(), start);
            return;
        }
        let (ems, ens) = if run % 3 == 0 {
            (run / 3, 0)
        } else if run % 2 == 0 {
            (0, run / 2)
        } else if run % 3 == 2 {
            ((run - 2) / 3, 1)
        } else {
            ((run - 4) / 3, 2)
        };
        let mut text = String::new();
        for _ in 0..ems {
            text.push('\u{2014}');
        }
        for _ in 0..ens {
            text.push('\u{2013}');
        }
        self.append_text(text, start);
    }

    fn handle_period(&mut self) {
        let start = self.pos;
        let run = self.input[self.pos..]
            .bytes()
            .take_while(|&b| b == b'.')
            .count();
        self.pos += run;
        if run == 3 {
            self.append_text("\u{2026}".to_string(), start);
        } else {
            self.append_text(".".repeat(run), start);
        }
    }

    // ----- source positions -----

    /// Map byte range `[start, end)` of the content onto document lines.
    /// Columns are relative to the stripped line prefix, which is as precise
    /// as the per-line content buffer allows.
    fn spos(&self, start: usize, end: usize) -> Sourcepos {
        if !self.options.sourcepos {
            return self.base;
        }
        let locate = |at: usize| {
            let before = &self.input[..at.min(self.input.len())];
            let line = before.bytes().filter(|&b| b == b'\n').count();
            let col = at - before.rfind('\n').map(|i| i + 1).unwrap_or(0);
            (self.base.start_line + line, col + 1)
        };
        let (start_line, start_col) = locate(start);
        let (end_line, end_col) = locate(end.max(start + 1) - 1);
        Sourcepos {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(c,
            '\u{00a1}' | '\u{00a7}' | '\u{00ab}' | '\u{00b6}' | '\u{00b7}' | '\u{00bb}'
            | '\u{00bf}' | '\u{2010}'..='\u{2027}' | '\u{2030}'..='\u{205e}')
}

/// Scan `(dest "title")` starting at the `(`. Returns the unescaped
/// destination and title plus the position just past the `)`.
fn scan_inline_link(input: &str, open: usize) -> Option<(String, String, usize)> {
    let bytes = input.as_bytes();
    let mut i = open + 1;
    i = skip_link_whitespace(bytes, i);
    let (url_raw, after_url) = scan_link_destination(input, i)?;
    i = skip_link_whitespace(bytes, after_url);

    let mut title_raw = "";
    if i > after_url
        && let Some((t, after_title)) = scan_link_title(input, i)
    {
        title_raw = t;
        i = skip_link_whitespace(bytes, after_title);
    }
    if bytes.get(i) != Some(&b')') {
        return None;
    }
    Some((unescape_all(url_raw), unescape_all(title_raw), i + 1))
}

fn skip_link_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while matches!(bytes.get(i), Some(b' ' | b'\t' | b'\n' | b'\r')) {
        i += 1;
    }
    i
}

/// `<...>` or a balanced-paren run without whitespace or control bytes. The
/// bare form may be empty when `)` follows immediately.
fn scan_link_destination(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start) == Some(&b'<') {
        let mut i = start + 1;
        while let Some(&b) = bytes.get(i) {
            match b {
                b'>' => return Some((&input[start + 1..i], i + 1)),
                b'<' | b'\n' => return None,
                b'\\' => i += 2,
                _ => i += 1,
            }
        }
        return None;
    }
    let mut depth = 0i32;
    let mut i = start;
    while let Some(&b) = bytes.get(i) {
        match b {
            b' ' | b'\t' | b'\n' | b'\r' => break,
            b'\\' => i += 2,
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                i += 1;
            }
            0..=0x1f => break,
            _ => i += 1,
        }
    }
    if depth != 0 {
        return None;
    }
    Some((&input[start..i.min(input.len())], i.min(input.len())))
}

fn scan_link_title(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    let close = match bytes.get(start)? {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let open = bytes[start];
    let mut i = start + 1;
    while let Some(&b) = bytes.get(i) {
        match b {
            b if b == close => return Some((&input[start + 1..i], i + 1)),
            b'(' if open == b'(' => return None,
            b'\\' => i += 2,
            _ => i += 1,
        }
    }
    None
}

/// Scan a `[label]` at `start`. Returns the label content (which may be
/// empty, for collapsed references) and the position just past the `]`.
fn scan_link_label(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start) != Some(&b'[') {
        return None;
    }
    let mut i = start + 1;
    while let Some(&b) = bytes.get(i) {
        match b {
            b']' => {
                if i - start - 1 > 999 {
                    return None;
                }
                return Some((&input[start + 1..i], i + 1));
            }
            b'[' => return None,
            b'\\' => i += 2,
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn parse_para(input: &str, options: &Options) -> (Tree, NodeId) {
        init_logger();
        let mut parser = Parser::new(options);
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        let para = tree.first_child(tree.root()).expect("paragraph");
        (tree, para)
    }

    fn child_values(tree: &Tree, node: NodeId) -> Vec<NodeValue> {
        tree.children(node).map(|c| tree.value(c).clone()).collect()
    }

    #[test]
    fn single_and_double_emphasis() {
        let (tree, p) = parse_para("*em* and **strong**", &Options::default());
        let kids = child_values(&tree, p);
        assert!(matches!(kids[0], NodeValue::Emph));
        assert!(matches!(kids.last(), Some(NodeValue::Strong)));
    }

    #[test]
    fn underscore_stays_literal_inside_words() {
        let (tree, p) = parse_para("snake_case_name", &Options::default());
        assert_eq!(tree.text_content(p), "snake_case_name");
        assert_eq!(tree.child_count(p), 1);
    }

    #[test]
    fn unmatched_delimiters_stay_text() {
        let (tree, p) = parse_para("a ** b", &Options::default());
        assert_eq!(tree.text_content(p), "a ** b");
    }

    #[test]
    fn code_span_suppresses_emphasis() {
        let (tree, p) = parse_para("`*not em*`", &Options::default());
        let kids = child_values(&tree, p);
        assert_eq!(kids, vec![NodeValue::Code("*not em*".to_string())]);
    }

    #[test]
    fn inline_link_with_title() {
        let (tree, p) = parse_para("[text](/url \"the title\")", &Options::default());
        let link = tree.first_child(p).expect("link");
        assert_eq!(tree.url(link), Some("/url"));
        assert_eq!(tree.title(link), Some("the title"));
        assert_eq!(tree.text_content(link), "text");
    }

    #[test]
    fn collapsed_and_shortcut_references() {
        let input = "[foo][]\n\n[foo] bar\n\n[foo]: /dest\n";
        let (tree, p1) = parse_para(input, &Options::default());
        let link = tree.first_child(p1).expect("link");
        assert_eq!(tree.url(link), Some("/dest"));
        let p2 = tree.next_sibling(p1).expect("second paragraph");
        let link2 = tree.first_child(p2).expect("shortcut link");
        assert_eq!(tree.url(link2), Some("/dest"));
    }

    #[test]
    fn unknown_reference_is_literal() {
        let (tree, p) = parse_para("[nope] text", &Options::default());
        assert_eq!(tree.text_content(p), "[nope] text");
    }

    #[test]
    fn links_do_not_nest() {
        let input = "[a [b](/inner) c](/outer)\n\n";
        let (tree, p) = parse_para(input, &Options::default());
        // the inner link wins; the outer brackets stay literal
        let urls: Vec<_> = tree
            .children(p)
            .filter_map(|c| tree.url(c).map(str::to_string))
            .collect();
        assert_eq!(urls, vec!["/inner".to_string()]);
    }

    #[test]
    fn image_with_emphasized_alt() {
        let (tree, p) = parse_para("![an *alt*](/img.png)", &Options::default());
        let img = tree.first_child(p).expect("image");
        assert!(matches!(tree.value(img), NodeValue::Image(_)));
        assert_eq!(tree.text_content(img), "an alt");
    }

    #[test]
    fn hard_break_from_trailing_spaces() {
        let (tree, p) = parse_para("a  \nb", &Options::default());
        let kids = child_values(&tree, p);
        assert!(kids.contains(&NodeValue::LineBreak));
        // the break-forcing spaces are gone
        assert_eq!(tree.text_content(p), "ab");
    }

    #[test]
    fn nobreaks_turns_newlines_into_spaces() {
        let options = Options {
            nobreaks: true,
            ..Options::default()
        };
        let (tree, p) = parse_para("a\nb", &options);
        assert_eq!(tree.text_content(p), "a b");
    }

    #[test]
    fn backslash_escape_and_escaped_newline() {
        let (tree, p) = parse_para("\\*lit\\*\\\nnext", &Options::default());
        assert!(child_values(&tree, p).contains(&NodeValue::LineBreak));
        assert!(tree.text_content(p).starts_with("*lit*"));
    }

    #[test]
    fn entity_decoding_in_text() {
        let (tree, p) = parse_para("a &amp; b &#35; c", &Options::default());
        assert_eq!(tree.text_content(p), "a & b # c");
    }

    #[test]
    fn uri_and_email_autolinks() {
        let (tree, p) = parse_para(
            "<https://example.com> and <who@example.com>",
            &Options::default(),
        );
        let links: Vec<_> = tree
            .children(p)
            .filter_map(|c| tree.url(c).map(str::to_string))
            .collect();
        assert_eq!(
            links,
            vec![
                "https://example.com".to_string(),
                "mailto:who@example.com".to_string()
            ]
        );
    }

    #[test]
    fn smart_punctuation() {
        let options = Options {
            smart: true,
            ..Options::default()
        };
        let (tree, p) = parse_para("\"quoted\" -- it's 1--2 and done...", &options);
        let text = tree.text_content(p);
        assert!(text.starts_with("\u{201c}quoted\u{201d}"));
        assert!(text.contains('\u{2019}'));
        assert!(text.contains('\u{2013}'));
        assert!(text.ends_with('\u{2026}'));
    }

    #[test]
    fn footnote_reference_parsing() {
        let options = Options {
            footnotes: true,
            ..Options::default()
        };
        let (tree, p) = parse_para("see[^note]\n\n[^note]: detail\n", &options);
        let kids = child_values(&tree, p);
        assert!(
            kids.iter()
                .any(|v| matches!(v, NodeValue::FootnoteReference(n) if n == "note"))
        );
    }

    #[test]
    fn rule_of_three_prevents_intraword_match() {
        let (tree, p) = parse_para("*a**b*", &Options::default());
        // the single-star pair matches; the double stays literal inside
        let kids = child_values(&tree, p);
        assert!(matches!(kids[0], NodeValue::Emph));
    }
}
