//! Block structure parsing.
//!
//! The parser consumes input line by line, in three steps per line: match
//! the chain of open blocks against the line prefix, try to open new blocks
//! at the remainder, then hand the leftover text to the deepest block that
//! takes lines (falling back to a fresh paragraph). Lazy continuation lets a
//! paragraph swallow lines whose block markers were dropped.
//!
//! Input arrives in arbitrary byte chunks through [`Parser::feed`]; lines
//! are reassembled across chunk boundaries and [`Parser::finish`] flushes
//! the trailing partial line before closing the document.

mod code_blocks;
mod headings;
mod html_blocks;
mod lists;
pub mod reference_definitions;
mod thematic_breaks;
mod utils;

use std::sync::Arc;

use code_blocks::{is_fence_close, try_parse_fence_open};
use headings::{chop_trailing_hashes, try_parse_atx_heading, try_parse_setext_underline};
use html_blocks::{line_ends_block, try_parse_block_start};
use lists::{markers_match, parse_list_marker};
pub use reference_definitions::{Reference, ReferenceMap};
use reference_definitions::{resolve_reference_link_definitions, try_parse_footnote_definition};
use thematic_breaks::try_parse_thematic_break;
use utils::{TAB_STOP, is_space_or_tab, peek, remove_trailing_blank_lines};

use crate::extension::{BlockContinue, SyntaxExtension};
use crate::iter::{IterEvent, TreeIter};
use crate::options::Options;
use crate::parser::inline_parser::InlineParser;
use crate::tree::{CodeBlockData, HeadingData, NodeId, NodeValue, Sourcepos, Tree};

/// Streaming block parser. One parser per document: feed it byte chunks,
/// then call [`Parser::finish`] to get the tree.
pub struct Parser {
    tree: Tree,
    options: Options,
    extensions: Vec<Arc<dyn SyntaxExtension>>,
    refmap: ReferenceMap,
    /// Deepest open block the previous line added text to.
    current: NodeId,
    line: String,
    line_number: usize,
    offset: usize,
    column: usize,
    first_nonspace: usize,
    first_nonspace_column: usize,
    indent: usize,
    blank: bool,
    partially_consumed_tab: bool,
    /// Partial line carried between `feed` calls.
    buffer: Vec<u8>,
    last_buffer_ended_with_cr: bool,
    finished: bool,
}

impl Parser {
    pub fn new(options: &Options) -> Self {
        let tree = Tree::new();
        let current = tree.root();
        Self {
            tree,
            options: options.clone(),
            extensions: Vec::new(),
            refmap: ReferenceMap::new(),
            current,
            line: String::new(),
            line_number: 0,
            offset: 0,
            column: 0,
            first_nonspace: 0,
            first_nonspace_column: 0,
            indent: 0,
            blank: false,
            partially_consumed_tab: false,
            buffer: Vec::new(),
            last_buffer_ended_with_cr: false,
            finished: false,
        }
    }

    /// Attach an extension for this parse. Returns `false` if an extension
    /// with the same name is already attached.
    pub fn attach(&mut self, ext: Arc<dyn SyntaxExtension>) -> bool {
        if self.extensions.iter().any(|e| e.name() == ext.name()) {
            return false;
        }
        log::debug!("attaching extension {}", ext.name());
        self.extensions.push(ext);
        true
    }

    /// Feed a chunk of input. Chunks may split lines, characters, and CRLF
    /// pairs arbitrarily.
    pub fn feed(&mut self, mut data: &[u8]) {
        if self.finished {
            return;
        }
        while !data.is_empty() {
            if self.last_buffer_ended_with_cr && data[0] == b'\n' {
                // second half of a CRLF split across chunks
                data = &data[1..];
                self.last_buffer_ended_with_cr = false;
                continue;
            }
            self.last_buffer_ended_with_cr = false;
            match data.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(i) => {
                    self.buffer.extend_from_slice(&data[..i]);
                    if data[i] == b'\r' {
                        if data.get(i + 1) == Some(&b'\n') {
                            data = &data[i + 2..];
                        } else {
                            self.last_buffer_ended_with_cr = true;
                            data = &data[i + 1..];
                        }
                    } else {
                        data = &data[i + 1..];
                    }
                    let bytes = std::mem::take(&mut self.buffer);
                    self.process_buffered_line(bytes);
                }
                None => {
                    self.buffer.extend_from_slice(data);
                    data = &[];
                }
            }
        }
    }

    /// Flush pending input, close every open block, run the inline phase and
    /// extension post-processing, and hand back the finished tree.
    pub fn finish(mut self) -> Tree {
        if !self.buffer.is_empty() {
            let bytes = std::mem::take(&mut self.buffer);
            self.process_buffered_line(bytes);
        }
        self.finished = true;
        self.line.clear();
        let root = self.tree.root();
        while self.current != root {
            self.current = self.finalize(self.current);
        }
        self.finalize_open_descendants(root);
        self.tree.set_open(root, false);

        self.process_inlines();

        let extensions = self.extensions.clone();
        for ext in &extensions {
            ext.postprocess(&mut self.tree, &self.options);
        }
        if self.options.normalize {
            self.normalize_text_nodes();
        }
        self.tree
    }

    // ----- state exposed to extension hooks -----

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// The line currently being parsed, without its terminator.
    pub fn current_line(&self) -> &str {
        &self.line
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Byte offset of the parse position in the current line.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Byte offset of the first non-space byte at or after the parse
    /// position.
    pub fn first_nonspace(&self) -> usize {
        self.first_nonspace
    }

    /// Column indent between the parse position and the first non-space.
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Whether the rest of the current line is blank.
    pub fn is_blank(&self) -> bool {
        self.blank
    }

    /// Advance the parse position by `count` bytes, or by `count` columns
    /// when `columns` is set (tabs expand at four-column stops and may be
    /// consumed partially).
    pub fn advance_offset(&mut self, mut count: usize, columns: bool) {
        while count > 0 {
            match self.line.as_bytes().get(self.offset) {
                Some(b'\t') => {
                    let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                    if columns {
                        self.partially_consumed_tab = chars_to_tab > count;
                        let advance = chars_to_tab.min(count);
                        self.column += advance;
                        if !self.partially_consumed_tab {
                            self.offset += 1;
                        }
                        count -= advance;
                    } else {
                        self.partially_consumed_tab = false;
                        self.column += chars_to_tab;
                        self.offset += 1;
                        count -= 1;
                    }
                }
                Some(_) => {
                    self.partially_consumed_tab = false;
                    self.offset += 1;
                    self.column += 1;
                    count -= 1;
                }
                None => break,
            }
        }
    }

    /// Consume everything up to the end of the current line.
    pub fn consume_rest_of_line(&mut self) {
        let remaining = self.line.len() - self.offset;
        self.advance_offset(remaining, false);
    }

    /// Open a new block under `parent` (closing open blocks that cannot
    /// contain it) and return its id. Extension block hooks call this so the
    /// containment rules and source positions stay consistent.
    pub fn add_block(&mut self, parent: NodeId, value: NodeValue, start_column: usize) -> NodeId {
        self.add_child(parent, value, start_column)
    }

    /// Close an open block early. Returns its parent. Extension hooks that
    /// restructure the open chain (like a table replacing the paragraph that
    /// held its header row) use this.
    pub fn finalize_block(&mut self, node: NodeId) -> NodeId {
        self.finalize(node)
    }

    // ----- line machinery -----

    fn process_buffered_line(&mut self, bytes: Vec<u8>) {
        // Both UTF-8 paths are lossy; Rust strings cannot carry the invalid
        // bytes the option would otherwise pass through.
        let mut line = String::from_utf8_lossy(&bytes).into_owned();
        if line.contains('\0') {
            line = line.replace('\0', "\u{FFFD}");
        }
        self.process_line(line);
    }

    fn process_line(&mut self, line: String) {
        self.line = line;
        self.line_number += 1;
        self.offset = 0;
        self.column = 0;
        self.blank = false;
        self.partially_consumed_tab = false;
        log::debug!("line {}: {:?}", self.line_number, self.line);

        let (last_matched, all_matched, line_done) = self.check_open_blocks();
        if line_done {
            return;
        }
        let mut container = last_matched;
        self.open_new_blocks(&mut container, all_matched);
        self.add_text_to_container(container, last_matched);
    }

    fn find_first_nonspace(&mut self) {
        let bytes = self.line.as_bytes();
        let mut pos = self.offset;
        let mut col = self.column;
        loop {
            match bytes.get(pos) {
                Some(b' ') => {
                    pos += 1;
                    col += 1;
                }
                Some(b'\t') => {
                    col += TAB_STOP - (col % TAB_STOP);
                    pos += 1;
                }
                _ => break,
            }
        }
        self.first_nonspace = pos;
        self.first_nonspace_column = col;
        self.indent = col - self.column;
        self.blank = pos == bytes.len();
    }

    /// Append the rest of the current line (plus a newline) to a block's
    /// content buffer, materializing the rest of a partially consumed tab.
    fn add_line(&mut self, node: NodeId) {
        let mut chunk = String::new();
        if self.partially_consumed_tab {
            self.offset += 1; // skip over the tab
            let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
            for _ in 0..chars_to_tab {
                chunk.push(' ');
            }
            self.partially_consumed_tab = false;
        }
        chunk.push_str(&self.line[self.offset.min(self.line.len())..]);
        chunk.push('\n');
        self.tree.content_mut(node).push_str(&chunk);
    }

    // ----- phase 1: continuation matching -----

    /// Walk the chain of open blocks, matching each against the line prefix.
    /// Returns the deepest matched block, whether the whole chain matched,
    /// and whether the line was consumed outright.
    fn check_open_blocks(&mut self) -> (NodeId, bool, bool) {
        let mut container = self.tree.root();
        loop {
            let next = self
                .tree
                .last_child(container)
                .filter(|&c| self.tree.is_open(c));
            let Some(child) = next else {
                return (container, true, false);
            };
            self.find_first_nonspace();
            match self.check_continuation(child) {
                BlockContinue::Keep => container = child,
                BlockContinue::Close => return (container, false, false),
                BlockContinue::LineDone => return (container, true, true),
            }
        }
    }

    fn check_continuation(&mut self, node: NodeId) -> BlockContinue {
        if let Some(name) = self.tree.extension_name(node) {
            let ext = self.extensions.iter().find(|e| e.name() == name).cloned();
            return match ext {
                Some(ext) => ext.block_continues(self, node),
                None => BlockContinue::Close,
            };
        }
        match self.tree.value(node).clone() {
            NodeValue::BlockQuote => {
                if self.indent <= 3 && peek(&self.line, self.first_nonspace) == b'>' {
                    self.advance_offset(self.first_nonspace + 1 - self.offset, false);
                    if is_space_or_tab(peek(&self.line, self.offset)) {
                        self.advance_offset(1, true);
                    }
                    BlockContinue::Keep
                } else {
                    BlockContinue::Close
                }
            }
            NodeValue::Item(data) => {
                if self.indent >= data.marker_offset + data.padding {
                    self.advance_offset(data.marker_offset + data.padding, true);
                    BlockContinue::Keep
                } else if self.blank && self.tree.first_child(node).is_some() {
                    self.advance_offset(self.first_nonspace - self.offset, false);
                    BlockContinue::Keep
                } else {
                    BlockContinue::Close
                }
            }
            NodeValue::CodeBlock(data) => {
                if data.fenced {
                    if self.indent <= 3
                        && peek(&self.line, self.first_nonspace) == data.fence_char
                        && is_fence_close(
                            &self.line[self.first_nonspace..],
                            data.fence_char,
                            data.fence_length,
                        )
                    {
                        self.consume_rest_of_line();
                        self.current = self.finalize(node);
                        BlockContinue::LineDone
                    } else {
                        // skip the opening fence's indentation
                        let mut i = data.fence_offset;
                        while i > 0 && is_space_or_tab(peek(&self.line, self.offset)) {
                            self.advance_offset(1, true);
                            i -= 1;
                        }
                        BlockContinue::Keep
                    }
                } else if self.indent >= 4 {
                    self.advance_offset(4, true);
                    BlockContinue::Keep
                } else if self.blank {
                    self.advance_offset(self.first_nonspace - self.offset, false);
                    BlockContinue::Keep
                } else {
                    BlockContinue::Close
                }
            }
            NodeValue::Heading(_) => BlockContinue::Close,
            NodeValue::HtmlBlock(_) => {
                let kind = self.tree.html_block_type(node);
                if matches!(kind, 6 | 7) && self.blank {
                    BlockContinue::Close
                } else {
                    BlockContinue::Keep
                }
            }
            NodeValue::Paragraph => {
                if self.blank {
                    BlockContinue::Close
                } else {
                    BlockContinue::Keep
                }
            }
            NodeValue::FootnoteDefinition(_) => {
                if self.indent >= 4 {
                    self.advance_offset(4, true);
                    BlockContinue::Keep
                } else if self.blank {
                    BlockContinue::Keep
                } else {
                    BlockContinue::Close
                }
            }
            NodeValue::List(_) => BlockContinue::Keep,
            _ => BlockContinue::Keep,
        }
    }

    // ----- phase 2: opening new blocks -----

    fn open_new_blocks(&mut self, container: &mut NodeId, all_matched: bool) {
        loop {
            let cont_value = self.tree.value(*container).clone();
            if matches!(
                cont_value,
                NodeValue::CodeBlock(_) | NodeValue::HtmlBlock(_)
            ) {
                break;
            }
            self.find_first_nonspace();
            let indented = self.indent >= 4;
            let before = *container;

            // extension block openers get first claim
            let extensions = self.extensions.clone();
            let mut ext_opened = None;
            for ext in &extensions {
                if let Some(node) = ext.try_open_block(self, *container) {
                    ext_opened = Some(node);
                    break;
                }
            }
            if let Some(node) = ext_opened {
                *container = node;
            } else if !indented && peek(&self.line, self.first_nonspace) == b'>' {
                let start_col = self.first_nonspace_column + 1;
                self.advance_offset(self.first_nonspace + 1 - self.offset, false);
                if is_space_or_tab(peek(&self.line, self.offset)) {
                    self.advance_offset(1, true);
                }
                *container = self.add_child(*container, NodeValue::BlockQuote, start_col);
            } else if !indented
                && let Some((level, consumed)) =
                    try_parse_atx_heading(&self.line[self.first_nonspace..])
            {
                let start_col = self.first_nonspace_column + 1;
                self.advance_offset(self.first_nonspace + consumed - self.offset, false);
                *container = self.add_child(
                    *container,
                    NodeValue::Heading(HeadingData {
                        level,
                        setext: false,
                    }),
                    start_col,
                );
            } else if !indented
                && let Some((fence_char, fence_length)) =
                    try_parse_fence_open(&self.line[self.first_nonspace..])
            {
                let data = CodeBlockData {
                    fenced: true,
                    fence_char,
                    fence_length,
                    fence_offset: self.first_nonspace - self.offset,
                    ..CodeBlockData::default()
                };
                let start_col = self.first_nonspace_column + 1;
                let fns = self.first_nonspace;
                *container = self.add_child(*container, NodeValue::CodeBlock(data), start_col);
                self.advance_offset(fns + fence_length - self.offset, false);
            } else if !indented
                && let Some(kind) = try_parse_block_start(
                    &self.line[self.first_nonspace..],
                    matches!(cont_value, NodeValue::Paragraph),
                )
            {
                let start_col = self.first_nonspace_column + 1;
                *container =
                    self.add_child(*container, NodeValue::HtmlBlock(String::new()), start_col);
                self.tree.set_html_block_type(*container, kind);
                // the whole line is added as-is below
            } else if !indented
                && matches!(cont_value, NodeValue::Paragraph)
                && let Some(level) = try_parse_setext_underline(&self.line[self.first_nonspace..])
            {
                let mut content = self.tree.take_content(*container);
                let has_content =
                    resolve_reference_link_definitions(&mut content, &mut self.refmap);
                *self.tree.content_mut(*container) = content;
                if has_content {
                    *self.tree.value_mut(*container) = NodeValue::Heading(HeadingData {
                        level,
                        setext: true,
                    });
                    self.consume_rest_of_line();
                }
                // with no content left the underline is ordinary paragraph
                // text, handled below
            } else if !indented
                && !(matches!(cont_value, NodeValue::Paragraph) && !all_matched)
                && try_parse_thematic_break(&self.line[self.first_nonspace..]).is_some()
            {
                let start_col = self.first_nonspace_column + 1;
                *container = self.add_child(*container, NodeValue::ThematicBreak, start_col);
                self.consume_rest_of_line();
                break;
            } else if !indented
                && self.options.footnotes
                && let Some((label, consumed)) =
                    try_parse_footnote_definition(&self.line[self.first_nonspace..])
            {
                let start_col = self.first_nonspace_column + 1;
                self.advance_offset(self.first_nonspace + consumed - self.offset, false);
                *container =
                    self.add_child(*container, NodeValue::FootnoteDefinition(label), start_col);
            } else if (!indented || matches!(cont_value, NodeValue::List(_)))
                && self.indent < 4
                && let Some((mut data, marker_len)) = parse_list_marker(
                    &self.line,
                    self.first_nonspace,
                    matches!(cont_value, NodeValue::Paragraph),
                )
            {
                // compute the item padding from the spacing after the marker
                let start_col = self.first_nonspace_column + 1;
                self.advance_offset(self.first_nonspace + marker_len - self.offset, false);
                let save_offset = self.offset;
                let save_column = self.column;
                let save_tab = self.partially_consumed_tab;
                while self.column - save_column <= 5 && is_space_or_tab(peek(&self.line, self.offset))
                {
                    self.advance_offset(1, true);
                }
                let spaces = self.column - save_column;
                let rest_blank = self.line.len() <= self.offset;
                if spaces >= 5 || spaces < 1 || rest_blank {
                    data.padding = marker_len + 1;
                    self.offset = save_offset;
                    self.column = save_column;
                    self.partially_consumed_tab = save_tab;
                    if spaces > 0 {
                        self.advance_offset(1, true);
                    }
                } else {
                    data.padding = marker_len + spaces;
                }
                data.marker_offset = self.indent;

                let same_list = matches!(&cont_value, NodeValue::List(existing) if markers_match(existing, &data));
                if !same_list {
                    *container =
                        self.add_child(*container, NodeValue::List(data.clone()), start_col);
                }
                *container = self.add_child(*container, NodeValue::Item(data), start_col);
            } else if indented && !matches!(cont_value, NodeValue::Paragraph) && !self.blank {
                self.advance_offset(4, true);
                let data = CodeBlockData::default();
                let start_col = self.column + 1;
                *container = self.add_child(*container, NodeValue::CodeBlock(data), start_col);
            } else {
                break;
            }

            if *container == before {
                // a setext underline with nothing to head
                break;
            }
            if self.tree.value(*container).accepts_lines() {
                break;
            }
        }
    }

    // ----- phase 3: adding text -----

    fn add_text_to_container(&mut self, mut container: NodeId, last_matched: NodeId) {
        self.find_first_nonspace();

        if self.blank
            && let Some(last) = self.tree.last_child(container)
        {
            self.tree.set_last_line_blank(last, true);
        }

        // A blank line makes a list loose, except in a few positions the
        // tightness rules ignore.
        let cont_value = self.tree.value(container).clone();
        let last_line_blank = self.blank
            && !matches!(
                cont_value,
                NodeValue::BlockQuote | NodeValue::Heading(_) | NodeValue::ThematicBreak
            )
            && !matches!(&cont_value, NodeValue::CodeBlock(d) if d.fenced)
            && !(matches!(cont_value, NodeValue::Item(_))
                && self.tree.first_child(container).is_none()
                && self.tree.sourcepos(container).start_line == self.line_number);
        self.tree.set_last_line_blank(container, last_line_blank);
        let mut up = container;
        while let Some(parent) = self.tree.parent(up) {
            self.tree.set_last_line_blank(parent, false);
            up = parent;
        }

        if self.current != last_matched
            && container == last_matched
            && !self.blank
            && matches!(self.tree.value(self.current), NodeValue::Paragraph)
        {
            log::debug!("lazy continuation into paragraph");
            self.add_line(self.current);
            return;
        }

        // close blocks the line did not match
        while self.current != last_matched {
            let parent = self.finalize(self.current);
            if parent == self.current {
                break;
            }
            self.current = parent;
        }

        match self.tree.value(container).clone() {
            NodeValue::CodeBlock(_) => self.add_line(container),
            NodeValue::HtmlBlock(_) => {
                self.add_line(container);
                let kind = self.tree.html_block_type(container);
                if line_ends_block(&self.line[self.first_nonspace.min(self.line.len())..], kind) {
                    container = self.finalize(container);
                }
            }
            _ if self.blank => {}
            value if value.accepts_lines() => {
                if let NodeValue::Heading(h) = &value
                    && !h.setext
                {
                    let keep = self.first_nonspace
                        + chop_trailing_hashes(&self.line[self.first_nonspace..]).len();
                    self.line.truncate(keep);
                }
                self.advance_offset(self.first_nonspace - self.offset, false);
                self.add_line(container);
            }
            _ => {
                let start_col = self.first_nonspace_column + 1;
                container = self.add_child(container, NodeValue::Paragraph, start_col);
                self.advance_offset(self.first_nonspace - self.offset, false);
                self.add_line(container);
            }
        }
        self.current = container;
    }

    // ----- block lifecycle -----

    fn can_contain_value(&self, parent: &NodeValue, child: &NodeValue) -> bool {
        for ext in &self.extensions {
            if let Some(verdict) = ext.can_contain(parent, child) {
                return verdict;
            }
        }
        parent.can_contain(child)
    }

    fn add_child(&mut self, mut parent: NodeId, value: NodeValue, start_column: usize) -> NodeId {
        loop {
            let parent_value = self.tree.value(parent).clone();
            if self.can_contain_value(&parent_value, &value) {
                break;
            }
            let up = self.finalize(parent);
            if up == parent {
                break;
            }
            parent = up;
        }
        let node = self.tree.create(value);
        self.tree.set_sourcepos(
            node,
            Sourcepos {
                start_line: self.line_number,
                start_col: start_column,
                end_line: self.line_number,
                end_col: self.line.len(),
            },
        );
        self.tree.append_child(parent, node);
        node
    }

    /// Close `node`, run its per-kind finalization, and return its parent
    /// (or the root, for the root).
    fn finalize(&mut self, node: NodeId) -> NodeId {
        let parent = self.tree.parent(node).unwrap_or_else(|| self.tree.root());
        self.finalize_inner(node);
        parent
    }

    fn finalize_inner(&mut self, node: NodeId) {
        self.tree.set_open(node, false);
        let mut pos = self.tree.sourcepos(node);
        pos.end_line = self.line_number.max(pos.start_line);
        pos.end_col = pos.end_col.max(self.line.len());
        self.tree.set_sourcepos(node, pos);

        match self.tree.value(node).clone() {
            NodeValue::Paragraph => {
                let mut content = self.tree.take_content(node);
                let has_content =
                    resolve_reference_link_definitions(&mut content, &mut self.refmap);
                if has_content {
                    *self.tree.content_mut(node) = content;
                } else {
                    self.tree.unlink(node);
                }
            }
            NodeValue::CodeBlock(mut data) => {
                let mut content = self.tree.take_content(node);
                if data.fenced {
                    // first line is the info string
                    let split = content.find('\n').map(|i| i + 1).unwrap_or(content.len());
                    let info = content[..split].trim();
                    data.info = crate::parser::inline_parser::entities::unescape_all(info);
                    data.literal = content.split_off(split);
                } else {
                    remove_trailing_blank_lines(&mut content);
                    data.literal = content;
                }
                *self.tree.value_mut(node) = NodeValue::CodeBlock(data);
            }
            NodeValue::HtmlBlock(_) => {
                let content = self.tree.take_content(node);
                *self.tree.value_mut(node) = NodeValue::HtmlBlock(content);
            }
            NodeValue::List(_) => {
                let tight = self.compute_list_tightness(node);
                self.tree.set_list_tight(node, tight);
            }
            _ => {}
        }
    }

    fn compute_list_tightness(&self, list: NodeId) -> bool {
        let mut item = self.tree.first_child(list);
        while let Some(it) = item {
            let next_item = self.tree.next_sibling(it);
            if self.tree.last_line_blank(it) && next_item.is_some() {
                return false;
            }
            let mut sub = self.tree.first_child(it);
            while let Some(s) = sub {
                let next_sub = self.tree.next_sibling(s);
                if self.ends_with_blank_line(s) && (next_item.is_some() || next_sub.is_some()) {
                    return false;
                }
                sub = next_sub;
            }
            item = next_item;
        }
        true
    }

    fn ends_with_blank_line(&self, mut node: NodeId) -> bool {
        loop {
            if self.tree.last_line_blank(node) {
                return true;
            }
            match self.tree.value(node) {
                NodeValue::List(_) | NodeValue::Item(_) => match self.tree.last_child(node) {
                    Some(last) => node = last,
                    None => return false,
                },
                _ => return false,
            }
        }
    }

    /// Close any block left open off the `current` chain (a table inserted
    /// next to a half-finalized paragraph, for instance).
    fn finalize_open_descendants(&mut self, node: NodeId) {
        let mut child = self.tree.first_child(node);
        while let Some(c) = child {
            child = self.tree.next_sibling(c);
            if self.tree.is_open(c) {
                self.finalize_inner(c);
            }
            self.finalize_open_descendants(c);
        }
    }

    // ----- the inline phase -----

    fn process_inlines(&mut self) {
        let mut targets = Vec::new();
        for (node, event) in TreeIter::new(&self.tree, self.tree.root()) {
            if event == IterEvent::Enter && self.tree.value(node).contains_inlines() {
                targets.push(node);
            }
        }
        for node in targets {
            let content = self.tree.take_content(node);
            InlineParser::parse(
                &mut self.tree,
                node,
                &content,
                &self.refmap,
                &self.options,
                &self.extensions,
            );
        }
    }

    fn normalize_text_nodes(&mut self) {
        let mut parents = Vec::new();
        for (node, event) in TreeIter::new(&self.tree, self.tree.root()) {
            if event == IterEvent::Enter && self.tree.first_child(node).is_some() {
                parents.push(node);
            }
        }
        for parent in parents {
            let mut child = self.tree.first_child(parent);
            while let Some(c) = child {
                let next = self.tree.next_sibling(c);
                if let (NodeValue::Text(_), Some(n)) = (self.tree.value(c), next)
                    && let NodeValue::Text(extra) = self.tree.value(n).clone()
                {
                    if let NodeValue::Text(s) = self.tree.value_mut(c) {
                        s.push_str(&extra);
                    }
                    self.tree.unlink(n);
                    // retry the same node against its new neighbor
                    continue;
                }
                child = next;
            }
        }
    }
}
