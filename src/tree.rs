//! The document tree.
//!
//! Nodes live in an arena owned by [`Tree`] and are addressed by stable
//! [`NodeId`] indices, so edits are O(1) pointer surgery without any manual
//! lifetime bookkeeping. Parent and sibling links are plain indices
//! (non-owning back-references); the arena owns every node.
//!
//! The arena doubles as the bulk-lifetime mechanism: [`Tree::checkpoint`]
//! marks a point and [`Tree::restore`] frees every node created since.
//! Restoring invalidates all `NodeId`s minted after the checkpoint — that is
//! a caller obligation, though the accessors degrade to `None` rather than
//! panicking on a stale id.

use std::any::Any;

/// Stable index of a node in its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Source span of a node, 1-based lines and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sourcepos {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl std::fmt::Display for Sourcepos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

/// Kind of a list node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListType {
    Bullet,
    Ordered,
}

/// Delimiter style of an ordered list marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListDelimType {
    Period,
    Paren,
}

/// Alignment of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableAlignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// Payload of `List` and `Item` nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListData {
    pub list_type: ListType,
    pub delimiter: ListDelimType,
    /// Start number of an ordered list.
    pub start: usize,
    pub tight: bool,
    /// Marker character of a bullet list (`-`, `+`, or `*`).
    pub bullet_char: u8,
    /// Column of the marker relative to its container.
    pub marker_offset: usize,
    /// Columns from the marker start to the item content.
    pub padding: usize,
}

impl Default for ListData {
    fn default() -> Self {
        Self {
            list_type: ListType::Bullet,
            delimiter: ListDelimType::Period,
            start: 1,
            tight: false,
            bullet_char: b'-',
            marker_offset: 0,
            padding: 0,
        }
    }
}

/// Payload of `CodeBlock` nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeBlockData {
    pub fenced: bool,
    pub fence_char: u8,
    pub fence_length: usize,
    pub fence_offset: usize,
    /// Info string of a fenced block, entity- and backslash-unescaped.
    pub info: String,
    pub literal: String,
}

/// Payload of `Heading` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeadingData {
    pub level: u8,
    pub setext: bool,
}

/// Payload of `Link` and `Image` nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkData {
    pub url: String,
    pub title: String,
}

/// Payload of `Table` nodes (owned by the table extension).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableData {
    pub alignments: Vec<TableAlignment>,
}

/// Payload of `TaskItem` nodes (owned by the tasklist extension).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItemData {
    pub list: ListData,
    pub checked: bool,
    /// The character between the brackets in the source (` `, `x`, `X`).
    pub symbol: char,
}

/// Payload of third-party custom nodes: raw text emitted on enter/exit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomNodeData {
    pub on_enter: String,
    pub on_exit: String,
}

/// The typed variant of a node. The variant determines which payload fields
/// are valid; the type-guarded accessors on [`Tree`] return `None`/`false`
/// for a mismatched kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    // Blocks
    Document,
    BlockQuote,
    List(ListData),
    Item(ListData),
    CodeBlock(CodeBlockData),
    HtmlBlock(String),
    Paragraph,
    Heading(HeadingData),
    ThematicBreak,
    FootnoteDefinition(String),
    Table(TableData),
    /// `true` for the header row.
    TableRow(bool),
    TableCell,
    TaskItem(TaskItemData),
    CustomBlock(CustomNodeData),

    // Inlines
    Text(String),
    SoftBreak,
    LineBreak,
    Code(String),
    HtmlInline(String),
    Emph,
    Strong,
    Link(LinkData),
    Image(LinkData),
    FootnoteReference(String),
    Strikethrough,
    CustomInline(CustomNodeData),
}

impl NodeValue {
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeValue::Document
                | NodeValue::BlockQuote
                | NodeValue::List(_)
                | NodeValue::Item(_)
                | NodeValue::CodeBlock(_)
                | NodeValue::HtmlBlock(_)
                | NodeValue::Paragraph
                | NodeValue::Heading(_)
                | NodeValue::ThematicBreak
                | NodeValue::FootnoteDefinition(_)
                | NodeValue::Table(_)
                | NodeValue::TableRow(_)
                | NodeValue::TableCell
                | NodeValue::TaskItem(_)
                | NodeValue::CustomBlock(_)
        )
    }

    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }

    /// Blocks whose raw text content is parsed into inline children.
    pub fn contains_inlines(&self) -> bool {
        matches!(
            self,
            NodeValue::Paragraph | NodeValue::Heading(_) | NodeValue::TableCell
        )
    }

    /// Blocks that accumulate raw lines during block parsing.
    pub(crate) fn accepts_lines(&self) -> bool {
        matches!(
            self,
            NodeValue::Paragraph
                | NodeValue::Heading(_)
                | NodeValue::CodeBlock(_)
                | NodeValue::HtmlBlock(_)
        )
    }

    /// Whether the node kind may ever have children. Leaf kinds produce no
    /// `Exit` event during iteration.
    pub fn can_have_children(&self) -> bool {
        !matches!(
            self,
            NodeValue::Text(_)
                | NodeValue::SoftBreak
                | NodeValue::LineBreak
                | NodeValue::Code(_)
                | NodeValue::HtmlInline(_)
                | NodeValue::HtmlBlock(_)
                | NodeValue::CodeBlock(_)
                | NodeValue::ThematicBreak
                | NodeValue::FootnoteReference(_)
        )
    }

    /// Built-in containment rule: may `self` hold `child`?
    /// Extensions widen this via their `can_contain` hook.
    pub fn can_contain(&self, child: &NodeValue) -> bool {
        match self {
            NodeValue::Document
            | NodeValue::BlockQuote
            | NodeValue::Item(_)
            | NodeValue::TaskItem(_)
            | NodeValue::FootnoteDefinition(_) => {
                child.is_block() && !matches!(child, NodeValue::Item(_) | NodeValue::TaskItem(_))
            }
            NodeValue::List(_) => matches!(child, NodeValue::Item(_) | NodeValue::TaskItem(_)),
            NodeValue::Table(_) => matches!(child, NodeValue::TableRow(_)),
            NodeValue::TableRow(_) => matches!(child, NodeValue::TableCell),
            NodeValue::Paragraph
            | NodeValue::Heading(_)
            | NodeValue::TableCell
            | NodeValue::Emph
            | NodeValue::Strong
            | NodeValue::Link(_)
            | NodeValue::Image(_)
            | NodeValue::Strikethrough
            | NodeValue::CustomInline(_) => child.is_inline(),
            NodeValue::CustomBlock(_) => true,
            _ => false,
        }
    }

    /// Lowercase snake-case name, used by the XML renderer and debugging.
    pub fn type_string(&self) -> &'static str {
        match self {
            NodeValue::Document => "document",
            NodeValue::BlockQuote => "block_quote",
            NodeValue::List(_) => "list",
            NodeValue::Item(_) => "item",
            NodeValue::CodeBlock(_) => "code_block",
            NodeValue::HtmlBlock(_) => "html_block",
            NodeValue::Paragraph => "paragraph",
            NodeValue::Heading(_) => "heading",
            NodeValue::ThematicBreak => "thematic_break",
            NodeValue::FootnoteDefinition(_) => "footnote_definition",
            NodeValue::Table(_) => "table",
            NodeValue::TableRow(true) => "table_header",
            NodeValue::TableRow(false) => "table_row",
            NodeValue::TableCell => "table_cell",
            NodeValue::TaskItem(_) => "tasklist_item",
            NodeValue::CustomBlock(_) => "custom_block",
            NodeValue::Text(_) => "text",
            NodeValue::SoftBreak => "softbreak",
            NodeValue::LineBreak => "linebreak",
            NodeValue::Code(_) => "code",
            NodeValue::HtmlInline(_) => "html_inline",
            NodeValue::Emph => "emph",
            NodeValue::Strong => "strong",
            NodeValue::Link(_) => "link",
            NodeValue::Image(_) => "image",
            NodeValue::FootnoteReference(_) => "footnote_reference",
            NodeValue::Strikethrough => "strikethrough",
            NodeValue::CustomInline(_) => "custom_inline",
        }
    }
}

struct NodeData {
    value: NodeValue,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    sourcepos: Sourcepos,
    /// Raw text gathered during block parsing, consumed by the inline phase.
    content: String,
    open: bool,
    last_line_blank: bool,
    /// HTML block kind 1-7 while an HTML block is being matched.
    html_block_type: u8,
    /// Name of the extension that defines this node's kind, if any.
    extension: Option<&'static str>,
    user_data: Option<Box<dyn Any>>,
}

impl NodeData {
    fn new(value: NodeValue) -> Self {
        Self {
            value,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            sourcepos: Sourcepos::default(),
            content: String::new(),
            open: true,
            last_line_blank: false,
            html_block_type: 0,
            extension: None,
            user_data: None,
        }
    }
}

/// Checkpoint into the node arena; see [`Tree::checkpoint`].
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint(usize);

/// A document tree: an arena of nodes plus the root id.
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding a single `Document` root.
    pub fn new() -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.create(NodeValue::Document);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocate a detached node.
    pub fn create(&mut self, value: NodeValue) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(value));
        id
    }

    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes ever allocated (including detached ones).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ----- links -----

    pub fn value(&self, id: NodeId) -> &NodeValue {
        &self.nodes[id.index()].value
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut NodeValue {
        &mut self.nodes[id.index()].value
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.last_child
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.prev_sibling
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next_sibling
    }

    /// Iterator over the direct children of `id`.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    // ----- edits -----

    /// Detach `id` from its parent and siblings. The subtree below `id`
    /// stays intact; `id` becomes a root of its own until re-attached.
    pub fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if let Some(prev) = prev {
            self.nodes[prev.index()].next_sibling = next;
        } else if let Some(parent) = parent {
            self.nodes[parent.index()].first_child = next;
        }
        if let Some(next) = next {
            self.nodes[next.index()].prev_sibling = prev;
        } else if let Some(parent) = parent {
            self.nodes[parent.index()].last_child = prev;
        }
        let node = &mut self.nodes[id.index()];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Attach `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        let old_last = self.nodes[parent.index()].last_child;
        if let Some(last) = old_last {
            self.nodes[last.index()].next_sibling = Some(child);
            self.nodes[child.index()].prev_sibling = Some(last);
        } else {
            self.nodes[parent.index()].first_child = Some(child);
        }
        self.nodes[parent.index()].last_child = Some(child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Attach `child` as the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.unlink(child);
        let old_first = self.nodes[parent.index()].first_child;
        if let Some(first) = old_first {
            self.nodes[first.index()].prev_sibling = Some(child);
            self.nodes[child.index()].next_sibling = Some(first);
        } else {
            self.nodes[parent.index()].last_child = Some(child);
        }
        self.nodes[parent.index()].first_child = Some(child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Insert `new` immediately before `sibling` under the same parent.
    pub fn insert_before(&mut self, sibling: NodeId, new: NodeId) {
        self.unlink(new);
        let (parent, prev) = {
            let node = &self.nodes[sibling.index()];
            (node.parent, node.prev_sibling)
        };
        if let Some(prev) = prev {
            self.nodes[prev.index()].next_sibling = Some(new);
            self.nodes[new.index()].prev_sibling = Some(prev);
        } else if let Some(parent) = parent {
            self.nodes[parent.index()].first_child = Some(new);
        }
        self.nodes[sibling.index()].prev_sibling = Some(new);
        self.nodes[new.index()].next_sibling = Some(sibling);
        self.nodes[new.index()].parent = parent;
    }

    /// Insert `new` immediately after `sibling` under the same parent.
    pub fn insert_after(&mut self, sibling: NodeId, new: NodeId) {
        self.unlink(new);
        let (parent, next) = {
            let node = &self.nodes[sibling.index()];
            (node.parent, node.next_sibling)
        };
        if let Some(next) = next {
            self.nodes[next.index()].prev_sibling = Some(new);
            self.nodes[new.index()].next_sibling = Some(next);
        } else if let Some(parent) = parent {
            self.nodes[parent.index()].last_child = Some(new);
        }
        self.nodes[sibling.index()].next_sibling = Some(new);
        self.nodes[new.index()].prev_sibling = Some(sibling);
        self.nodes[new.index()].parent = parent;
    }

    /// Put `new` in `old`'s position and detach `old` (children stay with
    /// `old`).
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.insert_before(old, new);
        self.unlink(old);
    }

    // ----- checkpoint / bulk free -----

    /// Mark the current arena end. Nodes allocated after this point can be
    /// bulk-freed with [`Tree::restore`].
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.nodes.len())
    }

    /// Free every node allocated since `cp`. Ids minted after the checkpoint
    /// become invalid; links from surviving nodes into the freed region are
    /// scrubbed so accessors stay total.
    pub fn restore(&mut self, cp: Checkpoint) {
        let keep = cp.0.max(1); // never drop the root
        if keep >= self.nodes.len() {
            return;
        }
        self.nodes.truncate(keep);
        let limit = keep as u32;
        let stale = |id: &mut Option<NodeId>| {
            if id.is_some_and(|n| n.0 >= limit) {
                *id = None;
            }
        };
        for node in &mut self.nodes {
            stale(&mut node.parent);
            stale(&mut node.first_child);
            stale(&mut node.last_child);
            stale(&mut node.prev_sibling);
            stale(&mut node.next_sibling);
        }
    }

    // ----- type-guarded accessors -----

    /// Literal text of `Text`, `Code`, `CodeBlock`, `HtmlBlock`, and
    /// `HtmlInline` nodes.
    pub fn literal(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.value {
            NodeValue::Text(s)
            | NodeValue::Code(s)
            | NodeValue::HtmlBlock(s)
            | NodeValue::HtmlInline(s) => Some(s),
            NodeValue::CodeBlock(data) => Some(&data.literal),
            _ => None,
        }
    }

    pub fn set_literal(&mut self, id: NodeId, literal: &str) -> bool {
        match &mut self.nodes[id.index()].value {
            NodeValue::Text(s)
            | NodeValue::Code(s)
            | NodeValue::HtmlBlock(s)
            | NodeValue::HtmlInline(s) => {
                *s = literal.to_string();
                true
            }
            NodeValue::CodeBlock(data) => {
                data.literal = literal.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn heading_level(&self, id: NodeId) -> Option<u8> {
        match &self.get(id)?.value {
            NodeValue::Heading(data) => Some(data.level),
            _ => None,
        }
    }

    pub fn set_heading_level(&mut self, id: NodeId, level: u8) -> bool {
        if !(1..=6).contains(&level) {
            return false;
        }
        match &mut self.nodes[id.index()].value {
            NodeValue::Heading(data) => {
                data.level = level;
                true
            }
            _ => false,
        }
    }

    fn list_data(&self, id: NodeId) -> Option<&ListData> {
        match &self.get(id)?.value {
            NodeValue::List(data) | NodeValue::Item(data) => Some(data),
            NodeValue::TaskItem(data) => Some(&data.list),
            _ => None,
        }
    }

    fn list_data_mut(&mut self, id: NodeId) -> Option<&mut ListData> {
        match &mut self.get_mut(id)?.value {
            NodeValue::List(data) | NodeValue::Item(data) => Some(data),
            NodeValue::TaskItem(data) => Some(&mut data.list),
            _ => None,
        }
    }

    pub fn list_type(&self, id: NodeId) -> Option<ListType> {
        self.list_data(id).map(|d| d.list_type)
    }

    pub fn set_list_type(&mut self, id: NodeId, list_type: ListType) -> bool {
        match self.list_data_mut(id) {
            Some(data) => {
                data.list_type = list_type;
                true
            }
            None => false,
        }
    }

    pub fn list_delim(&self, id: NodeId) -> Option<ListDelimType> {
        self.list_data(id).map(|d| d.delimiter)
    }

    pub fn list_start(&self, id: NodeId) -> Option<usize> {
        self.list_data(id).map(|d| d.start)
    }

    pub fn set_list_start(&mut self, id: NodeId, start: usize) -> bool {
        match self.list_data_mut(id) {
            Some(data) => {
                data.start = start;
                true
            }
            None => false,
        }
    }

    pub fn list_tight(&self, id: NodeId) -> Option<bool> {
        self.list_data(id).map(|d| d.tight)
    }

    pub fn set_list_tight(&mut self, id: NodeId, tight: bool) -> bool {
        match self.list_data_mut(id) {
            Some(data) => {
                data.tight = tight;
                true
            }
            None => false,
        }
    }

    pub fn fence_info(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.value {
            NodeValue::CodeBlock(data) if data.fenced => Some(&data.info),
            _ => None,
        }
    }

    pub fn set_fence_info(&mut self, id: NodeId, info: &str) -> bool {
        match &mut self.nodes[id.index()].value {
            NodeValue::CodeBlock(data) if data.fenced => {
                data.info = info.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn fence_char(&self, id: NodeId) -> Option<u8> {
        match &self.get(id)?.value {
            NodeValue::CodeBlock(data) if data.fenced => Some(data.fence_char),
            _ => None,
        }
    }

    pub fn fence_length(&self, id: NodeId) -> Option<usize> {
        match &self.get(id)?.value {
            NodeValue::CodeBlock(data) if data.fenced => Some(data.fence_length),
            _ => None,
        }
    }

    pub fn fence_offset(&self, id: NodeId) -> Option<usize> {
        match &self.get(id)?.value {
            NodeValue::CodeBlock(data) if data.fenced => Some(data.fence_offset),
            _ => None,
        }
    }

    pub fn url(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.value {
            NodeValue::Link(data) | NodeValue::Image(data) => Some(&data.url),
            _ => None,
        }
    }

    pub fn set_url(&mut self, id: NodeId, url: &str) -> bool {
        match &mut self.nodes[id.index()].value {
            NodeValue::Link(data) | NodeValue::Image(data) => {
                data.url = url.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn title(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.value {
            NodeValue::Link(data) | NodeValue::Image(data) => Some(&data.title),
            _ => None,
        }
    }

    pub fn set_title(&mut self, id: NodeId, title: &str) -> bool {
        match &mut self.nodes[id.index()].value {
            NodeValue::Link(data) | NodeValue::Image(data) => {
                data.title = title.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn on_enter(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.value {
            NodeValue::CustomBlock(data) | NodeValue::CustomInline(data) => Some(&data.on_enter),
            _ => None,
        }
    }

    pub fn set_on_enter(&mut self, id: NodeId, text: &str) -> bool {
        match &mut self.nodes[id.index()].value {
            NodeValue::CustomBlock(data) | NodeValue::CustomInline(data) => {
                data.on_enter = text.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn on_exit(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.value {
            NodeValue::CustomBlock(data) | NodeValue::CustomInline(data) => Some(&data.on_exit),
            _ => None,
        }
    }

    pub fn set_on_exit(&mut self, id: NodeId, text: &str) -> bool {
        match &mut self.nodes[id.index()].value {
            NodeValue::CustomBlock(data) | NodeValue::CustomInline(data) => {
                data.on_exit = text.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn sourcepos(&self, id: NodeId) -> Sourcepos {
        self.get(id).map(|n| n.sourcepos).unwrap_or_default()
    }

    pub fn set_sourcepos(&mut self, id: NodeId, pos: Sourcepos) {
        if let Some(node) = self.get_mut(id) {
            node.sourcepos = pos;
        }
    }

    /// Opaque user data slot. The owning `Box` is dropped with the tree,
    /// which is where a destructor hook would run.
    pub fn user_data(&self, id: NodeId) -> Option<&dyn Any> {
        self.get(id)?.user_data.as_deref()
    }

    pub fn set_user_data(&mut self, id: NodeId, data: Box<dyn Any>) {
        if let Some(node) = self.get_mut(id) {
            node.user_data = Some(data);
        }
    }

    pub fn take_user_data(&mut self, id: NodeId) -> Option<Box<dyn Any>> {
        self.get_mut(id)?.user_data.take()
    }

    /// Name of the extension that defines this node's kind; `None` for
    /// built-in kinds.
    pub fn extension_name(&self, id: NodeId) -> Option<&'static str> {
        self.get(id)?.extension
    }

    /// Record the defining extension of an extension-owned node.
    pub fn mark_extension(&mut self, id: NodeId, name: &'static str) {
        if let Some(node) = self.get_mut(id) {
            node.extension = Some(name);
        }
    }

    // ----- parse-state plumbing (block parser internals) -----

    pub(crate) fn content(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].content
    }

    pub(crate) fn content_mut(&mut self, id: NodeId) -> &mut String {
        &mut self.nodes[id.index()].content
    }

    pub(crate) fn take_content(&mut self, id: NodeId) -> String {
        std::mem::take(&mut self.nodes[id.index()].content)
    }

    pub(crate) fn is_open(&self, id: NodeId) -> bool {
        self.nodes[id.index()].open
    }

    pub(crate) fn set_open(&mut self, id: NodeId, open: bool) {
        self.nodes[id.index()].open = open;
    }

    pub(crate) fn last_line_blank(&self, id: NodeId) -> bool {
        self.nodes[id.index()].last_line_blank
    }

    pub(crate) fn set_last_line_blank(&mut self, id: NodeId, blank: bool) {
        self.nodes[id.index()].last_line_blank = blank;
    }

    pub(crate) fn html_block_type(&self, id: NodeId) -> u8 {
        self.nodes[id.index()].html_block_type
    }

    pub(crate) fn set_html_block_type(&mut self, id: NodeId, kind: u8) {
        self.nodes[id.index()].html_block_type = kind;
    }

    /// Collect the plain text of all text-bearing descendants, in order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.value(id) {
            NodeValue::Text(s) | NodeValue::Code(s) => out.push_str(s),
            NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
            _ => {}
        }
        let mut child = self.first_child(id);
        while let Some(c) = child {
            self.collect_text(c, out);
            child = self.next_sibling(c);
        }
    }
}

/// Iterator over direct children, see [`Tree::children`].
pub struct Children<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.next_sibling(id);
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(tree: &mut Tree, s: &str) -> NodeId {
        tree.create(NodeValue::Text(s.to_string()))
    }

    #[test]
    fn append_links_both_ends() {
        let mut tree = Tree::new();
        let p = tree.create(NodeValue::Paragraph);
        tree.append_child(tree.root(), p);
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        tree.append_child(p, a);
        tree.append_child(p, b);

        assert_eq!(tree.first_child(p), Some(a));
        assert_eq!(tree.last_child(p), Some(b));
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.previous_sibling(b), Some(a));
        assert_eq!(tree.previous_sibling(a), None);
        assert_eq!(tree.parent(a), Some(p));
    }

    #[test]
    fn unlink_and_reattach() {
        let mut tree = Tree::new();
        let p1 = tree.create(NodeValue::Paragraph);
        let p2 = tree.create(NodeValue::Paragraph);
        tree.append_child(tree.root(), p1);
        tree.append_child(tree.root(), p2);
        let a = text(&mut tree, "a");
        let b = text(&mut tree, "b");
        let c = text(&mut tree, "c");
        tree.append_child(p1, a);
        tree.append_child(p1, b);
        tree.append_child(p1, c);

        let before = tree.child_count(p1);
        tree.unlink(b);
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.child_count(p1), before - 1);
        assert_eq!(tree.next_sibling(a), Some(c));
        assert_eq!(tree.previous_sibling(c), Some(a));

        tree.append_child(p2, b);
        assert_eq!(tree.parent(b), Some(p2));
        assert_eq!(tree.first_child(p2), Some(b));
        assert_eq!(tree.last_child(p2), Some(b));
    }

    #[test]
    fn insert_before_and_after() {
        let mut tree = Tree::new();
        let p = tree.create(NodeValue::Paragraph);
        tree.append_child(tree.root(), p);
        let b = text(&mut tree, "b");
        tree.append_child(p, b);
        let a = text(&mut tree, "a");
        let c = text(&mut tree, "c");
        tree.insert_before(b, a);
        tree.insert_after(b, c);

        let order: Vec<NodeId> = tree.children(p).collect();
        assert_eq!(order, vec![a, b, c]);
        assert_eq!(tree.first_child(p), Some(a));
        assert_eq!(tree.last_child(p), Some(c));
    }

    #[test]
    fn replace_preserves_position() {
        let mut tree = Tree::new();
        let p = tree.create(NodeValue::Paragraph);
        let h = tree.create(NodeValue::Heading(HeadingData {
            level: 2,
            setext: false,
        }));
        tree.append_child(tree.root(), p);
        tree.replace(p, h);
        assert_eq!(tree.first_child(tree.root()), Some(h));
        assert_eq!(tree.parent(p), None);
    }

    #[test]
    fn type_guarded_accessors_reject_mismatch() {
        let mut tree = Tree::new();
        let p = tree.create(NodeValue::Paragraph);
        assert_eq!(tree.heading_level(p), None);
        assert!(!tree.set_heading_level(p, 3));
        assert_eq!(tree.list_tight(p), None);
        assert_eq!(tree.url(p), None);
        // and the tree is unmodified
        assert_eq!(tree.value(p), &NodeValue::Paragraph);
    }

    #[test]
    fn heading_level_bounds() {
        let mut tree = Tree::new();
        let h = tree.create(NodeValue::Heading(HeadingData::default()));
        assert!(tree.set_heading_level(h, 6));
        assert!(!tree.set_heading_level(h, 7));
        assert!(!tree.set_heading_level(h, 0));
        assert_eq!(tree.heading_level(h), Some(6));
    }

    #[test]
    fn checkpoint_restore_scrubs_links() {
        let mut tree = Tree::new();
        let p = tree.create(NodeValue::Paragraph);
        tree.append_child(tree.root(), p);
        let cp = tree.checkpoint();
        let t = text(&mut tree, "scratch");
        tree.append_child(p, t);
        tree.restore(cp);
        assert_eq!(tree.first_child(p), None);
        assert_eq!(tree.last_child(p), None);
        // the paragraph itself survived
        assert_eq!(tree.first_child(tree.root()), Some(p));
    }

    #[test]
    fn user_data_round_trip() {
        let mut tree = Tree::new();
        let p = tree.create(NodeValue::Paragraph);
        tree.set_user_data(p, Box::new(42usize));
        let got = tree.user_data(p).and_then(|d| d.downcast_ref::<usize>());
        assert_eq!(got, Some(&42));
    }
}
