//! Pipe tables: a header row, a delimiter row, and any number of body rows.
//!
//! ```text
//! | name | count |
//! | ---- | ----: |
//! | a    |     1 |
//! ```
//!
//! The delimiter row is spotted while a paragraph is open; the paragraph's
//! last line becomes the header and subsequent lines are consumed as rows.

use std::sync::Arc;

use crate::extension::{BlockContinue, RenderFormat, SyntaxExtension};
use crate::parser::Parser;
use crate::render::{HtmlRenderer, TextRenderer};
use crate::tree::{NodeId, NodeValue, Sourcepos, TableAlignment, TableData, Tree};

pub fn table() -> Arc<dyn SyntaxExtension> {
    Arc::new(Table)
}

/// Number of columns of a table node. `None` for other kinds.
pub fn column_count(tree: &Tree, node: NodeId) -> Option<usize> {
    match tree.value(node) {
        NodeValue::Table(data) => Some(data.alignments.len()),
        _ => None,
    }
}

/// Alignment of column `index` of a table node.
pub fn alignment(tree: &Tree, node: NodeId, index: usize) -> Option<TableAlignment> {
    match tree.value(node) {
        NodeValue::Table(data) => data.alignments.get(index).copied(),
        _ => None,
    }
}

/// Whether a row node is the header row. `None` for other kinds.
pub fn is_header_row(tree: &Tree, node: NodeId) -> Option<bool> {
    match tree.value(node) {
        NodeValue::TableRow(header) => Some(*header),
        _ => None,
    }
}

struct Table;

/// Split a row line into trimmed cell strings. Backslash-escaped pipes stay
/// in the cell (the inline phase unescapes them). `None` if the line has no
/// pipe at all.
fn parse_table_row(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim_end();
    if !trimmed.contains('|') {
        return None;
    }
    let mut cells = Vec::new();
    let mut cur = String::new();
    let mut chars = trimmed.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                cur.push('\\');
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            }
            '|' => {
                cells.push(cur.trim().to_string());
                cur.clear();
            }
            _ => cur.push(c),
        }
    }
    cells.push(cur.trim().to_string());
    // leading and trailing pipes produce empty boundary cells
    if trimmed.starts_with('|') {
        cells.remove(0);
    }
    if trimmed.ends_with('|') && !trimmed.ends_with("\\|") && !cells.is_empty() {
        cells.pop();
    }
    if cells.is_empty() {
        return None;
    }
    Some(cells)
}

/// Parse a delimiter row like `| :-- | :-: | --: |` into per-column
/// alignments.
fn parse_delimiter_row(line: &str) -> Option<Vec<TableAlignment>> {
    let cells = parse_table_row(line)?;
    let mut alignments = Vec::with_capacity(cells.len());
    for cell in &cells {
        let left = cell.starts_with(':');
        let right = cell.ends_with(':');
        let dashes = cell.trim_matches(':');
        if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
            return None;
        }
        alignments.push(match (left, right) {
            (false, false) => TableAlignment::None,
            (true, false) => TableAlignment::Left,
            (false, true) => TableAlignment::Right,
            (true, true) => TableAlignment::Center,
        });
    }
    Some(alignments)
}

impl Table {
    /// Append one row of cells to `table`, padding or truncating to the
    /// column count. Cell text is inline-parsed later with everything else.
    fn append_row(&self, parser: &mut Parser, table: NodeId, cells: Vec<String>, header: bool) {
        let line_number = parser.line_number();
        let line_len = parser.current_line().len();
        let NodeValue::Table(data) = parser.tree().value(table) else {
            return;
        };
        let ncols = data.alignments.len();
        let start_line = if header {
            line_number.saturating_sub(1)
        } else {
            line_number
        };
        let pos = Sourcepos {
            start_line,
            start_col: 1,
            end_line: start_line,
            end_col: line_len,
        };
        let tree = parser.tree_mut();
        let row = tree.create(NodeValue::TableRow(header));
        tree.mark_extension(row, "table");
        tree.set_open(row, false);
        tree.set_sourcepos(row, pos);
        tree.append_child(table, row);
        for i in 0..ncols {
            let cell = tree.create(NodeValue::TableCell);
            tree.mark_extension(cell, "table");
            tree.set_open(cell, false);
            tree.set_sourcepos(cell, pos);
            if let Some(text) = cells.get(i) {
                *tree.content_mut(cell) = text.clone();
            }
            tree.append_child(row, cell);
        }
    }
}

/// Alignment of the `index`-th column of the table containing `row`.
fn column_alignment(tree: &Tree, row: NodeId, index: usize) -> TableAlignment {
    tree.parent(row)
        .and_then(|table| match tree.value(table) {
            NodeValue::Table(data) => data.alignments.get(index).copied(),
            _ => None,
        })
        .unwrap_or(TableAlignment::None)
}

fn cell_index(tree: &Tree, cell: NodeId) -> usize {
    let Some(row) = tree.parent(cell) else {
        return 0;
    };
    tree.children(row).take_while(|&c| c != cell).count()
}

impl SyntaxExtension for Table {
    fn name(&self) -> &'static str {
        "table"
    }

    fn special_characters(&self) -> &[char] {
        &['|']
    }

    fn commonmark_escape(&self, ch: char) -> bool {
        ch == '|'
    }

    fn try_open_block(&self, parser: &mut Parser, container: NodeId) -> Option<NodeId> {
        if parser.indent() >= 4
            || !matches!(parser.tree().value(container), NodeValue::Paragraph)
        {
            return None;
        }
        let line = parser.current_line().to_string();
        let alignments = parse_delimiter_row(&line[parser.first_nonspace()..])?;
        let content = parser.tree().content(container).to_string();
        let header_line = content.lines().last()?;
        let header_cells = parse_table_row(header_line)?;
        if header_cells.len() != alignments.len() {
            log::debug!(
                "delimiter row has {} columns, header has {}",
                alignments.len(),
                header_cells.len()
            );
            return None;
        }

        let line_number = parser.line_number();
        let line_count = content.lines().count();
        let tree = parser.tree_mut();
        let table = tree.create(NodeValue::Table(TableData { alignments }));
        tree.mark_extension(table, "table");
        tree.set_sourcepos(
            table,
            Sourcepos {
                start_line: line_number.saturating_sub(1),
                start_col: 1,
                end_line: line_number,
                end_col: line.len(),
            },
        );
        if line_count > 1 {
            // earlier lines stay behind as the paragraph
            let kept: String = content
                .lines()
                .take(line_count - 1)
                .flat_map(|l| [l, "\n"])
                .collect();
            *tree.content_mut(container) = kept;
            tree.insert_after(container, table);
            parser.finalize_block(container);
        } else {
            let tree = parser.tree_mut();
            tree.take_content(container);
            tree.replace(container, table);
        }
        self.append_row(parser, table, header_cells, true);
        parser.consume_rest_of_line();
        Some(table)
    }

    fn block_continues(&self, parser: &mut Parser, node: NodeId) -> BlockContinue {
        if !matches!(parser.tree().value(node), NodeValue::Table(_)) {
            return BlockContinue::Close;
        }
        if parser.is_blank() {
            return BlockContinue::Close;
        }
        let line = parser.current_line()[parser.first_nonspace()..].to_string();
        let Some(cells) = parse_table_row(&line) else {
            return BlockContinue::Close;
        };
        self.append_row(parser, node, cells, false);
        parser.consume_rest_of_line();
        BlockContinue::LineDone
    }

    fn render_html(
        &self,
        renderer: &mut HtmlRenderer,
        tree: &Tree,
        node: NodeId,
        entering: bool,
    ) -> bool {
        match tree.value(node) {
            NodeValue::Table(_) => {
                if entering {
                    renderer.cr();
                    renderer.write("<table");
                    renderer.sourcepos(tree, node);
                    renderer.write(">\n");
                } else {
                    if matches!(
                        tree.last_child(node).map(|r| tree.value(r)),
                        Some(NodeValue::TableRow(false))
                    ) {
                        renderer.write("</tbody>\n");
                    }
                    renderer.write("</table>\n");
                }
            }
            NodeValue::TableRow(header) => {
                if entering {
                    if *header {
                        renderer.write("<thead>\n");
                    } else if matches!(
                        tree.previous_sibling(node).map(|r| tree.value(r)),
                        Some(NodeValue::TableRow(true))
                    ) {
                        renderer.write("<tbody>\n");
                    }
                    renderer.write("<tr");
                    renderer.sourcepos(tree, node);
                    renderer.write(">\n");
                } else {
                    renderer.write("</tr>\n");
                    if *header {
                        renderer.write("</thead>\n");
                    }
                }
            }
            NodeValue::TableCell => {
                let row = tree.parent(node);
                let header = matches!(
                    row.map(|r| tree.value(r)),
                    Some(NodeValue::TableRow(true))
                );
                let tag = if header { "th" } else { "td" };
                if entering {
                    renderer.write("<");
                    renderer.write(tag);
                    let alignment = row
                        .map(|r| column_alignment(tree, r, cell_index(tree, node)))
                        .unwrap_or(TableAlignment::None);
                    let name = match alignment {
                        TableAlignment::None => None,
                        TableAlignment::Left => Some("left"),
                        TableAlignment::Center => Some("center"),
                        TableAlignment::Right => Some("right"),
                    };
                    if let Some(name) = name {
                        if renderer.options().table_prefer_style_attributes {
                            renderer.write(&format!(" style=\"text-align: {name}\""));
                        } else {
                            renderer.write(&format!(" align=\"{name}\""));
                        }
                    }
                    renderer.sourcepos(tree, node);
                    renderer.write(">");
                } else {
                    renderer.write("</");
                    renderer.write(tag);
                    renderer.write(">\n");
                }
            }
            _ => return false,
        }
        true
    }

    fn render_text(
        &self,
        _format: RenderFormat,
        renderer: &mut TextRenderer,
        tree: &Tree,
        node: NodeId,
        entering: bool,
    ) -> bool {
        match tree.value(node) {
            NodeValue::Table(_) => {
                if entering {
                    renderer.blankline();
                    renderer.set_no_linebreaks(true);
                } else {
                    renderer.set_no_linebreaks(false);
                    renderer.blankline();
                }
            }
            NodeValue::TableRow(header) => {
                if entering {
                    renderer.cr();
                    renderer.lit("|");
                } else if *header {
                    // the delimiter row reproduces the column alignments
                    renderer.cr();
                    renderer.lit("|");
                    if let Some(NodeValue::Table(data)) =
                        tree.parent(node).map(|t| tree.value(t))
                    {
                        for alignment in &data.alignments {
                            renderer.lit(match alignment {
                                TableAlignment::None => " --- |",
                                TableAlignment::Left => " :-- |",
                                TableAlignment::Center => " :-: |",
                                TableAlignment::Right => " --: |",
                            });
                        }
                    }
                }
            }
            NodeValue::TableCell => {
                if entering {
                    renderer.lit(" ");
                } else {
                    renderer.lit(" |");
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
    use crate::options::Options;
    use crate::render;

    fn parse(input: &str, options: &Options) -> Tree {
        let mut parser = crate::parser::Parser::new(options);
        parser.attach(table());
        parser.feed(input.as_bytes());
        parser.finish()
    }

    fn html_of(input: &str, options: &Options) -> String {
        let tree = parse(input, options);
        render::html(&tree, options, &[table()])
    }

    #[test]
    fn basic_table_shape() {
        assert_eq!(
            html_of("| a | b |\n| --- | --- |\n| 1 | 2 |\n", &Options::default()),
            "<table>\n<thead>\n<tr>\n<th>a</th>\n<th>b</th>\n</tr>\n</thead>\n\
             <tbody>\n<tr>\n<td>1</td>\n<td>2</td>\n</tr>\n</tbody>\n</table>\n"
        );
    }

    #[test]
    fn header_only_table() {
        assert_eq!(
            html_of("| a |\n| --- |\n", &Options::default()),
            "<table>\n<thead>\n<tr>\n<th>a</th>\n</tr>\n</thead>\n</table>\n"
        );
    }

    #[test]
    fn alignments_become_attributes() {
        let out = html_of(
            "| l | c | r |\n| :-- | :-: | --: |\n| 1 | 2 | 3 |\n",
            &Options::default(),
        );
        assert!(out.contains("<th align=\"left\">l</th>"), "{out}");
        assert!(out.contains("<th align=\"center\">c</th>"), "{out}");
        assert!(out.contains("<td align=\"right\">3</td>"), "{out}");
    }

    #[test]
    fn style_attributes_option() {
        let options = Options {
            table_prefer_style_attributes: true,
            ..Options::default()
        };
        let out = html_of("| l |\n| :-- |\n", &options);
        assert!(out.contains("<th style=\"text-align: left\">l</th>"), "{out}");
    }

    #[test]
    fn column_count_mismatch_stays_a_paragraph() {
        let out = html_of("| a | b |\n| --- |\n", &Options::default());
        assert!(out.starts_with("<p>"), "{out}");
        assert!(!out.contains("<table>"), "{out}");
    }

    #[test]
    fn short_and_long_rows_are_squared_off() {
        let out = html_of(
            "| a | b |\n| --- | --- |\n| only |\n| 1 | 2 | extra |\n",
            &Options::default(),
        );
        assert!(out.contains("<td>only</td>\n<td></td>"), "{out}");
        assert!(!out.contains("extra"), "{out}");
    }

    #[test]
    fn leading_paragraph_lines_survive() {
        let out = html_of("intro text\n| a |\n| --- |\n", &Options::default());
        assert!(out.starts_with("<p>intro text</p>\n<table>"), "{out}");
    }

    #[test]
    fn table_ends_at_a_blank_line() {
        let out = html_of(
            "| a |\n| --- |\n| 1 |\n\nafter\n",
            &Options::default(),
        );
        assert!(out.ends_with("</table>\n<p>after</p>\n"), "{out}");
    }

    #[test]
    fn escaped_pipes_stay_in_cells() {
        let out = html_of("| a \\| b |\n| --- |\n", &Options::default());
        assert!(out.contains("<th>a | b</th>"), "{out}");
    }

    #[test]
    fn inline_markup_inside_cells() {
        let out = html_of("| *em* |\n| --- |\n| `c` |\n", &Options::default());
        assert!(out.contains("<th><em>em</em></th>"), "{out}");
        assert!(out.contains("<td><code>c</code></td>"), "{out}");
    }

    #[test]
    fn commonmark_output_is_a_pipe_table() {
        let options = Options::default();
        let tree = parse("| a | b |\n| :-- | --: |\n| 1 | 2 |\n", &options);
        let out = render::commonmark(&tree, &options, &[table()], 0);
        assert_eq!(out, "| a | b |\n| :-- | --: |\n| 1 | 2 |\n");
    }

    #[test]
    fn typed_accessors() {
        let tree = parse("| a | b |\n| :-- | --: |\n", &Options::default());
        let table = tree.first_child(tree.root()).unwrap();
        assert_eq!(column_count(&tree, table), Some(2));
        assert_eq!(alignment(&tree, table, 0), Some(TableAlignment::Left));
        assert_eq!(alignment(&tree, table, 1), Some(TableAlignment::Right));
        assert_eq!(alignment(&tree, table, 2), None);
        let header = tree.first_child(table).unwrap();
        assert_eq!(is_header_row(&tree, header), Some(true));
        assert_eq!(column_count(&tree, header), None);
    }

    #[test]
    fn delimiter_row_without_pipes_is_not_a_table() {
        let out = html_of("a\n---\n", &Options::default());
        assert!(out.contains("<h2>a</h2>"), "{out}");
    }
}
