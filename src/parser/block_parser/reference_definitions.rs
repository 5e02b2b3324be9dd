//! Link reference definitions.
//!
//! Definitions are stripped from the front of paragraph content when the
//! paragraph is finalized and collected into a [`ReferenceMap`] the inline
//! parser resolves `[text][label]` links against.

use std::collections::HashMap;

use crate::parser::inline_parser::entities::unescape_all;

/// A resolved reference: destination and optional title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub url: String,
    pub title: String,
}

/// Map from normalized labels to references. The first definition of a
/// label wins.
#[derive(Debug, Default)]
pub struct ReferenceMap {
    map: HashMap<String, Reference>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: &str, url: &str, title: &str) {
        let key = normalize_label(label);
        if key.is_empty() {
            return;
        }
        self.map.entry(key).or_insert_with(|| Reference {
            url: unescape_all(url),
            title: unescape_all(title),
        });
    }

    pub fn lookup(&self, label: &str) -> Option<&Reference> {
        self.map.get(&normalize_label(label))
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Case-fold a label and collapse internal whitespace, per the matching
/// rules for reference labels.
pub(crate) fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_space = false;
    for ch in label.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        for lower in ch.to_lowercase() {
            out.push(lower);
        }
    }
    out
}

/// Strip every reference definition from the front of `content`, recording
/// each in `map`. Returns whether any non-whitespace content remains.
pub(crate) fn resolve_reference_link_definitions(
    content: &mut String,
    map: &mut ReferenceMap,
) -> bool {
    while content.starts_with('[') {
        match parse_reference_definition(content) {
            Some(def) => {
                log::debug!("reference definition for {:?}", def.label);
                map.add(&def.label, &def.url, &def.title);
                content.drain(..def.consumed);
            }
            None => break,
        }
    }
    !content.chars().all(char::is_whitespace)
}

/// Try to parse a footnote definition marker `[^label]:` at the start of
/// `tail`. Returns the label and the bytes consumed through the colon and
/// one optional following space.
pub(crate) fn try_parse_footnote_definition(tail: &str) -> Option<(String, usize)> {
    let rest = tail.strip_prefix("[^")?;
    let end = rest.find(']')?;
    let label = &rest[..end];
    if label.is_empty()
        || label
            .bytes()
            .any(|b| b == b'[' || b == b'^' || b.is_ascii_whitespace())
    {
        return None;
    }
    let after = &rest[end + 1..];
    if !after.starts_with(':') {
        return None;
    }
    let mut consumed = 2 + end + 2;
    if after[1..].starts_with(' ') {
        consumed += 1;
    }
    Some((label.to_string(), consumed))
}

struct Definition {
    label: String,
    url: String,
    title: String,
    consumed: usize,
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), b' ' | b'\t') {
            self.pos += 1;
        }
    }

    /// Skip spaces and at most one line ending. Returns whether a line
    /// ending was crossed.
    fn skip_spaces_one_newline(&mut self) -> bool {
        self.skip_spaces();
        let mut newline = false;
        if self.peek() == b'\n' {
            self.pos += 1;
            newline = true;
            self.skip_spaces();
        }
        newline
    }

    /// Scan a `[...]` link label (with escapes, at most 999 bytes, at least
    /// one non-whitespace byte).
    fn scan_label(&mut self) -> Option<String> {
        if self.peek() != b'[' {
            return None;
        }
        let start = self.pos + 1;
        let mut i = start;
        let mut has_content = false;
        while let Some(&b) = self.bytes.get(i) {
            match b {
                b']' => {
                    if !has_content || i - start > 999 {
                        return None;
                    }
                    self.pos = i + 1;
                    return Some(String::from_utf8_lossy(&self.bytes[start..i]).into_owned());
                }
                b'[' => return None,
                b'\\' => {
                    has_content = true;
                    i += 2;
                }
                b' ' | b'\t' | b'\n' | b'\r' => i += 1,
                _ => {
                    has_content = true;
                    i += 1;
                }
            }
        }
        None
    }

    /// Scan a link destination: `<...>` or a run of non-whitespace bytes
    /// with balanced parentheses.
    fn scan_destination(&mut self) -> Option<String> {
        if self.peek() == b'<' {
            let start = self.pos + 1;
            let mut i = start;
            while let Some(&b) = self.bytes.get(i) {
                match b {
                    b'>' => {
                        self.pos = i + 1;
                        return Some(String::from_utf8_lossy(&self.bytes[start..i]).into_owned());
                    }
                    b'<' | b'\n' => return None,
                    b'\\' => i += 2,
                    _ => i += 1,
                }
            }
            return None;
        }
        let start = self.pos;
        let mut depth = 0i32;
        let mut i = start;
        while let Some(&b) = self.bytes.get(i) {
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
        if i == start || depth != 0 {
            return None;
        }
        self.pos = i;
        Some(String::from_utf8_lossy(&self.bytes[start..i.min(self.bytes.len())]).into_owned())
    }

    /// Scan a link title delimited by `"`, `'`, or parentheses. Titles may
    /// span lines but not blank lines.
    fn scan_title(&mut self) -> Option<String> {
        let open = self.peek();
        let close = match open {
            b'"' => b'"',
            b'\'' => b'\'',
            b'(' => b')',
            _ => return None,
        };
        let start = self.pos + 1;
        let mut i = start;
        while let Some(&b) = self.bytes.get(i) {
            match b {
                b if b == close => {
                    self.pos = i + 1;
                    return Some(String::from_utf8_lossy(&self.bytes[start..i]).into_owned());
                }
                b'(' if open == b'(' => return None,
                b'\\' => i += 2,
                b'\n' => {
                    if self.bytes.get(i + 1) == Some(&b'\n') {
                        return None;
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }
        None
    }

    /// Spaces and tabs, then end of line. Consumes the line ending and
    /// returns the new position, or `None` if anything else follows.
    fn finish_line(&mut self) -> Option<usize> {
        self.skip_spaces();
        match self.peek() {
            0 => Some(self.pos),
            b'\n' => Some(self.pos + 1),
            _ => None,
        }
    }
}

fn parse_reference_definition(content: &str) -> Option<Definition> {
    let mut s = Scanner::new(content);
    let label = s.scan_label()?;
    if s.peek() != b':' {
        return None;
    }
    s.pos += 1;
    s.skip_spaces_one_newline();
    let url = s.scan_destination()?;

    // The title is optional; if it fails to parse but the destination ended
    // its line, the definition still stands without it.
    let mut after_dest = s.pos;
    let dest_line_ended = {
        let mut probe = Scanner {
            bytes: s.bytes,
            pos: s.pos,
        };
        match probe.finish_line() {
            Some(end) => {
                after_dest = end;
                true
            }
            None => false,
        }
    };

    s.skip_spaces_one_newline();
    if let Some(title) = s.scan_title()
        && let Some(end) = s.finish_line()
    {
        return Some(Definition {
            label,
            url,
            title,
            consumed: end,
        });
    }
    if dest_line_ended {
        // Whatever followed was not a valid title; keep it as content.
        return Some(Definition {
            label,
            url,
            title: String::new(),
            consumed: after_dest,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_normalization_folds_case_and_whitespace() {
        assert_eq!(normalize_label("  Foo\n  Bar "), "foo bar");
        assert_eq!(normalize_label("ΑΓΩ"), "αγω");
    }

    #[test]
    fn simple_definition_is_stripped() {
        let mut map = ReferenceMap::new();
        let mut content = String::from("[foo]: /url \"a title\"\nrest\n");
        assert!(resolve_reference_link_definitions(&mut content, &mut map));
        assert_eq!(content, "rest\n");
        let r = map.lookup("FOO").expect("reference");
        assert_eq!(r.url, "/url");
        assert_eq!(r.title, "a title");
    }

    #[test]
    fn definition_only_paragraph_has_no_content() {
        let mut map = ReferenceMap::new();
        let mut content = String::from("[foo]: </my url>\n");
        assert!(!resolve_reference_link_definitions(&mut content, &mut map));
        assert_eq!(map.lookup("foo").map(|r| r.url.as_str()), Some("/my url"));
    }

    #[test]
    fn title_on_next_line() {
        let mut map = ReferenceMap::new();
        let mut content = String::from("[foo]: /url\n\"title\"\n");
        assert!(!resolve_reference_link_definitions(&mut content, &mut map));
        assert_eq!(
            map.lookup("foo").map(|r| r.title.as_str()),
            Some("title")
        );
    }

    #[test]
    fn garbage_after_destination_line_is_not_a_definition() {
        let mut map = ReferenceMap::new();
        let mut content = String::from("[foo]: /url trailing\n");
        assert!(resolve_reference_link_definitions(&mut content, &mut map));
        assert!(map.lookup("foo").is_none());
        assert_eq!(content, "[foo]: /url trailing\n");
    }

    #[test]
    fn first_definition_wins() {
        let mut map = ReferenceMap::new();
        map.add("foo", "/first", "");
        map.add("foo", "/second", "");
        assert_eq!(map.lookup("foo").map(|r| r.url.as_str()), Some("/first"));
    }

    #[test]
    fn invalid_title_keeps_definition_without_it() {
        let mut map = ReferenceMap::new();
        let mut content = String::from("[foo]: /url\n\"broken\n\ntitle\"\n");
        // the blank line ends the would-be title
        assert!(resolve_reference_link_definitions(&mut content, &mut map));
        assert_eq!(map.lookup("foo").map(|r| r.title.as_str()), Some(""));
        assert!(content.starts_with("\"broken"));
    }
}
