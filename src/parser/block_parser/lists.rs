//! List marker scanning.

use crate::tree::{ListData, ListDelimType, ListType};

use super::utils::{is_space_or_tab, peek};

/// Try to parse a list marker at byte `pos` of `line`. Returns the marker
/// data and the marker's byte length (excluding the spacing after it, which
/// the caller folds into the item padding).
///
/// When the marker would interrupt a paragraph, ordered lists must start at 1
/// and the item must not be empty.
pub(crate) fn parse_list_marker(
    line: &str,
    pos: usize,
    interrupts_paragraph: bool,
) -> Option<(ListData, usize)> {
    let bytes = line.as_bytes();
    let c = *bytes.get(pos)?;

    if c == b'*' || c == b'-' || c == b'+' {
        let after = peek(line, pos + 1);
        if after != 0 && !is_space_or_tab(after) {
            return None;
        }
        if interrupts_paragraph && rest_is_blank(line, pos + 1) {
            return None;
        }
        let data = ListData {
            list_type: ListType::Bullet,
            bullet_char: c,
            ..ListData::default()
        };
        return Some((data, 1));
    }

    if c.is_ascii_digit() {
        let digits = bytes[pos..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits > 9 {
            return None;
        }
        let start: usize = line[pos..pos + digits].parse().ok()?;
        let delim = match peek(line, pos + digits) {
            b'.' => ListDelimType::Period,
            b')' => ListDelimType::Paren,
            _ => return None,
        };
        let after = peek(line, pos + digits + 1);
        if after != 0 && !is_space_or_tab(after) {
            return None;
        }
        if interrupts_paragraph && (start != 1 || rest_is_blank(line, pos + digits + 1)) {
            return None;
        }
        let data = ListData {
            list_type: ListType::Ordered,
            delimiter: delim,
            start,
            ..ListData::default()
        };
        return Some((data, digits + 1));
    }

    None
}

fn rest_is_blank(line: &str, from: usize) -> bool {
    line.as_bytes()[from.min(line.len())..]
        .iter()
        .all(|&b| is_space_or_tab(b))
}

/// Whether two markers belong to the same list.
pub(crate) fn markers_match(a: &ListData, b: &ListData) -> bool {
    a.list_type == b.list_type && a.delimiter == b.delimiter && a.bullet_char == b.bullet_char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullet_markers() {
        let (data, len) = parse_list_marker("- foo", 0, false).expect("marker");
        assert_eq!(data.list_type, ListType::Bullet);
        assert_eq!(data.bullet_char, b'-');
        assert_eq!(len, 1);
        assert!(parse_list_marker("-foo", 0, false).is_none());
    }

    #[test]
    fn ordered_markers() {
        let (data, len) = parse_list_marker("12) foo", 0, false).expect("marker");
        assert_eq!(data.list_type, ListType::Ordered);
        assert_eq!(data.delimiter, ListDelimType::Paren);
        assert_eq!(data.start, 12);
        assert_eq!(len, 3);
        // more than nine digits is not a list marker
        assert!(parse_list_marker("1234567890. x", 0, false).is_none());
    }

    #[test]
    fn paragraph_interruption_rules() {
        // only start-1 ordered lists may interrupt a paragraph
        assert!(parse_list_marker("2. foo", 0, true).is_none());
        assert!(parse_list_marker("1. foo", 0, true).is_some());
        // empty items cannot interrupt
        assert!(parse_list_marker("- ", 0, true).is_none());
        assert!(parse_list_marker("- ", 0, false).is_some());
    }

    #[test]
    fn marker_compatibility() {
        let (dash, _) = parse_list_marker("- a", 0, false).expect("marker");
        let (star, _) = parse_list_marker("* a", 0, false).expect("marker");
        let (dash2, _) = parse_list_marker("- b", 0, false).expect("marker");
        assert!(markers_match(&dash, &dash2));
        assert!(!markers_match(&dash, &star));
    }
}
