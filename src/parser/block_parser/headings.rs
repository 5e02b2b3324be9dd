//! ATX and setext heading scanning.

/// Try to parse an ATX heading opener at the start of `tail` (the line from
/// its first nonspace byte). Returns the level and the number of bytes
/// consumed (hashes plus the following whitespace run).
pub(crate) fn try_parse_atx_heading(tail: &str) -> Option<(u8, usize)> {
    let bytes = tail.as_bytes();
    let hashes = bytes.iter().take_while(|&&b| b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    // After the hashes: end of line, space, or tab.
    match bytes.get(hashes) {
        None => Some((hashes as u8, hashes)),
        Some(b' ') | Some(b'\t') => {
            let ws = bytes[hashes..]
                .iter()
                .take_while(|&&b| b == b' ' || b == b'\t')
                .count();
            Some((hashes as u8, hashes + ws))
        }
        Some(_) => None,
    }
}

/// Try to parse a setext underline: a run of `=` or `-` with nothing but
/// trailing whitespace after it. Returns the heading level (1 for `=`).
pub(crate) fn try_parse_setext_underline(tail: &str) -> Option<u8> {
    let mut chars = tail.chars();
    let first = chars.next()?;
    let level = match first {
        '=' => 1,
        '-' => 2,
        _ => return None,
    };
    let rest = chars.as_str();
    let run_end = rest.find(|c| c != first).unwrap_or(rest.len());
    if rest[run_end..].chars().all(|c| c == ' ' || c == '\t') {
        Some(level)
    } else {
        None
    }
}

/// Strip an optional closing hash sequence from an ATX heading line.
pub(crate) fn chop_trailing_hashes(content: &str) -> &str {
    let trimmed = content.trim_end_matches([' ', '\t']);
    let without_hashes = trimmed.trim_end_matches('#');
    if without_hashes.len() == trimmed.len() {
        return trimmed;
    }
    // The closing run must be preceded by whitespace (or be the whole line).
    if without_hashes.is_empty() {
        ""
    } else if without_hashes.ends_with([' ', '\t']) {
        without_hashes.trim_end_matches([' ', '\t'])
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atx_levels_and_consumption() {
        assert_eq!(try_parse_atx_heading("# foo"), Some((1, 2)));
        assert_eq!(try_parse_atx_heading("###   foo"), Some((3, 6)));
        assert_eq!(try_parse_atx_heading("######"), Some((6, 6)));
        assert_eq!(try_parse_atx_heading("#######"), None);
        assert_eq!(try_parse_atx_heading("#foo"), None);
    }

    #[test]
    fn setext_underlines() {
        assert_eq!(try_parse_setext_underline("==="), Some(1));
        assert_eq!(try_parse_setext_underline("-  "), Some(2));
        assert_eq!(try_parse_setext_underline("=-="), None);
        assert_eq!(try_parse_setext_underline("foo"), None);
    }

    #[test]
    fn closing_hashes_chopped_only_after_space() {
        assert_eq!(chop_trailing_hashes("foo ##"), "foo");
        assert_eq!(chop_trailing_hashes("foo#"), "foo#");
        assert_eq!(chop_trailing_hashes("## "), "");
        assert_eq!(chop_trailing_hashes("foo ## bar"), "foo ## bar");
    }
}
