//! Small scanning helpers shared by the block parser.

pub(crate) const TAB_STOP: usize = 4;

pub(crate) fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Byte at `pos`, or 0 past the end (lines carry no terminator).
pub(crate) fn peek(line: &str, pos: usize) -> u8 {
    line.as_bytes().get(pos).copied().unwrap_or(0)
}

/// Trim trailing spaces, tabs, and line endings in place.
pub(crate) fn rtrim(s: &mut String) {
    let end = s
        .rfind(|c: char| !matches!(c, ' ' | '\t' | '\n' | '\r'))
        .map(|i| i + s[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    s.truncate(end);
}

/// Drop trailing lines that contain only spaces and tabs, keeping the final
/// newline of the last remaining line.
pub(crate) fn remove_trailing_blank_lines(s: &mut String) {
    let last_content = s.rfind(|c: char| !matches!(c, ' ' | '\t' | '\n' | '\r'));
    match last_content {
        Some(i) => {
            let rest = &s[i..];
            let cut = match rest.find('\n') {
                Some(nl) => i + nl + 1,
                None => s.len(),
            };
            s.truncate(cut);
        }
        None => s.clear(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rtrim_strips_mixed_trailing_whitespace() {
        let mut s = String::from("foo \t\r\n");
        rtrim(&mut s);
        assert_eq!(s, "foo");
        let mut blank = String::from(" \t\n");
        rtrim(&mut blank);
        assert_eq!(blank, "");
    }

    #[test]
    fn trailing_blank_lines_removed_but_final_newline_kept() {
        let mut s = String::from("code\n\n   \n\t\n");
        remove_trailing_blank_lines(&mut s);
        assert_eq!(s, "code\n");
    }
}
