//! Thematic break scanning.

/// Try to parse a thematic break: three or more `*`, `-`, or `_`, optionally
/// separated by spaces and tabs, and nothing else on the line. Returns the
/// rule character.
pub(crate) fn try_parse_thematic_break(tail: &str) -> Option<char> {
    let rule_char = tail.chars().next()?;
    if !matches!(rule_char, '*' | '-' | '_') {
        return None;
    }
    let mut count = 0;
    for ch in tail.chars() {
        match ch {
            c if c == rule_char => count += 1,
            ' ' | '\t' => continue,
            _ => return None,
        }
    }
    if count >= 3 { Some(rule_char) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_all_three_characters() {
        assert_eq!(try_parse_thematic_break("***"), Some('*'));
        assert_eq!(try_parse_thematic_break("- - -"), Some('-'));
        assert_eq!(try_parse_thematic_break("__ _ __"), Some('_'));
    }

    #[test]
    fn rejects_short_or_mixed_runs() {
        assert_eq!(try_parse_thematic_break("**"), None);
        assert_eq!(try_parse_thematic_break("*-*"), None);
        assert_eq!(try_parse_thematic_break("--- x"), None);
    }
}
