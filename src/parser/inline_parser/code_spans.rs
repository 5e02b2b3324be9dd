//! Backtick code spans.

/// Try to match a code span whose opening backtick run starts at `pos` in
/// `input`. Returns the literal (after whitespace normalization) and the
/// total length from `pos` through the closing run. The closing run must
/// have exactly the opener's length.
pub(crate) fn try_parse_code_span(input: &str, pos: usize) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    let open_len = bytes[pos..].iter().take_while(|&&b| b == b'`').count();
    debug_assert!(open_len > 0);

    let mut i = pos + open_len;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
        if run == open_len {
            let literal = normalize_code(&input[pos + open_len..i]);
            return Some((literal, i + run - pos));
        }
        i += run;
    }
    None
}

/// Line endings become spaces; one leading and one trailing space are
/// stripped when both are present and the span is not all spaces.
fn normalize_code(raw: &str) -> String {
    let mut s: String = raw
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if s.len() >= 2
        && s.starts_with(' ')
        && s.ends_with(' ')
        && !s.chars().all(|c| c == ' ')
    {
        s.pop();
        s.remove(0);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_run_length() {
        assert_eq!(
            try_parse_code_span("``a`b``", 0),
            Some(("a`b".to_string(), 7))
        );
        assert_eq!(try_parse_code_span("`abc` tail", 0), Some(("abc".to_string(), 5)));
        assert_eq!(try_parse_code_span("``no close`", 0), None);
    }

    #[test]
    fn strips_one_flanking_space() {
        assert_eq!(try_parse_code_span("` `` `", 0), Some(("``".to_string(), 6)));
        assert_eq!(try_parse_code_span("`  `", 0), Some(("  ".to_string(), 4)));
        assert_eq!(
            try_parse_code_span("` a`", 0),
            Some((" a".to_string(), 4))
        );
    }

    #[test]
    fn newlines_become_spaces() {
        assert_eq!(
            try_parse_code_span("`a\nb`", 0),
            Some(("a b".to_string(), 5))
        );
    }
}
