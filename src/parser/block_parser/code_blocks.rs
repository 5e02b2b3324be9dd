//! Fenced code block scanning.

/// Try to parse an opening code fence at the start of `tail`. Returns the
/// fence character and run length. Backtick fences may not carry backticks
/// in their info string; tilde fences are unrestricted.
pub(crate) fn try_parse_fence_open(tail: &str) -> Option<(u8, usize)> {
    let bytes = tail.as_bytes();
    let fence_char = *bytes.first()?;
    if fence_char != b'`' && fence_char != b'~' {
        return None;
    }
    let length = bytes.iter().take_while(|&&b| b == fence_char).count();
    if length < 3 {
        return None;
    }
    if fence_char == b'`' && bytes[length..].contains(&b'`') {
        return None;
    }
    Some((fence_char, length))
}

/// Whether `tail` closes a fence opened with `fence_char` x `fence_length`:
/// an equal-or-longer run of the same character with only trailing blanks.
pub(crate) fn is_fence_close(tail: &str, fence_char: u8, fence_length: usize) -> bool {
    let bytes = tail.as_bytes();
    let run = bytes.iter().take_while(|&&b| b == fence_char).count();
    run >= fence_length && bytes[run..].iter().all(|&b| b == b' ' || b == b'\t')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backtick_fence_rejects_backticks_in_info() {
        assert_eq!(try_parse_fence_open("```rust"), Some((b'`', 3)));
        assert_eq!(try_parse_fence_open("``` a`b"), None);
        assert_eq!(try_parse_fence_open("~~~ a`b"), Some((b'~', 3)));
        assert_eq!(try_parse_fence_open("``"), None);
    }

    #[test]
    fn closing_fence_must_be_long_enough() {
        assert!(is_fence_close("````", b'`', 3));
        assert!(is_fence_close("~~~  ", b'~', 3));
        assert!(!is_fence_close("``", b'`', 3));
        assert!(!is_fence_close("``` x", b'`', 3));
    }
}
