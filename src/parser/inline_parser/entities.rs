//! Entity and backslash-escape decoding.
//!
//! Numeric character references are decoded in full. Named references are
//! resolved against a table of the names that actually show up in documents;
//! anything outside it passes through verbatim, which keeps the table small
//! without affecting round-tripping.

/// Longest named reference we recognize, including `&` and `;`.
const MAX_ENTITY_LEN: usize = 12;

static NAMED: &[(&str, &str)] = &[
    ("AElig", "\u{c6}"),
    ("amp", "&"),
    ("apos", "'"),
    ("auml", "\u{e4}"),
    ("bull", "\u{2022}"),
    ("cent", "\u{a2}"),
    ("copy", "\u{a9}"),
    ("dagger", "\u{2020}"),
    ("deg", "\u{b0}"),
    ("eacute", "\u{e9}"),
    ("egrave", "\u{e8}"),
    ("euro", "\u{20ac}"),
    ("frac12", "\u{bd}"),
    ("gt", ">"),
    ("hellip", "\u{2026}"),
    ("laquo", "\u{ab}"),
    ("ldquo", "\u{201c}"),
    ("lsquo", "\u{2018}"),
    ("lt", "<"),
    ("mdash", "\u{2014}"),
    ("middot", "\u{b7}"),
    ("nbsp", "\u{a0}"),
    ("ndash", "\u{2013}"),
    ("ouml", "\u{f6}"),
    ("para", "\u{b6}"),
    ("plusmn", "\u{b1}"),
    ("pound", "\u{a3}"),
    ("quot", "\""),
    ("raquo", "\u{bb}"),
    ("rdquo", "\u{201d}"),
    ("reg", "\u{ae}"),
    ("rsquo", "\u{2019}"),
    ("sect", "\u{a7}"),
    ("shy", "\u{ad}"),
    ("szlig", "\u{df}"),
    ("times", "\u{d7}"),
    ("trade", "\u{2122}"),
    ("uuml", "\u{fc}"),
    ("yen", "\u{a5}"),
];

/// Try to decode one character reference at the start of `input` (which must
/// begin with `&`). Returns the decoded text and the bytes consumed.
pub(crate) fn parse_entity(input: &str) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }
    if bytes.get(1) == Some(&b'#') {
        return parse_numeric(input);
    }
    let limit = input.len().min(MAX_ENTITY_LEN);
    let end = input[1..limit].find(';').map(|i| i + 1)?;
    let name = &input[1..end];
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    let decoded = NAMED
        .binary_search_by(|(n, _)| n.cmp(&name))
        .ok()
        .map(|i| NAMED[i].1)?;
    Some((decoded.to_string(), end + 1))
}

fn parse_numeric(input: &str) -> Option<(String, usize)> {
    let bytes = input.as_bytes();
    let (radix, digits_at) = match bytes.get(2) {
        Some(b'x') | Some(b'X') => (16, 3),
        _ => (10, 2),
    };
    let mut value: u32 = 0;
    let mut i = digits_at;
    let max_digits = if radix == 16 { 6 } else { 7 };
    while let Some(&b) = bytes.get(i) {
        let digit = (b as char).to_digit(radix)?;
        if i - digits_at >= max_digits {
            return None;
        }
        value = value.saturating_mul(radix).saturating_add(digit);
        i += 1;
        if bytes.get(i) == Some(&b';') {
            if value == 0 {
                return Some(("\u{FFFD}".to_string(), i + 1));
            }
            let ch = char::from_u32(value).unwrap_or('\u{FFFD}');
            return Some((ch.to_string(), i + 1));
        }
    }
    None
}

/// Decode backslash escapes and character references throughout `input`.
/// Used on link destinations, titles, and code fence info strings.
pub(crate) fn unescape_all(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) => {
                out.push(bytes[i + 1] as char);
                i += 2;
            }
            b'&' => {
                if let Some((decoded, consumed)) = parse_entity(&input[i..]) {
                    out.push_str(&decoded);
                    i += consumed;
                } else {
                    out.push('&');
                    i += 1;
                }
            }
            _ => {
                let ch_end = input[i..]
                    .char_indices()
                    .nth(1)
                    .map(|(j, _)| i + j)
                    .unwrap_or(input.len());
                out.push_str(&input[i..ch_end]);
                i = ch_end;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_table_is_sorted() {
        for pair in NAMED.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn named_references() {
        assert_eq!(parse_entity("&amp;x"), Some(("&".to_string(), 5)));
        assert_eq!(parse_entity("&hellip;"), Some(("\u{2026}".to_string(), 8)));
        assert_eq!(parse_entity("&bogusname;"), None);
        assert_eq!(parse_entity("&amp"), None);
    }

    #[test]
    fn numeric_references() {
        assert_eq!(parse_entity("&#35;"), Some(("#".to_string(), 5)));
        assert_eq!(parse_entity("&#x22;"), Some(("\"".to_string(), 6)));
        assert_eq!(parse_entity("&#0;"), Some(("\u{FFFD}".to_string(), 4)));
        // surrogate code point
        assert_eq!(parse_entity("&#xD800;"), Some(("\u{FFFD}".to_string(), 8)));
        assert_eq!(parse_entity("&#99999999999;"), None);
    }

    #[test]
    fn unescape_mixes_escapes_and_entities() {
        assert_eq!(unescape_all(r"a\*b&amp;c"), "a*b&c");
        assert_eq!(unescape_all(r"\q stays"), r"\q stays");
    }
}
