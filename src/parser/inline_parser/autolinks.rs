//! Angle-bracket autolinks and raw inline HTML tags.

use std::sync::LazyLock;

use regex::Regex;

static URI_AUTOLINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<[A-Za-z][A-Za-z0-9+.-]{1,31}:[^<>\x00-\x20]*>").unwrap());

static EMAIL_AUTOLINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^<
          [A-Za-z0-9.!\#$%&'*+/=?^_`{|}~-]+
          @[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?
          (?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*
          >",
    )
    .unwrap()
});

// Open tags, close tags, comments, processing instructions, declarations,
// and CDATA sections, per the raw-HTML grammar.
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?s)^(?:"#,
        r#"<[A-Za-z][A-Za-z0-9-]*(?:[ \t\n]+[A-Za-z_:][A-Za-z0-9_.:-]*(?:[ \t\n]*=[ \t\n]*(?:[^ \t\n"'=<>`]+|'[^']*'|"[^"]*"))?)*[ \t\n]*/?>"#,
        r"|</[A-Za-z][A-Za-z0-9-]*[ \t\n]*>",
        r"|<!--(?:[^-]|-[^-]|--[^>])*-->",
        r"|<!---?>",
        r"|<\?.*?\?>",
        r"|<![A-Za-z][^>]*>",
        r"|<!\[CDATA\[.*?\]\]>",
        r")",
    ))
    .unwrap()
});

// Relaxed open-tag form: unquoted attribute values may contain quotes, and
// attribute names may start with a digit.
static LIBERAL_OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)^<[A-Za-z][A-Za-z0-9-]*(?:[ \t\n]+[A-Za-z0-9_:.-]+(?:[ \t\n]*=[ \t\n]*(?:[^ \t\n<>`]+|'[^']*'|"[^"]*"))?)*[ \t\n]*/?>"#,
    )
    .unwrap()
});

pub(crate) enum Autolink {
    /// URI with an explicit scheme; the URL is used as-is.
    Uri,
    /// Bare address; the renderer target gets a `mailto:` prefix.
    Email,
}

/// Try to match an angle autolink at the start of `tail`. Returns its kind
/// and total length including the brackets.
pub(crate) fn try_parse_autolink(tail: &str) -> Option<(Autolink, usize)> {
    if let Some(m) = URI_AUTOLINK.find(tail) {
        return Some((Autolink::Uri, m.end()));
    }
    if let Some(m) = EMAIL_AUTOLINK.find(tail) {
        return Some((Autolink::Email, m.end()));
    }
    None
}

/// Try to match a raw inline HTML tag at the start of `tail`. Returns its
/// length.
pub(crate) fn try_parse_html_tag(tail: &str, liberal: bool) -> Option<usize> {
    if let Some(m) = HTML_TAG.find(tail) {
        return Some(m.end());
    }
    if liberal
        && let Some(m) = LIBERAL_OPEN_TAG.find(tail)
    {
        return Some(m.end());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_autolinks() {
        assert!(matches!(
            try_parse_autolink("<https://example.com/a?b=c>"),
            Some((Autolink::Uri, 27))
        ));
        assert!(try_parse_autolink("<https://bad space>").is_none());
        assert!(try_parse_autolink("<no-scheme>").is_none());
    }

    #[test]
    fn email_autolinks() {
        assert!(matches!(
            try_parse_autolink("<a.b@example.com>"),
            Some((Autolink::Email, 17))
        ));
        assert!(try_parse_autolink("<a b@example.com>").is_none());
    }

    #[test]
    fn html_tags() {
        assert_eq!(try_parse_html_tag("<a href=\"x\">y", false), Some(12));
        assert_eq!(try_parse_html_tag("</span> y", false), Some(7));
        assert_eq!(try_parse_html_tag("<!-- c -->x", false), Some(10));
        assert_eq!(try_parse_html_tag("<?pi?>", false), Some(6));
        assert!(try_parse_html_tag("<a href=>", false).is_none());
    }

    #[test]
    fn liberal_tags_allow_stray_quotes() {
        let tag = "<a href=x\"y>";
        assert!(try_parse_html_tag(tag, false).is_none());
        assert_eq!(try_parse_html_tag(tag, true), Some(tag.len()));
    }
}
