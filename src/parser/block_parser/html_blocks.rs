//! HTML block start and end conditions.
//!
//! The seven block kinds follow the CommonMark numbering: 1 verbatim
//! containers (script/pre/style/textarea), 2 comments, 3 processing
//! instructions, 4 declarations, 5 CDATA, 6 known block-level tags, 7 any
//! complete tag alone on its line.

use std::sync::LazyLock;

use regex::Regex;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "section", "source",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

static KIND_1_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^<(script|pre|style|textarea)([ \t>]|$)").unwrap()
});
static KIND_1_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(script|pre|style|textarea)>").unwrap());
static KIND_6_START: LazyLock<Regex> = LazyLock::new(|| {
    let tags = BLOCK_TAGS.join("|");
    Regex::new(&format!(r"(?i)^</?({tags})([ \t]|/?>|$)")).unwrap()
});
// A single complete open or close tag with nothing but whitespace after it.
static KIND_7_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"^(?:<[A-Za-z][A-Za-z0-9-]*(?:[ \t]+[A-Za-z_:][A-Za-z0-9_.:-]*(?:[ \t]*=[ \t]*(?:[^ \t"'=<>`]+|'[^']*'|"[^"]*"))?)*[ \t]*/?>"#,
        r"|</[A-Za-z][A-Za-z0-9-]*[ \t]*>)[ \t]*$"
    ))
    .unwrap()
});

/// Try to recognize an HTML block start at the beginning of `tail`. Kind 7
/// may not interrupt a paragraph.
pub(crate) fn try_parse_block_start(tail: &str, in_paragraph: bool) -> Option<u8> {
    if !tail.starts_with('<') {
        return None;
    }
    if KIND_1_START.is_match(tail) {
        return Some(1);
    }
    if tail.starts_with("<!--") {
        return Some(2);
    }
    if tail.starts_with("<?") {
        return Some(3);
    }
    if tail.starts_with("<![CDATA[") {
        return Some(5);
    }
    if tail.len() > 2 && tail.starts_with("<!") && tail.as_bytes()[2].is_ascii_alphabetic() {
        return Some(4);
    }
    if KIND_6_START.is_match(tail) {
        return Some(6);
    }
    if !in_paragraph && KIND_7_START.is_match(tail) && !KIND_1_START.is_match(tail) {
        return Some(7);
    }
    None
}

/// End condition for kinds 1-5, checked against each line after it is added.
/// Kinds 6 and 7 end at a blank line instead.
pub(crate) fn line_ends_block(line: &str, kind: u8) -> bool {
    match kind {
        1 => KIND_1_END.is_match(line),
        2 => line.contains("-->"),
        3 => line.contains("?>"),
        4 => line.contains('>'),
        5 => line.contains("]]>"),
        _ => false,
    }
}
