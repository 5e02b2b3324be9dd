//! End-to-end HTML rendering tests across parser features and options.

use quillmark::{Options, markdown_to_html};
use similar_asserts::assert_eq;

fn html(input: &str) -> String {
    markdown_to_html(input, &Options::default(), &[])
}

#[test]
fn block_structure() {
    assert_eq!(
        html("# Title\n\nSome *text* here.\n\n- one\n- two\n"),
        "<h1>Title</h1>\n<p>Some <em>text</em> here.</p>\n\
         <ul>\n<li>one</li>\n<li>two</li>\n</ul>\n"
    );
}

#[test]
fn nested_containers() {
    assert_eq!(
        html("> - a\n>   - b\n"),
        "<blockquote>\n<ul>\n<li>a\n<ul>\n<li>b</li>\n</ul>\n</li>\n</ul>\n</blockquote>\n"
    );
}

#[test]
fn setext_and_thematic_break() {
    assert_eq!(html("Title\n=====\n\n---\n"), "<h1>Title</h1>\n<hr />\n");
}

#[test]
fn reference_links_resolve() {
    assert_eq!(
        html("[x] and [y][x]\n\n[x]: /url \"t\"\n"),
        "<p><a href=\"/url\" title=\"t\">x</a> and <a href=\"/url\" title=\"t\">y</a></p>\n"
    );
}

#[test]
fn first_reference_definition_wins() {
    assert_eq!(
        html("[x]\n\n[x]: /first\n[x]: /second\n"),
        "<p><a href=\"/first\">x</a></p>\n"
    );
}

#[test]
fn entity_references() {
    assert_eq!(html("&copy; &#169; &#xA9;\n"), "<p>\u{a9} \u{a9} \u{a9}</p>\n");
    assert_eq!(html("&bogus; stays\n"), "<p>&amp;bogus; stays</p>\n");
}

#[test]
fn uri_and_email_autolinks() {
    assert_eq!(
        html("<http://a.b> and <me@c.d>\n"),
        "<p><a href=\"http://a.b\">http://a.b</a> and <a href=\"mailto:me@c.d\">me@c.d</a></p>\n"
    );
}

#[test]
fn indented_and_fenced_code() {
    assert_eq!(html("    indented\n"), "<pre><code>indented\n</code></pre>\n");
    assert_eq!(
        html("~~~text\nfenced\n~~~\n"),
        "<pre><code class=\"language-text\">fenced\n</code></pre>\n"
    );
}

#[test]
fn smart_punctuation() {
    let options = Options {
        smart: true,
        ..Options::default()
    };
    assert_eq!(
        markdown_to_html("\"Hi\" -- it's 5--6...\n", &options, &[]),
        "<p>\u{201c}Hi\u{201d} \u{2013} it\u{2019}s 5\u{2013}6\u{2026}</p>\n"
    );
}

#[test]
fn footnotes() {
    let options = Options {
        footnotes: true,
        ..Options::default()
    };
    assert_eq!(
        markdown_to_html("text[^1]\n\n[^1]: the note\n", &options, &[]),
        "<p>text<sup class=\"footnote-ref\"><a href=\"#fn-1\">1</a></sup></p>\n\
         <div class=\"footnote-definition\" id=\"fn-1\">\n<p>the note</p>\n</div>\n"
    );
}

#[test]
fn footnotes_off_by_default() {
    assert_eq!(html("text[^1]\n"), "<p>text[^1]</p>\n");
}

#[test]
fn normalize_merges_text_nodes() {
    let options = Options {
        normalize: true,
        ..Options::default()
    };
    let tree = quillmark::parse_document("a*b\n", &options, &[]);
    let paragraph = tree.first_child(tree.root()).unwrap();
    assert_eq!(tree.child_count(paragraph), 1);
}

#[test]
fn invalid_utf8_is_replaced() {
    let mut parser = quillmark::Parser::new(&Options::default());
    parser.feed(b"ok \xff\xfe end\n");
    let tree = parser.finish();
    let out = quillmark::render::html(&tree, &Options::default(), &[]);
    assert!(out.contains('\u{FFFD}'), "{out}");
}

#[test]
fn nul_bytes_are_replaced() {
    let mut parser = quillmark::Parser::new(&Options::default());
    parser.feed(b"a\x00b\n");
    let tree = parser.finish();
    let out = quillmark::render::html(&tree, &Options::default(), &[]);
    assert_eq!(out, "<p>a\u{FFFD}b</p>\n");
}

#[test]
fn crlf_input() {
    assert_eq!(html("a\r\nb\r\n\r\nc\r\n"), "<p>a\nb</p>\n<p>c</p>\n");
}

#[test]
fn emphasis_shapes() {
    assert_eq!(
        html("*foo*bar*baz*\n"),
        "<p><em>foo</em>bar<em>baz</em></p>\n"
    );
    assert_eq!(
        html("**bold** and *em*\n"),
        "<p><strong>bold</strong> and <em>em</em></p>\n"
    );
}

#[test]
fn arbitrary_bytes_never_panic() {
    // structural characters, broken UTF-8, stray delimiters, NULs
    let soup: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
    let mut parser = quillmark::Parser::new(&Options::default());
    for chunk in soup.chunks(7) {
        parser.feed(chunk);
    }
    let tree = parser.finish();
    let _ = quillmark::render::html(&tree, &Options::default(), &[]);
}
