//! One document through every output format.

use quillmark::{Options, parse_document, render};
use similar_asserts::assert_eq;

const DOC: &str = "\
# Report

A *short* paragraph with [a link](http://example.com \"t\").

> quoted

- first
- second

```sh
echo hi
```
";

#[test]
fn html_output() {
    let options = Options::default();
    let tree = parse_document(DOC, &options, &[]);
    let out = render::html(&tree, &options, &[]);
    assert!(out.starts_with("<h1>Report</h1>\n"), "{out}");
    assert!(out.contains("<a href=\"http://example.com\" title=\"t\">a link</a>"));
    assert!(out.contains("<blockquote>\n<p>quoted</p>\n</blockquote>"));
    assert!(out.ends_with("<pre><code class=\"language-sh\">echo hi\n</code></pre>\n"));
}

#[test]
fn xml_output() {
    let options = Options::default();
    let tree = parse_document(DOC, &options, &[]);
    let out = render::xml(&tree, &options, &[]);
    assert!(out.starts_with(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE document SYSTEM \"CommonMark.dtd\">\n"
    ));
    assert!(out.contains("<heading level=\"1\">"));
    assert!(out.contains("<link destination=\"http://example.com\" title=\"t\">"));
    assert!(out.contains("<code_block info=\"sh\" xml:space=\"preserve\">echo hi\n</code_block>"));
}

#[test]
fn commonmark_output_reparses_identically() {
    let options = Options::default();
    let tree = parse_document(DOC, &options, &[]);
    let once = render::commonmark(&tree, &options, &[], 0);
    let tree2 = parse_document(&once, &options, &[]);
    let twice = render::commonmark(&tree2, &options, &[], 0);
    assert_eq!(once, twice);
    assert_eq!(
        render::html(&tree, &options, &[]),
        render::html(&tree2, &options, &[])
    );
}

#[test]
fn man_output() {
    let options = Options::default();
    let tree = parse_document(DOC, &options, &[]);
    let out = render::man(&tree, &options, &[], 0);
    assert!(out.starts_with(".SH\nReport\n"), "{out}");
    assert!(out.contains("\\f[I]short\\f[]"));
    assert!(out.contains(".RS"));
    assert!(out.contains(".IP \\[bu] 2"));
    assert!(out.contains("a link (http://example.com)"));
}

#[test]
fn latex_output() {
    let options = Options::default();
    let tree = parse_document(DOC, &options, &[]);
    let out = render::latex(&tree, &options, &[], 0);
    assert!(out.starts_with("\\section{Report}\n"), "{out}");
    assert!(out.contains("\\emph{short}"));
    assert!(out.contains("\\begin{quote}"));
    assert!(out.contains("\\begin{itemize}"));
    assert!(out.contains("\\href{http://example.com}{a link}"));
    assert!(out.contains("\\begin{verbatim}\necho hi\n\\end{verbatim}"));
}

#[test]
fn plaintext_output() {
    let options = Options::default();
    let tree = parse_document(DOC, &options, &[]);
    let out = render::plaintext(&tree, &options, &[], 0);
    assert!(out.starts_with("Report\n"), "{out}");
    assert!(out.contains("A short paragraph with a link."));
    assert!(!out.contains('*'), "{out}");
    assert!(!out.contains('['), "{out}");
}

#[test]
fn wrapped_output_stays_within_width() {
    let options = Options::default();
    let long = format!("{}\n", "word ".repeat(40).trim_end());
    let tree = parse_document(&long, &options, &[]);
    for out in [
        render::commonmark(&tree, &options, &[], 24),
        render::plaintext(&tree, &options, &[], 24),
    ] {
        assert!(out.lines().count() > 1, "{out}");
        assert!(out.lines().all(|l| l.len() <= 24), "{out}");
    }
}
