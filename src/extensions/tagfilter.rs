//! Tag filtering: neutralizes a fixed set of risky raw HTML elements when
//! raw HTML is otherwise passed through.

use std::sync::Arc;

use crate::extension::SyntaxExtension;

/// Elements whose tags are escaped rather than emitted.
const DISALLOWED: [&str; 9] = [
    "title",
    "textarea",
    "style",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "script",
    "plaintext",
];

pub fn tagfilter() -> Arc<dyn SyntaxExtension> {
    Arc::new(TagFilter)
}

struct TagFilter;

impl SyntaxExtension for TagFilter {
    fn name(&self) -> &'static str {
        "tagfilter"
    }

    fn html_tag_allowed(&self, tag: &str) -> bool {
        !DISALLOWED.contains(&tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::parser::Parser;
    use crate::render;

    fn html_of(input: &str, options: &Options) -> String {
        let ext = tagfilter();
        let mut parser = Parser::new(options);
        parser.attach(ext.clone());
        parser.feed(input.as_bytes());
        let tree = parser.finish();
        render::html(&tree, options, &[ext])
    }

    #[test]
    fn disallowed_tags_are_neutralized() {
        let options = Options {
            unsafe_: true,
            ..Options::default()
        };
        let out = html_of("x <script>alert(1)</script> y\n", &options);
        assert_eq!(out, "<p>x &lt;script>alert(1)&lt;/script> y</p>\n");
    }

    #[test]
    fn other_tags_pass_through() {
        let options = Options {
            unsafe_: true,
            ..Options::default()
        };
        let out = html_of("x <b>bold</b> y\n", &options);
        assert_eq!(out, "<p>x <b>bold</b> y</p>\n");
    }

    #[test]
    fn block_html_is_filtered_too() {
        let options = Options {
            unsafe_: true,
            ..Options::default()
        };
        let out = html_of("<iframe src=\"a\"></iframe>\n", &options);
        assert_eq!(out, "&lt;iframe src=\"a\">&lt;/iframe>\n");
    }

    #[test]
    fn inactive_without_unsafe() {
        // without unsafe the raw HTML never reaches the filter
        let out = html_of("<script>x</script>\n", &Options::default());
        assert_eq!(out, "<!-- raw HTML omitted -->\n");
    }
}
