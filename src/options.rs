//! Parse and render options.
//!
//! One flag per recognized option, read-only for the duration of a parse or
//! render call. Construct with [`Options::default`] or [`OptionsBuilder`].

/// Options recognized by the parser and the renderers.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Attach source position spans to nodes and emit them where the output
    /// format supports it (`data-sourcepos` in HTML, `sourcepos` in XML).
    pub sourcepos: bool,
    /// Render soft breaks as hard line breaks.
    pub hardbreaks: bool,
    /// Render soft breaks as spaces. `hardbreaks` wins if both are set.
    pub nobreaks: bool,
    /// Escape raw HTML as visible text instead of suppressing it.
    pub safe: bool,
    /// Pass raw HTML through untouched. Wins over `safe` if both are set.
    /// With neither set, raw HTML is replaced by a placeholder comment.
    pub unsafe_: bool,
    /// Merge adjacent text nodes in the finished tree.
    pub normalize: bool,
    /// Replace invalid UTF-8 byte sequences with U+FFFD.
    pub validate_utf8: bool,
    /// Smart typography: curly quotes, en/em dashes, ellipses.
    pub smart: bool,
    /// Parse footnote definitions and references.
    pub footnotes: bool,
    /// Require exactly two tildes for strikethrough (single `~` stays text).
    pub strikethrough_double_tilde: bool,
    /// Emit `style="text-align: ..."` on table cells instead of `align`.
    pub table_prefer_style_attributes: bool,
    /// Emit the full code fence info string as a `data-meta` attribute.
    pub full_info_string: bool,
    /// Accept a larger set of tag spellings as inline HTML.
    pub liberal_html_tag: bool,
    /// Emit `<pre lang="...">` instead of `<code class="language-...">`.
    pub github_pre_lang: bool,
}

impl Options {
    /// Whether raw HTML passes through to the output untouched.
    pub fn raw_html_allowed(&self) -> bool {
        self.unsafe_
    }

    /// Whether raw HTML should be escaped as visible text.
    pub fn raw_html_escaped(&self) -> bool {
        self.safe && !self.unsafe_
    }
}

/// Builder for [`Options`].
///
/// ```ignore
/// let opts = OptionsBuilder::default().smart(true).unsafe_(true).build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

macro_rules! builder_flag {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub fn $name(mut self, value: bool) -> Self {
            self.options.$name = value;
            self
        }
    };
}

impl OptionsBuilder {
    builder_flag!(sourcepos);
    builder_flag!(hardbreaks);
    builder_flag!(nobreaks);
    builder_flag!(safe);
    builder_flag!(unsafe_);
    builder_flag!(normalize);
    builder_flag!(validate_utf8);
    builder_flag!(smart);
    builder_flag!(footnotes);
    builder_flag!(strikethrough_double_tilde);
    builder_flag!(table_prefer_style_attributes);
    builder_flag!(full_info_string);
    builder_flag!(liberal_html_tag);
    builder_flag!(github_pre_lang);

    pub fn build(self) -> Options {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_wins_over_safe() {
        let opts = OptionsBuilder::default().safe(true).unsafe_(true).build();
        assert!(opts.raw_html_allowed());
        assert!(!opts.raw_html_escaped());
    }

    #[test]
    fn safe_alone_escapes() {
        let opts = OptionsBuilder::default().safe(true).build();
        assert!(!opts.raw_html_allowed());
        assert!(opts.raw_html_escaped());
    }

    #[test]
    fn default_suppresses_raw_html() {
        let opts = Options::default();
        assert!(!opts.raw_html_allowed());
        assert!(!opts.raw_html_escaped());
    }
}
