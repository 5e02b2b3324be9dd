//! Syntax extensions.
//!
//! An extension is a bundle of hooks the parser and renderers consult at
//! fixed seams. Every hook has a default no-op body, so an extension
//! implements only the seams it cares about. Hooks are dispatched in
//! attachment order and the first extension to claim a position wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::options::Options;
use crate::parser::Parser;
use crate::parser::inline_parser::InlineParser;
use crate::render::{HtmlRenderer, TextRenderer};
use crate::tree::{NodeId, NodeValue, Tree};

/// Output format, passed to render hooks so one extension method can serve
/// all text-based formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Html,
    Xml,
    CommonMark,
    Man,
    Latex,
    Plaintext,
}

/// Verdict of a block continuation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContinue {
    /// The block continues; keep matching deeper open blocks.
    Keep,
    /// The block does not match this line.
    Close,
    /// The block consumed the whole line (e.g. a table row); stop here.
    LineDone,
}

/// Hooks a syntax extension may implement. All methods have defaults, so an
/// implementation overrides only its seams.
///
/// `Send + Sync` because extensions are shared via `Arc` and may be attached
/// to parsers on different threads.
pub trait SyntaxExtension: Send + Sync {
    /// Unique name, used for registry lookup and render delegation.
    fn name(&self) -> &'static str;

    /// Characters the inline scanner should stop on for this extension.
    fn special_characters(&self) -> &[char] {
        &[]
    }

    /// Whether `ch` participates in delimiter-stack pairing for this
    /// extension (like `~` for strikethrough).
    fn is_delimiter_char(&self, _ch: char) -> bool {
        false
    }

    /// Try to open a new block at the current line position. Return the new
    /// block's id to claim the position; the hook is responsible for
    /// advancing the parser past whatever it consumed.
    fn try_open_block(&self, _parser: &mut Parser, _container: NodeId) -> Option<NodeId> {
        None
    }

    /// Decide whether an open block owned by this extension matches the
    /// current line.
    fn block_continues(&self, _parser: &mut Parser, _node: NodeId) -> BlockContinue {
        BlockContinue::Close
    }

    /// Widen (or narrow) the built-in containment rules. `None` defers to
    /// the built-in rule and other extensions.
    fn can_contain(&self, _parent: &NodeValue, _child: &NodeValue) -> Option<bool> {
        None
    }

    /// Try to match an inline construct at the scanner position (`ch` is one
    /// of this extension's special characters). Return the inserted node to
    /// claim the position.
    fn match_inline(&self, _parser: &mut InlineParser<'_>, _ch: char) -> Option<NodeId> {
        None
    }

    /// Pair an opener/closer delimiter run of `ch`. Return the node kind to
    /// wrap the span in and the number of delimiter characters consumed from
    /// each side.
    fn delimiter_match(
        &self,
        _ch: char,
        _opener_len: usize,
        _closer_len: usize,
        _options: &Options,
    ) -> Option<(NodeValue, usize)> {
        None
    }

    /// Whether the CommonMark renderer must backslash-escape `ch` so this
    /// extension's syntax round-trips.
    fn commonmark_escape(&self, _ch: char) -> bool {
        false
    }

    /// Restructure the finished tree before `Parser::finish` returns.
    fn postprocess(&self, _tree: &mut Tree, _options: &Options) {}

    /// Render a node owned by this extension to HTML. Return `false` to fall
    /// back to rendering the node's children bare.
    fn render_html(
        &self,
        _renderer: &mut HtmlRenderer,
        _tree: &Tree,
        _node: NodeId,
        _entering: bool,
    ) -> bool {
        false
    }

    /// Render a node owned by this extension for a text-based format
    /// (CommonMark, man, LaTeX, plaintext). Return `false` to fall back to
    /// rendering the node's children bare.
    fn render_text(
        &self,
        _format: RenderFormat,
        _renderer: &mut TextRenderer,
        _tree: &Tree,
        _node: NodeId,
        _entering: bool,
    ) -> bool {
        false
    }

    /// Extra attributes the XML renderer should emit for a node owned by
    /// this extension.
    fn xml_attributes(&self, _tree: &Tree, _node: NodeId) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Whether a raw HTML tag name may pass through unescaped (the tagfilter
    /// seam). Consulted only when raw HTML is being emitted at all.
    fn html_tag_allowed(&self, _tag: &str) -> bool {
        true
    }
}

fn registry() -> &'static Mutex<HashMap<String, Arc<dyn SyntaxExtension>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<dyn SyntaxExtension>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lock_registry() -> std::sync::MutexGuard<'static, HashMap<String, Arc<dyn SyntaxExtension>>> {
    registry().lock().unwrap_or_else(|poisoned| {
        // The registry holds only Arc handles; a panic mid-insert cannot
        // leave it inconsistent.
        poisoned.into_inner()
    })
}

/// Register an extension process-wide so [`find_by_name`] can resolve it.
/// Returns `false` if the name is already taken.
pub fn register(ext: Arc<dyn SyntaxExtension>) -> bool {
    let mut map = lock_registry();
    let name = ext.name().to_string();
    if map.contains_key(&name) {
        log::debug!("extension {name:?} already registered");
        return false;
    }
    map.insert(name, ext);
    true
}

/// Look up a registered extension by name.
pub fn find_by_name(name: &str) -> Option<Arc<dyn SyntaxExtension>> {
    lock_registry().get(name).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop(&'static str);

    impl SyntaxExtension for Nop {
        fn name(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn register_rejects_duplicates() {
        assert!(register(Arc::new(Nop("nop-dup-test"))));
        assert!(!register(Arc::new(Nop("nop-dup-test"))));
        assert!(find_by_name("nop-dup-test").is_some());
        assert!(find_by_name("no-such-extension").is_none());
    }

    #[test]
    fn defaults_decline_everything() {
        let ext = Nop("nop-defaults-test");
        assert!(ext.special_characters().is_empty());
        assert!(!ext.is_delimiter_char('~'));
        assert!(
            ext.can_contain(&NodeValue::Paragraph, &NodeValue::Text(String::new()))
                .is_none()
        );
        assert!(!ext.commonmark_escape('~'));
        assert!(ext.html_tag_allowed("script"));
    }
}
