//! Autolinking of bare URLs, `www.` hosts, and email addresses in running
//! text.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::extension::SyntaxExtension;
use crate::iter::{IterEvent, TreeIter};
use crate::options::Options;
use crate::tree::{LinkData, NodeId, NodeValue, Tree};

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?|ftp)://[^\s<]+").unwrap());
static WWW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bwww\.[^\s<]+").unwrap());
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+").unwrap()
});

pub fn autolink() -> Arc<dyn SyntaxExtension> {
    Arc::new(Autolink)
}

struct Autolink;

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Url,
    Www,
    Email,
}

/// Length of the match after dropping trailing punctuation that belongs to
/// the surrounding sentence rather than the link.
fn trim_trailing(s: &str) -> usize {
    let mut len = s.len();
    loop {
        let t = &s[..len];
        let Some(c) = t.chars().last() else {
            break;
        };
        match c {
            '?' | '!' | '.' | ',' | ':' | '*' | '_' | '~' | '\'' | '"' => len -= c.len_utf8(),
            ')' => {
                // keep closers that balance an opener inside the link
                let opens = t.matches('(').count();
                let closes = t.matches(')').count();
                if closes > opens {
                    len -= 1;
                } else {
                    break;
                }
            }
            ';' => {
                // a trailing entity reference like `&amp;` is sentence text
                let Some(amp) = t.rfind('&') else {
                    break;
                };
                let body = &t[amp + 1..len - 1];
                if !body.is_empty() && body.chars().all(|ch| ch.is_ascii_alphanumeric()) {
                    len = amp;
                } else {
                    break;
                }
            }
            _ => break,
        }
    }
    len
}

/// Earliest match in `text`, with sentence punctuation trimmed.
fn first_match(text: &str) -> Option<(usize, usize, Kind)> {
    let mut best: Option<(usize, usize, Kind)> = None;
    let candidates = [
        (URL.find(text), Kind::Url),
        (WWW.find(text), Kind::Www),
        (EMAIL.find(text), Kind::Email),
    ];
    for (found, kind) in candidates {
        let Some(m) = found else {
            continue;
        };
        if best.is_none_or(|(start, _, _)| m.start() < start) {
            best = Some((m.start(), m.end(), kind));
        }
    }
    let (start, end, kind) = best?;
    let end = match kind {
        Kind::Email => {
            // an address may not end in a hyphen or underscore
            if text[start..end].ends_with(['-', '_']) {
                return None;
            }
            end
        }
        _ => start + trim_trailing(&text[start..end]),
    };
    if end <= start {
        return None;
    }
    Some((start, end, kind))
}

impl Autolink {
    /// Split one text node around every match, leaving a Text/Link/Text
    /// sibling sequence in its place. Returns `true` if anything matched.
    fn linkify(&self, tree: &mut Tree, node: NodeId) -> bool {
        let NodeValue::Text(text) = tree.value(node).clone() else {
            return false;
        };
        let pos = tree.sourcepos(node);
        let mut consumed = 0usize;
        while let Some((start, end, kind)) = first_match(&text[consumed..]) {
            let (abs_start, abs_end) = (consumed + start, consumed + end);
            if abs_start > consumed {
                let before = tree.create(NodeValue::Text(text[consumed..abs_start].to_string()));
                tree.set_sourcepos(before, pos);
                tree.insert_before(node, before);
            }
            let visible = &text[abs_start..abs_end];
            let url = match kind {
                Kind::Url => visible.to_string(),
                Kind::Www => format!("http://{visible}"),
                Kind::Email => format!("mailto:{visible}"),
            };
            log::debug!("autolink {url:?} at {pos}");
            let link = tree.create(NodeValue::Link(LinkData {
                url,
                title: String::new(),
            }));
            let label = tree.create(NodeValue::Text(visible.to_string()));
            tree.set_sourcepos(link, pos);
            tree.set_sourcepos(label, pos);
            tree.append_child(link, label);
            tree.insert_before(node, link);
            consumed = abs_end;
        }
        if consumed == 0 {
            return false;
        }
        if consumed < text.len() {
            let after = tree.create(NodeValue::Text(text[consumed..].to_string()));
            tree.set_sourcepos(after, pos);
            tree.insert_before(node, after);
        }
        tree.unlink(node);
        true
    }
}

impl SyntaxExtension for Autolink {
    fn name(&self) -> &'static str {
        "autolink"
    }

    fn postprocess(&self, tree: &mut Tree, _options: &Options) {
        // collect first; text inside existing links stays untouched
        let mut link_depth = 0usize;
        let mut candidates = Vec::new();
        for (node, event) in TreeIter::new(tree, tree.root()) {
            match tree.value(node) {
                NodeValue::Link(_) | NodeValue::Image(_) => match event {
                    IterEvent::Enter => link_depth += 1,
                    IterEvent::Exit => link_depth = link_depth.saturating_sub(1),
                    IterEvent::Done => {}
                },
                NodeValue::Text(_) if event == IterEvent::Enter && link_depth == 0 => {
                    candidates.push(node);
                }
                _ => {}
            }
        }
        for node in candidates {
            // the inline phase splits text at special characters; a URL
            // spanning such a split must be seen whole
            if tree.parent(node).is_none() {
                continue; // merged into a predecessor below
            }
            while let Some(next) = tree.next_sibling(node) {
                let NodeValue::Text(tail) = tree.value(next).clone() else {
                    break;
                };
                if let NodeValue::Text(text) = tree.value_mut(node) {
                    text.push_str(&tail);
                }
                tree.unlink(next);
            }
            self.linkify(tree, node);
        }
    }
}
