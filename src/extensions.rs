//! Reference extensions: tables, strikethrough, autolinking, tag filtering,
//! and task lists.
//!
//! Each module exposes a constructor returning an `Arc<dyn SyntaxExtension>`
//! ready to attach to a [`Parser`](crate::parser::Parser) or register
//! process-wide.

pub mod autolink;
pub mod strikethrough;
pub mod table;
pub mod tagfilter;
pub mod tasklist;

pub use autolink::autolink;
pub use strikethrough::strikethrough;
pub use table::table;
pub use tagfilter::tagfilter;
pub use tasklist::tasklist;

/// Put all five reference extensions in the process-wide registry so
/// [`find_by_name`](crate::extension::find_by_name) can resolve them.
pub fn register_reference_extensions() {
    crate::extension::register(autolink());
    crate::extension::register(strikethrough());
    crate::extension::register(table());
    crate::extension::register(tagfilter());
    crate::extension::register(tasklist());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::find_by_name;

    #[test]
    fn registration_makes_extensions_findable() {
        register_reference_extensions();
        for name in ["autolink", "strikethrough", "table", "tagfilter", "tasklist"] {
            assert!(find_by_name(name).is_some(), "{name} missing");
        }
        // registering again is a no-op, not an error
        register_reference_extensions();
    }
}
