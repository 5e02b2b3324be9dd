//! The two-phase parser.
//!
//! [`block_parser`] assembles the block structure line by line; once the
//! document is finished, [`inline_parser`] runs over every block that holds
//! raw text and parses it into inline nodes.

pub mod block_parser;
pub mod inline_parser;

pub use block_parser::Parser;
