//! Repair of model-generated structure markup
//!
//! Model output is noisy: the structure block is wrapped in prose or code
//! fences, tag names drift between hyphens and underscores, angle brackets
//! arrive double-escaped, and elements are left unclosed. Repair runs in
//! three stages: extract the block, correct known mistakes textually, then
//! parse strictly and fall back to a recovering parse.

mod repair;
mod tokenizer;
mod tree;

pub use repair::{
    RepairedStructure, correct_markup, extract_structure_block, repair_structure,
    to_structure_document,
};
pub use tokenizer::{Located, RawAttribute, Token, Tokenizer, tokenize};
pub use tree::{Element, MarkupError, Node, parse_recovering, parse_strict};

#[cfg(test)]
mod tests;
