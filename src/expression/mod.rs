//! Spoken arithmetic to calculator expressions.
//!
//! Number words become digits, operator words become `+ - * / %`, "point"
//! becomes `.`, bracket phrases become parentheses, and filler words are
//! dropped. The output only ever contains digits, operators, parentheses,
//! and decimal points, so feeding it back in returns it unchanged.

mod lexicon;
mod normalize;

pub use normalize::{normalize, normalize_expression, Normalized};
