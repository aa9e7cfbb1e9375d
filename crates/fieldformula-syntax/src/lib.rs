//! # fieldformula-syntax
//!
//! Parse tree contract for the fieldformula expression language, together
//! with a parser that produces conforming trees.
//!
//! The evaluator only ever reads a [`ParseTree`], so other producers can
//! build one through [`TreeBuilder`] instead of using [`parse`].

pub mod error;
pub mod parser;
pub mod tree;
pub mod variables;

pub use error::{SyntaxError, SyntaxResult};
pub use parser::parse;
pub use tree::{NodeId, NodeKind, ParseNode, ParseTree, Span, TreeBuilder};
pub use variables::extract_variables;
