//! Go support: a tree-sitter grammar adapter and the Go selector catalog.
//!
//! Node positions are exposed as 1-indexed byte positions and normalized by
//! the position codec, so selectors never slice with raw tree-sitter offsets.

pub mod parser;
pub mod selectors;

pub use parser::{walk_preorder, GoParser, ParsedGo};
pub use selectors::{
    GoBeforeFunctionReturnsPositionData, GoNewImportPositionData,
    GoReturningCompositeNewArgumentPositionData, GoReturningFunctionCallNewArgumentPositionData,
    GoSelector, GoStructNewFieldPositionData,
};
