//! Protocol Buffers support: a small hand-written parser and the proto
//! selector catalog.
//!
//! The parser reports 1-indexed line/column positions; selectors convert them
//! with a [`LineOffsetTable`](crate::position::LineOffsetTable) built from the
//! same text.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod selectors;

pub use parser::parse_proto;
pub use selectors::{
    ProtoNewImportPositionData, ProtoNewMessageFieldPositionData, ProtoNewOneOfFieldPositionData,
    ProtoSelector,
};
