//! Position codec: normalizes grammar-native positions into byte offsets.
//!
//! The Go adapter reports 1-indexed byte positions, the protobuf adapter
//! reports 1-indexed line/column pairs. Both are converted into an
//! [`OffsetPosition`], a 0-indexed byte offset valid only for the exact text
//! it was computed from.

use serde::Serialize;
use std::fmt;

/// Zero-based byte offset into the text a selector was run against.
///
/// [`OffsetPosition::NONE`] marks "no position". Offset 0 is a valid position
/// (start of file) and is never used as the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OffsetPosition(i64);

impl OffsetPosition {
    /// No possible position.
    pub const NONE: OffsetPosition = OffsetPosition(-1);

    pub fn new(offset: usize) -> Self {
        OffsetPosition(offset as i64)
    }

    pub fn is_none(self) -> bool {
        self.0 < 0
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    /// The offset as a slice index, or `None` for the sentinel.
    pub fn get(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl Default for OffsetPosition {
    fn default() -> Self {
        OffsetPosition::NONE
    }
}

impl fmt::Display for OffsetPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(offset) => write!(f, "{offset}"),
            None => f.write_str("<none>"),
        }
    }
}

/// 1-indexed byte position, as in a Go file set. `BytePos(0)` is no position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BytePos(pub usize);

impl BytePos {
    pub const NONE: BytePos = BytePos(0);

    /// Position of a 0-indexed byte offset.
    pub fn from_offset(offset: usize) -> Self {
        BytePos(offset + 1)
    }

    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

/// Converts a 1-indexed byte position to an offset usable for slicing.
pub fn offset_for_byte_pos(pos: BytePos) -> OffsetPosition {
    if !pos.is_valid() {
        return OffsetPosition::NONE;
    }
    OffsetPosition::new(pos.0 - 1)
}

/// 1-indexed line and column. Columns count bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourcePos {
    pub line: usize,
    pub col: usize,
}

impl SourcePos {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Cumulative offset at the end of every line of a text.
///
/// `offset(1) = len(line 1)` and `offset(n) = offset(n - 1) + len(line n) + 1`,
/// so `offset(n)` is the index of the newline that terminates line `n`.
/// Must be rebuilt whenever the text changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOffsetTable {
    ends: Vec<usize>,
}

impl LineOffsetTable {
    pub fn new(code: &str) -> Self {
        let mut ends = Vec::new();
        for (index, line) in code.split('\n').enumerate() {
            let end = match index {
                0 => line.len(),
                _ => ends[index - 1] + line.len() + 1,
            };
            ends.push(end);
        }
        Self { ends }
    }

    /// Cumulative offset for a 1-indexed line, `None` past the last line.
    pub fn line_end(&self, line: usize) -> Option<usize> {
        line.checked_sub(1).and_then(|i| self.ends.get(i)).copied()
    }

    pub fn line_count(&self) -> usize {
        self.ends.len()
    }

    /// Converts a line/column position into an offset.
    ///
    /// Line 1 is based on the virtual newline before the file, so `1:1` is
    /// offset 0. Mapping `1:col` to `col - 1` lands on the same byte the
    /// later lines land on, and keeps every offset within `0..=text.len()`.
    /// Positions on lines past the end of the text yield no position.
    pub fn offset_for(&self, pos: SourcePos) -> OffsetPosition {
        if pos.line == 0 || pos.col == 0 {
            return OffsetPosition::NONE;
        }
        if pos.line == 1 {
            return OffsetPosition::new(pos.col - 1);
        }
        match self.line_end(pos.line - 1) {
            Some(base) => OffsetPosition::new(base + pos.col),
            None => OffsetPosition::NONE,
        }
    }
}

/// Converts an optional protobuf source position into an offset.
pub fn offset_for_source_pos(table: &LineOffsetTable, pos: Option<SourcePos>) -> OffsetPosition {
    match pos {
        Some(pos) => table.offset_for(pos),
        None => OffsetPosition::NONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: &str = r#"syntax = "proto3";
package cosmonaut.mars.mars;

option go_package = "github.com/cosmonaut/mars/x/mars/types";

// GenesisState defines the mars module's genesis state.
message GenesisState {

}"#;

    #[test]
    fn line_offset_table_accumulates() {
        let table = LineOffsetTable::new(GENESIS);
        let expected = [
            18,
            18 + 29,
            18 + 29 + 1,
            18 + 29 + 1 + 62,
            18 + 29 + 1 + 62 + 1,
            18 + 29 + 1 + 62 + 1 + 57,
            18 + 29 + 1 + 62 + 1 + 57 + 23,
            18 + 29 + 1 + 62 + 1 + 57 + 23 + 1,
            18 + 29 + 1 + 62 + 1 + 57 + 23 + 1 + 2,
        ];

        assert_eq!(table.line_count(), expected.len());
        for (i, end) in expected.iter().enumerate() {
            assert_eq!(table.line_end(i + 1), Some(*end), "line {}", i + 1);
        }
        assert_eq!(table.line_end(0), None);
        assert_eq!(table.line_end(10), None);
    }

    #[test]
    fn source_pos_to_offset() {
        let table = LineOffsetTable::new(GENESIS);
        let offset = offset_for_source_pos(&table, Some(SourcePos::new(5, 5)));
        assert_eq!(offset, OffsetPosition::new(115));
    }

    #[test]
    fn first_line_starts_at_zero() {
        let table = LineOffsetTable::new(GENESIS);
        assert_eq!(table.offset_for(SourcePos::new(1, 1)), OffsetPosition::new(0));
        assert_eq!(table.offset_for(SourcePos::new(1, 7)), OffsetPosition::new(6));
        assert_eq!(&GENESIS[6..7], " ");
    }

    #[test]
    fn every_column_maps_to_its_own_byte() {
        let text = "ab\ncde\n\nf";
        let table = LineOffsetTable::new(text);
        let (mut line, mut col) = (1, 1);
        for (offset, byte) in text.bytes().enumerate() {
            assert_eq!(
                table.offset_for(SourcePos::new(line, col)),
                OffsetPosition::new(offset),
                "{line}:{col}"
            );
            if byte == b'\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        let end = table.offset_for(SourcePos::new(line, col));
        assert_eq!(end, OffsetPosition::new(text.len()));
    }

    #[test]
    fn single_line_offsets_stay_in_bounds() {
        let text = "syntax = \"proto3\";";
        let table = LineOffsetTable::new(text);
        for col in 1..=text.len() + 1 {
            let offset = table.offset_for(SourcePos::new(1, col)).get().unwrap();
            assert!(offset <= text.len(), "1:{col} -> {offset}");
        }
    }

    #[test]
    fn missing_source_pos_is_not_offset_zero() {
        let table = LineOffsetTable::new(GENESIS);
        let offset = offset_for_source_pos(&table, None);
        assert!(offset.is_none());
        assert_eq!(offset.get(), None);
        assert_ne!(offset, OffsetPosition::new(0));
    }

    #[test]
    fn byte_pos_is_one_indexed() {
        assert_eq!(offset_for_byte_pos(BytePos(13)), OffsetPosition::new(12));
        assert_eq!(offset_for_byte_pos(BytePos::from_offset(0)), OffsetPosition::new(0));
        assert!(offset_for_byte_pos(BytePos::NONE).is_none());
    }

    #[test]
    fn crlf_bytes_are_counted() {
        let table = LineOffsetTable::new("a\r\nbc\r\n");
        assert_eq!(table.line_end(1), Some(2));
        assert_eq!(table.offset_for(SourcePos::new(2, 1)), OffsetPosition::new(3));
    }

    #[test]
    fn display_sentinel() {
        assert_eq!(OffsetPosition::NONE.to_string(), "<none>");
        assert_eq!(OffsetPosition::new(4).to_string(), "4");
    }
}
