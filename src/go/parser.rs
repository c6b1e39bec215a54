use crate::error::ParseError;
use crate::position::{offset_for_byte_pos, BytePos, OffsetPosition};
use ast_grep_language::{LanguageExt, SupportLang};
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter parser wrapper for Go source code.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        // Get the tree-sitter Language from ast-grep-language
        let ts_lang = SupportLang::Go.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| ParseError::LanguageSet)?;

        Ok(Self { parser })
    }

    /// Parse source code, rejecting any text that contains syntax errors.
    ///
    /// The path is only used for context in errors.
    pub fn parse<'a>(&mut self, path: &Path, source: &'a str) -> Result<ParsedGo<'a>, ParseError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ParseError::ParseFailed {
                path: path.to_path_buf(),
            })?;
        let parsed = ParsedGo { source, tree };

        if let Some(error) = parsed.error_nodes().into_iter().next() {
            return Err(ParseError::Syntax {
                path: path.to_path_buf(),
                line: error.start_point.row + 1,
                column: error.start_point.column + 1,
                message: error.describe(source),
            });
        }

        tracing::trace!(path = %path.display(), bytes = source.len(), "parsed go source");
        Ok(parsed)
    }
}

/// A parsed Go file with its tree-sitter tree.
pub struct ParsedGo<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedGo<'a> {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Extract text for a node's byte range.
    pub fn node_text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }

    /// 1-indexed position of the node's first byte.
    pub fn pos(&self, node: Node<'_>) -> BytePos {
        BytePos::from_offset(node.start_byte())
    }

    /// 1-indexed position immediately after the node.
    pub fn end(&self, node: Node<'_>) -> BytePos {
        BytePos::from_offset(node.end_byte())
    }

    pub fn start_offset(&self, node: Node<'_>) -> OffsetPosition {
        offset_for_byte_pos(self.pos(node))
    }

    pub fn end_offset(&self, node: Node<'_>) -> OffsetPosition {
        offset_for_byte_pos(self.end(node))
    }

    /// Get all ERROR and MISSING nodes in the tree.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        walk_preorder(self.tree.root_node(), |node| {
            if node.is_error() || node.is_missing() {
                errors.push(ErrorNode {
                    byte_start: node.start_byte(),
                    byte_end: node.end_byte(),
                    start_point: node.start_position(),
                    missing: node.is_missing().then(|| node.kind().to_string()),
                });
            }
        });
        errors
    }
}

/// Information about an ERROR or MISSING node in the parse tree.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
    /// Kind of the token tree-sitter had to insert, for MISSING nodes.
    pub missing: Option<String>,
}

impl ErrorNode {
    fn describe(&self, source: &str) -> String {
        if let Some(kind) = &self.missing {
            return format!("expected `{kind}`");
        }
        let text = source.get(self.byte_start..self.byte_end).unwrap_or_default();
        match text.lines().next().map(str::trim) {
            Some(first) if !first.is_empty() => format!("unexpected `{first}`"),
            _ => "syntax error".to_string(),
        }
    }
}

/// Visit every node of the subtree in pre-order, children in source order.
pub fn walk_preorder<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// First direct child of the given kind, named or anonymous.
pub(crate) fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| child.kind() == kind);
    found
}

/// Last direct child of the given kind, named or anonymous.
pub(crate) fn last_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).filter(|child| child.kind() == kind).last();
    found
}

/// Named children, comments excluded.
pub(crate) fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();
    children
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_go() {
        let mut parser = GoParser::new().unwrap();
        let source = "package main\n\nfunc main() {}\n";
        let parsed = parser.parse(Path::new("main.go"), source).unwrap();

        assert_eq!(parsed.root_node().kind(), "source_file");
        assert!(parsed.error_nodes().is_empty());
    }

    #[test]
    fn parse_invalid_go() {
        let mut parser = GoParser::new().unwrap();
        let source = "package main\n\nfunc main( {\n";
        let err = parser.parse(Path::new("main.go"), source).err().unwrap();

        match err {
            ParseError::Syntax { path, line, .. } => {
                assert_eq!(path, Path::new("main.go"));
                assert!(line >= 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn preorder_visits_parents_first() {
        let mut parser = GoParser::new().unwrap();
        let source = "package main\n\nfunc a() {}\n\nfunc b() {}\n";
        let parsed = parser.parse(Path::new("main.go"), source).unwrap();

        let mut kinds = Vec::new();
        walk_preorder(parsed.root_node(), |node| {
            if node.kind() == "source_file" || node.kind() == "function_declaration" {
                kinds.push(node.kind());
            }
        });
        assert_eq!(kinds, ["source_file", "function_declaration", "function_declaration"]);
    }

    #[test]
    fn positions_are_one_indexed() {
        let mut parser = GoParser::new().unwrap();
        let source = "package test\n";
        let parsed = parser.parse(Path::new("test.go"), source).unwrap();
        let clause = child_of_kind(parsed.root_node(), "package_clause").unwrap();
        let name = child_of_kind(clause, "package_identifier").unwrap();

        assert_eq!(parsed.end(name), BytePos(13));
        assert_eq!(parsed.end_offset(name), OffsetPosition::new(12));
        assert_eq!(parsed.node_text(name), "test");
    }
}
