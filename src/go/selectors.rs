use crate::error::ParseError;
use crate::go::parser::{
    child_of_kind, last_child_of_kind, named_children, walk_preorder, GoParser, ParsedGo,
};
use crate::selection::{PositionSelector, SelectOptions, Selection, SelectionData};
use serde::Serialize;
use std::path::Path;
use tree_sitter::Node;

/// Go selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoSelector {
    /// Where a new import can be added.
    NewImport,
    /// Where a new variable declaration, function or anything global can be added.
    NewGlobal,
    /// Just before the last statement of a function when it returns, else after it.
    BeforeFunctionReturns,
    /// Just after the function block starts.
    StartOfFunction,
    /// A new argument in the function call that a function returns.
    ReturningFunctionCallNewArgument,
    /// A new element in the struct/map literal that a function returns.
    ReturningCompositeNewArgument,
    /// A new field at the end of a struct type.
    StructNewField,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GoNewImportPositionData {
    pub should_add_new_line: bool,
    /// The position is inside a grouped import, only the import path is needed.
    pub only_url_needed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GoBeforeFunctionReturnsPositionData {
    pub has_return: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GoReturningFunctionCallNewArgumentPositionData {
    pub has_arguments: bool,
    /// The closing parenthesis is preceded by a comma (multi-line call).
    pub has_trailing_comma: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GoReturningCompositeNewArgumentPositionData {
    pub has_arguments: bool,
    /// The closing brace is preceded by a comma (multi-line literal).
    pub has_trailing_comma: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GoStructNewFieldPositionData {
    /// The closing brace is not on a line of its own.
    pub needs_leading_new_line: bool,
}

/// Checks one node during the walk and overwrites the result when it matches.
type GoFinder = fn(&mut Selection, Node<'_>, &ParsedGo<'_>, &SelectOptions);

impl GoSelector {
    fn finder(self) -> GoFinder {
        match self {
            GoSelector::NewImport => find_new_import,
            GoSelector::NewGlobal => find_new_global,
            GoSelector::BeforeFunctionReturns => find_before_function_returns,
            GoSelector::StartOfFunction => find_start_of_function,
            GoSelector::ReturningFunctionCallNewArgument => find_returning_call_argument,
            GoSelector::ReturningCompositeNewArgument => find_returning_composite_argument,
            GoSelector::StructNewField => find_struct_new_field,
        }
    }
}

impl PositionSelector for GoSelector {
    fn select(
        &self,
        path: &Path,
        code: &str,
        options: &SelectOptions,
    ) -> Result<Selection, ParseError> {
        let mut parser = GoParser::new()?;
        let parsed = parser.parse(path, code)?;

        let finder = self.finder();
        let mut result = Selection::none();
        walk_preorder(parsed.root_node(), |node| {
            finder(&mut result, node, &parsed, options)
        });

        Ok(result)
    }
}

fn find_new_import(
    result: &mut Selection,
    node: Node<'_>,
    parsed: &ParsedGo<'_>,
    _: &SelectOptions,
) {
    match node.kind() {
        // After the package declaration: `package name`.
        "package_clause" => {
            if let Some(name) = child_of_kind(node, "package_identifier") {
                result.set(
                    parsed.end_offset(name),
                    SelectionData::GoNewImport(GoNewImportPositionData {
                        should_add_new_line: true,
                        only_url_needed: false,
                    }),
                );
            }
        }
        // After the last import path.
        "import_declaration" => {
            if let Some(list) = child_of_kind(node, "import_spec_list") {
                let anchor = last_child_of_kind(list, "import_spec")
                    .or_else(|| child_of_kind(list, "("));
                if let Some(anchor) = anchor {
                    result.set(
                        parsed.end_offset(anchor),
                        SelectionData::GoNewImport(GoNewImportPositionData {
                            should_add_new_line: false,
                            only_url_needed: true,
                        }),
                    );
                }
            } else if let Some(spec) = last_child_of_kind(node, "import_spec") {
                result.set(
                    parsed.end_offset(spec),
                    SelectionData::GoNewImport(GoNewImportPositionData::default()),
                );
            }
        }
        _ => {}
    }
}

fn find_new_global(
    result: &mut Selection,
    node: Node<'_>,
    parsed: &ParsedGo<'_>,
    _: &SelectOptions,
) {
    match node.kind() {
        "package_clause" => {
            if let Some(name) = child_of_kind(node, "package_identifier") {
                result.set(parsed.end_offset(name), SelectionData::None);
            }
        }
        "import_declaration" => result.set(parsed.end_offset(node), SelectionData::None),
        _ => {}
    }
}

fn find_before_function_returns(
    result: &mut Selection,
    node: Node<'_>,
    parsed: &ParsedGo<'_>,
    options: &SelectOptions,
) {
    let Some(body) = function_body(node, parsed, options.get("functionName")) else {
        return;
    };

    let data = |has_return| {
        SelectionData::GoBeforeFunctionReturns(GoBeforeFunctionReturnsPositionData { has_return })
    };
    match block_statements(body).last() {
        Some(last) if last.kind() == "return_statement" => {
            result.set(parsed.start_offset(*last), data(true));
        }
        Some(last) => result.set(parsed.end_offset(*last), data(false)),
        None => {
            if let Some(lbrace) = child_of_kind(body, "{") {
                result.set(parsed.end_offset(lbrace), data(false));
            }
        }
    }
}

fn find_start_of_function(
    result: &mut Selection,
    node: Node<'_>,
    parsed: &ParsedGo<'_>,
    options: &SelectOptions,
) {
    if let Some(body) = function_body(node, parsed, options.get("functionName")) {
        if let Some(lbrace) = child_of_kind(body, "{") {
            result.set(parsed.end_offset(lbrace), SelectionData::None);
        }
    }
}

fn find_returning_call_argument(
    result: &mut Selection,
    node: Node<'_>,
    parsed: &ParsedGo<'_>,
    options: &SelectOptions,
) {
    let Some(call) = single_returned_expression(node, parsed, options.get("functionName"))
        .filter(|expr| expr.kind() == "call_expression")
    else {
        return;
    };
    let Some(arguments) = call.child_by_field_name("arguments") else {
        return;
    };
    let Some(rparen) = last_child_of_kind(arguments, ")") else {
        return;
    };

    result.set(
        parsed.start_offset(rparen),
        SelectionData::GoReturningFunctionCallNewArgument(
            GoReturningFunctionCallNewArgumentPositionData {
                has_arguments: !named_children(arguments).is_empty(),
                has_trailing_comma: ends_with_comma(arguments, ")"),
            },
        ),
    );
}

fn find_returning_composite_argument(
    result: &mut Selection,
    node: Node<'_>,
    parsed: &ParsedGo<'_>,
    options: &SelectOptions,
) {
    let Some(literal) = single_returned_expression(node, parsed, options.get("functionName"))
        .and_then(composite_literal)
    else {
        return;
    };
    let Some(body) = literal.child_by_field_name("body") else {
        return;
    };
    let Some(rbrace) = last_child_of_kind(body, "}") else {
        return;
    };

    result.set(
        parsed.start_offset(rbrace),
        SelectionData::GoReturningCompositeNewArgument(
            GoReturningCompositeNewArgumentPositionData {
                has_arguments: !named_children(body).is_empty(),
                has_trailing_comma: ends_with_comma(body, "}"),
            },
        ),
    );
}

fn find_struct_new_field(
    result: &mut Selection,
    node: Node<'_>,
    parsed: &ParsedGo<'_>,
    options: &SelectOptions,
) {
    if node.kind() != "type_spec" {
        return;
    }
    let named = node
        .child_by_field_name("name")
        .is_some_and(|name| parsed.node_text(name) == options.get("structName"));
    if !named {
        return;
    }
    let Some(fields) = node
        .child_by_field_name("type")
        .filter(|ty| ty.kind() == "struct_type")
        .and_then(|ty| child_of_kind(ty, "field_declaration_list"))
    else {
        return;
    };
    let Some(rbrace) = last_child_of_kind(fields, "}") else {
        return;
    };

    let offset = parsed.start_offset(rbrace);
    let line_start = offset
        .get()
        .map(|i| parsed.source[..i].trim_end_matches([' ', '\t']).ends_with('\n'))
        .unwrap_or(false);
    result.set(
        offset,
        SelectionData::GoStructNewField(GoStructNewFieldPositionData {
            needs_leading_new_line: !line_start,
        }),
    );
}

/// Body of a function or method declaration with the given name.
fn function_body<'t>(node: Node<'t>, parsed: &ParsedGo<'_>, name: &str) -> Option<Node<'t>> {
    if !matches!(node.kind(), "function_declaration" | "method_declaration") {
        return None;
    }
    let function_name = node.child_by_field_name("name")?;
    if parsed.node_text(function_name) != name {
        return None;
    }
    node.child_by_field_name("body")
}

/// Statements of a block in source order.
fn block_statements(block: Node<'_>) -> Vec<Node<'_>> {
    let mut statements = Vec::new();
    for child in named_children(block) {
        if child.kind() == "statement_list" {
            statements.extend(named_children(child));
        } else {
            statements.push(child);
        }
    }
    statements
}

/// The only expression returned by the final statement of the named function.
fn single_returned_expression<'t>(
    node: Node<'t>,
    parsed: &ParsedGo<'_>,
    name: &str,
) -> Option<Node<'t>> {
    let body = function_body(node, parsed, name)?;
    let last = block_statements(body).pop()?;
    if last.kind() != "return_statement" {
        return None;
    }

    let mut results = Vec::new();
    for child in named_children(last) {
        if child.kind() == "expression_list" {
            results.extend(named_children(child));
        } else {
            results.push(child);
        }
    }
    match results.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// The literal itself, or the literal behind an address-of operator as in
/// `return &GenesisState{...}`.
fn composite_literal(expr: Node<'_>) -> Option<Node<'_>> {
    match expr.kind() {
        "composite_literal" => Some(expr),
        "unary_expression" => expr
            .child_by_field_name("operand")
            .filter(|operand| operand.kind() == "composite_literal"),
        _ => None,
    }
}

/// Whether the last token before the closing delimiter of `list` is a comma.
/// Comments between that comma and the delimiter are skipped.
fn ends_with_comma(list: Node<'_>, closing: &str) -> bool {
    let mut cursor = list.walk();
    list.children(&mut cursor)
        .filter(|child| child.kind() != "comment" && child.kind() != closing)
        .last()
        .is_some_and(|child| child.kind() == ",")
}
