//! Protobuf AST. Every node carries 1-indexed start and end positions; the
//! end is one column past the last byte of the node's last token.

use crate::position::SourcePos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: SourcePos,
    pub end: SourcePos,
}

impl Span {
    pub fn new(start: SourcePos, end: SourcePos) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileNode {
    /// `None` for a file without any token.
    pub span: Option<Span>,
    /// Top-level declarations in source order.
    pub decls: Vec<FileElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileElement {
    Syntax(SyntaxNode),
    Package(PackageNode),
    Import(ImportNode),
    Option(OptionNode),
    Message(MessageNode),
    Enum(EnumNode),
    Service(ServiceNode),
    Extend(ExtendNode),
    Empty(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub span: Span,
    /// `syntax` or `edition`.
    pub keyword: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageNode {
    pub span: Span,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportModifier {
    Weak,
    Public,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportNode {
    pub span: Span,
    pub modifier: Option<ImportModifier>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionNode {
    pub span: Span,
    pub name: String,
    /// Source text of the value, aggregates included verbatim.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageNode {
    pub span: Span,
    pub name: String,
    pub open_brace: SourcePos,
    pub close_brace: SourcePos,
    pub elements: Vec<MessageElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageElement {
    Field(FieldNode),
    MapField(MapFieldNode),
    OneOf(OneOfNode),
    Message(MessageNode),
    Enum(EnumNode),
    Extend(ExtendNode),
    Option(OptionNode),
    Reserved(Span),
    Extensions(Span),
    Empty(Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Optional,
    Required,
    Repeated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub span: Span,
    pub label: Option<FieldLabel>,
    pub field_type: String,
    pub name: String,
    pub tag: u32,
    pub options: Vec<OptionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapFieldNode {
    pub span: Span,
    pub key_type: String,
    pub value_type: String,
    pub name: String,
    pub tag: u32,
    pub options: Vec<OptionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OneOfNode {
    pub span: Span,
    pub name: String,
    pub open_brace: SourcePos,
    pub close_brace: SourcePos,
    pub elements: Vec<OneOfElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OneOfElement {
    Field(FieldNode),
    Option(OptionNode),
    Empty(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumNode {
    pub span: Span,
    pub name: String,
    pub close_brace: SourcePos,
    pub elements: Vec<EnumElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnumElement {
    Value(EnumValueNode),
    Option(OptionNode),
    Reserved(Span),
    Empty(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueNode {
    pub span: Span,
    pub name: String,
    pub number: i64,
    pub options: Vec<OptionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceNode {
    pub span: Span,
    pub name: String,
    pub open_brace: SourcePos,
    pub close_brace: SourcePos,
    pub elements: Vec<ServiceElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceElement {
    Rpc(RpcNode),
    Option(OptionNode),
    Empty(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcType {
    pub stream: bool,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcNode {
    pub span: Span,
    pub name: String,
    pub input: RpcType,
    pub output: RpcType,
    pub options: Vec<OptionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendNode {
    pub span: Span,
    pub extendee: String,
    pub close_brace: SourcePos,
    pub fields: Vec<FieldNode>,
}

impl FileNode {
    pub fn package(&self) -> Option<&PackageNode> {
        self.decls.iter().find_map(|decl| match decl {
            FileElement::Package(package) => Some(package),
            _ => None,
        })
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportNode> {
        self.decls.iter().filter_map(|decl| match decl {
            FileElement::Import(import) => Some(import),
            _ => None,
        })
    }
}

impl MessageNode {
    /// Highest field number in the message's own tag space: direct fields,
    /// map fields and the fields of its oneofs. 0 when there are none.
    pub fn highest_field_number(&self) -> u32 {
        self.elements
            .iter()
            .map(|element| match element {
                MessageElement::Field(field) => field.tag,
                MessageElement::MapField(field) => field.tag,
                MessageElement::OneOf(oneof) => oneof.highest_field_number(),
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn oneofs(&self) -> impl Iterator<Item = &OneOfNode> {
        self.elements.iter().filter_map(|element| match element {
            MessageElement::OneOf(oneof) => Some(oneof),
            _ => None,
        })
    }
}

impl OneOfNode {
    pub fn highest_field_number(&self) -> u32 {
        self.elements
            .iter()
            .filter_map(|element| match element {
                OneOfElement::Field(field) => Some(field.tag),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

/// A borrowed view of any node, as handed to [`walk`] visitors.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    File(&'a FileNode),
    Syntax(&'a SyntaxNode),
    Package(&'a PackageNode),
    Import(&'a ImportNode),
    Option(&'a OptionNode),
    Message(&'a MessageNode),
    Field(&'a FieldNode),
    MapField(&'a MapFieldNode),
    OneOf(&'a OneOfNode),
    Enum(&'a EnumNode),
    EnumValue(&'a EnumValueNode),
    Service(&'a ServiceNode),
    Rpc(&'a RpcNode),
    Extend(&'a ExtendNode),
}

/// Visit the file and every node below it in pre-order, children in source order.
pub fn walk<'a>(file: &'a FileNode, visit: &mut impl FnMut(NodeRef<'a>)) {
    visit(NodeRef::File(file));
    for decl in &file.decls {
        match decl {
            FileElement::Syntax(node) => visit(NodeRef::Syntax(node)),
            FileElement::Package(node) => visit(NodeRef::Package(node)),
            FileElement::Import(node) => visit(NodeRef::Import(node)),
            FileElement::Option(node) => visit(NodeRef::Option(node)),
            FileElement::Message(node) => walk_message(node, visit),
            FileElement::Enum(node) => walk_enum(node, visit),
            FileElement::Service(node) => walk_service(node, visit),
            FileElement::Extend(node) => walk_extend(node, visit),
            FileElement::Empty(_) => {}
        }
    }
}

fn walk_message<'a>(message: &'a MessageNode, visit: &mut impl FnMut(NodeRef<'a>)) {
    visit(NodeRef::Message(message));
    for element in &message.elements {
        match element {
            MessageElement::Field(node) => walk_field(node, visit),
            MessageElement::MapField(node) => {
                visit(NodeRef::MapField(node));
                node.options.iter().for_each(|o| visit(NodeRef::Option(o)));
            }
            MessageElement::OneOf(node) => {
                visit(NodeRef::OneOf(node));
                for element in &node.elements {
                    match element {
                        OneOfElement::Field(field) => walk_field(field, visit),
                        OneOfElement::Option(option) => visit(NodeRef::Option(option)),
                        OneOfElement::Empty(_) => {}
                    }
                }
            }
            MessageElement::Message(node) => walk_message(node, visit),
            MessageElement::Enum(node) => walk_enum(node, visit),
            MessageElement::Extend(node) => walk_extend(node, visit),
            MessageElement::Option(node) => visit(NodeRef::Option(node)),
            MessageElement::Reserved(_)
            | MessageElement::Extensions(_)
            | MessageElement::Empty(_) => {}
        }
    }
}

fn walk_field<'a>(field: &'a FieldNode, visit: &mut impl FnMut(NodeRef<'a>)) {
    visit(NodeRef::Field(field));
    field.options.iter().for_each(|o| visit(NodeRef::Option(o)));
}

fn walk_enum<'a>(node: &'a EnumNode, visit: &mut impl FnMut(NodeRef<'a>)) {
    visit(NodeRef::Enum(node));
    for element in &node.elements {
        match element {
            EnumElement::Value(value) => {
                visit(NodeRef::EnumValue(value));
                value.options.iter().for_each(|o| visit(NodeRef::Option(o)));
            }
            EnumElement::Option(option) => visit(NodeRef::Option(option)),
            EnumElement::Reserved(_) | EnumElement::Empty(_) => {}
        }
    }
}

fn walk_service<'a>(node: &'a ServiceNode, visit: &mut impl FnMut(NodeRef<'a>)) {
    visit(NodeRef::Service(node));
    for element in &node.elements {
        match element {
            ServiceElement::Rpc(rpc) => {
                visit(NodeRef::Rpc(rpc));
                rpc.options.iter().for_each(|o| visit(NodeRef::Option(o)));
            }
            ServiceElement::Option(option) => visit(NodeRef::Option(option)),
            ServiceElement::Empty(_) => {}
        }
    }
}

fn walk_extend<'a>(node: &'a ExtendNode, visit: &mut impl FnMut(NodeRef<'a>)) {
    visit(NodeRef::Extend(node));
    for field in &node.fields {
        walk_field(field, visit);
    }
}
