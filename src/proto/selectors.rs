use crate::error::ParseError;
use crate::position::{offset_for_source_pos, LineOffsetTable, OffsetPosition};
use crate::proto::ast::{walk, FileNode, NodeRef};
use crate::proto::parser::parse_proto;
use crate::selection::{PositionSelector, SelectOptions, Selection, SelectionData};
use serde::Serialize;
use std::path::Path;

/// Protobuf selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtoSelector {
    /// After the package declaration or the last import.
    NewImport,
    /// Just before the closing brace of the message named `name`.
    NewMessageField,
    /// Just before the closing brace of the service named `name`.
    NewServiceMethod,
    /// Just before the closing brace of oneof `oneOfName` inside message `messageName`.
    NewOneOfField,
    /// End of the file.
    LastPosition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProtoNewImportPositionData {
    pub should_add_new_line: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProtoNewMessageFieldPositionData {
    pub highest_field_number: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProtoNewOneOfFieldPositionData {
    pub highest_field_number: u32,
}

impl PositionSelector for ProtoSelector {
    fn select(
        &self,
        path: &Path,
        code: &str,
        options: &SelectOptions,
    ) -> Result<Selection, ParseError> {
        let file = parse_proto(path, code)?;
        let table = LineOffsetTable::new(code);

        let mut result = Selection::none();
        match self {
            ProtoSelector::NewImport => select_new_import(&mut result, &file, &table),
            ProtoSelector::NewMessageField => {
                select_new_message_field(&mut result, &file, &table, options)
            }
            ProtoSelector::NewServiceMethod => {
                select_new_service_method(&mut result, &file, &table, options)
            }
            ProtoSelector::NewOneOfField => {
                select_new_oneof_field(&mut result, &file, &table, options)
            }
            ProtoSelector::LastPosition => select_last_position(&mut result, &file, &table, code),
        }

        Ok(result)
    }
}

fn select_new_import(result: &mut Selection, file: &FileNode, table: &LineOffsetTable) {
    walk(file, &mut |node| match node {
        NodeRef::Package(package) => result.set(
            offset_for_source_pos(table, Some(package.span.end)),
            SelectionData::ProtoNewImport(ProtoNewImportPositionData {
                should_add_new_line: true,
            }),
        ),
        NodeRef::Import(import) => result.set(
            offset_for_source_pos(table, Some(import.span.end)),
            SelectionData::ProtoNewImport(ProtoNewImportPositionData {
                should_add_new_line: false,
            }),
        ),
        _ => {}
    });
}

fn select_new_message_field(
    result: &mut Selection,
    file: &FileNode,
    table: &LineOffsetTable,
    options: &SelectOptions,
) {
    let name = options.get("name");
    walk(file, &mut |node| {
        if let NodeRef::Message(message) = node {
            if message.name == name {
                result.set(
                    offset_for_source_pos(table, Some(message.close_brace)),
                    SelectionData::ProtoNewMessageField(ProtoNewMessageFieldPositionData {
                        highest_field_number: message.highest_field_number(),
                    }),
                );
            }
        }
    });
}

fn select_new_service_method(
    result: &mut Selection,
    file: &FileNode,
    table: &LineOffsetTable,
    options: &SelectOptions,
) {
    let name = options.get("name");
    walk(file, &mut |node| {
        if let NodeRef::Service(service) = node {
            if service.name == name {
                result.set(
                    offset_for_source_pos(table, Some(service.close_brace)),
                    SelectionData::None,
                );
            }
        }
    });
}

fn select_new_oneof_field(
    result: &mut Selection,
    file: &FileNode,
    table: &LineOffsetTable,
    options: &SelectOptions,
) {
    let message_name = options.get("messageName");
    let oneof_name = options.get("oneOfName");
    walk(file, &mut |node| {
        let NodeRef::Message(message) = node else {
            return;
        };
        if message.name != message_name {
            return;
        }
        for oneof in message.oneofs().filter(|oneof| oneof.name == oneof_name) {
            result.set(
                offset_for_source_pos(table, Some(oneof.close_brace)),
                SelectionData::ProtoNewOneOfField(ProtoNewOneOfFieldPositionData {
                    highest_field_number: oneof.highest_field_number(),
                }),
            );
        }
    });
}

fn select_last_position(
    result: &mut Selection,
    file: &FileNode,
    table: &LineOffsetTable,
    code: &str,
) {
    let offset = match file.span {
        Some(span) => offset_for_source_pos(table, Some(span.end)),
        None => OffsetPosition::new(code.len()),
    };
    result.set(offset, SelectionData::None);
}
