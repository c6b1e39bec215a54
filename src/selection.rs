//! Selector framework.
//!
//! A selector parses a source text with its grammar, walks the AST in
//! pre-order and overwrites its result on every matching node, so the last
//! matching node in traversal order wins. Parse failures are errors; a parsed
//! text without a matching node yields [`OffsetPosition::NONE`].

use crate::error::ParseError;
use crate::go::{
    GoBeforeFunctionReturnsPositionData, GoNewImportPositionData,
    GoReturningCompositeNewArgumentPositionData, GoReturningFunctionCallNewArgumentPositionData,
    GoSelector, GoStructNewFieldPositionData,
};
use crate::position::OffsetPosition;
use crate::proto::{
    ProtoNewImportPositionData, ProtoNewMessageFieldPositionData, ProtoNewOneOfFieldPositionData,
    ProtoSelector,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// String-keyed parameters of a selector, e.g. `functionName` or `messageName`.
///
/// A missing key reads as the empty string, which never matches a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectOptions(BTreeMap<String, String>);

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SelectOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Local syntactic context collected while selecting, one variant per selector
/// that records any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionData {
    #[default]
    None,
    GoNewImport(GoNewImportPositionData),
    GoBeforeFunctionReturns(GoBeforeFunctionReturnsPositionData),
    GoReturningFunctionCallNewArgument(GoReturningFunctionCallNewArgumentPositionData),
    GoReturningCompositeNewArgument(GoReturningCompositeNewArgumentPositionData),
    GoStructNewField(GoStructNewFieldPositionData),
    ProtoNewImport(ProtoNewImportPositionData),
    ProtoNewMessageField(ProtoNewMessageFieldPositionData),
    ProtoNewOneOfField(ProtoNewOneOfFieldPositionData),
}

impl SelectionData {
    /// Highest field number recorded by the proto field selectors.
    pub fn highest_field_number(&self) -> Option<u32> {
        match self {
            SelectionData::ProtoNewMessageField(d) => Some(d.highest_field_number),
            SelectionData::ProtoNewOneOfField(d) => Some(d.highest_field_number),
            _ => None,
        }
    }
}

/// Result of a selection: an offset (possibly [`OffsetPosition::NONE`]) and
/// the context recorded at the node that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub offset: OffsetPosition,
    pub data: SelectionData,
}

impl Selection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn found(&self) -> bool {
        self.offset.is_some()
    }

    /// Overwrites the current result. Called on every matching node.
    pub(crate) fn set(&mut self, offset: OffsetPosition, data: SelectionData) {
        self.offset = offset;
        self.data = data;
    }
}

/// A configurable selector which can select a position in code.
///
/// Implementations are stateless: the same text and options always give the
/// same selection.
pub trait PositionSelector {
    fn select(
        &self,
        path: &Path,
        code: &str,
        options: &SelectOptions,
    ) -> Result<Selection, ParseError>;
}

/// Every selector, tagged by grammar. Doubles as the selector identity used to
/// classify misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Go(GoSelector),
    Proto(ProtoSelector),
}

impl Selector {
    pub const ALL: [Selector; 12] = [
        Selector::Go(GoSelector::NewImport),
        Selector::Go(GoSelector::NewGlobal),
        Selector::Go(GoSelector::BeforeFunctionReturns),
        Selector::Go(GoSelector::StartOfFunction),
        Selector::Go(GoSelector::ReturningFunctionCallNewArgument),
        Selector::Go(GoSelector::ReturningCompositeNewArgument),
        Selector::Go(GoSelector::StructNewField),
        Selector::Proto(ProtoSelector::NewImport),
        Selector::Proto(ProtoSelector::NewMessageField),
        Selector::Proto(ProtoSelector::NewServiceMethod),
        Selector::Proto(ProtoSelector::NewOneOfField),
        Selector::Proto(ProtoSelector::LastPosition),
    ];

    /// Stable kebab-case name, as used in clip plans and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Selector::Go(GoSelector::NewImport) => "go-new-import",
            Selector::Go(GoSelector::NewGlobal) => "go-new-global",
            Selector::Go(GoSelector::BeforeFunctionReturns) => "go-before-function-returns",
            Selector::Go(GoSelector::StartOfFunction) => "go-start-of-function",
            Selector::Go(GoSelector::ReturningFunctionCallNewArgument) => {
                "go-returning-function-call-new-argument"
            }
            Selector::Go(GoSelector::ReturningCompositeNewArgument) => {
                "go-returning-composite-new-argument"
            }
            Selector::Go(GoSelector::StructNewField) => "go-struct-new-field",
            Selector::Proto(ProtoSelector::NewImport) => "proto-new-import",
            Selector::Proto(ProtoSelector::NewMessageField) => "proto-new-message-field",
            Selector::Proto(ProtoSelector::NewServiceMethod) => "proto-new-service-method",
            Selector::Proto(ProtoSelector::NewOneOfField) => "proto-new-oneof-field",
            Selector::Proto(ProtoSelector::LastPosition) => "proto-last-position",
        }
    }

    /// Option keys the selector reads.
    pub fn option_keys(self) -> &'static [&'static str] {
        match self {
            Selector::Go(GoSelector::NewImport | GoSelector::NewGlobal) => &[],
            Selector::Go(GoSelector::StructNewField) => &["structName"],
            Selector::Go(_) => &["functionName"],
            Selector::Proto(ProtoSelector::NewMessageField | ProtoSelector::NewServiceMethod) => {
                &["name"]
            }
            Selector::Proto(ProtoSelector::NewOneOfField) => &["messageName", "oneOfName"],
            Selector::Proto(ProtoSelector::NewImport | ProtoSelector::LastPosition) => &[],
        }
    }
}

impl PositionSelector for Selector {
    fn select(
        &self,
        path: &Path,
        code: &str,
        options: &SelectOptions,
    ) -> Result<Selection, ParseError> {
        match self {
            Selector::Go(selector) => selector.select(path, code, options),
            Selector::Proto(selector) => selector.select(path, code, options),
        }
    }
}

impl From<GoSelector> for Selector {
    fn from(selector: GoSelector) -> Self {
        Selector::Go(selector)
    }
}

impl From<ProtoSelector> for Selector {
    fn from(selector: ProtoSelector) -> Self {
        Selector::Proto(selector)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown selector `{0}`")]
pub struct UnknownSelector(pub String);

impl FromStr for Selector {
    type Err = UnknownSelector;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::ALL
            .into_iter()
            .find(|selector| selector.name() == s)
            .ok_or_else(|| UnknownSelector(s.to_string()))
    }
}
