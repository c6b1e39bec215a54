//! Splice engine and session.
//!
//! [`splice`] is the strict entry point: a selector miss is an error. A
//! [`Clipper`] wraps the same operation leniently for a whole generation run:
//! misses leave the code untouched and are collected, and [`Clipper::err`]
//! reports all of them at the end together with any placeholder errors.

use crate::error::{ClipperError, ValidationError};
use crate::go::{GoSelector, GoStructNewFieldPositionData};
use crate::placeholder::{MissingPlaceholdersError, Tracer};
use crate::proto::ProtoSelector;
use crate::selection::{PositionSelector, SelectOptions, Selection, SelectionData, Selector};
use std::path::{Path, PathBuf};

/// Inserts `snippet` into `code` at `offset`.
fn insert_at(
    path: &Path,
    code: &str,
    offset: usize,
    snippet: &str,
) -> Result<String, ClipperError> {
    if !code.is_char_boundary(offset) {
        return Err(ClipperError::InvalidOffset {
            path: path.to_path_buf(),
            offset,
            len: code.len(),
        });
    }

    let mut new_code = String::with_capacity(code.len() + snippet.len());
    new_code.push_str(&code[..offset]);
    new_code.push_str(snippet);
    new_code.push_str(&code[offset..]);
    Ok(new_code)
}

/// Runs the selector and, on a hit, pastes the generated snippet. `Ok(None)`
/// is a miss.
fn try_splice<G>(
    path: &Path,
    code: &str,
    selector: Selector,
    options: &SelectOptions,
    generator: G,
) -> Result<Option<String>, ClipperError>
where
    G: FnOnce(&SelectionData) -> String,
{
    let Selection { offset, data } = selector.select(path, code, options)?;
    let Some(offset) = offset.get() else {
        return Ok(None);
    };

    let snippet = generator(&data);
    let new_code = insert_at(path, code, offset, &snippet)?;
    tracing::debug!(
        path = %path.display(),
        %selector,
        offset,
        inserted = snippet.len(),
        "pasted snippet"
    );
    Ok(Some(new_code))
}

/// Pastes a generated snippet at the position selected in `code` and returns
/// the new code. A missing position is an error. The path is only used for
/// context in errors.
pub fn splice<G>(
    path: impl AsRef<Path>,
    code: &str,
    selector: impl Into<Selector>,
    options: &SelectOptions,
    generator: G,
) -> Result<String, ClipperError>
where
    G: FnOnce(&SelectionData) -> String,
{
    let path = path.as_ref();
    let selector = selector.into();
    try_splice(path, code, selector, options, generator)?.ok_or_else(|| {
        ClipperError::NoPosition {
            selector,
            path: path.to_path_buf(),
        }
    })
}

/// A selector call that found no position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSelection {
    pub selector: Selector,
    pub path: PathBuf,
    pub options: SelectOptions,
}

impl MissingSelection {
    /// Human-readable report line naming the target that could not be found.
    pub fn message(&self) -> String {
        let file = self.path.display();
        let option = |key: &'static str| self.options.get(key);
        match self.selector {
            Selector::Proto(ProtoSelector::NewImport) | Selector::Go(GoSelector::NewImport) => {
                format!("◦ cannot find position to add new import in {file}")
            }
            Selector::Proto(ProtoSelector::NewMessageField) => {
                format!("◦ cannot find message {} in {file}", option("name"))
            }
            Selector::Proto(ProtoSelector::NewServiceMethod) => {
                format!("◦ cannot find service {} in {file}", option("name"))
            }
            Selector::Proto(ProtoSelector::NewOneOfField) => format!(
                "◦ cannot find message {} with oneof field {} in {file}",
                option("messageName"),
                option("oneOfName")
            ),
            Selector::Proto(ProtoSelector::LastPosition) => {
                format!("◦ cannot find last position of file in {file}")
            }
            Selector::Go(GoSelector::NewGlobal) => {
                format!("◦ cannot find position for global declaration in {file}")
            }
            Selector::Go(GoSelector::BeforeFunctionReturns | GoSelector::StartOfFunction) => {
                format!("◦ cannot find function {} in {file}", option("functionName"))
            }
            Selector::Go(GoSelector::ReturningFunctionCallNewArgument) => format!(
                "◦ cannot find function {} which is returning value with a function call in {file}",
                option("functionName")
            ),
            Selector::Go(GoSelector::ReturningCompositeNewArgument) => format!(
                "◦ cannot find function {} which is returning value with a map/struct call in {file}",
                option("functionName")
            ),
            Selector::Go(GoSelector::StructNewField) => {
                format!("◦ cannot find struct {} in {file}", option("structName"))
            }
        }
    }
}

/// Pastes generated code in place by selecting positions in parsed code.
/// For older generated projects it can also replace placeholders.
///
/// One `Clipper` is meant for one generation run. It is not synchronized; use
/// one per thread.
#[derive(Debug, Default)]
pub struct Clipper {
    tracer: Tracer,
    missing_selections: Vec<MissingSelection>,
}

impl Clipper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selections that found no position so far, in call order.
    pub fn missing_selections(&self) -> &[MissingSelection] {
        &self.missing_selections
    }

    /// `None` when every selection and placeholder was found.
    pub fn err(&self) -> Option<ValidationError> {
        let missing_selections: Vec<String> = self
            .missing_selections
            .iter()
            .map(MissingSelection::message)
            .collect();
        let tracer_error = self.tracer.err();

        if missing_selections.is_empty() && tracer_error.is_none() {
            return None;
        }
        Some(ValidationError {
            missing_selections,
            tracer_error,
        })
    }

    /// Pastes a literal snippet at the selected position. See
    /// [`Clipper::paste_generated_code_snippet_at`].
    pub fn paste_code_snippet_at(
        &mut self,
        path: impl AsRef<Path>,
        code: &str,
        selector: impl Into<Selector>,
        options: &SelectOptions,
        snippet: &str,
    ) -> Result<String, ClipperError> {
        self.paste_generated_code_snippet_at(path, code, selector, options, |_| snippet.to_string())
    }

    /// Pastes a generated snippet at the selected position and returns the new
    /// code. When no position is found the code is returned as is and the miss
    /// is recorded for [`Clipper::err`]. The path is only used for context in
    /// errors.
    pub fn paste_generated_code_snippet_at<G>(
        &mut self,
        path: impl AsRef<Path>,
        code: &str,
        selector: impl Into<Selector>,
        options: &SelectOptions,
        generator: G,
    ) -> Result<String, ClipperError>
    where
        G: FnOnce(&SelectionData) -> String,
    {
        let path = path.as_ref();
        let selector = selector.into();
        match try_splice(path, code, selector, options, generator)? {
            Some(new_code) => Ok(new_code),
            None => {
                let missing = MissingSelection {
                    selector,
                    path: path.to_path_buf(),
                    options: options.clone(),
                };
                tracing::warn!(path = %path.display(), %selector, "{}", missing.message());
                self.missing_selections.push(missing);
                Ok(code.to_string())
            }
        }
    }

    /// Pastes a proto import, keeping an empty line between the package
    /// declaration and the first import.
    pub fn paste_proto_import_snippet_at(
        &mut self,
        path: impl AsRef<Path>,
        code: &str,
        snippet: &str,
    ) -> Result<String, ClipperError> {
        self.paste_generated_code_snippet_at(
            path,
            code,
            ProtoSelector::NewImport,
            &SelectOptions::new(),
            |data| match data {
                SelectionData::ProtoNewImport(d) if d.should_add_new_line => format!("\n{snippet}"),
                _ => snippet.to_string(),
            },
        )
    }

    /// Pastes a Go import path. Outside of an import group the snippet is
    /// wrapped in a new `import ( ... )` block.
    pub fn paste_go_import_snippet_at(
        &mut self,
        path: impl AsRef<Path>,
        code: &str,
        snippet: &str,
    ) -> Result<String, ClipperError> {
        self.paste_generated_code_snippet_at(
            path,
            code,
            GoSelector::NewImport,
            &SelectOptions::new(),
            |data| match data {
                SelectionData::GoNewImport(d) if d.only_url_needed => format!("\n\t{snippet}"),
                _ => format!("\nimport (\n\t{snippet}\n)"),
            },
        )
    }

    /// Pastes Go statements right before a function returns, or at the end of
    /// its block when it has no explicit return.
    pub fn paste_go_before_return_snippet_at(
        &mut self,
        path: impl AsRef<Path>,
        code: &str,
        snippet: &str,
        options: &SelectOptions,
    ) -> Result<String, ClipperError> {
        self.paste_generated_code_snippet_at(
            path,
            code,
            GoSelector::BeforeFunctionReturns,
            options,
            |data| match data {
                SelectionData::GoBeforeFunctionReturns(d) if d.has_return => {
                    format!("{snippet}\n\t")
                }
                _ => format!("\n\t{snippet}"),
            },
        )
    }

    /// Pastes an argument into the function call a function returns.
    pub fn paste_go_returning_function_new_argument_snippet_at(
        &mut self,
        path: impl AsRef<Path>,
        code: &str,
        snippet: &str,
        options: &SelectOptions,
    ) -> Result<String, ClipperError> {
        self.paste_generated_code_snippet_at(
            path,
            code,
            GoSelector::ReturningFunctionCallNewArgument,
            options,
            |data| match data {
                SelectionData::GoReturningFunctionCallNewArgument(d) => {
                    new_argument(snippet, d.has_arguments, d.has_trailing_comma)
                }
                _ => new_argument(snippet, false, false),
            },
        )
    }

    /// Pastes an element into the struct or map literal a function returns.
    pub fn paste_go_returning_composite_new_argument_snippet_at(
        &mut self,
        path: impl AsRef<Path>,
        code: &str,
        snippet: &str,
        options: &SelectOptions,
    ) -> Result<String, ClipperError> {
        self.paste_generated_code_snippet_at(
            path,
            code,
            GoSelector::ReturningCompositeNewArgument,
            options,
            |data| match data {
                SelectionData::GoReturningCompositeNewArgument(d) => {
                    new_argument(snippet, d.has_arguments, d.has_trailing_comma)
                }
                _ => new_argument(snippet, false, false),
            },
        )
    }

    /// Pastes a field declaration at the end of a struct type.
    pub fn paste_go_struct_field_snippet_at(
        &mut self,
        path: impl AsRef<Path>,
        code: &str,
        snippet: &str,
        options: &SelectOptions,
    ) -> Result<String, ClipperError> {
        self.paste_generated_code_snippet_at(
            path,
            code,
            GoSelector::StructNewField,
            options,
            |data| match data {
                SelectionData::GoStructNewField(GoStructNewFieldPositionData {
                    needs_leading_new_line: true,
                }) => format!("\n\t{snippet}\n"),
                _ => format!("\t{snippet}\n"),
            },
        )
    }

    pub fn replace(&mut self, content: &str, placeholder: &str, replacement: &str) -> String {
        self.tracer.replace(content, placeholder, replacement)
    }

    pub fn replace_once(&mut self, content: &str, placeholder: &str, replacement: &str) -> String {
        self.tracer.replace_once(content, placeholder, replacement)
    }

    pub fn replace_all(&mut self, content: &str, placeholder: &str, replacement: &str) -> String {
        self.tracer.replace_all(content, placeholder, replacement)
    }

    pub fn append_misc_error(&mut self, message: impl Into<String>) {
        self.tracer.append_misc_error(message);
    }

    /// Placeholder errors only, without the missing selections.
    pub fn tracer_err(&self) -> Option<MissingPlaceholdersError> {
        self.tracer.err()
    }
}

fn new_argument(snippet: &str, has_arguments: bool, has_trailing_comma: bool) -> String {
    if !has_arguments {
        return format!("{snippet},");
    }
    if has_trailing_comma {
        return format!("\t{snippet},\n\t");
    }
    format!(", {snippet},")
}
