use crate::selection::{SelectOptions, Selector};
use serde::Deserialize;
use std::fmt;

/// Placeholder in clip snippets replaced with the next free field number of
/// a proto message or oneof.
pub const NEXT_FIELD_NUMBER: &str = "{next_field_number}";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ClipPlan {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub clips: Vec<ClipDefinition>,
    #[serde(default)]
    pub placeholders: Vec<PlaceholderDefinition>,
}

impl ClipPlan {
    pub fn validate(&self) -> Result<(), PlanValidationError> {
        let mut issues = Vec::new();

        if self.clips.is_empty() && self.placeholders.is_empty() {
            issues.push(ValidationIssue::EmptyPlan);
        }

        for clip in &self.clips {
            if clip.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry_id: None,
                    field: "id",
                });
            }
            if clip.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry_id: Some(clip.id.clone()),
                    field: "file",
                });
            }
            if clip.snippet.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry_id: Some(clip.id.clone()),
                    field: "snippet",
                });
            }

            let selector = match clip.selector() {
                Ok(selector) => selector,
                Err(err) => {
                    issues.push(ValidationIssue::InvalidCombo {
                        entry_id: Some(clip.id.clone()),
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            if let Some(expected) = clip.mode.selector() {
                if expected != selector {
                    issues.push(ValidationIssue::InvalidCombo {
                        entry_id: Some(clip.id.clone()),
                        message: format!("mode '{}' requires selector '{expected}'", clip.mode),
                    });
                }
            }

            for &key in selector.option_keys() {
                if clip.options.get(key).trim().is_empty() {
                    issues.push(ValidationIssue::MissingOption {
                        entry_id: clip.id.clone(),
                        selector,
                        key,
                    });
                }
            }

            let numbered = matches!(
                selector,
                Selector::Proto(
                    crate::proto::ProtoSelector::NewMessageField
                        | crate::proto::ProtoSelector::NewOneOfField
                )
            );
            if clip.snippet.contains(NEXT_FIELD_NUMBER) && !numbered {
                issues.push(ValidationIssue::InvalidCombo {
                    entry_id: Some(clip.id.clone()),
                    message: format!(
                        "{NEXT_FIELD_NUMBER} is only available for proto-new-message-field and proto-new-oneof-field"
                    ),
                });
            }
        }

        for placeholder in &self.placeholders {
            if placeholder.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry_id: None,
                    field: "id",
                });
            }
            if placeholder.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry_id: Some(placeholder.id.clone()),
                    field: "file",
                });
            }
            if placeholder.placeholder.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    entry_id: Some(placeholder.id.clone()),
                    field: "placeholder",
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(PlanValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One snippet pasted at a selected position.
#[derive(Debug, Deserialize, Clone)]
pub struct ClipDefinition {
    pub id: String,
    /// Path relative to the plan root.
    pub file: String,
    /// Kebab-case selector name, e.g. `go-new-import`.
    pub selector: String,
    pub snippet: String,
    #[serde(default)]
    pub mode: ClipMode,
    #[serde(default)]
    pub options: SelectOptions,
}

impl ClipDefinition {
    pub fn selector(&self) -> Result<Selector, crate::selection::UnknownSelector> {
        self.selector.parse()
    }
}

/// How the snippet is formatted from the selection payload.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ClipMode {
    /// Pasted as written.
    #[default]
    Raw,
    GoImport,
    GoBeforeReturn,
    GoReturningCallArgument,
    GoReturningCompositeArgument,
    GoStructField,
    ProtoImport,
}

impl ClipMode {
    /// The selector a formatting mode is bound to; `None` for raw snippets.
    pub fn selector(self) -> Option<Selector> {
        use crate::go::GoSelector;
        use crate::proto::ProtoSelector;

        match self {
            ClipMode::Raw => None,
            ClipMode::GoImport => Some(GoSelector::NewImport.into()),
            ClipMode::GoBeforeReturn => Some(GoSelector::BeforeFunctionReturns.into()),
            ClipMode::GoReturningCallArgument => {
                Some(GoSelector::ReturningFunctionCallNewArgument.into())
            }
            ClipMode::GoReturningCompositeArgument => {
                Some(GoSelector::ReturningCompositeNewArgument.into())
            }
            ClipMode::GoStructField => Some(GoSelector::StructNewField.into()),
            ClipMode::ProtoImport => Some(ProtoSelector::NewImport.into()),
        }
    }
}

impl fmt::Display for ClipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClipMode::Raw => "raw",
            ClipMode::GoImport => "go-import",
            ClipMode::GoBeforeReturn => "go-before-return",
            ClipMode::GoReturningCallArgument => "go-returning-call-argument",
            ClipMode::GoReturningCompositeArgument => "go-returning-composite-argument",
            ClipMode::GoStructField => "go-struct-field",
            ClipMode::ProtoImport => "proto-import",
        };
        f.write_str(name)
    }
}

/// Legacy marker replacement.
#[derive(Debug, Deserialize, Clone)]
pub struct PlaceholderDefinition {
    pub id: String,
    pub file: String,
    pub placeholder: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub strategy: ReplaceStrategy,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReplaceStrategy {
    /// First occurrence.
    #[default]
    First,
    /// First occurrence, unless the replacement is already present.
    Once,
    All,
}

#[derive(Debug, Clone)]
pub struct PlanValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for PlanValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PlanValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyPlan,
    MissingField {
        entry_id: Option<String>,
        field: &'static str,
    },
    MissingOption {
        entry_id: String,
        selector: Selector,
        key: &'static str,
    },
    InvalidCombo {
        entry_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPlan => write!(f, "clip plan contains no clips or placeholders"),
            ValidationIssue::MissingField { entry_id, field } => match entry_id {
                Some(id) => write!(f, "entry '{id}' missing required field '{field}'"),
                None => write!(f, "entry missing required field '{field}'"),
            },
            ValidationIssue::MissingOption {
                entry_id,
                selector,
                key,
            } => write!(
                f,
                "clip '{entry_id}' uses selector '{selector}' which requires option '{key}'"
            ),
            ValidationIssue::InvalidCombo { entry_id, message } => match entry_id {
                Some(id) => write!(f, "entry '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid clip configuration: {message}"),
            },
        }
    }
}
