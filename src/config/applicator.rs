//! Clip plan applicator.
//!
//! Runs every entry of a plan through one [`Clipper`] session:
//! - Groups entries by file, reading each file once
//! - Re-parses the current text for every clip
//! - Writes each changed file atomically, unless running dry
//! - Reports a result per entry, a before/after pair per file and the
//!   session's aggregate error

use crate::clipper::Clipper;
use crate::config::schema::{
    ClipDefinition, ClipMode, ClipPlan, PlaceholderDefinition, ReplaceStrategy,
    NEXT_FIELD_NUMBER,
};
use crate::error::{ClipperError, ValidationError};
use crate::selection::{SelectionData, Selector, UnknownSelector};
use crate::write::{atomic_write, WriteError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result of a single plan entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EntryResult should be checked for misses"]
pub enum EntryResult {
    /// Snippet pasted or placeholder replaced.
    Applied { file: PathBuf },
    /// Placeholder replacement already present.
    AlreadyApplied { file: PathBuf },
    /// Selector found no position or placeholder was absent; the file is unchanged.
    Missed { file: PathBuf, reason: String },
}

impl fmt::Display for EntryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryResult::Applied { file } => write!(f, "Applied to {}", file.display()),
            EntryResult::AlreadyApplied { file } => {
                write!(f, "Already applied to {}", file.display())
            }
            EntryResult::Missed { file, reason } => {
                write!(f, "Missed in {}: {}", file.display(), reason)
            }
        }
    }
}

/// Text of one file before and after the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipOutcome {
    pub file: PathBuf,
    pub original: String,
    pub updated: String,
    /// The new text was written to disk.
    pub written: bool,
}

impl ClipOutcome {
    pub fn changed(&self) -> bool {
        self.original != self.updated
    }
}

/// Everything a plan run produced.
#[derive(Debug)]
pub struct PlanReport {
    pub entries: Vec<(String, EntryResult)>,
    pub files: Vec<ClipOutcome>,
    /// Missing selections and placeholders of the whole session.
    pub validation: Option<ValidationError>,
}

/// Hard failures that abort a run.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Parse failure or invalid offset while splicing.
    #[error("clip '{id}' failed: {source}")]
    Clip { id: String, source: ClipperError },
    #[error("clip '{id}': {source}")]
    UnknownSelector { id: String, source: UnknownSelector },
    #[error("write error: {0}")]
    Write(#[from] WriteError),
}

/// Apply a clip plan to the files under `root` with a fresh session.
pub fn apply_plan(
    plan: &ClipPlan,
    root: &Path,
    dry_run: bool,
) -> Result<PlanReport, ApplicationError> {
    let mut clipper = Clipper::new();
    let (entries, files) = apply_plan_with(&mut clipper, plan, root, dry_run)?;
    Ok(PlanReport {
        entries,
        files,
        validation: clipper.err(),
    })
}

#[derive(Clone, Copy)]
enum Entry<'a> {
    Clip(&'a ClipDefinition),
    Placeholder(&'a PlaceholderDefinition),
}

impl Entry<'_> {
    fn id(&self) -> &str {
        match self {
            Entry::Clip(clip) => &clip.id,
            Entry::Placeholder(placeholder) => &placeholder.id,
        }
    }
}

/// Apply a clip plan within an existing session, so several plans can share
/// one aggregate report.
#[allow(clippy::type_complexity)]
pub fn apply_plan_with(
    clipper: &mut Clipper,
    plan: &ClipPlan,
    root: &Path,
    dry_run: bool,
) -> Result<(Vec<(String, EntryResult)>, Vec<ClipOutcome>), ApplicationError> {
    // Group entries by file, in order of first appearance.
    let mut by_file: Vec<(PathBuf, Vec<Entry<'_>>)> = Vec::new();
    let entries = plan
        .clips
        .iter()
        .map(|clip| (&clip.file, Entry::Clip(clip)))
        .chain(
            plan.placeholders
                .iter()
                .map(|placeholder| (&placeholder.file, Entry::Placeholder(placeholder))),
        );
    for (file, entry) in entries {
        let path = root.join(file);
        match by_file.iter_mut().find(|(p, _)| *p == path) {
            Some((_, group)) => group.push(entry),
            None => by_file.push((path, vec![entry])),
        }
    }

    let mut results = Vec::new();
    let mut outcomes = Vec::new();

    for (path, entries) in by_file {
        let original = fs::read_to_string(&path).map_err(|source| ApplicationError::Io {
            path: path.clone(),
            source,
        })?;

        let mut code = original.clone();
        for entry in entries {
            let (new_code, result) = match entry {
                Entry::Clip(clip) => apply_clip(clipper, &path, &code, clip)?,
                Entry::Placeholder(placeholder) => {
                    apply_placeholder(clipper, &path, &code, placeholder)
                }
            };
            results.push((entry.id().to_string(), result));
            code = new_code;
        }

        let changed = code != original;
        if changed && !dry_run {
            atomic_write(&path, &code)?;
            tracing::info!(path = %path.display(), "updated file");
        }
        outcomes.push(ClipOutcome {
            file: path,
            original,
            updated: code,
            written: changed && !dry_run,
        });
    }

    Ok((results, outcomes))
}

fn apply_clip(
    clipper: &mut Clipper,
    path: &Path,
    code: &str,
    clip: &ClipDefinition,
) -> Result<(String, EntryResult), ApplicationError> {
    let selector = clip
        .selector()
        .map_err(|source| ApplicationError::UnknownSelector {
            id: clip.id.clone(),
            source,
        })?;

    let misses_before = clipper.missing_selections().len();
    let new_code = paste(clipper, path, code, selector, clip).map_err(|source| {
        ApplicationError::Clip {
            id: clip.id.clone(),
            source,
        }
    })?;

    let result = match clipper.missing_selections().get(misses_before) {
        Some(missing) => EntryResult::Missed {
            file: path.to_path_buf(),
            reason: missing.message(),
        },
        None => EntryResult::Applied {
            file: path.to_path_buf(),
        },
    };
    Ok((new_code, result))
}

fn paste(
    clipper: &mut Clipper,
    path: &Path,
    code: &str,
    selector: Selector,
    clip: &ClipDefinition,
) -> Result<String, ClipperError> {
    let snippet = clip.snippet.as_str();
    let options = &clip.options;
    match clip.mode {
        ClipMode::Raw => {
            clipper.paste_generated_code_snippet_at(path, code, selector, options, |data| {
                render_snippet(snippet, data)
            })
        }
        ClipMode::GoImport => clipper.paste_go_import_snippet_at(path, code, snippet),
        ClipMode::GoBeforeReturn => {
            clipper.paste_go_before_return_snippet_at(path, code, snippet, options)
        }
        ClipMode::GoReturningCallArgument => clipper
            .paste_go_returning_function_new_argument_snippet_at(path, code, snippet, options),
        ClipMode::GoReturningCompositeArgument => clipper
            .paste_go_returning_composite_new_argument_snippet_at(path, code, snippet, options),
        ClipMode::GoStructField => {
            clipper.paste_go_struct_field_snippet_at(path, code, snippet, options)
        }
        ClipMode::ProtoImport => clipper.paste_proto_import_snippet_at(path, code, snippet),
    }
}

/// Substitutes the next free field number into the snippet.
fn render_snippet(snippet: &str, data: &SelectionData) -> String {
    match data.highest_field_number() {
        Some(highest) => snippet.replace(NEXT_FIELD_NUMBER, &(highest + 1).to_string()),
        None => snippet.to_string(),
    }
}

fn apply_placeholder(
    clipper: &mut Clipper,
    path: &Path,
    code: &str,
    placeholder: &PlaceholderDefinition,
) -> (String, EntryResult) {
    let marker = placeholder.placeholder.as_str();
    let replacement = placeholder.replacement.as_str();

    if placeholder.strategy == ReplaceStrategy::Once && code.contains(replacement) {
        return (
            code.to_string(),
            EntryResult::AlreadyApplied {
                file: path.to_path_buf(),
            },
        );
    }

    let result = if code.contains(marker) {
        EntryResult::Applied {
            file: path.to_path_buf(),
        }
    } else {
        EntryResult::Missed {
            file: path.to_path_buf(),
            reason: format!("placeholder {marker:?} not found"),
        }
    };

    let new_code = match placeholder.strategy {
        ReplaceStrategy::First => clipper.replace(code, marker, replacement),
        ReplaceStrategy::Once => clipper.replace_once(code, marker, replacement),
        ReplaceStrategy::All => clipper.replace_all(code, marker, replacement),
    };
    (new_code, result)
}
