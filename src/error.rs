use crate::placeholder::MissingPlaceholdersError;
use crate::selection::Selector;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The supplied text is not valid in the selector's grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("failed to set language for parser")]
    LanguageSet,

    #[error("failed to parse {path}")]
    ParseFailed { path: PathBuf },

    #[error("{path}:{line}:{column}: {message}")]
    Syntax {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum ClipperError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("cannot find position for {selector} in {}", path.display())]
    NoPosition { selector: Selector, path: PathBuf },

    #[error("selected offset {offset} is not a valid position in {} (length {len})", path.display())]
    InvalidOffset {
        path: PathBuf,
        offset: usize,
        len: usize,
    },
}

/// Aggregate report of a clipper session: missing selections plus any
/// placeholder tracer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub(crate) missing_selections: Vec<String>,
    pub(crate) tracer_error: Option<MissingPlaceholdersError>,
}

impl ValidationError {
    /// One rendered line per missing selection, in call order.
    pub fn missing_selections(&self) -> &[String] {
        &self.missing_selections
    }

    pub fn tracer_error(&self) -> Option<&MissingPlaceholdersError> {
        self.tracer_error.as_ref()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tracer_error) = &self.tracer_error {
            write!(f, "{tracer_error}\n\n")?;
        }

        if !self.missing_selections.is_empty() {
            write!(
                f,
                "code in improper structure:\n{}",
                self.missing_selections.join("\n")
            )?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.tracer_error
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
