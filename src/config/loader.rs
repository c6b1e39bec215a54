use crate::config::schema::{ClipPlan, PlanValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read clip plan from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse clip plan TOML{}: {source}", in_file(path))]
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    #[error("invalid clip plan{}: {source}", in_file(path))]
    Validation {
        path: Option<PathBuf>,
        source: PlanValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

fn in_file(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" ({})", path.display()))
        .unwrap_or_default()
}

pub fn load_from_str(input: &str) -> Result<ClipPlan, ConfigError> {
    let plan: ClipPlan = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    plan.validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(plan)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<ClipPlan, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let plan = load_from_str(&contents).map_err(|error| error.with_path(path))?;
    tracing::debug!(
        path = %path.display(),
        clips = plan.clips.len(),
        placeholders = plan.placeholders.len(),
        "loaded clip plan"
    );
    Ok(plan)
}
