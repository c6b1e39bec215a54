use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Path has no parent directory: {0}")]
    NoParent(PathBuf),

    #[error("File I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WriteError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full content lands or the file is left untouched.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), WriteError> {
    // Same directory, so the rename stays on one filesystem.
    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(WriteError::NoParent(path.to_path_buf())),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| WriteError::io(path, e))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| WriteError::io(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| WriteError::io(path, e))?;

    // Keep the original permissions.
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .map_err(|e| WriteError::io(path, e))?;
    }

    temp.persist(path).map_err(|e| WriteError::io(path, e.error))?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("genesis.go");
        fs::write(&file_path, "package mars\n").unwrap();

        atomic_write(&file_path, "package mars\n\nimport \"fmt\"\n").unwrap();

        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            "package mars\n\nimport \"fmt\"\n"
        );
    }

    #[test]
    fn creates_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("new.proto");

        atomic_write(&file_path, "syntax = \"proto3\";\n").unwrap();
        assert!(file_path.exists());
    }

    #[test]
    fn missing_directory_is_io_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("nope").join("a.go");

        let err = atomic_write(&file_path, "").unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
    }
}
