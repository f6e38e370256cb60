use std::{
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Coarse classification of a failed package pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The package token could not be parsed.
    InvalidPackage,
    /// The registry lookup failed or returned no repository.
    Registry,
    /// The local checkout has uncommitted changes.
    DirtyWorkingTree,
    /// Cloning, fetching or checking out the repository failed.
    VersionControl,
    /// An external tool exited unsuccessfully or could not be started.
    Subprocess,
    /// A filesystem operation failed or a required path is missing.
    Filesystem,
}

#[derive(Error, Debug)]
#[error("Failed to {operation} {}: {source}", .path.display())]
pub struct FilesystemError {
    pub operation: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FilesystemError {
    pub fn new(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        FilesystemError {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn missing(operation: &'static str, path: &Path) -> Self {
        Self::new(operation, path, io::ErrorKind::NotFound.into())
    }
}

/// Creates `path` and its parents if they do not exist yet.
pub fn ensure_dir(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::new("create directory", path, e))
}
