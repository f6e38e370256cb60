pub mod cache;
pub mod repository;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    error::{ErrorKind, FilesystemError},
    model::package::Revision,
};

pub use cache::{checkout_dir_name, CheckoutCache};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Checkout {} has a dirty working directory, will not update", .path.display())]
    DirtyWorkingTree { path: PathBuf },
    #[error("Git {operation} failed in {}: {source}", .path.display())]
    Git {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: git2::Error,
    },
    #[error("Cannot derive a checkout directory from repository url `{url}`")]
    InvalidUrl { url: String },
    #[error("Checkout {} belongs to {existing}, refusing to reuse it for {requested}", .path.display())]
    PathCollision {
        path: PathBuf,
        existing: String,
        requested: String,
    },
    #[error("Revision {revision} was not found in {}", .path.display())]
    RevisionNotFound { revision: String, path: PathBuf },
    #[error("Checkout lock cannot be acquired: {0}")]
    Lock(#[from] crate::flock::Error),
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::DirtyWorkingTree { .. } => ErrorKind::DirtyWorkingTree,
            SyncError::Lock(_) | SyncError::Filesystem(_) => ErrorKind::Filesystem,
            SyncError::Git { .. }
            | SyncError::InvalidUrl { .. }
            | SyncError::PathCollision { .. }
            | SyncError::RevisionNotFound { .. } => ErrorKind::VersionControl,
        }
    }
}

/// Wraps a libgit2 failure with the operation and checkout it happened in.
pub(crate) fn git_error<'a>(
    operation: &'static str,
    path: &'a Path,
) -> impl FnOnce(git2::Error) -> SyncError + 'a {
    move |source| SyncError::Git {
        operation,
        path: path.to_path_buf(),
        source,
    }
}

/// Keeps local working copies of package repositories up to date.
pub trait RepositorySynchronizer {
    /// Directory holding every checkout.
    fn location(&self) -> &Path;

    /// Clones `url` if needed, refuses dirty checkouts, then fetches and
    /// checks out `revision`. Returns the checkout directory.
    fn synchronize(&self, url: &str, revision: &Revision) -> Result<PathBuf, SyncError>;
}

impl<S: RepositorySynchronizer + ?Sized> RepositorySynchronizer for &S {
    fn location(&self) -> &Path {
        (**self).location()
    }

    fn synchronize(&self, url: &str, revision: &Revision) -> Result<PathBuf, SyncError> {
        (**self).synchronize(url, revision)
    }
}
