use std::{
    fs::File,
    path::{Path, PathBuf},
};

use fs4::fs_std::FileExt;
use log::{debug, info};
use thiserror::Error;

/// Exclusive advisory lock, released when dropped.
pub struct FileLock {
    _file: File,
}

#[derive(Error, Debug)]
#[error("Cannot lock {}: {source}", .path.display())]
pub struct Error {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

impl FileLock {
    /// Blocks until no other process holds the lock on `path`.
    pub fn new(path: &Path) -> Result<Self, Error> {
        let io_error = |source| Error {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_error)?;
        debug!("Waiting for an exclusive lock on {}", path.display());
        file.lock_exclusive().map_err(io_error)?;
        info!("Acquired a lock on {}", path.display());
        Ok(Self { _file: file })
    }
}
