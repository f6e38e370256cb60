use std::path::{Path, PathBuf};

use git2::{
    build::RepoBuilder, AutotagOption, Config, Cred, CredentialType, FetchOptions,
    RemoteCallbacks, Repository,
};
use log::{info, trace};

use crate::{
    error::{ensure_dir, FilesystemError},
    flock::FileLock,
    git::{git_error, repository::Checkout, RepositorySynchronizer, SyncError},
    model::package::Revision,
};

const LOCK_FILE_NAME: &str = ".lock";

/// Directory of reusable working copies, one per repository.
///
/// Holds an exclusive lock on the directory for as long as it lives.
pub struct CheckoutCache {
    location: PathBuf,
    git_config: Config,
    _lock: FileLock,
}

impl CheckoutCache {
    pub fn new(location: PathBuf, git_config: Config) -> Result<CheckoutCache, SyncError> {
        if location.exists() && !location.is_dir() {
            return Err(FilesystemError::new(
                "use as checkout directory",
                &location,
                std::io::ErrorKind::NotADirectory.into(),
            )
            .into());
        }
        ensure_dir(&location)?;

        let lock = FileLock::new(&location.join(LOCK_FILE_NAME))?;

        Ok(CheckoutCache {
            location,
            git_config,
            _lock: lock,
        })
    }

    /// Directory `url` is checked out into.
    pub fn checkout_path(&self, url: &str) -> Result<PathBuf, SyncError> {
        checkout_dir_name(url)
            .map(|name| self.location.join(name))
            .ok_or_else(|| SyncError::InvalidUrl {
                url: url.to_owned(),
            })
    }

    fn clone_checkout(&self, path: &Path, url: &str) -> Result<Checkout<'_>, SyncError> {
        info!("Cloning {} into {}", url, path.display());

        let repo = RepoBuilder::new()
            .fetch_options(self.fetch_options())
            .clone(url, path)
            .map_err(git_error("clone", path))?;

        if !path.is_dir() {
            return Err(FilesystemError::missing("open checkout", path).into());
        }

        Ok(Checkout::new(self, repo, path.to_path_buf()))
    }

    fn open_checkout(&self, path: &Path, url: &str) -> Result<Checkout<'_>, SyncError> {
        trace!("Opening existing checkout at {}", path.display());

        let repo = Repository::open(path).map_err(git_error("open", path))?;

        let existing = repo
            .find_remote("origin")
            .map_err(git_error("open", path))?
            .url()
            .map(str::to_owned)
            .unwrap_or_default();
        if !same_remote(&existing, url) {
            return Err(SyncError::PathCollision {
                path: path.to_path_buf(),
                existing,
                requested: url.to_owned(),
            });
        }

        Ok(Checkout::new(self, repo, path.to_path_buf()))
    }

    pub(super) fn remote_callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed_types| {
            trace!(
                "Requested credentials for {}, username {:?}, allowed types {:?}",
                url,
                username,
                allowed_types
            );
            if allowed_types.contains(CredentialType::USERNAME) {
                return Cred::username(username.unwrap_or("git"));
            }
            if allowed_types.contains(CredentialType::SSH_KEY) {
                return Cred::ssh_key_from_agent(username.unwrap_or("git"));
            }
            if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                return Cred::credential_helper(&self.git_config, url, username);
            }
            if allowed_types.contains(CredentialType::DEFAULT) {
                return Cred::default();
            }
            Err(git2::Error::from_str("no valid authentication available"))
        });
        callbacks
    }

    pub(super) fn fetch_options(&self) -> FetchOptions<'_> {
        let mut fetch_options = FetchOptions::new();
        fetch_options
            .remote_callbacks(self.remote_callbacks())
            .download_tags(AutotagOption::All);
        fetch_options
    }
}

impl RepositorySynchronizer for CheckoutCache {
    fn location(&self) -> &Path {
        &self.location
    }

    fn synchronize(&self, url: &str, revision: &Revision) -> Result<PathBuf, SyncError> {
        let path = self.checkout_path(url)?;

        let checkout = if path.exists() {
            self.open_checkout(&path, url)?
        } else {
            self.clone_checkout(&path, url)?
        };

        if checkout.is_dirty()? {
            return Err(SyncError::DirtyWorkingTree { path });
        }

        checkout.fetch()?;
        let commit = checkout.checkout(revision)?;
        info!("Updated {} to {} ({})", path.display(), revision, commit);

        Ok(path)
    }
}

/// Maps a repository url to the name of its checkout directory: the last
/// path segment, without a trailing `/` or `.git`.
///
/// Two repositories sharing that segment map to the same directory; the
/// cache refuses to reuse a checkout whose `origin` is a different url.
pub fn checkout_dir_name(url: &str) -> Option<&str> {
    let trimmed = url.trim().trim_end_matches('/');
    let segment = trimmed.rsplit(['/', ':']).next()?;
    let name = segment.strip_suffix(".git").unwrap_or(segment);
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

fn same_remote(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/') == b.trim().trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn checkout_dir_names() {
        let cases = [
            ("https://github.com/serde-rs/serde", Some("serde")),
            ("https://github.com/serde-rs/serde/", Some("serde")),
            ("https://github.com/serde-rs/serde.git", Some("serde")),
            ("git@github.com:rust-lang/regex.git", Some("regex")),
            ("/srv/git/local-repo", Some("local-repo")),
            ("https://gitlab.com/group/sub/project", Some("project")),
            ("https://example.com/", Some("example.com")),
            ("", None),
            ("https://example.com/..", None),
            (".git", None),
        ];
        for (url, expected) in cases {
            assert_eq!(checkout_dir_name(url), expected, "url: {url}");
        }
    }

    #[test]
    fn same_url_maps_to_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CheckoutCache::new(dir.path().join("crates"), Config::new().unwrap()).unwrap();
        let first = cache.checkout_path("https://github.com/org/foo").unwrap();
        let second = cache.checkout_path("https://github.com/org/foo").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, dir.path().join("crates").join("foo"));
    }

    #[test]
    fn invalid_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CheckoutCache::new(dir.path().to_path_buf(), Config::new().unwrap()).unwrap();
        assert!(matches!(
            cache.checkout_path("   "),
            Err(SyncError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn location_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("crates");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(
            CheckoutCache::new(file, Config::new().unwrap()),
            Err(SyncError::Filesystem(_))
        ));
    }
}
