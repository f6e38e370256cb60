use std::path::{Path, PathBuf};

use git2::{build::CheckoutBuilder, Direction, Oid, Remote, Repository, Status, StatusOptions};
use log::{debug, trace, warn};

use crate::{
    git::{cache::CheckoutCache, git_error, SyncError},
    model::package::Revision,
};

/// Symbolic ref pointing at the remote's default branch.
pub const ORIGIN_HEAD: &str = "refs/remotes/origin/HEAD";

/// A working copy inside a [`CheckoutCache`].
pub struct Checkout<'a> {
    cache: &'a CheckoutCache,
    repo: Repository,
    path: PathBuf,
}

impl<'a> Checkout<'a> {
    pub fn new(cache: &'a CheckoutCache, repo: Repository, path: PathBuf) -> Checkout<'a> {
        Checkout { cache, repo, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when a tracked file differs from `HEAD`, staged or not.
    /// Untracked and ignored files do not count.
    pub fn is_dirty(&self) -> Result<bool, SyncError> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = self
            .repo
            .statuses(Some(&mut options))
            .map_err(git_error("status", &self.path))?;

        let dirty = statuses
            .iter()
            .filter(|entry| entry.status() != Status::CURRENT)
            .inspect(|entry| trace!("Modified: {:?} {:?}", entry.path(), entry.status()))
            .count();
        Ok(dirty > 0)
    }

    /// Fetches branches and tags from `origin` and records its default branch.
    pub fn fetch(&self) -> Result<(), SyncError> {
        let mut remote = self
            .repo
            .find_remote("origin")
            .map_err(git_error("fetch", &self.path))?;
        let refspecs: Vec<String> = remote
            .refspecs()
            .filter_map(|refspec| refspec.str().map(|s| s.to_string()))
            .collect();

        debug!("Fetching {:?} into {}", refspecs, self.path.display());
        remote
            .fetch(&refspecs, Some(&mut self.cache.fetch_options()), None)
            .map_err(git_error("fetch", &self.path))?;

        self.update_default_branch(&mut remote)
    }

    fn update_default_branch(&self, remote: &mut Remote<'_>) -> Result<(), SyncError> {
        let default_branch = {
            let connection = match remote.connect_auth(
                Direction::Fetch,
                Some(self.cache.remote_callbacks()),
                None,
            ) {
                Ok(connection) => connection,
                Err(error) => {
                    warn!(
                        "Could not ask origin of {} for its default branch: {}",
                        self.path.display(),
                        error
                    );
                    return Ok(());
                }
            };
            match connection.default_branch() {
                Ok(buf) => buf.as_str().map(str::to_owned),
                Err(error) => {
                    warn!(
                        "Origin of {} did not advertise a default branch: {}",
                        self.path.display(),
                        error
                    );
                    None
                }
            }
        };

        let Some(default_branch) = default_branch else {
            return Ok(());
        };
        let branch = default_branch
            .strip_prefix("refs/heads/")
            .unwrap_or(&default_branch);
        let target = format!("refs/remotes/origin/{branch}");
        trace!("Pointing {} at {}", ORIGIN_HEAD, target);

        self.repo
            .reference_symbolic(ORIGIN_HEAD, &target, true, "cargo-docsets: default branch")
            .map_err(git_error("fetch", &self.path))?;
        Ok(())
    }

    /// Commit `revision` points at. Branch names prefer the freshly fetched
    /// `origin/<branch>` over a possibly stale local branch.
    pub fn resolve(&self, revision: &Revision) -> Result<Oid, SyncError> {
        let candidates = match revision {
            Revision::DefaultBranch => vec![ORIGIN_HEAD.to_owned()],
            Revision::Named(name) => vec![format!("refs/remotes/origin/{name}"), name.clone()],
        };

        for candidate in &candidates {
            match self
                .repo
                .revparse_single(candidate)
                .and_then(|object| object.peel_to_commit())
            {
                Ok(commit) => return Ok(commit.id()),
                Err(error) => trace!("{} does not resolve: {}", candidate, error),
            }
        }

        Err(SyncError::RevisionNotFound {
            revision: revision.to_string(),
            path: self.path.clone(),
        })
    }

    /// Detaches `HEAD` at `revision` and updates the working tree to match.
    /// Fails rather than overwrite an untracked file the revision tracks.
    pub fn checkout(&self, revision: &Revision) -> Result<Oid, SyncError> {
        let oid = self.resolve(revision)?;
        let commit = self
            .repo
            .find_commit(oid)
            .map_err(git_error("checkout", &self.path))?;

        self.repo
            .checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().safe()))
            .map_err(git_error("checkout", &self.path))?;
        self.repo
            .set_head_detached(oid)
            .map_err(git_error("checkout", &self.path))?;

        Ok(oid)
    }
}
