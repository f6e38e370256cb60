//! Moves assembled docsets into their output directories.
//!
//! Installing never merges: whatever bundle of the same name already sits at
//! a destination is removed before the new one is moved in.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;

use crate::{
    build::DocsetArtifact,
    error::{ErrorKind, FilesystemError},
    model::package::DOCSET_EXTENSION,
};

pub const ICON_FILE_NAME: &str = "icon.png";

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("{} is not a .docset bundle", .path.display())]
    NotADocset { path: PathBuf },
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

impl InstallError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Filesystem
    }
}

pub struct Installer {
    output_dir: PathBuf,
    assets_dir: PathBuf,
    final_dir: Option<PathBuf>,
}

impl Installer {
    pub fn new(output_dir: PathBuf, assets_dir: PathBuf, final_dir: Option<PathBuf>) -> Self {
        Installer {
            output_dir,
            assets_dir,
            final_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Moves `artifact` into the output directory, adds the icon, and
    /// relocates it to the final directory when one is configured.
    /// Returns where the bundle ended up.
    pub fn install(&self, artifact: DocsetArtifact) -> Result<PathBuf, InstallError> {
        let suffix = format!(".{DOCSET_EXTENSION}");
        let Some(bundle_name) = artifact
            .bundle_name()
            .filter(|name| name.ends_with(&suffix))
            .map(str::to_owned)
        else {
            return Err(InstallError::NotADocset {
                path: artifact.path,
            });
        };

        let staged = self.output_dir.join(&bundle_name);
        replace_with(&artifact.path, &staged)?;

        let icon = self.assets_dir.join(ICON_FILE_NAME);
        fs::copy(&icon, staged.join(ICON_FILE_NAME))
            .map_err(|e| FilesystemError::new("copy icon", &icon, e))?;
        info!("Updated {} docset at {}", artifact.package_name, staged.display());

        match &self.final_dir {
            None => Ok(staged),
            Some(final_dir) if same_dir(&self.output_dir, final_dir) => {
                debug!("{} is already the final directory", final_dir.display());
                Ok(staged)
            }
            Some(final_dir) => {
                let installed = final_dir.join(&bundle_name);
                replace_with(&staged, &installed)?;
                info!("Installed {} to {}", staged.display(), installed.display());
                Ok(installed)
            }
        }
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Removes whatever is at `destination`, then moves `source` there.
fn replace_with(source: &Path, destination: &Path) -> Result<(), FilesystemError> {
    match fs::symlink_metadata(destination) {
        Ok(metadata) => {
            debug!("Removing previous {}", destination.display());
            let removed = if metadata.is_dir() {
                fs::remove_dir_all(destination)
            } else {
                fs::remove_file(destination)
            };
            removed.map_err(|e| FilesystemError::new("remove", destination, e))?;
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(FilesystemError::new("inspect", destination, error)),
    }
    move_dir(source, destination)
}

/// `rename`, falling back to copy-then-delete across filesystems.
fn move_dir(source: &Path, destination: &Path) -> Result<(), FilesystemError> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
            debug!(
                "{} and {} are on different filesystems, copying",
                source.display(),
                destination.display()
            );
            copy_dir(source, destination)?;
            fs::remove_dir_all(source).map_err(|e| FilesystemError::new("remove", source, e))
        }
        Err(error) => Err(FilesystemError::new("move", source, error)),
    }
}

fn copy_dir(source: &Path, destination: &Path) -> Result<(), FilesystemError> {
    fs::create_dir(destination).map_err(|e| FilesystemError::new("create", destination, e))?;
    let entries = fs::read_dir(source).map_err(|e| FilesystemError::new("read", source, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| FilesystemError::new("read", source, e))?;
        let from = entry.path();
        let to = destination.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|e| FilesystemError::new("inspect", &from, e))?;
        if file_type.is_symlink() {
            copy_symlink(&from, &to)?;
        } else if file_type.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| FilesystemError::new("copy", &from, e))?;
        }
    }
    Ok(())
}

/// Recreates the link itself rather than what it points at.
fn copy_symlink(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    let target = fs::read_link(from).map_err(|e| FilesystemError::new("read link", from, e))?;
    symlink(&target, to).map_err(|e| FilesystemError::new("create link", to, e))
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    let resolved = link.parent().map_or_else(|| target.to_path_buf(), |dir| dir.join(target));
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct Layout {
        root: TempDir,
    }

    impl Layout {
        fn new() -> Layout {
            let root = tempfile::tempdir().unwrap();
            fs::create_dir_all(root.path().join("docsets")).unwrap();
            fs::create_dir_all(root.path().join("assets")).unwrap();
            fs::write(root.path().join("assets").join(ICON_FILE_NAME), b"\x89PNG").unwrap();
            Layout { root }
        }

        fn path(&self, relative: &str) -> PathBuf {
            self.root.path().join(relative)
        }

        fn installer(&self, final_dir: Option<PathBuf>) -> Installer {
            Installer::new(self.path("docsets"), self.path("assets"), final_dir)
        }

        fn artifact(&self, package: &str, files: &[&str]) -> DocsetArtifact {
            let path = self.path(&format!("crates/{package}/{package}.docset"));
            fs::create_dir_all(&path).unwrap();
            for file in files {
                fs::write(path.join(file), *file).unwrap();
            }
            DocsetArtifact {
                path,
                package_name: package.to_owned(),
            }
        }
    }

    #[test]
    fn install_moves_bundle_and_adds_icon() {
        let layout = Layout::new();
        let artifact = layout.artifact("foo", &["index.html"]);
        let built = artifact.path.clone();

        let installed = layout.installer(None).install(artifact).unwrap();

        assert_eq!(installed, layout.path("docsets/foo.docset"));
        assert!(installed.join("index.html").is_file());
        assert_eq!(fs::read(installed.join(ICON_FILE_NAME)).unwrap(), b"\x89PNG");
        assert!(!built.exists());
    }

    #[test]
    fn install_replaces_previous_bundle() {
        let layout = Layout::new();
        let installer = layout.installer(None);
        installer
            .install(layout.artifact("foo", &["old-only.html", "shared.html"]))
            .unwrap();

        let installed = installer
            .install(layout.artifact("foo", &["shared.html", "new.html"]))
            .unwrap();

        assert!(!installed.join("old-only.html").exists());
        assert!(installed.join("shared.html").is_file());
        assert!(installed.join("new.html").is_file());
        assert!(installed.join(ICON_FILE_NAME).is_file());
    }

    #[test]
    fn install_relocates_to_final_dir() {
        let layout = Layout::new();
        fs::create_dir_all(layout.path("dash")).unwrap();
        fs::create_dir_all(layout.path("dash/foo.docset/stale")).unwrap();
        let installer = layout.installer(Some(layout.path("dash")));

        let installed = installer.install(layout.artifact("foo", &["index.html"])).unwrap();

        assert_eq!(installed, layout.path("dash/foo.docset"));
        assert!(installed.join("index.html").is_file());
        assert!(installed.join(ICON_FILE_NAME).is_file());
        assert!(!installed.join("stale").exists());
        assert!(!layout.path("docsets/foo.docset").exists());
    }

    #[test]
    fn final_dir_equal_to_output_dir_keeps_the_bundle() {
        let layout = Layout::new();
        let installer = layout.installer(Some(layout.path("docsets/../docsets")));
        installer.install(layout.artifact("foo", &["old.html"])).unwrap();

        let installed = installer.install(layout.artifact("foo", &["new.html"])).unwrap();

        assert_eq!(installed, layout.path("docsets/foo.docset"));
        assert!(installed.join("new.html").is_file());
        assert!(!installed.join("old.html").exists());
        assert!(installed.join(ICON_FILE_NAME).is_file());
    }

    #[test]
    fn missing_icon_is_a_filesystem_error() {
        let layout = Layout::new();
        fs::remove_file(layout.path("assets").join(ICON_FILE_NAME)).unwrap();

        let error = layout
            .installer(None)
            .install(layout.artifact("foo", &[]))
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Filesystem);
        assert!(error.to_string().contains("copy icon"));
    }

    #[test]
    fn missing_final_dir_is_a_filesystem_error() {
        let layout = Layout::new();
        let installer = layout.installer(Some(layout.path("absent")));

        let error = installer.install(layout.artifact("foo", &[])).unwrap_err();

        assert!(matches!(error, InstallError::Filesystem(_)));
    }

    #[test]
    fn refuses_non_docset_artifacts() {
        let layout = Layout::new();
        let path = layout.path("crates/foo/foo.bundle");
        fs::create_dir_all(&path).unwrap();
        let artifact = DocsetArtifact {
            path,
            package_name: "foo".to_owned(),
        };

        let error = layout.installer(None).install(artifact).unwrap_err();

        assert!(matches!(error, InstallError::NotADocset { .. }));
    }

    #[test]
    fn copy_dir_copies_nested_tree() {
        let layout = Layout::new();
        let source = layout.path("src-tree");
        fs::create_dir_all(source.join("Contents/Resources")).unwrap();
        fs::write(source.join("Contents/Info.plist"), "plist").unwrap();
        fs::write(source.join("Contents/Resources/docSet.dsidx"), "index").unwrap();

        copy_dir(&source, &layout.path("copy")).unwrap();

        assert_eq!(
            fs::read_to_string(layout.path("copy/Contents/Resources/docSet.dsidx")).unwrap(),
            "index"
        );
        assert!(source.exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_dir_keeps_symlinks() {
        let layout = Layout::new();
        let source = layout.path("src-tree");
        fs::create_dir_all(source.join("Contents/Resources/Documents")).unwrap();
        fs::write(source.join("Contents/Resources/Documents/index.html"), "index").unwrap();
        std::os::unix::fs::symlink("Resources/Documents", source.join("Contents/Docs")).unwrap();
        std::os::unix::fs::symlink("Docs/index.html", source.join("Contents/start.html")).unwrap();

        copy_dir(&source, &layout.path("copy")).unwrap();

        let copied = layout.path("copy/Contents");
        assert_eq!(
            fs::read_link(copied.join("Docs")).unwrap(),
            PathBuf::from("Resources/Documents")
        );
        assert_eq!(
            fs::read_link(copied.join("start.html")).unwrap(),
            PathBuf::from("Docs/index.html")
        );
        assert_eq!(fs::read_to_string(copied.join("start.html")).unwrap(), "index");
    }
}
