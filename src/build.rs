use std::{
    fmt::Display,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use log::{debug, info, trace};
use thiserror::Error;

use crate::{
    error::{ErrorKind, FilesystemError},
    model::package::{bundle_name, doc_name},
};

#[cfg(test)]
use mockall::automock;

/// Intermediate workspace the converter writes into.
const CONVERSION_DIR: &str = "docset";
/// Lines of stderr kept in a [`BuildError::Subprocess`].
const STDERR_TAIL_LINES: usize = 20;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("`{command}` exited with {}{}", exit_description(.code), stderr_suffix(.stderr))]
    Subprocess {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("Could not start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Subprocess { .. } | BuildError::Spawn { .. } => ErrorKind::Subprocess,
            BuildError::Filesystem(_) => ErrorKind::Filesystem,
        }
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by a signal)".to_owned(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

/// A program, its arguments and the directory to run it in. Never passed
/// through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I, current_dir: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            program: program.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
            current_dir: current_dir.to_path_buf(),
        }
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Outcome of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Completion {
    pub fn success() -> Self {
        Completion {
            code: Some(0),
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external programs to completion.
#[cfg_attr(test, automock)]
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<Completion>;
}

/// Runs programs on the host, capturing their output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<Completion> {
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.current_dir)
            .stdin(Stdio::null())
            .output()?;
        Ok(Completion {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Program names for the three build steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    /// Documentation compiler, run as `<cargo> doc`.
    pub cargo: String,
    /// Converts rustdoc output into a dashing workspace.
    pub converter: String,
    /// Assembles the workspace into a `.docset` bundle.
    pub assembler: String,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            cargo: "cargo".to_owned(),
            converter: "rsdocs-dashing".to_owned(),
            assembler: "dashing".to_owned(),
        }
    }
}

/// A freshly assembled bundle that has not been installed yet.
#[derive(Debug, PartialEq, Eq)]
pub struct DocsetArtifact {
    pub path: PathBuf,
    pub package_name: String,
}

impl DocsetArtifact {
    /// Directory name of the bundle, e.g. `serde_json.docset`.
    pub fn bundle_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

/// Turns a synchronized checkout into a docset bundle.
pub trait DocsetBuilder {
    fn build(&self, checkout: &Path, package: &str) -> Result<DocsetArtifact, BuildError>;
}

impl<B: DocsetBuilder + ?Sized> DocsetBuilder for &B {
    fn build(&self, checkout: &Path, package: &str) -> Result<DocsetArtifact, BuildError> {
        (**self).build(checkout, package)
    }
}

/// Drives `cargo doc`, the converter and the assembler inside a checkout.
pub struct BuildDriver<C> {
    runner: C,
    tools: Tools,
}

impl<C: CommandRunner> BuildDriver<C> {
    pub fn new(runner: C, tools: Tools) -> Self {
        BuildDriver { runner, tools }
    }

    fn run(&self, invocation: Invocation) -> Result<(), BuildError> {
        info!("Running `{}` in {}", invocation, invocation.current_dir.display());
        let completion = self
            .runner
            .run(&invocation)
            .map_err(|source| BuildError::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        for line in completion.stdout.lines() {
            debug!("{}: {}", invocation.program, line);
        }
        for line in completion.stderr.lines() {
            trace!("{}: {}", invocation.program, line);
        }

        if completion.is_success() {
            Ok(())
        } else {
            Err(BuildError::Subprocess {
                command: invocation.to_string(),
                code: completion.code,
                stderr: tail(&completion.stderr, STDERR_TAIL_LINES),
            })
        }
    }
}

impl<C: CommandRunner> DocsetBuilder for BuildDriver<C> {
    fn build(&self, checkout: &Path, package: &str) -> Result<DocsetArtifact, BuildError> {
        if !checkout.is_dir() {
            return Err(FilesystemError::missing("build in", checkout).into());
        }
        let doc_name = doc_name(package);

        self.run(Invocation::new(&self.tools.cargo, ["doc"], checkout))?;

        // Leftovers from an earlier revision must not leak into this bundle.
        remove_dir_if_exists(&checkout.join(CONVERSION_DIR))?;
        let bundle = checkout.join(bundle_name(package));
        remove_dir_if_exists(&bundle)?;

        self.run(Invocation::new(
            &self.tools.converter,
            [format!("target/doc/{doc_name}"), CONVERSION_DIR.to_owned()],
            checkout,
        ))?;
        self.run(Invocation::new(
            &self.tools.assembler,
            [
                "build".to_owned(),
                "--config".to_owned(),
                format!("{CONVERSION_DIR}/dashing.json"),
                "--source".to_owned(),
                format!("{CONVERSION_DIR}/build"),
            ],
            checkout,
        ))?;

        if !bundle.is_dir() {
            return Err(FilesystemError::missing("find assembled docset", &bundle).into());
        }

        Ok(DocsetArtifact {
            path: bundle,
            package_name: package.to_owned(),
        })
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<(), FilesystemError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(FilesystemError::new("remove", path, error)),
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.trim_end().lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
