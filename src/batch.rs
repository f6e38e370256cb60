use std::path::PathBuf;

use log::{debug, error, info};
use thiserror::Error;

use crate::{
    build::{BuildError, DocsetBuilder},
    error::{ensure_dir, ErrorKind, FilesystemError},
    git::{RepositorySynchronizer, SyncError},
    install::{InstallError, Installer},
    model::{package::PackageSpec, ParseError},
    resolver::{RegistryError, RepositoryResolver},
};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid package specification: {0}")]
    Parse(#[from] ParseError),
    #[error("Error while looking up the repository: {0}")]
    Registry(#[from] RegistryError),
    #[error("Error while synchronizing the checkout: {0}")]
    Sync(#[from] SyncError),
    #[error("Error while building the docset: {0}")]
    Build(#[from] BuildError),
    #[error("Error while installing the docset: {0}")]
    Install(#[from] InstallError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Parse(_) => ErrorKind::InvalidPackage,
            PipelineError::Registry(_) => ErrorKind::Registry,
            PipelineError::Sync(e) => e.kind(),
            PipelineError::Build(e) => e.kind(),
            PipelineError::Install(e) => e.kind(),
        }
    }
}

/// Result of one batch item.
#[derive(Debug)]
pub struct PackageOutcome {
    /// The package as requested, e.g. `bar@v1.2.0`.
    pub package: String,
    /// Where the docset was installed.
    pub result: Result<PathBuf, PipelineError>,
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<PackageOutcome>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &PackageOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.result.is_err())
    }
}

impl FromIterator<PackageOutcome> for BatchReport {
    fn from_iter<T: IntoIterator<Item = PackageOutcome>>(iter: T) -> Self {
        BatchReport {
            outcomes: iter.into_iter().collect(),
        }
    }
}

/// Resolve, synchronize, build and install, one package at a time.
pub struct Pipeline<R, S, B> {
    resolver: R,
    synchronizer: S,
    builder: B,
    installer: Installer,
}

impl<R, S, B> Pipeline<R, S, B>
where
    R: RepositoryResolver,
    S: RepositorySynchronizer,
    B: DocsetBuilder,
{
    pub fn new(resolver: R, synchronizer: S, builder: B, installer: Installer) -> Self {
        Pipeline {
            resolver,
            synchronizer,
            builder,
            installer,
        }
    }

    /// Runs every stage for a single package.
    pub fn run_one(&self, spec: &PackageSpec) -> Result<PathBuf, PipelineError> {
        let url = self.resolver.resolve(&spec.name)?;
        debug!("Resolved {} to {}", spec.name, url);

        let checkout = self.synchronizer.synchronize(&url, &spec.revision)?;
        let artifact = self.builder.build(&checkout, &spec.name)?;
        let installed = self.installer.install(artifact)?;

        Ok(installed)
    }

    /// Processes `specs` in order. A failing package is logged and recorded,
    /// and the batch moves on.
    pub fn run_all(&self, specs: &[PackageSpec]) -> Result<BatchReport, FilesystemError> {
        self.prepare()?;
        Ok(specs
            .iter()
            .map(|spec| {
                info!("Generating docs for {}", spec);
                record(spec.to_string(), self.run_one(spec))
            })
            .collect())
    }

    /// Like [`Pipeline::run_all`], parsing each `name[@revision]` token
    /// first. Tokens that do not parse are recorded as failures.
    pub fn run_tokens<I>(&self, tokens: I) -> Result<BatchReport, FilesystemError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.prepare()?;
        Ok(tokens
            .into_iter()
            .map(|token| {
                let token = token.as_ref();
                info!("Generating docs for {}", token);
                let result = token
                    .parse::<PackageSpec>()
                    .map_err(PipelineError::from)
                    .and_then(|spec| self.run_one(&spec));
                record(token.to_owned(), result)
            })
            .collect())
    }

    fn prepare(&self) -> Result<(), FilesystemError> {
        ensure_dir(self.installer.output_dir())?;
        ensure_dir(self.synchronizer.location())
    }
}

fn record(package: String, result: Result<PathBuf, PipelineError>) -> PackageOutcome {
    match &result {
        Ok(path) => info!("Finished {}: {}", package, path.display()),
        Err(e) => error!("Failed to generate docset for {} ({:?}): {}", package, e.kind(), e),
    }
    PackageOutcome { package, result }
}
