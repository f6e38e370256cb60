use std::path::{Path, PathBuf};

use crate::{
    batch::{BatchReport, Pipeline},
    build::{BuildDriver, SystemCommandRunner},
    git::CheckoutCache,
    resolver::CratesIoResolver,
};

mod builder;

pub use builder::DocsetsBuilder;

type DocsetPipeline = Pipeline<CratesIoResolver, CheckoutCache, BuildDriver<SystemCommandRunner>>;

/// Generates Dash docsets for crates published on crates.io.
///
/// Holds the lock on its checkout directory until dropped.
pub struct Docsets {
    pipeline: DocsetPipeline,
    source_dir: PathBuf,
}

impl Docsets {
    pub fn builder() -> DocsetsBuilder {
        DocsetsBuilder::default()
    }

    /// Generates a docset for every `name[@revision]` token, in order.
    ///
    /// Per-package failures are collected in the report; an error is only
    /// returned when the working directories cannot be created.
    pub fn generate<I>(&self, packages: I) -> anyhow::Result<BatchReport>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(self.pipeline.run_tokens(packages)?)
    }

    /// Directory holding the reusable checkouts.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }
}
