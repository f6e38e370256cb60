use std::{env, path::PathBuf};

use anyhow::Context;
use log::debug;

use crate::{
    batch::Pipeline,
    build::{BuildDriver, SystemCommandRunner, Tools},
    config::program_dir,
    git::CheckoutCache,
    install::Installer,
    resolver::{CratesIoResolver, DEFAULT_REGISTRY_URL, DEFAULT_USER_AGENT},
    Docsets,
};

const SOURCE_DIR_NAME: &str = "crates";
const OUTPUT_DIR_NAME: &str = "docsets";
const ASSETS_DIR_NAME: &str = "assets";
const STAGING_DIR_NAME: &str = "cargo-docsets";

#[derive(Default)]
pub struct DocsetsBuilder {
    base_dir: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    target: Option<PathBuf>,
    registry_url: Option<String>,
    user_agent: Option<String>,
    tools: Option<Tools>,
}

impl DocsetsBuilder {
    /// Directory holding `crates/` and `docsets/`.
    ///
    /// Defaults to the directory of the running program, or to
    /// `<temp>/cargo-docsets` when a [target](Self::target) is set.
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(path.into());
        self
    }

    /// Directory containing `icon.png`.
    ///
    /// Defaults to `assets/` beside the running program.
    pub fn assets_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(path.into());
        self
    }

    /// Directory every finished docset is moved into, e.g. Dash's docset
    /// folder.
    pub fn target(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = Some(path.into());
        self
    }

    pub fn registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = Some(url.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn tools(mut self, tools: Tools) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn try_build(self) -> anyhow::Result<Docsets> {
        let Self {
            base_dir,
            assets_dir,
            target,
            registry_url,
            user_agent,
            tools,
        } = self;

        let base_dir = match (base_dir, &target) {
            (Some(base_dir), _) => base_dir,
            (None, Some(_)) => env::temp_dir().join(STAGING_DIR_NAME),
            (None, None) => program_dir().context("Could not locate the program directory")?,
        };
        let assets_dir = match assets_dir {
            Some(assets_dir) => assets_dir,
            None => program_dir()
                .context("Could not locate the program directory")?
                .join(ASSETS_DIR_NAME),
        };
        let source_dir = base_dir.join(SOURCE_DIR_NAME);
        let output_dir = base_dir.join(OUTPUT_DIR_NAME);
        debug!(
            "Checkouts in {}, docsets in {}, assets in {}",
            source_dir.display(),
            output_dir.display(),
            assets_dir.display()
        );

        let git_config = git2::Config::open_default()?;
        let cache = CheckoutCache::new(source_dir.clone(), git_config)?;

        let resolver = CratesIoResolver::new(
            registry_url.unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_owned()),
            user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
        );
        let builder = BuildDriver::new(SystemCommandRunner, tools.unwrap_or_default());
        let installer = Installer::new(output_dir, assets_dir, target);

        Ok(Docsets {
            pipeline: Pipeline::new(resolver, cache, builder, installer),
            source_dir,
        })
    }
}
