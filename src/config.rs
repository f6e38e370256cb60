use std::{
    collections::HashMap,
    env, io,
    path::{Path, PathBuf},
};

use config::{Config, ConfigError, Environment, File};
use log::debug;
use serde::Deserialize;

use crate::build::Tools;

pub const CONFIG_FILE_NAME: &str = "docsets.toml";

/// Settings read from `docsets.toml` and `DOCSETS_*` environment variables.
/// Anything left unset falls back to the builder defaults.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DocsetsConfig {
    pub registry_url: Option<String>,
    pub user_agent: Option<String>,
    pub cargo: Option<String>,
    pub converter: Option<String>,
    pub assembler: Option<String>,
    pub base_dir: Option<PathBuf>,
    pub assets_dir: Option<PathBuf>,
}

impl DocsetsConfig {
    /// Loads `docsets.toml` from beside the running program, if present,
    /// overlaid with the process environment.
    pub fn load() -> anyhow::Result<Self> {
        let file = program_dir()?.join(CONFIG_FILE_NAME);
        debug!("Reading configuration from {}", file.display());
        let raw_config = RawConfig::load(Some(&file), None)?;
        Ok(raw_config.into())
    }

    /// Tool names with unset entries taken from `defaults`.
    pub fn tools(&self, defaults: Tools) -> Tools {
        Tools {
            cargo: self.cargo.clone().unwrap_or(defaults.cargo),
            converter: self.converter.clone().unwrap_or(defaults.converter),
            assembler: self.assembler.clone().unwrap_or(defaults.assembler),
        }
    }
}

impl From<RawConfig> for DocsetsConfig {
    fn from(raw: RawConfig) -> Self {
        DocsetsConfig {
            registry_url: raw.registry.url,
            user_agent: raw.registry.agent,
            cargo: raw.tools.cargo,
            converter: raw.tools.converter,
            assembler: raw.tools.assembler,
            base_dir: raw.base.dir,
            assets_dir: raw.assets.dir,
        }
    }
}

/// Directory containing the running executable.
pub fn program_dir() -> io::Result<PathBuf> {
    let exe = env::current_exe()?;
    exe.parent().map(Path::to_path_buf).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} has no parent directory", exe.display()),
        )
    })
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    registry: RegistryConfig,
    #[serde(default)]
    tools: ToolsConfig,
    #[serde(default)]
    base: DirConfig,
    #[serde(default)]
    assets: DirConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RegistryConfig {
    url: Option<String>,
    agent: Option<String>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct ToolsConfig {
    cargo: Option<String>,
    converter: Option<String>,
    assembler: Option<String>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct DirConfig {
    dir: Option<PathBuf>,
}

impl RawConfig {
    fn load(file: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(false));
        }
        builder
            .add_source(Environment::with_prefix("DOCSETS").separator("_").source(env))
            .build()?
            .try_deserialize()
    }
}
