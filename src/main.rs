use std::{env, process::ExitCode};

use cargo_docsets::{
    cli::{args::CliArgs, cargo_subcommand_args},
    config::DocsetsConfig,
    Docsets,
};
use clap::Parser;
use log::error;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every package succeeded.
fn run() -> anyhow::Result<bool> {
    let cli_args = CliArgs::parse_from(cargo_subcommand_args(env::args_os()));
    let config = DocsetsConfig::load()?;

    let mut builder = Docsets::builder().tools(config.tools(Default::default()));
    if let Some(base_dir) = cli_args.base_dir.or(config.base_dir) {
        builder = builder.base_dir(base_dir);
    }
    if let Some(assets_dir) = cli_args.assets_dir.or(config.assets_dir) {
        builder = builder.assets_dir(assets_dir);
    }
    if let Some(target) = cli_args.target {
        builder = builder.target(target);
    }
    if let Some(url) = config.registry_url {
        builder = builder.registry_url(url);
    }
    if let Some(agent) = config.user_agent {
        builder = builder.user_agent(agent);
    }
    let docsets = builder.try_build()?;

    let report = docsets.generate(&cli_args.crates)?;
    Ok(report.is_success())
}
