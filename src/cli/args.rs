use std::path::PathBuf;

use clap::Parser;

/// Generates Dash docsets from the sources of crates published on crates.io.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    /// Crates to document, as `name` or `name@revision`.
    #[clap(required = true, value_name = "CRATE")]
    pub crates: Vec<String>,
    /// Move finished docsets into this directory. Checkouts and builds are
    /// staged under the system temporary directory.
    #[clap(short, long, env = "DOCSETS_TARGET")]
    pub target: Option<PathBuf>,
    /// Directory holding `crates/` and `docsets/`.
    #[clap(long)]
    pub base_dir: Option<PathBuf>,
    /// Directory containing `icon.png`.
    #[clap(long)]
    pub assets_dir: Option<PathBuf>,
}
