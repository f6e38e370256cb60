pub mod batch;
pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod install;
pub mod model;
pub mod resolver;

mod api;
mod flock;

pub use api::{Docsets, DocsetsBuilder};
