use thiserror::Error;

pub mod package;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Package specification is empty")]
    Empty,
    #[error("Missing revision after `@` in `{0}`")]
    EmptyRevision(String),
    #[error("Invalid package name `{0}`")]
    InvalidName(String),
}
