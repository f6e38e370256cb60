use log::{debug, trace};
use serde::Deserialize;
use thiserror::Error;

use super::RepositoryResolver;

pub const DEFAULT_REGISTRY_URL: &str = "https://crates.io/api/v1/crates";

/// crates.io asks API clients to identify themselves.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "cargo-docsets/",
    env!("CARGO_PKG_VERSION"),
    " (Dash docset generation)"
);

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry returned {status} for {package}")]
    Status { package: String, status: u16 },
    #[error("Registry request for {package} failed: {reason}")]
    Request { package: String, reason: String },
    #[error("Registry response for {package} could not be read: {reason}")]
    InvalidResponse { package: String, reason: String },
    #[error("No repository returned for {package}")]
    NoRepository { package: String },
}

/// Resolves repositories through the crates.io `GET /crates/<name>` endpoint.
pub struct CratesIoResolver {
    base_url: String,
    user_agent: String,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct CrateResponse {
    #[serde(rename = "crate")]
    krate: CrateMetadata,
}

#[derive(Deserialize)]
struct CrateMetadata {
    #[serde(default)]
    repository: Option<String>,
}

impl CratesIoResolver {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        CratesIoResolver {
            base_url: base_url.into(),
            user_agent: user_agent.into(),
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    fn crate_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), package)
    }
}

impl Default for CratesIoResolver {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL, DEFAULT_USER_AGENT)
    }
}

impl RepositoryResolver for CratesIoResolver {
    fn resolve(&self, package: &str) -> Result<String, RegistryError> {
        let url = self.crate_url(package);
        debug!("Looking up {} at {}", package, url);

        let response = self
            .agent
            .get(&url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|error| match error {
                ureq::Error::StatusCode(status) => RegistryError::Status {
                    package: package.to_owned(),
                    status,
                },
                other => RegistryError::Request {
                    package: package.to_owned(),
                    reason: other.to_string(),
                },
            })?;

        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| RegistryError::InvalidResponse {
                package: package.to_owned(),
                reason: e.to_string(),
            })?;
        trace!("Registry response for {}: {}", package, body);

        parse_repository(package, &body)
    }
}

/// Extracts `crate.repository` from a registry response body.
pub(crate) fn parse_repository(package: &str, body: &str) -> Result<String, RegistryError> {
    let response: CrateResponse =
        serde_json::from_str(body).map_err(|e| RegistryError::InvalidResponse {
            package: package.to_owned(),
            reason: e.to_string(),
        })?;

    match response.krate.repository {
        Some(repository) if !repository.trim().is_empty() => Ok(repository.trim().to_owned()),
        _ => Err(RegistryError::NoRepository {
            package: package.to_owned(),
        }),
    }
}
