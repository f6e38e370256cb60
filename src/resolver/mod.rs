mod crates_io;

pub use crates_io::{CratesIoResolver, RegistryError, DEFAULT_REGISTRY_URL, DEFAULT_USER_AGENT};

/// Looks up the source repository of a published package.
pub trait RepositoryResolver {
    fn resolve(&self, package: &str) -> Result<String, RegistryError>;
}

impl<R: RepositoryResolver + ?Sized> RepositoryResolver for &R {
    fn resolve(&self, package: &str) -> Result<String, RegistryError> {
        (**self).resolve(package)
    }
}
