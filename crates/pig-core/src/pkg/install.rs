//! Package-installation primitive.
//!
//! [`TarballInstaller`] fetches the version's tarball from the registry,
//! extracts it into the cache entry and links `{store}/{name}` to it.

use super::error::PkgError;
use super::link::link_into_store;
use super::registry::{get_tarball_url, RegistryClient};
use super::tarball::{download_tarball, extract_tgz_atomic, MAX_TARBALL_SIZE};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// One `(name, version)` to materialize in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Install root (`targetPath`).
    pub root: PathBuf,
    /// Store directory holding cache entries.
    pub store_dir: PathBuf,
    /// Cache entry the artifact must end up in.
    pub cache_dir: PathBuf,
    /// Registry base URL the request was resolved against.
    pub registry: String,
    pub name: String,
    pub version: String,
}

/// External installation primitive used by the artifact cache.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Make `request.cache_dir` hold the artifact.
    ///
    /// # Errors
    /// Returns `INSTALL_FAILED` (or the registry error) when the artifact
    /// cannot be fetched or written.
    async fn install(&self, request: &InstallRequest) -> Result<(), PkgError>;
}

/// Installs artifacts from registry tarballs.
#[derive(Debug, Clone)]
pub struct TarballInstaller {
    registry: RegistryClient,
}

impl TarballInstaller {
    #[must_use]
    pub fn new(registry: RegistryClient) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Installer for TarballInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<(), PkgError> {
        let name = &request.name;
        let version = &request.version;

        let packument = self
            .registry
            .fetch_packument(name)
            .await?
            .ok_or_else(|| PkgError::package_not_found(name))?;

        let tarball_url = get_tarball_url(&packument, version).ok_or_else(|| {
            PkgError::install_failed(format!("No tarball URL for {name}@{version}"))
        })?;

        debug!(url = %tarball_url, "Downloading tarball");
        let bytes = download_tarball(self.registry.http(), tarball_url, MAX_TARBALL_SIZE).await?;
        debug!(size = bytes.len(), "Downloaded tarball");

        extract_tgz_atomic(&bytes, &request.cache_dir)?;
        debug!(path = %request.cache_dir.display(), "Extracted to cache");

        let link = link_into_store(&request.store_dir, name, &request.cache_dir)?;
        debug!(link = %link.display(), "Linked into store");

        Ok(())
    }
}
