//! Artifact cache: deterministic store layout and install/update transitions.
//!
//! A store directory holds one directory per `(name, version)`:
//!
//! ```text
//! {store}/_{name with '/' -> '_'}@{version}@{name}
//! ```
//!
//! The layout is shared with npminstall-style stores and must not change.
//! Old versions are never evicted; `update` only adds the newest one.

use super::error::PkgError;
use super::install::{InstallRequest, Installer};
use super::resolve::{resolve_latest, VersionSource, LATEST};
use pig_util::path::format_path_buf;
use semver::Version;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The artifact a single dispatch works on.
///
/// Owned by one dispatch call; `version` moves from [`LATEST`] to a concrete
/// version as the cache resolves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub version: String,
    pub target_path: PathBuf,
    pub store_dir: Option<PathBuf>,
}

impl ArtifactRef {
    /// Build a ref, rejecting empty names, versions or target paths.
    ///
    /// `version` is either [`LATEST`] or a semver version.
    ///
    /// # Errors
    /// Returns `INVALID_OPTIONS` when a required field is empty or the version
    /// is malformed.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        target_path: impl Into<PathBuf>,
        store_dir: Option<PathBuf>,
    ) -> Result<Self, PkgError> {
        let name = name.into();
        let version = version.into();
        let target_path = target_path.into();

        if name.trim().is_empty() {
            return Err(PkgError::invalid_options("Artifact name must not be empty"));
        }
        if version.trim().is_empty() {
            return Err(PkgError::invalid_options(format!(
                "Artifact {name} has an empty version"
            )));
        }
        if version != LATEST {
            Version::parse(version.trim()).map_err(|e| {
                PkgError::invalid_options(format!(
                    "Artifact {name} has an invalid version '{version}': {e}"
                ))
            })?;
        }
        if target_path.as_os_str().is_empty() {
            return Err(PkgError::invalid_options(format!(
                "Artifact {name} has an empty target path"
            )));
        }
        if store_dir.as_ref().is_some_and(|d| d.as_os_str().is_empty()) {
            return Err(PkgError::invalid_options(format!(
                "Artifact {name} has an empty store directory"
            )));
        }

        Ok(Self {
            name,
            version,
            target_path,
            store_dir,
        })
    }

    /// Whether `version` still holds the [`LATEST`] placeholder.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.version == LATEST
    }

    /// Cache entry of this ref's current version.
    ///
    /// # Errors
    /// Returns `INVALID_OPTIONS` without a store dir or with an unresolved version.
    pub fn cache_path(&self) -> Result<PathBuf, PkgError> {
        self.cache_path_for(&self.version)
    }

    /// Cache entry of `version` for this ref's artifact.
    ///
    /// # Errors
    /// Returns `INVALID_OPTIONS` without a store dir or when `version` is [`LATEST`].
    pub fn cache_path_for(&self, version: &str) -> Result<PathBuf, PkgError> {
        let store_dir = self.store_dir.as_deref().ok_or_else(|| {
            PkgError::invalid_options(format!("Artifact {} has no store directory", self.name))
        })?;
        if version == LATEST {
            return Err(PkgError::invalid_options(format!(
                "Version of {} must be resolved before computing its cache path",
                self.name
            )));
        }
        Ok(cache_entry(store_dir, &self.name, version))
    }

    /// Where the artifact lives: its cache entry when managed, else `target_path`.
    ///
    /// # Errors
    /// Same as [`Self::cache_path`] for managed refs.
    pub fn install_location(&self) -> Result<PathBuf, PkgError> {
        if self.store_dir.is_some() {
            self.cache_path()
        } else {
            Ok(self.target_path.clone())
        }
    }
}

/// Cache entry directory for `(store_dir, name, version)`.
///
/// Pure string formatting: the store dir is not canonicalized and the result
/// uses `/` separators.
#[must_use]
pub fn cache_entry(store_dir: &Path, name: &str, version: &str) -> PathBuf {
    let store = format_path_buf(store_dir);
    let store = store.trim_end_matches('/');
    let prefix = cache_prefix(name);
    PathBuf::from(format!("{store}/_{prefix}@{version}@{name}"))
}

/// Directory-name prefix of an artifact: `/` becomes `_`.
#[must_use]
pub fn cache_prefix(name: &str) -> String {
    name.replace('/', "_")
}

/// Drives presence checks, installs and updates for [`ArtifactRef`]s.
pub struct ArtifactCache<'a, S: ?Sized, I: ?Sized> {
    source: &'a S,
    installer: &'a I,
    registry: String,
}

impl<'a, S, I> ArtifactCache<'a, S, I>
where
    S: VersionSource + ?Sized,
    I: Installer + ?Sized,
{
    #[must_use]
    pub fn new(source: &'a S, installer: &'a I, registry: impl Into<String>) -> Self {
        Self {
            source,
            installer,
            registry: registry.into(),
        }
    }

    /// Create the store dir and resolve a [`LATEST`] placeholder in place.
    ///
    /// # Errors
    /// Returns an error if the store dir cannot be created or resolution fails.
    pub async fn prepare(&self, artifact: &mut ArtifactRef) -> Result<(), PkgError> {
        if let Some(store_dir) = &artifact.store_dir {
            if pig_util::fs::ensure_dir(store_dir)? {
                debug!(store_dir = %store_dir.display(), "Created store directory");
            }
        }
        if artifact.is_unresolved() {
            artifact.version = resolve_latest(self.source, &artifact.name).await?;
        }
        Ok(())
    }

    /// Whether the artifact is present.
    ///
    /// Managed refs are resolved first (mutating `artifact.version`) and checked
    /// by cache entry; unmanaged refs check `target_path`.
    ///
    /// # Errors
    /// Returns an error if preparing the ref fails.
    pub async fn exists(&self, artifact: &mut ArtifactRef) -> Result<bool, PkgError> {
        if artifact.store_dir.is_none() {
            return Ok(artifact.target_path.exists());
        }
        self.prepare(artifact).await?;
        let entry = artifact.cache_path()?;
        let present = entry.is_dir();
        debug!(name = %artifact.name, version = %artifact.version, present, "Checked cache");
        Ok(present)
    }

    /// Install the artifact at its (resolved) version.
    ///
    /// # Errors
    /// Returns an error if resolution or the install primitive fails.
    pub async fn install(&self, artifact: &mut ArtifactRef) -> Result<(), PkgError> {
        self.prepare(artifact).await?;
        let version = artifact.version.clone();
        info!(name = %artifact.name, version = %version, "Installing");
        self.install_version(artifact, &version).await
    }

    /// Move the artifact to the newest published version.
    ///
    /// Installs only when that version is not cached yet; always leaves
    /// `artifact.version` at the newest version.
    ///
    /// # Errors
    /// Returns an error if resolution or the install primitive fails.
    pub async fn update(&self, artifact: &mut ArtifactRef) -> Result<(), PkgError> {
        self.prepare(artifact).await?;
        let latest = resolve_latest(self.source, &artifact.name).await?;

        let latest_entry = artifact.cache_path_for(&latest)?;
        if latest_entry.is_dir() {
            debug!(name = %artifact.name, version = %latest, "Already up to date");
        } else {
            info!(
                name = %artifact.name,
                from = %artifact.version,
                to = %latest,
                "Updating"
            );
            self.install_version(artifact, &latest).await?;
        }

        artifact.version = latest;
        Ok(())
    }

    async fn install_version(&self, artifact: &ArtifactRef, version: &str) -> Result<(), PkgError> {
        let store_dir = artifact
            .store_dir
            .clone()
            .unwrap_or_else(|| artifact.target_path.join("node_modules"));
        pig_util::fs::ensure_dir(&store_dir)?;

        let request = InstallRequest {
            root: artifact.target_path.clone(),
            cache_dir: cache_entry(&store_dir, &artifact.name, version),
            store_dir,
            registry: self.registry.clone(),
            name: artifact.name.clone(),
            version: version.to_string(),
        };
        self.installer.install(&request).await
    }
}
