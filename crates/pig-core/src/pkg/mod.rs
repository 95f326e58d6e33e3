//! Artifact handling.
//!
//! - Fetching version lists and packuments from an npm-style registry
//! - Resolving `latest` and caret-compatible upgrades with semver
//! - Addressing, installing and updating cache entries in a store directory
//! - Downloading and extracting tarballs, linking them into the store
//! - Locating an installed artifact's entry file

pub mod cache;
pub mod entry;
pub mod error;
pub mod install;
pub mod link;
pub mod registry;
pub mod resolve;
pub mod tarball;

pub use cache::{cache_entry, cache_prefix, ArtifactCache, ArtifactRef};
pub use entry::{package_dir, root_file, MANIFEST_FILE};
pub use error::{codes, PkgError};
pub use install::{InstallRequest, Installer, TarballInstaller};
pub use link::{link_into_store, store_link_path};
pub use registry::{get_tarball_url, get_versions, RegistryClient, DEFAULT_REGISTRY, REGISTRY_ENV};
pub use resolve::{
    compatible_versions, max_version, resolve_compatible_upgrade, resolve_latest, VersionSource,
    LATEST,
};
pub use tarball::{download_tarball, extract_tgz_atomic, MAX_TARBALL_SIZE};
