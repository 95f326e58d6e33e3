//! Version resolution against a registry's published version list.

use super::error::PkgError;
use async_trait::async_trait;
use semver::{Version, VersionReq};
use tracing::debug;

/// Symbolic version that must be resolved before a cache path exists.
pub const LATEST: &str = "latest";

/// Anything that can list the published versions of an artifact.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// List published version strings. An unknown artifact yields an empty list.
    ///
    /// # Errors
    /// Returns `REGISTRY_UNAVAILABLE` when the source cannot be reached.
    async fn list_versions(&self, name: &str) -> Result<Vec<String>, PkgError>;
}

/// Resolve the highest published version of `name`.
///
/// # Errors
/// Returns `PACKAGE_NOT_FOUND` if nothing is published, or the source's error.
pub async fn resolve_latest<S>(source: &S, name: &str) -> Result<String, PkgError>
where
    S: VersionSource + ?Sized,
{
    let versions = source.list_versions(name).await?;
    let latest = max_version(&versions).ok_or_else(|| PkgError::package_not_found(name))?;
    debug!(name, version = %latest, "Resolved latest");
    Ok(latest)
}

/// Resolve the highest published version of `name` compatible with `^base`.
///
/// # Errors
/// Returns `INVALID_OPTIONS` if `base` is not a semver version, or the
/// source's error.
pub async fn resolve_compatible_upgrade<S>(
    source: &S,
    base: &str,
    name: &str,
) -> Result<Option<String>, PkgError>
where
    S: VersionSource + ?Sized,
{
    let versions = source.list_versions(name).await?;
    Ok(compatible_versions(base, &versions)?.into_iter().next())
}

/// Highest version by semver precedence, pre-releases included.
///
/// Unparseable entries are ignored.
#[must_use]
pub fn max_version(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|raw| Version::parse(raw).ok().map(|v| (v, raw)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, raw)| raw.clone())
}

/// All versions satisfying `^base`, strictly descending, duplicates removed.
///
/// # Errors
/// Returns `INVALID_OPTIONS` if `base` is not a semver version.
pub fn compatible_versions(base: &str, versions: &[String]) -> Result<Vec<String>, PkgError> {
    let base = Version::parse(base.trim()).map_err(|e| {
        PkgError::invalid_options(format!("Invalid base version '{base}': {e}"))
    })?;
    let req = VersionReq::parse(&format!("^{base}"))
        .map_err(|e| PkgError::invalid_options(format!("Invalid range '^{base}': {e}")))?;

    let mut matching: Vec<(Version, &String)> = versions
        .iter()
        .filter_map(|raw| Version::parse(raw).ok().map(|v| (v, raw)))
        .filter(|(v, _)| req.matches(v))
        .collect();

    matching.sort_by(|a, b| b.0.cmp(&a.0));
    matching.dedup_by(|a, b| a.0 == b.0);

    Ok(matching.into_iter().map(|(_, raw)| raw.clone()).collect())
}
