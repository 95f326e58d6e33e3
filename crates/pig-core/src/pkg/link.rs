//! Store links: `{store}/{name}` pointing at the active cache entry.

use super::error::PkgError;
use std::fs;
use std::path::{Path, PathBuf};

/// Point `{store_dir}/{name}` at `cache_dir`.
///
/// Scoped names get their `@scope` directory created first. Whatever sat at
/// the link location before (an older link, a stray directory) is replaced.
///
/// # Errors
/// Returns `INSTALL_FAILED` for malformed scoped names or filesystem errors.
pub fn link_into_store(
    store_dir: &Path,
    name: &str,
    cache_dir: &Path,
) -> Result<PathBuf, PkgError> {
    let link_path = store_link_path(store_dir, name)?;
    if let Some(parent) = link_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            PkgError::install_failed(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }

    if link_path.symlink_metadata().is_ok() {
        remove_existing(&link_path)?;
    }

    create_dir_link(cache_dir, &link_path)?;
    Ok(link_path)
}

/// Where the store link for `name` lives.
///
/// # Errors
/// Returns `INSTALL_FAILED` if a scoped name lacks its `/name` part.
pub fn store_link_path(store_dir: &Path, name: &str) -> Result<PathBuf, PkgError> {
    if !name.starts_with('@') {
        return Ok(store_dir.join(name));
    }
    match name.split_once('/') {
        Some((scope, rest)) if !rest.is_empty() && scope.len() > 1 => {
            Ok(store_dir.join(scope).join(rest))
        }
        _ => Err(PkgError::install_failed(format!(
            "Invalid scoped artifact name: {name}"
        ))),
    }
}

fn remove_existing(path: &Path) -> Result<(), PkgError> {
    let metadata = fs::symlink_metadata(path)?;

    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        // FILE_ATTRIBUTE_REPARSE_POINT
        if metadata.file_attributes() & 0x400 != 0 {
            fs::remove_dir(path).map_err(|e| {
                PkgError::install_failed(format!("Failed to remove old junction: {e}"))
            })?;
            return Ok(());
        }
    }

    let result = if metadata.file_type().is_symlink() || metadata.is_file() {
        fs::remove_file(path)
    } else {
        fs::remove_dir_all(path)
    };
    result.map_err(|e| {
        PkgError::install_failed(format!("Failed to replace {}: {e}", path.display()))
    })
}

fn create_dir_link(target: &Path, link: &Path) -> Result<(), PkgError> {
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target, link);

    #[cfg(windows)]
    let result = junction::create(target, link);

    #[cfg(not(any(unix, windows)))]
    let result: std::io::Result<()> = Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "directory links are not supported on this platform",
    ));

    result.map_err(|e| {
        PkgError::install_failed(format!(
            "Failed to link {} -> {}: {e}",
            link.display(),
            target.display()
        ))
    })
}
