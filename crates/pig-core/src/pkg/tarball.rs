//! Tarball download and staged extraction into a cache entry.

use super::error::PkgError;
use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::Client;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tar::Archive;
use tracing::debug;

/// Maximum tarball size (200 MB).
pub const MAX_TARBALL_SIZE: u64 = 200 * 1024 * 1024;

/// Download timeout in seconds.
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Download a tarball, refusing bodies larger than `max_bytes`.
///
/// # Errors
/// Returns `INSTALL_FAILED` on transport errors, non-success status or size overflow.
pub async fn download_tarball(
    client: &Client,
    url: &str,
    max_bytes: u64,
) -> Result<Bytes, PkgError> {
    let response = client
        .get(url)
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| PkgError::install_failed(format!("Failed to download '{url}': {e}")))?;

    if !response.status().is_success() {
        return Err(PkgError::install_failed(format!(
            "Download failed with status {} for '{url}'",
            response.status()
        )));
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(PkgError::install_failed(format!(
                "Tarball too large: {len} bytes (max: {max_bytes})"
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PkgError::install_failed(format!("Failed to read response body: {e}")))?;

    if bytes.len() as u64 > max_bytes {
        return Err(PkgError::install_failed(format!(
            "Tarball too large: {} bytes (max: {max_bytes})",
            bytes.len()
        )));
    }

    Ok(bytes)
}

/// Extract a gzipped tarball so that its single root directory becomes `dest`.
///
/// Entries are unpacked into a staging directory next to `dest` and the root
/// is renamed into place, so `dest` either does not exist or is complete. If
/// another process wins the rename, its copy is kept and ours is discarded.
///
/// # Errors
/// Returns `INSTALL_FAILED` if the archive is invalid or cannot be written.
pub fn extract_tgz_atomic(bytes: &[u8], dest: &Path) -> Result<(), PkgError> {
    let parent = dest
        .parent()
        .ok_or_else(|| PkgError::install_failed("Cache entry has no parent directory"))?;
    fs::create_dir_all(parent)?;

    if dest.exists() {
        return Ok(());
    }

    // Dropped (and removed) on every exit path.
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(parent)
        .map_err(|e| PkgError::install_failed(format!("Failed to create staging dir: {e}")))?;

    extract_tgz_to(bytes, staging.path())?;
    let root = find_extracted_root(staging.path())?;

    match fs::rename(&root, dest) {
        Ok(()) => Ok(()),
        Err(_) if dest.exists() => Ok(()),
        Err(rename_err) => copy_dir_all(&root, dest).map_err(|copy_err| {
            if let Err(e) = fs::remove_dir_all(dest) {
                debug!(dest = %dest.display(), error = %e, "Failed to remove partial copy");
            }
            PkgError::install_failed(format!(
                "Failed to move extracted package: rename={rename_err}, copy={copy_err}"
            ))
        }),
    }
}

/// Locate the single top-level directory of an extracted tarball.
///
/// Usually `package/`, but some publishers use the bare package name.
fn find_extracted_root(staging: &Path) -> Result<PathBuf, PkgError> {
    let package_dir = staging.join("package");
    if package_dir.is_dir() {
        return Ok(package_dir);
    }

    let dirs: Vec<PathBuf> = fs::read_dir(staging)?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|ft| ft.is_dir()))
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.path())
        .collect();

    match dirs.as_slice() {
        [only] => Ok(only.clone()),
        [] => Err(PkgError::install_failed(
            "Tarball does not contain a top-level directory",
        )),
        many => Err(PkgError::install_failed(format!(
            "Tarball contains {} top-level directories, expected 1",
            many.len()
        ))),
    }
}

fn extract_tgz_to(bytes: &[u8], dest: &Path) -> Result<(), PkgError> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let entries = archive
        .entries()
        .map_err(|e| PkgError::install_failed(format!("Failed to read tarball entries: {e}")))?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| PkgError::install_failed(format!("Failed to read tarball entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| PkgError::install_failed(format!("Failed to read entry path: {e}")))?
            .into_owned();

        if path.is_absolute() || path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PkgError::install_failed(format!(
                "Tarball entry escapes the package: {}",
                path.display()
            )));
        }

        let dest_path = dest.join(&path);
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let kind = entry.header().entry_type();
        if kind.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if kind.is_file() {
            let mut file = File::create(&dest_path)?;
            io::copy(&mut entry, &mut file)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(mode) = entry.header().mode() {
                    fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode)).map_err(
                        |e| {
                            PkgError::install_failed(format!(
                                "Failed to set mode {mode:o} on {}: {e}",
                                path.display()
                            ))
                        },
                    )?;
                }
            }
        }
        // Links and device entries are skipped.
    }

    Ok(())
}

fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let target = dst.join(entry.file_name());
        if ty.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else if ty.is_file() {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
