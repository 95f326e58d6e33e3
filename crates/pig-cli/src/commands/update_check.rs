//! Startup notice when a compatible newer pig is published.
//!
//! Runs at most once per [`CHECK_INTERVAL`]; the last attempt time lives in a
//! stamp file under the CLI home. The stamp is written before the registry is
//! queried, so an unreachable registry is not retried until the interval
//! passes. Every failure is logged at debug level and otherwise ignored.

use pig_core::paths::update_check_stamp;
use pig_core::pkg::{resolve_compatible_upgrade, PkgError, RegistryClient};
use pig_core::version::{PACKAGE_NAME, VERSION};
use pig_core::Config;
use semver::Version;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

pub const CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub async fn run(config: &Config) {
    match check(config).await {
        Ok(Some(newer)) => warn!(
            "pig {newer} is available (current: {VERSION}); run `npm install -g {PACKAGE_NAME}` to update"
        ),
        Ok(None) => {}
        Err(e) => debug!(error = %e, "Update check skipped"),
    }
}

async fn check(config: &Config) -> Result<Option<String>, PkgError> {
    let stamp = update_check_stamp(&config.home);
    let now = SystemTime::now();
    if checked_recently(&stamp, now) {
        return Ok(None);
    }

    if let Err(e) = record_check(&stamp, now) {
        debug!(stamp = %stamp.display(), error = %e, "Failed to record update check");
    }

    let registry = RegistryClient::new(&config.registry)?;
    let candidate = resolve_compatible_upgrade(&registry, VERSION, PACKAGE_NAME).await?;

    Ok(candidate.filter(|v| is_newer(v, VERSION)))
}

/// Whether the stamp at `stamp` is younger than [`CHECK_INTERVAL`].
fn checked_recently(stamp: &Path, now: SystemTime) -> bool {
    let Ok(raw) = pig_util::fs::read_to_string_lossy(stamp) else {
        return false;
    };
    let Ok(secs) = raw.trim().parse::<u64>() else {
        return false;
    };
    let last = UNIX_EPOCH + Duration::from_secs(secs);
    now.duration_since(last)
        .is_ok_and(|elapsed| elapsed < CHECK_INTERVAL)
}

fn record_check(stamp: &Path, now: SystemTime) -> Result<(), PkgError> {
    let secs = now.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    if let Some(parent) = stamp.parent() {
        pig_util::fs::ensure_dir(parent)?;
    }
    pig_util::fs::atomic_write(stamp, secs.to_string().as_bytes())?;
    Ok(())
}

fn is_newer(candidate: &str, current: &str) -> bool {
    match (Version::parse(candidate), Version::parse(current)) {
        (Ok(candidate), Ok(current)) => candidate > current,
        _ => false,
    }
}
