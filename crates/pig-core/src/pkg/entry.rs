//! Entry resolution: from an install location to the file a command runs.

use pig_util::path::format_path_buf;
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Manifest file name looked up while walking upward.
pub const MANIFEST_FILE: &str = "package.json";

/// The subset of a manifest entry resolution reads.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    main: Option<String>,
}

/// Nearest directory at or above `start` holding a manifest.
#[must_use]
pub fn package_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Absolute, `/`-normalized entry file of the artifact installed at `install_path`.
///
/// Returns `None` when no manifest is found, or when the nearest one is
/// unreadable, invalid, or declares no non-empty `main`. The entry file itself
/// is not required to exist.
#[must_use]
pub fn root_file(install_path: &Path) -> Option<PathBuf> {
    let dir = package_dir(install_path)?;
    let manifest_path = dir.join(MANIFEST_FILE);

    let manifest: Manifest = match fs::read_to_string(&manifest_path)
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
    {
        Some(manifest) => manifest,
        None => {
            debug!(path = %manifest_path.display(), "Unreadable manifest");
            return None;
        }
    };

    let main = manifest.main.filter(|m| !m.trim().is_empty())?;
    let dir = dunce::canonicalize(&dir).unwrap_or(dir);
    let entry = lexical_normalize(&absolute(&dir).join(main));
    Some(PathBuf::from(format_path_buf(&entry)))
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
}

/// Fold `.` and `..` components without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_manifest(dir: &Path, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MANIFEST_FILE), body).unwrap();
    }

    fn canonical(dir: &Path) -> PathBuf {
        dunce::canonicalize(dir).unwrap()
    }

    #[test]
    fn test_root_file_from_manifest_main() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), r#"{"name":"@pig-cli/init","main":"lib/index.js"}"#);

        let entry = root_file(dir.path()).unwrap();
        let expected = canonical(dir.path()).join("lib").join("index.js");
        assert_eq!(entry, PathBuf::from(format_path_buf(&expected)));
        assert!(entry.is_absolute());
    }

    #[test]
    fn test_root_file_walks_up() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), r#"{"main":"./bin/cli.js"}"#);
        let nested = dir.path().join("lib").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let entry = root_file(&nested).unwrap();
        let expected = canonical(dir.path()).join("bin").join("cli.js");
        assert_eq!(entry, PathBuf::from(format_path_buf(&expected)));
    }

    #[test]
    fn test_root_file_nearest_manifest_wins() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), r#"{"main":"outer.js"}"#);
        let inner = dir.path().join("packages").join("inner");
        write_manifest(&inner, r#"{"main":"inner.js"}"#);

        let entry = root_file(&inner).unwrap();
        assert!(entry.ends_with("inner.js"));
    }

    #[test]
    fn test_root_file_missing_main() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), r#"{"name":"no-entry"}"#);
        assert_eq!(root_file(dir.path()), None);
    }

    #[test]
    fn test_root_file_empty_main() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), r#"{"main":""}"#);
        assert_eq!(root_file(dir.path()), None);
    }

    #[test]
    fn test_root_file_invalid_manifest() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), "{ not json");
        assert_eq!(root_file(dir.path()), None);
    }

    #[test]
    fn test_package_dir_none_without_manifest() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir_all(&nested).unwrap();
        // A manifest above the temp dir would be found; only check nothing
        // inside the temp dir is reported.
        if let Some(found) = package_dir(&nested) {
            assert!(!found.starts_with(dir.path()));
        }
    }

    #[test]
    fn test_lexical_normalize() {
        assert_eq!(
            lexical_normalize(Path::new("/a/b/./c/../d.js")),
            PathBuf::from("/a/b/d.js")
        );
    }
}
