//! Platform-independent path strings.
//!
//! Cache keys and entry-file paths are compared and serialized as strings, so
//! they always use `/` regardless of the host separator.

use std::path::{Path, MAIN_SEPARATOR};

/// Normalize `path` for the host separator.
///
/// On hosts whose separator is `/` the input is returned unchanged; elsewhere
/// every `\` is rewritten to `/`.
#[must_use]
pub fn format_path(path: &str) -> String {
    format_path_with_separator(path, MAIN_SEPARATOR)
}

/// Same as [`format_path`] with an explicit host separator.
#[must_use]
pub fn format_path_with_separator(path: &str, separator: char) -> String {
    if separator == '/' {
        path.to_string()
    } else {
        path.replace('\\', "/")
    }
}

/// Lossy string form of a `Path`, normalized with [`format_path`].
#[must_use]
pub fn format_path_buf(path: &Path) -> String {
    format_path(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_slash_host_is_identity() {
        assert_eq!(
            format_path_with_separator(r"C:\cache\_a@1.0.0@a", '/'),
            r"C:\cache\_a@1.0.0@a"
        );
    }

    #[test]
    fn test_backslash_host_rewrites() {
        assert_eq!(
            format_path_with_separator(r"C:\Users\me\.pig-cli\dependencies", '\\'),
            "C:/Users/me/.pig-cli/dependencies"
        );
    }

    #[test]
    fn test_idempotent() {
        for sep in ['/', '\\'] {
            for input in [r"a\b\c", "/cache/_@scope_tool@1.0.0@@scope/tool", ""] {
                let once = format_path_with_separator(input, sep);
                let twice = format_path_with_separator(&once, sep);
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn test_format_path_buf() {
        let p = Path::new("/cache/_sample-pkg@1.2.0@sample-pkg/lib/index.js");
        assert_eq!(
            format_path_buf(p),
            "/cache/_sample-pkg@1.2.0@sample-pkg/lib/index.js"
        );
    }
}
