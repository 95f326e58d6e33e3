/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name the CLI publishes and checks for upgrades under.
pub const PACKAGE_NAME: &str = "@pig-cli/core";

/// Lowest JavaScript runtime version delegated commands may run on.
pub const LOWEST_RUNTIME_VERSION: &str = "12.0.0";

/// Returns the version line printed by `pig version`.
#[must_use]
pub fn version_string() -> String {
    format!("pig {VERSION}")
}
