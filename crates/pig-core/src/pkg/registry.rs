//! npm-style registry client.

use super::error::PkgError;
use super::resolve::VersionSource;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override the registry URL.
pub const REGISTRY_ENV: &str = "PIG_CLI_REGISTRY";

/// Registry client for fetching artifact metadata.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        // Url::join replaces the last segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            PkgError::invalid_options(format!("Invalid registry URL '{base_url}': {e}"))
        })?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("pig/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                PkgError::registry_unavailable(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self { base_url, http })
    }

    /// Create a client using the registry URL from environment or default.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created.
    pub fn from_env() -> Result<Self, PkgError> {
        let url = std::env::var(REGISTRY_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY.to_string());
        Self::new(&url)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the HTTP client (for reuse in tarball downloads).
    #[must_use]
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Fetch the packument (artifact metadata document).
    ///
    /// A 404 is absent data and yields `Ok(None)`.
    ///
    /// # Errors
    /// Returns `REGISTRY_UNAVAILABLE` on network failure, any other
    /// non-success status, or an unparseable body.
    pub async fn fetch_packument(&self, name: &str) -> Result<Option<serde_json::Value>, PkgError> {
        if name.is_empty() {
            return Err(PkgError::invalid_options("Artifact name is empty"));
        }

        let encoded_name = if name.starts_with('@') {
            name.replace('/', "%2F")
        } else {
            name.to_string()
        };

        let url = self.base_url.join(&encoded_name).map_err(|e| {
            PkgError::invalid_options(format!("Failed to build URL for '{name}': {e}"))
        })?;

        debug!(url = %url, "Fetching packument");
        let response = self.http.get(url.as_str()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(PkgError::registry_unavailable(format!(
                "Registry returned status {} for '{name}'",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await?;
        Ok(Some(json))
    }
}

#[async_trait]
impl VersionSource for RegistryClient {
    async fn list_versions(&self, name: &str) -> Result<Vec<String>, PkgError> {
        let versions = self
            .fetch_packument(name)
            .await?
            .map(|packument| {
                get_versions(&packument)
                    .into_iter()
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Ok(versions)
    }
}

/// Extract the tarball URL for a specific version.
#[must_use]
pub fn get_tarball_url<'a>(packument: &'a serde_json::Value, version: &str) -> Option<&'a str> {
    packument
        .get("versions")?
        .get(version)?
        .get("dist")?
        .get("tarball")?
        .as_str()
}

/// Get all published version strings from a packument.
#[must_use]
pub fn get_versions(packument: &serde_json::Value) -> Vec<&str> {
    packument
        .get("versions")
        .and_then(|v| v.as_object())
        .map(|obj| obj.keys().map(String::as_str).collect())
        .unwrap_or_default()
}
