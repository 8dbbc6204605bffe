//! Remote Config Fetcher (§4.B): SSRF-guarded fetch of a single remote
//! configuration source, with optional regex validation and a disk-backed
//! TTL cache keyed by the fully-interpolated URL.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::RemoteConfigError;
use crate::interpolate::interpolate;
use crate::model::RemoteConfigSource;
use crate::raw::RawDocument;
use crate::ssrf;

const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    fetched_at_unix: u64,
    body: String,
}

/// Fetches and validates remote configuration documents, honoring an
/// on-disk TTL cache.
pub struct RemoteConfigFetcher {
    client: reqwest::Client,
    cache_dir: Option<PathBuf>,
    ttl: Duration,
}

impl RemoteConfigFetcher {
    /// Creates a fetcher with the default 1-hour TTL and no disk cache.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_dir: None,
            ttl: DEFAULT_TTL,
        }
    }

    /// Enables the on-disk cache, rooted at `dir`.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Overrides the cache TTL (default: 1 hour).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Fetches one remote configuration source, applying SSRF checks,
    /// optional regex validation, and the TTL cache. `use_cache` controls
    /// whether a fresh cache entry may be returned without a network call;
    /// writes to the cache always occur on a successful live fetch unless
    /// no cache directory is configured.
    pub async fn fetch(&self, source: &RemoteConfigSource, use_cache: bool) -> Result<RawDocument, RemoteConfigError> {
        let url = interpolate(&source.url, "remoteConfigs.url");

        let parsed = ssrf::check(&url, &source.security)?;

        let headers: Vec<(String, String)> = source
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), interpolate(v, &format!("remoteConfigs.headers.{k}"))))
            .collect();

        if let Some(validation) = &source.validation {
            if let Some(pattern) = &validation.url_pattern {
                let re = Regex::new(pattern).map_err(|e| RemoteConfigError::ValidationFailed(e.to_string()))?;
                if !re.is_match(&url) {
                    return Err(RemoteConfigError::ValidationFailed(format!(
                        "URL '{url}' did not match pattern '{pattern}'"
                    )));
                }
            }

            for (name, pattern) in &validation.headers_pattern {
                let value = headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.as_str())
                    .ok_or_else(|| RemoteConfigError::MissingHeader(name.clone()))?;

                let re = Regex::new(pattern).map_err(|e| RemoteConfigError::ValidationFailed(e.to_string()))?;
                if !re.is_match(value) {
                    return Err(RemoteConfigError::ValidationFailed(format!(
                        "header '{name}' did not match pattern '{pattern}'"
                    )));
                }
            }
        }

        if use_cache {
            if let Some(body) = self.read_cache(&url).await {
                log::debug!("using cached remote config for '{url}'");
                return crate::raw::parse_document(&body).map_err(RemoteConfigError::ParseFailed);
            }
        }

        let mut request = self.client.get(parsed);
        for (name, value) in &headers {
            request = request.header(name, value);
        }

        let response = request.send().await?.error_for_status()?;
        let body = response.text().await?;

        self.write_cache(&url, &body).await;

        crate::raw::parse_document(&body).map_err(RemoteConfigError::ParseFailed)
    }

    async fn read_cache(&self, url: &str) -> Option<String> {
        let path = self.cache_path(url)?;
        let bytes = tokio::fs::read(&path).await.ok()?;
        let entry: CacheEntry = serde_json::from_slice(&bytes).ok()?;

        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
        if now.saturating_sub(entry.fetched_at_unix) > self.ttl.as_secs() {
            return None;
        }

        Some(entry.body)
    }

    async fn write_cache(&self, url: &str, body: &str) {
        let Some(path) = self.cache_path(url) else { return };

        let entry = CacheEntry {
            fetched_at_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            body: body.to_string(),
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                log::warn!("failed to create remote config cache dir: {e}");
                return;
            }
        }

        match serde_json::to_vec(&entry) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&path, bytes).await {
                    log::warn!("failed to write remote config cache entry: {e}");
                }
            }
            Err(e) => log::warn!("failed to serialize remote config cache entry: {e}"),
        }
    }

    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        Some(cache_file_path(dir, url))
    }
}

impl Default for RemoteConfigFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_file_path(dir: &Path, url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    dir.join(format!("{:x}.json", digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RemoteSecurity, RemoteValidation};
    use std::collections::HashMap;

    fn source(url: &str) -> RemoteConfigSource {
        RemoteConfigSource {
            url: url.to_string(),
            headers: HashMap::new(),
            validation: None,
            security: RemoteSecurity::default(),
            merge_strategy: Default::default(),
        }
    }

    #[tokio::test]
    async fn ssrf_rejection_short_circuits_before_network() {
        let fetcher = RemoteConfigFetcher::new();
        let err = fetcher.fetch(&source("http://localhost/config"), true).await.unwrap_err();
        assert!(matches!(err, RemoteConfigError::SsrfRejected(_)));
    }

    #[tokio::test]
    async fn missing_required_header_fails_validation() {
        let mut src = source("https://example.com/config");
        src.validation = Some(RemoteValidation {
            url_pattern: None,
            headers_pattern: HashMap::from([("X-Token".to_string(), ".+".to_string())]),
        });

        let fetcher = RemoteConfigFetcher::new();
        let err = fetcher.fetch(&src, true).await.unwrap_err();
        assert!(matches!(err, RemoteConfigError::MissingHeader(_)));
    }

    #[tokio::test]
    async fn cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = RemoteConfigFetcher::new().with_cache_dir(dir.path());

        fetcher.write_cache("https://example.com/config", r#"{"mcpServers":{}}"#).await;
        let cached = fetcher.read_cache("https://example.com/config").await;

        assert_eq!(cached.as_deref(), Some(r#"{"mcpServers":{}}"#));
    }

    #[tokio::test]
    async fn expired_cache_entry_is_not_returned() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = RemoteConfigFetcher::new()
            .with_cache_dir(dir.path())
            .with_ttl(Duration::from_secs(0));

        fetcher.write_cache("https://example.com/config", "{}").await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(fetcher.read_cache("https://example.com/config").await.is_none());
    }
}
