//! Config Schema, Transform, Remote Fetcher and Merger (components A-C).
//!
//! [`load_resolved_config`] is the single entry point the rest of the proxy
//! calls: it locates and parses the local config file, transforms it, fetches
//! every `remoteConfigs` entry (skipping and logging individual failures
//! rather than aborting startup), and merges each one in per its configured
//! strategy.

pub mod error;
pub mod interpolate;
pub mod merge;
pub mod model;
pub mod raw;
pub mod remote;
pub mod ssrf;
pub mod transform;

use std::env;
use std::path::{Path, PathBuf};

pub use error::{ConfigError, RemoteConfigError};
pub use model::{
    MergeStrategy, PromptConfig, RemoteConfigSource, RemoteSecurity, RemoteValidation,
    ResolvedConfig, ServerConfig, SkillSpec, TransportConfig,
};
pub use remote::RemoteConfigFetcher;

const CONFIG_FILE_STEMS: &[&str] = &["mcp-config.yaml", "mcp-config.yml", "mcp-config.json"];

/// Searches `PROJECT_PATH` (if set) and then the current working directory
/// for one of the recognized config file names (§6's "Config locator"
/// collaborator), returning the first match.
pub fn locate_default_config() -> Result<PathBuf, ConfigError> {
    let mut search_dirs = Vec::new();
    if let Ok(project_path) = env::var("PROJECT_PATH") {
        search_dirs.push(PathBuf::from(project_path));
    }
    search_dirs.push(env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    for dir in &search_dirs {
        for stem in CONFIG_FILE_STEMS {
            let candidate = dir.join(stem);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
    }

    Err(ConfigError::NotFound)
}

/// Loads and fully resolves the configuration at `path`: parses it, runs the
/// component-A transform, then fetches and merges every `remoteConfigs`
/// entry in document order.
///
/// A remote source that fails to fetch or parse is logged and skipped
/// entirely (§4.C) — it never aborts startup, matching `ConfigError::Invalid`
/// being reserved for the local file alone.
pub async fn load_resolved_config(path: &Path) -> Result<ResolvedConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
        path: path.display().to_string(),
        source: anyhow::Error::new(e),
    })?;

    let doc = raw::parse_document_for_path(path, &text).map_err(|e| ConfigError::Invalid {
        path: path.display().to_string(),
        source: e,
    })?;

    let remote_sources: Vec<RemoteConfigSource> = doc
        .remote_configs
        .iter()
        .map(raw_to_remote_source)
        .collect();

    let mut resolved = transform::transform(doc);

    let fetcher = RemoteConfigFetcher::new();
    for source in &remote_sources {
        match fetcher.fetch(source, true).await {
            Ok(raw_doc) => {
                let remote_resolved = transform::transform(raw_doc);
                resolved = merge::merge(resolved, remote_resolved, source.merge_strategy);
            }
            Err(e) => {
                log::warn!("skipping remote config source '{}': {e}", source.url);
            }
        }
    }

    Ok(resolved)
}

fn raw_to_remote_source(raw: &raw::RawRemoteConfigSource) -> RemoteConfigSource {
    let security = raw.security.map(|s| RemoteSecurity {
        allow_private_ips: s.allow_private_ips,
        enforce_https: s.enforce_https.unwrap_or(true),
    });

    RemoteConfigSource {
        url: raw.url.clone(),
        headers: raw.headers.clone(),
        validation: raw.validation.as_ref().map(|v| RemoteValidation {
            url_pattern: v.url_pattern.clone(),
            headers_pattern: v.headers_pattern.clone(),
        }),
        security: security.unwrap_or_default(),
        merge_strategy: match raw.merge_strategy {
            Some(raw::RawMergeStrategy::LocalPriority) | None => MergeStrategy::LocalPriority,
            Some(raw::RawMergeStrategy::RemotePriority) => MergeStrategy::RemotePriority,
            Some(raw::RawMergeStrategy::MergeDeep) => MergeStrategy::MergeDeep,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_and_transforms_a_local_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp-config.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{"mcpServers":{{"fs":{{"command":"mcp-fs"}}}}}}"#).unwrap();

        let resolved = load_resolved_config(&path).await.unwrap();
        assert!(resolved.servers.contains_key("fs"));
    }

    #[test]
    fn locate_default_config_prefers_project_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mcp-config.yaml"), "mcpServers: {}").unwrap();

        env::set_var("PROJECT_PATH", dir.path());
        let found = locate_default_config().unwrap();
        env::remove_var("PROJECT_PATH");

        assert_eq!(found, dir.path().join("mcp-config.yaml"));
    }
}
