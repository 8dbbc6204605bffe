use thiserror::Error;

/// Errors surfaced while resolving the proxy's configuration.
///
/// `ConfigInvalid` is fatal at startup (§7); the others are recoverable and
/// are logged and skipped by the caller (remote-config fetch failures never
/// abort startup, per §4.C).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The local configuration file failed schema validation or could not be
    /// parsed as JSON/YAML.
    #[error("invalid configuration at {path}: {source}")]
    Invalid {
        /// Path to the offending file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: anyhow::Error,
    },

    /// No local config file could be found in any searched location.
    #[error("no configuration file found")]
    NotFound,
}

/// Errors from fetching and validating a single remote configuration source.
///
/// Every variant here is logged-and-skipped (§4.B, §7's `ConfigFetchFailed`);
/// none of them are fatal to startup.
#[derive(Debug, Error)]
pub enum RemoteConfigError {
    /// The URL failed the SSRF policy (§4.B) before any network call was made.
    #[error("SSRF policy rejected URL: {0}")]
    SsrfRejected(String),

    /// The URL or a required header failed its configured validation regex.
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// A header required by `validation.headers_pattern` was not supplied.
    #[error("missing required header: {0}")]
    MissingHeader(String),

    /// The HTTP request itself failed (network error, non-success status).
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] reqwest::Error),

    /// The response body could not be parsed as the remote config shape.
    #[error("failed to parse remote config: {0}")]
    ParseFailed(#[source] anyhow::Error),
}
