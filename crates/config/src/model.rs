use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

/// The fully resolved, internal-shape configuration for one downstream MCP
/// server (§3 `ServerConfig`).
///
/// Invariants upheld by the transform step (§4.A): `name` is unique across
/// the resolved server map, disabled entries never reach this form, and
/// `${VAR}` placeholders have been interpolated (or left verbatim with a
/// logged warning for undefined variables).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Unique name of the server within the resolved configuration.
    pub name: String,
    /// How to reach the downstream server.
    pub transport: TransportConfig,
    /// Instruction surfaced to the catalog for this server, if any.
    pub instruction: Option<String>,
    /// Native tool names that must never be dispatched to.
    pub tool_blacklist: HashSet<String>,
    /// When true, the catalog renders only tool names for this server, no
    /// descriptions.
    pub omit_tool_description: bool,
    /// Prompts explicitly configured as skills for this server.
    pub prompts: HashMap<String, PromptConfig>,
    /// Per-call timeout used when dialing this server.
    pub timeout_ms: u64,
}

/// Transport-specific connection details for a downstream server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// Local subprocess communicating over line-delimited JSON on stdio.
    Stdio {
        /// Executable to launch.
        command: String,
        /// Arguments passed to the executable.
        args: Vec<String>,
        /// Extra environment variables for the child process.
        env: HashMap<String, String>,
    },
    /// Streamable-HTTP MCP endpoint.
    Http {
        /// Endpoint URL.
        url: String,
        /// Headers sent with every request.
        headers: HashMap<String, String>,
    },
    /// Server-Sent-Events MCP endpoint.
    Sse {
        /// Endpoint URL.
        url: String,
        /// Headers sent with every request.
        headers: HashMap<String, String>,
    },
}

impl TransportConfig {
    /// Human-readable transport kind, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Stdio { .. } => "stdio",
            TransportConfig::Http { .. } => "http",
            TransportConfig::Sse { .. } => "sse",
        }
    }
}

/// Configuration for a single downstream prompt (§3 `PromptConfig`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromptConfig {
    /// When present, this prompt is surfaced as a skill in the catalog
    /// rather than as an invocable MCP prompt.
    pub skill: Option<SkillSpec>,
}

/// The skill identity a prompt is configured to expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillSpec {
    /// Display name of the skill.
    pub name: String,
    /// Short description shown in the catalog.
    pub description: String,
    /// Optional location label; when absent, `prompt:{server}/{prompt}` is
    /// used instead (§4.I).
    pub folder: Option<String>,
}

/// How a local server entry should be combined with its remote-config
/// counterpart of the same name (§3 `RemoteConfigSource`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Local entries win on conflicting server names.
    #[default]
    LocalPriority,
    /// Remote entries win on conflicting server names.
    RemotePriority,
    /// Combine field-by-field, preferring local scalars but deep-merging
    /// `env`/`headers` maps with local keys winning.
    MergeDeep,
}

/// Security policy applied before fetching a remote configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteSecurity {
    /// Allow URLs whose host resolves into a private/loopback/link-local
    /// range. Defaults to `false`.
    pub allow_private_ips: bool,
    /// Require `https://` (as opposed to allowing plain `http://` too).
    /// Defaults to `true`.
    pub enforce_https: bool,
}

impl Default for RemoteSecurity {
    fn default() -> Self {
        Self {
            allow_private_ips: false,
            enforce_https: true,
        }
    }
}

/// Optional regex validation applied to a remote config source after SSRF
/// checks pass.
#[derive(Debug, Clone, Default)]
pub struct RemoteValidation {
    /// Pattern the fully-interpolated URL must match.
    pub url_pattern: Option<String>,
    /// Patterns each named, required header's interpolated value must
    /// match. A header absent from the request is a validation failure.
    pub headers_pattern: HashMap<String, String>,
}

/// A single remote configuration source to fetch and merge with the local
/// config (§3 `RemoteConfigSource`).
#[derive(Debug, Clone)]
pub struct RemoteConfigSource {
    /// The remote document's URL, pre-interpolation.
    pub url: String,
    /// Headers sent with the fetch request, pre-interpolation.
    pub headers: HashMap<String, String>,
    /// Optional regex validation of the interpolated URL/headers.
    pub validation: Option<RemoteValidation>,
    /// SSRF policy for this source.
    pub security: RemoteSecurity,
    /// How to combine this remote's servers with the local server map.
    pub merge_strategy: MergeStrategy,
}

/// Top-level resolved configuration the aggregator is built from.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    /// Resolved, enabled, interpolated downstream servers keyed by name, in
    /// the order they were configured (§5: "servers appear in the order
    /// they were configured").
    pub servers: IndexMap<String, ServerConfig>,
    /// Ordered list of directories to search for `SKILL.md` files.
    pub skill_paths: Vec<String>,
}
