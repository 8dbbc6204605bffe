//! The user-facing configuration shape (§6), as written in the config file
//! or returned by a remote config source, before transform (§4.A) resolves
//! it into [`crate::model::ResolvedConfig`].

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

/// Top-level document shape accepted both from the local config file and
/// from a remote config source.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDocument {
    /// Downstream servers keyed by name, in document order (§5).
    #[serde(default, rename = "mcpServers")]
    pub mcp_servers: IndexMap<String, RawServerEntry>,
    /// Zero or more remote configuration sources to merge in.
    #[serde(default, rename = "remoteConfigs")]
    pub remote_configs: Vec<RawRemoteConfigSource>,
    /// Skill directory configuration.
    #[serde(default)]
    pub skills: Option<RawSkillsConfig>,
}

/// `skills` block of the config document.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSkillsConfig {
    /// Ordered list of directories (absolute or relative to the working
    /// directory) to search for skills.
    #[serde(default)]
    pub paths: Vec<String>,
}

/// A single entry under `mcpServers`. Accepts both the stdio shape
/// (`command`/`args`/`env`) and the networked shape (`url`/`headers`/`type`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawServerEntry {
    /// `{command, args?, env?, ...}` — launched as a subprocess.
    Stdio(RawStdioEntry),
    /// `{url, headers?, type?, ...}` — reached over HTTP or SSE.
    Networked(RawNetworkedEntry),
}

/// Fields shared by both server entry shapes.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCommonFields {
    /// Skip this entry entirely when true.
    #[serde(default)]
    pub disabled: bool,
    /// Top-level instruction; overrides `config.instruction` (§4.A).
    #[serde(default)]
    pub instruction: Option<String>,
    /// Per-call dial timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Nested configuration block.
    #[serde(default)]
    pub config: Option<RawServerInnerConfig>,
}

/// Stdio-shaped server entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawStdioEntry {
    /// Executable to launch.
    pub command: String,
    /// Arguments passed to the executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the child process.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Fields shared with the networked shape.
    #[serde(flatten)]
    pub common: RawCommonFields,
}

/// URL-shaped server entry (HTTP or SSE).
#[derive(Debug, Clone, Deserialize)]
pub struct RawNetworkedEntry {
    /// Endpoint URL.
    pub url: String,
    /// Headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Explicit transport selection; `http` unless this is `"sse"`.
    #[serde(default)]
    pub r#type: Option<RawTransportType>,
    /// Fields shared with the stdio shape.
    #[serde(flatten)]
    pub common: RawCommonFields,
}

/// Explicit transport override for a networked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawTransportType {
    /// Streamable HTTP.
    Http,
    /// Server-Sent Events.
    Sse,
}

/// `config` block nested inside a server entry.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerInnerConfig {
    /// Fallback instruction, overridden by the top-level `instruction`.
    #[serde(default)]
    pub instruction: Option<String>,
    /// Native tool names to refuse dispatching to.
    #[serde(default, rename = "toolBlacklist")]
    pub tool_blacklist: Vec<String>,
    /// When true, the catalog lists only names for this server.
    #[serde(default, rename = "omitToolDescription")]
    pub omit_tool_description: bool,
    /// Per-prompt configuration, keyed by prompt name.
    #[serde(default)]
    pub prompts: HashMap<String, RawPromptConfig>,
}

/// A single entry of `config.prompts`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPromptConfig {
    /// When present, expose this prompt as a skill instead of an invocable
    /// MCP prompt.
    #[serde(default)]
    pub skill: Option<RawSkillSpec>,
}

/// `config.prompts.<name>.skill` shape.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSkillSpec {
    /// Display name of the skill.
    pub name: String,
    /// Short description shown in the catalog.
    pub description: String,
    /// Optional location label.
    #[serde(default)]
    pub folder: Option<String>,
}

/// A single entry of the top-level `remoteConfigs` array.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRemoteConfigSource {
    /// The remote document's URL, pre-interpolation.
    pub url: String,
    /// Headers sent with the fetch request, pre-interpolation.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Optional regex validation of the interpolated URL/headers.
    #[serde(default)]
    pub validation: Option<RawRemoteValidation>,
    /// SSRF policy overrides for this source.
    #[serde(default)]
    pub security: Option<RawRemoteSecurity>,
    /// How to combine this remote's servers with the local server map.
    #[serde(default, rename = "mergeStrategy")]
    pub merge_strategy: Option<RawMergeStrategy>,
}

/// `remoteConfigs[].validation` shape.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRemoteValidation {
    /// Pattern the fully-interpolated URL must match.
    #[serde(default, rename = "url_pattern")]
    pub url_pattern: Option<String>,
    /// Patterns each named, required header's interpolated value must
    /// match.
    #[serde(default, rename = "headers_pattern")]
    pub headers_pattern: HashMap<String, String>,
}

/// `remoteConfigs[].security` shape.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct RawRemoteSecurity {
    /// Allow URLs that resolve to a private/loopback/link-local range.
    #[serde(default, rename = "allowPrivateIPs")]
    pub allow_private_ips: bool,
    /// Require `https://`. Defaults to `true` when omitted (handled at the
    /// call site, since `bool::default()` would otherwise silently turn
    /// this off).
    #[serde(default, rename = "enforceHttps")]
    pub enforce_https: Option<bool>,
}

/// `remoteConfigs[].mergeStrategy` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RawMergeStrategy {
    /// Local entries win on conflicting server names.
    LocalPriority,
    /// Remote entries win on conflicting server names.
    RemotePriority,
    /// Field-by-field deep merge, local scalars win, maps combine.
    MergeDeep,
}

/// Parses a document from either JSON or YAML text, selecting the format by
/// sniffing leading content (`{` implies JSON; everything else is tried as
/// YAML, which is also valid for plain JSON documents).
pub fn parse_document(text: &str) -> anyhow::Result<RawDocument> {
    let trimmed = text.trim_start();

    if trimmed.starts_with('{') {
        Ok(serde_json::from_str(text)?)
    } else {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Parses a document using the file extension to pick the format.
pub fn parse_document_for_path(path: &std::path::Path, text: &str) -> anyhow::Result<RawDocument> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(text)?),
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(text)?),
        _ => parse_document(text),
    }
}
