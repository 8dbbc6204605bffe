//! Config Schema & Transform (§4.A): turns the user-facing [`RawDocument`]
//! shape into the resolved [`ResolvedConfig`] the rest of the proxy
//! consumes.

use indexmap::IndexMap;

use crate::interpolate::interpolate;
use crate::model::{PromptConfig, ResolvedConfig, ServerConfig, SkillSpec, TransportConfig};
use crate::raw::{RawCommonFields, RawDocument, RawNetworkedEntry, RawServerEntry, RawStdioEntry, RawTransportType};

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Transforms a parsed document into resolved servers and skill paths.
///
/// Disabled entries are dropped (§4.A); every string field is interpolated
/// with `${VAR}` before being stored. Entries of either shape that are
/// otherwise fine but fail a structural invariant (e.g. an empty server
/// name) are rejected individually rather than aborting the whole document,
/// matching "reject entries failing shape validation" in §4.A.
pub fn transform(doc: RawDocument) -> ResolvedConfig {
    let mut servers = IndexMap::new();

    for (name, entry) in doc.mcp_servers {
        if name.is_empty() {
            log::warn!("skipping server entry with empty name");
            continue;
        }

        match transform_entry(&name, entry) {
            Some(server) => {
                servers.insert(name, server);
            }
            None => log::debug!("skipping disabled server '{name}'"),
        }
    }

    let skill_paths = doc
        .skills
        .map(|s| s.paths.into_iter().map(|p| interpolate(&p, "skills.paths")).collect())
        .unwrap_or_default();

    ResolvedConfig { servers, skill_paths }
}

fn transform_entry(name: &str, entry: RawServerEntry) -> Option<ServerConfig> {
    match entry {
        RawServerEntry::Stdio(stdio) => transform_stdio(name, stdio),
        RawServerEntry::Networked(net) => transform_networked(name, net),
    }
}

fn transform_stdio(name: &str, entry: RawStdioEntry) -> Option<ServerConfig> {
    let RawStdioEntry { command, args, env, common } = entry;

    if common.disabled {
        return None;
    }

    let ctx = format!("server '{name}'");
    let command = interpolate(&command, &ctx);
    let args = args.into_iter().map(|a| interpolate(&a, &ctx)).collect();
    let env = env
        .into_iter()
        .map(|(k, v)| (k.clone(), interpolate(&v, &format!("{ctx} env.{k}"))))
        .collect();

    Some(finish(
        name,
        TransportConfig::Stdio { command, args, env },
        common,
    ))
}

fn transform_networked(name: &str, entry: RawNetworkedEntry) -> Option<ServerConfig> {
    let RawNetworkedEntry { url, headers, r#type, common } = entry;

    if common.disabled {
        return None;
    }

    let ctx = format!("server '{name}'");
    let url = interpolate(&url, &ctx);
    let headers = headers
        .into_iter()
        .map(|(k, v)| (k.clone(), interpolate(&v, &format!("{ctx} header.{k}"))))
        .collect();

    let transport = if matches!(r#type, Some(RawTransportType::Sse)) {
        TransportConfig::Sse { url, headers }
    } else {
        TransportConfig::Http { url, headers }
    };

    Some(finish(name, transport, common))
}

fn finish(name: &str, transport: TransportConfig, common: RawCommonFields) -> ServerConfig {
    let inner = common.config.unwrap_or_default();
    let ctx = format!("server '{name}'");

    // Instruction precedence: top-level overrides nested config.instruction (§4.A).
    let instruction = common
        .instruction
        .or(inner.instruction)
        .map(|s| interpolate(&s, &ctx));

    let prompts = inner
        .prompts
        .into_iter()
        .map(|(prompt_name, raw)| {
            let skill = raw.skill.map(|s| SkillSpec {
                name: interpolate(&s.name, &ctx),
                description: interpolate(&s.description, &ctx),
                folder: s.folder.map(|f| interpolate(&f, &ctx)),
            });
            (prompt_name, PromptConfig { skill })
        })
        .collect();

    ServerConfig {
        name: name.to_string(),
        transport,
        instruction,
        tool_blacklist: inner.tool_blacklist.into_iter().collect(),
        omit_tool_description: inner.omit_tool_description,
        prompts,
        timeout_ms: common.timeout.unwrap_or(DEFAULT_TIMEOUT_MS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::parse_document;

    #[test]
    fn infers_stdio_transport_from_command() {
        let doc = parse_document(r#"{"mcpServers":{"fs":{"command":"mcp-fs","args":["--root","/tmp"]}}}"#).unwrap();
        let resolved = transform(doc);

        let server = resolved.servers.get("fs").unwrap();
        assert!(matches!(server.transport, TransportConfig::Stdio { .. }));
    }

    #[test]
    fn infers_http_unless_type_is_sse() {
        let doc = parse_document(
            r#"{"mcpServers":{"a":{"url":"https://example.com/mcp"},"b":{"url":"https://example.com/sse","type":"sse"}}}"#,
        )
        .unwrap();
        let resolved = transform(doc);

        assert!(matches!(resolved.servers["a"].transport, TransportConfig::Http { .. }));
        assert!(matches!(resolved.servers["b"].transport, TransportConfig::Sse { .. }));
    }

    #[test]
    fn drops_disabled_entries() {
        let doc = parse_document(r#"{"mcpServers":{"a":{"command":"x","disabled":true}}}"#).unwrap();
        let resolved = transform(doc);

        assert!(resolved.servers.is_empty());
    }

    #[test]
    fn top_level_instruction_overrides_nested() {
        let doc = parse_document(
            r#"{"mcpServers":{"a":{"command":"x","instruction":"top","config":{"instruction":"nested"}}}}"#,
        )
        .unwrap();
        let resolved = transform(doc);

        assert_eq!(resolved.servers["a"].instruction.as_deref(), Some("top"));
    }

    #[test]
    fn undefined_placeholder_left_verbatim() {
        let doc = parse_document(r#"{"mcpServers":{"a":{"command":"${DOES_NOT_EXIST_XYZ}"}}}"#).unwrap();
        let resolved = transform(doc);

        match &resolved.servers["a"].transport {
            TransportConfig::Stdio { command, .. } => assert_eq!(command, "${DOES_NOT_EXIST_XYZ}"),
            _ => panic!("expected stdio transport"),
        }
    }
}
