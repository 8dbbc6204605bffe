//! Use-tool Dispatcher (component J): routes a single `use_tool` call to
//! the right downstream server, a skill, or a disambiguation error.

use std::sync::Arc;

use rmcp::model::{CallToolRequestParam, CallToolResult, Content};

use crate::catalog::Catalog;
use crate::client::ClientConnection;
use crate::name_resolution;

/// `{toolName, toolArgs?}` (§6 `use_tool` input schema).
pub struct UseToolRequest {
    pub tool_name: String,
    pub tool_args: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Dispatches `request` against `clients`, consulting `catalog` for
/// collision-aware name resolution and skill lookups (§4.J).
pub async fn dispatch(request: UseToolRequest, clients: &[Arc<ClientConnection>], catalog: &Catalog) -> CallToolResult {
    if let Some(skill_name) = request.tool_name.strip_prefix("skill__") {
        return dispatch_skill(skill_name, catalog);
    }

    let parsed = name_resolution::parse(&request.tool_name);

    match parsed.server {
        Some(server_name) => dispatch_prefixed(server_name, parsed.actual, request.tool_args, clients).await,
        None => dispatch_plain(parsed.actual, request.tool_args, clients, catalog).await,
    }
}

fn dispatch_skill(name: &str, catalog: &Catalog) -> CallToolResult {
    if catalog.skills.iter().any(|s| s.name == name || s.display_name == format!("skill__{name}")) {
        let message = format!(
            "'{name}' is a skill, not a callable tool. Skills provide instructions; use describe_tools with \
             toolNames:[\"skill__{name}\"] to retrieve its content."
        );
        CallToolResult::success(vec![Content::text(message)])
    } else {
        error_result(format!("no skill named '{name}' is available"))
    }
}

async fn dispatch_prefixed(
    server_name: &str,
    tool_name: &str,
    tool_args: Option<serde_json::Map<String, serde_json::Value>>,
    clients: &[Arc<ClientConnection>],
) -> CallToolResult {
    let Some(client) = clients.iter().find(|c| c.name() == server_name) else {
        let available = clients.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ");
        return error_result(format!("server '{server_name}' is not connected. Available servers: {available}"));
    };

    if client.config().tool_blacklist.contains(tool_name) {
        return error_result(format!("tool '{tool_name}' is blacklisted on server '{server_name}'"));
    }

    forward(client, tool_name, tool_args).await
}

async fn dispatch_plain(
    tool_name: &str,
    tool_args: Option<serde_json::Map<String, serde_json::Value>>,
    clients: &[Arc<ClientConnection>],
    catalog: &Catalog,
) -> CallToolResult {
    let mut matches = Vec::new();
    for client in clients {
        if client.config().tool_blacklist.contains(tool_name) {
            continue;
        }
        if catalog.tools.iter().any(|t| t.server == client.name() && t.tool.name.as_ref() == tool_name) {
            matches.push(client);
        }
    }

    match matches.len() {
        0 => dispatch_skill_fallback(tool_name, catalog),
        1 => forward(matches[0], tool_name, tool_args).await,
        _ => {
            let forms = matches
                .iter()
                .map(|c| name_resolution::prefixed(c.name(), tool_name))
                .collect::<Vec<_>>()
                .join(", ");
            error_result(format!("'{tool_name}' is ambiguous across servers: {forms}. Use one of these forms instead."))
        }
    }
}

fn dispatch_skill_fallback(name: &str, catalog: &Catalog) -> CallToolResult {
    if catalog.skills.iter().any(|s| s.name == name) {
        dispatch_skill(name, catalog)
    } else {
        error_result(format!("no tool or skill named '{name}' was found"))
    }
}

async fn forward(client: &ClientConnection, tool_name: &str, tool_args: Option<serde_json::Map<String, serde_json::Value>>) -> CallToolResult {
    let params = CallToolRequestParam {
        name: tool_name.to_string().into(),
        arguments: tool_args,
    };

    match client.call_tool(params).await {
        Ok(result) => result,
        Err(e) => error_result(format!("downstream call to '{tool_name}' on '{}' failed: {e}", client.name())),
    }
}

fn error_result(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CatalogSkill, SkillSource};
    use skills::{Skill, SkillLocation};

    fn skill_catalog(name: &str, prefixed: bool) -> Catalog {
        let display_name = if prefixed { format!("skill__{name}") } else { name.to_string() };
        Catalog {
            tools: Vec::new(),
            skills: vec![CatalogSkill {
                name: name.to_string(),
                description: "d".to_string(),
                display_name,
                source: SkillSource::File(Skill {
                    name: name.to_string(),
                    description: "d".to_string(),
                    location: SkillLocation::Project,
                    content: "body".to_string(),
                    base_path: "/skills".to_string(),
                }),
            }],
            server_omit_description: Default::default(),
        }
    }

    #[test]
    fn skill_dispatch_rejects_calling_a_skill_as_a_tool() {
        let catalog = skill_catalog("pdf", true);
        let result = dispatch_skill("pdf", &catalog);
        assert_eq!(result.is_error, Some(false));
    }

    #[test]
    fn skill_dispatch_errors_on_unknown_skill() {
        let catalog = skill_catalog("pdf", true);
        let result = dispatch_skill("missing", &catalog);
        assert_eq!(result.is_error, Some(true));
    }
}
