//! Server Facade (component K): the `ServerHandler` impl that presents the
//! whole aggregator as a single MCP server exposing `describe_tools` and
//! `use_tool`, plus transparent, collision-aware prompt forwarding.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, ErrorData, GetPromptRequestParam, GetPromptResult, Implementation,
    ListPromptsResult, ListResourcesResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
    ReadResourceRequestParam, ReadResourceResult, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};

use crate::catalog::{self, Catalog, DescribeToolsResult};
use crate::client_manager::ClientManager;
use crate::dispatch::{self, UseToolRequest};
use crate::name_resolution;
use crate::prompt_skill::{self, PromptSkillDetector};
use skills::SkillRegistry;

const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V_2025_03_26;

/// The aggregating MCP server, wired over a [`ClientManager`] and the
/// skill/prompt-skill registries.
#[derive(Clone)]
pub struct AggregatorServer {
    shared: Arc<Inner>,
}

struct Inner {
    clients: ClientManager,
    skills: Arc<SkillRegistry>,
    prompt_skills: PromptSkillDetector,
    info: ServerInfo,
}

impl AggregatorServer {
    pub fn new(clients: ClientManager, skills: Arc<SkillRegistry>) -> Self {
        let info = ServerInfo {
            protocol_version: PROTOCOL_VERSION,
            capabilities: ServerCapabilities::builder().enable_tools().enable_prompts().enable_resources().build(),
            server_info: Implementation {
                name: "mcp-relay".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "This server aggregates tools, skills, and prompts from multiple downstream MCP servers. \
                 Use `describe_tools` to look up tools or skills by name, and `use_tool` to invoke them."
                    .to_string(),
            ),
        };

        Self {
            shared: Arc::new(Inner {
                clients,
                skills,
                prompt_skills: PromptSkillDetector::new(),
                info,
            }),
        }
    }

    /// Closes every downstream connection (§4.G shutdown discipline). The
    /// CLI driver calls this from its SIGINT/SIGTERM handler before exiting.
    pub async fn shutdown(&self) {
        self.shared.clients.disconnect_all().await;
    }

    /// Connected clients in configured-server order (§5), skipping any
    /// configured server that never connected.
    fn ordered_clients(&self) -> Vec<Arc<crate::client::ClientConnection>> {
        self.shared
            .clients
            .configured_order()
            .iter()
            .filter_map(|name| self.shared.clients.get_client(name))
            .collect()
    }

    async fn build_catalog(&self) -> Catalog {
        let clients = self.ordered_clients();
        let file_skills = self.shared.skills.list().await;
        let configured = prompt_skill::index_configured(&clients);
        let prompt_skills = self
            .shared
            .prompt_skills
            .detect(&clients, |server, prompt| configured.contains_key(&(server.to_string(), prompt.to_string())))
            .await;

        Catalog::build(&clients, &file_skills, &prompt_skills).await
    }

    async fn describe_tools(&self, tool_names: Vec<String>) -> CallToolResult {
        let clients = self.ordered_clients();
        let catalog = self.build_catalog().await;
        let outcome = catalog::lookup(&tool_names, &catalog, &clients).await;

        match catalog::finish(&tool_names, outcome) {
            DescribeToolsResult::Found(output) => match serde_json::to_string(&output) {
                Ok(json) => CallToolResult::success(vec![Content::text(json)]),
                Err(e) => CallToolResult::error(vec![Content::text(format!("failed to render catalog response: {e}"))]),
            },
            DescribeToolsResult::NothingFound(requested) => {
                let message = format!("none of the requested names were found: {}", requested.join(", "));
                CallToolResult::error(vec![Content::text(message)])
            }
        }
    }

    async fn use_tool(&self, tool_name: String, tool_args: Option<serde_json::Map<String, serde_json::Value>>) -> CallToolResult {
        let clients = self.ordered_clients();
        let catalog = self.build_catalog().await;
        dispatch::dispatch(UseToolRequest { tool_name, tool_args }, &clients, &catalog).await
    }

    fn meta_tools() -> Vec<Tool> {
        vec![
            Tool {
                name: "describe_tools".into(),
                description: Some("Look up tools and skills by name to learn how to call them.".into()),
                input_schema: Arc::new(
                    serde_json::json!({
                        "type": "object",
                        "properties": {
                            "toolNames": {
                                "type": "array",
                                "items": { "type": "string", "minLength": 1 },
                                "minItems": 1
                            }
                        },
                        "required": ["toolNames"],
                        "additionalProperties": false
                    })
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                ),
                output_schema: None,
                annotations: None,
            },
            Tool {
                name: "use_tool".into(),
                description: Some("Invoke a downstream tool by name.".into()),
                input_schema: Arc::new(
                    serde_json::json!({
                        "type": "object",
                        "properties": {
                            "toolName": { "type": "string", "minLength": 1 },
                            "toolArgs": { "type": "object" }
                        },
                        "required": ["toolName"],
                        "additionalProperties": false
                    })
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                ),
                output_schema: None,
                annotations: None,
            },
        ]
    }
}

impl ServerHandler for AggregatorServer {
    fn get_info(&self) -> ServerInfo {
        self.shared.info.clone()
    }

    async fn list_tools(
        &self,
        _: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult { next_cursor: None, tools: Self::meta_tools() })
    }

    async fn call_tool(&self, params: CallToolRequestParam, _ctx: RequestContext<RoleServer>) -> Result<CallToolResult, ErrorData> {
        match params.name.as_ref() {
            "describe_tools" => {
                let args = params.arguments.unwrap_or_default();
                let tool_names: Vec<String> = args
                    .get("toolNames")
                    .and_then(|v| v.as_array())
                    .map(|values| values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .ok_or_else(|| ErrorData::invalid_params("toolNames must be a non-empty array of strings", None))?;

                Ok(self.describe_tools(tool_names).await)
            }
            "use_tool" => {
                let args = params.arguments.unwrap_or_default();
                let tool_name = args
                    .get("toolName")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ErrorData::invalid_params("toolName is required", None))?
                    .to_string();
                let tool_args = args.get("toolArgs").and_then(|v| v.as_object()).cloned();

                Ok(self.use_tool(tool_name, tool_args).await)
            }
            other => {
                log::debug!("unknown meta-tool requested: '{other}'");
                Err(ErrorData::method_not_found::<rmcp::model::CallToolRequestMethod>())
            }
        }
    }

    async fn list_prompts(
        &self,
        _: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, ErrorData> {
        let clients = self.ordered_clients();
        let mut per_client = Vec::with_capacity(clients.len());

        for client in &clients {
            match client.list_prompts().await {
                Ok(prompts) => per_client.push((client.name().to_string(), prompts)),
                Err(e) => {
                    log::warn!("failed to list prompts on server '{}': {e}", client.name());
                    per_client.push((client.name().to_string(), Vec::new()));
                }
            }
        }

        let mut counts = std::collections::HashMap::new();
        for (_, prompts) in &per_client {
            for prompt in prompts {
                *counts.entry(prompt.name.clone()).or_insert(0usize) += 1;
            }
        }

        let mut prompts = Vec::new();
        for (server, server_prompts) in per_client {
            for mut prompt in server_prompts {
                if counts.get(&prompt.name).copied().unwrap_or(0) > 1 {
                    prompt.name = name_resolution::prefixed(&server, &prompt.name);
                }
                prompts.push(prompt);
            }
        }

        Ok(ListPromptsResult { prompts, next_cursor: None })
    }

    async fn get_prompt(&self, params: GetPromptRequestParam, _ctx: RequestContext<RoleServer>) -> Result<GetPromptResult, ErrorData> {
        let clients = self.ordered_clients();
        let parsed = name_resolution::parse(&params.name);

        if let Some(server_name) = parsed.server {
            let client = clients
                .iter()
                .find(|c| c.name() == server_name)
                .ok_or_else(|| ErrorData::invalid_params(format!("server '{server_name}' is not connected"), None))?;

            let forward_params = GetPromptRequestParam { name: parsed.actual.to_string(), arguments: params.arguments };

            return client
                .get_prompt(forward_params)
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None));
        }

        let mut candidates = Vec::new();
        for client in &clients {
            match client.list_prompts().await {
                Ok(prompts) if prompts.iter().any(|p| p.name == parsed.actual) => candidates.push(client),
                _ => {}
            }
        }

        match candidates.len() {
            0 => Err(ErrorData::invalid_params(format!("no prompt named '{}' was found", parsed.actual), None)),
            1 => candidates[0]
                .get_prompt(GetPromptRequestParam { name: parsed.actual.to_string(), arguments: params.arguments })
                .await
                .map_err(|e| ErrorData::internal_error(e.to_string(), None)),
            _ => {
                let forms = candidates
                    .iter()
                    .map(|c| name_resolution::prefixed(c.name(), parsed.actual))
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(ErrorData::invalid_params(
                    format!("prompt '{}' is ambiguous across servers; use one of: {forms}", parsed.actual),
                    None,
                ))
            }
        }
    }

    async fn list_resources(
        &self,
        _: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        let clients = self.ordered_clients();
        let mut resources = Vec::new();

        for client in &clients {
            match client.list_resources().await {
                Ok(client_resources) => resources.extend(client_resources),
                Err(e) => log::warn!("failed to list resources on server '{}': {e}", client.name()),
            }
        }

        Ok(ListResourcesResult { resources, next_cursor: None })
    }

    async fn read_resource(&self, params: ReadResourceRequestParam, _ctx: RequestContext<RoleServer>) -> Result<ReadResourceResult, ErrorData> {
        let clients = self.ordered_clients();

        for client in &clients {
            if let Ok(result) = client.read_resource(params.clone()).await {
                return Ok(result);
            }
        }

        Err(ErrorData::invalid_params(format!("resource '{}' was not found on any connected server", params.uri), None))
    }
}
