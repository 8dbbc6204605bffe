//! Describe-tools Engine (component I): catalog rendering and the
//! `describe_tools` lookup.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use futures_util::stream::{FuturesOrdered, StreamExt};
use rmcp::model::Tool;
use skills::Skill;

use crate::client::ClientConnection;
use crate::name_resolution;
use crate::prompt_skill::{self, PromptSkill};

/// The literal envelope every returned skill's `instructions` is prefixed
/// with (§4.I, scenario 3).
pub fn command_message(skill_name: &str) -> String {
    format!("<command-message>The \"{skill_name}\" skill is loading</command-message>\n")
}

pub struct CatalogTool {
    pub server: String,
    pub tool: Tool,
    pub display_name: String,
}

pub enum SkillSource {
    File(Skill),
    Prompt(PromptSkill),
}

pub struct CatalogSkill {
    pub name: String,
    pub description: String,
    pub display_name: String,
    pub source: SkillSource,
}

/// A point-in-time snapshot of every displayable tool and skill, built once
/// per `describe_tools` call (§5: catalog building fans out `listTools`
/// concurrently and never aborts on a per-client failure).
pub struct Catalog {
    pub tools: Vec<CatalogTool>,
    pub skills: Vec<CatalogSkill>,
    pub(crate) server_omit_description: HashMap<String, bool>,
}

impl Catalog {
    /// `clients` must already be in configured-server order; listings are
    /// fetched concurrently but assembled back into that order (§5).
    pub async fn build(clients: &[Arc<ClientConnection>], file_skills: &[Skill], prompt_skills: &[PromptSkill]) -> Self {
        let server_omit_description = clients
            .iter()
            .map(|c| (c.name().to_string(), c.config().omit_tool_description))
            .collect();

        let mut fetches = FuturesOrdered::new();

        for client in clients {
            let client = Arc::clone(client);
            fetches.push_back(async move {
                let name = client.name().to_string();
                let blacklist = client.config().tool_blacklist.clone();
                match client.list_tools().await {
                    Ok(tools) => {
                        let tools = tools.into_iter().filter(|t| !blacklist.contains(t.name.as_ref())).collect();
                        (name, tools)
                    }
                    Err(e) => {
                        log::warn!("failed to list tools on server '{name}': {e}");
                        (name, Vec::new())
                    }
                }
            });
        }

        let mut per_server: Vec<(String, Vec<Tool>)> = Vec::with_capacity(clients.len());
        while let Some(entry) = fetches.next().await {
            per_server.push(entry);
        }

        let mut name_counts: HashMap<String, usize> = HashMap::new();
        for (_, tools) in &per_server {
            for tool in tools {
                *name_counts.entry(tool.name.to_string()).or_default() += 1;
            }
        }

        let mut tools = Vec::new();
        for (server, server_tools) in per_server {
            for tool in server_tools {
                let display_name = if name_counts.get(tool.name.as_ref()).copied().unwrap_or(0) > 1 {
                    name_resolution::prefixed(&server, &tool.name)
                } else {
                    tool.name.to_string()
                };
                tools.push(CatalogTool { server: server.clone(), tool, display_name });
            }
        }

        let tool_display_names: HashSet<&str> = tools.iter().map(|t| t.display_name.as_str()).collect();

        let mut seen_names = HashSet::new();
        let mut skills = Vec::new();

        for skill in file_skills {
            if !seen_names.insert(skill.name.clone()) {
                continue;
            }
            skills.push(build_catalog_skill(&skill.name, &skill.description, SkillSource::File(skill.clone()), &tool_display_names));
        }
        for skill in prompt_skills {
            if !seen_names.insert(skill.name.clone()) {
                continue;
            }
            skills.push(build_catalog_skill(&skill.name, &skill.description, SkillSource::Prompt(skill.clone()), &tool_display_names));
        }

        Self { tools, skills, server_omit_description }
    }

    /// Renders the meta-tool's advertised `description`. The exact layout
    /// is an internal detail; only that tool/skill/server names and
    /// descriptions appear textually is load-bearing (§9).
    pub fn render(&self) -> String {
        let mut out = String::new();

        let mut by_server: Vec<(&str, Vec<&CatalogTool>)> = Vec::new();
        for tool in &self.tools {
            match by_server.iter_mut().find(|(server, _)| *server == tool.server) {
                Some((_, tools)) => tools.push(tool),
                None => by_server.push((tool.server.as_str(), vec![tool])),
            }
        }

        for (server, tools) in &by_server {
            let _ = writeln!(out, "## {server}");
            let omit_description = self.server_omit_description.get(*server).copied().unwrap_or(false);
            if omit_description {
                let names = tools.iter().map(|t| t.display_name.as_str()).collect::<Vec<_>>().join(", ");
                let _ = writeln!(out, "{names}");
            } else {
                for tool in tools {
                    let description = tool.tool.description.as_deref().unwrap_or("");
                    let _ = writeln!(out, "- {}: {description}", tool.display_name);
                }
            }
            out.push('\n');
        }

        if !self.skills.is_empty() {
            out.push_str("## skills\n");
            for skill in &self.skills {
                let _ = writeln!(out, "- {}: {}", skill.display_name, skill.description);
            }
        }

        out
    }

    fn find_tool(&self, server: Option<&str>, native: &str) -> Vec<&CatalogTool> {
        self.tools
            .iter()
            .filter(|t| match server {
                Some(s) => t.server == s,
                None => true,
            })
            .filter(|t| t.tool.name.as_ref() == native)
            .collect()
    }

    fn find_skill_by_display(&self, display: &str) -> Option<&CatalogSkill> {
        self.skills.iter().find(|s| s.display_name == display || s.name == display)
    }
}

fn build_catalog_skill(name: &str, description: &str, source: SkillSource, tool_display_names: &HashSet<&str>) -> CatalogSkill {
    let display_name = if tool_display_names.contains(name) {
        format!("skill__{name}")
    } else {
        name.to_string()
    };
    CatalogSkill { name: name.to_string(), description: description.to_string(), display_name, source }
}

/// One resolved tool hit from a `describe_tools` lookup.
pub struct ToolHit {
    pub server: String,
    pub tool: Tool,
}

/// One resolved skill hit from a `describe_tools` lookup.
pub struct SkillHit {
    pub name: String,
    pub location: String,
    pub instructions: String,
}

#[derive(Default)]
pub struct LookupOutcome {
    pub tools: Vec<ToolHit>,
    pub skills: Vec<SkillHit>,
    pub not_found: Vec<String>,
}

/// §4.I lookup: resolves each requested name against the catalog, the
/// file-skill registry, and the prompt-skill cache (re-fetching a prompt's
/// content when needed to supply `instructions`).
pub async fn lookup(
    requested: &[String],
    catalog: &Catalog,
    clients: &[Arc<ClientConnection>],
) -> LookupOutcome {
    let mut outcome = LookupOutcome::default();

    for name in requested {
        if let Some(skill_name) = name.strip_prefix("skill__") {
            match resolve_skill(catalog, clients, skill_name).await {
                Some(hit) => outcome.skills.push(hit),
                None => outcome.not_found.push(name.clone()),
            }
            continue;
        }

        let parsed = name_resolution::parse(name);
        match parsed.server {
            Some(server) => {
                let hits = catalog.find_tool(Some(server), parsed.actual);
                match hits.first() {
                    Some(hit) => outcome.tools.push(ToolHit { server: hit.server.clone(), tool: hit.tool.clone() }),
                    None => outcome.not_found.push(name.clone()),
                }
            }
            None => {
                let hits = catalog.find_tool(None, parsed.actual);
                match hits.len() {
                    0 => match resolve_skill(catalog, clients, parsed.actual).await {
                        Some(hit) => outcome.skills.push(hit),
                        None => outcome.not_found.push(name.clone()),
                    },
                    _ => {
                        for hit in hits {
                            outcome.tools.push(ToolHit { server: hit.server.clone(), tool: hit.tool.clone() });
                        }
                    }
                }
            }
        }
    }

    outcome
}

/// Wire shape of a tool hit in the `describe_tools` JSON response (§6).
#[derive(serde::Serialize)]
pub struct ToolOutput {
    pub server: String,
    pub tool: ToolDescriptor,
}

#[derive(serde::Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

impl From<&ToolHit> for ToolOutput {
    fn from(hit: &ToolHit) -> Self {
        ToolOutput {
            server: hit.server.clone(),
            tool: ToolDescriptor {
                name: hit.tool.name.to_string(),
                description: hit.tool.description.as_ref().map(|d| d.to_string()),
                input_schema: serde_json::Value::Object((*hit.tool.input_schema).clone()),
            },
        }
    }
}

#[derive(serde::Serialize)]
pub struct SkillOutput {
    pub name: String,
    pub location: String,
    pub instructions: String,
}

impl From<&SkillHit> for SkillOutput {
    fn from(hit: &SkillHit) -> Self {
        SkillOutput { name: hit.name.clone(), location: hit.location.clone(), instructions: hit.instructions.clone() }
    }
}

/// The JSON body of a successful `describe_tools` response (§6).
#[derive(serde::Serialize, Default)]
pub struct DescribeToolsOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<SkillOutput>>,
    #[serde(rename = "notFound", skip_serializing_if = "Option::is_none")]
    pub not_found: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(rename = "nextSteps", skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<Vec<String>>,
}

pub enum DescribeToolsResult {
    Found(DescribeToolsOutput),
    NothingFound(Vec<String>),
}

/// Converts a raw [`LookupOutcome`] into the wire response, or signals that
/// nothing at all was found (§4.I's "return an error result" case).
pub fn finish(requested: &[String], outcome: LookupOutcome) -> DescribeToolsResult {
    if outcome.tools.is_empty() && outcome.skills.is_empty() {
        return DescribeToolsResult::NothingFound(requested.to_vec());
    }

    let mut next_steps = Vec::new();
    if !outcome.tools.is_empty() {
        next_steps.push("For MCP tools: use use_tool with toolName and toolArgs to call it.".to_string());
    }
    if !outcome.skills.is_empty() {
        next_steps.push("For skill, just follow skill's description to continue.".to_string());
    }

    DescribeToolsResult::Found(DescribeToolsOutput {
        tools: (!outcome.tools.is_empty()).then(|| outcome.tools.iter().map(ToolOutput::from).collect()),
        skills: (!outcome.skills.is_empty()).then(|| outcome.skills.iter().map(SkillOutput::from).collect()),
        not_found: (!outcome.not_found.is_empty()).then_some(outcome.not_found),
        warnings: None,
        next_steps: Some(next_steps),
    })
}

async fn resolve_skill(catalog: &Catalog, clients: &[Arc<ClientConnection>], name: &str) -> Option<SkillHit> {
    let skill = catalog.find_skill_by_display(name).or_else(|| catalog.skills.iter().find(|s| s.name == name))?;

    match &skill.source {
        SkillSource::File(file_skill) => Some(SkillHit {
            name: skill.name.clone(),
            location: file_skill.base_path.clone(),
            instructions: format!("{}{}", command_message(&skill.name), file_skill.content),
        }),
        SkillSource::Prompt(prompt_skill) => {
            let client = clients.iter().find(|c| c.name() == prompt_skill.server_name)?;
            let body = prompt_skill::fetch_instructions(client, &prompt_skill.prompt_name).await.ok()?;
            Some(SkillHit {
                name: skill.name.clone(),
                location: prompt_skill.default_location(),
                instructions: format!("{}{}", command_message(&skill.name), body),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skills::SkillLocation;

    fn file_skill(name: &str) -> Skill {
        Skill {
            name: name.to_string(),
            description: "desc".to_string(),
            location: SkillLocation::Project,
            content: "body".to_string(),
            base_path: "/skills/pdf".to_string(),
        }
    }

    #[test]
    fn command_message_matches_literal_envelope() {
        assert_eq!(command_message("pdf"), "<command-message>The \"pdf\" skill is loading</command-message>\n");
    }

    #[test]
    fn build_catalog_skill_prefixes_only_on_tool_collision() {
        let mut names = HashSet::new();
        names.insert("pdf");
        let colliding = build_catalog_skill("pdf", "d", SkillSource::File(file_skill("pdf")), &names);
        assert_eq!(colliding.display_name, "skill__pdf");

        let names = HashSet::new();
        let plain = build_catalog_skill("pdf", "d", SkillSource::File(file_skill("pdf")), &names);
        assert_eq!(plain.display_name, "pdf");
    }
}
