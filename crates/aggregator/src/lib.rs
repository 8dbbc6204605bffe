//! The MCP aggregating proxy: dials every configured downstream server,
//! presents the union of their tools (plus file- and prompt-based skills)
//! behind two meta-tools, and forwards prompts/resources transparently.

pub mod catalog;
pub mod client;
pub mod client_manager;
pub mod dispatch;
pub mod error;
pub mod name_resolution;
pub mod prompt_skill;
pub mod server;

use std::sync::Arc;

use client_manager::ClientManager;
use config::ResolvedConfig;
use skills::SkillRegistry;

pub use server::AggregatorServer;

/// Connects to every server in `config` and builds the server facade.
///
/// Startup tolerates partial failure (§5): a server that fails to dial is
/// logged and omitted from the connected set. Only when **every** server
/// fails does this return an error.
pub async fn build(config: ResolvedConfig) -> anyhow::Result<AggregatorServer> {
    let total = config.servers.len();
    let order: Vec<String> = config.servers.keys().cloned().collect();
    let manager = ClientManager::with_order(order);

    if total > 0 {
        let failures = manager.connect_all(config.servers.into_values()).await;
        if failures == total {
            anyhow::bail!("failed to connect to any of the {total} configured server(s)");
        }
        if failures > 0 {
            log::warn!("{failures}/{total} configured server(s) failed to connect; continuing with the rest");
        }
    }

    let working_dir = std::env::current_dir().unwrap_or_default();
    let skills = Arc::new(SkillRegistry::new(&working_dir, &config.skill_paths));

    Ok(AggregatorServer::new(manager, skills))
}
