//! Config Merger (§4.C): combines the local resolved config with zero or
//! more successfully-fetched remote configs, one at a time, in the order
//! they appear in `remoteConfigs`.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::model::{MergeStrategy, ResolvedConfig, ServerConfig, TransportConfig};

/// Merges `remote` into `local` according to `strategy`, returning the
/// combined server map. `local` always wins ties unless `strategy` says
/// otherwise. Local servers keep their configured order; any remote-only
/// servers are appended after them, in the remote's own order (§5).
pub fn merge(local: ResolvedConfig, remote: ResolvedConfig, strategy: MergeStrategy) -> ResolvedConfig {
    let servers = match strategy {
        MergeStrategy::LocalPriority => {
            let mut merged = local.servers;
            for (name, server) in remote.servers {
                merged.entry(name).or_insert(server);
            }
            merged
        }
        MergeStrategy::RemotePriority => {
            let mut merged = local.servers;
            for (name, server) in remote.servers {
                merged.insert(name, server);
            }
            merged
        }
        MergeStrategy::MergeDeep => merge_deep(local.servers, remote.servers),
    };

    // Remote-supplied skill paths are appended after local ones, preserving
    // configured-path order (§5).
    let mut skill_paths = local.skill_paths;
    skill_paths.extend(remote.skill_paths);

    ResolvedConfig { servers, skill_paths }
}

fn merge_deep(local: IndexMap<String, ServerConfig>, mut remote: IndexMap<String, ServerConfig>) -> IndexMap<String, ServerConfig> {
    let mut merged = IndexMap::new();

    for (name, local_server) in local {
        match remote.shift_remove(&name) {
            Some(remote_server) => merged.insert(name, merge_one_deep(local_server, remote_server)),
            None => merged.insert(name, local_server),
        };
    }

    // Anything left in `remote` existed only on the remote side; appended
    // after the local-configured servers, in the remote's own order (§5).
    merged.extend(remote);

    merged
}

fn merge_one_deep(local: ServerConfig, remote: ServerConfig) -> ServerConfig {
    let transport = match (local.transport, remote.transport) {
        (TransportConfig::Stdio { command, args, env: local_env }, TransportConfig::Stdio { env: remote_env, .. }) => {
            TransportConfig::Stdio {
                command,
                args,
                env: merge_maps(local_env, remote_env),
            }
        }
        (
            TransportConfig::Http { url, headers: local_headers },
            TransportConfig::Http { headers: remote_headers, .. },
        ) => TransportConfig::Http {
            url,
            headers: merge_maps(local_headers, remote_headers),
        },
        (
            TransportConfig::Sse { url, headers: local_headers },
            TransportConfig::Sse { headers: remote_headers, .. },
        ) => TransportConfig::Sse {
            url,
            headers: merge_maps(local_headers, remote_headers),
        },
        // Transport kind disagrees between local and remote: local scalars
        // win outright, matching "prefer local scalar fields" in §4.C.
        (local_transport, _) => local_transport,
    };

    ServerConfig {
        name: local.name,
        transport,
        instruction: local.instruction,
        tool_blacklist: local.tool_blacklist,
        omit_tool_description: local.omit_tool_description,
        prompts: local.prompts,
        timeout_ms: local.timeout_ms,
    }
}

fn merge_maps(local: HashMap<String, String>, remote: HashMap<String, String>) -> HashMap<String, String> {
    let mut merged = remote;
    merged.extend(local);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn stdio_server(name: &str, env: &[(&str, &str)]) -> ServerConfig {
        ServerConfig {
            name: name.to_string(),
            transport: TransportConfig::Stdio {
                command: "cmd".to_string(),
                args: vec![],
                env: env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            },
            instruction: None,
            tool_blacklist: Default::default(),
            omit_tool_description: false,
            prompts: Default::default(),
            timeout_ms: 10_000,
        }
    }

    fn config_with(servers: Vec<ServerConfig>) -> ResolvedConfig {
        ResolvedConfig {
            servers: servers.into_iter().map(|s| (s.name.clone(), s)).collect(),
            skill_paths: vec![],
        }
    }

    #[test]
    fn local_priority_prefers_local_on_conflict() {
        let local = config_with(vec![stdio_server("s", &[("A", "local")])]);
        let remote = config_with(vec![stdio_server("s", &[("A", "remote")])]);

        let merged = merge(local, remote, MergeStrategy::LocalPriority);
        match &merged.servers["s"].transport {
            TransportConfig::Stdio { env, .. } => assert_eq!(env["A"], "local"),
            _ => panic!(),
        }
    }

    #[test]
    fn remote_priority_prefers_remote_on_conflict() {
        let local = config_with(vec![stdio_server("s", &[("A", "local")])]);
        let remote = config_with(vec![stdio_server("s", &[("A", "remote")])]);

        let merged = merge(local, remote, MergeStrategy::RemotePriority);
        match &merged.servers["s"].transport {
            TransportConfig::Stdio { env, .. } => assert_eq!(env["A"], "remote"),
            _ => panic!(),
        }
    }

    #[test]
    fn merge_deep_combines_env_maps_local_wins_conflicts() {
        let local = config_with(vec![stdio_server("s", &[("A", "1"), ("B", "local")])]);
        let remote = config_with(vec![stdio_server("s", &[("B", "remote"), ("C", "3")])]);

        let merged = merge(local, remote, MergeStrategy::MergeDeep);
        match &merged.servers["s"].transport {
            TransportConfig::Stdio { env, .. } => {
                let mut expected = HashMap::new();
                expected.insert("A".to_string(), "1".to_string());
                expected.insert("B".to_string(), "local".to_string());
                expected.insert("C".to_string(), "3".to_string());
                assert_eq!(env, &expected);
            }
            _ => panic!(),
        }
    }

    #[test]
    fn servers_unique_to_one_side_pass_through_unchanged() {
        let local = config_with(vec![stdio_server("only-local", &[])]);
        let remote = config_with(vec![stdio_server("only-remote", &[])]);

        let merged = merge(local, remote, MergeStrategy::MergeDeep);
        assert!(merged.servers.contains_key("only-local"));
        assert!(merged.servers.contains_key("only-remote"));
    }
}
