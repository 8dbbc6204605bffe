//! Client Manager (component G): concurrent lifecycle management of
//! downstream MCP connections across stdio/HTTP/SSE.

use std::sync::Arc;
use std::time::Duration;

use config::ServerConfig;
use dashmap::DashMap;
use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::client::ClientConnection;
use crate::error::ClientError;

/// Owns every currently-connected downstream server.
///
/// The "no duplicate name" invariant is checked and the insert performed
/// under the same [`DashMap`] shard lock, so concurrent `connect_to_server`
/// calls for the same name cannot both succeed (§4.G, §5).
#[derive(Default)]
pub struct ClientManager {
    clients: DashMap<String, Arc<ClientConnection>>,
    /// Server names in the order they were configured, independent of
    /// connection success or dial timing (§5: "servers appear in the order
    /// they were configured").
    order: Vec<String>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Like [`ClientManager::new`], but remembers `order` as the
    /// configured-server ordering for [`ClientManager::configured_order`].
    pub fn with_order(order: Vec<String>) -> Self {
        Self { clients: DashMap::new(), order }
    }

    /// Configured server names, in configured order, regardless of which of
    /// them are currently connected.
    pub fn configured_order(&self) -> &[String] {
        &self.order
    }

    /// Dials every server in `configs` concurrently. Returns the number of
    /// servers that failed to connect (each logged individually); the
    /// caller decides whether an all-failed startup is fatal (§5, §7).
    pub async fn connect_all(&self, configs: impl IntoIterator<Item = ServerConfig>) -> usize {
        let mut dials = FuturesUnordered::new();

        for config in configs {
            dials.push(async move {
                let name = config.name.clone();
                let timeout = Duration::from_millis(config.timeout_ms);
                let result = ClientConnection::connect(config, timeout).await;
                (name, result)
            });
        }

        let mut failures = 0;
        while let Some((name, result)) = dials.next().await {
            match result {
                Ok(connection) => {
                    self.clients.insert(name, Arc::new(connection));
                }
                Err(e) => {
                    log::warn!("failed to connect to server '{name}': {e}");
                    failures += 1;
                }
            }
        }

        failures
    }

    /// Connects a single server, failing if `config.name` is already
    /// connected (§4.G).
    pub async fn connect_to_server(&self, config: ServerConfig) -> Result<(), ClientError> {
        let name = config.name.clone();

        if self.clients.contains_key(&name) {
            return Err(ClientError::AlreadyConnected(name));
        }

        let timeout = Duration::from_millis(config.timeout_ms);

        let connection = ClientConnection::connect(config, timeout)
            .await
            .map_err(|e| ClientError::ConnectFailed(name.clone(), e))?;

        match self.clients.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                log::debug!("lost the race connecting to '{name}', another caller won");
                Err(ClientError::AlreadyConnected(name))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(connection));
                Ok(())
            }
        }
    }

    pub fn get_client(&self, name: &str) -> Option<Arc<ClientConnection>> {
        self.clients.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn get_all_clients(&self) -> Vec<Arc<ClientConnection>> {
        self.clients.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.clients.contains_key(name)
    }

    pub fn server_names(&self) -> Vec<String> {
        self.clients.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Disconnects and closes a single server's connection, if present.
    pub async fn disconnect_server(&self, name: &str) {
        if let Some((_, connection)) = self.clients.remove(name) {
            if let Some(connection) = Arc::into_inner(connection) {
                connection.close().await;
            }
        }
    }

    /// Concurrently closes every connection (§4.G shutdown discipline).
    pub async fn disconnect_all(&self) {
        let names = self.server_names();
        let closes = FuturesUnordered::new();

        for name in names {
            if let Some((_, connection)) = self.clients.remove(&name) {
                closes.push(async move {
                    if let Some(connection) = Arc::into_inner(connection) {
                        connection.close().await;
                    }
                });
            }
        }

        closes.collect::<Vec<()>>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconnected_server_lookups_return_none() {
        let manager = ClientManager::new();
        assert!(manager.get_client("missing").is_none());
        assert!(!manager.is_connected("missing"));
    }

    #[tokio::test]
    async fn disconnect_all_on_empty_manager_is_a_no_op() {
        let manager = ClientManager::new();
        manager.disconnect_all().await;
        assert!(manager.server_names().is_empty());
    }
}
