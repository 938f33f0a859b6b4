//! Remote-config transport collaborator.
//!
//! The source serves the server-wide (control) and per-player (treatment)
//! values published by the experimentation backend. The engine is
//! pull-driven: when the host's transport layer signals "update available"
//! it calls `ConfigEngine::resolve` or `refresh_all`, and the source is
//! re-read during that pass.

use async_trait::async_trait;
use splitflag_types::{ConfigValue, PlayerId};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Remote source of published config values.
#[async_trait]
pub trait RemoteConfigSource: Send + Sync {
    /// Server-wide value for a key, if one is published.
    async fn server_value(&self, key: &str) -> Option<ConfigValue>;

    /// Per-player treatment value for a key, if one is published.
    async fn player_value(&self, key: &str, player: PlayerId) -> Option<ConfigValue>;
}

/// Fixed-table config source for tests and demos.
#[derive(Debug, Default)]
pub struct StaticConfigSource {
    server: RwLock<HashMap<String, ConfigValue>>,
    per_player: RwLock<HashMap<(PlayerId, String), ConfigValue>>,
}

impl StaticConfigSource {
    /// Creates a source with no published values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes (or replaces) a server-wide value.
    pub async fn set_server_value(&self, key: impl Into<String>, value: ConfigValue) {
        self.server.write().await.insert(key.into(), value);
    }

    /// Removes a server-wide value.
    pub async fn clear_server_value(&self, key: &str) {
        self.server.write().await.remove(key);
    }

    /// Publishes (or replaces) a per-player treatment value.
    pub async fn set_player_value(
        &self,
        player: PlayerId,
        key: impl Into<String>,
        value: ConfigValue,
    ) {
        self.per_player
            .write()
            .await
            .insert((player, key.into()), value);
    }

    /// Removes a per-player treatment value.
    pub async fn clear_player_value(&self, player: PlayerId, key: &str) {
        self.per_player
            .write()
            .await
            .remove(&(player, key.to_string()));
    }
}

#[async_trait]
impl RemoteConfigSource for StaticConfigSource {
    async fn server_value(&self, key: &str) -> Option<ConfigValue> {
        self.server.read().await.get(key).cloned()
    }

    async fn player_value(&self, key: &str, player: PlayerId) -> Option<ConfigValue> {
        self.per_player
            .read()
            .await
            .get(&(player, key.to_string()))
            .cloned()
    }
}
