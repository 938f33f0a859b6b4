//! The resolution engine — sessions, eligibility, and value precedence.
//!
//! `ConfigEngine` owns the key registry, the evaluator registry, and the
//! per-player sessions. Collaborators (remote-config source, cohort store)
//! are injected and awaited only at the boundaries; everything in between
//! is an ordinary synchronous pass over the registered keys.

use crate::eligibility::{
    evaluate_pass, EligibilityEvaluator, EligibilityState, EvalOutcome, StoredCohorts,
};
use crate::error::{EngineError, EngineResult};
use crate::persister::{snapshot_drifted, PersistCommand, PersistQueue};
use crate::registry::KeyRegistry;
use crate::session::PlayerSession;
use crate::source::RemoteConfigSource;
use crate::store::CohortStore;
use splitflag_types::{reconcile, ConfigValue, KeyDefinition, KeyScope, PlayerId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Configuration for the resolution engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Serve `test_value`s ahead of control/treatment. Set when running
    /// inside the studio/test environment.
    pub studio_mode: bool,
}

/// Per-player config resolution with A/B cohort assignment.
///
/// Registration (`register_key`, `register_evaluator`, `set_persistence`)
/// happens once at startup, before sessions begin; afterwards the registry
/// and collaborators are read-only. Per-player state lives exclusively in
/// that player's session and is dropped atomically by `stop_session`.
pub struct ConfigEngine {
    config: EngineConfig,
    registry: KeyRegistry,
    evaluators: HashMap<String, Arc<dyn EligibilityEvaluator>>,
    source: Arc<dyn RemoteConfigSource>,
    store: Option<Arc<dyn CohortStore>>,
    persist: Option<PersistQueue>,
    writer: Option<JoinHandle<()>>,
    sessions: Arc<RwLock<HashMap<PlayerId, PlayerSession>>>,
}

impl ConfigEngine {
    /// Creates an engine over the given remote-config source.
    pub fn new(source: Arc<dyn RemoteConfigSource>, config: EngineConfig) -> Self {
        Self {
            config,
            registry: KeyRegistry::new(),
            evaluators: HashMap::new(),
            source,
            store: None,
            persist: None,
            writer: None,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    // ── Registration ─────────────────────────────────────────────

    /// Registers a key definition. Fails on duplicate names.
    pub fn register_key(&mut self, definition: KeyDefinition) -> EngineResult<()> {
        self.registry.register(definition)
    }

    /// Looks up a key definition.
    pub fn key(&self, name: &str) -> EngineResult<Arc<KeyDefinition>> {
        self.registry.get(name)
    }

    /// Returns every registered key definition.
    pub fn all_keys(&self) -> Vec<Arc<KeyDefinition>> {
        self.registry.all().values().cloned().collect()
    }

    /// Registers the evaluator for an eligibility kind. Re-registering a
    /// kind replaces the evaluator.
    pub fn register_evaluator(
        &mut self,
        kind: impl Into<String>,
        evaluator: Arc<dyn EligibilityEvaluator>,
    ) {
        self.evaluators.insert(kind.into(), evaluator);
    }

    /// Configures cohort persistence and spawns its writer task.
    pub fn set_persistence(&mut self, store: Arc<dyn CohortStore>) {
        let (queue, handle) = PersistQueue::spawn(store.clone());
        self.store = Some(store);
        self.persist = Some(queue);
        self.writer = Some(handle);
    }

    /// Drains the persistence queue and stops the writer task.
    pub async fn shutdown(&mut self) {
        self.persist = None;
        if let Some(handle) = self.writer.take() {
            if let Err(e) = handle.await {
                warn!("persist writer ended abnormally: {e}");
            }
        }
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Starts a session for a player and runs the initial resolution pass.
    /// An existing session for the player is replaced wholesale.
    pub async fn start_session(&self, player: PlayerId) -> EngineResult<()> {
        self.sessions
            .write()
            .await
            .insert(player, PlayerSession::new());
        debug!(%player, "session started");
        self.resolve(player).await?;
        Ok(())
    }

    /// Stops a player's session, dropping overrides, cached eligibility,
    /// resolved config, and the snapshot in one step. Returns whether a
    /// session existed.
    pub async fn stop_session(&self, player: PlayerId) -> bool {
        let removed = self.sessions.write().await.remove(&player).is_some();
        if removed {
            debug!(%player, "session stopped");
        }
        removed
    }

    /// Returns the players with an active session.
    pub async fn active_players(&self) -> Vec<PlayerId> {
        self.sessions.read().await.keys().copied().collect()
    }

    // ── Resolution ───────────────────────────────────────────────

    /// Runs a full resolution pass for a player and returns the resolved
    /// value for every registered key.
    pub async fn resolve(&self, player: PlayerId) -> EngineResult<HashMap<String, ConfigValue>> {
        if !self.sessions.read().await.contains_key(&player) {
            return Err(EngineError::SessionNotInitialized(player));
        }

        let controls = self.control_values().await;
        let cohorts = self.settle_eligibility(player, &controls).await?;

        let overrides = {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(&player)
                .ok_or(EngineError::SessionNotInitialized(player))?;
            session.overrides.clone()
        };

        let mut resolved = HashMap::with_capacity(self.registry.len());
        let mut snapshot: HashMap<String, ConfigValue> = HashMap::new();

        for definition in self.registry.all().values() {
            let name = &definition.name;
            let control = &controls[name.as_str()];

            if definition.scope == KeyScope::Server {
                resolved.insert(name.clone(), control.clone());
                continue;
            }

            if let Some(value) = overrides.get(name) {
                resolved.insert(name.clone(), reconcile(value, &definition.default_value));
                continue;
            }

            if self.config.studio_mode {
                if let Some(test_value) = &definition.test_value {
                    resolved.insert(name.clone(), reconcile(test_value, &definition.default_value));
                    continue;
                }
            }

            let eligible = cohorts.get(name.as_str()).copied().unwrap_or(false);
            if eligible {
                if let Some(treatment) = self.source.player_value(name, player).await {
                    // The snapshot records the treatment as published, before
                    // reconciliation; rollback detection compares against it.
                    snapshot.insert(name.clone(), treatment.clone());
                    resolved.insert(name.clone(), reconcile(&treatment, &definition.default_value));
                    continue;
                }
            }

            resolved.insert(name.clone(), control.clone());
        }

        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&player) else {
            // Session stopped while we were at a collaborator boundary; the
            // pass is discarded.
            return Err(EngineError::SessionNotInitialized(player));
        };

        let drifted = session
            .last_stored_snapshot
            .as_ref()
            .is_some_and(|previous| snapshot_drifted(previous, &snapshot));
        if drifted {
            if let Some(queue) = &self.persist {
                info!(%player, keys = snapshot.len(), "enrolled values drifted, scheduling write");
                queue.push(PersistCommand::EnrolledValues {
                    player,
                    values: snapshot.clone(),
                });
            }
            session.last_stored_snapshot = Some(snapshot);
        }
        session.resolved = resolved.clone();

        Ok(resolved)
    }

    /// Returns the most recently resolved config for a player.
    pub async fn resolved_config(&self, player: PlayerId) -> EngineResult<HashMap<String, ConfigValue>> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(&player)
            .ok_or(EngineError::SessionNotInitialized(player))?;
        Ok(session.resolved.clone())
    }

    /// Current eligibility state for a player's session.
    pub async fn eligibility_state(&self, player: PlayerId) -> EngineResult<EligibilityState> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(&player)
            .ok_or(EngineError::SessionNotInitialized(player))?;
        Ok(session.eligibility.clone())
    }

    /// Sets (or with `None`, clears) an override for a player-scoped key.
    /// Triggers a resolution pass.
    pub async fn set_override(
        &self,
        player: PlayerId,
        key: &str,
        value: Option<ConfigValue>,
    ) -> EngineResult<()> {
        let definition = self.registry.get(key)?;
        if definition.scope == KeyScope::Server {
            return Err(EngineError::InvalidOverrideScope(key.to_string()));
        }

        {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&player)
                .ok_or(EngineError::SessionNotInitialized(player))?;
            match value {
                Some(v) => {
                    session.overrides.insert(key.to_string(), v);
                }
                None => {
                    session.overrides.remove(key);
                }
            }
        }

        self.resolve(player).await?;
        Ok(())
    }

    /// The server-wide (control) value for a key: the published server value
    /// if any, else the default, reconciled against the default.
    pub async fn server_wide_value(&self, key: &str) -> EngineResult<ConfigValue> {
        let definition = self.registry.get(key)?;
        let base = self
            .source
            .server_value(key)
            .await
            .unwrap_or_else(|| definition.default_value.clone());
        Ok(reconcile(&base, &definition.default_value))
    }

    /// Re-resolves every active session. Called by the host when its
    /// transport signals that updated values are available.
    pub async fn refresh_all(&self) {
        for player in self.active_players().await {
            if let Err(e) = self.resolve(player).await {
                warn!(%player, "refresh failed: {e}");
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────

    /// Control value (server ?? default, reconciled) for every key.
    async fn control_values(&self) -> HashMap<String, ConfigValue> {
        let mut controls = HashMap::with_capacity(self.registry.len());
        for definition in self.registry.all().values() {
            let base = self
                .source
                .server_value(&definition.name)
                .await
                .unwrap_or_else(|| definition.default_value.clone());
            controls.insert(
                definition.name.clone(),
                reconcile(&base, &definition.default_value),
            );
        }
        controls
    }

    /// Returns the session's cohort map, evaluating if not yet settled.
    /// A pending pass yields an empty map: no key is treated as eligible
    /// until the state settles.
    async fn settle_eligibility(
        &self,
        player: PlayerId,
        controls: &HashMap<String, ConfigValue>,
    ) -> EngineResult<BTreeMap<String, bool>> {
        {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(&player)
                .ok_or(EngineError::SessionNotInitialized(player))?;
            if let Some(map) = session.eligibility.settled() {
                return Ok(map.clone());
            }
        }

        let (outcome, stored_values) = match &self.store {
            None => (
                evaluate_pass(&self.registry, &self.evaluators, player, None, controls)?,
                None,
            ),
            Some(store) => {
                let eligibility = store.eligibility(player).await;
                let enrolled = store.enrolled_values(player).await;
                match (eligibility, enrolled) {
                    (Some(elig), Some(values)) => {
                        let outcome = evaluate_pass(
                            &self.registry,
                            &self.evaluators,
                            player,
                            Some(StoredCohorts {
                                eligibility: &elig,
                                enrolled_values: &values,
                            }),
                            controls,
                        )?;
                        (outcome, Some(values))
                    }
                    // Either record still absent: the whole pass is pending,
                    // no key settles.
                    _ => (EvalOutcome::Pending, None),
                }
            }
        };

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&player)
            .ok_or(EngineError::SessionNotInitialized(player))?;

        // Another pass may have settled while this one was at a collaborator
        // boundary; the frozen map wins and this pass's result is discarded.
        if let Some(map) = session.eligibility.settled() {
            return Ok(map.clone());
        }

        match outcome {
            EvalOutcome::Pending => {
                debug!(%player, "eligibility pending, will retry on next trigger");
                session.eligibility = EligibilityState::Pending;
                Ok(BTreeMap::new())
            }
            EvalOutcome::Settled(map) => {
                info!(%player, keys = map.len(), "eligibility settled");
                session.eligibility = EligibilityState::Settled(map.clone());
                if let Some(values) = stored_values {
                    session.last_stored_snapshot = Some(values);
                }
                if let Some(queue) = &self.persist {
                    queue.push(PersistCommand::Eligibility {
                        player,
                        cohorts: map.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                    });
                }
                Ok(map)
            }
        }
    }
}
