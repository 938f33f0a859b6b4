//! Cohort persistence collaborator.
//!
//! The store owns the data that outlives sessions: per player, the cohort
//! map from the last settled evaluation and the raw enrolled-values
//! snapshot. Reads return `None` until the store has loaded that player's
//! record — absent is semantically distinct from an empty map, and the
//! engine turns absence into the `Pending` eligibility state.

use crate::error::EngineResult;
use async_trait::async_trait;
use splitflag_types::{ConfigValue, PlayerId};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// External persistence for cohort assignment state.
#[async_trait]
pub trait CohortStore: Send + Sync {
    /// Last settled cohort map, or `None` if the player's record has not
    /// loaded yet.
    async fn eligibility(&self, player: PlayerId) -> Option<HashMap<String, bool>>;

    /// Overwrites the player's cohort map.
    async fn set_eligibility(
        &self,
        player: PlayerId,
        cohorts: HashMap<String, bool>,
    ) -> EngineResult<()>;

    /// Raw (pre-reconciliation) enrolled treatment values, or `None` if not
    /// loaded yet.
    async fn enrolled_values(&self, player: PlayerId) -> Option<HashMap<String, ConfigValue>>;

    /// Overwrites the player's enrolled-values snapshot wholesale.
    async fn set_enrolled_values(
        &self,
        player: PlayerId,
        values: HashMap<String, ConfigValue>,
    ) -> EngineResult<()>;
}

#[derive(Debug, Default, Clone)]
struct CohortRecord {
    eligibility: HashMap<String, bool>,
    enrolled_values: HashMap<String, ConfigValue>,
}

/// In-memory cohort store for tests and demos.
///
/// A player's record is absent until `seed` (or a write) creates it, which
/// models the "not yet loaded" state of a real datastore.
#[derive(Debug, Default)]
pub struct MemoryCohortStore {
    records: Mutex<HashMap<PlayerId, CohortRecord>>,
}

impl MemoryCohortStore {
    /// Creates an empty store with no player records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a player's record as loaded (empty) if it does not exist.
    pub async fn seed(&self, player: PlayerId) {
        self.records.lock().await.entry(player).or_default();
    }

    /// Seeds a player's record with explicit cohort data.
    pub async fn seed_with(
        &self,
        player: PlayerId,
        eligibility: HashMap<String, bool>,
        enrolled_values: HashMap<String, ConfigValue>,
    ) {
        self.records.lock().await.insert(
            player,
            CohortRecord {
                eligibility,
                enrolled_values,
            },
        );
    }

    /// Drops a player's record, returning it to the "not loaded" state.
    pub async fn unload(&self, player: PlayerId) {
        self.records.lock().await.remove(&player);
    }
}

#[async_trait]
impl CohortStore for MemoryCohortStore {
    async fn eligibility(&self, player: PlayerId) -> Option<HashMap<String, bool>> {
        self.records
            .lock()
            .await
            .get(&player)
            .map(|r| r.eligibility.clone())
    }

    async fn set_eligibility(
        &self,
        player: PlayerId,
        cohorts: HashMap<String, bool>,
    ) -> EngineResult<()> {
        self.records.lock().await.entry(player).or_default().eligibility = cohorts;
        Ok(())
    }

    async fn enrolled_values(&self, player: PlayerId) -> Option<HashMap<String, ConfigValue>> {
        self.records
            .lock()
            .await
            .get(&player)
            .map(|r| r.enrolled_values.clone())
    }

    async fn set_enrolled_values(
        &self,
        player: PlayerId,
        values: HashMap<String, ConfigValue>,
    ) -> EngineResult<()> {
        self.records
            .lock()
            .await
            .entry(player)
            .or_default()
            .enrolled_values = values;
        Ok(())
    }
}
