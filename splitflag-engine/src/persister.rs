//! Deferred persistence writes.
//!
//! Resolution passes never call the store directly: they push commands onto
//! an mpsc channel consumed by a dedicated writer task. The channel hop
//! guarantees at least one scheduling turn between the pass that detected
//! drift and the store call, so a write can never re-enter state the pass
//! is still reading. Writes are fire-and-forget: failures are logged and
//! re-delivery happens only via the next drift detection.

use crate::store::CohortStore;
use splitflag_types::{structural_eq, ConfigValue, PlayerId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A single scheduled write. Every write is a wholesale overwrite.
#[derive(Debug)]
pub(crate) enum PersistCommand {
    Eligibility {
        player: PlayerId,
        cohorts: HashMap<String, bool>,
    },
    EnrolledValues {
        player: PlayerId,
        values: HashMap<String, ConfigValue>,
    },
}

/// Sender half of the persistence queue.
pub(crate) struct PersistQueue {
    tx: mpsc::UnboundedSender<PersistCommand>,
}

impl PersistQueue {
    /// Spawns the writer task for `store` and returns the queue feeding it.
    pub(crate) fn spawn(store: Arc<dyn CohortStore>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<PersistCommand>();
        let handle = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    PersistCommand::Eligibility { player, cohorts } => {
                        debug!(%player, keys = cohorts.len(), "persisting cohort map");
                        if let Err(e) = store.set_eligibility(player, cohorts).await {
                            warn!(%player, "failed to persist cohort map: {e}");
                        }
                    }
                    PersistCommand::EnrolledValues { player, values } => {
                        debug!(%player, keys = values.len(), "persisting enrolled values");
                        if let Err(e) = store.set_enrolled_values(player, values).await {
                            warn!(%player, "failed to persist enrolled values: {e}");
                        }
                    }
                }
            }
        });
        (Self { tx }, handle)
    }

    /// Enqueues a write for the next scheduling turn.
    pub(crate) fn push(&self, command: PersistCommand) {
        if self.tx.send(command).is_err() {
            warn!("persist writer is gone, dropping write");
        }
    }
}

/// Whether the newly computed enrolled snapshot differs from the last
/// stored one. Key sets and values are compared structurally.
pub(crate) fn snapshot_drifted(
    previous: &HashMap<String, ConfigValue>,
    current: &HashMap<String, ConfigValue>,
) -> bool {
    if previous.len() != current.len() {
        return true;
    }
    for (key, value) in current {
        match previous.get(key) {
            Some(prev) if structural_eq(prev, value) => {}
            _ => return true,
        }
    }
    false
}
