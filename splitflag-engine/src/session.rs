//! Per-player session state.
//!
//! Everything here is created at session start and dropped wholesale at
//! session stop. Removing the session entry from the engine's map is the
//! entire teardown: overrides, cached eligibility, the resolved config, and
//! the snapshot all go at once, and a late collaborator response simply
//! finds no session.

use crate::eligibility::EligibilityState;
use splitflag_types::ConfigValue;
use std::collections::HashMap;

/// In-memory state for one active player session.
#[derive(Debug)]
pub(crate) struct PlayerSession {
    /// Admin/test overrides. Never persisted; highest resolution precedence.
    pub overrides: HashMap<String, ConfigValue>,
    /// Cohort state machine for this session.
    pub eligibility: EligibilityState,
    /// Last enrolled-values snapshot known to be in the store. `None` until
    /// the store record has been read this session; the first read never
    /// triggers a write-back of itself.
    pub last_stored_snapshot: Option<HashMap<String, ConfigValue>>,
    /// Most recent full resolution result.
    pub resolved: HashMap<String, ConfigValue>,
}

impl PlayerSession {
    pub(crate) fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            eligibility: EligibilityState::Uninitialized,
            last_stored_snapshot: None,
            resolved: HashMap::new(),
        }
    }
}
