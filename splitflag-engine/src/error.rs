//! Error types for the resolution engine.

use splitflag_types::PlayerId;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in engine operations.
///
/// All variants except `Persistence` indicate programmer or configuration
/// error and are raised immediately on the offending call. Transient
/// conditions (collaborator data not yet loaded) are never errors; they are
/// the `Pending` eligibility state and retry on the next trigger.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A key with this name is already registered.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// No key with this name is registered.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// An eligibility spec references an evaluator kind nobody registered.
    #[error("unknown eligibility kind: {0}")]
    UnknownEligibilityKind(String),

    /// Overrides apply to player-scoped keys only.
    #[error("cannot override server-scoped key: {0}")]
    InvalidOverrideScope(String),

    /// The player has no active session.
    #[error("no active session for player {0}")]
    SessionNotInitialized(PlayerId),

    /// Persistence collaborator failure. Produced by store implementations;
    /// the engine logs failed writes and moves on.
    #[error("persistence error: {0}")]
    Persistence(String),
}
