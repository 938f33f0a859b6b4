//! Per-player config resolution and A/B cohort engine.
//!
//! Splitflag resolves, per player and per configuration key, the effective
//! value to serve, while keeping each player's experiment cohort stable
//! within a session and across restarts.
//!
//! # Components
//!
//! - **Registry**: immutable key definitions with validated lookups
//! - **Eligibility**: tri-state per-key cohort state machine with external
//!   evaluators and persisted cohort data
//! - **Engine**: layered value precedence (override → test value →
//!   treatment/control) producing the full resolved map per player
//! - **Persister**: drift detection over the enrolled-values snapshot,
//!   writes deferred through a queue to a dedicated writer task
//!
//! # Cohort protocol
//!
//! On a player's first resolution pass the engine reads the persisted
//! cohort data. A previously enrolled player whose stored treatment value
//! still differs from the current control value stays enrolled without
//! re-evaluation (rollback protection); once control catches up with the
//! stored treatment the experiment is considered ended and the evaluator is
//! consulted fresh. Missing persisted data leaves the whole pass pending —
//! it retries on the next trigger, and no key settles early.
//!
//! # Example
//!
//! ```no_run
//! use splitflag_engine::{ConfigEngine, EngineConfig, StaticConfigSource};
//! use splitflag_types::KeyDefinition;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), splitflag_engine::EngineError> {
//! let source = Arc::new(StaticConfigSource::new());
//! let mut engine = ConfigEngine::new(source, EngineConfig::default());
//! engine.register_key(KeyDefinition::player("max_speed", json!(16)))?;
//!
//! let player = splitflag_types::PlayerId::new();
//! engine.start_session(player).await?;
//! let config = engine.resolved_config(player).await?;
//! assert_eq!(config["max_speed"], json!(16));
//! # Ok(())
//! # }
//! ```

mod eligibility;
mod engine;
mod error;
mod persister;
mod registry;
mod session;
mod source;
mod store;

pub use eligibility::{EligibilityEvaluator, EligibilityState, EligibilityStatus};
pub use engine::{ConfigEngine, EngineConfig};
pub use error::{EngineError, EngineResult};
pub use registry::KeyRegistry;
pub use source::{RemoteConfigSource, StaticConfigSource};
pub use store::{CohortStore, MemoryCohortStore};
