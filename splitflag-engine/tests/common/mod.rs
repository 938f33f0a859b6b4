//! Shared test helpers for engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use splitflag_engine::{
    CohortStore, ConfigEngine, EligibilityEvaluator, EligibilityStatus, EngineConfig,
    EngineResult, MemoryCohortStore, StaticConfigSource,
};
use splitflag_types::{ConfigValue, EligibilitySpec, PlayerId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Evaluator that always returns the same status.
pub struct FixedEvaluator(pub EligibilityStatus);

impl EligibilityEvaluator for FixedEvaluator {
    fn evaluate(&self, _player: PlayerId, _spec: &EligibilitySpec) -> EligibilityStatus {
        self.0
    }
}

/// Evaluator that returns a fixed status and counts its calls.
pub struct CountingEvaluator {
    status: EligibilityStatus,
    calls: AtomicUsize,
}

impl CountingEvaluator {
    pub fn new(status: EligibilityStatus) -> Arc<Self> {
        Arc::new(Self {
            status,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EligibilityEvaluator for CountingEvaluator {
    fn evaluate(&self, _player: PlayerId, _spec: &EligibilitySpec) -> EligibilityStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.status
    }
}

/// Evaluator that answers `Pending` a fixed number of times, then settles
/// on a final status. Models an external check whose data arrives late.
pub struct LateEvaluator {
    pending_answers: usize,
    eventual: EligibilityStatus,
    calls: AtomicUsize,
}

impl LateEvaluator {
    pub fn new(pending_answers: usize, eventual: EligibilityStatus) -> Arc<Self> {
        Arc::new(Self {
            pending_answers,
            eventual,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EligibilityEvaluator for LateEvaluator {
    fn evaluate(&self, _player: PlayerId, _spec: &EligibilitySpec) -> EligibilityStatus {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.pending_answers {
            EligibilityStatus::Pending
        } else {
            self.eventual
        }
    }
}

/// Enables log output in tests when RUST_LOG is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Engine over a fresh static source, no persistence.
pub fn make_engine() -> (ConfigEngine, Arc<StaticConfigSource>) {
    init_tracing();
    let source = Arc::new(StaticConfigSource::new());
    let engine = ConfigEngine::new(source.clone(), EngineConfig::default());
    (engine, source)
}

/// Engine in studio mode over a fresh static source.
pub fn make_studio_engine() -> (ConfigEngine, Arc<StaticConfigSource>) {
    init_tracing();
    let source = Arc::new(StaticConfigSource::new());
    let engine = ConfigEngine::new(source.clone(), EngineConfig { studio_mode: true });
    (engine, source)
}

/// Cohort store that counts writes, for asserting what got scheduled.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryCohortStore,
    eligibility_writes: AtomicUsize,
    enrolled_writes: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn eligibility_writes(&self) -> usize {
        self.eligibility_writes.load(Ordering::SeqCst)
    }

    pub fn enrolled_writes(&self) -> usize {
        self.enrolled_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CohortStore for RecordingStore {
    async fn eligibility(&self, player: PlayerId) -> Option<HashMap<String, bool>> {
        self.inner.eligibility(player).await
    }

    async fn set_eligibility(
        &self,
        player: PlayerId,
        cohorts: HashMap<String, bool>,
    ) -> EngineResult<()> {
        self.eligibility_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_eligibility(player, cohorts).await
    }

    async fn enrolled_values(&self, player: PlayerId) -> Option<HashMap<String, ConfigValue>> {
        self.inner.enrolled_values(player).await
    }

    async fn set_enrolled_values(
        &self,
        player: PlayerId,
        values: HashMap<String, ConfigValue>,
    ) -> EngineResult<()> {
        self.enrolled_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_enrolled_values(player, values).await
    }
}

/// Lets the spawned persist writer run. The test runtime is single-threaded,
/// so parking this task a few times is enough for the writer to drain
/// everything queued so far.
pub async fn drain_writer() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}
