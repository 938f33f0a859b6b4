//! Key registry — immutable key definitions with validated lookups.
//!
//! Owned by the engine instance rather than held in module-level state, so
//! multiple isolated engines (one per test, for instance) can coexist.

use crate::error::{EngineError, EngineResult};
use splitflag_types::KeyDefinition;
use std::collections::HashMap;
use std::sync::Arc;

/// Holds every registered key definition. Definitions are immutable after
/// registration; registering the same name twice fails.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: HashMap<String, Arc<KeyDefinition>>,
}

impl KeyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a key definition.
    pub fn register(&mut self, definition: KeyDefinition) -> EngineResult<()> {
        if self.keys.contains_key(&definition.name) {
            return Err(EngineError::DuplicateKey(definition.name));
        }
        self.keys
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Looks up a key definition by name.
    pub fn get(&self, name: &str) -> EngineResult<Arc<KeyDefinition>> {
        self.keys
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownKey(name.to_string()))
    }

    /// Returns the full mapping. Iteration order is unspecified.
    pub fn all(&self) -> &HashMap<String, Arc<KeyDefinition>> {
        &self.keys
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
