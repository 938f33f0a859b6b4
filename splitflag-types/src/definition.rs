//! Configuration key definitions.

use crate::value::ConfigValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Describes a single configuration key: its scope, default, and the
/// optional experiment attached to it. Immutable after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDefinition {
    pub name: String,
    pub scope: KeyScope,
    /// Whether the resolved value is replicated to clients.
    pub replicated: bool,
    pub default_value: ConfigValue,
    /// Value served instead of control/treatment when running in studio mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_value: Option<ConfigValue>,
    /// Cohort-eligibility spec. Absent means every player gets the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<EligibilitySpec>,
}

impl KeyDefinition {
    /// Creates a player-scoped key with a default value and no experiment.
    pub fn player(name: impl Into<String>, default_value: ConfigValue) -> Self {
        Self {
            name: name.into(),
            scope: KeyScope::Player,
            replicated: false,
            default_value,
            test_value: None,
            eligibility: None,
        }
    }

    /// Creates a server-scoped key with a default value.
    pub fn server(name: impl Into<String>, default_value: ConfigValue) -> Self {
        Self {
            name: name.into(),
            scope: KeyScope::Server,
            replicated: false,
            default_value,
            test_value: None,
            eligibility: None,
        }
    }

    /// Marks the key as replicated to clients.
    #[must_use]
    pub fn replicated(mut self) -> Self {
        self.replicated = true;
        self
    }

    /// Attaches a test value served in studio mode.
    #[must_use]
    pub fn with_test_value(mut self, value: ConfigValue) -> Self {
        self.test_value = Some(value);
        self
    }

    /// Attaches an eligibility spec, making the key an experiment.
    #[must_use]
    pub fn with_eligibility(mut self, spec: EligibilitySpec) -> Self {
        self.eligibility = Some(spec);
        self
    }
}

/// Whether a key resolves once per server or per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    Server,
    Player,
}

/// Selects and parameterizes a cohort-eligibility evaluator.
///
/// Opaque to the engine except for `kind`, which names the registered
/// evaluator. `params` are interpreted by the evaluator alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilitySpec {
    pub kind: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, ConfigValue>,
}

impl EligibilitySpec {
    /// Creates a spec with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: HashMap::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: ConfigValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }
}
