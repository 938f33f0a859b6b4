//! Core type definitions for Splitflag.
//!
//! This crate defines the fundamental, engine-agnostic types used throughout
//! the resolution core:
//! - Player identifiers (UUID v7)
//! - Configuration key definitions and eligibility specs
//! - Structural value comparison and the default reconciler
//!
//! Evaluators, collaborator traits, and the session machinery belong in
//! `splitflag-engine`, not here.

mod definition;
mod ids;
mod value;

pub use definition::{EligibilitySpec, KeyDefinition, KeyScope};
pub use ids::PlayerId;
pub use value::{reconcile, structural_eq, ConfigValue};
