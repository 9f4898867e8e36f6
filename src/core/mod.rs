//! Core deterministic primitives.
//!
//! Seeded randomness and the cooperative scheduler. Nothing in here knows
//! about events or players.

pub mod rng;
pub mod scheduler;

// Re-export core types
pub use rng::{DeterministicRng, derive_event_seed};
pub use scheduler::{Scheduler, Due, TaskId, Millis, SECOND, secs};
