//! # Arena Events
//!
//! Host-independent lifecycle engine for arena PvP events: one event at a
//! time moves through Open → Prestarting → Started → Finished while the
//! engine handles team assignment, spawning, respawns, scoring and restoring
//! every player's pre-event state afterwards.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ARENA EVENTS                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  manager.rs      - Single event slot, commands, job dispatch │
//! │  settings.rs     - Timers, rewards, messages (JSON)          │
//! │                                                              │
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  └── scheduler.rs- Cooperative timer / step queue            │
//! │                                                              │
//! │  event/          - The engine (host-independent)             │
//! │  ├── orchestrator.rs - Lifecycle state machine               │
//! │  ├── policy.rs   - Mode capability trait + registry          │
//! │  ├── config.rs   - Event definitions and validation          │
//! │  ├── roster.rs   - Participants, waiting list, balancing     │
//! │  ├── participant.rs, score.rs, spawn.rs, timer.rs, notice.rs │
//! │                                                              │
//! │  host/           - Collaborator boundary                     │
//! │  ├── world.rs    - World side effects                        │
//! │  ├── restore.rs  - Staged player restoration                 │
//! │  ├── stats.rs    - Persistent statistics                     │
//! │  ├── definitions.rs - Saved event definitions                │
//! │  └── driver.rs   - tokio interval driver                     │
//! │                                                              │
//! │  modes/          - Deathmatch, team deathmatch               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Time
//!
//! The engine never reads a clock. The host calls
//! [`EventManager::advance`] with elapsed milliseconds and every countdown,
//! respawn tick and restore retry runs from there, so whole events replay
//! identically in tests.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod event;
pub mod host;
pub mod manager;
pub mod modes;
pub mod settings;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use core::scheduler::{Millis, SECOND};
pub use event::{EventConfig, EventStatus, ModePolicy, PlayerId, Team};
pub use host::world::WorldActions;
pub use manager::{CommandError, EventManager, InitError, OpenError};
pub use settings::ManagerSettings;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Damage immunity after every spawn (seconds)
pub const INVINCIBILITY_SECS: u64 = 3;

/// Damage contributions older than this earn no assist (seconds)
pub const ASSIST_WINDOW_SECS: u64 = 3;

/// Grace period outside the arena zone (seconds)
pub const OUT_OF_BOUNDS_SECS: u32 = 10;
