//! Event engine.
//!
//! Everything here is host-independent: the lifecycle state machine, the
//! participant model, scoreboards and the mode capability interface. World
//! side effects go through [`crate::host::world::WorldActions`].

pub mod config;
pub mod notice;
pub mod orchestrator;
pub mod participant;
pub mod policy;
pub mod roster;
pub mod score;
pub mod spawn;
pub mod timer;

// Re-export event types
pub use config::{validate_event_config, ConfigError, EventConfig, ParamType, ParamValue, ParameterSpec, TeamConfig};
pub use notice::{Audience, EventNotice, Notice};
pub use orchestrator::{
    DamageEvent, DamageOutcome, DeathInfo, EventContext, EventGame, EventInfo, EventScheduler, EventStatus,
    GameJob, InstanceId, Job, JobOwner, JoinError, RespawnError,
};
pub use participant::{Participant, PlayerId, Team};
pub use policy::{DeathResolution, ModePolicy, ModeRegistry};
pub use roster::Roster;
pub use score::{EventResults, ScoreEntry, Scoreboard};
pub use spawn::{Position, SpawnSelector};
pub use timer::GameTimer;
