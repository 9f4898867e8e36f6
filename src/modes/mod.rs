//! Reference game modes.
//!
//! Each mode is a [`ModePolicy`] registered under its mode-type string.

pub mod deathmatch;
pub mod team_deathmatch;

use crate::event::config::{EventConfig, ParamType, ParamValue, ParameterSpec};
use crate::event::policy::ModeRegistry;

use deathmatch::Deathmatch;
use team_deathmatch::TeamDeathmatch;

/// Respawn countdown parameter shared by the built-in modes.
pub const RESPAWN_TIME_FIELD: &str = "respawnTime";

pub const DEFAULT_RESPAWN_SECS: i64 = 5;

pub const MAX_RESPAWN_SECS: i64 = 60;

/// Register every built-in mode.
pub fn register_builtin_modes(registry: &mut ModeRegistry) {
    registry.register(deathmatch::MODE_TYPE, || Box::new(Deathmatch::default()));
    registry.register(team_deathmatch::MODE_TYPE, || Box::new(TeamDeathmatch::default()));
}

fn respawn_time_parameter() -> ParameterSpec {
    ParameterSpec::new("Respawn Time", RESPAWN_TIME_FIELD, ParamType::Int)
        .with_default(ParamValue::Int(DEFAULT_RESPAWN_SECS))
}

fn validate_respawn_time(field: &str, value: &ParamValue) -> Result<(), String> {
    if field != RESPAWN_TIME_FIELD {
        return Ok(());
    }
    match value {
        ParamValue::Int(secs) if (0..=MAX_RESPAWN_SECS).contains(secs) => Ok(()),
        _ => Err(format!("Respawn time must be between 0 and {} seconds", MAX_RESPAWN_SECS)),
    }
}

fn respawn_secs(config: &EventConfig) -> f32 {
    config
        .param_int(RESPAWN_TIME_FIELD)
        .unwrap_or(DEFAULT_RESPAWN_SECS)
        .clamp(0, MAX_RESPAWN_SECS) as f32
}
