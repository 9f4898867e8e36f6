//! Mode Policy
//!
//! The capability interface each game mode implements, plus the registry
//! that maps a mode-type string to a factory. A fresh policy is created when
//! an event opens and lives exactly as long as that event instance.
//!
//! Policies never mutate the roster. Mode-specific per-player data lives in
//! the policy itself, keyed by [`PlayerId`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::config::{EventConfig, ParamValue, ParameterSpec};
use super::participant::{Participant, PlayerId, Team};
use super::roster::Roster;
use super::score::{value1_desc_value2_asc, ScoreEntry};
use crate::host::world::{EntityRef, WorldActions};

/// What the orchestrator does after a death.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeathResolution {
    /// Respawn countdown in seconds
    pub respawn_secs: f32,

    /// Give the attacker kill credit
    pub credit_kill: bool,
}

/// Game mode capability interface.
pub trait ModePolicy: Send {
    // ===== Identity and schema =====

    /// Mode type identifier.
    fn mode_type(&self) -> &str;

    /// Two teams (A and B) or free-for-all.
    fn is_team_mode(&self) -> bool;

    /// Players pick their loadout from a selector.
    fn can_use_class_selector(&self) -> bool {
        false
    }

    fn requires_time_limit(&self) -> bool {
        false
    }

    fn requires_score_limit(&self) -> bool {
        false
    }

    /// Mode-specific parameters.
    fn declared_parameters(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    /// Mode check for one parameter value. The error is the reason string.
    fn validate_parameter(&self, _field: &str, _value: &ParamValue) -> Result<(), String> {
        Ok(())
    }

    /// Read mode parameters when the event opens.
    fn initialize_from_config(&mut self, _config: &EventConfig) {}

    // ===== Joining and teams =====

    /// Mode-specific join veto. `Some(reason)` rejects.
    fn can_join(&self, _player: PlayerId, _roster: &Roster) -> Option<String> {
        None
    }

    /// Team for a newly materialized participant.
    fn assign_team(&mut self, _player: PlayerId, requested: Team, _roster: &Roster) -> Team {
        if self.is_team_mode() { requested } else { Team::None }
    }

    /// Rebalance teams when the round starts.
    fn balances_teams_on_start(&self) -> bool {
        false
    }

    /// A participant left or was removed.
    fn on_participant_removed(&mut self, _player: PlayerId) {}

    // ===== Damage =====

    /// Scale applied to damage dealt by `attacker`.
    fn damage_multiplier(&self, _victim: &Participant, _attacker: Option<&Participant>) -> f32 {
        1.0
    }

    /// May a participant damage this non-player entity?
    fn can_deal_entity_damage(&self, _attacker: &Participant, _entity: &EntityRef) -> bool {
        false
    }

    // ===== Loadouts and spawning =====

    fn can_drop_backpack(&self) -> bool {
        true
    }

    fn can_issue_kit(&self, _participant: &Participant) -> bool {
        true
    }

    /// Called after the loadout (and team clothing) was issued.
    fn on_kit_issued(&mut self, _participant: &Participant, _world: &mut dyn WorldActions) {}

    fn on_player_spawned(&mut self, _participant: &Participant, _world: &mut dyn WorldActions) {}

    // ===== Death and scoring =====

    /// Decide kill credit and the respawn time.
    ///
    /// `victim` is already marked dead; counters are not yet updated.
    fn on_player_death(
        &mut self,
        victim: &Participant,
        attacker: Option<&Participant>,
        config: &EventConfig,
    ) -> DeathResolution;

    /// Has a win condition been met? Checked after every scoring event.
    fn should_end(&self, _roster: &Roster, _config: &EventConfig) -> bool {
        false
    }

    /// Two score components for one participant.
    fn score_components(&self, participant: &Participant) -> (f32, f32) {
        (participant.kills as f32, participant.deaths as f32)
    }

    /// Scoreboard ordering.
    fn compare_scores(&self, a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
        value1_desc_value2_asc(a, b)
    }

    /// Labels for the two score columns of one entry.
    fn format_score_components(&self, entry: &ScoreEntry) -> (String, String) {
        (format!("{}", entry.value1 as i64), format!("{}", entry.value2 as i64))
    }

    /// Team score (team modes).
    fn team_score(&self, _team: Team) -> i32 {
        0
    }

    /// Winners once the event finished.
    fn compute_winners(&self, roster: &Roster) -> Vec<PlayerId>;

    /// Who a dead participant may watch.
    fn spectate_targets(&self, roster: &Roster, spectator: PlayerId) -> Vec<PlayerId> {
        roster.alive_except(spectator)
    }

    /// Extra lines for the event status report.
    fn additional_details(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Factory for a fresh policy instance.
pub type ModeFactory = Box<dyn Fn() -> Box<dyn ModePolicy> + Send + Sync>;

/// Mode type string to policy factory.
#[derive(Default)]
pub struct ModeRegistry {
    modes: BTreeMap<String, ModeFactory>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mode. Replaces an existing registration.
    pub fn register<F>(&mut self, mode_type: &str, factory: F)
    where
        F: Fn() -> Box<dyn ModePolicy> + Send + Sync + 'static,
    {
        self.modes.insert(mode_type.to_string(), Box::new(factory));
    }

    /// Remove a mode. Returns whether it was registered.
    pub fn unregister(&mut self, mode_type: &str) -> bool {
        self.modes.remove(mode_type).is_some()
    }

    pub fn contains(&self, mode_type: &str) -> bool {
        self.modes.contains_key(mode_type)
    }

    /// Instantiate a policy.
    pub fn create(&self, mode_type: &str) -> Option<Box<dyn ModePolicy>> {
        self.modes.get(mode_type).map(|factory| factory())
    }

    /// Registered mode names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.modes.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ModeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeRegistry").field("modes", &self.names()).finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::deathmatch::Deathmatch;

    #[test]
    fn test_registry_create_and_unregister() {
        let mut registry = ModeRegistry::new();
        registry.register("deathmatch", || Box::new(Deathmatch::default()));

        assert!(registry.contains("deathmatch"));
        assert_eq!(registry.names(), vec!["deathmatch"]);

        let policy = registry.create("deathmatch").unwrap();
        assert_eq!(policy.mode_type(), "deathmatch");
        assert!(!policy.is_team_mode());

        assert!(registry.unregister("deathmatch"));
        assert!(registry.create("deathmatch").is_none());
    }

    #[test]
    fn test_default_assign_team_ffa() {
        let mut policy = Deathmatch::default();
        let roster = Roster::new();
        assert_eq!(policy.assign_team(PlayerId::new(1), Team::B, &roster), Team::None);
    }
}
