//! Free-for-all deathmatch.
//!
//! Every kill scores. Highest kill count wins; reaching the score limit ends
//! the round immediately.

use crate::event::config::{EventConfig, ParamValue, ParameterSpec};
use crate::event::participant::{Participant, PlayerId};
use crate::event::policy::{DeathResolution, ModePolicy};
use crate::event::roster::Roster;

pub const MODE_TYPE: &str = "deathmatch";

#[derive(Clone, Debug)]
pub struct Deathmatch {
    respawn_secs: f32,
}

impl Default for Deathmatch {
    fn default() -> Self {
        Self { respawn_secs: super::DEFAULT_RESPAWN_SECS as f32 }
    }
}

impl ModePolicy for Deathmatch {
    fn mode_type(&self) -> &str {
        MODE_TYPE
    }

    fn is_team_mode(&self) -> bool {
        false
    }

    fn declared_parameters(&self) -> Vec<ParameterSpec> {
        vec![super::respawn_time_parameter()]
    }

    fn validate_parameter(&self, field: &str, value: &ParamValue) -> Result<(), String> {
        super::validate_respawn_time(field, value)
    }

    fn initialize_from_config(&mut self, config: &EventConfig) {
        self.respawn_secs = super::respawn_secs(config);
    }

    fn on_player_death(
        &mut self,
        _victim: &Participant,
        attacker: Option<&Participant>,
        _config: &EventConfig,
    ) -> DeathResolution {
        DeathResolution {
            respawn_secs: self.respawn_secs,
            credit_kill: attacker.is_some(),
        }
    }

    fn should_end(&self, roster: &Roster, config: &EventConfig) -> bool {
        config.score_limit > 0 && roster.participants().any(|p| p.kills >= config.score_limit)
    }

    fn compute_winners(&self, roster: &Roster) -> Vec<PlayerId> {
        let best = roster.participants().map(|p| p.kills).max().unwrap_or(0);
        if best == 0 {
            return Vec::new();
        }
        roster
            .participants()
            .filter(|p| p.kills == best)
            .map(|p| p.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(kills: &[u32]) -> Roster {
        let mut roster = Roster::new();
        for (i, k) in kills.iter().enumerate() {
            let mut p = Participant::new(PlayerId::new(i as u64 + 1), &format!("p{}", i + 1));
            p.kills = *k;
            roster.insert(p);
        }
        roster
    }

    #[test]
    fn test_winners_highest_kills() {
        let dm = Deathmatch::default();
        assert_eq!(dm.compute_winners(&roster(&[2, 5, 1])), vec![PlayerId::new(2)]);
        assert_eq!(dm.compute_winners(&roster(&[4, 4])), vec![PlayerId::new(1), PlayerId::new(2)]);
        assert!(dm.compute_winners(&roster(&[0, 0])).is_empty());
    }

    #[test]
    fn test_score_limit_ends() {
        let dm = Deathmatch::default();
        let config = EventConfig { score_limit: 5, ..EventConfig::default() };
        assert!(!dm.should_end(&roster(&[4, 1]), &config));
        assert!(dm.should_end(&roster(&[5, 1]), &config));

        let unlimited = EventConfig::default();
        assert!(!dm.should_end(&roster(&[50]), &unlimited));
    }

    #[test]
    fn test_respawn_time_from_config() {
        let mut dm = Deathmatch::default();
        let mut config = EventConfig::new("arena", MODE_TYPE, &dm);
        config.params.insert(super::super::RESPAWN_TIME_FIELD.into(), ParamValue::Int(9));
        dm.initialize_from_config(&config);

        let victim = Participant::new(PlayerId::new(1), "a");
        let resolution = dm.on_player_death(&victim, None, &config);
        assert_eq!(resolution.respawn_secs, 9.0);
        assert!(!resolution.credit_kill);
    }
}
