//! Team deathmatch.
//!
//! Players alternate between teams A and B as they are materialized and the
//! teams are rebalanced when the round starts. Only kills on the opposing
//! team score.

use crate::event::config::{EventConfig, ParamValue, ParameterSpec};
use crate::event::participant::{Participant, PlayerId, Team};
use crate::event::policy::{DeathResolution, ModePolicy};
use crate::event::roster::Roster;

pub const MODE_TYPE: &str = "team-deathmatch";

#[derive(Clone, Debug)]
pub struct TeamDeathmatch {
    respawn_secs: f32,
    team_a_score: i32,
    team_b_score: i32,
    /// Set once a team reaches the score limit
    winning_team: Option<Team>,
    last_team: Team,
}

impl Default for TeamDeathmatch {
    fn default() -> Self {
        Self {
            respawn_secs: super::DEFAULT_RESPAWN_SECS as f32,
            team_a_score: 0,
            team_b_score: 0,
            winning_team: None,
            last_team: Team::B,
        }
    }
}

impl TeamDeathmatch {
    fn leading_team(&self) -> Option<Team> {
        if let Some(team) = self.winning_team {
            return Some(team);
        }
        match self.team_a_score.cmp(&self.team_b_score) {
            std::cmp::Ordering::Greater => Some(Team::A),
            std::cmp::Ordering::Less => Some(Team::B),
            std::cmp::Ordering::Equal => None,
        }
    }
}

impl ModePolicy for TeamDeathmatch {
    fn mode_type(&self) -> &str {
        MODE_TYPE
    }

    fn is_team_mode(&self) -> bool {
        true
    }

    fn requires_score_limit(&self) -> bool {
        true
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

    fn assign_team(&mut self, _player: PlayerId, requested: Team, _roster: &Roster) -> Team {
        let team = match requested {
            Team::None => self.last_team.opposite(),
            team => team,
        };
        self.last_team = team;
        team
    }

    fn balances_teams_on_start(&self) -> bool {
        true
    }

    fn on_player_death(
        &mut self,
        victim: &Participant,
        attacker: Option<&Participant>,
        config: &EventConfig,
    ) -> DeathResolution {
        let enemy = attacker.filter(|a| a.team != victim.team);

        if let Some(attacker) = enemy {
            let score = match attacker.team {
                Team::B => {
                    self.team_b_score += 1;
                    self.team_b_score
                }
                _ => {
                    self.team_a_score += 1;
                    self.team_a_score
                }
            };
            if config.score_limit > 0 && score >= config.score_limit as i32 && self.winning_team.is_none() {
                self.winning_team = Some(attacker.team);
            }
        }

        DeathResolution {
            respawn_secs: self.respawn_secs,
            credit_kill: enemy.is_some(),
        }
    }

    fn should_end(&self, _roster: &Roster, _config: &EventConfig) -> bool {
        self.winning_team.is_some()
    }

    fn team_score(&self, team: Team) -> i32 {
        match team {
            Team::A => self.team_a_score,
            Team::B => self.team_b_score,
            Team::None => 0,
        }
    }

    fn compute_winners(&self, roster: &Roster) -> Vec<PlayerId> {
        match self.leading_team() {
            Some(team) => roster.team_members(team),
            None => Vec::new(),
        }
    }

    fn additional_details(&self) -> Vec<(String, String)> {
        vec![(
            "Score".to_string(),
            format!("A {} - {} B", self.team_a_score, self.team_b_score),
        )]
    }
}
