//! Roster: materialized participants in join order plus the waiting list.

use serde::{Serialize, Deserialize};

use super::participant::{Participant, PlayerId, Team};
use crate::core::rng::DeterministicRng;

/// A player waiting to be materialized at prestart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JoiningPlayer {
    pub id: PlayerId,
    pub display_name: String,
    /// Team asked for at join time
    pub requested_team: Team,
}

/// Participants and joiners of one event run.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    participants: Vec<Participant>,
    joining: Vec<JoiningPlayer>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Participants =====

    /// Participants in join order.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    /// Participant ids in join order.
    pub fn ids(&self) -> Vec<PlayerId> {
        self.participants.iter().map(|p| p.id).collect()
    }

    pub fn get(&self, id: PlayerId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.joining.is_empty()
    }

    /// Add a participant. A participant with the same id is replaced.
    pub fn insert(&mut self, participant: Participant) {
        match self.participants.iter_mut().find(|p| p.id == participant.id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
    }

    pub fn remove(&mut self, id: PlayerId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id == id)?;
        Some(self.participants.remove(index))
    }

    // ===== Waiting list =====

    pub fn joining(&self) -> &[JoiningPlayer] {
        &self.joining
    }

    pub fn joining_len(&self) -> usize {
        self.joining.len()
    }

    pub fn is_joining(&self, id: PlayerId) -> bool {
        self.joining.iter().any(|j| j.id == id)
    }

    /// Queue a player. Returns false if already queued.
    pub fn add_joining(&mut self, id: PlayerId, display_name: &str, requested_team: Team) -> bool {
        if self.is_joining(id) {
            return false;
        }
        self.joining.push(JoiningPlayer {
            id,
            display_name: display_name.to_string(),
            requested_team,
        });
        true
    }

    pub fn remove_joining(&mut self, id: PlayerId) -> Option<JoiningPlayer> {
        let index = self.joining.iter().position(|j| j.id == id)?;
        Some(self.joining.remove(index))
    }

    /// Next player to materialize (front of the list).
    pub fn take_next_joining(&mut self) -> Option<JoiningPlayer> {
        if self.joining.is_empty() {
            None
        } else {
            Some(self.joining.remove(0))
        }
    }

    // ===== Teams =====

    pub fn team_count(&self, team: Team) -> usize {
        self.participants.iter().filter(|p| p.team == team).count()
    }

    pub fn team_members(&self, team: Team) -> Vec<PlayerId> {
        self.participants.iter().filter(|p| p.team == team).map(|p| p.id).collect()
    }

    /// Alive participants other than `exclude`, in join order.
    pub fn alive_except(&self, exclude: PlayerId) -> Vec<PlayerId> {
        self.participants
            .iter()
            .filter(|p| p.is_alive() && p.id != exclude)
            .map(|p| p.id)
            .collect()
    }

    /// Even out the teams.
    ///
    /// When one team has two or more extra players, `floor(diff / 2)`
    /// randomly chosen players move to the other team. Afterwards the counts
    /// differ by at most one. Returns the moved players and their new team.
    pub fn balance_teams(&mut self, rng: &mut DeterministicRng) -> Vec<(PlayerId, Team)> {
        let a = self.team_count(Team::A);
        let b = self.team_count(Team::B);
        let diff = a.abs_diff(b);
        if diff < 2 {
            return Vec::new();
        }

        let from = if a > b { Team::A } else { Team::B };
        let to = from.opposite();

        let mut candidates = self.team_members(from);
        rng.shuffle(&mut candidates);

        let mut moved = Vec::new();
        for id in candidates.into_iter().take(diff / 2) {
            if let Some(p) = self.get_mut(id) {
                p.team = to;
                moved.push((id, to));
            }
        }
        moved
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn with_teams(a: usize, b: usize) -> Roster {
        let mut roster = Roster::new();
        for i in 0..(a + b) {
            let mut p = Participant::new(PlayerId::new(i as u64), "p");
            p.team = if i < a { Team::A } else { Team::B };
            roster.insert(p);
        }
        roster
    }

    #[test]
    fn test_waiting_list_front_to_back() {
        let mut roster = Roster::new();
        assert!(roster.add_joining(PlayerId::new(1), "one", Team::None));
        assert!(roster.add_joining(PlayerId::new(2), "two", Team::None));
        assert!(!roster.add_joining(PlayerId::new(1), "one", Team::None));

        assert_eq!(roster.take_next_joining().unwrap().id, PlayerId::new(1));
        assert_eq!(roster.take_next_joining().unwrap().id, PlayerId::new(2));
        assert!(roster.take_next_joining().is_none());
    }

    #[test]
    fn test_insert_and_remove() {
        let mut roster = Roster::new();
        roster.insert(Participant::new(PlayerId::new(1), "a"));
        roster.insert(Participant::new(PlayerId::new(2), "b"));
        roster.insert(Participant::new(PlayerId::new(1), "a2"));

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(PlayerId::new(1)).unwrap().display_name, "a2");
        assert!(roster.remove(PlayerId::new(1)).is_some());
        assert!(roster.remove(PlayerId::new(1)).is_none());
        assert_eq!(roster.ids(), vec![PlayerId::new(2)]);
    }

    #[test]
    fn test_balance_no_move_on_small_difference() {
        let mut rng = DeterministicRng::new(1);
        assert!(with_teams(3, 3).balance_teams(&mut rng).is_empty());
        assert!(with_teams(4, 3).balance_teams(&mut rng).is_empty());
    }

    #[test]
    fn test_balance_moves_half_the_difference() {
        let mut rng = DeterministicRng::new(1);

        let mut roster = with_teams(6, 1);
        let moved = roster.balance_teams(&mut rng);
        assert_eq!(moved.len(), 2);
        assert!(moved.iter().all(|(_, t)| *t == Team::B));
        assert_eq!(roster.team_count(Team::A), 4);
        assert_eq!(roster.team_count(Team::B), 3);

        let mut roster = with_teams(0, 5);
        roster.balance_teams(&mut rng);
        assert!(roster.team_count(Team::A).abs_diff(roster.team_count(Team::B)) <= 1);
    }

    #[test]
    fn test_alive_except() {
        let mut roster = with_teams(2, 1);
        roster.get_mut(PlayerId::new(1)).unwrap().dead = true;
        assert_eq!(roster.alive_except(PlayerId::new(0)), vec![PlayerId::new(2)]);
    }
}
