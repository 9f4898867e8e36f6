//! Scoreboard Engine
//!
//! Score entries are rebuilt wholesale from the roster after every scoring
//! event. The mode policy supplies the two score components and the
//! comparator; positions follow list order after sorting.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use super::participant::{PlayerId, Team};
use super::policy::ModePolicy;
use super::roster::Roster;

// =============================================================================
// SCORE ENTRY
// =============================================================================

/// One scoreboard line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Rank position (0-based, list order)
    pub position: usize,

    /// Player this line belongs to
    pub player_id: PlayerId,

    /// Name as shown
    pub display_name: String,

    /// Team
    pub team: Team,

    /// First score component (mode-defined)
    pub value1: f32,

    /// Second score component (mode-defined)
    pub value2: f32,

    /// Display text for the two components
    #[serde(default)]
    pub labels: (String, String),
}

// =============================================================================
// COMPARATORS
// =============================================================================

#[inline]
fn cmp_f32(a: f32, b: f32) -> Ordering {
    a.total_cmp(&b)
}

/// value1 descending, then value2 descending.
pub fn value1_desc_value2_desc(a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
    cmp_f32(b.value1, a.value1).then_with(|| cmp_f32(b.value2, a.value2))
}

/// value1 descending, then value2 ascending (kills up, deaths down).
pub fn value1_desc_value2_asc(a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
    cmp_f32(b.value1, a.value1).then_with(|| cmp_f32(a.value2, b.value2))
}

/// value1 ascending, then value2 descending (rank-style modes).
pub fn value1_asc_value2_desc(a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
    cmp_f32(a.value1, b.value1).then_with(|| cmp_f32(b.value2, a.value2))
}

/// Sort with a comparator and assign positions by list order.
pub fn sort_entries<F>(entries: &mut [ScoreEntry], compare: F)
where
    F: FnMut(&ScoreEntry, &ScoreEntry) -> Ordering,
{
    entries.sort_by(compare);
    for (position, entry) in entries.iter_mut().enumerate() {
        entry.position = position;
    }
}

// =============================================================================
// SCOREBOARD
// =============================================================================

/// Sorted score snapshot for the running event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scoreboard {
    entries: Vec<ScoreEntry>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot from the current roster.
    pub fn rebuild(&mut self, roster: &Roster, policy: &dyn ModePolicy) {
        let mut entries: Vec<ScoreEntry> = roster
            .participants()
            .map(|p| {
                let (value1, value2) = policy.score_components(p);
                ScoreEntry {
                    position: 0,
                    player_id: p.id,
                    display_name: p.display_name.clone(),
                    team: p.team,
                    value1,
                    value2,
                    labels: (String::new(), String::new()),
                }
            })
            .collect();

        for entry in &mut entries {
            entry.labels = policy.format_score_components(entry);
        }
        sort_entries(&mut entries, |a, b| policy.compare_scores(a, b));
        self.entries = entries;
    }

    /// Entries in rank order.
    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    /// Entry for one player.
    pub fn entry(&self, player: PlayerId) -> Option<&ScoreEntry> {
        self.entries.iter().find(|e| e.player_id == player)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// EVENT RESULTS
// =============================================================================

/// Snapshot of the last finished event, kept after the instance is gone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventResults {
    /// Event name
    pub event_name: String,

    /// Mode type
    pub mode_type: String,

    /// Team scores (A, B) for team modes
    pub team_score: Option<(i32, i32)>,

    /// Final scoreboard
    pub scores: Vec<ScoreEntry>,

    /// When the event ended
    pub finished_at: Option<DateTime<Utc>>,
}

impl EventResults {
    /// Has any event finished yet?
    pub fn is_valid(&self) -> bool {
        !self.event_name.is_empty()
    }

    /// Overwrite with a new snapshot.
    pub fn update(
        &mut self,
        event_name: &str,
        mode_type: &str,
        team_score: Option<(i32, i32)>,
        scores: &[ScoreEntry],
    ) {
        self.event_name = event_name.to_string();
        self.mode_type = mode_type.to_string();
        self.team_score = team_score;
        self.scores = scores.to_vec();
        self.finished_at = Some(Utc::now());
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::participant::Participant;
    use crate::modes::deathmatch::Deathmatch;
    use proptest::prelude::*;

    fn entry(value1: f32, value2: f32) -> ScoreEntry {
        ScoreEntry {
            position: 0,
            player_id: PlayerId::new(0),
            display_name: String::new(),
            team: Team::None,
            value1,
            value2,
            labels: (String::new(), String::new()),
        }
    }

    #[test]
    fn test_value1_desc_value2_desc_ordering() {
        let mut entries = vec![entry(3.0, 5.0), entry(3.0, 2.0), entry(5.0, 0.0)];
        sort_entries(&mut entries, value1_desc_value2_desc);

        let order: Vec<(f32, f32)> = entries.iter().map(|e| (e.value1, e.value2)).collect();
        assert_eq!(order, vec![(5.0, 0.0), (3.0, 5.0), (3.0, 2.0)]);
        assert_eq!(entries[2].position, 2);
    }

    #[test]
    fn test_rank_style_ordering() {
        let mut entries = vec![entry(2.0, 1.0), entry(1.0, 0.0), entry(1.0, 4.0)];
        sort_entries(&mut entries, value1_asc_value2_desc);

        let order: Vec<(f32, f32)> = entries.iter().map(|e| (e.value1, e.value2)).collect();
        assert_eq!(order, vec![(1.0, 4.0), (1.0, 0.0), (2.0, 1.0)]);
    }

    #[test]
    fn test_results_snapshot() {
        let mut results = EventResults::default();
        assert!(!results.is_valid());

        results.update("arena", "deathmatch", None, &[entry(1.0, 0.0)]);
        assert!(results.is_valid());
        assert!(results.finished_at.is_some());
        assert_eq!(results.scores.len(), 1);
    }

    #[test]
    fn test_rebuild_formats_labels() {
        let mut roster = Roster::new();
        let mut p = Participant::new(PlayerId::new(1), "one");
        p.kills = 3;
        p.deaths = 1;
        roster.insert(p);

        let mut board = Scoreboard::new();
        board.rebuild(&roster, &Deathmatch::default());

        let entry = board.entry(PlayerId::new(1)).unwrap();
        assert_eq!(entry.labels, ("3".to_string(), "1".to_string()));
    }

    proptest! {
        #[test]
        fn prop_rebuild_is_idempotent(stats in prop::collection::vec((0u32..5, 0u32..5), 0..16)) {
            let mut roster = Roster::new();
            for (i, (kills, deaths)) in stats.iter().enumerate() {
                let mut p = Participant::new(PlayerId::new(i as u64), &format!("p{}", i));
                p.kills = *kills;
                p.deaths = *deaths;
                roster.insert(p);
            }

            let policy = Deathmatch::default();
            let mut board = Scoreboard::new();
            board.rebuild(&roster, &policy);
            let first = board.clone();
            board.rebuild(&roster, &policy);

            prop_assert_eq!(first, board);
        }
    }
}
