//! Statistics Store
//!
//! Per-player and global counters, per-event games played, and the ranking
//! score used for leaderboards. Persisted as JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::event::participant::{strip_tags, PlayerId};

/// Named counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Statistic {
    /// Ranking score (sort key only)
    Rank,
    /// Display name (sort key only)
    Name,
    Kills,
    Deaths,
    Assists,
    Headshots,
    Melee,
    Wins,
    Losses,
    Played,
}

impl Statistic {
    /// Counters that are actually stored.
    pub const COUNTERS: [Statistic; 8] = [
        Statistic::Kills,
        Statistic::Deaths,
        Statistic::Assists,
        Statistic::Headshots,
        Statistic::Melee,
        Statistic::Wins,
        Statistic::Losses,
        Statistic::Played,
    ];
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Counters for one player (or the global totals).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatRecord {
    pub display_name: String,
    pub statistics: BTreeMap<Statistic, i64>,
    /// Games played per mode type
    pub events: BTreeMap<String, i64>,
}

impl StatRecord {
    fn named(display_name: &str) -> Self {
        Self {
            display_name: strip_tags(display_name),
            ..Self::default()
        }
    }

    pub fn get(&self, statistic: Statistic) -> i64 {
        self.statistics.get(&statistic).copied().unwrap_or(0)
    }

    fn add(&mut self, statistic: Statistic, amount: i64) {
        *self.statistics.entry(statistic).or_insert(0) += amount;
    }

    /// Leaderboard score.
    pub fn ranking_score(&self) -> i64 {
        fn ceil_div(value: i64, by: i64) -> i64 {
            (value + by - 1).div_euclid(by)
        }

        self.get(Statistic::Kills)
            + ceil_div(self.get(Statistic::Assists), 4)
            + ceil_div(self.get(Statistic::Melee), 4)
            + ceil_div(self.get(Statistic::Headshots), 2)
            + ceil_div(self.get(Statistic::Played), 2)
            + self.get(Statistic::Wins) * 2
    }

    fn sort_key(&self, statistic: Statistic) -> i64 {
        match statistic {
            Statistic::Rank => self.ranking_score(),
            Statistic::Name => 0,
            other => self.get(other),
        }
    }
}

/// Statistics persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Failed to read statistics: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid statistics data: {0}")]
    Json(#[from] serde_json::Error),
}

/// All statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsStore {
    players: BTreeMap<PlayerId, StatRecord>,
    global: StatRecord,
}

impl StatisticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn player_entry(&mut self, player: PlayerId, display_name: &str) -> &mut StatRecord {
        let record = self
            .players
            .entry(player)
            .or_insert_with(|| StatRecord::named(display_name));
        if !display_name.is_empty() {
            record.display_name = strip_tags(display_name);
        }
        record
    }

    /// Increment a player counter (and the global total).
    pub fn add(&mut self, player: PlayerId, display_name: &str, statistic: Statistic, amount: i64) {
        self.global.add(statistic, amount);
        self.player_entry(player, display_name).add(statistic, amount);
    }

    /// A player finished a game of `mode_type`.
    pub fn on_game_played(&mut self, player: PlayerId, display_name: &str, mode_type: &str) {
        *self
            .player_entry(player, display_name)
            .events
            .entry(mode_type.to_string())
            .or_insert(0) += 1;
    }

    /// A game of `mode_type` finished.
    pub fn on_game_played_global(&mut self, mode_type: &str) {
        *self.global.events.entry(mode_type.to_string()).or_insert(0) += 1;
        debug!(mode = mode_type, "Recorded game played");
    }

    pub fn player(&self, player: PlayerId) -> Option<&StatRecord> {
        self.players.get(&player)
    }

    pub fn get(&self, player: PlayerId, statistic: Statistic) -> i64 {
        self.players.get(&player).map_or(0, |r| r.get(statistic))
    }

    pub fn global(&self, statistic: Statistic) -> i64 {
        self.global.get(statistic)
    }

    /// Games of one mode a player finished.
    pub fn event_games(&self, player: PlayerId, mode_type: &str) -> i64 {
        self.players
            .get(&player)
            .and_then(|r| r.events.get(mode_type).copied())
            .unwrap_or(0)
    }

    pub fn global_event_games(&self, mode_type: &str) -> i64 {
        self.global.events.get(mode_type).copied().unwrap_or(0)
    }

    /// Players sorted by a statistic: descending, except `Name` ascending.
    pub fn sorted_by(&self, statistic: Statistic) -> Vec<(PlayerId, &StatRecord)> {
        let mut list: Vec<(PlayerId, &StatRecord)> = self.players.iter().map(|(id, r)| (*id, r)).collect();

        if statistic == Statistic::Name {
            list.sort_by(|a, b| a.1.display_name.cmp(&b.1.display_name));
        } else {
            list.sort_by(|a, b| b.1.sort_key(statistic).cmp(&a.1.sort_key(statistic)));
        }
        list
    }

    /// 1-based leaderboard rank, -1 when the player has no statistics.
    pub fn rank(&self, player: PlayerId) -> i32 {
        self.sorted_by(Statistic::Rank)
            .iter()
            .position(|(id, _)| *id == player)
            .map_or(-1, |i| i as i32 + 1)
    }

    // ===== Persistence =====

    pub fn to_json(&self) -> Result<String, StatsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StatsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from disk. A missing file yields empty statistics.
    pub fn load(path: &Path) -> Result<Self, StatsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<(), StatsError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_updates_player_and_global() {
        let mut stats = StatisticsStore::new();
        let p = PlayerId::new(1);
        stats.add(p, "[TAG] Bob", Statistic::Kills, 2);
        stats.add(PlayerId::new(2), "Alice", Statistic::Kills, 1);

        assert_eq!(stats.get(p, Statistic::Kills), 2);
        assert_eq!(stats.global(Statistic::Kills), 3);
        assert_eq!(stats.player(p).unwrap().display_name, "Bob");
        assert_eq!(stats.get(PlayerId::new(3), Statistic::Kills), 0);
    }

    #[test]
    fn test_ranking_score() {
        let mut record = StatRecord::default();
        record.add(Statistic::Kills, 10);
        record.add(Statistic::Assists, 5);
        record.add(Statistic::Melee, 1);
        record.add(Statistic::Headshots, 3);
        record.add(Statistic::Played, 3);
        record.add(Statistic::Wins, 2);

        // 10 + 2 + 1 + 2 + 2 + 4
        assert_eq!(record.ranking_score(), 21);
        assert_eq!(StatRecord::default().ranking_score(), 0);
    }

    #[test]
    fn test_rank_and_sorting() {
        let mut stats = StatisticsStore::new();
        stats.add(PlayerId::new(1), "Zed", Statistic::Kills, 1);
        stats.add(PlayerId::new(2), "Amy", Statistic::Kills, 5);
        stats.add(PlayerId::new(3), "Kim", Statistic::Wins, 1);

        assert_eq!(stats.rank(PlayerId::new(2)), 1);
        assert_eq!(stats.rank(PlayerId::new(3)), 2);
        assert_eq!(stats.rank(PlayerId::new(1)), 3);
        assert_eq!(stats.rank(PlayerId::new(9)), -1);

        let by_name: Vec<&str> = stats
            .sorted_by(Statistic::Name)
            .iter()
            .map(|(_, r)| r.display_name.as_str())
            .collect();
        assert_eq!(by_name, vec!["Amy", "Kim", "Zed"]);

        let by_kills = stats.sorted_by(Statistic::Kills);
        assert_eq!(by_kills[0].0, PlayerId::new(2));
    }

    #[test]
    fn test_games_played() {
        let mut stats = StatisticsStore::new();
        stats.on_game_played(PlayerId::new(1), "Bob", "deathmatch");
        stats.on_game_played(PlayerId::new(1), "Bob", "deathmatch");
        stats.on_game_played_global("deathmatch");

        assert_eq!(stats.event_games(PlayerId::new(1), "deathmatch"), 2);
        assert_eq!(stats.event_games(PlayerId::new(1), "ctf"), 0);
        assert_eq!(stats.global_event_games("deathmatch"), 1);
    }

    #[test]
    fn test_json_persistence() {
        let mut stats = StatisticsStore::new();
        stats.add(PlayerId::new(42), "Bob", Statistic::Deaths, 3);

        let json = stats.to_json().unwrap();
        let loaded = StatisticsStore::from_json(&json).unwrap();
        assert_eq!(loaded, stats);
    }
}
