//! Game-world collaborator boundary.
//!
//! The engine calls these as opaque side effects and never inspects their
//! internals. [`ReferenceLookup`] answers the read-only questions asked at
//! validation time; [`WorldActions`] adds everything that mutates the world
//! or talks to players.

use thiserror::Error;

use super::restore::{ContainerKind, ItemData, RestoreRecord, Vitals};
use crate::event::participant::PlayerId;
use crate::event::score::ScoreEntry;
use crate::event::spawn::Position;
use crate::settings::RewardKind;

/// Host entity identifier.
pub type EntityId = u64;

/// A non-player entity involved in damage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRef {
    pub id: EntityId,
    /// Player who placed it, if any
    pub owner: Option<PlayerId>,
    /// Host prefab or type name
    pub kind: String,
}

/// World side-effect failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// Player is not in a state to receive items
    #[error("Player {0} is unavailable")]
    PlayerUnavailable(PlayerId),

    /// No room in the target container
    #[error("Container {0:?} is full")]
    ContainerFull(ContainerKind),

    /// Item definition not known to the host
    #[error("Unknown item id {0}")]
    UnknownItem(i32),
}

/// Read-only reference data.
pub trait ReferenceLookup {
    fn kit_exists(&self, kit: &str) -> bool;

    /// Points of a named spawn set.
    fn spawn_points(&self, spawn_set: &str) -> Option<Vec<Position>>;

    fn zone_exists(&self, zone_id: &str) -> bool;

    /// Values offered by a named pick-list source.
    fn pick_list(&self, _source: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Side effects the engine asks the host to perform.
pub trait WorldActions: ReferenceLookup + Send {
    // ===== Startup =====

    /// Host services that are required but not available.
    fn missing_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    // ===== Presence =====

    fn is_connected(&self, player: PlayerId) -> bool;

    /// Connected but asleep (not controlling their character).
    fn is_sleeping(&self, player: PlayerId) -> bool;

    /// Connected, awake and not receiving a world snapshot.
    fn is_ready_for_world_state(&self, player: PlayerId) -> bool;

    fn display_name(&self, player: PlayerId) -> String;

    fn is_admin(&self, _player: PlayerId) -> bool {
        false
    }

    // ===== Snapshot and restore =====

    /// Capture vitals, position and inventory.
    fn capture_snapshot(&self, player: PlayerId) -> Option<RestoreRecord>;

    fn set_vitals(&mut self, player: PlayerId, vitals: Vitals);

    /// Recreate one captured item in a container.
    fn give_item(&mut self, player: PlayerId, container: ContainerKind, item: &ItemData) -> Result<(), WorldError>;

    // ===== Player side effects =====

    fn teleport(&mut self, player: PlayerId, position: Position, sleep: bool);

    fn strip_inventory(&mut self, player: PlayerId);

    fn reset_vitals(&mut self, player: PlayerId);

    fn issue_kit(&mut self, player: PlayerId, kit: &str);

    /// Remove worn items (before team clothing goes on).
    fn clear_worn_items(&mut self, player: PlayerId);

    fn dismount(&mut self, player: PlayerId);

    fn set_network_visible(&mut self, player: PlayerId, visible: bool);

    fn drop_backpack(&mut self, player: PlayerId, despawn_secs: u32);

    /// Actually kill the player (used when they leave while disconnected).
    fn kill_player(&mut self, player: PlayerId);

    /// Allow or deny a player in an arena zone.
    fn set_zone_access(&mut self, zone_id: &str, player: PlayerId, allowed: bool);

    fn give_reward(&mut self, player: PlayerId, kind: RewardKind, amount: i32);

    fn destroy_entity(&mut self, entity: EntityId);

    // ===== Messaging and UI =====

    fn broadcast(&mut self, message: &str);

    fn send_message(&mut self, player: PlayerId, message: &str);

    fn show_timer(&mut self, player: PlayerId, clock: &str, message: &str);

    fn clear_timer(&mut self, player: PlayerId);

    fn show_scoreboard(&mut self, player: PlayerId, entries: &[ScoreEntry]);

    fn show_death_screen(&mut self, player: PlayerId, message: &str, respawn_remaining: u32);

    fn clear_death_screen(&mut self, player: PlayerId);

    fn spectate(&mut self, player: PlayerId, target: Option<PlayerId>);
}

// =============================================================================
// TEST DOUBLE
// =============================================================================

#[cfg(test)]
pub mod testing {
    //! World double that records every side effect.

    use std::collections::{BTreeMap, BTreeSet};

    use super::*;

    /// One recorded side effect.
    #[derive(Clone, Debug, PartialEq)]
    pub enum WorldCall {
        Teleport(PlayerId, Position, bool),
        Strip(PlayerId),
        ResetVitals(PlayerId),
        SetVitals(PlayerId, Vitals),
        GiveItem(PlayerId, ContainerKind, i32, i32),
        IssueKit(PlayerId, String),
        ClearWorn(PlayerId),
        Dismount(PlayerId),
        Visible(PlayerId, bool),
        DropBackpack(PlayerId),
        Kill(PlayerId),
        ZoneAccess(PlayerId, bool),
        Reward(PlayerId, RewardKind, i32),
        DestroyEntity(EntityId),
        Broadcast(String),
        Message(PlayerId, String),
        ShowTimer(PlayerId, String),
        ClearTimer(PlayerId),
        Scoreboard(PlayerId, usize),
        DeathScreen(PlayerId, String),
        ClearDeathScreen(PlayerId),
        Spectate(PlayerId, Option<PlayerId>),
    }

    /// Recording world with a small arena preset.
    #[derive(Debug, Default)]
    pub struct RecordingWorld {
        pub calls: Vec<WorldCall>,
        pub kits: BTreeSet<String>,
        pub spawn_sets: BTreeMap<String, Vec<Position>>,
        pub zones: BTreeSet<String>,
        pub missing: Vec<String>,
        pub disconnected: BTreeSet<PlayerId>,
        pub not_ready: BTreeSet<PlayerId>,
        pub sleeping: BTreeSet<PlayerId>,
        pub admins: BTreeSet<PlayerId>,
        pub snapshots: BTreeMap<PlayerId, RestoreRecord>,
        /// Restored items per player: (container, slot, item id)
        pub inventory: BTreeMap<PlayerId, Vec<(ContainerKind, i32, i32)>>,
        /// Containers that reject items
        pub failing: BTreeSet<ContainerKind>,
    }

    impl RecordingWorld {
        /// Kits rifle/smg/shotgun, spawn sets red/blue/ffa and one zone.
        pub fn with_arena() -> Self {
            let mut world = Self::default();
            for kit in ["rifle", "smg", "shotgun", "red-clothes", "blue-clothes"] {
                world.kits.insert(kit.to_string());
            }
            let points = |x: f32| (0..4).map(|i| Position::new(x, 0.0, i as f32)).collect::<Vec<_>>();
            world.spawn_sets.insert("red".into(), points(10.0));
            world.spawn_sets.insert("blue".into(), points(-10.0));
            world.spawn_sets.insert("ffa".into(), points(0.0));
            world.zones.insert("arena-zone".into());
            world
        }

        pub fn messages_to(&self, player: PlayerId) -> Vec<String> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    WorldCall::Message(p, m) if *p == player => Some(m.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn broadcasts(&self) -> Vec<String> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    WorldCall::Broadcast(m) => Some(m.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn count<F: Fn(&WorldCall) -> bool>(&self, f: F) -> usize {
            self.calls.iter().filter(|c| f(c)).count()
        }
    }

    impl ReferenceLookup for RecordingWorld {
        fn kit_exists(&self, kit: &str) -> bool {
            self.kits.contains(kit)
        }

        fn spawn_points(&self, spawn_set: &str) -> Option<Vec<Position>> {
            self.spawn_sets.get(spawn_set).cloned()
        }

        fn zone_exists(&self, zone_id: &str) -> bool {
            self.zones.contains(zone_id)
        }

        fn pick_list(&self, source: &str) -> Vec<String> {
            match source {
                "kits" => self.kits.iter().cloned().collect(),
                _ => Vec::new(),
            }
        }
    }

    impl WorldActions for RecordingWorld {
        fn missing_dependencies(&self) -> Vec<String> {
            self.missing.clone()
        }

        fn is_connected(&self, player: PlayerId) -> bool {
            !self.disconnected.contains(&player)
        }

        fn is_sleeping(&self, player: PlayerId) -> bool {
            self.sleeping.contains(&player)
        }

        fn is_ready_for_world_state(&self, player: PlayerId) -> bool {
            self.is_connected(player) && !self.sleeping.contains(&player) && !self.not_ready.contains(&player)
        }

        fn display_name(&self, player: PlayerId) -> String {
            format!("player{}", player)
        }

        fn is_admin(&self, player: PlayerId) -> bool {
            self.admins.contains(&player)
        }

        fn capture_snapshot(&self, player: PlayerId) -> Option<RestoreRecord> {
            Some(self.snapshots.get(&player).cloned().unwrap_or_default())
        }

        fn set_vitals(&mut self, player: PlayerId, vitals: Vitals) {
            self.calls.push(WorldCall::SetVitals(player, vitals));
        }

        fn give_item(&mut self, player: PlayerId, container: ContainerKind, item: &ItemData) -> Result<(), WorldError> {
            if self.failing.contains(&container) {
                return Err(WorldError::ContainerFull(container));
            }
            self.calls.push(WorldCall::GiveItem(player, container, item.item_id, item.position));
            self.inventory
                .entry(player)
                .or_default()
                .push((container, item.position, item.item_id));
            Ok(())
        }

        fn teleport(&mut self, player: PlayerId, position: Position, sleep: bool) {
            self.calls.push(WorldCall::Teleport(player, position, sleep));
        }

        fn strip_inventory(&mut self, player: PlayerId) {
            self.calls.push(WorldCall::Strip(player));
        }

        fn reset_vitals(&mut self, player: PlayerId) {
            self.calls.push(WorldCall::ResetVitals(player));
        }

        fn issue_kit(&mut self, player: PlayerId, kit: &str) {
            self.calls.push(WorldCall::IssueKit(player, kit.to_string()));
        }

        fn clear_worn_items(&mut self, player: PlayerId) {
            self.calls.push(WorldCall::ClearWorn(player));
        }

        fn dismount(&mut self, player: PlayerId) {
            self.calls.push(WorldCall::Dismount(player));
        }

        fn set_network_visible(&mut self, player: PlayerId, visible: bool) {
            self.calls.push(WorldCall::Visible(player, visible));
        }

        fn drop_backpack(&mut self, player: PlayerId, _despawn_secs: u32) {
            self.calls.push(WorldCall::DropBackpack(player));
        }

        fn kill_player(&mut self, player: PlayerId) {
            self.calls.push(WorldCall::Kill(player));
        }

        fn set_zone_access(&mut self, _zone_id: &str, player: PlayerId, allowed: bool) {
            self.calls.push(WorldCall::ZoneAccess(player, allowed));
        }

        fn give_reward(&mut self, player: PlayerId, kind: RewardKind, amount: i32) {
            self.calls.push(WorldCall::Reward(player, kind, amount));
        }

        fn destroy_entity(&mut self, entity: EntityId) {
            self.calls.push(WorldCall::DestroyEntity(entity));
        }

        fn broadcast(&mut self, message: &str) {
            self.calls.push(WorldCall::Broadcast(message.to_string()));
        }

        fn send_message(&mut self, player: PlayerId, message: &str) {
            self.calls.push(WorldCall::Message(player, message.to_string()));
        }

        fn show_timer(&mut self, player: PlayerId, clock: &str, _message: &str) {
            self.calls.push(WorldCall::ShowTimer(player, clock.to_string()));
        }

        fn clear_timer(&mut self, player: PlayerId) {
            self.calls.push(WorldCall::ClearTimer(player));
        }

        fn show_scoreboard(&mut self, player: PlayerId, entries: &[ScoreEntry]) {
            self.calls.push(WorldCall::Scoreboard(player, entries.len()));
        }

        fn show_death_screen(&mut self, player: PlayerId, message: &str, _respawn_remaining: u32) {
            self.calls.push(WorldCall::DeathScreen(player, message.to_string()));
        }

        fn clear_death_screen(&mut self, player: PlayerId) {
            self.calls.push(WorldCall::ClearDeathScreen(player));
        }

        fn spectate(&mut self, player: PlayerId, target: Option<PlayerId>) {
            self.calls.push(WorldCall::Spectate(player, target));
        }
    }
}
