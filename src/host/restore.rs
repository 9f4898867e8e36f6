//! Player Restoration
//!
//! Pre-event snapshots of vitals, position and inventory, captured when a
//! player is materialized into an event and consumed when they leave.
//!
//! Restoring is a staged sequence driven one step at a time by the manager's
//! scheduler:
//!
//! ```text
//! Strip -> Vitals + position -> Belt -> Wear -> Main -> record deleted
//! ```
//!
//! Each step is one unit of work. A step never starts while the player's
//! connection cannot accept world state; a container that fails part way
//! resumes at the first item that was not restored. The record is only
//! deleted once every container is done.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::world::{WorldActions, WorldError};
use crate::event::participant::PlayerId;
use crate::event::spawn::Position;

// =============================================================================
// RECORD TYPES
// =============================================================================

/// Inventory container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContainerKind {
    Belt,
    Wear,
    Main,
}

/// Health, hydration and calories.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: f32,
    pub hydration: f32,
    pub calories: f32,
}

/// Item-specific instance data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceData {
    pub data_int: i32,
    pub blueprint_target: i32,
    pub blueprint_amount: i32,
}

impl InstanceData {
    /// Carries anything worth restoring?
    pub fn is_valid(&self) -> bool {
        self.data_int != 0 || self.blueprint_amount != 0 || self.blueprint_target != 0
    }
}

/// One captured item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub item_id: i32,
    pub skin: u64,
    pub amount: i32,
    pub condition: f32,
    pub max_condition: f32,
    /// Loaded ammo count (weapons)
    pub ammo: i32,
    /// Loaded ammo item id (weapons)
    pub ammo_type: Option<i32>,
    /// Slot in its container, -1 for "first free slot"
    pub position: i32,
    /// Radio frequency
    pub frequency: i32,
    pub instance_data: Option<InstanceData>,
    /// Nested contents (attachments, liquids)
    pub contents: Vec<ItemData>,
}

impl ItemData {
    /// Plain stack of `amount` items.
    pub fn stack(item_id: i32, amount: i32, position: i32) -> Self {
        Self {
            item_id,
            amount,
            position,
            ..Self::default()
        }
    }
}

/// Snapshot taken when a player enters an event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreRecord {
    pub vitals: Vitals,
    pub position: Position,
    pub belt: Vec<ItemData>,
    pub wear: Vec<ItemData>,
    pub main: Vec<ItemData>,
}

impl RestoreRecord {
    pub fn container(&self, kind: ContainerKind) -> &[ItemData] {
        match kind {
            ContainerKind::Belt => &self.belt,
            ContainerKind::Wear => &self.wear,
            ContainerKind::Main => &self.main,
        }
    }

    /// Total item stacks across containers.
    pub fn item_count(&self) -> usize {
        self.belt.len() + self.wear.len() + self.main.len()
    }
}

// =============================================================================
// STAGED RESTORE
// =============================================================================

/// Result of one restore step.
#[derive(Clone, Debug, PartialEq)]
pub enum RestoreStep {
    /// Nothing stored for this player
    NoRecord,
    /// Player is offline; record kept for the next connect
    Gone,
    /// Connected but not ready for world state; retry later
    NotReady,
    /// One step done; more to go
    Progressed,
    /// A container failed part way; retry later
    Failed(WorldError),
    /// Fully restored; record deleted
    Complete,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Stage {
    #[default]
    Strip,
    Vitals,
    Container(ContainerKind),
}

impl Stage {
    fn next(self) -> Option<Stage> {
        match self {
            Stage::Strip => Some(Stage::Vitals),
            Stage::Vitals => Some(Stage::Container(ContainerKind::Belt)),
            Stage::Container(ContainerKind::Belt) => Some(Stage::Container(ContainerKind::Wear)),
            Stage::Container(ContainerKind::Wear) => Some(Stage::Container(ContainerKind::Main)),
            Stage::Container(ContainerKind::Main) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Progress {
    stage: Stage,
    next_item: usize,
}

/// Restore errors (persistence only).
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("Restore data encoding failed: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Restore data JSON failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// All pending restore records, keyed by player.
#[derive(Clone, Debug, Default)]
pub struct RestoreStore {
    records: BTreeMap<PlayerId, RestoreRecord>,
    progress: BTreeMap<PlayerId, Progress>,
}

impl RestoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_record(&self, player: PlayerId) -> bool {
        self.records.contains_key(&player)
    }

    pub fn record(&self, player: PlayerId) -> Option<&RestoreRecord> {
        self.records.get(&player)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Store a record unless one already exists for the player.
    pub fn insert(&mut self, player: PlayerId, record: RestoreRecord) -> bool {
        if self.records.contains_key(&player) {
            return false;
        }
        self.records.insert(player, record);
        true
    }

    /// Capture the player's current state.
    pub fn capture<W>(&mut self, player: PlayerId, world: &W) -> bool
    where
        W: WorldActions + ?Sized,
    {
        if self.records.contains_key(&player) {
            debug!(player = %player, "Restore record already present");
            return false;
        }
        match world.capture_snapshot(player) {
            Some(record) => self.insert(player, record),
            None => {
                warn!(player = %player, "Could not capture player state");
                false
            }
        }
    }

    /// Add a scrap-style prize to the stored inventory.
    ///
    /// Merges into an existing stack of the same item (main first, then
    /// belt), otherwise appends a new stack to main.
    pub fn add_prize(&mut self, player: PlayerId, item_id: i32, amount: i32) -> bool {
        let Some(record) = self.records.get_mut(&player) else {
            return false;
        };

        let existing = record
            .main
            .iter_mut()
            .chain(record.belt.iter_mut())
            .find(|item| item.item_id == item_id);

        match existing {
            Some(item) => item.amount += amount,
            None => record.main.push(ItemData::stack(item_id, amount, -1)),
        }
        true
    }

    /// Drop the in-flight progress (player went away mid-restore).
    pub fn reset_progress(&mut self, player: PlayerId) {
        self.progress.remove(&player);
    }

    /// Perform the next restore step.
    pub fn step<W>(&mut self, player: PlayerId, world: &mut W) -> RestoreStep
    where
        W: WorldActions + ?Sized,
    {
        let Some(record) = self.records.get(&player) else {
            self.progress.remove(&player);
            return RestoreStep::NoRecord;
        };

        if !world.is_connected(player) {
            self.progress.remove(&player);
            return RestoreStep::Gone;
        }
        if !world.is_ready_for_world_state(player) {
            return RestoreStep::NotReady;
        }

        let progress = self.progress.entry(player).or_default();

        match progress.stage {
            Stage::Strip => {
                world.strip_inventory(player);
                world.reset_vitals(player);
            }
            Stage::Vitals => {
                world.set_vitals(player, record.vitals);
                world.teleport(player, record.position, false);
            }
            Stage::Container(kind) => {
                let items = record.container(kind);
                while progress.next_item < items.len() {
                    let item = &items[progress.next_item];
                    if item.amount >= 1 {
                        if let Err(err) = world.give_item(player, kind, item) {
                            warn!(
                                player = %player,
                                container = ?kind,
                                item = progress.next_item,
                                "Restore failed part way: {}",
                                err
                            );
                            return RestoreStep::Failed(err);
                        }
                    }
                    progress.next_item += 1;
                }
            }
        }

        match progress.stage.next() {
            Some(next) => {
                progress.stage = next;
                progress.next_item = 0;
                RestoreStep::Progressed
            }
            None => {
                self.progress.remove(&player);
                self.records.remove(&player);
                debug!(player = %player, "Player restored");
                RestoreStep::Complete
            }
        }
    }

    // ===== Persistence =====

    /// Compact binary snapshot.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RestoreError> {
        Ok(bincode::serialize(&self.records)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RestoreError> {
        let records = bincode::deserialize(bytes)?;
        Ok(Self { records, progress: BTreeMap::new() })
    }

    pub fn to_json(&self) -> Result<String, RestoreError> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    pub fn from_json(json: &str) -> Result<Self, RestoreError> {
        let records = serde_json::from_str(json)?;
        Ok(Self { records, progress: BTreeMap::new() })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::world::testing::RecordingWorld;

    fn sample_record() -> RestoreRecord {
        RestoreRecord {
            vitals: Vitals { health: 80.0, hydration: 200.0, calories: 350.0 },
            position: Position::new(5.0, 1.0, -3.0),
            belt: vec![
                ItemData::stack(100, 1, 0),
                ItemData::stack(101, 1, 2),
                ItemData::stack(102, 10, 5),
            ],
            wear: Vec::new(),
            main: vec![ItemData::stack(200, 1000, 3), ItemData::stack(201, 1, 17)],
        }
    }

    fn run_to_end(store: &mut RestoreStore, player: PlayerId, world: &mut RecordingWorld) -> RestoreStep {
        for _ in 0..16 {
            match store.step(player, world) {
                RestoreStep::Progressed => continue,
                other => return other,
            }
        }
        RestoreStep::Progressed
    }

    #[test]
    fn test_restores_items_into_original_slots() {
        let player = PlayerId::new(7);
        let mut world = RecordingWorld::with_arena();
        let mut store = RestoreStore::new();
        store.insert(player, sample_record());

        assert_eq!(run_to_end(&mut store, player, &mut world), RestoreStep::Complete);
        assert!(!store.has_record(player));

        let restored = &world.inventory[&player];
        assert_eq!(restored.len(), 5);
        assert!(restored.contains(&(ContainerKind::Belt, 0, 100)));
        assert!(restored.contains(&(ContainerKind::Belt, 2, 101)));
        assert!(restored.contains(&(ContainerKind::Belt, 5, 102)));
        assert!(restored.contains(&(ContainerKind::Main, 3, 200)));
        assert!(restored.contains(&(ContainerKind::Main, 17, 201)));
    }

    #[test]
    fn test_not_ready_keeps_record() {
        let player = PlayerId::new(7);
        let mut world = RecordingWorld::with_arena();
        world.not_ready.insert(player);

        let mut store = RestoreStore::new();
        store.insert(player, sample_record());

        assert_eq!(store.step(player, &mut world), RestoreStep::NotReady);
        assert!(store.has_record(player));
        assert!(world.calls.is_empty());
    }

    #[test]
    fn test_disconnected_player_is_gone() {
        let player = PlayerId::new(7);
        let mut world = RecordingWorld::with_arena();
        world.disconnected.insert(player);

        let mut store = RestoreStore::new();
        store.insert(player, sample_record());

        assert_eq!(store.step(player, &mut world), RestoreStep::Gone);
        assert!(store.has_record(player));
    }

    #[test]
    fn test_partial_failure_retries_without_duplicates() {
        let player = PlayerId::new(7);
        let mut world = RecordingWorld::with_arena();
        world.failing.insert(ContainerKind::Main);

        let mut store = RestoreStore::new();
        store.insert(player, sample_record());

        assert!(matches!(run_to_end(&mut store, player, &mut world), RestoreStep::Failed(_)));
        assert!(store.has_record(player));
        assert_eq!(world.inventory[&player].len(), 3);

        world.failing.clear();
        assert_eq!(run_to_end(&mut store, player, &mut world), RestoreStep::Complete);
        assert_eq!(world.inventory[&player].len(), 5);
    }

    #[test]
    fn test_single_record_per_player() {
        let player = PlayerId::new(1);
        let mut store = RestoreStore::new();
        assert!(store.insert(player, sample_record()));
        assert!(!store.insert(player, RestoreRecord::default()));
        assert_eq!(store.record(player).unwrap().item_count(), 5);
    }

    #[test]
    fn test_add_prize_merges_or_appends() {
        let player = PlayerId::new(1);
        let mut store = RestoreStore::new();
        store.insert(player, sample_record());

        assert!(store.add_prize(player, 200, 5));
        assert_eq!(store.record(player).unwrap().main[0].amount, 1005);

        assert!(store.add_prize(player, -932, 3));
        let main = &store.record(player).unwrap().main;
        assert_eq!(main.last().unwrap().item_id, -932);
        assert_eq!(main.last().unwrap().position, -1);

        assert!(!store.add_prize(PlayerId::new(99), 200, 1));
    }

    #[test]
    fn test_binary_snapshot() {
        let mut store = RestoreStore::new();
        store.insert(PlayerId::new(3), sample_record());

        let bytes = store.to_bytes().unwrap();
        let loaded = RestoreStore::from_bytes(&bytes).unwrap();
        assert_eq!(loaded.record(PlayerId::new(3)), store.record(PlayerId::new(3)));
    }
}
