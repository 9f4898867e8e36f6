//! Arena Events demo host
//!
//! Runs one simulated deathmatch against a logging world so the full
//! lifecycle (open, prestart, kills, finish, restore) can be watched.
//! Settings are read from the path in the first argument, if given.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use arena_events::{
    event::{
        config::TeamConfig,
        orchestrator::{DamageEvent, DeathInfo},
        participant::PlayerId,
        score::ScoreEntry,
        spawn::Position,
    },
    host::{
        restore::{ContainerKind, ItemData, RestoreRecord, Vitals},
        stats::Statistic,
        world::{EntityId, ReferenceLookup, WorldActions, WorldError},
    },
    modes::{deathmatch, register_builtin_modes},
    settings::RewardKind,
    DeterministicRng, EventConfig, EventManager, ManagerSettings, Team, SECOND, VERSION,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Arena Events v{}", VERSION);

    let settings = match std::env::args().nth(1) {
        Some(path) => ManagerSettings::load(Path::new(&path)).with_context(|| format!("loading {}", path))?,
        None => ManagerSettings::default(),
    };

    demo_event(settings)
}

/// Simulate one deathmatch from open to restore.
fn demo_event(settings: ManagerSettings) -> Result<()> {
    let mut manager = EventManager::initialize(settings, DemoWorld::new())?;
    register_builtin_modes(manager.modes_mut());

    manager.create_event(EventConfig {
        event_name: "demo".into(),
        mode_type: deathmatch::MODE_TYPE.into(),
        zone_id: "arena".into(),
        score_limit: 5,
        time_limit: 300,
        minimum_players: 2,
        maximum_players: 8,
        team_a: TeamConfig {
            spawn_set: "ffa".into(),
            kits: vec!["rifle".into()],
            ..TeamConfig::default()
        },
        ..EventConfig::default()
    })?;
    manager.open_event("demo")?;

    let players: Vec<PlayerId> = (1..=4).map(PlayerId::new).collect();
    for player in &players {
        manager.join(*player, Team::None)?;
    }

    // Open timer, materialization and prestart countdown
    let warmup = manager.settings().timers.start + manager.settings().timers.prestart + 2;
    manager.advance(warmup as u64 * SECOND);

    let mut rng = DeterministicRng::new(0x5eed);
    let mut second = 0;
    while manager.active_event().is_some() && second < 600 {
        manager.advance(SECOND);
        second += 1;

        if second % 4 != 0 {
            continue;
        }
        let Some(&attacker) = rng.choose(&players) else {
            break;
        };
        let Some(&victim) = rng.choose(&players) else {
            break;
        };
        if attacker == victim {
            continue;
        }

        let hit = DamageEvent { attacker: Some(attacker), amount: 100.0 };
        manager.on_player_damaged(victim, hit);
        let info = DeathInfo { attacker: Some(attacker), headshot: rng.next_int(4) == 0, melee: false };
        if manager.on_player_death(victim, info) {
            debug!(victim = %victim, attacker = %attacker, "Simulated kill");
        }
        let _ = manager.request_respawn(victim);
    }

    // Drain restores
    manager.advance(SECOND);

    info!("=== Event Results ===");
    if let Some(results) = manager.last_results() {
        for entry in &results.scores {
            info!("#{} {} kills={} deaths={}", entry.position, entry.display_name, entry.value1, entry.value2);
        }
    }
    for (player, record) in manager.stats().sorted_by(Statistic::Kills) {
        info!(
            "{} ({}) rank {} kills {} wins {}",
            record.display_name,
            player.short_hex(),
            manager.stats().rank(player),
            record.get(Statistic::Kills),
            record.get(Statistic::Wins)
        );
    }
    info!("Pending restores: {}", manager.restore_store().len());

    Ok(())
}

// =============================================================================
// DEMO WORLD
// =============================================================================

/// World that logs every side effect.
struct DemoWorld {
    spawns: BTreeMap<String, Vec<Position>>,
    inventories: BTreeMap<PlayerId, usize>,
}

impl DemoWorld {
    fn new() -> Self {
        let ring = (0..8)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::FRAC_PI_4;
                Position::new(angle.cos() * 40.0, 0.0, angle.sin() * 40.0)
            })
            .collect();
        Self {
            spawns: BTreeMap::from([("ffa".to_string(), ring)]),
            inventories: BTreeMap::new(),
        }
    }
}

impl ReferenceLookup for DemoWorld {
    fn kit_exists(&self, kit: &str) -> bool {
        kit == "rifle"
    }

    fn spawn_points(&self, spawn_set: &str) -> Option<Vec<Position>> {
        self.spawns.get(spawn_set).cloned()
    }

    fn zone_exists(&self, zone_id: &str) -> bool {
        zone_id == "arena"
    }
}

impl WorldActions for DemoWorld {
    fn is_connected(&self, _player: PlayerId) -> bool {
        true
    }

    fn is_sleeping(&self, _player: PlayerId) -> bool {
        false
    }

    fn is_ready_for_world_state(&self, _player: PlayerId) -> bool {
        true
    }

    fn display_name(&self, player: PlayerId) -> String {
        format!("Player{}", player)
    }

    fn capture_snapshot(&self, _player: PlayerId) -> Option<RestoreRecord> {
        Some(RestoreRecord {
            vitals: Vitals { health: 100.0, hydration: 250.0, calories: 500.0 },
            belt: vec![ItemData::stack(1545779598, 1, 0)],
            ..RestoreRecord::default()
        })
    }

    fn set_vitals(&mut self, player: PlayerId, vitals: Vitals) {
        debug!(player = %player, ?vitals, "set vitals");
    }

    fn give_item(&mut self, player: PlayerId, container: ContainerKind, item: &ItemData) -> Result<(), WorldError> {
        debug!(player = %player, ?container, item = item.item_id, amount = item.amount, "give item");
        *self.inventories.entry(player).or_default() += 1;
        Ok(())
    }

    fn teleport(&mut self, player: PlayerId, position: Position, _sleep: bool) {
        debug!(player = %player, x = position.x, z = position.z, "teleport");
    }

    fn strip_inventory(&mut self, player: PlayerId) {
        self.inventories.remove(&player);
    }

    fn reset_vitals(&mut self, _player: PlayerId) {}

    fn issue_kit(&mut self, player: PlayerId, kit: &str) {
        debug!(player = %player, kit, "issue kit");
    }

    fn clear_worn_items(&mut self, _player: PlayerId) {}

    fn dismount(&mut self, _player: PlayerId) {}

    fn set_network_visible(&mut self, _player: PlayerId, _visible: bool) {}

    fn drop_backpack(&mut self, player: PlayerId, despawn_secs: u32) {
        debug!(player = %player, despawn_secs, "drop backpack");
    }

    fn kill_player(&mut self, player: PlayerId) {
        debug!(player = %player, "kill");
    }

    fn set_zone_access(&mut self, _zone_id: &str, _player: PlayerId, _allowed: bool) {}

    fn give_reward(&mut self, player: PlayerId, kind: RewardKind, amount: i32) {
        info!(player = %player, ?kind, amount, "reward");
    }

    fn destroy_entity(&mut self, entity: EntityId) {
        debug!(entity, "destroy entity");
    }

    fn broadcast(&mut self, message: &str) {
        info!("[broadcast] {}", message);
    }

    fn send_message(&mut self, player: PlayerId, message: &str) {
        debug!("[to {}] {}", player, message);
    }

    fn show_timer(&mut self, _player: PlayerId, _clock: &str, _message: &str) {}

    fn clear_timer(&mut self, _player: PlayerId) {}

    fn show_scoreboard(&mut self, _player: PlayerId, _entries: &[ScoreEntry]) {}

    fn show_death_screen(&mut self, player: PlayerId, message: &str, respawn_remaining: u32) {
        debug!(player = %player, respawn_remaining, "{}", message);
    }

    fn clear_death_screen(&mut self, _player: PlayerId) {}

    fn spectate(&mut self, _player: PlayerId, _target: Option<PlayerId>) {}
}
