//! Event Manager
//!
//! Owns the single active event slot and every service that outlives an
//! event: definitions, mode registry, statistics, restore records and the
//! scheduler. The host feeds it world callbacks and elapsed time; all
//! deferred work runs from [`EventManager::advance`].

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::core::scheduler::{secs, Millis};
use crate::event::config::{validate_event_config, ConfigError, EventConfig};
use crate::event::notice::Notice;
use crate::event::orchestrator::{
    DamageEvent, DamageOutcome, DeathInfo, EventContext, EventGame, EventInfo, EventScheduler, EventStatus, Job,
    JobOwner, JoinError, RespawnError,
};
use crate::event::participant::{PlayerId, Team};
use crate::event::policy::{ModePolicy, ModeRegistry};
use crate::event::score::EventResults;
use crate::host::definitions::{DefinitionError, EventDefinitions};
use crate::host::restore::{RestoreStep, RestoreStore};
use crate::host::stats::StatisticsStore;
use crate::host::world::{EntityId, EntityRef, WorldActions};
use crate::settings::ManagerSettings;

// =============================================================================
// ERRORS
// =============================================================================

/// Fatal startup errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("Missing required dependencies: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),
}

/// Reasons an event cannot be opened.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpenError {
    #[error("There is already an event in progress: {0}")]
    AlreadyActive(String),

    #[error("Unable to find an event with the name {0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(#[from] ConfigError),
}

/// Admin command failures against the active event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("There is no event in progress")]
    NoEvent,

    #[error("The event is already closed")]
    AlreadyClosed,

    #[error("The event can not be started from its current state")]
    CannotStart,
}

// =============================================================================
// MANAGER
// =============================================================================

/// Global event manager.
pub struct EventManager<W: WorldActions> {
    world: W,
    settings: ManagerSettings,
    modes: ModeRegistry,
    definitions: EventDefinitions,
    scheduler: EventScheduler,
    stats: StatisticsStore,
    restore: RestoreStore,
    results: EventResults,
    notices: Vec<Notice>,
    /// At most one event at a time
    active: Option<EventGame>,
}

impl<W: WorldActions> EventManager<W> {
    /// Create the manager. Fails if the host lacks a required service.
    pub fn initialize(settings: ManagerSettings, world: W) -> Result<Self, InitError> {
        let missing = world.missing_dependencies();
        if !missing.is_empty() {
            error!(?missing, "Unable to initialize event manager");
            return Err(InitError::MissingDependencies(missing));
        }

        info!(
            start = settings.timers.start,
            prestart = settings.timers.prestart,
            "Event manager initialized"
        );
        Ok(Self {
            world,
            settings,
            modes: ModeRegistry::new(),
            definitions: EventDefinitions::new(),
            scheduler: EventScheduler::new(),
            stats: StatisticsStore::new(),
            restore: RestoreStore::new(),
            results: EventResults::default(),
            notices: Vec::new(),
            active: None,
        })
    }

    /// Split borrows: the active event plus a context over everything else.
    fn parts(&mut self) -> (Option<&mut EventGame>, EventContext<'_>) {
        let ctx = EventContext {
            world: &mut self.world,
            scheduler: &mut self.scheduler,
            stats: &mut self.stats,
            restore: &mut self.restore,
            results: &mut self.results,
            settings: &self.settings,
            notices: &mut self.notices,
            unloading: false,
        };
        (self.active.as_mut(), ctx)
    }

    /// Drop the active event once it has finished.
    fn reap(&mut self) {
        if self.active.as_ref().map_or(false, |g| g.status() == EventStatus::Finished) {
            if let Some(game) = self.active.take() {
                debug!(instance = %game.id(), "Finished event destroyed");
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn modes(&self) -> &ModeRegistry {
        &self.modes
    }

    pub fn definitions(&self) -> &EventDefinitions {
        &self.definitions
    }

    pub fn stats(&self) -> &StatisticsStore {
        &self.stats
    }

    pub fn restore_store(&self) -> &RestoreStore {
        &self.restore
    }

    pub fn active_event(&self) -> Option<&EventGame> {
        self.active.as_ref()
    }

    /// Current scheduler time.
    pub fn now(&self) -> Millis {
        self.scheduler.now()
    }

    /// Replace the persisted stores (host load).
    pub fn load_state(&mut self, definitions: EventDefinitions, stats: StatisticsStore, restore: RestoreStore) {
        info!(
            definitions = definitions.len(),
            restores = restore.len(),
            "Loaded persisted state"
        );
        self.definitions = definitions;
        self.stats = stats;
        self.restore = restore;
    }

    /// Status of the active event.
    pub fn event_info(&self) -> Option<EventInfo> {
        self.active.as_ref().map(EventGame::info)
    }

    /// Results of the most recently finished event.
    pub fn last_results(&self) -> Option<&EventResults> {
        self.results.is_valid().then_some(&self.results)
    }

    /// Drain notices produced since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // =========================================================================
    // Modes and definitions
    // =========================================================================

    pub fn register_mode<F>(&mut self, mode_type: &str, factory: F)
    where
        F: Fn() -> Box<dyn ModePolicy> + Send + Sync + 'static,
    {
        info!(mode = mode_type, "Event mode registered");
        self.modes.register(mode_type, factory);
    }

    pub fn modes_mut(&mut self) -> &mut ModeRegistry {
        &mut self.modes
    }

    /// Validate and save a new definition.
    pub fn create_event(&mut self, config: EventConfig) -> Result<(), DefinitionError> {
        validate_event_config(&config, &self.modes, &self.world)?;
        self.definitions.create(config)
    }

    /// Validate and replace an existing definition.
    pub fn update_event(&mut self, config: EventConfig) -> Result<(), DefinitionError> {
        validate_event_config(&config, &self.modes, &self.world)?;
        self.definitions.update(config)
    }

    pub fn delete_event(&mut self, name: &str) -> Result<EventConfig, DefinitionError> {
        self.definitions.delete(name)
    }

    // =========================================================================
    // Admin commands
    // =========================================================================

    /// Open a saved event. Only one event may be active.
    #[instrument(skip(self))]
    pub fn open_event(&mut self, name: &str) -> Result<(), OpenError> {
        if let Some(game) = &self.active {
            warn!(active = %game.config().event_name, "Rejected second concurrent event");
            return Err(OpenError::AlreadyActive(game.config().event_name.clone()));
        }

        let config = self
            .definitions
            .get(name)
            .cloned()
            .ok_or_else(|| OpenError::NotFound(name.to_string()))?;
        validate_event_config(&config, &self.modes, &self.world)?;
        let policy = self
            .modes
            .create(&config.mode_type)
            .ok_or_else(|| ConfigError::UnknownMode(config.mode_type.clone()))?;

        let (_, mut ctx) = self.parts();
        let game = EventGame::open(config, policy, &mut ctx);
        self.active = Some(game);
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn close_event(&mut self) -> Result<(), CommandError> {
        let (active, mut ctx) = self.parts();
        let game = active.ok_or(CommandError::NoEvent)?;
        if game.close(&mut ctx) {
            Ok(())
        } else {
            Err(CommandError::AlreadyClosed)
        }
    }

    /// Skip the current countdown.
    #[instrument(skip(self))]
    pub fn force_start(&mut self) -> Result<(), CommandError> {
        let (active, mut ctx) = self.parts();
        let game = active.ok_or(CommandError::NoEvent)?;
        let started = game.force_start(&mut ctx);
        self.reap();
        if started {
            Ok(())
        } else {
            Err(CommandError::CannotStart)
        }
    }

    /// End the active event now, awarding winners.
    #[instrument(skip(self))]
    pub fn end_event(&mut self) -> Result<(), CommandError> {
        let (active, mut ctx) = self.parts();
        let game = active.ok_or(CommandError::NoEvent)?;
        game.end_event(&mut ctx);
        self.reap();
        Ok(())
    }

    /// Host unload: end without awards and drop all pending work.
    #[instrument(skip(self))]
    pub fn unload(&mut self) {
        let (active, mut ctx) = self.parts();
        if let Some(game) = active {
            ctx.unloading = true;
            game.shutdown(&mut ctx);
        }
        self.active = None;

        let dropped = self.scheduler.cancel_where(|_, _| true);
        info!(dropped, pending_restores = self.restore.len(), "Event manager unloaded");
    }

    // =========================================================================
    // Player commands
    // =========================================================================

    pub fn can_join(&self, player: PlayerId) -> Result<(), JoinError> {
        self.active.as_ref().ok_or(JoinError::NoEvent)?.can_join(player)
    }

    #[instrument(skip(self))]
    pub fn join(&mut self, player: PlayerId, team: Team) -> Result<(), JoinError> {
        let (active, mut ctx) = self.parts();
        let game = active.ok_or(JoinError::NoEvent)?;
        let result = game.join(player, team, &mut ctx);
        if let Err(err) = &result {
            debug!(player = %player, "Join rejected: {}", err);
        }
        result
    }

    /// Leave the active event. Returns false if the player was not in it.
    #[instrument(skip(self))]
    pub fn leave(&mut self, player: PlayerId) -> bool {
        let (active, mut ctx) = self.parts();
        let left = match active {
            Some(game) => game.leave(player, &mut ctx),
            None => false,
        };
        self.reap();
        left
    }

    pub fn request_respawn(&mut self, player: PlayerId) -> Result<(), RespawnError> {
        let (active, mut ctx) = self.parts();
        active.ok_or(RespawnError::NotParticipant)?.request_respawn(player, &mut ctx)
    }

    pub fn set_auto_respawn(&mut self, player: PlayerId, enabled: bool) -> Result<(), RespawnError> {
        self.active
            .as_mut()
            .ok_or(RespawnError::NotParticipant)?
            .set_auto_respawn(player, enabled)
    }

    pub fn select_class(&mut self, player: PlayerId, kit: &str) -> Result<(), RespawnError> {
        let (active, mut ctx) = self.parts();
        active.ok_or(RespawnError::NotParticipant)?.select_class(player, kit, &mut ctx)
    }

    pub fn begin_spectating(&mut self, player: PlayerId) -> Result<PlayerId, RespawnError> {
        let (active, mut ctx) = self.parts();
        active.ok_or(RespawnError::NotParticipant)?.begin_spectating(player, &mut ctx)
    }

    pub fn cycle_spectate(&mut self, player: PlayerId) -> Result<PlayerId, RespawnError> {
        let (active, mut ctx) = self.parts();
        active.ok_or(RespawnError::NotParticipant)?.cycle_spectate(player, &mut ctx)
    }

    /// Is this chat command blocked for the player?
    pub fn is_command_blocked(&self, player: PlayerId, command: &str) -> bool {
        let in_event = self.active.as_ref().map_or(false, |g| g.is_member(player));
        if !in_event || self.world.is_admin(player) {
            return false;
        }

        let name = command
            .trim()
            .trim_start_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");
        self.settings
            .blacklisted_commands
            .iter()
            .any(|blocked| blocked.eq_ignore_ascii_case(name))
    }

    // =========================================================================
    // World callbacks
    // =========================================================================

    /// Start restoring a returning player if a record is pending.
    pub fn on_player_connected(&mut self, player: PlayerId) {
        if !self.restore.has_record(player) {
            return;
        }
        info!(player = %player, "Restoring returning player");
        self.restore.reset_progress(player);
        self.scheduler.cancel_owner(&JobOwner::Restore(player));
        self.scheduler
            .schedule_once(JobOwner::Restore(player), 0, Job::Restore(player));
    }

    pub fn on_player_disconnected(&mut self, player: PlayerId) {
        self.leave(player);
        self.scheduler.cancel_owner(&JobOwner::Restore(player));
        self.restore.reset_progress(player);
    }

    pub fn on_player_damaged(&mut self, victim: PlayerId, damage: DamageEvent) -> DamageOutcome {
        let (active, mut ctx) = self.parts();
        match active {
            Some(game) => game.on_player_damaged(victim, damage, &mut ctx),
            None => DamageOutcome::NotTracked,
        }
    }

    /// Returns true when the death was handled by the event.
    pub fn on_player_death(&mut self, victim: PlayerId, info: DeathInfo) -> bool {
        let (active, mut ctx) = self.parts();
        let handled = match active {
            Some(game) => game.on_player_death(victim, info, &mut ctx),
            None => false,
        };
        self.reap();
        handled
    }

    /// May `attacker` damage this entity? Non-participants are not our concern.
    pub fn on_entity_damaged(&self, attacker: PlayerId, entity: &EntityRef) -> bool {
        match &self.active {
            Some(game) if game.roster().contains(attacker) => game.on_entity_damaged(attacker, entity),
            _ => true,
        }
    }

    pub fn on_entity_deployed(&mut self, player: PlayerId, entity: EntityId) {
        if let Some(game) = self.active.as_mut() {
            game.on_entity_deployed(player, entity);
        }
    }

    pub fn on_zone_exit(&mut self, player: PlayerId, zone_id: &str) {
        let (active, mut ctx) = self.parts();
        if let Some(game) = active {
            game.on_zone_exit(player, zone_id, &mut ctx);
        }
    }

    pub fn on_zone_enter(&mut self, player: PlayerId, zone_id: &str) {
        let (active, mut ctx) = self.parts();
        if let Some(game) = active {
            game.on_zone_enter(player, zone_id, &mut ctx);
        }
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// Advance the clock, running every job that falls due. Returns the
    /// number of jobs run.
    pub fn advance(&mut self, elapsed: Millis) -> usize {
        let until = self.scheduler.now() + elapsed;
        let mut ran = 0;

        while let Some(due) = self.scheduler.pop_due(until) {
            ran += 1;
            match due.action {
                Job::Game(job) => {
                    let (active, mut ctx) = self.parts();
                    match active {
                        Some(game) if due.owner.instance() == Some(game.id()) => game.run_job(job, &mut ctx),
                        _ => warn!(owner = ?due.owner, ?job, "Dropped job for an event that no longer exists"),
                    }
                    self.reap();
                }
                Job::Restore(player) => self.run_restore(player),
            }
        }

        self.scheduler.settle(until);
        ran
    }

    fn run_restore(&mut self, player: PlayerId) {
        let owner = JobOwner::Restore(player);
        let retry = secs(self.settings.restore_retry_secs as u64);

        match self.restore.step(player, &mut self.world) {
            RestoreStep::NoRecord => debug!(player = %player, "Nothing to restore"),
            RestoreStep::Gone => info!(player = %player, "Player gone, restore deferred until reconnect"),
            RestoreStep::NotReady => {
                debug!(player = %player, "Player not ready, retrying restore");
                self.scheduler.schedule_once(owner, retry, Job::Restore(player));
            }
            RestoreStep::Progressed => {
                self.scheduler.schedule_once(owner, 0, Job::Restore(player));
            }
            RestoreStep::Failed(err) => {
                warn!(player = %player, "Restore step failed, retrying: {}", err);
                self.scheduler.schedule_once(owner, retry, Job::Restore(player));
            }
            RestoreStep::Complete => info!(player = %player, "Player restored"),
        }
    }
}

impl<W: WorldActions> std::fmt::Debug for EventManager<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventManager")
            .field("active", &self.active)
            .field("definitions", &self.definitions.names())
            .field("modes", &self.modes)
            .field("pending_jobs", &self.scheduler.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
