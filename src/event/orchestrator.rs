//! Event Orchestrator
//!
//! The lifecycle state machine of one event run:
//!
//! ```text
//!   Open ──(open timer / force start)──> Prestarting ──(countdown)──> Started ──> Finished
//!     │                                      │                           │
//!     └──── not enough players ──────────────┴──── not enough players ───┘
//! ```
//!
//! All deferred work (countdowns, respawn ticks, staged materialization,
//! kit issue on the next tick) is queued in the shared scheduler with a
//! [`JobOwner`] naming this instance. Reaching `Finished` ejects every
//! participant and cancels everything the instance owns; the manager then
//! drops it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::{resolve_team_color, EventConfig};
use super::notice::{Audience, EventNotice, Notice};
use super::participant::{OutOfBoundsTick, Participant, PlayerId, RespawnTick, Team};
use super::policy::ModePolicy;
use super::roster::{JoiningPlayer, Roster};
use super::score::{EventResults, Scoreboard};
use super::spawn::{Position, SpawnSelector};
use super::timer::{GameTimer, TimerExpiry, TimerTick};
use crate::core::rng::{derive_event_seed, DeterministicRng};
use crate::core::scheduler::{secs, Scheduler, SECOND};
use crate::host::restore::RestoreStore;
use crate::host::stats::{Statistic, StatisticsStore};
use crate::host::world::{EntityId, EntityRef, WorldActions};
use crate::settings::{ManagerSettings, RewardKind};

/// Identifies one event run.
pub type InstanceId = Uuid;

// =============================================================================
// SCHEDULED WORK
// =============================================================================

/// Who owns a scheduled job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobOwner {
    /// The event instance itself
    Event(InstanceId),
    /// One participant of an event instance
    Participant(InstanceId, PlayerId),
    /// A pending player restore (outlives the event)
    Restore(PlayerId),
}

impl JobOwner {
    /// Event instance the job belongs to, if any.
    pub fn instance(&self) -> Option<InstanceId> {
        match self {
            JobOwner::Event(id) | JobOwner::Participant(id, _) => Some(*id),
            JobOwner::Restore(_) => None,
        }
    }
}

/// Work owned by an event instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameJob {
    /// Open timer ran out
    Prestart,
    /// One second of the game timer
    TimerTick,
    /// Materialize the next waiting player
    MaterializeNext,
    RespawnTick(PlayerId),
    OutOfBoundsTick(PlayerId),
    /// Issue the selected loadout (one tick after spawning)
    IssueKit(PlayerId),
}

/// Anything the manager's scheduler runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Job {
    Game(GameJob),
    Restore(PlayerId),
}

/// Scheduler shared by the manager and the active event.
pub type EventScheduler = Scheduler<JobOwner, Job>;

// =============================================================================
// STATUS AND ERRORS
// =============================================================================

/// Lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    /// Accepting joins into the waiting list
    Open,
    /// Materializing players and counting down
    Prestarting,
    /// Live
    Started,
    /// Terminal
    Finished,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Join rejections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JoinError {
    #[error("There is no event in progress")]
    NoEvent,

    #[error("You are already in the event")]
    AlreadyJoined,

    #[error("The event has been closed to new players")]
    Closed,

    #[error("The event is about to start, try again once the round is underway")]
    Starting,

    #[error("The event has finished")]
    Finished,

    #[error("The event is already at maximum capacity")]
    Full,

    /// Mode-specific veto
    #[error("{0}")]
    Vetoed(String),
}

/// Respawn and loadout rejections.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RespawnError {
    #[error("You are not playing in the event")]
    NotParticipant,

    #[error("You are not dead")]
    NotDead,

    #[error("Select a class to continue...")]
    NoLoadout,

    #[error("You can respawn in {0} seconds")]
    NotYet(u32),

    #[error("The class {0} is not available to your team")]
    KitUnavailable(String),

    #[error("Nobody is available to spectate")]
    NoSpectateTarget,
}

// =============================================================================
// DAMAGE
// =============================================================================

/// Incoming damage to a participant.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DamageEvent {
    /// Attacking player (None for environment)
    pub attacker: Option<PlayerId>,
    pub amount: f32,
}

/// Lethal damage details.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeathInfo {
    pub attacker: Option<PlayerId>,
    pub headshot: bool,
    pub melee: bool,
}

/// What the host should do with incoming damage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DamageOutcome {
    /// Victim is not part of the event
    NotTracked,
    /// Drop the damage entirely
    Suppressed,
    /// Apply this (scaled) amount
    Applied(f32),
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Manager-owned collaborators lent to the event for one call.
pub struct EventContext<'a> {
    pub world: &'a mut dyn WorldActions,
    pub scheduler: &'a mut EventScheduler,
    pub stats: &'a mut StatisticsStore,
    pub restore: &'a mut RestoreStore,
    pub results: &'a mut EventResults,
    pub settings: &'a ManagerSettings,
    pub notices: &'a mut Vec<Notice>,
    /// Host is unloading: kill instead of restoring
    pub unloading: bool,
}

/// Status report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub event_name: String,
    pub mode_type: String,
    pub status: EventStatus,
    pub players: usize,
    pub joining: usize,
    pub max_players: usize,
    pub details: Vec<(String, String)>,
}

// =============================================================================
// EVENT GAME
// =============================================================================

/// One running event instance.
pub struct EventGame {
    id: InstanceId,
    config: EventConfig,
    policy: Box<dyn ModePolicy>,
    status: EventStatus,
    closed: bool,
    godmode: bool,
    roster: Roster,
    scoreboard: Scoreboard,
    spawns_a: SpawnSelector<Position>,
    spawns_b: Option<SpawnSelector<Position>>,
    timer: GameTimer,
    team_a_color: String,
    team_b_color: String,
    rng: DeterministicRng,
    deployed: Vec<EntityId>,
    death_screens: BTreeMap<PlayerId, String>,
    prestart_task: Option<crate::core::scheduler::TaskId>,
}

impl EventGame {
    /// Open a new instance and schedule its prestart.
    pub fn open(config: EventConfig, mut policy: Box<dyn ModePolicy>, ctx: &mut EventContext<'_>) -> Self {
        let id = Uuid::new_v4();
        policy.initialize_from_config(&config);

        let seed = |purpose: &str| derive_event_seed(&config.event_name, id.as_bytes(), purpose);

        let spawns_a = SpawnSelector::new(
            ctx.world.spawn_points(&config.team_a.spawn_set).unwrap_or_default(),
            seed("spawns-a"),
        );
        let spawns_b = policy.is_team_mode().then(|| {
            SpawnSelector::new(
                ctx.world.spawn_points(&config.team_b.spawn_set).unwrap_or_default(),
                seed("spawns-b"),
            )
        });

        let prestart_task = Some(ctx.scheduler.schedule_once(
            JobOwner::Event(id),
            secs(ctx.settings.timers.start as u64),
            Job::Game(GameJob::Prestart),
        ));

        let game = Self {
            id,
            team_a_color: resolve_team_color(&config.team_a.color, Team::A),
            team_b_color: resolve_team_color(&config.team_b.color, Team::B),
            rng: DeterministicRng::new(seed("balance")),
            config,
            policy,
            status: EventStatus::Open,
            closed: false,
            godmode: true,
            roster: Roster::new(),
            scoreboard: Scoreboard::new(),
            spawns_a,
            spawns_b,
            timer: GameTimer::new(),
            deployed: Vec::new(),
            death_screens: BTreeMap::new(),
            prestart_task,
        };

        info!(
            event = %game.config.event_name,
            mode = %game.config.mode_type,
            instance = %game.id,
            "Event opened"
        );
        let notice = EventNotice::EventOpen {
            event_name: game.config.event_name.clone(),
            mode_type: game.config.mode_type.clone(),
            starts_in: ctx.settings.timers.start as u64,
        };
        game.notify(ctx, Audience::Everyone, notice);
        game
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn ModePolicy {
        self.policy.as_ref()
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Damage suppressed (outside `Started`)?
    pub fn godmode(&self) -> bool {
        self.godmode
    }

    pub fn timer(&self) -> &GameTimer {
        &self.timer
    }

    pub fn team_color(&self, team: Team) -> &str {
        match team {
            Team::B => &self.team_b_color,
            _ => &self.team_a_color,
        }
    }

    /// In the event or waiting to be materialized?
    pub fn is_member(&self, player: PlayerId) -> bool {
        self.roster.contains(player) || self.roster.is_joining(player)
    }

    pub fn info(&self) -> EventInfo {
        EventInfo {
            event_name: self.config.event_name.clone(),
            mode_type: self.config.mode_type.clone(),
            status: self.status,
            players: self.roster.len(),
            joining: self.roster.joining_len(),
            max_players: self.config.maximum_players,
            details: self.policy.additional_details(),
        }
    }

    /// Enough players to go on? Players still waiting to be materialized count.
    pub fn has_minimum_players(&self) -> bool {
        self.roster.len() + self.roster.joining_len() >= self.config.minimum_players
    }

    // =========================================================================
    // Admin transitions
    // =========================================================================

    /// Stop accepting new players. Returns false if already closed.
    pub fn close(&mut self, ctx: &mut EventContext<'_>) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        info!(event = %self.config.event_name, "Event closed to new players");
        let event_name = self.config.event_name.clone();
        self.notify(ctx, Audience::Everyone, EventNotice::EventClosed { event_name });
        true
    }

    /// Skip the current wait. Returns false when there is nothing to skip.
    pub fn force_start(&mut self, ctx: &mut EventContext<'_>) -> bool {
        match self.status {
            EventStatus::Open => {
                self.cancel_prestart(ctx);
                self.prestart(ctx);
                true
            }
            EventStatus::Prestarting => {
                self.start_event(ctx);
                true
            }
            status => {
                warn!(event = %self.config.event_name, %status, "Force start ignored");
                false
            }
        }
    }

    fn cancel_prestart(&mut self, ctx: &mut EventContext<'_>) {
        if let Some(task) = self.prestart_task.take() {
            ctx.scheduler.cancel(task);
        }
    }

    // =========================================================================
    // Scheduled work
    // =========================================================================

    /// Run one job owned by this instance.
    pub fn run_job(&mut self, job: GameJob, ctx: &mut EventContext<'_>) {
        if self.status == EventStatus::Finished {
            warn!(instance = %self.id, ?job, "Job ran against a finished event");
            return;
        }

        match job {
            GameJob::Prestart => {
                self.prestart_task = None;
                self.prestart(ctx);
            }
            GameJob::TimerTick => self.timer_tick(ctx),
            GameJob::MaterializeNext => self.materialize_next(ctx),
            GameJob::RespawnTick(player) => self.respawn_tick(player, ctx),
            GameJob::OutOfBoundsTick(player) => self.out_of_bounds_tick(player, ctx),
            GameJob::IssueKit(player) => self.issue_kit(player, ctx),
        }
    }

    fn prestart(&mut self, ctx: &mut EventContext<'_>) {
        if self.status != EventStatus::Open {
            warn!(event = %self.config.event_name, status = %self.status, "Prestart ignored");
            return;
        }

        if !self.has_minimum_players() {
            info!(
                event = %self.config.event_name,
                waiting = self.roster.joining_len(),
                minimum = self.config.minimum_players,
                "Not enough players to start"
            );
            self.notify(ctx, Audience::Everyone, EventNotice::NotEnoughToStart);
            self.end_event(ctx);
            return;
        }

        self.status = EventStatus::Prestarting;
        info!(event = %self.config.event_name, waiting = self.roster.joining_len(), "Event prestarting");

        ctx.scheduler.schedule_once(
            JobOwner::Event(self.id),
            0,
            Job::Game(GameJob::MaterializeNext),
        );
    }

    fn materialize_next(&mut self, ctx: &mut EventContext<'_>) {
        match self.roster.take_next_joining() {
            Some(joiner) => {
                self.materialize(joiner, ctx);
                ctx.scheduler.schedule_once(
                    JobOwner::Event(self.id),
                    ctx.settings.spawn_stagger_ms,
                    Job::Game(GameJob::MaterializeNext),
                );
            }
            None if self.status == EventStatus::Prestarting => {
                let countdown = ctx.settings.timers.prestart;
                self.update_scoreboard(ctx);
                self.start_timer(ctx, countdown, "Round starts in", TimerExpiry::StartEvent);
            }
            None => {}
        }
    }

    fn start_event(&mut self, ctx: &mut EventContext<'_>) {
        if self.status >= EventStatus::Started {
            warn!(event = %self.config.event_name, status = %self.status, "Start ignored");
            return;
        }

        self.cancel_prestart(ctx);

        if !self.has_minimum_players() {
            self.notify(ctx, Audience::Everyone, EventNotice::NotEnoughToStart);
            self.end_event(ctx);
            return;
        }

        if self.policy.balances_teams_on_start() {
            let moved = self.roster.balance_teams(&mut self.rng);
            if !moved.is_empty() {
                self.notify(ctx, Audience::Participants, EventNotice::TeamsUnbalanced);
                for (player, team) in moved {
                    self.notify(ctx, Audience::Player(player), EventNotice::TeamChanged { team });
                }
            }
        }

        self.stop_timer(ctx);
        self.status = EventStatus::Started;
        self.godmode = false;

        if self.config.time_limit > 0 {
            self.start_timer(ctx, self.config.time_limit, "", TimerExpiry::EndEvent);
        }

        for player in self.roster.ids() {
            let dead = self.roster.get(player).map_or(false, |p| p.dead);
            if dead {
                self.respawn(player, ctx);
            } else {
                if let Some(p) = self.roster.get_mut(player) {
                    p.revive();
                }
                self.spawn_player(player, true, false, ctx);
            }
        }

        self.update_scoreboard(ctx);
        info!(event = %self.config.event_name, players = self.roster.len(), "Event started");
    }

    /// End the event, award winners and eject everyone.
    pub fn end_event(&mut self, ctx: &mut EventContext<'_>) {
        self.finish(ctx, true);
    }

    /// End without awarding (host unload).
    pub fn shutdown(&mut self, ctx: &mut EventContext<'_>) {
        self.finish(ctx, false);
    }

    fn finish(&mut self, ctx: &mut EventContext<'_>, award: bool) {
        if self.status == EventStatus::Finished {
            return;
        }

        self.cancel_prestart(ctx);
        self.stop_timer(ctx);
        self.status = EventStatus::Finished;
        self.godmode = true;

        self.scoreboard.rebuild(&self.roster, self.policy.as_ref());
        let team_score = self
            .policy
            .is_team_mode()
            .then(|| (self.policy.team_score(Team::A), self.policy.team_score(Team::B)));
        ctx.results.update(
            &self.config.event_name,
            &self.config.mode_type,
            team_score,
            self.scoreboard.entries(),
        );

        if award && self.roster.len() > 0 {
            self.process_winners(ctx);
            for p in self.roster.participants() {
                ctx.stats.on_game_played(p.id, &p.display_name, &self.config.mode_type);
            }
            ctx.stats.on_game_played_global(&self.config.mode_type);
        }

        for player in self.roster.ids() {
            self.remove_participant(player, ctx);
        }
        while self.roster.take_next_joining().is_some() {}

        for entity in self.deployed.drain(..) {
            ctx.world.destroy_entity(entity);
        }

        let id = self.id;
        let cancelled = ctx.scheduler.cancel_where(|owner, _| owner.instance() == Some(id));
        info!(
            event = %self.config.event_name,
            instance = %self.id,
            cancelled,
            "Event finished"
        );
    }

    fn process_winners(&mut self, ctx: &mut EventContext<'_>) {
        let winners = self.policy.compute_winners(&self.roster);
        let settings = ctx.settings;

        for p in self.roster.participants() {
            let statistic = if winners.contains(&p.id) { Statistic::Wins } else { Statistic::Losses };
            ctx.stats.add(p.id, &p.display_name, statistic, 1);
            ctx.stats.add(p.id, &p.display_name, Statistic::Played, 1);
        }
        for winner in &winners {
            self.give_reward(*winner, settings.rewards.win_amount, ctx);
        }

        if winners.is_empty() || !settings.messages.broadcast_winners {
            return;
        }

        let names: Vec<String> = winners
            .iter()
            .filter_map(|id| self.roster.get(*id))
            .map(|p| p.display_name.clone())
            .collect();

        let notice = if self.policy.is_team_mode() {
            let team = self.roster.get(winners[0]).map_or(Team::None, |p| p.team);
            EventNotice::TeamWinner {
                team,
                color: self.team_color(team).to_string(),
                players: names,
            }
        } else if names.len() == 1 {
            EventNotice::SingleWinner { player: names[0].clone() }
        } else {
            EventNotice::MultipleWinners { players: names }
        };
        self.notify(ctx, Audience::Everyone, notice);
    }

    // =========================================================================
    // Timer
    // =========================================================================

    fn start_timer(&mut self, ctx: &mut EventContext<'_>, duration: u32, message: &str, expiry: TimerExpiry) {
        self.timer.start(
            &mut *ctx.scheduler,
            JobOwner::Event(self.id),
            Job::Game(GameJob::TimerTick),
            duration,
            message,
            expiry,
        );
    }

    fn stop_timer(&mut self, ctx: &mut EventContext<'_>) {
        self.timer.stop(&mut *ctx.scheduler);
        for p in self.roster.participants() {
            ctx.world.clear_timer(p.id);
        }
    }

    fn timer_tick(&mut self, ctx: &mut EventContext<'_>) {
        match self.timer.tick(&mut *ctx.scheduler) {
            TimerTick::Display { clock, message } => {
                for p in self.roster.participants() {
                    ctx.world.show_timer(p.id, &clock, &message);
                }
            }
            TimerTick::Expired(TimerExpiry::StartEvent) => self.start_event(ctx),
            TimerTick::Expired(TimerExpiry::EndEvent) => self.end_event(ctx),
            TimerTick::Idle => {}
        }
    }

    // =========================================================================
    // Join / leave
    // =========================================================================

    /// Check whether a player may join right now.
    pub fn can_join(&self, player: PlayerId) -> Result<(), JoinError> {
        if self.is_member(player) {
            return Err(JoinError::AlreadyJoined);
        }
        if self.closed {
            return Err(JoinError::Closed);
        }
        match self.status {
            EventStatus::Finished => return Err(JoinError::Finished),
            EventStatus::Prestarting => return Err(JoinError::Starting),
            _ => {}
        }
        if self.roster.len() + self.roster.joining_len() >= self.config.maximum_players {
            return Err(JoinError::Full);
        }
        if let Some(reason) = self.policy.can_join(player, &self.roster) {
            return Err(JoinError::Vetoed(reason));
        }
        Ok(())
    }

    /// Join the event. Live events materialize the player immediately.
    pub fn join(&mut self, player: PlayerId, team: Team, ctx: &mut EventContext<'_>) -> Result<(), JoinError> {
        self.can_join(player)?;

        let display_name = ctx.world.display_name(player);
        let joiner = JoiningPlayer {
            id: player,
            display_name: display_name.clone(),
            requested_team: team,
        };

        if self.status == EventStatus::Started {
            self.materialize(joiner, ctx);
            self.update_scoreboard(ctx);
        } else {
            self.roster.add_joining(joiner.id, &joiner.display_name, joiner.requested_team);
        }

        info!(event = %self.config.event_name, player = %player, "Player joined");
        if ctx.settings.messages.broadcast_joiners {
            self.notify(
                ctx,
                Audience::Everyone,
                EventNotice::PlayerJoined { player: display_name, event_name: self.config.event_name.clone() },
            );
        }
        Ok(())
    }

    /// Leave the event. Returns false if the player was not in it.
    pub fn leave(&mut self, player: PlayerId, ctx: &mut EventContext<'_>) -> bool {
        let display_name = if let Some(joiner) = self.roster.remove_joining(player) {
            joiner.display_name
        } else if let Some(p) = self.roster.get(player) {
            let name = p.display_name.clone();
            self.remove_participant(player, ctx);
            name
        } else {
            return false;
        };

        info!(event = %self.config.event_name, player = %player, "Player left");
        if ctx.settings.messages.broadcast_leavers {
            self.notify(
                ctx,
                Audience::Everyone,
                EventNotice::PlayerLeft { player: display_name, event_name: self.config.event_name.clone() },
            );
        }

        if self.status != EventStatus::Finished && self.status != EventStatus::Open && !self.has_minimum_players() {
            self.notify(ctx, Audience::Participants, EventNotice::NotEnoughToContinue);
            self.end_event(ctx);
        } else if self.status == EventStatus::Started {
            self.update_scoreboard(ctx);
        }
        true
    }

    fn materialize(&mut self, joiner: JoiningPlayer, ctx: &mut EventContext<'_>) {
        let player = joiner.id;
        ctx.restore.capture(player, &*ctx.world);

        let team = self.policy.assign_team(player, joiner.requested_team, &self.roster);
        let mut participant = Participant::new(player, &joiner.display_name);
        participant.team = team;

        let kits = &self.config.team(team).kits;
        if !self.config.allow_class_selection || kits.len() <= 1 {
            participant.kit = kits.first().cloned();
        }
        self.roster.insert(participant);

        ctx.world.set_zone_access(&self.config.zone_id, player, true);
        self.spawn_player(player, self.status == EventStatus::Started, true, ctx);
        debug!(event = %self.config.event_name, player = %player, %team, "Participant materialized");
    }

    fn remove_participant(&mut self, player: PlayerId, ctx: &mut EventContext<'_>) {
        ctx.scheduler.cancel_owner(&JobOwner::Participant(self.id, player));
        let Some(p) = self.roster.remove(player) else {
            return;
        };
        self.policy.on_participant_removed(player);
        self.death_screens.remove(&player);

        let world = &mut *ctx.world;
        world.set_zone_access(&self.config.zone_id, player, false);
        world.clear_timer(player);
        if p.dead {
            world.clear_death_screen(player);
            world.set_network_visible(player, true);
        }
        if p.is_spectating() {
            world.spectate(player, None);
        }

        self.redirect_spectators(player, ctx);

        if ctx.unloading || !ctx.world.is_connected(player) || ctx.world.is_sleeping(player) {
            ctx.world.strip_inventory(player);
            ctx.world.kill_player(player);
            debug!(player = %player, "Participant removed while away, restore deferred");
        } else {
            ctx.scheduler.cancel_owner(&JobOwner::Restore(player));
            ctx.scheduler.schedule_once(JobOwner::Restore(player), 0, Job::Restore(player));
        }
    }

    // =========================================================================
    // Spawning
    // =========================================================================

    fn spawn_player(&mut self, player: PlayerId, give_kit: bool, sleep: bool, ctx: &mut EventContext<'_>) {
        let Some(team) = self.roster.get(player).map(|p| p.team) else {
            return;
        };

        ctx.world.dismount(player);
        ctx.world.strip_inventory(player);
        ctx.world.reset_vitals(player);

        let point = match (&mut self.spawns_b, team) {
            (Some(spawns_b), Team::B) => spawns_b.get_spawn_point(),
            _ => self.spawns_a.get_spawn_point(),
        };
        match point {
            Some(point) => ctx.world.teleport(player, point, sleep),
            None => warn!(event = %self.config.event_name, %team, "No spawn points available"),
        }

        let now = ctx.scheduler.now();
        let Some(p) = self.roster.get_mut(player) else {
            return;
        };

        if p.kit.is_none() {
            p.force_select_class();
            let message = EventNotice::SelectClass.to_string();
            ctx.world.show_death_screen(player, &message, 0);
            self.death_screens.insert(player, message);
            return;
        }

        ctx.world.show_scoreboard(player, self.scoreboard.entries());
        if give_kit {
            ctx.scheduler.schedule_once(
                JobOwner::Participant(self.id, player),
                0,
                Job::Game(GameJob::IssueKit(player)),
            );
        }

        p.apply_invincibility(now);
        self.policy.on_player_spawned(p, &mut *ctx.world);
    }

    fn issue_kit(&mut self, player: PlayerId, ctx: &mut EventContext<'_>) {
        let Some(p) = self.roster.get(player) else {
            return;
        };
        if p.dead || !self.policy.can_issue_kit(p) {
            return;
        }
        let Some(kit) = p.kit.as_deref() else {
            return;
        };

        ctx.world.issue_kit(player, kit);

        if self.policy.is_team_mode() {
            let clothing = &self.config.team(p.team).clothing;
            if !clothing.is_empty() {
                ctx.world.clear_worn_items(player);
                ctx.world.issue_kit(player, clothing);
            }
        }

        self.policy.on_kit_issued(p, &mut *ctx.world);
    }

    fn respawn(&mut self, player: PlayerId, ctx: &mut EventContext<'_>) -> bool {
        let Some(p) = self.roster.get_mut(player) else {
            return false;
        };
        if !p.dead {
            return false;
        }

        let was_spectating = p.is_spectating();
        p.revive();
        self.death_screens.remove(&player);

        let owner = JobOwner::Participant(self.id, player);
        ctx.scheduler.cancel_where(|o, job| *o == owner && *job == Job::Game(GameJob::RespawnTick(player)));

        ctx.world.clear_death_screen(player);
        if was_spectating {
            ctx.world.spectate(player, None);
        }
        ctx.world.set_network_visible(player, true);

        self.spawn_player(player, self.status == EventStatus::Started, false, ctx);
        true
    }

    /// Manual respawn request from a dead participant.
    pub fn request_respawn(&mut self, player: PlayerId, ctx: &mut EventContext<'_>) -> Result<(), RespawnError> {
        let p = self.roster.get(player).ok_or(RespawnError::NotParticipant)?;
        if !p.dead {
            return Err(RespawnError::NotDead);
        }
        if p.kit.is_none() {
            return Err(RespawnError::NoLoadout);
        }
        if !p.can_respawn() {
            return Err(RespawnError::NotYet(p.respawn_remaining()));
        }

        self.respawn(player, ctx);
        Ok(())
    }

    /// Opt in or out of automatic respawn.
    pub fn set_auto_respawn(&mut self, player: PlayerId, enabled: bool) -> Result<(), RespawnError> {
        let p = self.roster.get_mut(player).ok_or(RespawnError::NotParticipant)?;
        p.auto_respawn = enabled;
        Ok(())
    }

    /// Pick a loadout from the team's kit list.
    pub fn select_class(&mut self, player: PlayerId, kit: &str, ctx: &mut EventContext<'_>) -> Result<(), RespawnError> {
        let p = self.roster.get_mut(player).ok_or(RespawnError::NotParticipant)?;
        if !self.config.team(p.team).kits.iter().any(|k| k == kit) {
            return Err(RespawnError::KitUnavailable(kit.to_string()));
        }

        p.kit = Some(kit.to_string());
        if p.selecting_class {
            p.selecting_class = false;
            let message = EventNotice::YouAreDead.to_string();
            ctx.world.show_death_screen(player, &message, p.respawn_remaining());
            self.death_screens.insert(player, message);
        }
        Ok(())
    }

    fn respawn_tick(&mut self, player: PlayerId, ctx: &mut EventContext<'_>) {
        let owner = JobOwner::Participant(self.id, player);
        let Some(p) = self.roster.get_mut(player) else {
            ctx.scheduler.cancel_owner(&owner);
            return;
        };

        let message = self.death_screens.get(&player).cloned().unwrap_or_default();
        match p.tick_respawn() {
            RespawnTick::Waiting(remaining) => {
                ctx.world.show_death_screen(player, &message, remaining);
            }
            RespawnTick::Ready { auto } => {
                ctx.scheduler.cancel_where(|o, job| *o == owner && *job == Job::Game(GameJob::RespawnTick(player)));
                if auto && p.kit.is_some() {
                    self.respawn(player, ctx);
                } else {
                    ctx.world.show_death_screen(player, &message, 0);
                }
            }
        }
    }

    // =========================================================================
    // Damage and death
    // =========================================================================

    /// Filter and scale damage to a participant.
    pub fn on_player_damaged(&mut self, victim: PlayerId, damage: DamageEvent, ctx: &mut EventContext<'_>) -> DamageOutcome {
        let now = ctx.scheduler.now();
        let Some(target) = self.roster.get(victim) else {
            return DamageOutcome::NotTracked;
        };

        if self.godmode || target.dead || target.is_invincible(now) {
            return DamageOutcome::Suppressed;
        }

        // Damage from outside the event counts as environmental
        let attacker = damage
            .attacker
            .filter(|a| *a != victim)
            .and_then(|a| self.roster.get(a));
        let attacker_id = attacker.map(|a| a.id);

        let multiplier = self.policy.damage_multiplier(target, attacker);
        if let Some(target) = self.roster.get_mut(victim) {
            target.record_damage(attacker_id, now);
        }
        DamageOutcome::Applied(damage.amount * multiplier)
    }

    /// May a participant damage a non-player entity?
    pub fn on_entity_damaged(&self, attacker: PlayerId, entity: &EntityRef) -> bool {
        if self.godmode {
            return false;
        }
        self.roster
            .get(attacker)
            .map_or(false, |p| self.policy.can_deal_entity_damage(p, entity))
    }

    /// Track an entity placed by a participant for teardown.
    pub fn on_entity_deployed(&mut self, player: PlayerId, entity: EntityId) {
        if self.roster.contains(player) {
            self.deployed.push(entity);
        }
    }

    /// Lethal damage. Returns true when the event intercepted the death.
    pub fn on_player_death(&mut self, victim: PlayerId, info: DeathInfo, ctx: &mut EventContext<'_>) -> bool {
        match self.roster.get(victim) {
            Some(p) if !p.dead => {
                self.pre_player_death(victim, info, ctx);
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    fn pre_player_death(&mut self, victim: PlayerId, info: DeathInfo, ctx: &mut EventContext<'_>) {
        if self.policy.can_drop_backpack() {
            ctx.world.drop_backpack(victim, ctx.settings.timers.backpack_despawn);
        }
        ctx.world.dismount(victim);

        if let Some(p) = self.roster.get_mut(victim) {
            p.dead = true;
        }
        let owner = JobOwner::Participant(self.id, victim);
        ctx.scheduler.cancel_where(|o, job| *o == owner && *job == Job::Game(GameJob::OutOfBoundsTick(victim)));

        self.redirect_spectators(victim, ctx);
        ctx.world.set_network_visible(victim, false);

        self.on_participant_death(victim, info, ctx);
    }

    fn on_participant_death(&mut self, victim: PlayerId, info: DeathInfo, ctx: &mut EventContext<'_>) {
        let now = ctx.scheduler.now();
        let attacker_id = info
            .attacker
            .filter(|a| *a != victim && self.roster.contains(*a));

        let Some(victim_p) = self.roster.get(victim) else {
            return;
        };
        let attacker_p = attacker_id.and_then(|a| self.roster.get(a));
        let resolution = self.policy.on_player_death(victim_p, attacker_p, &self.config);

        let victim_name = victim_p.display_name.clone();
        let attacker_name = attacker_p.map(|a| a.display_name.clone());
        let ran_away = victim_p.is_out_of_bounds();

        // Victim
        let (assists, remaining) = match self.roster.get_mut(victim) {
            Some(p) => {
                let assists = p.take_assists(attacker_id, now);
                p.record_death(resolution.respawn_secs);
                (assists, p.respawn_remaining())
            }
            None => return,
        };
        ctx.stats.add(victim, &victim_name, Statistic::Deaths, 1);
        for assist in assists {
            let name = self
                .roster
                .get(assist)
                .map_or_else(|| ctx.world.display_name(assist), |p| p.display_name.clone());
            ctx.stats.add(assist, &name, Statistic::Assists, 1);
        }

        // Killer
        if let (true, Some(killer), Some(killer_name)) = (resolution.credit_kill, attacker_id, attacker_name.as_ref()) {
            if let Some(k) = self.roster.get_mut(killer) {
                k.kills += 1;
            }
            ctx.stats.add(killer, killer_name, Statistic::Kills, 1);
            if info.headshot {
                ctx.stats.add(killer, killer_name, Statistic::Headshots, 1);
            }
            if info.melee {
                ctx.stats.add(killer, killer_name, Statistic::Melee, 1);
            }
            let amount = if info.headshot {
                ctx.settings.rewards.headshot_amount
            } else {
                ctx.settings.rewards.kill_amount
            };
            self.give_reward(killer, amount, ctx);
        }

        ctx.scheduler.schedule_repeating(
            JobOwner::Participant(self.id, victim),
            SECOND,
            SECOND,
            Job::Game(GameJob::RespawnTick(victim)),
        );

        let screen = match (&attacker_name, ran_away) {
            (_, true) => EventNotice::DontWanderOff,
            (Some(killer), false) => EventNotice::YouWereKilledBy { killer: killer.clone() },
            (None, false) => EventNotice::YouAreDead,
        };
        let screen = screen.to_string();
        ctx.world.show_death_screen(victim, &screen, remaining);
        self.death_screens.insert(victim, screen);

        ctx.world.strip_inventory(victim);

        if ctx.settings.messages.broadcast_kills {
            let notice = if ran_away {
                EventNotice::RanAway { victim: victim_name }
            } else {
                match attacker_name {
                    Some(killer) => EventNotice::Killed { victim: victim_name, killer },
                    None => EventNotice::Suicide { victim: victim_name },
                }
            };
            self.notify(ctx, Audience::Participants, notice);
        }

        if self.status == EventStatus::Started && self.policy.should_end(&self.roster, &self.config) {
            self.end_event(ctx);
        } else {
            self.update_scoreboard(ctx);
        }
    }

    fn give_reward(&self, player: PlayerId, amount: i32, ctx: &mut EventContext<'_>) {
        if amount <= 0 {
            return;
        }
        let rewards = &ctx.settings.rewards;
        let added = rewards.kind == RewardKind::Scrap
            && ctx.restore.add_prize(player, ctx.settings.scrap_item_id, amount);
        if !added {
            ctx.world.give_reward(player, rewards.kind, amount);
        }
    }

    // =========================================================================
    // Out of bounds
    // =========================================================================

    /// A participant left a zone.
    pub fn on_zone_exit(&mut self, player: PlayerId, zone_id: &str, ctx: &mut EventContext<'_>) {
        if zone_id != self.config.zone_id {
            return;
        }
        let Some(p) = self.roster.get_mut(player) else {
            return;
        };
        if p.dead {
            return;
        }

        p.set_out_of_bounds(true);
        let owner = JobOwner::Participant(self.id, player);
        ctx.scheduler.cancel_where(|o, job| *o == owner && *job == Job::Game(GameJob::OutOfBoundsTick(player)));
        ctx.scheduler.schedule_repeating(owner, 0, SECOND, Job::Game(GameJob::OutOfBoundsTick(player)));
    }

    /// A participant entered a zone.
    pub fn on_zone_enter(&mut self, player: PlayerId, zone_id: &str, ctx: &mut EventContext<'_>) {
        if zone_id != self.config.zone_id {
            return;
        }
        if let Some(p) = self.roster.get_mut(player) {
            p.set_out_of_bounds(false);
            let owner = JobOwner::Participant(self.id, player);
            ctx.scheduler.cancel_where(|o, job| *o == owner && *job == Job::Game(GameJob::OutOfBoundsTick(player)));
        }
    }

    fn out_of_bounds_tick(&mut self, player: PlayerId, ctx: &mut EventContext<'_>) {
        let owner = JobOwner::Participant(self.id, player);
        let stop = |scheduler: &mut EventScheduler| {
            scheduler.cancel_where(|o, job| *o == owner && *job == Job::Game(GameJob::OutOfBoundsTick(player)));
        };

        let Some(p) = self.roster.get_mut(player) else {
            stop(ctx.scheduler);
            return;
        };

        match p.tick_out_of_bounds() {
            OutOfBoundsTick::Idle => stop(ctx.scheduler),
            OutOfBoundsTick::Warning => {
                self.notify(ctx, Audience::Player(player), EventNotice::OutOfBounds);
            }
            OutOfBoundsTick::Countdown(seconds) => {
                self.notify(ctx, Audience::Player(player), EventNotice::OutOfBoundsTime { seconds });
            }
            OutOfBoundsTick::Expired => {
                stop(ctx.scheduler);
                if self.status == EventStatus::Started {
                    self.pre_player_death(player, DeathInfo::default(), ctx);
                } else {
                    p.set_out_of_bounds(false);
                    self.spawn_player(player, false, false, ctx);
                }
            }
        }
    }

    // =========================================================================
    // Spectating
    // =========================================================================

    /// Start watching another participant while dead.
    pub fn begin_spectating(&mut self, player: PlayerId, ctx: &mut EventContext<'_>) -> Result<PlayerId, RespawnError> {
        let p = self.roster.get(player).ok_or(RespawnError::NotParticipant)?;
        if !p.dead {
            return Err(RespawnError::NotDead);
        }

        let first_time = !p.is_spectating();
        let target = self.cycle_spectate(player, ctx)?;
        if first_time {
            self.notify(ctx, Audience::Player(player), EventNotice::SpectateCycle);
        }
        Ok(target)
    }

    /// Move to the next spectate target.
    pub fn cycle_spectate(&mut self, player: PlayerId, ctx: &mut EventContext<'_>) -> Result<PlayerId, RespawnError> {
        let targets = self.policy.spectate_targets(&self.roster, player);
        let p = self.roster.get_mut(player).ok_or(RespawnError::NotParticipant)?;
        if !p.dead {
            return Err(RespawnError::NotDead);
        }

        let target = p.cycle_spectate_target(&targets);
        ctx.world.spectate(player, target);
        target.ok_or(RespawnError::NoSpectateTarget)
    }

    /// Participants watching `subject` move to the next eligible target.
    fn redirect_spectators(&mut self, subject: PlayerId, ctx: &mut EventContext<'_>) {
        let watchers: Vec<PlayerId> = self
            .roster
            .participants()
            .filter(|p| p.spectate_target() == Some(subject))
            .map(|p| p.id)
            .collect();

        for watcher in watchers {
            let targets: Vec<PlayerId> = self
                .policy
                .spectate_targets(&self.roster, watcher)
                .into_iter()
                .filter(|t| *t != subject)
                .collect();
            if let Some(p) = self.roster.get_mut(watcher) {
                let target = p.cycle_spectate_target(&targets);
                ctx.world.spectate(watcher, target);
            }
        }
    }

    // =========================================================================
    // Scoreboard and notices
    // =========================================================================

    /// Rebuild the scoreboard and push it to every participant.
    pub fn update_scoreboard(&mut self, ctx: &mut EventContext<'_>) {
        self.scoreboard.rebuild(&self.roster, self.policy.as_ref());
        for p in self.roster.participants() {
            ctx.world.show_scoreboard(p.id, self.scoreboard.entries());
        }
    }

    fn notify(&self, ctx: &mut EventContext<'_>, audience: Audience, notice: EventNotice) {
        let text = notice.to_string();
        debug!(?audience, "{}", text);

        match audience {
            Audience::Everyone => ctx.world.broadcast(&text),
            Audience::Participants => {
                for p in self.roster.participants() {
                    ctx.world.send_message(p.id, &text);
                }
            }
            Audience::Player(player) => ctx.world.send_message(player, &text),
        }
        ctx.notices.push(Notice::new(audience, notice));
    }
}

impl fmt::Debug for EventGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventGame")
            .field("id", &self.id)
            .field("event", &self.config.event_name)
            .field("mode", &self.config.mode_type)
            .field("status", &self.status)
            .field("players", &self.roster.len())
            .field("joining", &self.roster.joining_len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
