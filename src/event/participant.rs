//! Participant State
//!
//! Per-player session state for one event run: team, kill/death counters,
//! the alive/dead/respawn cycle, the post-spawn invincibility window, damage
//! contributors for assist credit, out-of-bounds countdown and spectating.
//! Mode-specific extras live in the mode policy, keyed by [`PlayerId`].

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::scheduler::{Millis, secs};
use crate::{ASSIST_WINDOW_SECS, INVINCIBILITY_SECS, OUT_OF_BOUNDS_SECS};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Host player identifier.
///
/// Implements Ord so rosters and statistics iterate deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Create from the host's numeric id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw host id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parse from the host's decimal string form.
    pub fn parse(s: &str) -> Option<Self> {
        s.trim().parse::<u64>().ok().map(Self)
    }

    /// Short hex form for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0.to_be_bytes()[4..])
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// TEAM
// =============================================================================

/// Team assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Team {
    /// First team (also used by non-team modes for spawning)
    A,
    /// Second team
    B,
    /// No team
    #[default]
    None,
}

impl Team {
    /// The other team. `None` stays `None`.
    pub fn opposite(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
            Team::None => Team::None,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::A => f.write_str("A"),
            Team::B => f.write_str("B"),
            Team::None => f.write_str("None"),
        }
    }
}

// =============================================================================
// TICK RESULTS
// =============================================================================

/// Outcome of one respawn countdown tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RespawnTick {
    /// Still counting; whole seconds remaining.
    Waiting(u32),
    /// Countdown finished.
    Ready {
        /// Participant opted in to automatic respawn
        auto: bool,
    },
}

/// Outcome of one out-of-bounds countdown tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutOfBoundsTick {
    /// Not out of bounds (or dead); countdown should stop.
    Idle,
    /// First tick after leaving the zone.
    Warning,
    /// Seconds left to return.
    Countdown(u32),
    /// Time is up.
    Expired,
}

// =============================================================================
// PARTICIPANT
// =============================================================================

/// State of a single player inside a running event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Participant {
    /// Player identity
    pub id: PlayerId,

    /// Name shown on scoreboards (clan tags stripped)
    pub display_name: String,

    /// Team for this run
    pub team: Team,

    /// Kills credited this run
    pub kills: u32,

    /// Deaths this run
    pub deaths: u32,

    /// Dead (respawn pending or selecting a class)
    pub dead: bool,

    /// Respawn automatically when the countdown finishes
    pub auto_respawn: bool,

    /// Selected loadout
    pub kit: Option<String>,

    /// Dead because no loadout is selected yet
    pub selecting_class: bool,

    respawn_remaining: f32,
    invincible_until: Millis,
    /// (attacker, last hit), most recent last
    contributors: Vec<(PlayerId, Millis)>,
    out_of_bounds: bool,
    out_of_bounds_remaining: u32,
    spectating: bool,
    spectate_target: Option<PlayerId>,
    spectate_index: usize,
}

impl Participant {
    /// Fresh participant on no team.
    pub fn new(id: PlayerId, display_name: &str) -> Self {
        Self {
            id,
            display_name: strip_tags(display_name),
            team: Team::None,
            kills: 0,
            deaths: 0,
            dead: false,
            auto_respawn: false,
            kit: None,
            selecting_class: false,
            respawn_remaining: 0.0,
            invincible_until: 0,
            contributors: Vec::new(),
            out_of_bounds: false,
            out_of_bounds_remaining: 0,
            spectating: false,
            spectate_target: None,
            spectate_index: 0,
        }
    }

    /// Is the player alive?
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    // =========================================================================
    // Respawn
    // =========================================================================

    /// Enter the selecting-class sub-state of dead.
    pub fn force_select_class(&mut self) {
        self.dead = true;
        self.selecting_class = true;
    }

    /// Mark the player dead and start the respawn countdown.
    pub fn record_death(&mut self, respawn_secs: f32) {
        self.deaths += 1;
        self.dead = true;
        self.respawn_remaining = respawn_secs.max(0.0);
    }

    /// Whole seconds until respawn is allowed.
    pub fn respawn_remaining(&self) -> u32 {
        self.respawn_remaining.ceil() as u32
    }

    /// Countdown finished and a loadout is selected.
    pub fn can_respawn(&self) -> bool {
        self.respawn_remaining <= 0.0 && self.kit.is_some()
    }

    /// Advance the respawn countdown by one second.
    pub fn tick_respawn(&mut self) -> RespawnTick {
        self.respawn_remaining = (self.respawn_remaining - 1.0).max(0.0);

        if self.respawn_remaining <= 0.0 {
            RespawnTick::Ready { auto: self.auto_respawn }
        } else {
            RespawnTick::Waiting(self.respawn_remaining())
        }
    }

    /// Bring the player back to life (position and kit are the caller's job).
    pub fn revive(&mut self) {
        self.dead = false;
        self.selecting_class = false;
        self.respawn_remaining = 0.0;
        self.out_of_bounds = false;
        self.out_of_bounds_remaining = 0;
        self.spectating = false;
        self.spectate_target = None;
    }

    // =========================================================================
    // Invincibility
    // =========================================================================

    /// Start the post-spawn grace period.
    pub fn apply_invincibility(&mut self, now: Millis) {
        self.invincible_until = now + secs(INVINCIBILITY_SECS);
    }

    /// Inside the post-spawn grace period?
    pub fn is_invincible(&self, now: Millis) -> bool {
        now < self.invincible_until
    }

    // =========================================================================
    // Damage contributors
    // =========================================================================

    /// Record a hit for assist credit.
    ///
    /// Each attacker keeps the time of their latest hit. A repeat hit moves
    /// the attacker to the end instead of adding a second entry.
    pub fn record_damage(&mut self, attacker: Option<PlayerId>, now: Millis) {
        let Some(attacker) = attacker else {
            return;
        };
        if attacker == self.id {
            return;
        }
        self.contributors.retain(|(c, _)| *c != attacker);
        self.contributors.push((attacker, now));
    }

    /// Contributors in hit order, most recent last.
    pub fn damage_contributors(&self) -> Vec<PlayerId> {
        self.contributors.iter().map(|(c, _)| *c).collect()
    }

    /// Contributors whose last hit is still inside the assist window at `now`.
    pub fn active_contributors(&self, now: Millis) -> Vec<PlayerId> {
        let window = secs(ASSIST_WINDOW_SECS);
        self.contributors
            .iter()
            .filter(|(_, hit_at)| now < hit_at + window)
            .map(|(c, _)| *c)
            .collect()
    }

    /// Take assist credit on death and clear the list.
    ///
    /// Every eligible contributor except the most recent one gets an assist;
    /// the killer never gets an assist for their own kill.
    pub fn take_assists(&mut self, killer: Option<PlayerId>, now: Millis) -> Vec<PlayerId> {
        let mut eligible = self.active_contributors(now);
        eligible.pop();
        eligible.retain(|c| Some(*c) != killer);

        self.contributors.clear();
        eligible
    }

    // =========================================================================
    // Out of bounds
    // =========================================================================

    /// Is the player outside the event zone?
    pub fn is_out_of_bounds(&self) -> bool {
        self.out_of_bounds
    }

    /// Enter or leave the out-of-bounds state. Entering restarts the countdown.
    pub fn set_out_of_bounds(&mut self, value: bool) {
        self.out_of_bounds = value;
        self.out_of_bounds_remaining = if value { OUT_OF_BOUNDS_SECS } else { 0 };
    }

    /// Advance the out-of-bounds countdown by one second.
    pub fn tick_out_of_bounds(&mut self) -> OutOfBoundsTick {
        if !self.out_of_bounds || self.dead {
            return OutOfBoundsTick::Idle;
        }

        let remaining = self.out_of_bounds_remaining;
        let result = if remaining == OUT_OF_BOUNDS_SECS {
            OutOfBoundsTick::Warning
        } else if remaining == 0 {
            OutOfBoundsTick::Expired
        } else {
            OutOfBoundsTick::Countdown(remaining)
        };

        self.out_of_bounds_remaining = remaining.saturating_sub(1);
        result
    }

    // =========================================================================
    // Spectating
    // =========================================================================

    /// Currently spectating?
    pub fn is_spectating(&self) -> bool {
        self.spectating
    }

    /// Who is being watched (lookup only).
    pub fn spectate_target(&self) -> Option<PlayerId> {
        self.spectate_target
    }

    /// Move to the next eligible target. Ends spectating when none remain.
    pub fn cycle_spectate_target(&mut self, targets: &[PlayerId]) -> Option<PlayerId> {
        if targets.is_empty() {
            self.finish_spectating();
            return None;
        }

        self.spectating = true;
        let mut index = (self.spectate_index + 1) % targets.len();
        if Some(targets[index]) == self.spectate_target && targets.len() > 1 {
            index = (index + 1) % targets.len();
        }

        self.spectate_index = index;
        self.spectate_target = Some(targets[index]);
        self.spectate_target
    }

    /// Stop spectating.
    pub fn finish_spectating(&mut self) {
        self.spectating = false;
        self.spectate_target = None;
    }
}

/// Strip leading `[clan]` tags from a display name.
pub fn strip_tags(name: &str) -> String {
    let mut s = name.trim();
    while s.starts_with('[') {
        match s.find(']') {
            Some(end) => s = s[end + 1..].trim_start(),
            None => break,
        }
    }
    s.to_string()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduler::SECOND;

    fn player(id: u64) -> Participant {
        Participant::new(PlayerId::new(id), &format!("player{}", id))
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("[ABC] Bob"), "Bob");
        assert_eq!(strip_tags("[A][B] Alice"), "Alice");
        assert_eq!(strip_tags("Plain"), "Plain");
        assert_eq!(strip_tags("[broken"), "[broken");
    }

    #[test]
    fn test_respawn_countdown_reaches_zero() {
        let mut p = player(1);
        p.kit = Some("rifle".into());
        p.record_death(4.5);

        assert_eq!(p.respawn_remaining(), 5);
        let mut ticks = 0;
        loop {
            ticks += 1;
            if let RespawnTick::Ready { .. } = p.tick_respawn() {
                break;
            }
        }

        assert_eq!(ticks, 5);
        assert_eq!(p.respawn_remaining(), 0);
        assert!(p.can_respawn());

        // Never goes negative
        p.tick_respawn();
        assert_eq!(p.respawn_remaining(), 0);
    }

    #[test]
    fn test_cannot_respawn_without_kit() {
        let mut p = player(1);
        p.record_death(0.0);
        assert!(!p.can_respawn());
        p.kit = Some("smg".into());
        assert!(p.can_respawn());
    }

    #[test]
    fn test_auto_respawn_flag_reported() {
        let mut p = player(1);
        p.auto_respawn = true;
        p.record_death(1.0);
        assert_eq!(p.tick_respawn(), RespawnTick::Ready { auto: true });
    }

    #[test]
    fn test_invincibility_window() {
        let mut p = player(1);
        p.apply_invincibility(10 * SECOND);
        assert!(p.is_invincible(10 * SECOND));
        assert!(p.is_invincible(12 * SECOND + 999));
        assert!(!p.is_invincible(13 * SECOND));
    }

    #[test]
    fn test_contributor_dedup_moves_to_end() {
        let mut victim = player(1);
        let a = PlayerId::new(2);
        let b = PlayerId::new(3);

        victim.record_damage(Some(a), 0);
        victim.record_damage(Some(b), 100);
        victim.record_damage(Some(a), 200);

        assert_eq!(victim.damage_contributors(), vec![b, a]);
    }

    #[test]
    fn test_self_damage_not_recorded() {
        let mut victim = player(1);
        victim.record_damage(Some(PlayerId::new(1)), 0);
        assert!(victim.damage_contributors().is_empty());
    }

    #[test]
    fn test_assist_window_expires() {
        let mut victim = player(1);
        let a = PlayerId::new(2);
        let b = PlayerId::new(3);

        victim.record_damage(Some(a), 1);
        victim.record_damage(Some(b), 2);

        // Dies after the 3 second window: nobody gets an assist
        let assists = victim.take_assists(Some(b), 1 + 3 * SECOND + 1);
        assert!(assists.is_empty());
    }

    #[test]
    fn test_assists_exclude_last_and_killer() {
        let mut victim = player(1);
        let a = PlayerId::new(2);
        let b = PlayerId::new(3);
        let c = PlayerId::new(4);

        victim.record_damage(Some(a), 1);
        victim.record_damage(Some(b), 2);
        victim.record_damage(Some(c), 3);

        let assists = victim.take_assists(Some(b), 1000);
        assert_eq!(assists, vec![a]);
        assert!(victim.damage_contributors().is_empty());
    }

    #[test]
    fn test_assist_window_per_attacker() {
        let mut victim = player(1);
        let a = PlayerId::new(2);
        let b = PlayerId::new(3);
        let c = PlayerId::new(4);

        victim.record_damage(Some(a), 100);
        victim.record_damage(Some(b), 2000);
        victim.record_damage(Some(c), 2500);

        // a lapsed at 3100, b is covered until 5000
        assert_eq!(victim.active_contributors(3300), vec![b, c]);
        assert_eq!(victim.take_assists(Some(c), 3300), vec![b]);
    }

    #[test]
    fn test_assist_hit_at_time_zero() {
        let mut victim = player(1);
        let a = PlayerId::new(2);
        let b = PlayerId::new(3);

        victim.record_damage(Some(a), 0);
        victim.record_damage(Some(b), 500);

        assert_eq!(victim.take_assists(Some(b), 2 * SECOND), vec![a]);
    }

    #[test]
    fn test_repeat_hit_refreshes_window() {
        let mut victim = player(1);
        let a = PlayerId::new(2);
        let b = PlayerId::new(3);

        victim.record_damage(Some(a), 0);
        victim.record_damage(Some(b), 100);
        victim.record_damage(Some(a), 2 * SECOND);
        victim.record_damage(Some(b), 4 * SECOND);

        // a's first hit alone would have lapsed at 3000
        assert_eq!(victim.take_assists(Some(b), 4 * SECOND + 500), vec![a]);
    }

    #[test]
    fn test_out_of_bounds_countdown() {
        let mut p = player(1);
        p.set_out_of_bounds(true);

        assert_eq!(p.tick_out_of_bounds(), OutOfBoundsTick::Warning);
        for expected in (1..OUT_OF_BOUNDS_SECS).rev() {
            assert_eq!(p.tick_out_of_bounds(), OutOfBoundsTick::Countdown(expected));
        }
        assert_eq!(p.tick_out_of_bounds(), OutOfBoundsTick::Expired);
    }

    #[test]
    fn test_return_to_bounds_cancels() {
        let mut p = player(1);
        p.set_out_of_bounds(true);
        p.tick_out_of_bounds();
        p.set_out_of_bounds(false);
        assert_eq!(p.tick_out_of_bounds(), OutOfBoundsTick::Idle);
    }

    #[test]
    fn test_spectate_cycles_forward() {
        let mut p = player(1);
        let targets = [PlayerId::new(2), PlayerId::new(3), PlayerId::new(4)];

        let first = p.cycle_spectate_target(&targets).unwrap();
        let second = p.cycle_spectate_target(&targets).unwrap();
        assert_ne!(first, second);
        assert!(p.is_spectating());

        assert_eq!(p.cycle_spectate_target(&[]), None);
        assert!(!p.is_spectating());
    }
}
