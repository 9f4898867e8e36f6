//! Event notices: every outcome the engine announces, with its English text.

use std::fmt;

use super::participant::{PlayerId, Team};

/// Who receives a notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    /// Whole server
    Everyone,
    /// Every participant of the running event
    Participants,
    /// One player
    Player(PlayerId),
}

/// A broadcastable outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventNotice {
    EventOpen { event_name: String, mode_type: String, starts_in: u64 },
    EventClosed { event_name: String },
    NotEnoughToStart,
    NotEnoughToContinue,
    PlayerJoined { player: String, event_name: String },
    PlayerLeft { player: String, event_name: String },
    SingleWinner { player: String },
    MultipleWinners { players: Vec<String> },
    TeamWinner { team: Team, color: String, players: Vec<String> },
    TeamsUnbalanced,
    TeamChanged { team: Team },
    OutOfBounds,
    OutOfBoundsTime { seconds: u32 },
    Killed { victim: String, killer: String },
    Suicide { victim: String },
    RanAway { victim: String },
    SpectateCycle,

    // ===== Death screen =====
    SelectClass,
    YouWereKilledBy { killer: String },
    YouAreDead,
    DontWanderOff,
}

impl fmt::Display for EventNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use EventNotice::*;
        match self {
            EventOpen { event_name, mode_type, starts_in } => write!(
                f,
                "The event {} ({}) is open for players\nIt will start in {} seconds\nType /event to join",
                event_name, mode_type, starts_in
            ),
            EventClosed { event_name } => write!(f, "The event {} is now closed to new players", event_name),
            NotEnoughToStart => f.write_str("There is not enough players to start the event..."),
            NotEnoughToContinue => f.write_str("There are not enough players to continue the event..."),
            PlayerJoined { player, event_name } => write!(f, "{} has joined the {} event!", player, event_name),
            PlayerLeft { player, event_name } => write!(f, "{} has left the {} event!", player, event_name),
            SingleWinner { player } => write!(f, "{} won the event!", player),
            MultipleWinners { players } => {
                write!(f, "The following players won the event; {}", players.join(", "))
            }
            TeamWinner { team, players, .. } => {
                write!(f, "Team {} won the event ({})", team, players.join(", "))
            }
            TeamsUnbalanced => f.write_str("The teams are unbalanced. Shuffling players..."),
            TeamChanged { team } => write!(f, "You were moved to team {}", team),
            OutOfBounds => f.write_str("You are out of the playable area. Return immediately or you will be killed!"),
            OutOfBoundsTime { seconds } => write!(f, "You have {} seconds to return...", seconds),
            Killed { victim, killer } => write!(f, "{} was killed by {}", victim, killer),
            Suicide { victim } => write!(f, "{} killed themselves...", victim),
            RanAway { victim } => write!(f, "{} tried to run away...", victim),
            SpectateCycle => f.write_str("Press JUMP to cycle spectate targets"),
            SelectClass => f.write_str("Select a class to continue..."),
            YouWereKilledBy { killer } => write!(f, "You were killed by {}", killer),
            YouAreDead => f.write_str("You are dead..."),
            DontWanderOff => f.write_str("Don't wander off..."),
        }
    }
}

/// A notice addressed to an audience.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub audience: Audience,
    pub notice: EventNotice,
}

impl Notice {
    pub fn new(audience: Audience, notice: EventNotice) -> Self {
        Self { audience, notice }
    }
}
