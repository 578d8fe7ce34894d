//! Wire and domain types shared between the referee and replacer engines.
//!
//! Message schemas are an external concern (spec §1); these are plain
//! serde-derived structs carrying the semantic fields spec.md §6
//! describes, serialized over the wire with `bincode`.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub use vss_geometry::Quadrant;

/// A team, or the absence of one (used for neutral fouls like `FREE_BALL`).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Color {
    Blue,
    Yellow,
    None,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::Blue => Color::Yellow,
            Color::Yellow => Color::Blue,
            Color::None => Color::None,
        }
    }
}

/// A referee command. Anything other than `GameOn`/`Stop` is a foul and
/// drives a placement cycle (glossary: Foul).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Foul {
    GameOn,
    Stop,
    Kickoff,
    FreeBall,
    GoalKick,
    PenaltyKick,
    FreeKick,
    Halt,
}

impl Foul {
    /// Whether the Replacer should stage default placements for this foul
    /// (§4.6: "A non-GAME_ON, non-STOP foul is additionally routed to the
    /// Replacer").
    pub fn drives_placement(self) -> bool {
        !matches!(self, Foul::GameOn | Foul::Stop)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Half {
    NoHalf,
    First,
    Second,
}

impl Half {
    /// Advances `NoHalf -> First -> Second -> Second`, matching the
    /// original's `(gameHalf % 2) + 1` which only ever fires twice per
    /// match (the invariant in spec.md §3: the half counter advances
    /// strictly and never regresses).
    pub fn advance(self) -> Half {
        match self {
            Half::NoHalf => Half::First,
            Half::First => Half::Second,
            Half::Second => Half::Second,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    pub id: u8,
    pub x: f32,
    pub y: f32,
    pub orientation_deg: f32,
}

/// A full-team placement proposal, as exchanged between teams and the
/// Replacer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub team_color: Color,
    pub robots: Vec<Robot>,
}

impl Frame {
    pub fn empty(team_color: Color) -> Self {
        Self {
            team_color,
            robots: Vec::new(),
        }
    }
}

/// The single most-recently-emitted game command (spec.md §3).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PenaltyInfo {
    pub foul: Foul,
    pub team: Color,
    pub quadrant: Quadrant,
    pub timestamp_s: f32,
    pub half: Half,
}

impl Default for PenaltyInfo {
    fn default() -> Self {
        Self {
            foul: Foul::GameOn,
            team: Color::None,
            quadrant: Quadrant::NoQuadrant,
            timestamp_s: 0.0,
            half: Half::NoHalf,
        }
    }
}

/// Outbound command to the referee port.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VssRefCommand {
    pub foul: Foul,
    pub foul_quadrant: Quadrant,
    pub team_color: Color,
    pub timestamp: f32,
    pub game_half: Half,
}

impl From<PenaltyInfo> for VssRefCommand {
    fn from(penalty: PenaltyInfo) -> Self {
        Self {
            foul: penalty.foul,
            foul_quadrant: penalty.quadrant,
            team_color: penalty.team,
            timestamp: penalty.timestamp_s,
            game_half: penalty.half,
        }
    }
}

/// Inbound placement proposal from a team, received on the replacer
/// multicast endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VssRefPlacement {
    pub world: Frame,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotReplacement {
    pub id: u8,
    pub yellow: bool,
    pub x: f32,
    pub y: f32,
    pub orientation_deg: f32,
    pub vx: f32,
    pub vy: f32,
    pub turn_on: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BallReplacement {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    pub robots: Vec<RobotReplacement>,
    pub ball: Option<BallReplacement>,
}

/// Outbound teleport command to the simulator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub replace: Replacement,
}

/// The Referee Engine's current `PenaltyInfo`, shared with the
/// Display sink and exposed via a public getter (spec.md §5: "guarded
/// by a mutex (`_foulMutex`)"; SPEC_FULL.md §6 item 1's
/// `getLastPenaltyInfo`). Single writer, many readers, copy-out only.
#[derive(Clone, Default)]
pub struct PenaltyInfoHandle(Arc<Mutex<PenaltyInfo>>);

impl PenaltyInfoHandle {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(PenaltyInfo::default())))
    }

    pub fn set(&self, info: PenaltyInfo) {
        *self.0.lock() = info;
    }

    pub fn get(&self) -> PenaltyInfo {
        *self.0.lock()
    }
}

/// Set by the Replacer once both colors have proposed a placement in
/// the current foul cycle; peeked by the Referee Engine's transition
/// FSM during the FoulEmitted wait and cleared once the FSM has acted
/// on it (spec.md §5: "guarded by `_transitionMutex`").
#[derive(Clone, Default)]
pub struct TeamsPlacedSignal(Arc<Mutex<bool>>);

impl TeamsPlacedSignal {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(false)))
    }

    pub fn set(&self) {
        *self.0.lock() = true;
    }

    pub fn get(&self) -> bool {
        *self.0.lock()
    }

    pub fn clear(&self) {
        *self.0.lock() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_frame_round_trips_through_bincode() {
        let frame = Frame {
            team_color: Color::Yellow,
            robots: vec![
                Robot {
                    id: 3,
                    x: 0.42,
                    y: -0.17,
                    orientation_deg: 180.0,
                },
                Robot {
                    id: 5,
                    x: -0.1,
                    y: 0.0,
                    orientation_deg: -45.0,
                },
            ],
        };

        let placement = VssRefPlacement {
            world: frame.clone(),
        };

        let encoded = bincode::serialize(&placement).expect("serialize placement");
        let decoded: VssRefPlacement =
            bincode::deserialize(&encoded).expect("deserialize placement");

        assert_eq!(decoded.world, frame);
    }

    #[test]
    fn command_carries_penalty_info_unchanged() {
        let penalty = PenaltyInfo {
            foul: Foul::FreeBall,
            team: Color::None,
            quadrant: Quadrant::Q3,
            timestamp_s: 12.5,
            half: Half::Second,
        };

        let command: VssRefCommand = penalty.into();
        assert_eq!(command.foul, Foul::FreeBall);
        assert_eq!(command.foul_quadrant, Quadrant::Q3);
    }

    #[test]
    fn half_advances_strictly_and_never_regresses() {
        let mut half = Half::NoHalf;
        half = half.advance();
        assert_eq!(half, Half::First);
        half = half.advance();
        assert_eq!(half, Half::Second);
        half = half.advance();
        assert_eq!(half, Half::Second);
    }

    #[test]
    fn penalty_info_handle_copies_out_under_lock() {
        let handle = PenaltyInfoHandle::new();
        assert_eq!(handle.get().foul, Foul::GameOn);

        handle.set(PenaltyInfo {
            foul: Foul::Halt,
            team: Color::Blue,
            quadrant: Quadrant::NoQuadrant,
            timestamp_s: 1.0,
            half: Half::First,
        });
        assert_eq!(handle.get().foul, Foul::Halt);
    }

    #[test]
    fn teams_placed_signal_round_trips_through_set_and_clear() {
        let signal = TeamsPlacedSignal::new();
        assert!(!signal.get());
        signal.set();
        assert!(signal.get());
        signal.clear();
        assert!(!signal.get());
    }
}
