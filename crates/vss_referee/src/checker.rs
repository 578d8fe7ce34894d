//! The checker abstraction (spec.md §4.2) and the fan-in channel that
//! replaces the source's signal-mapper wiring (§9 Design Note:
//! "model this as a single-consumer channel of (checker_id, triple)
//! events drained by the engine each tick").

use std::sync::mpsc::{channel, Receiver, Sender};

use vss_config::Config;
use vss_messages::{Color, Foul, Quadrant};
use vss_vision::VisionClient;

/// A checker's bare "I fired this tick" notification. The engine reads
/// the actual triple back off the checker itself via `penalty()` /
/// `team_color()` / `quadrant()`, so this event carries no payload,
/// matching spec.md §4.2's "emits a single channel: `foul_occurred`
/// (no payload)".
pub struct FiredEvent {
    pub checker_name: &'static str,
    pub priority: i32,
}

pub fn fired_channel() -> (Sender<FiredEvent>, Receiver<FiredEvent>) {
    channel()
}

/// Every checker: constructed once at engine init, `configure()`d
/// whenever the engine restarts a play, `run()` each tick while the
/// engine is in GAME_ON, and never throws (spec.md §4.2's failure
/// model — invalid vision data degrades to a no-op, not a panic).
pub trait Checker: Send {
    fn name(&self) -> &'static str;
    fn priority(&self) -> i32;

    /// Idempotent reset of internal state and timers.
    fn configure(&mut self);

    /// Pure observation + possible emit on the checker's `FiredEvent` sender.
    fn run(&mut self, vision: &dyn VisionClient, config: &Config);

    /// The triple set by the most recent firing; undefined before any firing.
    fn penalty(&self) -> Foul;
    fn team_color(&self) -> Color;
    fn quadrant(&self) -> Quadrant;
}
