//! The Referee Engine: Monotonic Timer, Checker Framework, the
//! individual checkers, and the priority-ordered scheduling/transition
//! FSM described in spec.md §4.1-§4.6.

pub mod checker;
pub mod checkers;
pub mod engine;
pub mod error;
pub mod timer;

pub use checker::Checker;
pub use checkers::{BallPlayChecker, HalfTimeChecker, StuckedBallChecker};
pub use engine::{FoulSender, RefereeEngine};
pub use error::RefereeError;
pub use timer::{Clock, MonotonicTimer, SystemClock};
