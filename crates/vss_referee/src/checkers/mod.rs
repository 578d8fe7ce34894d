pub mod ballplay;
pub mod halftime;
pub mod stuckedball;

pub use ballplay::BallPlayChecker;
pub use halftime::HalfTimeChecker;
pub use stuckedball::StuckedBallChecker;
