//! HalfTime checker (spec.md §4.5). Unlike the other checkers it runs
//! unconditionally every tick (§4.6 step 1), independent of the current
//! foul, and its firing drives the engine's half progression directly
//! rather than competing in the priority schedule.

use crate::timer::MonotonicTimer;
use vss_config::Config;

pub struct HalfTimeChecker {
    timer: MonotonicTimer,
}

impl HalfTimeChecker {
    pub fn new() -> Self {
        Self {
            timer: MonotonicTimer::new(),
        }
    }

    pub fn configure(&mut self) {
        self.timer.start();
    }

    /// Returns `true` exactly once the elapsed time reaches `half_time_s`,
    /// and restarts the timer for the next half.
    pub fn run(&mut self, config: &Config) -> bool {
        self.timer.stop();
        if self.timer.elapsed_seconds() >= config.half_time_s {
            self.timer.start();
            return true;
        }
        false
    }

    pub fn timestamp_s(&self) -> f32 {
        self.timer.elapsed_seconds()
    }
}

impl Default for HalfTimeChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_half_time(half_time_s: f32) -> Config {
        let toml = format!(
            r#"
            thread_frequency_hz = 60.0
            referee_address = "127.0.0.1"
            referee_port = 1
            vision_address = "224.0.0.1"
            vision_port = 2
            replacer_address = "224.0.0.1"
            replacer_port = 3
            simulator_address = "127.0.0.1"
            simulator_port = 4
            transition_time_s = 4.0
            ball_radius_m = 0.02134
            robot_length_m = 0.08
            half_time_s = {half_time_s}
            ball_min_speed_for_stuck = 0.05
            stucked_ball_time_s = 4.0
            qt_players = 3
            blue_team_name = "Blue"
            yellow_team_name = "Yellow"
            blue_is_left_side = true

            [field]
            field_length = 1.5
            field_width = 1.3
            goal_area_depth = 0.15
            goal_area_width = 0.7
            goal_width = 0.4
            center_radius = 0.2
            "#
        );
        Config::from_toml_str(&toml).expect("parse config")
    }

    #[test]
    fn fires_once_elapsed_reaches_half_time_then_restarts() {
        let mut checker = HalfTimeChecker::new();
        checker.configure();
        let config = config_with_half_time(0.01);

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(checker.run(&config));
        assert!(!checker.run(&config));
    }
}
