//! StuckedBall checker (spec.md §4.3), priority low. Grounded on
//! `checker_stuckedball.cpp`.

use std::sync::mpsc::Sender;

use vss_config::Config;
use vss_geometry::{is_inside_goal_area, quadrant_of};
use vss_messages::{Color, Foul, Quadrant};
use vss_vision::VisionClient;

use crate::checker::{Checker, FiredEvent};
use crate::timer::MonotonicTimer;

pub struct StuckedBallChecker {
    sender: Sender<FiredEvent>,
    timer: MonotonicTimer,
    is_last_stuck_at_goal_area: bool,
    penalty: Foul,
    team_color: Color,
    quadrant: Quadrant,
}

impl StuckedBallChecker {
    pub fn new(sender: Sender<FiredEvent>) -> Self {
        Self {
            sender,
            timer: MonotonicTimer::new(),
            is_last_stuck_at_goal_area: false,
            penalty: Foul::GameOn,
            team_color: Color::None,
            quadrant: Quadrant::NoQuadrant,
        }
    }

    fn have_players_nearly_ball(
        &self,
        vision: &dyn VisionClient,
        config: &Config,
        color: Color,
    ) -> bool {
        let ball_position = vision.ball_position();
        vision.available_players(color).into_iter().any(|id| {
            let player_position = vision.player_position(color, id);
            vss_geometry::distance(player_position, ball_position) <= 1.5 * config.robot_length_m
        })
    }

    fn set_penalty(&mut self, foul: Foul, team: Color, quadrant: Quadrant) {
        self.penalty = foul;
        self.team_color = team;
        self.quadrant = quadrant;
        let _ = self.sender.send(FiredEvent {
            checker_name: self.name(),
            priority: self.priority(),
        });
    }
}

impl Checker for StuckedBallChecker {
    fn name(&self) -> &'static str {
        "stucked_ball"
    }

    fn priority(&self) -> i32 {
        0
    }

    fn configure(&mut self) {
        self.timer.start();
        self.is_last_stuck_at_goal_area = false;
    }

    fn run(&mut self, vision: &dyn VisionClient, config: &Config) {
        let ball_position = vision.ball_position();
        let ball_velocity = vision.ball_velocity();

        if ball_position.is_invalid() || ball_velocity.abs() > config.ball_min_speed_for_stuck {
            self.timer.start();
            return;
        }

        let defenders = [
            (Color::Blue, config.blue_side()),
            (Color::Yellow, config.yellow_side()),
        ];

        let mut is_at_goal_areas = false;

        for (color, side) in defenders {
            if !is_inside_goal_area(side, ball_position, &config.field) {
                continue;
            }

            if !self.is_last_stuck_at_goal_area {
                self.is_last_stuck_at_goal_area = true;
                self.timer.start();
            }

            // Sampling point, not a continuous accumulation: stopping
            // here freezes the timer until the next start() below,
            // preserved from the source's own (possibly unintended)
            // behavior.
            self.timer.stop();

            if self.timer.elapsed_seconds() >= config.stucked_ball_time_s {
                if self.have_players_nearly_ball(vision, config, Color::Blue)
                    && self.have_players_nearly_ball(vision, config, Color::Yellow)
                {
                    self.set_penalty(Foul::FreeBall, Color::None, quadrant_of(ball_position));
                } else {
                    self.set_penalty(Foul::PenaltyKick, color.opponent(), Quadrant::NoQuadrant);
                }
                self.timer.start();
            }

            is_at_goal_areas = true;
        }

        if !is_at_goal_areas {
            if self.is_last_stuck_at_goal_area {
                self.is_last_stuck_at_goal_area = false;
                self.timer.start();
            }

            self.timer.stop();

            if self.timer.elapsed_seconds() >= config.stucked_ball_time_s {
                self.set_penalty(Foul::FreeBall, Color::None, quadrant_of(ball_position));
                self.timer.start();
            }
        }
    }

    fn penalty(&self) -> Foul {
        self.penalty
    }

    fn team_color(&self) -> Color {
        self.team_color
    }

    fn quadrant(&self) -> Quadrant {
        self.quadrant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use vss_geometry::{Position, Velocity};

    struct FakeVision {
        ball_position: Position,
        ball_velocity: Velocity,
        players: Mutex<std::collections::HashMap<Color, Vec<(u8, Position)>>>,
    }

    impl VisionClient for FakeVision {
        fn ball_position(&self) -> Position {
            self.ball_position
        }
        fn ball_velocity(&self) -> Velocity {
            self.ball_velocity
        }
        fn available_players(&self, color: Color) -> Vec<u8> {
            self.players
                .lock()
                .unwrap()
                .get(&color)
                .map(|players| players.iter().map(|(id, _)| *id).collect())
                .unwrap_or_default()
        }
        fn player_position(&self, color: Color, id: u8) -> Position {
            self.players
                .lock()
                .unwrap()
                .get(&color)
                .and_then(|players| players.iter().find(|(pid, _)| *pid == id).map(|(_, p)| *p))
                .unwrap_or(Position::invalid())
        }
        fn player_velocity(&self, _color: Color, _id: u8) -> Velocity {
            Velocity::zero()
        }
        fn player_orientation(&self, _color: Color, _id: u8) -> f32 {
            0.0
        }
    }

    fn config() -> Config {
        let toml = r#"
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
        half_time_s = 300.0
        ball_min_speed_for_stuck = 0.05
        stucked_ball_time_s = 0.01
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
        "#;
        Config::from_toml_str(toml).expect("parse config")
    }

    fn fake_vision(ball_position: Position) -> FakeVision {
        FakeVision {
            ball_position,
            ball_velocity: Velocity::zero(),
            players: Mutex::new(std::collections::HashMap::new()),
        }
    }

    #[test]
    fn fires_free_ball_after_stuck_outside_goal_areas() {
        let (sender, receiver) = crate::checker::fired_channel();
        let mut checker = StuckedBallChecker::new(sender);
        checker.configure();
        let config = config();
        let vision = fake_vision(Position::new(0.1, 0.0));

        std::thread::sleep(std::time::Duration::from_millis(20));
        checker.run(&vision, &config);

        assert!(receiver.try_recv().is_ok());
        assert_eq!(checker.penalty(), Foul::FreeBall);
        assert_eq!(checker.quadrant(), Quadrant::Q1);
    }

    #[test]
    fn fast_ball_never_fires() {
        let (sender, _receiver) = crate::checker::fired_channel();
        let mut checker = StuckedBallChecker::new(sender);
        checker.configure();
        let config = config();
        let vision = FakeVision {
            ball_position: Position::new(0.1, 0.0),
            ball_velocity: Velocity::new(1.0, 0.0),
            players: Mutex::new(std::collections::HashMap::new()),
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        checker.run(&vision, &config);
        assert_eq!(checker.penalty(), Foul::GameOn);
    }

    #[test]
    fn configure_twice_in_succession_is_idempotent() {
        let (sender, _receiver) = crate::checker::fired_channel();
        let mut checker = StuckedBallChecker::new(sender);
        checker.configure();
        let first = checker.is_last_stuck_at_goal_area;
        checker.configure();
        assert_eq!(first, checker.is_last_stuck_at_goal_area);
        assert!(!checker.is_last_stuck_at_goal_area);
    }
}
