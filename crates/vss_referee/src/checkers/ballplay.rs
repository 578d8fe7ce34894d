//! BallPlay checker (spec.md §4.4), priority high, and its two latch
//! sub-checkers (TwoAttackers, TwoDefenders). Grounded on
//! `checker_ballplay.cpp` and the sibling `checker_twoattackers`/
//! `checker_twodefenders` headers referenced there.

use std::sync::mpsc::Sender;

use vss_config::Config;
use vss_display::DisplayEvent;
use vss_geometry::{is_ball_inside_goal, is_inside_goal_area};
use vss_messages::{Color, Foul, Quadrant};
use vss_vision::VisionClient;

use crate::checker::{Checker, FiredEvent};

/// Latches true while the attacking team has >= 2 robots simultaneously
/// inside the opponent's goal area.
#[derive(Default)]
struct TwoAttackers;

impl TwoAttackers {
    fn is_two_players_attacking(
        &self,
        vision: &dyn VisionClient,
        config: &Config,
        attacker: Color,
        defender_side: vss_geometry::Side,
    ) -> bool {
        vision
            .available_players(attacker)
            .into_iter()
            .filter(|&id| {
                is_inside_goal_area(defender_side, vision.player_position(attacker, id), &config.field)
            })
            .count()
            >= 2
    }
}

/// Latches true while the defending team has >= 2 robots simultaneously
/// inside its own goal area.
#[derive(Default)]
struct TwoDefenders;

impl TwoDefenders {
    fn is_two_players_defending(
        &self,
        vision: &dyn VisionClient,
        config: &Config,
        defender: Color,
        defender_side: vss_geometry::Side,
    ) -> bool {
        vision
            .available_players(defender)
            .into_iter()
            .filter(|&id| {
                is_inside_goal_area(defender_side, vision.player_position(defender, id), &config.field)
            })
            .count()
            >= 2
    }
}

pub struct BallPlayChecker {
    sender: Sender<FiredEvent>,
    display: Sender<DisplayEvent>,
    is_play_running: bool,
    possible_penalty: bool,
    possible_goal_kick: bool,
    possible_goal: bool,
    two_attackers: TwoAttackers,
    two_defenders: TwoDefenders,
    penalty: Foul,
    team_color: Color,
    quadrant: Quadrant,
}

impl BallPlayChecker {
    pub fn new(sender: Sender<FiredEvent>, display: Sender<DisplayEvent>) -> Self {
        Self {
            sender,
            display,
            is_play_running: false,
            possible_penalty: false,
            possible_goal_kick: false,
            possible_goal: false,
            two_attackers: TwoAttackers,
            two_defenders: TwoDefenders,
            penalty: Foul::GameOn,
            team_color: Color::None,
            quadrant: Quadrant::NoQuadrant,
        }
    }
}

impl Checker for BallPlayChecker {
    fn name(&self) -> &'static str {
        "ball_play"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn configure(&mut self) {
        self.is_play_running = false;
        self.possible_penalty = false;
        self.possible_goal_kick = false;
        self.possible_goal = false;
    }

    fn run(&mut self, vision: &dyn VisionClient, config: &Config) {
        let ball_position = vision.ball_position();
        let sides = [
            (Color::Blue, config.blue_side()),
            (Color::Yellow, config.yellow_side()),
        ];

        let in_some_goal_area_but_not_mouth = sides.iter().any(|&(_, side)| {
            is_inside_goal_area(side, ball_position, &config.field)
                && !is_ball_inside_goal(side, ball_position, &config.field)
        });

        if in_some_goal_area_but_not_mouth {
            self.is_play_running = true;
            let (defender, defender_side) = sides
                .iter()
                .copied()
                .find(|&(_, side)| is_inside_goal_area(side, ball_position, &config.field))
                .expect("checked above");
            let attacker = defender.opponent();

            if !self.possible_penalty {
                self.possible_penalty =
                    self.two_defenders
                        .is_two_players_defending(vision, config, defender, defender_side);
            }
            if !self.possible_goal_kick {
                self.possible_goal_kick =
                    self.two_attackers
                        .is_two_players_attacking(vision, config, attacker, defender_side);
            }
            return;
        }

        if !self.is_play_running {
            self.possible_penalty = false;
            self.possible_goal_kick = false;
            self.possible_goal = false;
            return;
        }

        for &(color, side) in &sides {
            if is_ball_inside_goal(side, ball_position, &config.field) {
                self.possible_goal = true;

                if !self.possible_penalty && !self.possible_goal_kick {
                    let _ = self.display.send(DisplayEvent::Goal {
                        color: color.opponent(),
                    });

                    self.penalty = Foul::Kickoff;
                    self.team_color = color;
                    self.quadrant = Quadrant::NoQuadrant;
                    let _ = self.sender.send(FiredEvent {
                        checker_name: self.name(),
                        priority: self.priority(),
                    });
                }
            }
        }

        if self.possible_goal_kick || self.possible_penalty {
            let _ = self.display.send(DisplayEvent::Suggestion {
                possible_goal: self.possible_goal,
                possible_goal_kick: self.possible_goal_kick,
                possible_penalty: self.possible_penalty,
            });
        }

        self.is_play_running = false;
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
    use std::sync::Mutex;
    use vss_geometry::{Position, Velocity};

    struct FakeVision {
        ball_position: Mutex<Position>,
        blue: Vec<(u8, Position)>,
        yellow: Vec<(u8, Position)>,
    }

    impl VisionClient for FakeVision {
        fn ball_position(&self) -> Position {
            *self.ball_position.lock().unwrap()
        }
        fn ball_velocity(&self) -> Velocity {
            Velocity::zero()
        }
        fn available_players(&self, color: Color) -> Vec<u8> {
            match color {
                Color::Blue => self.blue.iter().map(|(id, _)| *id).collect(),
                Color::Yellow => self.yellow.iter().map(|(id, _)| *id).collect(),
                Color::None => Vec::new(),
            }
        }
        fn player_position(&self, color: Color, id: u8) -> Position {
            let list = match color {
                Color::Blue => &self.blue,
                Color::Yellow => &self.yellow,
                Color::None => return Position::invalid(),
            };
            list.iter()
                .find(|(pid, _)| *pid == id)
                .map(|(_, p)| *p)
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
        "#;
        Config::from_toml_str(toml).expect("parse config")
    }

    #[test]
    fn goal_fires_kickoff_against_conceding_team_when_no_latch() {
        let (sender, receiver) = crate::checker::fired_channel();
        let (display_sender, display_receiver) = vss_display::display_channel();
        let mut checker = BallPlayChecker::new(sender, display_sender);
        checker.configure();
        let config = config();
        let vision = FakeVision {
            ball_position: Mutex::new(Position::new(-0.73, 0.0)),
            blue: vec![],
            yellow: vec![],
        };

        // Ball inside yellow's goal area but not the mouth: play starts.
        checker.run(&vision, &config);
        assert!(checker.is_play_running);

        // Ball crosses into the mouth: play ends, goal for blue.
        *vision.ball_position.lock().unwrap() = Position::new(-0.8, 0.0);
        checker.run(&vision, &config);

        assert!(receiver.try_recv().is_ok());
        assert_eq!(checker.penalty(), Foul::Kickoff);
        assert_eq!(checker.team_color(), Color::Yellow);
        assert!(matches!(
            display_receiver.try_recv(),
            Ok(DisplayEvent::Goal {
                color: Color::Blue
            })
        ));
    }

    #[test]
    fn disputed_goal_suppresses_automatic_scoring() {
        let (sender, receiver) = crate::checker::fired_channel();
        let (display_sender, display_receiver) = vss_display::display_channel();
        let mut checker = BallPlayChecker::new(sender, display_sender);
        checker.configure();
        let config = config();
        let vision = FakeVision {
            ball_position: Mutex::new(Position::new(-0.73, 0.0)),
            blue: vec![],
            yellow: vec![(0, Position::new(-0.73, 0.1)), (1, Position::new(-0.73, -0.1))],
        };

        checker.run(&vision, &config);
        assert!(checker.possible_penalty);

        *vision.ball_position.lock().unwrap() = Position::new(-0.8, 0.0);
        checker.run(&vision, &config);

        assert!(receiver.try_recv().is_err());
        assert!(matches!(
            display_receiver.try_recv(),
            Ok(DisplayEvent::Suggestion { .. })
        ));
    }
}
