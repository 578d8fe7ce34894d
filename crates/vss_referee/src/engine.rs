//! The Referee Engine (spec.md §4.6): priority-ordered checker
//! scheduler, GAME_ON <-> STOP <-> foul transition FSM, half
//! progression, and command emitter. Grounded on `referee.cpp`'s
//! `loop()`, with the signal-mapper fan-in replaced by the
//! [`crate::checker`] channel per the redesign note in SPEC_FULL.md §9.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, info_span, warn};
use vss_config::Config;
use vss_display::DisplayEvent;
use vss_messages::{Color, Foul, Half, PenaltyInfo, PenaltyInfoHandle, Quadrant, TeamsPlacedSignal, VssRefCommand};
use vss_vision::VisionClient;

use crate::checker::{fired_channel, Checker};
use crate::checkers::{BallPlayChecker, HalfTimeChecker, StuckedBallChecker};
use crate::error::RefereeError;
use crate::timer::MonotonicTimer;

/// Sink for fouls that start a placement cycle: the Replacer's
/// `takeFoul(foul, color, quadrant)` push (spec.md §4.7).
pub type FoulSender = UnboundedSender<(Foul, Color, Quadrant)>;

pub struct RefereeEngine {
    config: Arc<Config>,
    vision: Arc<dyn VisionClient>,
    checkers: Vec<Box<dyn Checker>>,
    fired_receiver: std::sync::mpsc::Receiver<crate::checker::FiredEvent>,
    half_checker: HalfTimeChecker,
    penalty_info: PenaltyInfoHandle,
    teams_placed: TeamsPlacedSignal,
    display: std::sync::mpsc::Sender<DisplayEvent>,
    foul_sender: FoulSender,
    socket: UdpSocket,
    transition_timer: MonotonicTimer,
    is_stopped: bool,
    reseted_timer: bool,
    game_half: Half,
    current_foul: Foul,
}

impl RefereeEngine {
    pub async fn start(
        config: Arc<Config>,
        vision: Arc<dyn VisionClient>,
        penalty_info: PenaltyInfoHandle,
        teams_placed: TeamsPlacedSignal,
        display: std::sync::mpsc::Sender<DisplayEvent>,
        foul_sender: FoulSender,
    ) -> Result<Self, RefereeError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(RefereeError::Bind)?;
        socket
            .connect(config.referee_endpoint.socket_addr())
            .await
            .map_err(|source| RefereeError::Connect {
                address: config.referee_endpoint.socket_addr(),
                source,
            })?;

        let (fired_sender, fired_receiver) = fired_channel();

        let mut stucked_ball = StuckedBallChecker::new(fired_sender.clone());
        stucked_ball.configure();
        let mut ball_play = BallPlayChecker::new(fired_sender, display.clone());
        ball_play.configure();

        // Pre-sorted descending by priority, ties by insertion order
        // (SPEC_FULL.md §9: "a pre-sorted vector ... no key-sorting in
        // the hot loop").
        let mut checkers: Vec<Box<dyn Checker>> = vec![Box::new(stucked_ball), Box::new(ball_play)];
        checkers.sort_by(|a, b| b.priority().cmp(&a.priority()));

        let mut half_checker = HalfTimeChecker::new();
        half_checker.configure();

        info!(
            address = %config.referee_endpoint.socket_addr(),
            "referee engine started"
        );

        let mut engine = Self {
            config,
            vision,
            checkers,
            fired_receiver,
            half_checker,
            penalty_info,
            teams_placed,
            display,
            foul_sender,
            socket,
            transition_timer: MonotonicTimer::new(),
            is_stopped: false,
            reseted_timer: false,
            game_half: Half::NoHalf,
            current_foul: Foul::GameOn,
        };

        engine.advance_half().await;

        Ok(engine)
    }

    /// One tick of the engine: advance HalfTime, then either run
    /// checkers (GAME_ON) or advance the transition FSM (spec.md §4.6).
    pub async fn tick(&mut self) {
        let _span = info_span!("referee").entered();

        if self.half_checker.run(&self.config) {
            self.config.swap_sides();
            self.advance_half().await;
        }

        if self.current_foul == Foul::GameOn {
            self.is_stopped = false;
            self.reseted_timer = false;
            self.teams_placed.clear();

            let mut winner = None;
            for checker in &mut self.checkers {
                checker.run(self.vision.as_ref(), &self.config);
                if self.fired_receiver.try_recv().is_ok() {
                    winner = Some((checker.penalty(), checker.team_color(), checker.quadrant()));
                    break;
                }
            }
            if let Some((foul, team, quadrant)) = winner {
                self.set_foul(foul, team, quadrant).await;
            }
        } else if !self.is_stopped {
            if !self.reseted_timer {
                self.transition_timer.start();
                self.reseted_timer = true;
            }
            self.transition_timer.stop();

            let teams_placed = self.teams_placed.get();
            if self.transition_timer.elapsed_seconds() >= self.config.transition_time_s
                || teams_placed
            {
                self.is_stopped = true;
                self.reseted_timer = false;
                self.set_foul(Foul::Stop, Color::None, Quadrant::NoQuadrant).await;
            }
        } else {
            if !self.reseted_timer {
                self.transition_timer.start();
                self.reseted_timer = true;
            }
            self.transition_timer.stop();

            if self.transition_timer.elapsed_seconds() >= self.config.transition_time_s {
                self.is_stopped = false;
                self.reseted_timer = false;
                self.teams_placed.clear();
                self.set_foul(Foul::GameOn, Color::None, Quadrant::NoQuadrant)
                    .await;

                for checker in &mut self.checkers {
                    checker.configure();
                }
            }
        }
    }

    /// A thread-safe snapshot of the current penalty triple
    /// (SPEC_FULL.md §6 item 1, `getLastPenaltyInfo`).
    pub fn last_penalty_info(&self) -> PenaltyInfo {
        self.penalty_info.get()
    }

    async fn advance_half(&mut self) {
        self.game_half = self.game_half.advance();
        info!(half = ?self.game_half, "half passed");
        self.set_foul(Foul::Kickoff, Color::None, Quadrant::NoQuadrant)
            .await;
    }

    async fn set_foul(&mut self, foul: Foul, team: Color, quadrant: Quadrant) {
        self.current_foul = foul;
        let timestamp_s = self.half_checker.timestamp_s();
        let info = PenaltyInfo {
            foul,
            team,
            quadrant,
            timestamp_s,
            half: self.game_half,
        };
        self.penalty_info.set(info);

        let command: VssRefCommand = info.into();
        match bincode::serialize(&command) {
            Ok(bytes) => {
                if let Err(error) = self.socket.send(&bytes).await {
                    warn!(%error, "failed to send referee command");
                }
            }
            Err(error) => warn!(%error, "failed to serialize referee command"),
        }

        info!(?foul, ?team, ?quadrant, timestamp_s, "sent command");

        let _ = self.display.send(DisplayEvent::Foul {
            foul,
            color: team,
            quadrant,
        });
        let _ = self.display.send(DisplayEvent::TimeStamp {
            timestamp_s,
            half: self.game_half,
        });

        if foul.drives_placement() {
            let _ = self.foul_sender.send((foul, team, quadrant));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vss_geometry::{Position, Velocity};

    /// A vision client that never gives any checker a reason to fire:
    /// an invalid ball position and no robots for either color.
    struct IdleVision;

    impl VisionClient for IdleVision {
        fn ball_position(&self) -> Position {
            Position::invalid()
        }
        fn ball_velocity(&self) -> Velocity {
            Velocity::zero()
        }
        fn available_players(&self, _color: Color) -> Vec<u8> {
            Vec::new()
        }
        fn player_position(&self, _color: Color, _id: u8) -> Position {
            Position::invalid()
        }
        fn player_velocity(&self, _color: Color, _id: u8) -> Velocity {
            Velocity::zero()
        }
        fn player_orientation(&self, _color: Color, _id: u8) -> f32 {
            0.0
        }
    }

    fn config(half_time_s: f32, transition_time_s: f32) -> Arc<Config> {
        let toml = format!(
            r#"
            thread_frequency_hz = 60.0
            referee_address = "127.0.0.1"
            referee_port = 57001
            vision_address = "224.0.0.1"
            vision_port = 2
            replacer_address = "224.0.0.1"
            replacer_port = 3
            simulator_address = "127.0.0.1"
            simulator_port = 4
            transition_time_s = {transition_time_s}
            ball_radius_m = 0.02134
            robot_length_m = 0.08
            half_time_s = {half_time_s}
            ball_min_speed_for_stuck = 0.05
            stucked_ball_time_s = 300.0
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
        Arc::new(Config::from_toml_str(&toml).expect("parse config"))
    }

    async fn start_engine(
        config: Arc<Config>,
    ) -> (
        RefereeEngine,
        std::sync::mpsc::Receiver<DisplayEvent>,
        tokio::sync::mpsc::UnboundedReceiver<(Foul, Color, Quadrant)>,
    ) {
        let vision: Arc<dyn VisionClient> = Arc::new(IdleVision);
        let (display_sender, display_receiver) = vss_display::display_channel();
        let (foul_sender, foul_receiver) = tokio::sync::mpsc::unbounded_channel();

        let engine = RefereeEngine::start(
            config,
            vision,
            PenaltyInfoHandle::new(),
            TeamsPlacedSignal::new(),
            display_sender,
            foul_sender,
        )
        .await
        .expect("engine starts");

        (engine, display_receiver, foul_receiver)
    }

    #[tokio::test]
    async fn starting_emits_kickoff_for_the_first_half() {
        let (engine, _display, _foul) = start_engine(config(300.0, 4.0)).await;
        let info = engine.last_penalty_info();
        assert_eq!(info.foul, Foul::Kickoff);
        assert_eq!(info.half, Half::First);
    }

    #[tokio::test]
    async fn a_foul_cycle_runs_foul_emitted_then_stop_then_game_on() {
        let (mut engine, _display, _foul) = start_engine(config(300.0, 0.01)).await;

        engine.set_foul(Foul::FreeBall, Color::None, Quadrant::Q1).await;
        assert_eq!(engine.last_penalty_info().foul, Foul::FreeBall);

        // Wait past transition_time_s so the FSM advances to STOP.
        loop {
            engine.tick().await;
            if engine.last_penalty_info().foul == Foul::Stop {
                break;
            }
        }

        // Wait past transition_time_s again so the FSM returns to GAME_ON.
        loop {
            engine.tick().await;
            if engine.last_penalty_info().foul == Foul::GameOn {
                break;
            }
        }
    }

    #[tokio::test]
    async fn half_time_elapsing_swaps_sides_and_advances_to_second_half() {
        let config = config(0.01, 4.0);
        let (mut engine, _display, _foul) = start_engine(config.clone()).await;
        assert!(config.blue_is_left_side());

        loop {
            engine.tick().await;
            if engine.last_penalty_info().half == Half::Second {
                break;
            }
        }

        assert_eq!(engine.last_penalty_info().foul, Foul::Kickoff);
        assert!(!config.blue_is_left_side());
    }

    #[tokio::test]
    async fn half_never_regresses_and_settles_at_second() {
        let config = config(0.01, 4.0);
        let (mut engine, _display, _foul) = start_engine(config).await;

        let mut seen = vec![engine.last_penalty_info().half];
        for _ in 0..200 {
            engine.tick().await;
            let half = engine.last_penalty_info().half;
            if half != *seen.last().unwrap() {
                seen.push(half);
            }
            if half == Half::Second {
                break;
            }
        }

        assert_eq!(seen, vec![Half::First, Half::Second]);
    }
}
