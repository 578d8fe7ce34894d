//! The Replacer Engine (spec.md §4.7): receives team placement
//! proposals, stages default placements when a team doesn't propose
//! in time, and teleports robots/ball through the simulator's
//! replacement protocol. Grounded on `replacer.cpp`'s `loop()`,
//! `takeFoul`, `placeTeams`, `placeFrame`, `placeBall` and
//! `placeOutside`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, info_span, warn};
use vss_config::Config;
use vss_geometry::{Position, Side, Velocity};
use vss_messages::{BallReplacement, Color, Foul, Frame, Packet, Quadrant, Replacement, RobotReplacement, TeamsPlacedSignal, VssRefPlacement};
use vss_vision::VisionClient;

use crate::error::ReplacerError;
use crate::placement;

/// Per-color registered goalie id (spec.md §5: "Goalie map ... guarded
/// by `_goalieMutex`"). Shared so an external source (a game
/// controller, a CLI) can call [`Replacer::set_goalie`] independently
/// of the engine's own task.
#[derive(Clone)]
pub struct GoalieRegistry(Arc<Mutex<HashMap<Color, u8>>>);

impl GoalieRegistry {
    pub fn new() -> Self {
        let mut goalies = HashMap::new();
        goalies.insert(Color::Blue, 0);
        goalies.insert(Color::Yellow, 0);
        Self(Arc::new(Mutex::new(goalies)))
    }

    pub fn set(&self, color: Color, id: u8) {
        self.0.lock().insert(color, id);
    }

    pub fn get(&self, color: Color) -> u8 {
        *self.0.lock().get(&color).unwrap_or(&0)
    }
}

impl Default for GoalieRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn side_of(color: Color, config: &Config) -> Side {
    match color {
        Color::Blue => config.blue_side(),
        Color::Yellow => config.yellow_side(),
        Color::None => Side::Left,
    }
}

pub struct Replacer {
    config: Arc<Config>,
    vision: Arc<dyn VisionClient>,
    goalies: GoalieRegistry,
    foul_receiver: UnboundedReceiver<(Foul, Color, Quadrant)>,
    teams_placed: TeamsPlacedSignal,
    placement_socket: UdpSocket,
    simulator_socket: UdpSocket,
    rng: ChaCha8Rng,

    /// The last frame each color proposed, kept across cycles so
    /// penalty-shootout actor selection can look at a color's most
    /// recent submission even outside the cycle that produced it.
    placement: HashMap<Color, Frame>,
    /// Whether a color has proposed a frame *this* cycle.
    placement_status: HashMap<Color, bool>,

    last_ball_position: Position,
    last_ball_velocity: Velocity,
    placed_last_position: bool,

    foul: Foul,
    foul_color: Color,
    foul_quadrant: Quadrant,
    foul_processed: bool,
    teams_placed_raised: bool,
    placement_deadline: Option<Instant>,
    is_goalie_placed_at_top: bool,
    last_snapshot: Option<WorldSnapshot>,
}

/// The last full, non-empty placement this engine emitted, kept so a
/// cycle that finds too few available players to fill a template can
/// re-emit the last legal state instead of defaulting to the origin
/// (spec.md's `saveFrameAndBall`/`placeLastFrameAndBall`).
#[derive(Clone)]
struct WorldSnapshot {
    frames: HashMap<Color, Frame>,
    ball_position: Position,
    ball_velocity: Velocity,
}

impl Replacer {
    pub async fn start(
        config: Arc<Config>,
        vision: Arc<dyn VisionClient>,
        goalies: GoalieRegistry,
        foul_receiver: UnboundedReceiver<(Foul, Color, Quadrant)>,
        teams_placed: TeamsPlacedSignal,
    ) -> Result<Self, ReplacerError> {
        let bind_address = format!("0.0.0.0:{}", config.replacer_endpoint.port);
        let placement_socket =
            UdpSocket::bind(&bind_address)
                .await
                .map_err(|source| ReplacerError::Bind {
                    address: bind_address,
                    source,
                })?;

        let multicast_addr: std::net::Ipv4Addr = config
            .replacer_endpoint
            .address
            .parse()
            .unwrap_or(std::net::Ipv4Addr::UNSPECIFIED);
        placement_socket
            .join_multicast_v4(multicast_addr, std::net::Ipv4Addr::UNSPECIFIED)
            .map_err(|source| ReplacerError::Join {
                address: config.replacer_endpoint.address.clone(),
                source,
            })?;

        let simulator_socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|source| ReplacerError::Bind {
                address: "0.0.0.0:0".to_string(),
                source,
            })?;
        simulator_socket
            .connect(config.simulator_endpoint.socket_addr())
            .await
            .map_err(|source| ReplacerError::Connect {
                address: config.simulator_endpoint.socket_addr(),
                source,
            })?;

        // SPEC_FULL.md §9: seeded from config when set (deterministic
        // tests), otherwise from the wall clock like the source's
        // high-resolution-clock seed.
        let seed = config.rng_seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        });

        info!(
            address = %bind_address,
            simulator = %config.simulator_endpoint.socket_addr(),
            "replacer engine started"
        );

        Ok(Self {
            config,
            vision,
            goalies,
            foul_receiver,
            teams_placed,
            placement_socket,
            simulator_socket,
            rng: ChaCha8Rng::seed_from_u64(seed),
            placement: HashMap::new(),
            placement_status: HashMap::from([(Color::Blue, false), (Color::Yellow, false)]),
            last_ball_position: Position::invalid(),
            last_ball_velocity: Velocity::zero(),
            placed_last_position: false,
            foul: Foul::GameOn,
            foul_color: Color::None,
            foul_quadrant: Quadrant::NoQuadrant,
            foul_processed: true,
            teams_placed_raised: false,
            placement_deadline: None,
            is_goalie_placed_at_top: false,
            last_snapshot: None,
        })
    }

    /// One tick of the engine: drain placement proposals, stage
    /// default placements once a cycle's wait elapses, and keep the
    /// ball parked at its last known rest position between cycles.
    pub async fn tick(&mut self) {
        let _span = info_span!("replacer").entered();

        while let Ok((foul, color, quadrant)) = self.foul_receiver.try_recv() {
            self.take_foul(foul, color, quadrant);
        }

        self.drain_placement_datagrams().await;

        let both_placed = self
            .placement_status
            .values()
            .all(|&placed| placed);
        if both_placed && !self.teams_placed_raised {
            self.teams_placed.set();
            self.teams_placed_raised = true;
        }

        if !self.placed_last_position {
            let position = self.last_ball_position;
            let velocity = self.last_ball_velocity;
            self.place_ball(position, velocity).await;
            self.placed_last_position = true;
        }

        if self.foul.drives_placement() && !self.foul_processed {
            let deadline_elapsed = self
                .placement_deadline
                .is_some_and(|deadline| Instant::now() >= deadline);
            if deadline_elapsed || both_placed {
                self.place_teams().await;
            }
        }

        if self.foul_processed {
            for placed in self.placement_status.values_mut() {
                *placed = false;
            }
            self.last_ball_position = self.vision.ball_position();
            self.last_ball_velocity = self.vision.ball_velocity();
            self.placed_last_position = false;
        }
    }

    async fn drain_placement_datagrams(&mut self) {
        let mut buffer = [0u8; 4096];
        loop {
            match self.placement_socket.try_recv(&mut buffer) {
                Ok(length) => self.handle_datagram(&buffer[..length]),
                Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(error) => {
                    warn!(%error, "replacer placement socket recv failed");
                    break;
                }
            }
        }
    }

    fn handle_datagram(&mut self, datagram: &[u8]) {
        match bincode::deserialize::<VssRefPlacement>(datagram) {
            Ok(placement) => {
                let color = placement.world.team_color;
                debug!(?color, robots = placement.world.robots.len(), "placement proposal received");
                self.placement.insert(color, placement.world);
                self.placement_status.insert(color, true);
            }
            Err(error) => warn!(%error, "dropped unparseable placement datagram"),
        }
    }

    /// Records a new foul cycle (spec.md §4.7: "clears `foulProcessed`").
    pub fn take_foul(&mut self, foul: Foul, color: Color, quadrant: Quadrant) {
        self.foul = foul;
        self.foul_color = color;
        self.foul_quadrant = quadrant;
        self.foul_processed = false;
        self.teams_placed_raised = false;
        self.placement_deadline = Some(Instant::now() + Duration::from_secs_f32(self.config.transition_time_s));
    }

    /// Stages a team's goalie id (spec.md §4.7: `takeGoalie`).
    pub fn set_goalie(&self, color: Color, id: u8) {
        self.goalies.set(color, id);
    }

    /// For each color, emits its proposed frame or a computed default,
    /// then the foul's ball position (spec.md §4.7 `placeTeams`).
    async fn place_teams(&mut self) {
        for color in [Color::Blue, Color::Yellow] {
            let frame = if self.placement_status.get(&color).copied().unwrap_or(false) {
                self.placement.get(&color).cloned().unwrap_or_else(|| Frame::empty(color))
            } else {
                let frame = self.default_frame_for(color);
                self.placement.insert(color, frame.clone());
                frame
            };
            self.place_frame(&frame).await;
        }

        let ball_position = placement::ball_place_by_foul(
            self.foul,
            self.foul_color,
            self.foul_quadrant,
            &self.config,
            self.is_goalie_placed_at_top,
        );
        self.place_ball(ball_position, Velocity::zero()).await;
        self.snapshot_world();
        self.foul_processed = true;
    }

    fn default_frame_for(&mut self, color: Color) -> Frame {
        let goalie_id = self.goalies.get(color);
        let available = self.vision.available_players(color);

        let frame = match self.foul {
            Foul::Kickoff => placement::kickoff_placement(color, goalie_id, &available, &self.config),
            Foul::FreeBall => placement::free_ball_placement(color, self.foul_quadrant, goalie_id, &available, &self.config),
            Foul::PenaltyKick => placement::penalty_placement(color, self.foul_color, goalie_id, &available, &self.config),
            Foul::GoalKick => {
                let (frame, is_top) =
                    placement::goal_kick_placement(color, self.foul_color, goalie_id, &available, &self.config, &mut self.rng);
                if let Some(is_top) = is_top {
                    self.is_goalie_placed_at_top = is_top;
                }
                frame
            }
            // Preserved from the source: FREE_KICK (and HALT/GAME_ON/STOP,
            // which never reach here) fall through to an empty frame since
            // `placeTeams`'s switch has no case for them.
            _ => Frame::empty(color),
        };

        // No players available to fill even the goalie slot: replay the
        // last legal placement instead of sending an empty frame
        // (spec.md's `saveFrameAndBall`/`placeLastFrameAndBall`).
        if frame.robots.is_empty() {
            if let Some(last) = self.last_placed_frame(color) {
                return last;
            }
        }
        frame
    }

    fn last_placed_frame(&self, color: Color) -> Option<Frame> {
        self.last_snapshot.as_ref().and_then(|snapshot| snapshot.frames.get(&color).cloned())
    }

    /// Remembers the full placement just emitted, so a future cycle
    /// that finds no available players can fall back to it rather
    /// than the field origin.
    pub fn snapshot_world(&mut self) {
        self.last_snapshot = Some(WorldSnapshot {
            frames: self.placement.clone(),
            ball_position: self.last_ball_position,
            ball_velocity: self.last_ball_velocity,
        });
    }

    /// Re-emits the last fully legal placement in full, for callers
    /// that need to recover a cycle without waiting for fresh team
    /// proposals (spec.md's `placeLastFrameAndBall`).
    pub async fn replay_last_snapshot(&mut self) {
        let Some(snapshot) = self.last_snapshot.clone() else {
            return;
        };
        for frame in snapshot.frames.values() {
            self.place_frame(frame).await;
        }
        self.place_ball(snapshot.ball_position, snapshot.ball_velocity).await;
    }

    /// Removes non-kicking robots from play: the full squad for
    /// KICKOFF, or the non-selected pair for a PENALTY_KICK shootout
    /// (spec.md §4.8 "Outside-field" / "Penalty shootout, non-actors").
    /// Not driven automatically by `tick`; call when the surrounding
    /// orchestration decides a shootout or kickoff restart applies.
    pub async fn place_outside(&mut self, opposite_team: Color) {
        match self.foul {
            Foul::Kickoff => {
                let available = self.vision.available_players(opposite_team);
                let goalie_id = self.goalies.get(opposite_team);
                let frame = placement::outside_field_placement(opposite_team, goalie_id, &available, &self.config);
                self.place_frame(&frame).await;
            }
            Foul::PenaltyKick => {
                let attacker_color = self.foul_color;
                let defender_color = opposite_team;
                let defender_side = side_of(defender_color, &self.config);

                let attacker_last = self.placement.get(&attacker_color).cloned().unwrap_or_else(|| Frame::empty(attacker_color));
                let defender_last = self.placement.get(&defender_color).cloned().unwrap_or_else(|| Frame::empty(defender_color));
                let (attacker_id, keeper_id) =
                    placement::select_penalty_shootout_actors(attacker_color, &attacker_last, defender_side, &defender_last, &self.config);

                let attacker_available = self.vision.available_players(attacker_color);
                let attacker_frame = placement::penalty_shootout_placement(attacker_color, attacker_id, &attacker_available, &self.config);
                self.place_frame(&attacker_frame).await;

                let defender_available = self.vision.available_players(defender_color);
                let defender_frame = placement::penalty_shootout_placement(defender_color, keeper_id, &defender_available, &self.config);
                self.place_frame(&defender_frame).await;
            }
            _ => {}
        }
    }

    async fn place_frame(&mut self, frame: &Frame) {
        if frame.team_color == self.foul_color {
            let side = side_of(self.foul_color, &self.config);
            for robot in &frame.robots {
                if vss_geometry::is_inside_goal_area(side, Position::new(robot.x, robot.y), &self.config.field) {
                    self.is_goalie_placed_at_top = robot.y >= 0.0;
                }
            }
        }

        let robots = frame
            .robots
            .iter()
            .map(|robot| RobotReplacement {
                id: robot.id,
                yellow: frame.team_color == Color::Yellow,
                x: robot.x,
                y: robot.y,
                orientation_deg: robot.orientation_deg,
                vx: 0.0,
                vy: 0.0,
                turn_on: true,
            })
            .collect();

        self.send_packet(Packet {
            replace: Replacement { robots, ball: None },
        })
        .await;
    }

    async fn place_ball(&mut self, position: Position, velocity: Velocity) {
        self.send_packet(Packet {
            replace: Replacement {
                robots: Vec::new(),
                ball: Some(BallReplacement {
                    x: position.x,
                    y: position.y,
                    vx: velocity.vx,
                    vy: velocity.vy,
                }),
            },
        })
        .await;
    }

    async fn send_packet(&self, packet: Packet) {
        match bincode::serialize(&packet) {
            Ok(bytes) => {
                if let Err(error) = self.simulator_socket.send(&bytes).await {
                    warn!(%error, "failed to send replacement packet");
                }
            }
            Err(error) => warn!(%error, "failed to serialize replacement packet"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goalie_registry_defaults_both_colors_to_id_zero() {
        let goalies = GoalieRegistry::new();
        assert_eq!(goalies.get(Color::Blue), 0);
        assert_eq!(goalies.get(Color::Yellow), 0);
    }

    #[test]
    fn goalie_registry_set_is_per_color() {
        let goalies = GoalieRegistry::new();
        goalies.set(Color::Blue, 2);
        assert_eq!(goalies.get(Color::Blue), 2);
        assert_eq!(goalies.get(Color::Yellow), 0);
    }
}
