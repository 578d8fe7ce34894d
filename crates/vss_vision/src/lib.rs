//! The vision client: an external collaborator (spec §1), specified
//! here only by the interface in spec.md §6 plus a concrete UDP
//! multicast implementation that is the single writer of ball/robot
//! observations (spec.md §3's ownership rule).

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use vss_geometry::{Position, Velocity};
use vss_messages::Color;

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("failed to bind vision socket on {address}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to join vision multicast group {address}")]
    Join {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Everything the core reads about one robot, per tick.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct RobotObservation {
    pub id: u8,
    pub position: Position,
    pub velocity: Velocity,
    /// Radians, field frame.
    pub orientation: f32,
}

/// A single multicast datagram from the vision feed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VisionMessage {
    pub ball_position: Position,
    pub ball_velocity: Velocity,
    pub blue: Vec<RobotObservation>,
    pub yellow: Vec<RobotObservation>,
}

/// The atomic-snapshot state vision publishes and the core reads.
#[derive(Clone, Debug, Default)]
struct VisionSnapshot {
    ball_position: Position,
    ball_velocity: Velocity,
    blue: Vec<RobotObservation>,
    yellow: Vec<RobotObservation>,
}

impl From<VisionMessage> for VisionSnapshot {
    fn from(message: VisionMessage) -> Self {
        Self {
            ball_position: message.ball_position,
            ball_velocity: message.ball_velocity,
            blue: message.blue,
            yellow: message.yellow,
        }
    }
}

/// The contract every checker and the Replacer consume vision through
/// (spec.md §6's "Vision client contract (consumed)").
pub trait VisionClient: Send + Sync {
    fn ball_position(&self) -> Position;
    fn ball_velocity(&self) -> Velocity;
    fn available_players(&self, color: Color) -> Vec<u8>;
    fn player_position(&self, color: Color, id: u8) -> Position;
    fn player_velocity(&self, color: Color, id: u8) -> Velocity;
    /// Radians, field frame.
    fn player_orientation(&self, color: Color, id: u8) -> f32;
}

/// A UDP-multicast-backed [`VisionClient`]. Receiving is a single
/// background task; reads are copy-out snapshots under a short-lived
/// lock, matching spec.md §5's "atomic-snapshot reads" requirement.
pub struct UdpVisionClient {
    snapshot: Arc<RwLock<VisionSnapshot>>,
}

impl UdpVisionClient {
    /// Binds and joins the vision multicast group, spawning the
    /// receive loop on the current Tokio runtime. Bind/join failures
    /// are fatal for the vision task (spec.md §7).
    pub async fn start(
        address: &str,
        port: u16,
        cancellation: CancellationToken,
    ) -> Result<Arc<Self>, VisionError> {
        let bind_address = format!("0.0.0.0:{port}");
        let socket = UdpSocket::bind(&bind_address)
            .await
            .map_err(|source| VisionError::Bind {
                address: bind_address,
                source,
            })?;

        let multicast_addr: std::net::Ipv4Addr =
            address.parse().unwrap_or(std::net::Ipv4Addr::UNSPECIFIED);
        socket
            .join_multicast_v4(multicast_addr, std::net::Ipv4Addr::UNSPECIFIED)
            .map_err(|source| VisionError::Join {
                address: address.to_string(),
                source,
            })?;

        info!(address, port, "vision client joined multicast group");

        let client = Arc::new(Self {
            snapshot: Arc::new(RwLock::new(VisionSnapshot::default())),
        });

        let receiver = client.clone();
        tokio::spawn(
            async move { receiver.receive_loop(socket, cancellation).await }
                .instrument(info_span!("vision")),
        );

        Ok(client)
    }

    async fn receive_loop(&self, socket: UdpSocket, cancellation: CancellationToken) {
        let mut buffer = vec![0u8; 65536];
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    info!("vision client shutting down");
                    return;
                }
                received = socket.recv(&mut buffer) => {
                    match received {
                        Ok(length) => self.handle_datagram(&buffer[..length]),
                        Err(error) => warn!(%error, "vision socket recv failed"),
                    }
                }
            }
        }
    }

    fn handle_datagram(&self, datagram: &[u8]) {
        match bincode::deserialize::<VisionMessage>(datagram) {
            Ok(message) => {
                debug!(
                    ball_valid = message.ball_position.valid,
                    blue = message.blue.len(),
                    yellow = message.yellow.len(),
                    "vision snapshot updated"
                );
                *self.snapshot.write() = message.into();
            }
            Err(error) => warn!(%error, "dropped unparseable vision datagram"),
        }
    }

    fn team(&self, color: Color) -> Vec<RobotObservation> {
        let snapshot = self.snapshot.read();
        match color {
            Color::Blue => snapshot.blue.clone(),
            Color::Yellow => snapshot.yellow.clone(),
            Color::None => Vec::new(),
        }
    }

    fn find_robot(&self, color: Color, id: u8) -> Option<RobotObservation> {
        self.team(color).into_iter().find(|robot| robot.id == id)
    }
}

impl VisionClient for UdpVisionClient {
    fn ball_position(&self) -> Position {
        self.snapshot.read().ball_position
    }

    fn ball_velocity(&self) -> Velocity {
        self.snapshot.read().ball_velocity
    }

    fn available_players(&self, color: Color) -> Vec<u8> {
        self.team(color).iter().map(|robot| robot.id).collect()
    }

    fn player_position(&self, color: Color, id: u8) -> Position {
        self.find_robot(color, id)
            .map(|robot| robot.position)
            .unwrap_or(Position::invalid())
    }

    fn player_velocity(&self, color: Color, id: u8) -> Velocity {
        self.find_robot(color, id)
            .map(|robot| robot.velocity)
            .unwrap_or(Velocity::zero())
    }

    fn player_orientation(&self, color: Color, id: u8) -> f32 {
        self.find_robot(color, id)
            .map(|robot| robot.orientation)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> VisionMessage {
        VisionMessage {
            ball_position: Position::new(0.1, 0.0),
            ball_velocity: Velocity::zero(),
            blue: vec![RobotObservation {
                id: 0,
                position: Position::new(-0.5, 0.0),
                velocity: Velocity::zero(),
                orientation: 0.0,
            }],
            yellow: vec![],
        }
    }

    #[test]
    fn snapshot_conversion_preserves_observations() {
        let message = sample_message();
        let snapshot: VisionSnapshot = message.clone().into();
        assert_eq!(snapshot.ball_position, message.ball_position);
        assert_eq!(snapshot.blue.len(), 1);
        assert_eq!(snapshot.blue[0].id, 0);
    }
}
