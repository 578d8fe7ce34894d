//! The on-screen display: an external collaborator (spec.md §1),
//! specified only by the interface it consumes (spec.md §6's
//! "Outbound display events"). Provides the event type, the channel
//! the core publishes through, and a tracing-based default sink so the
//! service has somewhere to route events when no richer display is
//! wired in.

use std::sync::mpsc::{channel, Receiver, Sender};

use tokio_util::sync::CancellationToken;
use tracing::info;
use vss_messages::{Color, Foul, Half, Quadrant};

/// A single notification routed to the display (spec.md §6: `takeFoul`,
/// `takeTimeStamp`, `addGoal`; §4.4's `emitSuggestion`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DisplayEvent {
    Foul {
        foul: Foul,
        color: Color,
        quadrant: Quadrant,
    },
    TimeStamp {
        timestamp_s: f32,
        half: Half,
    },
    Goal {
        color: Color,
    },
    Suggestion {
        possible_goal: bool,
        possible_goal_kick: bool,
        possible_penalty: bool,
    },
}

pub fn display_channel() -> (Sender<DisplayEvent>, Receiver<DisplayEvent>) {
    channel()
}

/// Consumes [`DisplayEvent`]s. External implementations (a scoreboard
/// UI, a match logger) plug in here; [`TracingDisplaySink`] is the
/// default.
pub trait DisplaySink: Send + Sync {
    fn handle(&self, event: DisplayEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDisplaySink;

impl DisplaySink for TracingDisplaySink {
    fn handle(&self, event: DisplayEvent) {
        match event {
            DisplayEvent::Foul {
                foul,
                color,
                quadrant,
            } => info!(?foul, ?color, ?quadrant, "display: foul"),
            DisplayEvent::TimeStamp { timestamp_s, half } => {
                info!(timestamp_s, ?half, "display: timestamp")
            }
            DisplayEvent::Goal { color } => info!(?color, "display: goal"),
            DisplayEvent::Suggestion {
                possible_goal,
                possible_goal_kick,
                possible_penalty,
            } => info!(
                possible_goal,
                possible_goal_kick, possible_penalty, "display: suggestion"
            ),
        }
    }
}

/// Runs a sink against a channel of events until cancelled, the way
/// the Display runs on its own task and receives events by message
/// (spec.md §5).
pub async fn run_display_task(
    receiver: std::sync::mpsc::Receiver<DisplayEvent>,
    sink: std::sync::Arc<dyn DisplaySink>,
    cancellation: CancellationToken,
) {
    loop {
        if cancellation.is_cancelled() {
            return;
        }
        match receiver.try_recv() {
            Ok(event) => sink.handle(event),
            Err(std::sync::mpsc::TryRecvError::Empty) => {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
            Err(std::sync::mpsc::TryRecvError::Disconnected) => return,
        }
    }
}
