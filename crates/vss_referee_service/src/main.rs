//! Process entry point: wires Vision, the Referee Engine, the
//! Replacer Engine and Display together and drives them at
//! `threadFrequency` (spec.md §5). Grounded on
//! `communication::server::runtime::Runtime::start`'s
//! cancellation-token-driven task wiring, simplified to a single
//! async main since the whole service is one Tokio runtime.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vss_config::Config;
use vss_display::{display_channel, run_display_task, TracingDisplaySink};
use vss_messages::{PenaltyInfoHandle, TeamsPlacedSignal};
use vss_referee::RefereeEngine;
use vss_replacer::{GoalieRegistry, Replacer};
use vss_vision::UdpVisionClient;

#[derive(Debug, Parser)]
#[command(name = "vss_referee", about = "VSSS referee and placement engine")]
struct Cli {
    /// Path to vss_referee.toml. Falls back to searching ancestor
    /// directories, then the VSS_REFEREE_CONFIG environment variable.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tracing filter directive, e.g. "info" or "vss_referee=debug".
    #[arg(long, default_value = "info", env = "VSS_REFEREE_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_level))
        .init();

    let config = Arc::new(Config::load(cli.config.as_deref())?);

    let cancellation = CancellationToken::new();
    let ctrlc_cancellation = cancellation.clone();
    ctrlc::set_handler(move || {
        info!("shutdown requested");
        ctrlc_cancellation.cancel();
    })?;

    let vision = UdpVisionClient::start(
        &config.vision_endpoint.address,
        config.vision_endpoint.port,
        cancellation.clone(),
    )
    .await?;

    let penalty_info = PenaltyInfoHandle::new();
    let teams_placed = TeamsPlacedSignal::new();
    let (display_sender, display_receiver) = display_channel();
    let (foul_sender, foul_receiver) = tokio::sync::mpsc::unbounded_channel();

    let mut referee = RefereeEngine::start(
        config.clone(),
        vision.clone(),
        penalty_info,
        teams_placed.clone(),
        display_sender,
        foul_sender,
    )
    .await?;

    let mut replacer = Replacer::start(
        config.clone(),
        vision.clone(),
        GoalieRegistry::new(),
        foul_receiver,
        teams_placed,
    )
    .await?;

    let display_cancellation = cancellation.clone();
    let display_task = tokio::spawn(run_display_task(
        display_receiver,
        Arc::new(TracingDisplaySink),
        display_cancellation,
    ));

    let tick_period = Duration::from_secs_f32(1.0 / config.thread_frequency_hz);
    let mut ticker = tokio::time::interval(tick_period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(hz = config.thread_frequency_hz, "entering tick loop");
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => break,
            _ = ticker.tick() => {
                referee.tick().await;
                replacer.tick().await;
            }
        }
    }

    if let Err(error) = display_task.await {
        error!(%error, "display task panicked");
    }

    info!("shut down cleanly");
    Ok(())
}
