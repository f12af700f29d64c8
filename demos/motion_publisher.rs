// Publish one autonomous motion request to the runtime
//
// Usage: cargo run --example motion_publisher -- move 0.5
//        cargo run --example motion_publisher -- turn 90
//        cargo run --example motion_publisher -- stop
use clap::{Parser, Subcommand};
use tracing::info;

use skid_steer_runtime::config::TOPIC_CMD_MOTION;
use skid_steer_runtime::messages::MotionCommand;

#[derive(Parser)]
#[command(about = "Send a motion command to the chassis runtime")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive straight, metres (or encoder ticks with --raw)
    Move {
        #[arg(allow_hyphen_values = true)]
        value: f64,
        #[arg(long)]
        raw: bool,
    },
    /// Turn in place, degrees (or encoder ticks with --raw)
    Turn {
        #[arg(allow_hyphen_values = true)]
        value: f64,
        #[arg(long)]
        raw: bool,
    },
    /// Cancel any motion and stop the drive
    Stop,
    /// Change the max velocity, steps/s
    MaxVelocity { velocity: f64 },
    /// Mirror subsequent turns
    Mirror {
        #[arg(action = clap::ArgAction::Set)]
        mirrored: bool,
    },
}

impl From<Command> for MotionCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Move { value, raw: true } => MotionCommand::MoveRaw { ticks: value },
            Command::Move { value, raw: false } => MotionCommand::MoveDistance { meters: value },
            Command::Turn { value, raw: true } => MotionCommand::TurnRaw { ticks: value },
            Command::Turn { value, raw: false } => MotionCommand::TurnAngle { degrees: value },
            Command::Stop => MotionCommand::Stop,
            Command::MaxVelocity { velocity } => MotionCommand::SetMaxVelocity { velocity },
            Command::Mirror { mirrored } => MotionCommand::SetTurnsMirrored { mirrored },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cmd = MotionCommand::from(Cli::parse().command);

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_MOTION).await?;

    info!("Publishing {:?} to {}", cmd, TOPIC_CMD_MOTION);
    publisher.put(serde_json::to_string(&cmd)?).await?;
    session.close().await?;
    Ok(())
}
