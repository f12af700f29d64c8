// Keyboard teleop: W/S first channel, A/D second channel, R/F deflection, Q quit
//
// Publishes raw stick readings (+/-127) for the runtime's drive profile:
// W/S is left (tank) or forward (arcade, curvature); A/D is right (tank),
// yaw (arcade) or curvature (curvature).
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use skid_steer_runtime::config::TOPIC_CMD_JOYSTICK;
use skid_steer_runtime::messages::JoystickCommand;

const DEFLECTIONS: [f64; 3] = [40.0, 80.0, 127.0];
const INPUT_TIMEOUT_MS: u64 = 100; // Centre the sticks after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publisher = session.declare_publisher(TOPIC_CMD_JOYSTICK).await?;

    info!("Controls: W/S=first, A/D=second, R/F=deflection, Q=quit");
    print_deflection(0);

    enable_raw_mode()?;
    let result = run_teleop(&publisher).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    publisher: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut level: usize = 0;
    let mut cmd = JoystickCommand::default();
    let mut last_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                let deflection = DEFLECTIONS[level];

                match code {
                    KeyCode::Char('w') if pressed => {
                        cmd.first = deflection;
                        last_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        cmd.first = -deflection;
                        last_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        cmd.second = deflection;
                        last_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        cmd.second = -deflection;
                        last_input = Instant::now();
                    }

                    KeyCode::Char('r') if pressed => {
                        level = (level + 1).min(DEFLECTIONS.len() - 1);
                        print_deflection(level);
                    }
                    KeyCode::Char('f') if pressed => {
                        level = level.saturating_sub(1);
                        print_deflection(level);
                    }

                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        if last_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            cmd = JoystickCommand::default();
        }

        // Always publish at ~50Hz so the runtime watchdog stays fed
        publisher.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}

fn print_deflection(level: usize) {
    info!("Deflection: {}", DEFLECTIONS[level]);
}
