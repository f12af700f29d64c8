// Timeouts, topics, chassis geometry and motor configuration
use std::time::Duration;

use clap::Parser;

use crate::chassis::ProfileKind;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Joystick watchdog: stop the drive when teleop input goes quiet
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Stick deflection (of +/-127) that counts as the operator taking over
// from an autonomous motion; centred sticks keep the watchdog fed only
pub const TELEOP_TAKEOVER_DEADBAND: f64 = 8.0;

// Zenoh topics
pub const TOPIC_CMD_JOYSTICK: &str = "chassis/cmd/joystick"; // raw stick input
pub const TOPIC_CMD_MOTION: &str = "chassis/cmd/motion"; // autonomous requests
pub const TOPIC_RT_DRIVE: &str = "chassis/rt/drive"; // open-loop actuation
pub const TOPIC_HEALTH: &str = "chassis/state/health"; // health status
pub const TOPIC_STATE: &str = "chassis/state/motion"; // coordinator state

// Serial port for the Feetech motor controller
pub const MOTOR_PORT: &str = "/dev/ttyUSB0";

// Drive motors, first id of each side carries the encoder
pub const LEFT_MOTOR_IDS: [u8; 2] = [1, 2];
pub const RIGHT_MOTOR_IDS: [u8; 2] = [3, 4];

// Enable hardware motor control (set to false for simulation/testing)
pub const MOTOR_ENABLED: bool = true;

// Chassis geometry, metres
pub const WHEEL_DIAMETER_M: f64 = 0.1;
pub const WHEEL_TRACK_M: f64 = 0.28;

// External gear ratio between servo and wheel
pub const GEAR_RATIO: f64 = 1.0;

// Default max velocity, encoder steps/s
pub const MAX_VELOCITY: f64 = 2400.0;

// Position loop tuning
pub const POSITION_KP: f64 = 4.0;
pub const SETTLE_TOLERANCE: f64 = 20.0;

// Default exponential curve gain applied to both stick channels
pub const CURVE_GAIN: f64 = 0.0;

/// Command-line overrides for the runtime defaults
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Skid-steer chassis runtime")]
pub struct Args {
    /// Serial port of the motor bus
    #[arg(long, default_value = MOTOR_PORT)]
    pub port: String,

    /// Run against the simulated drive instead of hardware
    #[arg(long, default_value_t = !MOTOR_ENABLED)]
    pub sim: bool,

    /// Control loop frequency
    #[arg(long, default_value_t = LOOP_HZ)]
    pub loop_hz: u64,

    /// Teleop input scheme: tank, arcade or curvature
    #[arg(long, default_value = "arcade")]
    pub profile: ProfileKind,

    /// Exponential curve gain for both stick channels
    #[arg(long, default_value_t = CURVE_GAIN)]
    pub gain: f64,

    /// Max velocity for open-loop and closed-loop driving, steps/s
    #[arg(long, default_value_t = MAX_VELOCITY)]
    pub max_velocity: f64,

    /// Swap turn direction for mirrored autonomous routines
    #[arg(long)]
    pub mirror_turns: bool,
}

impl Args {
    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(1000 / self.loop_hz.max(1))
    }
}
