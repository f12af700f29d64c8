// Define message types for the runtime

use serde::{Deserialize, Serialize};

// Raw stick input from teleop -> runtime, +/-127 at full deflection.
// Channel meaning follows the drive profile: left/right (tank),
// forward/yaw (arcade) or forward/curvature (curvature).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct JoystickCommand {
    pub first: f64,
    pub second: f64,
}

// Autonomous request from scripts -> runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MotionCommand {
    MoveDistance { meters: f64 },
    MoveRaw { ticks: f64 },
    TurnAngle { degrees: f64 },
    TurnRaw { ticks: f64 },
    Stop,
    SetMaxVelocity { velocity: f64 },
    SetTurnsMirrored { mirrored: bool },
}

// Open-loop actuation from runtime -> telemetry, fractions of full power
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct DriveActuation {
    pub left: f64,
    pub right: f64,
}

/// Which path currently owns the drive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    Idle,
    Teleop,
    Autonomous,
}

/// Coordinator state published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChassisState {
    pub mode: ControlMode,
    pub left_target: f64,
    pub right_target: f64,
    pub enabled: bool,
    pub turns_mirrored: bool,
    pub max_velocity: f64,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    Fault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_command_wire_format() {
        let cmd: MotionCommand =
            serde_json::from_str(r#"{"type":"turn_angle","degrees":90.0}"#).unwrap();
        assert_eq!(cmd, MotionCommand::TurnAngle { degrees: 90.0 });

        let stop: MotionCommand = serde_json::from_str(r#"{"type":"stop"}"#).unwrap();
        assert_eq!(stop, MotionCommand::Stop);
    }

    #[test]
    fn test_health_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RuntimeHealth::CmdStale).unwrap(),
            r#""cmd_stale""#
        );
    }
}
