// Error types shared across the chassis, curve and runtime layers

use std::time::Duration;

use crate::motor::FeetechError;

#[derive(Debug, thiserror::Error)]
pub enum ChassisError {
    #[error("Invalid chassis geometry: {field} must be finite and positive, got {value}")]
    InvalidGeometry { field: &'static str, value: f64 },

    #[error("Invalid gearset ratio: {0}")]
    InvalidRatio(f64),

    #[error("Drive side has no motors")]
    EmptySide,

    #[error("Motor bus error: {0}")]
    Bus(#[from] FeetechError),

    #[error("Chassis did not settle within {0:?}")]
    SettleTimeout(Duration),
}

pub type Result<T> = std::result::Result<T, ChassisError>;
