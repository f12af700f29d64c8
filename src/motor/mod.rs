// Motor backend for a Feetech-servo skid-steer base
//
// Provides:
// - Feetech STS3215 serial protocol implementation
// - Open-loop drive model and per-side position controllers on that bus

mod driver;
pub mod feetech;

pub use driver::{
    initialize, FeetechSide, FeetechSkidSteer, PositionLoopConfig, PositionTracker, SharedBus,
    SideMotors, MAX_RAW,
};
pub use feetech::{FeetechBus, FeetechError};
