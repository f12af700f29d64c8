// Skid-steer chassis control
//
// Provides:
// - Unit conversion from physical requests to encoder ticks
// - The position controller and open-loop model capabilities
// - The motion coordinator (move/turn, settle, stop)
// - The teleop pipeline (curves -> open-loop commands)

pub mod controller;
pub mod coordinator;
pub mod model;
pub mod scales;
pub mod teleop;
pub mod time;

pub use controller::AsyncPositionController;
pub use coordinator::{ChassisController, DEFAULT_SETTLE_PERIOD};
pub use model::ChassisModel;
pub use scales::{
    gearset_to_tpr, AngleTarget, ChassisScales, DistanceTarget, Gearset, GearsetRatioPair,
};
pub use teleop::{DriveProfile, ProfileKind};
pub use time::{Delay, ThreadDelay};
