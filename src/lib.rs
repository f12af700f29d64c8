//! Skid-steer chassis runtime.
//!
//! Coordinates closed-loop moves and turns of a two-sided drive, shapes
//! operator stick input for open-loop driving, and runs both over zenoh.

pub mod chassis;
pub mod config;
pub mod curve;
pub mod error;
pub mod messages;
pub mod motor;
pub mod runtime;
pub mod sim;
pub mod units;

pub use error::{ChassisError, Result};
