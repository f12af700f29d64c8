// Position controller capability consumed by the chassis coordinator

use std::time::Duration;

use crate::error::Result;

/// A closed-loop position controller for one side of the drive.
///
/// The controller runs its own feedback loop; the coordinator only writes the
/// target and toggles it on and off. A disabled controller stops correcting
/// but keeps its last target readable.
pub trait AsyncPositionController {
    /// Set the position to hold, in raw ticks
    fn set_target(&mut self, target: f64) -> Result<()>;

    fn target(&self) -> f64;

    fn set_enabled(&mut self, enabled: bool) -> Result<()>;

    fn is_disabled(&self) -> bool;

    /// Whether the loop is within tolerance of its target, read fresh on every call
    fn is_settled(&mut self) -> Result<bool>;

    /// Zero the position reference so the next target is relative to here
    fn reset(&mut self) -> Result<()>;

    fn set_max_velocity(&mut self, max_velocity: f64) -> Result<()>;

    fn max_velocity(&self) -> f64;

    /// Advance the feedback loop by one control tick. Controllers whose loop
    /// runs elsewhere (on the motor itself) leave this as a no-op.
    fn step(&mut self, _dt: Duration) -> Result<()> {
        Ok(())
    }
}
