// Chassis motion coordinator
//
// Turns move/turn requests into per-side position targets, drives the two
// side controllers through idle -> moving -> settled -> idle, and stops the
// open-loop model once both sides settle.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::controller::AsyncPositionController;
use super::model::ChassisModel;
use super::scales::{AngleTarget, ChassisScales, DistanceTarget, GearsetRatioPair};
use super::time::Delay;
use crate::error::{ChassisError, Result};

/// Default period between settle polls
pub const DEFAULT_SETTLE_PERIOD: Duration = Duration::from_millis(10);

/// Coordinates a left and right position controller over a skid-steer model.
///
/// There is no request queue: each new move or turn replaces both side
/// targets. Single writer only; wrap externally if several callers share it.
pub struct ChassisController<C, M, D> {
    left: C,
    right: C,
    model: M,
    delay: D,
    gearset: GearsetRatioPair,
    scales: ChassisScales,
    mirror_turns: bool,
    settle_period: Duration,
}

impl<C, M, D> ChassisController<C, M, D>
where
    C: AsyncPositionController,
    M: ChassisModel,
    D: Delay,
{
    pub fn new(
        left: C,
        right: C,
        model: M,
        delay: D,
        gearset: GearsetRatioPair,
        scales: ChassisScales,
    ) -> Self {
        Self {
            left,
            right,
            model,
            delay,
            gearset,
            scales,
            mirror_turns: false,
            settle_period: DEFAULT_SETTLE_PERIOD,
        }
    }

    pub fn with_settle_period(mut self, period: Duration) -> Self {
        self.settle_period = period;
        self
    }

    /// Drive straight and block until both sides settle
    pub fn move_distance(&mut self, distance: impl Into<DistanceTarget>) -> Result<()> {
        self.move_distance_async(distance)?;
        self.wait_until_settled()
    }

    /// Start a straight drive and return with both controllers enabled
    pub fn move_distance_async(&mut self, distance: impl Into<DistanceTarget>) -> Result<()> {
        let distance = distance.into();
        let ticks = distance.to_ticks(&self.scales);
        info!("Move {:?} -> {:.1} ticks per side", distance, ticks);
        self.set_targets(ticks, ticks)
    }

    /// Turn in place and block until both sides settle
    pub fn turn_angle(&mut self, angle: impl Into<AngleTarget>) -> Result<()> {
        self.turn_angle_async(angle)?;
        self.wait_until_settled()
    }

    /// Start a turn in place and return with both controllers enabled
    pub fn turn_angle_async(&mut self, angle: impl Into<AngleTarget>) -> Result<()> {
        let angle = angle.into();
        let ticks = angle.to_ticks(&self.scales);
        let (left, right) = if self.mirror_turns {
            (-ticks, ticks)
        } else {
            (ticks, -ticks)
        };
        info!(
            "Turn {:?} -> left {:.1}, right {:.1} ticks (mirrored: {})",
            angle, left, right, self.mirror_turns
        );
        self.set_targets(left, right)
    }

    /// Disable both controllers and zero the drive, whatever the current state
    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping chassis");
        let left = self.left.set_enabled(false);
        let right = self.right.set_enabled(false);
        let model = self.model.stop();
        left.and(right).and(model)
    }

    /// Whether both sides report settled right now
    pub fn is_settled(&mut self) -> Result<bool> {
        let left = self.left.is_settled()?;
        let right = self.right.is_settled()?;
        Ok(left && right)
    }

    /// Poll the settled state once; stops the chassis and returns true when
    /// both sides have settled
    pub fn poll_settled(&mut self) -> Result<bool> {
        if self.is_settled()? {
            debug!("Both sides settled");
            self.stop()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Block until both sides settle, then stop. Never times out.
    ///
    /// A side knocked off its target after an earlier settle is driven back
    /// to that same target before this returns.
    pub fn wait_until_settled(&mut self) -> Result<()> {
        while !self.poll_settled()? {
            self.wait_one_period()?;
        }
        Ok(())
    }

    /// Like `wait_until_settled`, but gives up after `limit` of accumulated
    /// poll delay. The chassis is stopped either way.
    pub fn wait_until_settled_timeout(&mut self, limit: Duration) -> Result<()> {
        let mut waited = Duration::ZERO;
        while !self.poll_settled()? {
            if waited >= limit {
                warn!("Chassis not settled after {:?}, stopping", waited);
                self.stop()?;
                return Err(ChassisError::SettleTimeout(limit));
            }
            self.wait_one_period()?;
            waited += self.settle_period;
        }
        Ok(())
    }

    /// One unsettled period of a blocking wait: re-engage any disabled side
    /// on its current target (no reset), sleep, then run the feedback loops
    fn wait_one_period(&mut self) -> Result<()> {
        if self.left.is_disabled() || self.right.is_disabled() {
            info!("Chassis off target while idle, re-engaging controllers");
            self.left.set_enabled(true)?;
            self.right.set_enabled(true)?;
        }
        self.delay.delay(self.settle_period);
        self.step(self.settle_period)
    }

    /// Apply a new max velocity to both controllers and the model
    pub fn set_max_velocity(&mut self, max_velocity: f64) -> Result<()> {
        info!("Setting max velocity to {}", max_velocity);
        self.left.set_max_velocity(max_velocity)?;
        self.right.set_max_velocity(max_velocity)?;
        self.model.set_max_velocity(max_velocity)
    }

    /// Swap which side receives the positive target on later turns
    pub fn set_turns_mirrored(&mut self, mirrored: bool) {
        self.mirror_turns = mirrored;
    }

    pub fn turns_mirrored(&self) -> bool {
        self.mirror_turns
    }

    pub fn gearset_ratio_pair(&self) -> GearsetRatioPair {
        self.gearset
    }

    pub fn scales(&self) -> &ChassisScales {
        &self.scales
    }

    /// Advance both controllers' feedback loops by one control tick
    pub fn step(&mut self, dt: Duration) -> Result<()> {
        self.left.step(dt)?;
        self.right.step(dt)
    }

    pub fn left_controller(&self) -> &C {
        &self.left
    }

    pub fn right_controller(&self) -> &C {
        &self.right
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Open-loop access for teleop. Callers must not mix this with an
    /// outstanding async motion.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Both sides are configured before either is enabled; on failure the
    /// chassis is stopped so no side keeps chasing a stale target.
    fn set_targets(&mut self, left: f64, right: f64) -> Result<()> {
        if let Err(e) = self.apply_targets(left, right) {
            warn!("Failed to apply targets ({}), stopping chassis", e);
            if let Err(stop_err) = self.stop() {
                warn!("Failed to stop chassis: {}", stop_err);
            }
            return Err(e);
        }
        Ok(())
    }

    fn apply_targets(&mut self, left: f64, right: f64) -> Result<()> {
        self.left.reset()?;
        self.right.reset()?;
        self.left.set_target(left)?;
        self.right.set_target(right)?;
        self.left.set_enabled(true)?;
        self.right.set_enabled(true)
    }
}
