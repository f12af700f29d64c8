// Feetech-backed skid-steer drive
//
// The servos run in wheel mode. Open-loop commands scale to a raw velocity
// limit; the position controllers unwrap the encoder into a multi-turn
// count and close a proportional loop on it every control tick.

use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info, warn};

use super::feetech::{FeetechBus, FeetechError, OperatingMode, Register};
use crate::chassis::{AsyncPositionController, ChassisModel};
use crate::error::{ChassisError, Result};

/// Encoder steps per revolution
const STEPS_PER_REVOLUTION: i32 = 4096;

/// Maximum raw velocity command (safety limit), steps/s
pub const MAX_RAW: i16 = 3000;

pub type SharedBus<P = Box<dyn SerialPort>> = Rc<RefCell<FeetechBus<P>>>;

/// Motor ids and mounting of one drive side
#[derive(Debug, Clone)]
pub struct SideMotors {
    pub ids: Vec<u8>,
    /// Mirrored mounting: forward for the chassis is reverse for the motor
    pub reversed: bool,
}

impl SideMotors {
    pub fn new(ids: Vec<u8>, reversed: bool) -> Self {
        Self { ids, reversed }
    }

    fn sign(&self) -> f64 {
        if self.reversed { -1.0 } else { 1.0 }
    }

    fn write_velocity<P: Read + Write>(&self, bus: &SharedBus<P>, velocity: f64) -> Result<()> {
        let raw = to_raw_velocity(velocity * self.sign());
        let data: Vec<(u8, i16)> = self.ids.iter().map(|&id| (id, raw)).collect();
        bus.borrow_mut()
            .sync_write_i16(Register::GoalVelocity, &data)?;
        Ok(())
    }
}

fn to_raw_velocity(velocity: f64) -> i16 {
    velocity
        .round()
        .clamp(-(MAX_RAW as f64), MAX_RAW as f64) as i16
}

/// Ping every motor and put it in wheel mode with torque on
pub fn initialize(bus: &SharedBus, sides: [&SideMotors; 2]) -> Result<()> {
    let ids: Vec<u8> = sides.iter().flat_map(|s| s.ids.iter().copied()).collect();
    info!("Initializing motors {:?} for velocity control", ids);
    let mut bus = bus.borrow_mut();

    for &id in &ids {
        if !bus.ping(id)? {
            warn!("Motor {} not responding to ping", id);
            return Err(FeetechError::Timeout { id }.into());
        }
        debug!("Motor {} responding", id);
    }

    // Mode changes need torque off
    for &id in &ids {
        bus.disable_torque(id)?;
        bus.set_operating_mode(id, OperatingMode::Velocity)?;
        bus.enable_torque(id)?;
    }

    info!("Motors initialized successfully");
    Ok(())
}

/// Open-loop drive over both sides
pub struct FeetechSkidSteer {
    bus: SharedBus,
    left: SideMotors,
    right: SideMotors,
    max_velocity: f64,
}

impl FeetechSkidSteer {
    pub fn new(bus: SharedBus, left: SideMotors, right: SideMotors, max_velocity: f64) -> Self {
        Self {
            bus,
            left,
            right,
            max_velocity,
        }
    }

    /// Release both sides so the robot can be pushed by hand
    pub fn disable_torque(&mut self) -> Result<()> {
        info!("Disabling torque on drive motors");
        let mut bus = self.bus.borrow_mut();
        for &id in self.left.ids.iter().chain(&self.right.ids) {
            bus.disable_torque(id)?;
        }
        Ok(())
    }
}

impl ChassisModel for FeetechSkidSteer {
    fn tank(&mut self, left: f64, right: f64) -> Result<()> {
        let left = left.clamp(-1.0, 1.0) * self.max_velocity;
        let right = right.clamp(-1.0, 1.0) * self.max_velocity;
        debug!("Open-loop velocities: left={:.0}, right={:.0}", left, right);
        self.left.write_velocity(&self.bus, left)?;
        self.right.write_velocity(&self.bus, right)
    }

    fn stop(&mut self) -> Result<()> {
        debug!("Stopping drive motors");
        self.tank(0.0, 0.0)
    }

    fn set_max_velocity(&mut self, max_velocity: f64) -> Result<()> {
        self.max_velocity = max_velocity;
        Ok(())
    }

    fn max_velocity(&self) -> f64 {
        self.max_velocity
    }
}

impl Drop for FeetechSkidSteer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}

/// Accumulates a wrapping single-turn encoder into a multi-turn count.
/// Readings must arrive often enough that the wheel turns less than half a
/// revolution between them.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    last_raw: Option<u16>,
    position: i64,
}

impl PositionTracker {
    pub fn update(&mut self, raw: u16) -> i64 {
        match self.last_raw {
            None => self.position = raw as i64,
            Some(last) => {
                let mut delta = raw as i32 - last as i32;
                if delta > STEPS_PER_REVOLUTION / 2 {
                    delta -= STEPS_PER_REVOLUTION;
                } else if delta < -STEPS_PER_REVOLUTION / 2 {
                    delta += STEPS_PER_REVOLUTION;
                }
                self.position += delta as i64;
            }
        }
        self.last_raw = Some(raw);
        self.position
    }

    pub fn position(&self) -> i64 {
        self.position
    }
}

/// Tuning for the per-side position loop
#[derive(Debug, Clone, Copy)]
pub struct PositionLoopConfig {
    /// Velocity command per step of error, 1/s
    pub kp: f64,
    /// Steps of error counted as settled
    pub tolerance: f64,
    /// Velocity ceiling, steps/s
    pub max_velocity: f64,
}

/// Position controller for one side, measured on the side's first motor
pub struct FeetechSide<P = Box<dyn SerialPort>> {
    bus: SharedBus<P>,
    motors: SideMotors,
    tracker: PositionTracker,
    config: PositionLoopConfig,
    origin: f64,
    target: f64,
    enabled: bool,
}

impl<P: Read + Write> FeetechSide<P> {
    pub fn new(bus: SharedBus<P>, motors: SideMotors, config: PositionLoopConfig) -> Self {
        Self {
            bus,
            motors,
            tracker: PositionTracker::default(),
            config,
            origin: 0.0,
            target: 0.0,
            enabled: false,
        }
    }

    /// Read the encoder and return the position relative to the last reset,
    /// positive in the chassis' forward direction
    pub fn read_position(&mut self) -> Result<f64> {
        let &encoder_id = self.motors.ids.first().ok_or(ChassisError::EmptySide)?;
        let raw = self.bus.borrow_mut().get_position(encoder_id)?;
        let absolute = self.tracker.update(raw) as f64 * self.motors.sign();
        Ok(absolute - self.origin)
    }

    fn error(&mut self) -> Result<f64> {
        Ok(self.target - self.read_position()?)
    }
}

impl<P: Read + Write> AsyncPositionController for FeetechSide<P> {
    fn set_target(&mut self, target: f64) -> Result<()> {
        self.target = target;
        Ok(())
    }

    fn target(&self) -> f64 {
        self.target
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        if self.enabled && !enabled {
            self.motors.write_velocity(&self.bus, 0.0)?;
        }
        self.enabled = enabled;
        Ok(())
    }

    fn is_disabled(&self) -> bool {
        !self.enabled
    }

    fn is_settled(&mut self) -> Result<bool> {
        Ok(self.error()?.abs() <= self.config.tolerance)
    }

    fn reset(&mut self) -> Result<()> {
        let current = self.read_position()?;
        self.origin += current;
        Ok(())
    }

    fn set_max_velocity(&mut self, max_velocity: f64) -> Result<()> {
        self.config.max_velocity = max_velocity;
        Ok(())
    }

    fn max_velocity(&self) -> f64 {
        self.config.max_velocity
    }

    fn step(&mut self, _dt: Duration) -> Result<()> {
        if !self.enabled {
            // Keep the tracker fed while the wheels turn open-loop
            self.read_position()?;
            return Ok(());
        }
        let limit = self.config.max_velocity;
        let velocity = (self.config.kp * self.error()?).clamp(-limit, limit);
        self.motors.write_velocity(&self.bus, velocity)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Serial stand-in: replays canned status packets, logs what was sent
    struct ScriptedPort {
        rx: Cursor<Vec<u8>>,
        tx: Rc<RefCell<Vec<u8>>>,
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.rx.read(buf)
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.tx.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Present-position status packets for motor `id`, one per reading
    fn position_replies(id: u8, readings: &[u16]) -> Vec<u8> {
        let mut replies = Vec::new();
        for &raw in readings {
            let [lo, hi] = raw.to_le_bytes();
            let body = [id, 4, 0, lo, hi];
            let sum: u16 = body.iter().map(|&b| b as u16).sum();
            replies.extend_from_slice(&[0xFF, 0xFF]);
            replies.extend_from_slice(&body);
            replies.push((!sum & 0xFF) as u8);
        }
        replies
    }

    fn scripted_side(readings: &[u16]) -> (FeetechSide<ScriptedPort>, Rc<RefCell<Vec<u8>>>) {
        let tx = Rc::new(RefCell::new(Vec::new()));
        let port = ScriptedPort {
            rx: Cursor::new(position_replies(7, readings)),
            tx: Rc::clone(&tx),
        };
        let bus = Rc::new(RefCell::new(FeetechBus::with_port(port)));
        let config = PositionLoopConfig {
            kp: 4.0,
            tolerance: 20.0,
            max_velocity: 1000.0,
        };
        (FeetechSide::new(bus, SideMotors::new(vec![7], false), config), tx)
    }

    #[test]
    fn test_disabled_side_tracks_open_loop_travel() {
        // Almost a full revolution, sampled once per tick while disabled
        let (mut side, tx) = scripted_side(&[100, 1100, 2100, 3100, 4000]);
        side.reset().unwrap();
        side.set_target(3900.0).unwrap();
        assert!(side.is_disabled());

        for _ in 0..3 {
            side.step(Duration::from_millis(20)).unwrap();
        }
        assert!(side.is_settled().unwrap());

        // Five position reads of 8 bytes each, no velocity writes
        assert_eq!(tx.borrow().len(), 5 * 8);
    }

    #[test]
    fn test_enabled_side_commands_velocity() {
        let (mut side, tx) = scripted_side(&[0, 0]);
        side.reset().unwrap();
        side.set_target(100.0).unwrap();
        side.set_enabled(true).unwrap();
        side.step(Duration::from_millis(20)).unwrap();

        // Read, read, then a sync write of kp * 100 = 400 to motor 7
        let sent = tx.borrow();
        let write = &sent[16..];
        assert_eq!(&write[..5], &[0xFF, 0xFF, 0xFE, 7, 0x83]);
        assert_eq!(&write[5..10], &[Register::GoalVelocity as u8, 2, 7, 0x90, 0x01]);
    }

    #[test]
    fn test_tracker_unwraps_forward() {
        let mut tracker = PositionTracker::default();
        assert_eq!(tracker.update(4000), 4000);
        assert_eq!(tracker.update(50), 4146);
        assert_eq!(tracker.update(1000), 5096);
    }

    #[test]
    fn test_tracker_unwraps_backward() {
        let mut tracker = PositionTracker::default();
        tracker.update(100);
        assert_eq!(tracker.update(4000), 100 - 196);
        assert_eq!(tracker.update(3000), -1096);
        assert_eq!(tracker.position(), -1096);
    }

    #[test]
    fn test_raw_velocity_clamped() {
        assert_eq!(to_raw_velocity(0.0), 0);
        assert_eq!(to_raw_velocity(-120.4), -120);
        assert_eq!(to_raw_velocity(1e6), MAX_RAW);
        assert_eq!(to_raw_velocity(-1e6), -MAX_RAW);
    }

    #[test]
    fn test_reversed_side_sign() {
        assert_eq!(SideMotors::new(vec![7], false).sign(), 1.0);
        assert_eq!(SideMotors::new(vec![9], true).sign(), -1.0);
    }
}
