// Simulated skid-steer drive for running without hardware
//
// Each side is a point on a line: an enabled controller slews it toward its
// target at the max velocity, otherwise it integrates the open-loop command.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::chassis::{AsyncPositionController, ChassisModel, Delay};
use crate::error::Result;

#[derive(Debug)]
struct SideState {
    position: f64,
    origin: f64,
    target: f64,
    enabled: bool,
    max_velocity: f64,
    open_loop_velocity: f64,
    tolerance: f64,
}

impl SideState {
    fn advance(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        if self.enabled {
            let error = self.origin + self.target - self.position;
            let max_step = self.max_velocity * dt;
            self.position += error.clamp(-max_step, max_step);
        } else {
            self.position += self.open_loop_velocity * dt;
        }
    }

    fn relative_position(&self) -> f64 {
        self.position - self.origin
    }
}

type Side = Rc<RefCell<SideState>>;

/// Build the left controller, right controller, open-loop model and clock
/// of one simulated chassis. Velocities are in ticks per second.
pub fn simulated_chassis(
    max_velocity: f64,
    tolerance: f64,
) -> (SimController, SimController, SimModel, SimClock) {
    let side = || {
        Rc::new(RefCell::new(SideState {
            position: 0.0,
            origin: 0.0,
            target: 0.0,
            enabled: false,
            max_velocity,
            open_loop_velocity: 0.0,
            tolerance,
        }))
    };
    let left = side();
    let right = side();

    (
        SimController {
            side: Rc::clone(&left),
        },
        SimController {
            side: Rc::clone(&right),
        },
        SimModel {
            left: Rc::clone(&left),
            right: Rc::clone(&right),
            max_velocity,
        },
        SimClock,
    )
}

/// Position controller for one simulated side
pub struct SimController {
    side: Side,
}

impl SimController {
    /// Position relative to the last reset
    pub fn position(&self) -> f64 {
        self.side.borrow().relative_position()
    }

    /// Displace the side as if the robot were pushed
    pub fn push(&self, delta: f64) {
        debug!("Simulated push of {} ticks", delta);
        self.side.borrow_mut().position += delta;
    }
}

impl AsyncPositionController for SimController {
    fn set_target(&mut self, target: f64) -> Result<()> {
        self.side.borrow_mut().target = target;
        Ok(())
    }

    fn target(&self) -> f64 {
        self.side.borrow().target
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.side.borrow_mut().enabled = enabled;
        Ok(())
    }

    fn is_disabled(&self) -> bool {
        !self.side.borrow().enabled
    }

    fn is_settled(&mut self) -> Result<bool> {
        let side = self.side.borrow();
        Ok((side.relative_position() - side.target).abs() <= side.tolerance)
    }

    fn reset(&mut self) -> Result<()> {
        let mut side = self.side.borrow_mut();
        side.origin = side.position;
        Ok(())
    }

    fn set_max_velocity(&mut self, max_velocity: f64) -> Result<()> {
        self.side.borrow_mut().max_velocity = max_velocity;
        Ok(())
    }

    fn max_velocity(&self) -> f64 {
        self.side.borrow().max_velocity
    }

    fn step(&mut self, dt: Duration) -> Result<()> {
        self.side.borrow_mut().advance(dt);
        Ok(())
    }
}

/// Open-loop drive over both simulated sides
pub struct SimModel {
    left: Side,
    right: Side,
    max_velocity: f64,
}

impl ChassisModel for SimModel {
    fn tank(&mut self, left: f64, right: f64) -> Result<()> {
        self.left.borrow_mut().open_loop_velocity = left.clamp(-1.0, 1.0) * self.max_velocity;
        self.right.borrow_mut().open_loop_velocity = right.clamp(-1.0, 1.0) * self.max_velocity;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
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

/// Delay that returns immediately, so blocking waits run at simulation
/// speed. Simulated time passes when the coordinator steps the controllers.
#[derive(Debug, Default)]
pub struct SimClock;

impl Delay for SimClock {
    fn delay(&mut self, _period: Duration) {}
}
