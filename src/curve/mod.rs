// Joystick input shaping
//
// A drive curve maps a raw stick reading to a shaped output before it is
// turned into an open-loop drive command. Stick readings use the 8-bit
// convention where +/-127 is full deflection.

pub mod bundle;

use std::cell::RefCell;
use std::rc::Rc;

pub use bundle::{ArcadeCurves, CurvatureCurves, TankCurves};

/// Full-scale stick magnitude
pub const JOYSTICK_FULL_SCALE: f64 = 127.0;

/// A curve instance that may be held by several bundles and retuned
/// from outside while they use it
pub type SharedCurve = Rc<RefCell<dyn DriveCurve>>;

/// Single-input, single-output stick shaping function with a tunable gain
pub trait DriveCurve {
    /// Replace the gain; takes effect on the next `calculate`
    fn set_gain(&mut self, gain: f64);

    fn gain(&self) -> f64;

    /// Shape an uncurved stick reading. Output is not clamped.
    fn calculate(&self, input: f64) -> f64;
}

/// Wrap a curve in a shared handle
pub fn shared<C: DriveCurve + 'static>(curve: C) -> SharedCurve {
    Rc::new(RefCell::new(curve))
}

/// Exponential curve that flattens small deflections as the gain grows
/// while leaving full deflection untouched.
///
/// With gain `g` and input `x`:
/// `(e^(-g/10) + e^((|x| - 127)/10) * (1 - e^(-g/10))) * x`.
/// A gain of zero is a pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExpoCurve {
    gain: f64,
}

impl ExpoCurve {
    pub fn new(gain: f64) -> Self {
        Self { gain }
    }
}

impl DriveCurve for ExpoCurve {
    fn set_gain(&mut self, gain: f64) {
        self.gain = gain;
    }

    fn gain(&self) -> f64 {
        self.gain
    }

    fn calculate(&self, input: f64) -> f64 {
        if self.gain == 0.0 {
            return input;
        }

        let floor = (-self.gain / 10.0).exp();
        let ramp = ((input.abs() - JOYSTICK_FULL_SCALE) / 10.0).exp();
        (floor + ramp * (1.0 - floor)) * input
    }
}
