// Curve pairs for each teleop input scheme
//
// Each bundle names the logical channel its two curves shape. The handles
// are fixed once built, the curves behind them stay tunable.

use std::rc::Rc;

use super::{DriveCurve, SharedCurve};

/// Tank: one stick per side
#[derive(Clone)]
pub struct TankCurves {
    pub left: SharedCurve,
    pub right: SharedCurve,
}

impl TankCurves {
    pub fn new(left: SharedCurve, right: SharedCurve) -> Self {
        Self { left, right }
    }

    /// Use the same curve for both sides
    pub fn uniform(curve: SharedCurve) -> Self {
        Self::new(Rc::clone(&curve), curve)
    }

    pub fn shape(&self, left: f64, right: f64) -> (f64, f64) {
        (
            self.left.borrow().calculate(left),
            self.right.borrow().calculate(right),
        )
    }
}

/// Arcade: forward throttle and yaw
#[derive(Clone)]
pub struct ArcadeCurves {
    pub forward: SharedCurve,
    pub yaw: SharedCurve,
}

impl ArcadeCurves {
    pub fn new(forward: SharedCurve, yaw: SharedCurve) -> Self {
        Self { forward, yaw }
    }

    pub fn shape(&self, forward: f64, yaw: f64) -> (f64, f64) {
        (
            self.forward.borrow().calculate(forward),
            self.yaw.borrow().calculate(yaw),
        )
    }
}

/// Curvature: forward throttle and path curvature
#[derive(Clone)]
pub struct CurvatureCurves {
    pub forward: SharedCurve,
    pub curvature: SharedCurve,
}

impl CurvatureCurves {
    pub fn new(forward: SharedCurve, curvature: SharedCurve) -> Self {
        Self { forward, curvature }
    }

    pub fn shape(&self, forward: f64, curvature: f64) -> (f64, f64) {
        (
            self.forward.borrow().calculate(forward),
            self.curvature.borrow().calculate(curvature),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{shared, ExpoCurve};

    #[test]
    fn test_curve_shared_across_bundles() {
        let throttle = shared(ExpoCurve::new(0.0));
        let yaw = shared(ExpoCurve::new(0.0));

        let arcade = ArcadeCurves::new(Rc::clone(&throttle), Rc::clone(&yaw));
        let curvature = CurvatureCurves::new(Rc::clone(&throttle), yaw);

        assert_eq!(arcade.shape(40.0, 40.0), (40.0, 40.0));

        // Retuning the shared throttle curve shows up in both bundles
        throttle.borrow_mut().set_gain(15.0);
        let (arcade_fwd, arcade_yaw) = arcade.shape(40.0, 40.0);
        let (curv_fwd, _) = curvature.shape(40.0, 0.0);
        assert!(arcade_fwd < 40.0);
        assert_eq!(arcade_yaw, 40.0);
        assert_eq!(arcade_fwd, curv_fwd);
        assert_eq!(Rc::strong_count(&throttle), 3);
    }

    #[test]
    fn test_uniform_tank() {
        let tank = TankCurves::uniform(shared(ExpoCurve::new(8.0)));
        assert!(Rc::ptr_eq(&tank.left, &tank.right));
        let (left, right) = tank.shape(60.0, -60.0);
        assert_eq!(left, -right);
    }
}
