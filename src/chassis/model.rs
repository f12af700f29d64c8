// Open-loop drive primitive
//
// Outputs are fractions of full power in [-1, 1] per side. Arcade and
// curvature mixing are expressed in terms of `tank`, so a backend only has
// to drive two sides.

use crate::error::Result;

/// Below this throttle magnitude curvature drive turns in place
pub const DEFAULT_CURVATURE_THRESHOLD: f64 = 0.0;

pub trait ChassisModel {
    /// Drive each side at a fraction of full power
    fn tank(&mut self, left: f64, right: f64) -> Result<()>;

    /// Command zero output on both sides
    fn stop(&mut self) -> Result<()>;

    fn set_max_velocity(&mut self, max_velocity: f64) -> Result<()>;

    fn max_velocity(&self) -> f64;

    /// Forward throttle plus yaw, mixed additively per side
    fn arcade(&mut self, forward: f64, yaw: f64) -> Result<()> {
        let (left, right) = arcade_mix(forward, yaw);
        self.tank(left, right)
    }

    /// Forward throttle with yaw scaled by the throttle, so the robot follows
    /// an arc of constant curvature
    fn curvature(&mut self, forward: f64, curvature: f64) -> Result<()> {
        let (left, right) = curvature_mix(forward, curvature, DEFAULT_CURVATURE_THRESHOLD);
        self.tank(left, right)
    }
}

/// Left/right outputs for an arcade command
pub fn arcade_mix(forward: f64, yaw: f64) -> (f64, f64) {
    let forward = forward.clamp(-1.0, 1.0);
    let yaw = yaw.clamp(-1.0, 1.0);
    desaturate(forward + yaw, forward - yaw)
}

/// Left/right outputs for a curvature command. At or below `threshold`
/// throttle the curvature input is used directly as yaw.
pub fn curvature_mix(forward: f64, curvature: f64, threshold: f64) -> (f64, f64) {
    let forward = forward.clamp(-1.0, 1.0);
    let curvature = curvature.clamp(-1.0, 1.0);

    if forward.abs() <= threshold {
        return arcade_mix(forward, curvature);
    }

    let yaw = forward.abs() * curvature;
    desaturate(forward + yaw, forward - yaw)
}

/// Scale both sides down together so neither exceeds full power
fn desaturate(left: f64, right: f64) -> (f64, f64) {
    let max = left.abs().max(right.abs());
    if max > 1.0 {
        (left / max, right / max)
    } else {
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arcade_mix() {
        assert_eq!(arcade_mix(0.5, 0.0), (0.5, 0.5));
        assert_eq!(arcade_mix(0.0, 0.5), (0.5, -0.5));
        assert_eq!(arcade_mix(0.5, 0.25), (0.75, 0.25));
    }

    #[test]
    fn test_arcade_desaturates() {
        let (left, right) = arcade_mix(1.0, 1.0);
        assert_eq!(left, 1.0);
        assert_eq!(right, 0.0);

        let (left, right) = arcade_mix(0.8, 0.6);
        assert!((left - 1.0).abs() < 1e-12);
        assert!((right - 0.2 / 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_curvature_scales_with_throttle() {
        let (left, right) = curvature_mix(0.5, 0.5, 0.0);
        assert_eq!((left, right), (0.75, 0.25));

        // Same curvature at lower throttle turns proportionally less
        let (left, right) = curvature_mix(0.2, 0.5, 0.0);
        assert!((left - 0.3).abs() < 1e-12);
        assert!((right - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_curvature_turns_in_place_below_threshold() {
        assert_eq!(curvature_mix(0.0, 0.4, 0.0), (0.4, -0.4));
        assert_eq!(curvature_mix(0.05, 0.4, 0.1), arcade_mix(0.05, 0.4));
    }

    #[test]
    fn test_inputs_clamped() {
        assert_eq!(arcade_mix(3.0, 0.0), (1.0, 1.0));
        assert_eq!(curvature_mix(-2.0, 0.0, 0.0), (-1.0, -1.0));
    }
}
