// Physical quantities used by motion requests
//
// Lengths are stored in metres and angles in radians; constructors and
// accessors convert from/to the units robots are usually specified in.

use std::f64::consts::PI;
use std::ops::{Div, Mul, Neg};

use serde::{Deserialize, Serialize};

const METERS_PER_INCH: f64 = 0.0254;

/// A linear distance
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Length(f64);

impl Length {
    pub const fn meters(value: f64) -> Self {
        Self(value)
    }

    pub fn inches(value: f64) -> Self {
        Self(value * METERS_PER_INCH)
    }

    pub fn millimeters(value: f64) -> Self {
        Self(value / 1000.0)
    }

    pub fn as_meters(self) -> f64 {
        self.0
    }

    pub fn as_inches(self) -> f64 {
        self.0 / METERS_PER_INCH
    }
}

impl Mul<f64> for Length {
    type Output = Length;

    fn mul(self, rhs: f64) -> Length {
        Length(self.0 * rhs)
    }
}

impl Div<f64> for Length {
    type Output = Length;

    fn div(self, rhs: f64) -> Length {
        Length(self.0 / rhs)
    }
}

/// Dimensionless ratio of two lengths
impl Div<Length> for Length {
    type Output = f64;

    fn div(self, rhs: Length) -> f64 {
        self.0 / rhs.0
    }
}

impl Neg for Length {
    type Output = Length;

    fn neg(self) -> Length {
        Length(-self.0)
    }
}

/// A rotation about the chassis' vertical axis (positive = counter-clockwise)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const fn radians(value: f64) -> Self {
        Self(value)
    }

    pub fn degrees(value: f64) -> Self {
        Self(value * (PI / 180.0))
    }

    pub fn as_radians(self) -> f64 {
        self.0
    }

    pub fn as_degrees(self) -> f64 {
        self.0 * (180.0 / PI)
    }

    /// Arc length swept at `radius` from the centre of rotation
    pub fn arc_length(self, radius: Length) -> Length {
        radius * self.0
    }
}

impl Mul<f64> for Angle {
    type Output = Angle;

    fn mul(self, rhs: f64) -> Angle {
        Angle(self.0 * rhs)
    }
}

impl Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        Angle(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inch_conversion() {
        let six = Length::inches(6.0);
        assert!((six.as_meters() - 0.1524).abs() < 1e-12);
        assert!((six.as_inches() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_degree_conversion() {
        assert!((Angle::degrees(180.0).as_radians() - PI).abs() < 1e-12);
        assert!((Angle::radians(PI / 2.0).as_degrees() - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_arc_length() {
        // A full turn at radius r sweeps 2*pi*r
        let arc = Angle::degrees(360.0).arc_length(Length::meters(0.5));
        assert!((arc.as_meters() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_length_ratio_is_dimensionless() {
        assert_eq!(Length::inches(11.0) / Length::inches(5.5), 2.0);
    }
}
