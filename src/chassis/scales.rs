// Chassis geometry and unit conversion
//
// Physical requests (distance, angle) are mapped to raw encoder ticks using
// the wheel diameter, the track width and the ticks-per-revolution of the
// drive gearing. Requests already in ticks skip conversion.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{ChassisError, Result};
use crate::units::{Angle, Length};

/// Motor internal gearing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gearset {
    /// 36:1, 100 rpm
    Red,
    /// 18:1, 200 rpm
    Green,
    /// 6:1, 600 rpm
    Blue,
    /// Feetech STS3215 magnetic encoder
    Sts3215,
}

pub const RED_TPR: f64 = 1800.0;
pub const GREEN_TPR: f64 = 900.0;
pub const BLUE_TPR: f64 = 300.0;
pub const STS3215_TPR: f64 = 4096.0;

/// Encoder ticks per output shaft revolution for a gearset
pub fn gearset_to_tpr(gearset: Gearset) -> f64 {
    match gearset {
        Gearset::Red => RED_TPR,
        Gearset::Green => GREEN_TPR,
        Gearset::Blue => BLUE_TPR,
        Gearset::Sts3215 => STS3215_TPR,
    }
}

/// Internal gearset plus the external ratio between motor and wheel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GearsetRatioPair {
    pub internal_gearset: Gearset,
    pub ratio: f64,
}

impl GearsetRatioPair {
    pub fn new(internal_gearset: Gearset, ratio: f64) -> Result<Self> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ChassisError::InvalidRatio(ratio));
        }
        Ok(Self {
            internal_gearset,
            ratio,
        })
    }

    /// Ticks per wheel revolution
    pub fn tpr(&self) -> f64 {
        gearset_to_tpr(self.internal_gearset) * self.ratio
    }
}

impl From<Gearset> for GearsetRatioPair {
    fn from(internal_gearset: Gearset) -> Self {
        Self {
            internal_gearset,
            ratio: 1.0,
        }
    }
}

/// Immutable drive geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisScales {
    wheel_diameter: Length,
    wheel_track: Length,
    tpr: f64,
}

impl ChassisScales {
    /// Rejects zero, negative and non-finite values up front so conversion
    /// never divides by zero.
    pub fn new(wheel_diameter: Length, wheel_track: Length, tpr: f64) -> Result<Self> {
        check_positive("wheel_diameter", wheel_diameter.as_meters())?;
        check_positive("wheel_track", wheel_track.as_meters())?;
        check_positive("tpr", tpr)?;
        Ok(Self {
            wheel_diameter,
            wheel_track,
            tpr,
        })
    }

    pub fn wheel_diameter(&self) -> Length {
        self.wheel_diameter
    }

    pub fn wheel_track(&self) -> Length {
        self.wheel_track
    }

    pub fn tpr(&self) -> f64 {
        self.tpr
    }

    pub fn wheel_circumference(&self) -> Length {
        self.wheel_diameter * PI
    }

    /// Ticks for a straight-line wheel travel of `distance`
    pub fn distance_to_ticks(&self, distance: Length) -> f64 {
        distance / self.wheel_circumference() * self.tpr
    }

    /// Ticks each side travels (left positive) to rotate the chassis by `angle`
    /// in place
    pub fn angle_to_ticks(&self, angle: Angle) -> f64 {
        self.distance_to_ticks(angle.arc_length(self.wheel_track / 2.0))
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ChassisError::InvalidGeometry { field, value })
    }
}

/// A straight-line request, either in raw ticks or physical distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceTarget {
    Raw(f64),
    Physical(Length),
}

impl DistanceTarget {
    pub fn to_ticks(self, scales: &ChassisScales) -> f64 {
        match self {
            DistanceTarget::Raw(ticks) => ticks,
            DistanceTarget::Physical(distance) => scales.distance_to_ticks(distance),
        }
    }
}

impl From<f64> for DistanceTarget {
    fn from(ticks: f64) -> Self {
        DistanceTarget::Raw(ticks)
    }
}

impl From<Length> for DistanceTarget {
    fn from(distance: Length) -> Self {
        DistanceTarget::Physical(distance)
    }
}

/// A turn request, either in raw per-side ticks or a physical angle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AngleTarget {
    Raw(f64),
    Physical(Angle),
}

impl AngleTarget {
    pub fn to_ticks(self, scales: &ChassisScales) -> f64 {
        match self {
            AngleTarget::Raw(ticks) => ticks,
            AngleTarget::Physical(angle) => scales.angle_to_ticks(angle),
        }
    }
}

impl From<f64> for AngleTarget {
    fn from(ticks: f64) -> Self {
        AngleTarget::Raw(ticks)
    }
}

impl From<Angle> for AngleTarget {
    fn from(angle: Angle) -> Self {
        AngleTarget::Physical(angle)
    }
}
