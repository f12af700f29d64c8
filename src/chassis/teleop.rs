// Operator input -> curve -> open-loop drive command

use std::str::FromStr;

use tracing::debug;

use super::model::{arcade_mix, curvature_mix, ChassisModel, DEFAULT_CURVATURE_THRESHOLD};
use crate::curve::{ArcadeCurves, CurvatureCurves, SharedCurve, TankCurves, JOYSTICK_FULL_SCALE};
use crate::error::Result;

/// Teleop input scheme, with the curves that shape its two channels
#[derive(Clone)]
pub enum DriveProfile {
    Tank(TankCurves),
    Arcade(ArcadeCurves),
    Curvature(CurvatureCurves),
}

impl DriveProfile {
    pub fn kind(&self) -> ProfileKind {
        match self {
            DriveProfile::Tank(_) => ProfileKind::Tank,
            DriveProfile::Arcade(_) => ProfileKind::Arcade,
            DriveProfile::Curvature(_) => ProfileKind::Curvature,
        }
    }

    /// Build a profile of `kind` with one curve per channel
    pub fn from_curves(kind: ProfileKind, first: SharedCurve, second: SharedCurve) -> Self {
        match kind {
            ProfileKind::Tank => DriveProfile::Tank(TankCurves::new(first, second)),
            ProfileKind::Arcade => DriveProfile::Arcade(ArcadeCurves::new(first, second)),
            ProfileKind::Curvature => {
                DriveProfile::Curvature(CurvatureCurves::new(first, second))
            }
        }
    }

    /// Shape one tick of raw stick input and command the model.
    ///
    /// `first` and `second` are the raw channels in the +/-127 convention:
    /// left/right for tank, forward/yaw for arcade, forward/curvature for
    /// curvature. Returns the shaped channels as fractions of full scale.
    pub fn apply<M: ChassisModel + ?Sized>(
        &self,
        model: &mut M,
        first: f64,
        second: f64,
    ) -> Result<(f64, f64)> {
        let (first, second) = match self {
            DriveProfile::Tank(curves) => curves.shape(first, second),
            DriveProfile::Arcade(curves) => curves.shape(first, second),
            DriveProfile::Curvature(curves) => curves.shape(first, second),
        };
        let first = first / JOYSTICK_FULL_SCALE;
        let second = second / JOYSTICK_FULL_SCALE;
        debug!("{:?} shaped input: {:.3}, {:.3}", self.kind(), first, second);

        match self {
            DriveProfile::Tank(_) => model.tank(first, second)?,
            DriveProfile::Arcade(_) => model.arcade(first, second)?,
            DriveProfile::Curvature(_) => model.curvature(first, second)?,
        }
        Ok((first, second))
    }

    /// Per-side outputs the default model mixing produces for shaped
    /// channels returned by `apply`
    pub fn side_outputs(&self, first: f64, second: f64) -> (f64, f64) {
        match self {
            DriveProfile::Tank(_) => (first, second),
            DriveProfile::Arcade(_) => arcade_mix(first, second),
            DriveProfile::Curvature(_) => {
                curvature_mix(first, second, DEFAULT_CURVATURE_THRESHOLD)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    Tank,
    Arcade,
    Curvature,
}

impl FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tank" => Ok(ProfileKind::Tank),
            "arcade" => Ok(ProfileKind::Arcade),
            "curvature" => Ok(ProfileKind::Curvature),
            other => Err(format!("unknown drive profile '{}'", other)),
        }
    }
}
