use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::{Iso3, Mat3, Pt3, Vec3};

/// Rigid transform from target coordinates into camera coordinates.
///
/// The rotation is stored as a Rodrigues vector: its direction is the
/// rotation axis and its norm the angle in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrinsicPose {
    pub rvec: Vec3,
    pub tvec: Vec3,
}

impl Default for ExtrinsicPose {
    fn default() -> Self {
        Self::identity()
    }
}

impl ExtrinsicPose {
    pub fn new(rvec: Vec3, tvec: Vec3) -> Self {
        Self { rvec, tvec }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zeros(), Vec3::zeros())
    }

    pub fn from_isometry(iso: &Iso3) -> Self {
        Self {
            rvec: iso.rotation.scaled_axis(),
            tvec: iso.translation.vector,
        }
    }

    pub fn to_isometry(&self) -> Iso3 {
        Iso3::from_parts(
            Translation3::from(self.tvec),
            UnitQuaternion::from_scaled_axis(self.rvec),
        )
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_scaled_axis(self.rvec)
    }

    pub fn rotation_matrix(&self) -> Mat3 {
        *self.rotation().matrix()
    }

    /// Map a target-frame point into the camera frame.
    #[inline]
    pub fn transform_point(&self, p: &Pt3) -> Pt3 {
        self.rotation() * p + self.tvec
    }

    /// Angle in radians of the relative rotation between two poses.
    pub fn rotation_angle_to(&self, other: &Self) -> f64 {
        self.rotation().rotation_to(&other.rotation()).angle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isometry_roundtrip() {
        let pose = ExtrinsicPose::new(Vec3::new(0.1, -0.3, 0.2), Vec3::new(-4.0, 2.5, 20.0));
        let back = ExtrinsicPose::from_isometry(&pose.to_isometry());
        assert!((back.rvec - pose.rvec).norm() < 1e-12);
        assert!((back.tvec - pose.tvec).norm() < 1e-12);
    }

    #[test]
    fn transform_matches_isometry() {
        let pose = ExtrinsicPose::new(Vec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2), Vec3::z());
        let p = pose.transform_point(&Pt3::new(1.0, 0.0, 0.0));
        assert!((p - Pt3::new(0.0, 1.0, 1.0)).norm() < 1e-12, "{p:?}");
        let q = pose.to_isometry().transform_point(&Pt3::new(1.0, 0.0, 0.0));
        assert!((p - q).norm() < 1e-12);
    }
}
