use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DistortionCoeffs, DistortionError, IntrinsicsError, PinholeIntrinsics};
use crate::{Mat3, Pt2, Pt3, Real, Vec2};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error(transparent)]
    Intrinsics(#[from] IntrinsicsError),
    #[error(transparent)]
    Distortion(#[from] DistortionError),
}

/// Intrinsic camera model: pinhole camera matrix plus lens distortion.
///
/// Camera pipeline for a point `p_c` in camera coordinates:
/// `pixel = K ∘ distortion ∘ (x / z, y / z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicModel {
    pub k: PinholeIntrinsics,
    pub dist: DistortionCoeffs,
}

impl IntrinsicModel {
    pub fn new(k: PinholeIntrinsics, dist: DistortionCoeffs) -> Self {
        Self { k, dist }
    }

    /// Distortion-free model.
    pub fn pinhole(k: PinholeIntrinsics) -> Self {
        Self::new(k, DistortionCoeffs::default())
    }

    pub fn from_parts(camera_matrix: &Mat3, dist_coeffs: &[Real]) -> Result<Self, ModelError> {
        let k = PinholeIntrinsics::try_from_camera_matrix(camera_matrix)?;
        let dist = DistortionCoeffs::from_slice(dist_coeffs)?;
        Ok(Self { k, dist })
    }

    pub fn camera_matrix(&self) -> Mat3 {
        self.k.camera_matrix()
    }

    /// Positive finite focal lengths, finite principal point and
    /// coefficients.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.k.validate()?;
        if let Some(idx) = self.dist.as_slice().iter().position(|v| !v.is_finite()) {
            return Err(DistortionError::NonFinite(idx).into());
        }
        Ok(())
    }

    /// Project a point given in camera coordinates to pixels.
    ///
    /// A point on the `z = 0` plane is not divided (the divisor falls back to
    /// one), so the camera-frame origin lands on the principal point.
    pub fn project(&self, p_c: &Pt3) -> Pt2 {
        let inv_z = if p_c.z != 0.0 { 1.0 / p_c.z } else { 1.0 };
        let n = Vec2::new(p_c.x * inv_z, p_c.y * inv_z);
        let d = self.dist.distort(&n);
        self.k.to_pixel(d.x, d.y)
    }

    /// Map a distorted pixel to undistorted normalised image coordinates.
    pub fn pixel_to_normalized(&self, uv: &Pt2) -> Pt2 {
        let (x, y) = self.k.to_normalized(uv);
        let n = self.dist.undistort(&Vec2::new(x, y));
        Pt2::new(n.x, n.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> IntrinsicModel {
        IntrinsicModel::new(
            PinholeIntrinsics::new(800.0, 800.0, 320.0, 240.0).unwrap(),
            DistortionCoeffs::brown_conrady(-0.1, 0.02, 0.001, -0.002, 0.0),
        )
    }

    #[test]
    fn optical_axis_hits_principal_point() {
        let m = model();
        let uv = m.project(&Pt3::new(0.0, 0.0, 5.0));
        assert_eq!(uv, Pt2::new(320.0, 240.0));
    }

    #[test]
    fn pixel_to_normalized_inverts_project() {
        let m = model();
        let p = Pt3::new(0.4, -0.3, 2.0);
        let uv = m.project(&p);
        let n = m.pixel_to_normalized(&uv);
        assert!((n.x - 0.2).abs() < 1e-9, "x = {}", n.x);
        assert!((n.y + 0.15).abs() < 1e-9, "y = {}", n.y);
    }

    #[test]
    fn from_parts_rejects_short_distortion() {
        let k = Mat3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
        let err = IntrinsicModel::from_parts(&k, &[0.0, 0.0, 0.0]).unwrap_err();
        assert_eq!(err, ModelError::Distortion(DistortionError::TooFew(3)));
    }

    #[test]
    fn validate_catches_drifted_parameters() {
        assert_eq!(model().validate(), Ok(()));

        let mut m = model();
        m.k.fy = -3.0;
        assert!(matches!(
            m.validate(),
            Err(ModelError::Intrinsics(IntrinsicsError::NonPositiveFocal { .. }))
        ));

        let mut m = model();
        m.dist.set(1, Real::NAN);
        assert_eq!(
            m.validate(),
            Err(ModelError::Distortion(DistortionError::NonFinite(1)))
        );
    }

    #[test]
    fn serde_roundtrip() {
        let m = model();
        let json = serde_json::to_string(&m).unwrap();
        let back: IntrinsicModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
