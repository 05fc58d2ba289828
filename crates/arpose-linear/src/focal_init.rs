//! Focal length initialisation from plane homographies.
//!
//! With the principal point fixed at `(cx, cy)` and a known aspect ratio
//! `a = fx / fy`, shifting each homography by the principal point leaves the
//! image of the absolute conic as `B = diag(1 / (a² fy²), 1 / fy², 1)`.
//! Zhang's two constraints per view,
//!
//! ```text
//! v12ᵀ b = 0,    (v11 - v22)ᵀ b = 0,
//! ```
//!
//! then become linear in the single unknown `w = 1 / fy²`, which is solved
//! in the least-squares sense over all views.

use arpose_core::{Mat3, Real};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FocalInitError {
    #[error("no homographies supplied")]
    Empty,
    #[error("aspect ratio must be positive and finite, got {0}")]
    InvalidAspect(Real),
    #[error("views carry no perspective information (fronto-parallel target?)")]
    Unobservable,
}

/// Focal lengths `(fx, fy)` consistent with a fixed principal point and
/// aspect ratio `fx / fy`.
pub fn estimate_focal_fixed_center(
    homographies: &[Mat3],
    cx: Real,
    cy: Real,
    aspect: Real,
) -> Result<(Real, Real), FocalInitError> {
    if homographies.is_empty() {
        return Err(FocalInitError::Empty);
    }
    if !(aspect.is_finite() && aspect > 0.0) {
        return Err(FocalInitError::InvalidAspect(aspect));
    }

    let shift = Mat3::new(1.0, 0.0, -cx, 0.0, 1.0, -cy, 0.0, 0.0, 1.0);
    let inv_a2 = 1.0 / (aspect * aspect);

    let mut ata = 0.0;
    let mut atb = 0.0;
    for h in homographies {
        let hc = shift * h;
        let scale = hc.column(0).norm().max(hc.column(1).norm());
        if scale <= 0.0 {
            continue;
        }
        let hc = hc / scale;
        let (h1, h2) = (hc.column(0), hc.column(1));

        // v12ᵀ b = 0
        let a0 = h1[0] * h2[0] * inv_a2 + h1[1] * h2[1];
        let b0 = -h1[2] * h2[2];
        // (v11 - v22)ᵀ b = 0
        let a1 = (h1[0] * h1[0] - h2[0] * h2[0]) * inv_a2 + (h1[1] * h1[1] - h2[1] * h2[1]);
        let b1 = -(h1[2] * h1[2] - h2[2] * h2[2]);

        ata += a0 * a0 + a1 * a1;
        atb += a0 * b0 + a1 * b1;
    }

    if ata <= Real::EPSILON {
        return Err(FocalInitError::Unobservable);
    }
    let w = atb / ata;
    if !(w.is_finite() && w > 0.0) {
        return Err(FocalInitError::Unobservable);
    }
    let fy = (1.0 / w).sqrt();
    log::debug!("focal initialisation: fy = {fy:.3}, fx = {:.3}", aspect * fy);
    Ok((aspect * fy, fy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Vector3};

    fn plane_homography(k: &Mat3, rot: Rotation3<Real>, t: Vector3<Real>) -> Mat3 {
        let r = rot.matrix();
        let mut h = Mat3::zeros();
        h.set_column(0, &(k * r.column(0)));
        h.set_column(1, &(k * r.column(1)));
        h.set_column(2, &(k * t));
        h / h[(2, 2)]
    }

    #[test]
    fn recovers_focal_from_tilted_views() {
        let k = Mat3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
        let hs: Vec<Mat3> = [(0.3, 0.0, 0.1), (0.0, -0.35, 0.0), (-0.25, 0.2, -0.1)]
            .iter()
            .map(|&(r, p, y)| {
                plane_homography(
                    &k,
                    Rotation3::from_euler_angles(r, p, y),
                    Vector3::new(-4.0, 2.5, 20.0),
                )
            })
            .collect();
        let (fx, fy) = estimate_focal_fixed_center(&hs, 320.0, 240.0, 1.0).unwrap();
        assert!((fx - 800.0).abs() < 1e-6, "fx = {fx}");
        assert!((fy - 800.0).abs() < 1e-6, "fy = {fy}");
    }

    #[test]
    fn fronto_parallel_views_are_unobservable() {
        let k = Mat3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
        let h = plane_homography(&k, Rotation3::identity(), Vector3::new(0.0, 0.0, 10.0));
        assert_eq!(
            estimate_focal_fixed_center(&[h], 320.0, 240.0, 1.0),
            Err(FocalInitError::Unobservable)
        );
    }
}
