use arpose_core::{Mat3, Pt2, Real};
use nalgebra::DMatrix;
use thiserror::Error;

use crate::math::{mat3_from_vector, normalize_points_2d, null_space};

/// Below this conditioning the homography system is treated as rank deficient.
const DEGENERATE_CONDITIONING: Real = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("point counts differ: {world} plane points vs {image} image points")]
    CountMismatch { world: usize, image: usize },
    #[error("degenerate point configuration (coincident or collinear points)")]
    Degenerate,
    #[error("svd failed")]
    SvdFailed,
}

/// Estimate `H` such that `image ~ H * world` using the normalised DLT.
///
/// The result is scaled so that `H[2, 2] = 1` whenever that entry is not
/// vanishingly small, otherwise to unit Frobenius norm.
pub fn dlt_homography(world: &[Pt2], image: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = world.len();
    if image.len() != n {
        return Err(HomographyError::CountMismatch {
            world: n,
            image: image.len(),
        });
    }
    if n < 4 {
        return Err(HomographyError::NotEnoughPoints(n));
    }

    let (world_n, t_world) = normalize_points_2d(world).ok_or(HomographyError::Degenerate)?;
    let (image_n, t_image) = normalize_points_2d(image).ok_or(HomographyError::Degenerate)?;

    let mut a = DMatrix::<Real>::zeros(2 * n, 9);
    for (i, (pw, pi)) in world_n.iter().zip(&image_n).enumerate() {
        let (x, y) = (pw.x, pw.y);
        let (u, v) = (pi.x, pi.y);
        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    let ns = null_space(&a).ok_or(HomographyError::SvdFailed)?;
    if ns.conditioning < DEGENERATE_CONDITIONING {
        return Err(HomographyError::Degenerate);
    }
    let h_norm = mat3_from_vector(&ns.vector);

    let t_image_inv = t_image.try_inverse().ok_or(HomographyError::Degenerate)?;
    let mut h = t_image_inv * h_norm * t_world;

    let scale = h[(2, 2)];
    if scale.abs() > 1e-12 * h.norm() {
        h /= scale;
    } else {
        let norm = h.norm();
        if norm <= 0.0 {
            return Err(HomographyError::Degenerate);
        }
        h /= norm;
    }
    Ok(h)
}

/// Apply a homography to a 2D point.
#[inline]
pub fn apply_homography(h: &Mat3, p: &Pt2) -> Pt2 {
    arpose_core::from_homogeneous(&(h * arpose_core::to_homogeneous(p)))
}
