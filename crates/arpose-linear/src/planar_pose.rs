use arpose_core::{Iso3, Mat3, Real, Vec3};
use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion};

use crate::PoseInitError;

/// Decompose a plane-induced homography into the pose of the plane.
///
/// `hmtx` maps target-plane coordinates `(x, y, 1)` (the plane `z = 0`) to
/// image pixels, and `kmtx` is the camera matrix; pass the identity when the
/// homography already targets normalised image coordinates. The sign of `H`
/// is chosen so the target lies in front of the camera.
///
/// Returns the isometry mapping target coordinates into camera coordinates.
pub fn pose_from_homography(kmtx: &Mat3, hmtx: &Mat3) -> Result<Iso3, PoseInitError> {
    let k_inv = kmtx.try_inverse().ok_or(PoseInitError::SingularIntrinsics)?;
    let m = k_inv * hmtx;

    let m1 = m.column(0).into_owned();
    let m2 = m.column(1).into_owned();
    let m3 = m.column(2).into_owned();

    let norm1 = m1.norm();
    let norm2 = m2.norm();
    if norm1 <= Real::EPSILON || norm2 <= Real::EPSILON {
        return Err(PoseInitError::Degenerate("homography has a null column"));
    }
    let mut lambda = 2.0 / (norm1 + norm2);
    if m3.z < 0.0 {
        lambda = -lambda;
    }

    let r1 = m1 * lambda;
    let r2 = m2 * lambda;
    let r3 = r1.cross(&r2);

    let mut r_mat = Matrix3::<Real>::zeros();
    r_mat.set_column(0, &r1);
    r_mat.set_column(1, &r2);
    r_mat.set_column(2, &r3);

    let r_orth = project_to_so3(&r_mat)?;
    let t: Vec3 = m3 * lambda;

    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
    Ok(Iso3::from_parts(Translation3::from(t), rot))
}

/// Closest rotation to `m` in the Frobenius sense.
pub(crate) fn project_to_so3(m: &Mat3) -> Result<Mat3, PoseInitError> {
    let svd = m.svd(true, true);
    let u = svd.u.ok_or(PoseInitError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(PoseInitError::SvdFailed)?;
    let r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        Ok(u_flipped * v_t)
    } else {
        Ok(r)
    }
}
