//! Direct linear pose for general (non-planar) point sets.
//!
//! Works on undistorted normalised image coordinates, so the camera matrix
//! and lens model are applied by the caller beforehand.

use arpose_core::{Iso3, Pt2, Pt3, Real};
use nalgebra::{DMatrix, Rotation3, Translation3, UnitQuaternion};

use crate::math::{mat34_from_vector, normalize_points_3d, null_space};
use crate::planar_pose::project_to_so3;
use crate::PoseInitError;

const DEGENERATE_CONDITIONING: Real = 1e-10;

/// Estimate `[R | t]` from at least six 3D points and their normalised
/// image coordinates by solving `x ~ [R | t] X` linearly.
pub fn dlt_pose(world: &[Pt3], normalized: &[Pt2]) -> Result<Iso3, PoseInitError> {
    let n = world.len();
    if normalized.len() != n {
        return Err(PoseInitError::CountMismatch {
            world: n,
            image: normalized.len(),
        });
    }
    if n < 6 {
        return Err(PoseInitError::NotEnoughPoints { got: n, need: 6 });
    }

    let (world_n, t_world) = normalize_points_3d(world)
        .ok_or(PoseInitError::Degenerate("coincident model points"))?;

    let mut a = DMatrix::<Real>::zeros(2 * n, 12);
    for (i, (pw, pi)) in world_n.iter().zip(normalized).enumerate() {
        let (x, y, z) = (pw.x, pw.y, pw.z);
        let (u, v) = (pi.x, pi.y);
        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = z;
        a[(r0, 3)] = 1.0;
        a[(r0, 8)] = -u * x;
        a[(r0, 9)] = -u * y;
        a[(r0, 10)] = -u * z;
        a[(r0, 11)] = -u;

        a[(r1, 4)] = x;
        a[(r1, 5)] = y;
        a[(r1, 6)] = z;
        a[(r1, 7)] = 1.0;
        a[(r1, 8)] = -v * x;
        a[(r1, 9)] = -v * y;
        a[(r1, 10)] = -v * z;
        a[(r1, 11)] = -v;
    }

    let ns = null_space(&a).ok_or(PoseInitError::SvdFailed)?;
    if ns.conditioning < DEGENERATE_CONDITIONING {
        return Err(PoseInitError::Degenerate("rank-deficient projection system"));
    }
    let p = mat34_from_vector(&ns.vector) * t_world;

    let m = p.fixed_view::<3, 3>(0, 0).into_owned();
    let mut s = (m.row(0).norm() + m.row(1).norm() + m.row(2).norm()) / 3.0;
    if s <= Real::EPSILON {
        return Err(PoseInitError::Degenerate("vanishing rotation block"));
    }
    if m.determinant() < 0.0 {
        s = -s;
    }

    let r_orth = project_to_so3(&(m / s))?;
    let t = p.column(3) / s;

    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
    Ok(Iso3::from_parts(Translation3::from(t.into_owned()), rot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_pose_from_exact_points() {
        let iso_gt = Iso3::from_parts(
            Translation3::new(0.1, -0.05, 1.0),
            Rotation3::from_euler_angles(0.1, -0.05, 0.2).into(),
        );

        let mut world = Vec::new();
        let mut image = Vec::new();
        for z in 0..2 {
            for y in 0..3 {
                for x in 0..4 {
                    let pw = Pt3::new(x as Real * 0.1, y as Real * 0.1, 0.5 + z as Real * 0.1);
                    let pc = iso_gt.transform_point(&pw);
                    world.push(pw);
                    image.push(Pt2::new(pc.x / pc.z, pc.y / pc.z));
                }
            }
        }

        let iso = dlt_pose(&world, &image).unwrap();
        assert!((iso.translation.vector - iso_gt.translation.vector).norm() < 1e-6);
        assert!(iso.rotation.angle_to(&iso_gt.rotation) < 1e-6);
    }

    #[test]
    fn rejects_planar_input() {
        let world: Vec<Pt3> = (0..8)
            .map(|k| Pt3::new((k % 4) as Real, (k / 4) as Real, 0.0))
            .collect();
        let image: Vec<Pt2> = world
            .iter()
            .map(|p| Pt2::new(p.x / 5.0, p.y / 5.0))
            .collect();
        assert!(matches!(
            dlt_pose(&world, &image),
            Err(PoseInitError::Degenerate(_))
        ));
    }
}
