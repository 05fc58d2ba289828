//! Shared numerics for the linear solvers.
//!
//! - **Hartley normalisation** of 2D and 3D point sets,
//! - **null-space extraction** from a homogeneous design matrix with a
//!   rank check, used by every DLT in this crate.

use arpose_core::{Mat3, Pt2, Pt3, Real};
use nalgebra::{DMatrix, DVector, Matrix3x4, Matrix4};

/// Hartley normalisation for 2D points.
///
/// Centres the points and scales them so the mean distance from the origin
/// is `√2`. Returns the normalised points and `T` with
/// `p_norm = T * p_homogeneous`, or `None` if all points coincide.
pub fn normalize_points_2d(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as Real;
    let centroid = points.iter().fold(Pt2::origin().coords, |acc, p| acc + p.coords) / n;
    let mean_dist = points
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .sum::<Real>()
        / n;
    if mean_dist <= Real::EPSILON {
        return None;
    }

    let scale = std::f64::consts::SQRT_2 / mean_dist;
    let t = Mat3::new(
        scale,
        0.0,
        -scale * centroid.x,
        0.0,
        scale,
        -scale * centroid.y,
        0.0,
        0.0,
        1.0,
    );
    let norm = points
        .iter()
        .map(|p| Pt2::from((p.coords - centroid) * scale))
        .collect();
    Some((norm, t))
}

/// Hartley normalisation for 3D points (mean distance `√3`).
pub fn normalize_points_3d(points: &[Pt3]) -> Option<(Vec<Pt3>, Matrix4<Real>)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as Real;
    let centroid = points.iter().fold(Pt3::origin().coords, |acc, p| acc + p.coords) / n;
    let mean_dist = points
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .sum::<Real>()
        / n;
    if mean_dist <= Real::EPSILON {
        return None;
    }

    let scale = 3.0_f64.sqrt() / mean_dist;
    let mut t = Matrix4::<Real>::identity() * scale;
    t[(3, 3)] = 1.0;
    t[(0, 3)] = -scale * centroid.x;
    t[(1, 3)] = -scale * centroid.y;
    t[(2, 3)] = -scale * centroid.z;

    let norm = points
        .iter()
        .map(|p| Pt3::from((p.coords - centroid) * scale))
        .collect();
    Some((norm, t))
}

/// Solution of the homogeneous system `A x = 0` with `|x| = 1`.
#[derive(Debug, Clone)]
pub struct NullSpace {
    pub vector: DVector<Real>,
    /// Second-smallest over largest singular value. Close to zero when the
    /// null space has more than one dimension, i.e. the input is degenerate.
    pub conditioning: Real,
}

/// Right singular vector of the smallest singular value of `a`.
///
/// Under-determined systems are zero-padded to square so the full right
/// singular basis is available. Returns `None` if the SVD fails.
pub fn null_space(a: &DMatrix<Real>) -> Option<NullSpace> {
    let cols = a.ncols();
    let padded;
    let a = if a.nrows() < cols {
        padded = a.clone().resize_vertically(cols, 0.0);
        &padded
    } else {
        a
    };

    let svd = a.clone().svd(false, true);
    let v_t = svd.v_t?;
    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&i, &j| svd.singular_values[j].total_cmp(&svd.singular_values[i]));
    if order.len() < 2 {
        return None;
    }
    let largest = svd.singular_values[order[0]];
    if largest <= 0.0 {
        return None;
    }
    let smallest = order[order.len() - 1];
    let second = order[order.len() - 2];
    Some(NullSpace {
        vector: v_t.row(smallest).transpose(),
        conditioning: svd.singular_values[second] / largest,
    })
}

/// Reshape a row-major 9-vector into a 3×3 matrix.
pub fn mat3_from_vector(v: &DVector<Real>) -> Mat3 {
    debug_assert_eq!(v.len(), 9);
    Mat3::from_fn(|r, c| v[3 * r + c])
}

/// Reshape a row-major 12-vector into a 3×4 matrix.
pub fn mat34_from_vector(v: &DVector<Real>) -> Matrix3x4<Real> {
    debug_assert_eq!(v.len(), 12);
    Matrix3x4::from_fn(|r, c| v[4 * r + c])
}
