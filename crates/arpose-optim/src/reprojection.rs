//! Reprojection residuals written once over `RealField`.
//!
//! The solver evaluates them on `f64`; the Jacobians evaluate the same code
//! on `num-dual` dual numbers, so residuals and derivatives cannot drift
//! apart. The model matches [`IntrinsicModel::project`]: Rodrigues rotation,
//! perspective divide (divisor one on `z = 0`), rational radial-tangential
//! distortion, then `K`.

use arpose_core::{CorrespondenceView, IntrinsicModel, Real, MAX_DISTORTION_COEFFS};
use nalgebra::{DVector, RealField, Vector2, Vector3};

use crate::params::POSE_DIM;

/// Below this squared angle the rotation is expanded to first order.
const SMALL_ANGLE_SQ: Real = 1e-16;

/// `[fx, fy, cx, cy]`.
pub type PinholeParams<T> = [T; 4];
/// `k1 k2 p1 p2 k3 k4 k5 k6`, zero-padded.
pub type DistortionParams<T> = [T; MAX_DISTORTION_COEFFS];

#[inline]
fn lit<T: RealField>(v: Real) -> T {
    nalgebra::convert(v)
}

/// Intrinsics of `model` converted to the scalar type `T`.
pub fn model_params<T: RealField>(
    model: &IntrinsicModel,
) -> (PinholeParams<T>, DistortionParams<T>) {
    let mut dist = [0.0; MAX_DISTORTION_COEFFS];
    let coeffs = model.dist.as_slice();
    dist[..coeffs.len()].copy_from_slice(coeffs);
    (
        [model.k.fx, model.k.fy, model.k.cx, model.k.cy].map(lit::<T>),
        dist.map(lit::<T>),
    )
}

/// Rotate `p` by the Rodrigues vector `rvec`.
pub fn rodrigues_rotate<T: RealField>(rvec: &Vector3<T>, p: &Vector3<T>) -> Vector3<T> {
    let theta2 = rvec.dot(rvec);
    let cross = rvec.cross(p);
    if theta2 < lit(SMALL_ANGLE_SQ) {
        return p + cross;
    }
    let theta = theta2.clone().sqrt();
    let (sin, cos) = (theta.clone().sin(), theta.clone().cos());
    let along = rvec.dot(p) * (T::one() - cos.clone()) / theta2;
    p * cos + cross * (sin / theta) + rvec * along
}

/// Distort normalised coordinates `(x, y)`.
pub fn distort<T: RealField>(x: T, y: T, dist: &DistortionParams<T>) -> (T, T) {
    let [k1, k2, p1, p2, k3, k4, k5, k6] = dist.clone();
    let two: T = lit(2.0);
    let r2 = x.clone() * x.clone() + y.clone() * y.clone();
    let r4 = r2.clone() * r2.clone();
    let r6 = r4.clone() * r2.clone();
    let radial = (T::one() + k1 * r2.clone() + k2 * r4.clone() + k3 * r6.clone())
        / (T::one() + k4 * r2.clone() + k5 * r4 + k6 * r6);
    let xy = x.clone() * y.clone();
    let x_t = two.clone() * p1.clone() * xy.clone()
        + p2.clone() * (r2.clone() + two.clone() * x.clone() * x.clone());
    let y_t = p1 * (r2 + two.clone() * y.clone() * y.clone()) + two * p2 * xy;
    (x * radial.clone() + x_t, y * radial + y_t)
}

/// Pixel position of the camera-frame point `pc`.
pub fn project<T: RealField>(
    k: &PinholeParams<T>,
    dist: &DistortionParams<T>,
    pc: &Vector3<T>,
) -> Vector2<T> {
    let z = if pc.z == T::zero() {
        T::one()
    } else {
        pc.z.clone()
    };
    let (xd, yd) = distort(pc.x.clone() / z.clone(), pc.y.clone() / z, dist);
    let [fx, fy, cx, cy] = k.clone();
    Vector2::new(fx * xd + cx, fy * yd + cy)
}

/// `projected - detected` for every correspondence of `view`, two rows per
/// point. `pose` is `[rvec, tvec]`.
pub fn view_residuals<T: RealField>(
    k: &PinholeParams<T>,
    dist: &DistortionParams<T>,
    pose: &[T],
    view: &CorrespondenceView,
) -> DVector<T> {
    debug_assert_eq!(pose.len(), POSE_DIM);
    let rvec = Vector3::new(pose[0].clone(), pose[1].clone(), pose[2].clone());
    let tvec = Vector3::new(pose[3].clone(), pose[4].clone(), pose[5].clone());

    let mut r = DVector::from_element(2 * view.len(), T::zero());
    for (i, c) in view.iter().enumerate() {
        let pw = Vector3::new(lit(c.model.x), lit(c.model.y), lit(c.model.z));
        let uv = project(k, dist, &(rodrigues_rotate(&rvec, &pw) + &tvec));
        r[2 * i] = uv.x.clone() - lit(c.image.x);
        r[2 * i + 1] = uv.y.clone() - lit(c.image.y);
    }
    r
}
