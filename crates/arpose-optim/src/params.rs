//! Packing of the intrinsic model into a solver parameter vector.

use arpose_core::{ExtrinsicPose, IntrinsicModel, Real, Vec3, MAX_DISTORTION_COEFFS};
use nalgebra::{DVector, RealField};
use serde::{Deserialize, Serialize};

use crate::reprojection::{model_params, DistortionParams, PinholeParams};

/// Upper bound on [`IntrinsicsLayout::dim`]: `fx fy cx cy` plus eight
/// distortion coefficients.
pub const MAX_INTRINSICS_DIM: usize = 4 + MAX_DISTORTION_COEFFS;

/// Which intrinsic parameters are held fixed during refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrinsicsFixMask {
    /// Keep `fx / fy` at its initial value; a single focal parameter is solved.
    pub aspect_ratio: bool,
    pub principal_point: bool,
    /// Hold `p1 = p2 = 0`.
    pub tangential: bool,
    pub k3: bool,
}

impl Default for IntrinsicsFixMask {
    fn default() -> Self {
        Self {
            aspect_ratio: true,
            principal_point: false,
            tangential: false,
            k3: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntrinsicParam {
    /// `fy`, with `fx = aspect * fy`.
    Focal,
    Fx,
    Fy,
    Cx,
    Cy,
    Dist(usize),
}

/// Ordered list of free intrinsic parameters, bound to a base model that
/// supplies the values of everything held fixed.
#[derive(Debug, Clone)]
pub struct IntrinsicsLayout {
    params: Vec<IntrinsicParam>,
    base: IntrinsicModel,
    aspect: Real,
}

impl IntrinsicsLayout {
    pub fn new(base: IntrinsicModel, mask: IntrinsicsFixMask) -> Self {
        let mut params = Vec::with_capacity(4 + base.dist.len());
        if mask.aspect_ratio {
            params.push(IntrinsicParam::Focal);
        } else {
            params.extend([IntrinsicParam::Fx, IntrinsicParam::Fy]);
        }
        if !mask.principal_point {
            params.extend([IntrinsicParam::Cx, IntrinsicParam::Cy]);
        }
        for idx in 0..base.dist.len() {
            let fixed = match idx {
                2 | 3 => mask.tangential,
                4 => mask.k3,
                _ => false,
            };
            if !fixed {
                params.push(IntrinsicParam::Dist(idx));
            }
        }
        Self {
            params,
            base,
            aspect: base.k.aspect_ratio(),
        }
    }

    pub fn dim(&self) -> usize {
        self.params.len()
    }

    pub fn pack(&self, model: &IntrinsicModel, out: &mut [Real]) {
        debug_assert_eq!(out.len(), self.dim());
        for (slot, param) in out.iter_mut().zip(&self.params) {
            *slot = match *param {
                IntrinsicParam::Focal | IntrinsicParam::Fy => model.k.fy,
                IntrinsicParam::Fx => model.k.fx,
                IntrinsicParam::Cx => model.k.cx,
                IntrinsicParam::Cy => model.k.cy,
                IntrinsicParam::Dist(i) => model.dist.as_slice()[i],
            };
        }
    }

    pub fn unpack(&self, values: &[Real]) -> IntrinsicModel {
        debug_assert_eq!(values.len(), self.dim());
        let mut model = self.base;
        for (value, param) in values.iter().zip(&self.params) {
            match *param {
                IntrinsicParam::Focal => {
                    model.k.fy = *value;
                    model.k.fx = self.aspect * *value;
                }
                IntrinsicParam::Fx => model.k.fx = *value,
                IntrinsicParam::Fy => model.k.fy = *value,
                IntrinsicParam::Cx => model.k.cx = *value,
                IntrinsicParam::Cy => model.k.cy = *value,
                IntrinsicParam::Dist(i) => model.dist.set(i, *value),
            }
        }
        model
    }

    /// Like [`Self::unpack`], but over any scalar so dual numbers pass
    /// through the fixed/free bookkeeping.
    pub fn unpack_params<T: RealField>(
        &self,
        values: &[T],
    ) -> (PinholeParams<T>, DistortionParams<T>) {
        debug_assert_eq!(values.len(), self.dim());
        let (mut k, mut dist) = model_params::<T>(&self.base);
        let aspect: T = nalgebra::convert(self.aspect);
        for (value, param) in values.iter().zip(&self.params) {
            match *param {
                IntrinsicParam::Focal => {
                    k[0] = aspect.clone() * value.clone();
                    k[1] = value.clone();
                }
                IntrinsicParam::Fx => k[0] = value.clone(),
                IntrinsicParam::Fy => k[1] = value.clone(),
                IntrinsicParam::Cx => k[2] = value.clone(),
                IntrinsicParam::Cy => k[3] = value.clone(),
                IntrinsicParam::Dist(i) => dist[i] = value.clone(),
            }
        }
        (k, dist)
    }
}

pub const POSE_DIM: usize = 6;

/// Write `[rvec, tvec]` into a 6-slot block.
pub fn pack_pose(pose: &ExtrinsicPose, out: &mut [Real]) {
    out[..3].copy_from_slice(pose.rvec.as_slice());
    out[3..6].copy_from_slice(pose.tvec.as_slice());
}

pub fn unpack_pose(block: &[Real]) -> ExtrinsicPose {
    ExtrinsicPose::new(
        Vec3::new(block[0], block[1], block[2]),
        Vec3::new(block[3], block[4], block[5]),
    )
}

pub fn pose_to_dvec(pose: &ExtrinsicPose) -> DVector<Real> {
    let mut x = DVector::zeros(POSE_DIM);
    pack_pose(pose, x.as_mut_slice());
    x
}
