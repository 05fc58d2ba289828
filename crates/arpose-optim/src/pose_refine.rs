//! Single-view pose refinement with fixed intrinsics.

use arpose_core::{CorrespondenceView, ExtrinsicPose, IntrinsicModel, Real};
use nalgebra::{DMatrix, DVector, SVector};
use num_dual::{jacobian, DualSVec64};

use crate::params::{pose_to_dvec, unpack_pose, POSE_DIM};
use crate::reprojection::{model_params, view_residuals};
use crate::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};

/// Pixel reprojection residuals of one view as a function of `[rvec, tvec]`.
#[derive(Debug, Clone, Copy)]
pub struct PoseRefineProblem<'a> {
    pub view: &'a CorrespondenceView,
    pub model: &'a IntrinsicModel,
}

impl NllsProblem for PoseRefineProblem<'_> {
    fn num_params(&self) -> usize {
        POSE_DIM
    }

    fn num_residuals(&self) -> usize {
        2 * self.view.len()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let (k, dist) = model_params::<Real>(self.model);
        view_residuals(&k, &dist, x.as_slice(), self.view)
    }

    /// Forward-mode autodiff over the six pose parameters.
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let (k, dist) = model_params::<DualSVec64<POSE_DIM>>(self.model);
        let p0 = SVector::<Real, POSE_DIM>::from_column_slice(x.as_slice());
        let (_, j) = jacobian(
            |p: SVector<DualSVec64<POSE_DIM>, POSE_DIM>| {
                view_residuals(&k, &dist, p.as_slice(), self.view)
            },
            p0,
        );
        DMatrix::from_column_slice(j.nrows(), POSE_DIM, j.as_slice())
    }
}

pub fn refine_pose<B: NllsSolverBackend>(
    backend: &B,
    view: &CorrespondenceView,
    model: &IntrinsicModel,
    init: &ExtrinsicPose,
    opts: &SolveOptions,
) -> (ExtrinsicPose, SolveReport) {
    let problem = PoseRefineProblem { view, model };
    let (x, report) = backend.solve(&problem, pose_to_dvec(init), opts);
    (unpack_pose(x.as_slice()), report)
}
