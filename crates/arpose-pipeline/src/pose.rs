//! Single-view pose solving with known intrinsics.

use arpose_core::{
    project_points, rms_distance, CorrespondenceView, ExtrinsicPose, IntrinsicModel, Pt2, Real,
};
use arpose_linear::{dlt_homography, dlt_pose, pose_from_homography, PoseInitError};
use arpose_optim::pose_refine::refine_pose;
use arpose_optim::{LmBackend, SolveOptions};
use log::debug;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fewest correspondences a pose is attempted with.
pub const MIN_POSE_POINTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoseError {
    #[error("need at least {need} correspondences for a pose, got {got}")]
    NotEnoughPoints { got: usize, need: usize },
    #[error("non-finite detection at index {0}")]
    NonFiniteDetection(usize),
    #[error("no pose: {0}")]
    Init(#[from] PoseInitError),
}

impl PoseError {
    /// `true` for the "insufficient data" class: retry with more points.
    pub fn is_insufficient_data(&self) -> bool {
        match self {
            PoseError::NotEnoughPoints { .. } => true,
            PoseError::Init(e) => e.is_insufficient_data(),
            PoseError::NonFiniteDetection(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseSolverOptions {
    /// Skip LM refinement and return the linear estimate.
    pub linear_only: bool,
    /// Tolerance on |z| below which the model is treated as planar.
    pub planarity_tol: Real,
    pub solver: SolveOptions,
}

impl Default for PoseSolverOptions {
    fn default() -> Self {
        Self {
            linear_only: false,
            planarity_tol: 1e-9,
            solver: SolveOptions {
                max_iters: 50,
                ..SolveOptions::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseSolution {
    pub pose: ExtrinsicPose,
    /// RMS pixel distance between detections and reprojected model points.
    pub rms_error: Real,
    pub converged: bool,
}

/// Solve the pose of the target in the camera frame.
///
/// Detections are undistorted to normalised coordinates; planar models are
/// initialised from a homography, others from a DLT projection matrix
/// (at least 6 points). The estimate is then refined on pixel residuals.
/// Identical inputs give identical outputs.
pub fn solve_pose(
    view: &CorrespondenceView,
    model: &IntrinsicModel,
    opts: &PoseSolverOptions,
) -> Result<PoseSolution, PoseError> {
    if view.len() < MIN_POSE_POINTS {
        return Err(PoseError::NotEnoughPoints {
            got: view.len(),
            need: MIN_POSE_POINTS,
        });
    }
    if let Some(idx) = view
        .image_points()
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite()))
    {
        return Err(PoseError::NonFiniteDetection(idx));
    }

    let normalized: Vec<Pt2> = view
        .image_points()
        .iter()
        .map(|uv| model.pixel_to_normalized(uv))
        .collect();

    let init = if view.is_planar(opts.planarity_tol) {
        let h = dlt_homography(&view.planar_points(), &normalized).map_err(PoseInitError::from)?;
        pose_from_homography(&Matrix3::identity(), &h)?
    } else {
        dlt_pose(view.model_points(), &normalized)?
    };
    let init = ExtrinsicPose::from_isometry(&init);

    let (pose, converged) = if opts.linear_only {
        (init, true)
    } else {
        let (pose, report) = refine_pose(&LmBackend, view, model, &init, &opts.solver);
        debug!(
            "pose refinement: {} evaluations, cost {:.3e}, {}",
            report.evaluations, report.final_cost, report.termination
        );
        (pose, report.converged)
    };

    let predicted = project_points(view.model_points(), &pose, model);
    Ok(PoseSolution {
        pose,
        rms_error: rms_distance(view.image_points(), &predicted),
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arpose_core::{PinholeIntrinsics, Pt3, TargetGeometry, TargetModel, Vec3};

    fn camera() -> IntrinsicModel {
        IntrinsicModel::pinhole(PinholeIntrinsics::new(800.0, 800.0, 320.0, 240.0).unwrap())
    }

    #[test]
    fn three_points_is_insufficient() {
        let view = CorrespondenceView::new(
            vec![Pt3::origin(), Pt3::new(1.0, 0.0, 0.0), Pt3::new(0.0, -1.0, 0.0)],
            vec![Pt2::new(1.0, 1.0), Pt2::new(2.0, 1.0), Pt2::new(1.0, 2.0)],
        )
        .unwrap();
        let err = solve_pose(&view, &camera(), &PoseSolverOptions::default()).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn collinear_points_give_no_pose() {
        let model: Vec<Pt3> = (0..6).map(|i| Pt3::new(i as Real, 0.0, 0.0)).collect();
        let image: Vec<Pt2> = (0..6)
            .map(|i| Pt2::new(100.0 + 20.0 * i as Real, 200.0))
            .collect();
        let view = CorrespondenceView::new(model, image).unwrap();
        assert!(solve_pose(&view, &camera(), &PoseSolverOptions::default()).is_err());
    }

    #[test]
    fn linear_estimate_is_exact_without_noise() {
        let cam = camera();
        let target = TargetModel::new(TargetGeometry::new(6, 9).unwrap());
        let truth = ExtrinsicPose::new(Vec3::new(0.1, -0.2, 0.05), Vec3::new(-4.0, 2.5, 20.0));
        let view = target
            .pair(project_points(target.points(), &truth, &cam))
            .unwrap();
        let opts = PoseSolverOptions {
            linear_only: true,
            ..PoseSolverOptions::default()
        };
        let sol = solve_pose(&view, &cam, &opts).unwrap();
        assert!((sol.pose.tvec - truth.tvec).norm() < 1e-6);
        assert!(sol.rms_error < 1e-6, "rms {}", sol.rms_error);
    }
}
