//! Intrinsic calibration from several views of the planar target.
//!
//! 1. Plane homography per sample (normalised DLT).
//! 2. Principal point at the image centre, focal length from the
//!    homographies with `fx / fy = 1`, zero distortion.
//! 3. Per-sample poses from homography decomposition.
//! 4. Levenberg–Marquardt over intrinsics and all poses at once.
//!
//! Every call starts from scratch; nothing from a previous fit is reused.

use arpose_core::{
    project_points, rms_distance, CorrespondenceView, DistortionCoeffs, ExtrinsicPose,
    IntrinsicModel, IntrinsicsError, ModelError, PinholeIntrinsics, Real,
};
use arpose_linear::{
    dlt_homography, estimate_focal_fixed_center, pose_from_homography, FocalInitError,
    HomographyError, PoseInitError,
};
use arpose_optim::params::{IntrinsicsFixMask, IntrinsicsLayout};
use arpose_optim::planar_intrinsics::{refine_planar_intrinsics, PlanarIntrinsicsProblem};
use arpose_optim::{LmBackend, SolveOptions};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fewest samples a calibration is attempted with.
pub const MIN_CALIBRATION_SAMPLES: usize = 5;
/// Fewest correspondences a single sample must carry.
pub const MIN_POINTS_PER_SAMPLE: usize = 4;

const PLANARITY_TOL: Real = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorOptions {
    /// Constrain `fx = fy`.
    pub fix_aspect_ratio: bool,
    /// Keep the principal point at the image centre.
    pub fix_principal_point: bool,
    /// Hold the tangential coefficients at zero.
    pub zero_tangent_dist: bool,
    /// Hold `k3` at zero.
    pub fix_k3: bool,
    /// Estimate the 8-coefficient rational model instead of 5 coefficients.
    pub rational_model: bool,
    pub solver: SolveOptions,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            fix_aspect_ratio: true,
            fix_principal_point: false,
            zero_tangent_dist: false,
            fix_k3: false,
            rational_model: false,
            solver: SolveOptions {
                max_iters: 100,
                ftol: 1e-12,
                xtol: 1e-10,
                gtol: 1e-12,
            },
        }
    }
}

impl EstimatorOptions {
    fn fix_mask(&self) -> IntrinsicsFixMask {
        IntrinsicsFixMask {
            aspect_ratio: self.fix_aspect_ratio,
            principal_point: self.fix_principal_point,
            tangential: self.zero_tangent_dist,
            k3: self.fix_k3,
        }
    }

    fn distortion_len(&self) -> usize {
        if self.rational_model {
            8
        } else {
            5
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("insufficient samples: have {got}, need at least {need}")]
    InsufficientSamples { got: usize, need: usize },
    #[error("sample {sample} has {got} points, need at least {min}", min = MIN_POINTS_PER_SAMPLE)]
    TooFewPoints { sample: usize, got: usize },
    #[error("sample {sample} is not a planar target (model points must have z = 0)")]
    NonPlanarTarget { sample: usize },
    #[error("invalid image size {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
    #[error("homography for sample {sample}: {source}")]
    Homography {
        sample: usize,
        #[source]
        source: HomographyError,
    },
    #[error("focal length initialisation: {0}")]
    FocalInit(#[from] FocalInitError),
    #[error("initial pose for sample {sample}: {source}")]
    PoseInit {
        sample: usize,
        #[source]
        source: PoseInitError,
    },
    #[error("initial intrinsics are invalid: {0}")]
    InvalidInitialModel(#[source] IntrinsicsError),
    /// The refinement left the valid parameter region.
    #[error("refined intrinsics are invalid: {0}")]
    InvalidFit(#[source] ModelError),
}

impl CalibrationError {
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            CalibrationError::InsufficientSamples { .. } | CalibrationError::TooFewPoints { .. }
        )
    }
}

/// Result of one calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub model: IntrinsicModel,
    /// One pose per input sample, in input order.
    pub poses: Vec<ExtrinsicPose>,
    /// RMS pixel distance over all points of all samples.
    pub rms_error: Real,
    pub per_view_rms: Vec<Real>,
    pub image_size: ImageSize,
    pub converged: bool,
    pub evaluations: usize,
    pub final_cost: Real,
    pub termination: String,
}

/// Calibrate intrinsics from `samples` taken at `image_size`.
///
/// Non-convergence is not an error: the best parameters found are returned
/// with `converged = false`, and `rms_error` tells whether they are usable.
pub fn calibrate(
    samples: &[CorrespondenceView],
    image_size: ImageSize,
    opts: &EstimatorOptions,
) -> Result<CalibrationReport, CalibrationError> {
    if samples.len() < MIN_CALIBRATION_SAMPLES {
        return Err(CalibrationError::InsufficientSamples {
            got: samples.len(),
            need: MIN_CALIBRATION_SAMPLES,
        });
    }
    if image_size.width == 0 || image_size.height == 0 {
        return Err(CalibrationError::InvalidImageSize {
            width: image_size.width,
            height: image_size.height,
        });
    }
    for (sample, view) in samples.iter().enumerate() {
        if view.len() < MIN_POINTS_PER_SAMPLE {
            return Err(CalibrationError::TooFewPoints {
                sample,
                got: view.len(),
            });
        }
        if !view.is_planar(PLANARITY_TOL) {
            return Err(CalibrationError::NonPlanarTarget { sample });
        }
    }

    let homographies = samples
        .iter()
        .enumerate()
        .map(|(sample, view)| {
            dlt_homography(&view.planar_points(), view.image_points())
                .map_err(|source| CalibrationError::Homography { sample, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let cx = Real::from(image_size.width) * 0.5;
    let cy = Real::from(image_size.height) * 0.5;
    let (fx, fy) = estimate_focal_fixed_center(&homographies, cx, cy, 1.0)?;
    let init = IntrinsicModel::new(
        PinholeIntrinsics::new(fx, fy, cx, cy).map_err(CalibrationError::InvalidInitialModel)?,
        DistortionCoeffs::zeros(opts.distortion_len()),
    );
    debug!("initial intrinsics: fx={fx:.3} fy={fy:.3} cx={cx:.1} cy={cy:.1}");

    let kmtx = init.camera_matrix();
    let init_poses = homographies
        .iter()
        .enumerate()
        .map(|(sample, h)| {
            pose_from_homography(&kmtx, h)
                .map(|iso| ExtrinsicPose::from_isometry(&iso))
                .map_err(|source| CalibrationError::PoseInit { sample, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let layout = IntrinsicsLayout::new(init, opts.fix_mask());
    let problem = PlanarIntrinsicsProblem::new(samples, layout);
    let fit = refine_planar_intrinsics(&LmBackend, &problem, &init, &init_poses, &opts.solver);
    check_fitted_model(&fit.model)?;

    let mut sum_sq = 0.0;
    let mut count = 0usize;
    let per_view_rms = samples
        .iter()
        .zip(&fit.poses)
        .map(|(view, pose)| {
            let predicted = project_points(view.model_points(), pose, &fit.model);
            let rms = rms_distance(view.image_points(), &predicted);
            sum_sq += rms * rms * view.len() as Real;
            count += view.len();
            rms
        })
        .collect();
    let rms_error = (sum_sq / count as Real).sqrt();

    if !fit.report.converged {
        warn!(
            "calibration did not converge ({}); returning best estimate with rms {rms_error:.4}px",
            fit.report.termination
        );
    }
    info!("calibrated from {} samples", samples.len());
    info!("camera matrix:{}", fit.model.camera_matrix());
    info!("distortion coefficients: {:?}", fit.model.dist.as_slice());
    info!("rms reprojection error: {rms_error:.4}px");

    Ok(CalibrationReport {
        model: fit.model,
        poses: fit.poses,
        rms_error,
        per_view_rms,
        image_size,
        converged: fit.report.converged,
        evaluations: fit.report.evaluations,
        final_cost: fit.report.final_cost,
        termination: fit.report.termination,
    })
}

/// Reject a refined model that violates the camera-matrix invariants, so it
/// is never reported or persisted.
fn check_fitted_model(model: &IntrinsicModel) -> Result<(), CalibrationError> {
    model.validate().map_err(|e| {
        warn!("refined model rejected: {e}");
        CalibrationError::InvalidFit(e)
    })
}
