//! High-level entry crate for `arpose`.
//!
//! Calibrate a camera from views of a chessboard, persist the result, then
//! estimate the board's pose in new frames and draw 3-D shapes on it.
//!
//! ## Calibration
//!
//! ```no_run
//! use arpose::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let target = TargetModel::new(TargetGeometry::new(6, 9)?);
//! let detections: Vec<Vec<Pt2>> = /* row-major corners, one list per view */
//! # vec![];
//! let samples = detections
//!     .into_iter()
//!     .map(|corners| target.pair(corners))
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let report = calibrate(&samples, ImageSize::new(640, 480), &EstimatorOptions::default())?;
//! println!("rms reprojection error: {:.3} px", report.rms_error);
//! save_calibration("calibration.txt", &report.model)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Pose and overlay
//!
//! ```no_run
//! use arpose::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = load_calibration("calibration.txt")?;
//! let target = TargetModel::new(TargetGeometry::new(6, 9)?);
//! # let (mut frame, corners) = (Frame::new(640, 480), Vec::<Pt2>::new());
//! let view = target.pair(corners)?;
//!
//! let solution = solve_pose(&view, &model, &PoseSolverOptions::default())?;
//! let ctx = RenderContext::new(model, OverlayStyle::default());
//! ctx.draw_shape(&mut frame, &ShapeTemplate::axes(), &solution.pose);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - **[`core`]**: math types, camera model, target model, projection
//! - **[`linear`]**: closed-form initialisation (homography, focal, pose)
//! - **[`optim`]**: non-linear least squares and the calibration problems
//! - **[`pipeline`]**: estimator, pose solver, parameter store, session,
//!   frame loop and overlay
//! - **[`prelude`]**: convenient re-exports for common use cases

/// Core math types, camera model, target model and projection.
pub mod core {
    pub use arpose_core::*;
}

/// Closed-form initialisation algorithms.
pub mod linear {
    pub use arpose_linear::*;
}

/// Non-linear least-squares problems and the LM backend.
pub mod optim {
    pub use arpose_optim::*;
}

/// Calibration, pose solving, persistence, session and frame pipeline.
pub mod pipeline {
    pub use arpose_pipeline::*;
}

/// Import with `use arpose::prelude::*;` to get started quickly.
pub mod prelude {
    pub use crate::core::{
        project_points, DistortionCoeffs, ExtrinsicPose, IntrinsicModel, PinholeIntrinsics, Pt2,
        Pt3, Real, TargetGeometry, TargetModel,
    };

    pub use crate::pipeline::overlay::{OverlayConfig, OverlayStyle, RenderContext, ShapeTemplate};
    pub use crate::pipeline::{
        calibrate, load_calibration, run_frame_loop, save_calibration, solve_pose,
        CalibrationReport, CalibrationSession, EstimatorOptions, Frame, ImageSize,
        PoseSolverOptions, SessionCommand, SessionConfig,
    };
}
