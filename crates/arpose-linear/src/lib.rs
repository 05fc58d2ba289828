//! Closed-form initialisers used to seed the non-linear refinements.
//!
//! - [`dlt_homography`]: normalised DLT plane homography,
//! - [`estimate_focal_fixed_center`]: focal length from homographies with a
//!   known principal point and aspect ratio,
//! - [`pose_from_homography`]: pose of a planar target,
//! - [`dlt_pose`]: pose of a general 3D point set.

use thiserror::Error;

mod dlt_pose;
mod focal_init;
mod homography;
pub mod math;
mod planar_pose;

pub use dlt_pose::*;
pub use focal_init::*;
pub use homography::*;
pub use planar_pose::*;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoseInitError {
    #[error("need at least {need} point correspondences, got {got}")]
    NotEnoughPoints { got: usize, need: usize },
    #[error("point counts differ: {world} model points vs {image} image points")]
    CountMismatch { world: usize, image: usize },
    #[error("degenerate configuration: {0}")]
    Degenerate(&'static str),
    #[error(transparent)]
    Homography(#[from] HomographyError),
    #[error("camera matrix is not invertible")]
    SingularIntrinsics,
    #[error("svd failed")]
    SvdFailed,
}

impl PoseInitError {
    /// Whether the failure stems from too little data rather than bad data.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            PoseInitError::NotEnoughPoints { .. }
                | PoseInitError::Homography(HomographyError::NotEnoughPoints(_))
        )
    }
}

