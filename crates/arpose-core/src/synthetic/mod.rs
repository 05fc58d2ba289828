//! Deterministic synthetic observations for tests and demos.
//!
//! - pose generators that keep the target centred in view,
//! - projection of a [`crate::TargetModel`] into [`crate::CorrespondenceView`]s,
//! - seeded uniform pixel noise.
//!
//! # Example
//!
//! ```
//! use arpose_core::synthetic::{noise::PixelNoise, planar};
//! use arpose_core::{IntrinsicModel, PinholeIntrinsics, TargetGeometry, TargetModel};
//!
//! let model = IntrinsicModel::pinhole(PinholeIntrinsics::new(800.0, 800.0, 320.0, 240.0).unwrap());
//! let target = TargetModel::new(TargetGeometry::new(6, 9).unwrap());
//! let poses = planar::orbit_poses(target.geometry(), 5, 20.0, 0.35);
//! let views = planar::project_views(&model, &target, &poses, &PixelNoise::new(7, 0.5)).unwrap();
//! assert_eq!(views.len(), 5);
//! ```

pub mod noise;
pub mod planar;
