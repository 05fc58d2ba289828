//! Core math and geometry primitives for `arpose`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Pt2`, `Pt3`, `Mat3`, ...),
//! - the intrinsic camera model (pinhole + radial-tangential distortion),
//! - Rodrigues-encoded extrinsic poses,
//! - the chessboard target model and model/image correspondences,
//! - projection of target-frame geometry into pixels.
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ perspective_divide ∘ pose(point)`

/// Stderr logger for binaries.
pub mod logger;
/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera intrinsics and distortion.
pub mod models;
mod pose;
mod projection;
/// Synthetic datasets.
pub mod synthetic;
mod target;
mod types;

pub use math::*;
pub use models::*;
pub use pose::*;
pub use projection::*;
pub use target::*;
pub use types::*;
