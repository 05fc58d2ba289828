//! Non-linear refinement on top of the `levenberg-marquardt` crate.
//!
//! Problems implement [`NllsProblem`] and are minimised by an
//! [`NllsSolverBackend`]; [`LmBackend`] is the only backend. Residuals are
//! written once over `RealField` in [`reprojection`] and differentiated with
//! `num-dual`.

mod backend_lm;
pub mod params;
pub mod planar_intrinsics;
pub mod pose_refine;
pub mod reprojection;
mod traits;

pub use backend_lm::LmBackend;
pub use traits::*;
