//! Camera model: pinhole intrinsics composed with radial-tangential distortion.

mod camera;
mod distortion;
mod intrinsics;

pub use camera::*;
pub use distortion::*;
pub use intrinsics::*;
