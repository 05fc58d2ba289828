//! Seeded pixel noise that does not depend on an RNG crate's internals.
//!
//! Each `(view, point)` key is hashed with SplitMix64, so a dataset is
//! reproducible across platforms and independent of generation order.

use crate::{Pt2, Real, Vec2};

/// Uniform per-axis pixel noise in `[-max_abs_px, +max_abs_px)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelNoise {
    pub seed: u64,
    pub max_abs_px: Real,
}

impl PixelNoise {
    pub fn new(seed: u64, max_abs_px: Real) -> Self {
        Self { seed, max_abs_px }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn sample(&self, view_idx: usize, point_idx: usize) -> Vec2 {
        let amp = self.max_abs_px.abs();
        if amp == 0.0 {
            return Vec2::zeros();
        }
        let key = self.seed
            ^ (view_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (point_idx as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        let u = unit_interval(splitmix64(key));
        let v = unit_interval(splitmix64(key.rotate_left(17) ^ 0x94D0_49BB_1331_11EB));
        Vec2::new((2.0 * u - 1.0) * amp, (2.0 * v - 1.0) * amp)
    }

    pub fn apply(&self, view_idx: usize, point_idx: usize, uv: Pt2) -> Pt2 {
        uv + self.sample(view_idx, point_idx)
    }
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Top 53 bits mapped to `[0, 1)`.
fn unit_interval(x: u64) -> Real {
    (x >> 11) as Real / (1u64 << 53) as Real
}
