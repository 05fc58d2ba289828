//! Radial-tangential lens distortion in OpenCV coefficient order.
//!
//! Coefficients are stored as `k1 k2 p1 p2 k3 [k4 k5 k6]`. Between five and
//! eight values are accepted; with more than five the radial factor becomes
//! the rational model
//!
//! ```text
//! (1 + k1 r² + k2 r⁴ + k3 r⁶) / (1 + k4 r² + k5 r⁴ + k6 r⁶)
//! ```
//!
//! Missing trailing coefficients are zero, so the five-term Brown–Conrady
//! model is the special case `k4 = k5 = k6 = 0`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Real, Vec2};

pub const MIN_DISTORTION_COEFFS: usize = 5;
pub const MAX_DISTORTION_COEFFS: usize = 8;

const UNDISTORT_ITERS: usize = 20;
const UNDISTORT_TOL: Real = 1e-14;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistortionError {
    #[error("expected at least {min} distortion coefficients, got {0}", min = MIN_DISTORTION_COEFFS)]
    TooFew(usize),
    #[error("at most {max} distortion coefficients are supported, got {0}", max = MAX_DISTORTION_COEFFS)]
    TooMany(usize),
    #[error("distortion coefficient {0} is not finite")]
    NonFinite(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Real>", into = "Vec<Real>")]
pub struct DistortionCoeffs {
    coeffs: [Real; MAX_DISTORTION_COEFFS],
    len: usize,
}

impl Default for DistortionCoeffs {
    fn default() -> Self {
        Self::zeros(MIN_DISTORTION_COEFFS)
    }
}

impl DistortionCoeffs {
    /// All-zero coefficients of the given length (clamped to `5..=8`).
    pub fn zeros(len: usize) -> Self {
        Self {
            coeffs: [0.0; MAX_DISTORTION_COEFFS],
            len: len.clamp(MIN_DISTORTION_COEFFS, MAX_DISTORTION_COEFFS),
        }
    }

    pub fn brown_conrady(k1: Real, k2: Real, p1: Real, p2: Real, k3: Real) -> Self {
        let mut d = Self::zeros(MIN_DISTORTION_COEFFS);
        d.coeffs[..5].copy_from_slice(&[k1, k2, p1, p2, k3]);
        d
    }

    pub fn from_slice(values: &[Real]) -> Result<Self, DistortionError> {
        if values.len() < MIN_DISTORTION_COEFFS {
            return Err(DistortionError::TooFew(values.len()));
        }
        if values.len() > MAX_DISTORTION_COEFFS {
            return Err(DistortionError::TooMany(values.len()));
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(DistortionError::NonFinite(idx));
        }
        let mut coeffs = [0.0; MAX_DISTORTION_COEFFS];
        coeffs[..values.len()].copy_from_slice(values);
        Ok(Self {
            coeffs,
            len: values.len(),
        })
    }

    /// Same coefficients, extended with zeros or truncated to `len`
    /// (clamped to `5..=8`).
    pub fn with_len(&self, len: usize) -> Self {
        let len = len.clamp(MIN_DISTORTION_COEFFS, MAX_DISTORTION_COEFFS);
        let mut coeffs = self.coeffs;
        coeffs[len..].fill(0.0);
        Self { coeffs, len }
    }

    /// Overwrite coefficient `idx`; indices past [`Self::len`] are ignored.
    pub fn set(&mut self, idx: usize, value: Real) {
        if idx < self.len {
            self.coeffs[idx] = value;
        }
    }

    pub fn as_slice(&self) -> &[Real] {
        &self.coeffs[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_rational(&self) -> bool {
        self.len > MIN_DISTORTION_COEFFS
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|c| *c == 0.0)
    }

    pub fn k1(&self) -> Real {
        self.coeffs[0]
    }
    pub fn k2(&self) -> Real {
        self.coeffs[1]
    }
    pub fn p1(&self) -> Real {
        self.coeffs[2]
    }
    pub fn p2(&self) -> Real {
        self.coeffs[3]
    }
    pub fn k3(&self) -> Real {
        self.coeffs[4]
    }

    /// Apply distortion to normalised image-plane coordinates.
    pub fn distort(&self, n: &Vec2) -> Vec2 {
        let [k1, k2, p1, p2, k3, k4, k5, k6] = self.coeffs;
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = (1.0 + k1 * r2 + k2 * r4 + k3 * r6) / (1.0 + k4 * r2 + k5 * r4 + k6 * r6);
        let x_t = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let y_t = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
        Vec2::new(x * radial + x_t, y * radial + y_t)
    }

    /// Invert [`Self::distort`] by fixed-point iteration.
    pub fn undistort(&self, d: &Vec2) -> Vec2 {
        if self.is_zero() {
            return *d;
        }
        let [k1, k2, p1, p2, k3, k4, k5, k6] = self.coeffs;
        let mut x = d.x;
        let mut y = d.y;
        for _ in 0..UNDISTORT_ITERS {
            let r2 = x * x + y * y;
            let r4 = r2 * r2;
            let r6 = r4 * r2;
            let inv_radial =
                (1.0 + k4 * r2 + k5 * r4 + k6 * r6) / (1.0 + k1 * r2 + k2 * r4 + k3 * r6);
            let x_t = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
            let y_t = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;

            let x_new = (d.x - x_t) * inv_radial;
            let y_new = (d.y - y_t) * inv_radial;
            let step = (x_new - x).abs().max((y_new - y).abs());
            x = x_new;
            y = y_new;
            if step < UNDISTORT_TOL {
                break;
            }
        }
        Vec2::new(x, y)
    }
}

impl TryFrom<Vec<Real>> for DistortionCoeffs {
    type Error = DistortionError;

    fn try_from(values: Vec<Real>) -> Result<Self, Self::Error> {
        Self::from_slice(&values)
    }
}

impl From<DistortionCoeffs> for Vec<Real> {
    fn from(d: DistortionCoeffs) -> Self {
        d.as_slice().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficient_count_bounds() {
        assert_eq!(
            DistortionCoeffs::from_slice(&[0.1, 0.0, 0.0, 0.0]),
            Err(DistortionError::TooFew(4))
        );
        assert_eq!(
            DistortionCoeffs::from_slice(&[0.0; 9]),
            Err(DistortionError::TooMany(9))
        );
        let d = DistortionCoeffs::from_slice(&[0.1, -0.2, 0.0, 0.0, 0.05, 0.0, 0.0, 0.01]).unwrap();
        assert_eq!(d.len(), 8);
        assert!(d.is_rational());
    }

    #[test]
    fn undistort_inverts_distort() {
        let d = DistortionCoeffs::from_slice(&[-0.21, 0.08, 1e-3, -5e-4, -0.01, 0.02, 0.0, 0.001])
            .unwrap();
        for &(x, y) in &[(0.0, 0.0), (0.2, -0.1), (-0.35, 0.25), (0.4, 0.3)] {
            let n = Vec2::new(x, y);
            let back = d.undistort(&d.distort(&n));
            assert!(
                (back - n).norm() < 1e-9,
                "undistort mismatch at ({x}, {y}): {back:?}"
            );
        }
    }

    #[test]
    fn serde_uses_plain_sequence() {
        let d = DistortionCoeffs::brown_conrady(0.1, 0.01, 0.0, 0.0, -0.001);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "[0.1,0.01,0.0,0.0,-0.001]");
        let back: DistortionCoeffs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
        assert!(serde_json::from_str::<DistortionCoeffs>("[0.1, 0.2]").is_err());
    }
}
