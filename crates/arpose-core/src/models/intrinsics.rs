use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Mat3, Pt2, Real};

const STRUCTURE_EPS: Real = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntrinsicsError {
    #[error("camera matrix entry ({row}, {col}) must be {expected}, got {value}")]
    Structure {
        row: usize,
        col: usize,
        expected: Real,
        value: Real,
    },
    #[error("focal lengths must be positive and finite, got fx={fx}, fy={fy}")]
    NonPositiveFocal { fx: Real, fy: Real },
    #[error("camera matrix contains a non-finite entry")]
    NonFinite,
}

/// Pinhole intrinsics without skew.
///
/// The corresponding camera matrix `K` has the form:
///
/// ```text
/// [ fx   0  cx ]
/// [  0  fy  cy ]
/// [  0   0   1 ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    pub fx: Real,
    pub fy: Real,
    pub cx: Real,
    pub cy: Real,
}

impl PinholeIntrinsics {
    pub fn new(fx: Real, fy: Real, cx: Real, cy: Real) -> Result<Self, IntrinsicsError> {
        let k = Self { fx, fy, cx, cy };
        k.validate()?;
        Ok(k)
    }

    /// Build the 3×3 camera matrix `K`.
    pub fn camera_matrix(&self) -> Mat3 {
        Mat3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// Construct intrinsics from a 3×3 camera matrix.
    ///
    /// Unlike a projective normalisation, the matrix is taken as-is: the
    /// bottom row must already be `0 0 1` and both the skew entry and the
    /// `(1, 0)` entry must be zero.
    pub fn try_from_camera_matrix(k: &Mat3) -> Result<Self, IntrinsicsError> {
        if k.iter().any(|v| !v.is_finite()) {
            return Err(IntrinsicsError::NonFinite);
        }

        let expected = [
            (0, 1, 0.0),
            (1, 0, 0.0),
            (2, 0, 0.0),
            (2, 1, 0.0),
            (2, 2, 1.0),
        ];
        for (row, col, want) in expected {
            let value = k[(row, col)];
            if (value - want).abs() > STRUCTURE_EPS {
                return Err(IntrinsicsError::Structure {
                    row,
                    col,
                    expected: want,
                    value,
                });
            }
        }

        Self::new(k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)])
    }

    pub fn validate(&self) -> Result<(), IntrinsicsError> {
        if ![self.fx, self.fy, self.cx, self.cy]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(IntrinsicsError::NonFinite);
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(IntrinsicsError::NonPositiveFocal {
                fx: self.fx,
                fy: self.fy,
            });
        }
        Ok(())
    }

    /// Map normalised image-plane coordinates to pixels.
    #[inline]
    pub fn to_pixel(&self, x: Real, y: Real) -> Pt2 {
        Pt2::new(self.fx * x + self.cx, self.fy * y + self.cy)
    }

    /// Map pixels to normalised image-plane coordinates.
    #[inline]
    pub fn to_normalized(&self, uv: &Pt2) -> (Real, Real) {
        ((uv.x - self.cx) / self.fx, (uv.y - self.cy) / self.fy)
    }

    pub fn aspect_ratio(&self) -> Real {
        self.fx / self.fy
    }
}
