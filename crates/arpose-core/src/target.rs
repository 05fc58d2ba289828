//! Canonical model points of the planar chessboard target.
//!
//! Inner corners are laid out one unit apart in row-major order. Row `i`,
//! column `j` maps to `(j, -i, 0)`, so the target's "up" direction points
//! toward decreasing row index and the frame stays right-handed with `+z`
//! leaving the board face. Overlay geometry is authored in this frame.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CorrespondenceError, CorrespondenceView, Pt2, Pt3, Real};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("target geometry needs at least 2x2 inner corners, got {rows}x{cols}")]
pub struct TargetGeometryError {
    pub rows: usize,
    pub cols: usize,
}

/// Number of inner feature points along each axis of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry")]
pub struct TargetGeometry {
    rows: usize,
    cols: usize,
}

#[derive(Deserialize)]
struct RawGeometry {
    rows: usize,
    cols: usize,
}

impl TryFrom<RawGeometry> for TargetGeometry {
    type Error = TargetGeometryError;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        Self::new(raw.rows, raw.cols)
    }
}

impl TargetGeometry {
    pub fn new(rows: usize, cols: usize) -> Result<Self, TargetGeometryError> {
        if rows < 2 || cols < 2 {
            return Err(TargetGeometryError { rows, cols });
        }
        Ok(Self { rows, cols })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn point_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Row-major index of the corner at row `i`, column `j`.
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.cols + j
    }
}

/// Model points for a geometry, `(j, -i, 0)` for row `i` and column `j`.
pub fn model_points(geometry: TargetGeometry) -> Vec<Pt3> {
    let mut points = Vec::with_capacity(geometry.point_count());
    for i in 0..geometry.rows {
        for j in 0..geometry.cols {
            points.push(Pt3::new(j as Real, -(i as Real), 0.0));
        }
    }
    points
}

/// Immutable model of a target, shared across every sample observing it.
#[derive(Debug, Clone)]
pub struct TargetModel {
    geometry: TargetGeometry,
    points: Arc<[Pt3]>,
}

impl TargetModel {
    pub fn new(geometry: TargetGeometry) -> Self {
        Self {
            geometry,
            points: model_points(geometry).into(),
        }
    }

    pub fn geometry(&self) -> TargetGeometry {
        self.geometry
    }

    pub fn points(&self) -> &[Pt3] {
        &self.points
    }

    pub fn shared_points(&self) -> Arc<[Pt3]> {
        Arc::clone(&self.points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Pair ordered detections with the model points.
    ///
    /// Detections must follow the same row-major order as the model.
    pub fn pair(&self, detections: Vec<Pt2>) -> Result<CorrespondenceView, CorrespondenceError> {
        CorrespondenceView::new(self.shared_points(), detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_point_layout() {
        for (rows, cols) in [(2, 2), (3, 5), (6, 9), (9, 6)] {
            let g = TargetGeometry::new(rows, cols).unwrap();
            let pts = model_points(g);
            assert_eq!(pts.len(), rows * cols);
            for i in 0..rows {
                for j in 0..cols {
                    assert_eq!(pts[i * cols + j], Pt3::new(j as Real, -(i as Real), 0.0));
                }
            }
        }
    }

    #[test]
    fn nine_by_six_has_54_points() {
        let model = TargetModel::new(TargetGeometry::new(9, 6).unwrap());
        assert_eq!(model.len(), 54);
        assert_eq!(model.points()[53], Pt3::new(5.0, -8.0, 0.0));
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        assert!(TargetGeometry::new(1, 9).is_err());
        assert!(TargetGeometry::new(6, 0).is_err());
        assert!(serde_json::from_str::<TargetGeometry>(r#"{"rows":1,"cols":4}"#).is_err());
    }

    #[test]
    fn samples_share_model_storage() {
        let model = TargetModel::new(TargetGeometry::new(2, 2).unwrap());
        let det = vec![Pt2::origin(); 4];
        let a = model.pair(det.clone()).unwrap();
        let b = model.pair(det).unwrap();
        assert!(std::ptr::eq(a.model_points(), b.model_points()));
        assert!(model.pair(vec![Pt2::origin(); 3]).is_err());
    }
}
