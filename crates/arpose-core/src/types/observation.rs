//! Point correspondences between target model points and image detections.
//!
//! A [`CorrespondenceView`] keeps model points and detections side by side
//! but only hands them out as [`Correspondence`] records, so the index
//! pairing fixed at construction cannot be broken afterwards.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Pt2, Pt3, Real};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrespondenceError {
    #[error("model / image point counts must match: {model} vs {image}")]
    CountMismatch { model: usize, image: usize },
}

/// One model point and the image point it was detected at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub model: Pt3,
    pub image: Pt2,
}

/// Ordered correspondences observed in one frame.
///
/// Model points are reference-counted so that every sample taken against
/// the same target shares one allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawView", into = "RawView")]
pub struct CorrespondenceView {
    model: Arc<[Pt3]>,
    image: Vec<Pt2>,
}

#[derive(Serialize, Deserialize)]
struct RawView {
    points_3d: Vec<Pt3>,
    points_2d: Vec<Pt2>,
}

impl TryFrom<RawView> for CorrespondenceView {
    type Error = CorrespondenceError;

    fn try_from(raw: RawView) -> Result<Self, Self::Error> {
        Self::new(raw.points_3d, raw.points_2d)
    }
}

impl From<CorrespondenceView> for RawView {
    fn from(view: CorrespondenceView) -> Self {
        RawView {
            points_3d: view.model.to_vec(),
            points_2d: view.image,
        }
    }
}

impl CorrespondenceView {
    /// Pair model points with image points index-for-index.
    ///
    /// # Errors
    ///
    /// Returns [`CorrespondenceError::CountMismatch`] if the counts differ.
    pub fn new(
        model: impl Into<Arc<[Pt3]>>,
        image: Vec<Pt2>,
    ) -> Result<Self, CorrespondenceError> {
        let model = model.into();
        if model.len() != image.len() {
            return Err(CorrespondenceError::CountMismatch {
                model: model.len(),
                image: image.len(),
            });
        }
        Ok(Self { model, image })
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = Correspondence>) -> Self {
        let (model, image): (Vec<Pt3>, Vec<Pt2>) =
            pairs.into_iter().map(|c| (c.model, c.image)).unzip();
        Self {
            model: model.into(),
            image,
        }
    }

    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<Correspondence> {
        Some(Correspondence {
            model: *self.model.get(idx)?,
            image: *self.image.get(idx)?,
        })
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Correspondence> + '_ {
        self.model
            .iter()
            .zip(&self.image)
            .map(|(m, i)| Correspondence {
                model: *m,
                image: *i,
            })
    }

    pub fn model_points(&self) -> &[Pt3] {
        &self.model
    }

    pub fn image_points(&self) -> &[Pt2] {
        &self.image
    }

    /// Model points projected onto the target plane (`z` dropped).
    pub fn planar_points(&self) -> Vec<Pt2> {
        self.model.iter().map(|p| Pt2::new(p.x, p.y)).collect()
    }

    /// Whether every model point lies on `z = 0` within `tol`.
    pub fn is_planar(&self, tol: Real) -> bool {
        self.model.iter().all(|p| p.z.abs() <= tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_stay_aligned() {
        let view = CorrespondenceView::new(
            vec![Pt3::new(0.0, 0.0, 0.0), Pt3::new(1.0, 0.0, 0.0)],
            vec![Pt2::new(320.0, 240.0), Pt2::new(400.0, 240.0)],
        )
        .unwrap();
        let pairs: Vec<_> = view.iter().collect();
        assert_eq!(pairs[1].model, Pt3::new(1.0, 0.0, 0.0));
        assert_eq!(pairs[1].image, Pt2::new(400.0, 240.0));
        assert_eq!(CorrespondenceView::from_pairs(pairs), view);
    }

    #[test]
    fn mismatch_is_rejected() {
        let err = CorrespondenceView::new(vec![Pt3::origin(); 3], vec![Pt2::origin(); 2]);
        assert_eq!(
            err,
            Err(CorrespondenceError::CountMismatch { model: 3, image: 2 })
        );
    }

    #[test]
    fn json_shape_is_validated() {
        let ok = r#"{"points_3d":[[0.0,0.0,0.0]],"points_2d":[[1.0,2.0]]}"#;
        let view: CorrespondenceView = serde_json::from_str(ok).unwrap();
        assert_eq!(view.len(), 1);
        let bad = r#"{"points_3d":[[0.0,0.0,0.0]],"points_2d":[]}"#;
        assert!(serde_json::from_str::<CorrespondenceView>(bad).is_err());
    }
}
