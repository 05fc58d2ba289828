//! Projection of target-frame geometry into the image.

use crate::{rms_distance, CorrespondenceView, ExtrinsicPose, IntrinsicModel, Pt2, Pt3, Real};

/// Project a single target-frame point to pixels.
#[inline]
pub fn project_point(p: &Pt3, pose: &ExtrinsicPose, model: &IntrinsicModel) -> Pt2 {
    model.project(&pose.transform_point(p))
}

/// Project target-frame points to pixels, preserving order.
///
/// The transform is total: points behind the camera are still mapped, and
/// clipping is left to the renderer.
pub fn project_points(points: &[Pt3], pose: &ExtrinsicPose, model: &IntrinsicModel) -> Vec<Pt2> {
    let rot = pose.rotation();
    points
        .iter()
        .map(|p| model.project(&(rot * p + pose.tvec)))
        .collect()
}

/// RMS pixel distance between the detections of `view` and its reprojection.
pub fn reprojection_rms(
    view: &CorrespondenceView,
    pose: &ExtrinsicPose,
    model: &IntrinsicModel,
) -> Real {
    let predicted = project_points(view.model_points(), pose, model);
    rms_distance(view.image_points(), &predicted)
}
