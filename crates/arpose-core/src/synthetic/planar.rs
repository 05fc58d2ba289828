use anyhow::{bail, Result};
use nalgebra::Rotation3;

use super::noise::PixelNoise;
use crate::{
    CorrespondenceView, ExtrinsicPose, IntrinsicModel, Real, TargetGeometry, TargetModel, Vec3,
};

/// Pose with the given Euler tilt that puts the target centre on the optical
/// axis at `distance` units from the camera.
pub fn centred_pose(
    geometry: TargetGeometry,
    distance: Real,
    roll: Real,
    pitch: Real,
    yaw: Real,
) -> ExtrinsicPose {
    let rot = Rotation3::from_euler_angles(roll, pitch, yaw);
    let centre = Vec3::new(
        (geometry.cols() - 1) as Real * 0.5,
        -((geometry.rows() - 1) as Real) * 0.5,
        0.0,
    );
    let tvec = Vec3::new(0.0, 0.0, distance) - rot * centre;
    ExtrinsicPose::new(rot.scaled_axis(), tvec)
}

/// `n_views` centred poses tilted by `tilt_rad` in directions spread around
/// the optical axis, with a small in-plane twist and depth variation.
pub fn orbit_poses(
    geometry: TargetGeometry,
    n_views: usize,
    distance: Real,
    tilt_rad: Real,
) -> Vec<ExtrinsicPose> {
    (0..n_views)
        .map(|k| {
            let phase = std::f64::consts::TAU * k as Real / n_views.max(1) as Real;
            let roll = tilt_rad * phase.cos();
            let pitch = tilt_rad * phase.sin();
            let yaw = 0.05 * (k as Real - 0.5 * n_views as Real);
            let depth = distance * (1.0 + 0.05 * (k % 3) as Real);
            centred_pose(geometry, depth, roll, pitch, yaw)
        })
        .collect()
}

/// Project every target point through `pose`, perturbed by `noise`.
///
/// Fails if any point ends up on or behind the camera plane.
pub fn project_view(
    model: &IntrinsicModel,
    target: &TargetModel,
    pose: &ExtrinsicPose,
    noise: &PixelNoise,
    view_idx: usize,
) -> Result<CorrespondenceView> {
    let mut pixels = Vec::with_capacity(target.len());
    for (idx, p) in target.points().iter().enumerate() {
        let pc = pose.transform_point(p);
        if pc.z <= 0.0 {
            bail!("point {idx} of view {view_idx} is behind the camera (z={:.6})", pc.z);
        }
        pixels.push(noise.apply(view_idx, idx, model.project(&pc)));
    }
    Ok(target.pair(pixels)?)
}

pub fn project_views(
    model: &IntrinsicModel,
    target: &TargetModel,
    poses: &[ExtrinsicPose],
    noise: &PixelNoise,
) -> Result<Vec<CorrespondenceView>> {
    poses
        .iter()
        .enumerate()
        .map(|(idx, pose)| project_view(model, target, pose, noise, idx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PinholeIntrinsics, Pt2};

    #[test]
    fn centred_pose_puts_target_centre_on_axis() {
        let g = TargetGeometry::new(6, 9).unwrap();
        let model =
            IntrinsicModel::pinhole(PinholeIntrinsics::new(800.0, 800.0, 320.0, 240.0).unwrap());
        let target = TargetModel::new(g);
        let pose = centred_pose(g, 20.0, 0.2, -0.3, 0.1);
        let view = project_view(&model, &target, &pose, &PixelNoise::none(), 0).unwrap();
        // Perspective shifts the centroid slightly off the principal point.
        let mean = view
            .image_points()
            .iter()
            .fold(Pt2::origin().coords, |acc, p| acc + p.coords)
            / view.len() as Real;
        assert!((mean - Pt2::new(320.0, 240.0).coords).norm() < 5.0, "{mean:?}");
    }

    #[test]
    fn behind_camera_is_an_error() {
        let g = TargetGeometry::new(2, 2).unwrap();
        let model =
            IntrinsicModel::pinhole(PinholeIntrinsics::new(800.0, 800.0, 320.0, 240.0).unwrap());
        let pose = centred_pose(g, -5.0, 0.0, 0.0, 0.0);
        assert!(project_view(&model, &TargetModel::new(g), &pose, &PixelNoise::none(), 0).is_err());
    }
}
