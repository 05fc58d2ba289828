use anyhow::Result;
use arpose_core::synthetic::{noise::PixelNoise, planar};
use arpose_core::{
    reprojection_rms, DistortionCoeffs, ExtrinsicPose, IntrinsicModel, PinholeIntrinsics,
    TargetGeometry, TargetModel, Vec3,
};
use arpose_optim::params::{IntrinsicsFixMask, IntrinsicsLayout};
use arpose_optim::planar_intrinsics::{refine_planar_intrinsics, PlanarIntrinsicsProblem};
use arpose_optim::pose_refine::refine_pose;
use arpose_optim::{LmBackend, SolveOptions};

fn ground_truth() -> IntrinsicModel {
    IntrinsicModel::new(
        PinholeIntrinsics::new(800.0, 800.0, 320.0, 240.0).unwrap(),
        DistortionCoeffs::brown_conrady(-0.12, 0.05, 0.0005, -0.0003, 0.0),
    )
}

fn perturb(pose: &ExtrinsicPose, k: usize) -> ExtrinsicPose {
    let s = if k % 2 == 0 { 1.0 } else { -1.0 };
    ExtrinsicPose::new(
        pose.rvec + Vec3::new(0.02 * s, -0.015, 0.01 * s),
        pose.tvec + Vec3::new(0.3, -0.2 * s, 1.0),
    )
}

#[test]
fn bundle_adjustment_recovers_intrinsics_and_distortion() -> Result<()> {
    let gt = ground_truth();
    let target = TargetModel::new(TargetGeometry::new(6, 9)?);
    let poses = planar::orbit_poses(target.geometry(), 6, 20.0, 0.4);
    let views = planar::project_views(&gt, &target, &poses, &PixelNoise::none())?;

    let init = IntrinsicModel::pinhole(PinholeIntrinsics::new(760.0, 760.0, 320.0, 240.0)?);
    let init_poses: Vec<_> = poses.iter().enumerate().map(|(k, p)| perturb(p, k)).collect();

    let layout = IntrinsicsLayout::new(init, IntrinsicsFixMask::default());
    let problem = PlanarIntrinsicsProblem::new(&views, layout);
    let fit = refine_planar_intrinsics(
        &LmBackend,
        &problem,
        &init,
        &init_poses,
        &SolveOptions::default(),
    );

    assert!((fit.model.k.fx - 800.0).abs() < 1e-3, "fx = {}", fit.model.k.fx);
    assert_eq!(fit.model.k.fx, fit.model.k.fy);
    assert!((fit.model.k.cx - 320.0).abs() < 1e-3, "cx = {}", fit.model.k.cx);
    assert!((fit.model.k.cy - 240.0).abs() < 1e-3, "cy = {}", fit.model.k.cy);
    assert!(
        (fit.model.dist.k1() + 0.12).abs() < 1e-4,
        "k1 = {}",
        fit.model.dist.k1()
    );
    for (view, pose) in views.iter().zip(&fit.poses) {
        assert!(reprojection_rms(view, pose, &fit.model) < 1e-6);
    }
    Ok(())
}

#[test]
fn pose_refinement_converges_from_nearby_guess() -> Result<()> {
    let gt = ground_truth();
    let target = TargetModel::new(TargetGeometry::new(6, 9)?);
    let pose = planar::centred_pose(target.geometry(), 18.0, 0.3, -0.2, 0.4);
    let view = planar::project_view(&gt, &target, &pose, &PixelNoise::none(), 0)?;

    let (refined, report) = refine_pose(
        &LmBackend,
        &view,
        &gt,
        &perturb(&pose, 1),
        &SolveOptions::default(),
    );

    assert!(report.converged, "{report:?}");
    assert!((refined.rvec - pose.rvec).norm() < 1e-8);
    assert!((refined.tvec - pose.tvec).norm() < 1e-6);
    Ok(())
}
