use arpose_core::synthetic::{noise::PixelNoise, planar};
use arpose_core::{
    model_points, project_points, reprojection_rms, DistortionCoeffs, ExtrinsicPose,
    IntrinsicModel, PinholeIntrinsics, Pt2, Pt3, TargetGeometry, TargetModel,
};

fn axes() -> [Pt3; 4] {
    [
        Pt3::new(0.0, 0.0, 0.0),
        Pt3::new(1.0, 0.0, 0.0),
        Pt3::new(0.0, -1.0, 0.0),
        Pt3::new(0.0, 0.0, 1.0),
    ]
}

#[test]
fn model_points_follow_row_major_layout() {
    for (rows, cols) in [(2, 2), (6, 9), (9, 6), (3, 11)] {
        let geometry = TargetGeometry::new(rows, cols).unwrap();
        let points = model_points(geometry);
        assert_eq!(points.len(), rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                assert_eq!(points[i * cols + j], Pt3::new(j as f64, -(i as f64), 0.0));
            }
        }
    }
}

#[test]
fn shared_model_points_are_not_copied() {
    let target = TargetModel::new(TargetGeometry::new(9, 6).unwrap());
    assert_eq!(target.len(), 54);
    let a = target.pair(vec![Pt2::origin(); 54]).unwrap();
    let b = target.pair(vec![Pt2::new(1.0, 1.0); 54]).unwrap();
    assert!(std::ptr::eq(a.model_points(), b.model_points()));
}

#[test]
fn axis_origin_maps_to_principal_point_under_identity_pose() {
    let model = IntrinsicModel::pinhole(PinholeIntrinsics::new(812.0, 790.0, 317.5, 243.25).unwrap());
    let uv = project_points(&axes(), &ExtrinsicPose::identity(), &model);
    assert_eq!(uv[0], Pt2::new(317.5, 243.25));
    // z = 0 points are divided by one, not dropped.
    assert_eq!(uv[1], Pt2::new(317.5 + 812.0, 243.25));
    assert_eq!(uv[2], Pt2::new(317.5, 243.25 - 790.0));
}

#[test]
fn noisy_views_reproject_within_noise() {
    let model = IntrinsicModel::new(
        PinholeIntrinsics::new(800.0, 800.0, 320.0, 240.0).unwrap(),
        DistortionCoeffs::brown_conrady(-0.1, 0.02, 0.0, 0.0, 0.0),
    );
    let target = TargetModel::new(TargetGeometry::new(6, 9).unwrap());
    let poses = planar::orbit_poses(target.geometry(), 5, 20.0, 0.3);
    let noise = PixelNoise::new(9, 0.5);
    let views = planar::project_views(&model, &target, &poses, &noise).unwrap();
    for (view, pose) in views.iter().zip(&poses) {
        let rms = reprojection_rms(view, pose, &model);
        assert!(rms > 0.0 && rms <= 0.5 * 2f64.sqrt(), "rms = {rms}");
    }
}
