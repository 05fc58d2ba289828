//! Basic example of the calibration session followed by a pose overlay.
//!
//! This example shows:
//! - Collecting samples into a calibration session
//! - Calibrating and persisting the model
//! - Loading it back and drawing the default scene on a frame
//!
//! Run with: cargo run --example session_basic

use arpose_core::synthetic::{noise::PixelNoise, planar};
use arpose_core::{IntrinsicModel, PinholeIntrinsics, TargetGeometry, TargetModel};
use arpose_pipeline::overlay::{OverlayConfig, RenderContext};
use arpose_pipeline::{
    load_calibration, solve_pose, CalibrationSession, Frame, ImageSize, PoseSolverOptions,
    SessionCommand, SessionConfig, SessionEvent,
};

fn main() -> anyhow::Result<()> {
    println!("=== Calibration Session Example ===\n");

    let ground_truth = IntrinsicModel::pinhole(PinholeIntrinsics::new(800.0, 800.0, 320.0, 240.0)?);
    let target = TargetModel::new(TargetGeometry::new(6, 9)?);
    let poses = planar::orbit_poses(target.geometry(), 8, 20.0, 0.4);
    let views = planar::project_views(&ground_truth, &target, &poses, &PixelNoise::new(42, 0.5))?;
    println!("Generated {} synthetic views of a {}x{} board", views.len(), 6, 9);

    let out_dir = std::env::temp_dir().join("arpose_session_basic");
    std::fs::create_dir_all(&out_dir)?;
    let calib_path = out_dir.join("calibration.txt");

    let mut session = CalibrationSession::new(SessionConfig {
        output_path: calib_path.clone(),
        ..SessionConfig::default()
    });
    for view in &views {
        session.observe(Some(view.clone()), ImageSize::new(640, 480));
        session.handle(SessionCommand::SaveSample)?;
    }
    if let SessionEvent::Calibrated { rms_error, converged } =
        session.handle(SessionCommand::Calibrate)?
    {
        println!("✓ Calibrated: rms {rms_error:.4}px (converged: {converged})");
    }
    session.handle(SessionCommand::Persist)?;
    println!("✓ Saved {}", calib_path.display());

    let model = load_calibration(&calib_path)?;
    let k = model.k;
    println!(
        "Loaded intrinsics: fx={:.1}, fy={:.1}, cx={:.1}, cy={:.1}",
        k.fx, k.fy, k.cx, k.cy
    );

    let truth = planar::centred_pose(target.geometry(), 16.0, 0.5, 0.1, 0.2);
    let view = planar::project_view(&ground_truth, &target, &truth, &PixelNoise::none(), 0)?;
    let solution = solve_pose(&view, &model, &PoseSolverOptions::default())?;
    println!(
        "Pose: rvec={:?} tvec={:?} (rms {:.4}px)",
        solution.pose.rvec.as_slice(),
        solution.pose.tvec.as_slice(),
        solution.rms_error
    );

    let config = OverlayConfig::default();
    let ctx = RenderContext::new(model, config.style);
    let mut frame = Frame::new(640, 480);
    ctx.draw_corners(&mut frame, view.image_points());
    for shape in config.templates() {
        ctx.draw_shape(&mut frame, &shape, &solution.pose);
    }
    let frame_path = out_dir.join("overlay.png");
    frame.save(&frame_path)?;
    println!("✓ Wrote {}", frame_path.display());

    Ok(())
}
