//! Frame handlers for the two programs: pose overlay and calibration capture.

use std::path::{Path, PathBuf};

use arpose_core::{CorrespondenceView, IntrinsicModel};
use log::{info, warn};

use crate::calibrate::ImageSize;
use crate::frame_loop::{BoxError, Frame, FrameHandler, LoopControl};
use crate::overlay::{OverlayConfig, RenderContext, ShapeTemplate};
use crate::pose::{solve_pose, PoseSolution, PoseSolverOptions};
use crate::session::{CalibrationSession, SessionCommand, SessionEvent};

fn quit_on(key: char) -> LoopControl {
    if key == 'q' {
        LoopControl::Stop
    } else {
        LoopControl::Continue
    }
}

/// Solves the target pose on every detected frame and draws the scene.
#[derive(Debug)]
pub struct OverlayHandler {
    ctx: RenderContext,
    shapes: Vec<ShapeTemplate>,
    pose_opts: PoseSolverOptions,
    pose_log_interval: u64,
    draw_corners: bool,
    posed_frames: u64,
    last: Option<PoseSolution>,
}

impl OverlayHandler {
    pub fn new(model: IntrinsicModel, config: &OverlayConfig) -> Self {
        Self {
            ctx: RenderContext::new(model, config.style),
            shapes: config.templates(),
            pose_opts: config.pose,
            pose_log_interval: config.pose_log_interval,
            draw_corners: config.draw_corners,
            posed_frames: 0,
            last: None,
        }
    }

    /// Pose of the most recent frame, `None` if it had no usable detection.
    pub fn last_pose(&self) -> Option<&PoseSolution> {
        self.last.as_ref()
    }

    pub fn posed_frames(&self) -> u64 {
        self.posed_frames
    }

    /// The cadence counts every frame, posed or not.
    fn logs_pose_at(&self, index: u64) -> bool {
        self.pose_log_interval > 0 && index % self.pose_log_interval == 0
    }
}

impl FrameHandler for OverlayHandler {
    fn on_frame(
        &mut self,
        index: u64,
        frame: &mut Frame,
        detection: Option<&CorrespondenceView>,
    ) -> Result<(), BoxError> {
        self.last = None;
        let Some(view) = detection else {
            return Ok(());
        };
        if self.draw_corners {
            self.ctx.draw_corners(frame, view.image_points());
        }
        let solution = match solve_pose(view, &self.ctx.model, &self.pose_opts) {
            Ok(solution) => solution,
            Err(e) => {
                warn!("frame {index}: {e}");
                return Ok(());
            }
        };
        for shape in &self.shapes {
            self.ctx.draw_shape(frame, shape, &solution.pose);
        }
        if self.logs_pose_at(index) {
            let (r, t) = (solution.pose.rvec, solution.pose.tvec);
            info!(
                "frame {index}: rvec [{:.4}, {:.4}, {:.4}] tvec [{:.4}, {:.4}, {:.4}] rms {:.3}px",
                r.x, r.y, r.z, t.x, t.y, t.z, solution.rms_error
            );
        }
        self.posed_frames += 1;
        self.last = Some(solution);
        Ok(())
    }

    fn on_key(&mut self, key: char) -> Result<LoopControl, BoxError> {
        Ok(quit_on(key))
    }
}

/// Feeds detections into a [`CalibrationSession`] and maps keys to commands.
#[derive(Debug)]
pub struct CalibrationHandler {
    session: CalibrationSession,
    ctx: Option<RenderContext>,
    last_frame: Option<Frame>,
}

impl CalibrationHandler {
    pub fn new(session: CalibrationSession) -> Self {
        Self {
            session,
            ctx: None,
            last_frame: None,
        }
    }

    /// Mark detected corners with `ctx`'s style on displayed frames.
    pub fn with_corner_overlay(mut self, ctx: RenderContext) -> Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn session(&self) -> &CalibrationSession {
        &self.session
    }

    pub fn into_session(self) -> CalibrationSession {
        self.session
    }

    fn save_frame(&self, dir: &Path, sample: usize) -> Result<PathBuf, BoxError> {
        let Some(frame) = &self.last_frame else {
            return Err("no frame to save".into());
        };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("calibration_frame_{}.png", sample - 1));
        frame.save(&path)?;
        Ok(path)
    }
}

impl FrameHandler for CalibrationHandler {
    fn on_frame(
        &mut self,
        _index: u64,
        frame: &mut Frame,
        detection: Option<&CorrespondenceView>,
    ) -> Result<(), BoxError> {
        let size = ImageSize::new(frame.width(), frame.height());
        self.session.observe(detection.cloned(), size);
        if self.session.config().frame_dir.is_some() {
            self.last_frame = Some(frame.clone());
        }
        if let (Some(ctx), Some(view)) = (&self.ctx, detection) {
            ctx.draw_corners(frame, view.image_points());
        }
        Ok(())
    }

    fn on_key(&mut self, key: char) -> Result<LoopControl, BoxError> {
        let Some(command) = SessionCommand::from_key(key) else {
            return Ok(LoopControl::Continue);
        };
        match self.session.handle(command) {
            Ok(SessionEvent::SampleSaved { count }) => {
                if let Some(dir) = self.session.config().frame_dir.clone() {
                    let path = self.save_frame(&dir, count)?;
                    info!("wrote {}", path.display());
                }
            }
            Ok(SessionEvent::Terminated) => return Ok(LoopControl::Stop),
            Ok(_) => {}
            Err(e) if e.is_recoverable() => {}
            Err(e) => return Err(e.into()),
        }
        Ok(LoopControl::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionConfig, SessionState};
    use arpose_core::{
        project_points, ExtrinsicPose, PinholeIntrinsics, TargetGeometry, TargetModel, Vec3,
    };

    fn camera() -> IntrinsicModel {
        IntrinsicModel::pinhole(PinholeIntrinsics::new(400.0, 400.0, 160.0, 120.0).unwrap())
    }

    fn detected(target: &TargetModel, pose: &ExtrinsicPose) -> CorrespondenceView {
        target
            .pair(project_points(target.points(), pose, &camera()))
            .unwrap()
    }

    #[test]
    fn overlay_draws_on_posed_frames_only() {
        let target = TargetModel::new(TargetGeometry::new(6, 9).unwrap());
        let pose = ExtrinsicPose::new(Vec3::new(0.2, 0.1, 0.0), Vec3::new(-4.0, 2.5, 18.0));
        let view = detected(&target, &pose);
        let mut handler = OverlayHandler::new(camera(), &OverlayConfig::default());

        let mut blank = Frame::new(320, 240);
        handler.on_frame(0, &mut blank, None).unwrap();
        assert!(handler.last_pose().is_none());
        assert!(blank.pixels().all(|p| p.0 == [0, 0, 0]));

        let mut frame = Frame::new(320, 240);
        handler.on_frame(1, &mut frame, Some(&view)).unwrap();
        let solved = handler.last_pose().unwrap();
        assert!((solved.pose.tvec - pose.tvec).norm() < 1e-6);
        assert!(frame.pixels().any(|p| p.0 != [0, 0, 0]));
        assert_eq!(handler.posed_frames(), 1);
        assert_eq!(handler.on_key('q').unwrap(), LoopControl::Stop);
        assert_eq!(handler.on_key('s').unwrap(), LoopControl::Continue);
    }

    #[test]
    fn pose_log_cadence_counts_every_frame() {
        let handler = OverlayHandler::new(camera(), &OverlayConfig::default());
        let logged: Vec<u64> = (0..12).filter(|i| handler.logs_pose_at(*i)).collect();
        assert_eq!(logged, vec![0, 5, 10]);

        let silent = OverlayHandler::new(
            camera(),
            &OverlayConfig {
                pose_log_interval: 0,
                ..OverlayConfig::default()
            },
        );
        assert!((0..12).all(|i| !silent.logs_pose_at(i)));
    }

    #[test]
    fn calibration_handler_saves_frames() {
        let dir = tempfile::tempdir().unwrap();
        let target = TargetModel::new(TargetGeometry::new(2, 3).unwrap());
        let pose = ExtrinsicPose::new(Vec3::zeros(), Vec3::new(-1.0, 0.5, 10.0));
        let session = CalibrationSession::new(SessionConfig {
            frame_dir: Some(dir.path().to_path_buf()),
            ..SessionConfig::default()
        });
        let mut handler = CalibrationHandler::new(session);

        let mut frame = Frame::new(320, 240);
        handler
            .on_frame(0, &mut frame, Some(&detected(&target, &pose)))
            .unwrap();
        assert_eq!(handler.on_key('s').unwrap(), LoopControl::Continue);
        assert_eq!(handler.on_key('s').unwrap(), LoopControl::Continue);
        assert!(dir.path().join("calibration_frame_0.png").exists());
        assert!(dir.path().join("calibration_frame_1.png").exists());

        // Too few samples: reported, loop continues.
        assert_eq!(handler.on_key('c').unwrap(), LoopControl::Continue);
        assert_eq!(handler.on_key('q').unwrap(), LoopControl::Stop);
        let session = handler.into_session();
        assert_eq!(session.samples().len(), 2);
        assert_eq!(session.state(), SessionState::Terminated);
    }
}
