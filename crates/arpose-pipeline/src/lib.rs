//! Calibration, pose solving and the AR frame pipeline.
//!
//! - [`calibrate()`]: intrinsics from several views of the chessboard,
//! - [`solve_pose`]: per-frame target pose with known intrinsics,
//! - [`param_store`]: the line-oriented calibration file,
//! - [`session`]: the interactive calibration state machine,
//! - [`frame_loop`]: source/detector/display traits and the single loop,
//! - [`overlay`]: shape templates and drawing,
//! - [`handlers`] and [`io`]: the pieces the two programs are built from.

pub mod calibrate;
pub mod frame_loop;
pub mod handlers;
pub mod io;
pub mod overlay;
pub mod param_store;
pub mod pose;
pub mod session;

pub use calibrate::{
    calibrate, CalibrationError, CalibrationReport, EstimatorOptions, ImageSize,
    MIN_CALIBRATION_SAMPLES,
};
pub use frame_loop::{
    run_frame_loop, CornerDetector, DisplaySink, Frame, FrameHandler, FrameLoopConfig,
    FrameLoopError, FrameSource, FrameSourceError, LoopControl, LoopSummary,
};
pub use handlers::{CalibrationHandler, OverlayHandler};
pub use param_store::{load_calibration, save_calibration, MalformedKind, ParamStoreError};
pub use pose::{solve_pose, PoseError, PoseSolution, PoseSolverOptions};
pub use session::{
    CalibrationSession, SessionCommand, SessionConfig, SessionError, SessionEvent, SessionState,
};
