//! The frame-synchronous pipeline: acquire, detect, handle, display, poll.
//!
//! Every acquisition mode (still image, video file, live device) plugs in
//! through [`FrameSource`], so the per-frame work is written once.

use arpose_core::{CorrespondenceView, Pt2, TargetGeometry, TargetModel};
use image::RgbImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raster frame flowing through the pipeline.
pub type Frame = RgbImage;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum FrameSourceError {
    /// The source could not be opened at all.
    #[error("unable to open {source_name}: {reason}")]
    Open { source_name: String, reason: String },
    /// This frame is lost; later frames may still arrive.
    #[error("frame dropped: {0}")]
    Transient(String),
    #[error("frame source failed: {0}")]
    Fatal(String),
}

/// Produces frames on demand. `Ok(None)` marks end of stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError>;
}

/// Finds the target's inner corners in a frame.
///
/// Found corners are sub-pixel refined and in row-major order matching
/// [`arpose_core::model_points`]. `None` means the target was not found.
pub trait CornerDetector {
    fn detect(&mut self, frame: &Frame, geometry: TargetGeometry) -> Option<Vec<Pt2>>;
}

/// Presents frames and reports key presses.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame) -> Result<(), BoxError>;
    /// Key pressed since the last poll, if any.
    fn poll_key(&mut self) -> Option<char>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Per-frame work plugged into [`run_frame_loop`].
pub trait FrameHandler {
    /// Called once per frame after detection and before display. The frame
    /// may be annotated in place.
    fn on_frame(
        &mut self,
        index: u64,
        frame: &mut Frame,
        detection: Option<&CorrespondenceView>,
    ) -> Result<(), BoxError>;

    fn on_key(&mut self, key: char) -> Result<LoopControl, BoxError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameLoopConfig {
    /// Transient source failures tolerated in a row before giving up.
    pub max_consecutive_failures: usize,
}

impl Default for FrameLoopConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSummary {
    pub frames: u64,
    pub detections: u64,
    pub dropped: u64,
    /// `true` when a handler stopped the loop, `false` at end of stream.
    pub stopped: bool,
}

#[derive(Debug, Error)]
pub enum FrameLoopError {
    #[error(transparent)]
    Source(FrameSourceError),
    #[error("{count} consecutive frame failures, last: {last}")]
    TooManyFailures { count: usize, last: String },
    #[error("display failed: {0}")]
    Display(#[source] BoxError),
    #[error("frame handler failed: {0}")]
    Handler(#[source] BoxError),
}

/// Run the pipeline until end of stream, a stop request, or a fatal error.
pub fn run_frame_loop<S, D, K, H>(
    source: &mut S,
    detector: &mut D,
    sink: &mut K,
    handler: &mut H,
    target: &TargetModel,
    config: &FrameLoopConfig,
) -> Result<LoopSummary, FrameLoopError>
where
    S: FrameSource + ?Sized,
    D: CornerDetector + ?Sized,
    K: DisplaySink + ?Sized,
    H: FrameHandler + ?Sized,
{
    let mut summary = LoopSummary::default();
    let mut failures = 0usize;

    loop {
        let mut frame = match source.next_frame() {
            Ok(Some(frame)) => {
                failures = 0;
                frame
            }
            Ok(None) => {
                info!("end of stream after {} frames", summary.frames);
                break;
            }
            Err(FrameSourceError::Transient(reason)) => {
                failures += 1;
                summary.dropped += 1;
                if failures > config.max_consecutive_failures {
                    return Err(FrameLoopError::TooManyFailures {
                        count: failures,
                        last: reason,
                    });
                }
                warn!("{reason}; skipping frame");
                continue;
            }
            Err(e) => return Err(FrameLoopError::Source(e)),
        };

        let index = summary.frames;
        summary.frames += 1;

        let detection = match detector.detect(&frame, target.geometry()) {
            Some(points) => match target.pair(points) {
                Ok(view) => Some(view),
                Err(e) => {
                    warn!("frame {index}: discarding detection: {e}");
                    None
                }
            },
            None => {
                debug!("frame {index}: target not found");
                None
            }
        };
        if detection.is_some() {
            summary.detections += 1;
        }

        handler
            .on_frame(index, &mut frame, detection.as_ref())
            .map_err(FrameLoopError::Handler)?;
        sink.show(&frame).map_err(FrameLoopError::Display)?;

        if let Some(key) = sink.poll_key() {
            if handler.on_key(key).map_err(FrameLoopError::Handler)? == LoopControl::Stop {
                summary.stopped = true;
                break;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<Result<Option<Frame>, FrameSourceError>>);

    impl FrameSource for Scripted {
        fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    struct Never;

    impl CornerDetector for Never {
        fn detect(&mut self, _: &Frame, _: TargetGeometry) -> Option<Vec<Pt2>> {
            None
        }
    }

    #[derive(Default)]
    struct Counting {
        shown: usize,
    }

    impl DisplaySink for Counting {
        fn show(&mut self, _: &Frame) -> Result<(), BoxError> {
            self.shown += 1;
            Ok(())
        }

        fn poll_key(&mut self) -> Option<char> {
            None
        }
    }

    struct Nop;

    impl FrameHandler for Nop {
        fn on_frame(
            &mut self,
            _: u64,
            _: &mut Frame,
            _: Option<&CorrespondenceView>,
        ) -> Result<(), BoxError> {
            Ok(())
        }

        fn on_key(&mut self, _: char) -> Result<LoopControl, BoxError> {
            Ok(LoopControl::Continue)
        }
    }

    fn target() -> TargetModel {
        TargetModel::new(TargetGeometry::new(2, 2).unwrap())
    }

    fn frame() -> Result<Option<Frame>, FrameSourceError> {
        Ok(Some(Frame::new(4, 4)))
    }

    fn transient() -> Result<Option<Frame>, FrameSourceError> {
        Err(FrameSourceError::Transient("grab failed".into()))
    }

    #[test]
    fn transient_failures_are_skipped() {
        let mut source = Scripted(vec![frame(), transient(), transient(), frame()].into());
        let mut sink = Counting::default();
        let summary = run_frame_loop(
            &mut source,
            &mut Never,
            &mut sink,
            &mut Nop,
            &target(),
            &FrameLoopConfig::default(),
        )
        .unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.dropped, 2);
        assert!(!summary.stopped);
        assert_eq!(sink.shown, 2);
    }

    #[test]
    fn too_many_consecutive_failures_stop_the_loop() {
        let mut source = Scripted(vec![transient(), transient(), transient()].into());
        let err = run_frame_loop(
            &mut source,
            &mut Never,
            &mut Counting::default(),
            &mut Nop,
            &target(),
            &FrameLoopConfig {
                max_consecutive_failures: 2,
            },
        )
        .unwrap_err();
        assert!(matches!(err, FrameLoopError::TooManyFailures { count: 3, .. }));
    }

    #[test]
    fn open_failure_is_fatal() {
        let mut source = Scripted(
            vec![Err(FrameSourceError::Open {
                source_name: "camera 0".into(),
                reason: "no device".into(),
            })]
            .into(),
        );
        let err = run_frame_loop(
            &mut source,
            &mut Never,
            &mut Counting::default(),
            &mut Nop,
            &target(),
            &FrameLoopConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FrameLoopError::Source(FrameSourceError::Open { .. })));
    }
}
