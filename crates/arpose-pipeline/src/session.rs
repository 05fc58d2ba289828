//! Interactive calibration session.
//!
//! ```text
//! Collecting --save--> Collecting (sample appended)
//! Collecting --calibrate (>= 5 samples)--> Calibrated
//! Calibrated --save/calibrate--> Calibrated (new model supersedes the old)
//! Calibrated --persist--> Calibrated (file written)
//! any --quit--> Terminated
//! ```
//!
//! The session owns the collected samples and the latest model. Samples are
//! never persisted.

use std::path::PathBuf;

use arpose_core::{CorrespondenceView, IntrinsicModel, Real};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calibrate::{calibrate, CalibrationError, CalibrationReport, EstimatorOptions, ImageSize};
use crate::param_store::{save_calibration, ParamStoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Collecting,
    Calibrated,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionCommand {
    SaveSample,
    Calibrate,
    Persist,
    Quit,
}

impl SessionCommand {
    /// `s` save, `c` calibrate, `f` persist, `q` quit.
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            's' => Some(SessionCommand::SaveSample),
            'c' => Some(SessionCommand::Calibrate),
            'f' => Some(SessionCommand::Persist),
            'q' => Some(SessionCommand::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Where `Persist` writes the calibration file.
    pub output_path: PathBuf,
    pub estimator: EstimatorOptions,
    /// When set, the frame of every saved sample is written here.
    pub frame_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("calibration.txt"),
            estimator: EstimatorOptions::default(),
            frame_dir: None,
        }
    }
}

/// Outcome of a handled command.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SampleSaved { count: usize },
    /// Save requested while the current frame has no detection.
    NoDetection,
    Calibrated { rms_error: Real, converged: bool },
    Persisted { path: PathBuf },
    /// Persist requested before any successful calibration.
    NothingToPersist,
    Terminated,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already terminated")]
    Terminated,
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Persist(#[from] ParamStoreError),
}

impl SessionError {
    /// Recoverable outcomes the user can fix by collecting more or better
    /// samples.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Calibration(_))
    }
}

#[derive(Debug)]
pub struct CalibrationSession {
    config: SessionConfig,
    state: SessionState,
    samples: Vec<CorrespondenceView>,
    current: Option<CorrespondenceView>,
    image_size: Option<ImageSize>,
    report: Option<CalibrationReport>,
}

impl CalibrationSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Collecting,
            samples: Vec::new(),
            current: None,
            image_size: None,
            report: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn samples(&self) -> &[CorrespondenceView] {
        &self.samples
    }

    /// Latest successful calibration.
    pub fn report(&self) -> Option<&CalibrationReport> {
        self.report.as_ref()
    }

    pub fn model(&self) -> Option<&IntrinsicModel> {
        self.report.as_ref().map(|r| &r.model)
    }

    /// Record the current frame's detection (or its absence).
    pub fn observe(&mut self, detection: Option<CorrespondenceView>, image_size: ImageSize) {
        self.current = detection;
        self.image_size = Some(image_size);
    }

    pub fn handle(&mut self, command: SessionCommand) -> Result<SessionEvent, SessionError> {
        if self.state == SessionState::Terminated {
            return Err(SessionError::Terminated);
        }
        match command {
            SessionCommand::SaveSample => Ok(self.save_sample()),
            SessionCommand::Calibrate => self.calibrate(),
            SessionCommand::Persist => self.persist(),
            SessionCommand::Quit => {
                info!("session terminated with {} samples", self.samples.len());
                self.state = SessionState::Terminated;
                Ok(SessionEvent::Terminated)
            }
        }
    }

    fn save_sample(&mut self) -> SessionEvent {
        match &self.current {
            Some(view) => {
                self.samples.push(view.clone());
                info!("saved sample {}", self.samples.len());
                SessionEvent::SampleSaved {
                    count: self.samples.len(),
                }
            }
            None => {
                warn!("no target in the current frame; sample not saved");
                SessionEvent::NoDetection
            }
        }
    }

    fn calibrate(&mut self) -> Result<SessionEvent, SessionError> {
        let size = self.image_size.unwrap_or(ImageSize::new(0, 0));
        let report = match calibrate(&self.samples, size, &self.config.estimator) {
            Ok(report) => report,
            Err(e) => {
                warn!("calibration not run: {e}");
                return Err(e.into());
            }
        };
        let event = SessionEvent::Calibrated {
            rms_error: report.rms_error,
            converged: report.converged,
        };
        self.report = Some(report);
        self.state = SessionState::Calibrated;
        Ok(event)
    }

    fn persist(&mut self) -> Result<SessionEvent, SessionError> {
        let Some(report) = &self.report else {
            warn!("nothing to save yet; calibrate first");
            return Ok(SessionEvent::NothingToPersist);
        };
        save_calibration(&self.config.output_path, &report.model)?;
        Ok(SessionEvent::Persisted {
            path: self.config.output_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arpose_core::{Pt2, TargetGeometry, TargetModel};

    fn size() -> ImageSize {
        ImageSize::new(640, 480)
    }

    fn detection() -> CorrespondenceView {
        let target = TargetModel::new(TargetGeometry::new(2, 2).unwrap());
        target
            .pair(vec![
                Pt2::new(10.0, 10.0),
                Pt2::new(20.0, 10.0),
                Pt2::new(10.0, 20.0),
                Pt2::new(20.0, 20.0),
            ])
            .unwrap()
    }

    #[test]
    fn key_bindings() {
        assert_eq!(SessionCommand::from_key('s'), Some(SessionCommand::SaveSample));
        assert_eq!(SessionCommand::from_key('c'), Some(SessionCommand::Calibrate));
        assert_eq!(SessionCommand::from_key('f'), Some(SessionCommand::Persist));
        assert_eq!(SessionCommand::from_key('q'), Some(SessionCommand::Quit));
        assert_eq!(SessionCommand::from_key('x'), None);
    }

    #[test]
    fn save_without_detection_is_a_no_op() {
        let mut session = CalibrationSession::new(SessionConfig::default());
        session.observe(None, size());
        assert_eq!(
            session.handle(SessionCommand::SaveSample).unwrap(),
            SessionEvent::NoDetection
        );
        assert!(session.samples().is_empty());
        assert_eq!(session.state(), SessionState::Collecting);
    }

    #[test]
    fn saves_accumulate_in_order() {
        let mut session = CalibrationSession::new(SessionConfig::default());
        session.observe(Some(detection()), size());
        for n in 1..=3 {
            assert_eq!(
                session.handle(SessionCommand::SaveSample).unwrap(),
                SessionEvent::SampleSaved { count: n }
            );
        }
        assert_eq!(session.samples().len(), 3);
    }

    #[test]
    fn calibrate_with_too_few_samples_stays_collecting() {
        let mut session = CalibrationSession::new(SessionConfig::default());
        session.observe(Some(detection()), size());
        for _ in 0..4 {
            session.handle(SessionCommand::SaveSample).unwrap();
        }
        let err = session.handle(SessionCommand::Calibrate).unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(
            err,
            SessionError::Calibration(CalibrationError::InsufficientSamples { got: 4, need: 5 })
        ));
        assert_eq!(session.state(), SessionState::Collecting);
        assert!(session.model().is_none());
    }

    #[test]
    fn persist_before_calibration_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.txt");
        let mut session = CalibrationSession::new(SessionConfig {
            output_path: path.clone(),
            ..SessionConfig::default()
        });
        assert_eq!(
            session.handle(SessionCommand::Persist).unwrap(),
            SessionEvent::NothingToPersist
        );
        assert!(!path.exists());
    }

    #[test]
    fn quit_is_terminal() {
        let mut session = CalibrationSession::new(SessionConfig::default());
        assert_eq!(
            session.handle(SessionCommand::Quit).unwrap(),
            SessionEvent::Terminated
        );
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(matches!(
            session.handle(SessionCommand::SaveSample),
            Err(SessionError::Terminated)
        ));
    }
}
