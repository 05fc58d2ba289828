//! File-backed frame sources, detectors and sinks, plus JSON inputs.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use arpose_core::{CorrespondenceError, CorrespondenceView, Pt2, Real, TargetGeometry, TargetModel};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calibrate::ImageSize;
use crate::frame_loop::{BoxError, CornerDetector, DisplaySink, Frame, FrameSource, FrameSourceError};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "png", "ppm", "tif"];
const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "m4v", "MOV", "mov", "avi"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Not a valid image or video extension: {}", .0.display())]
    UnsupportedExtension(PathBuf),
    #[error(transparent)]
    Open(#[from] FrameSourceError),
}

impl MediaKind {
    /// Classify by file extension.
    pub fn from_path(path: &Path) -> Result<Self, MediaError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if IMAGE_EXTENSIONS.contains(&ext) {
            Ok(MediaKind::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            Ok(MediaKind::Video)
        } else {
            Err(MediaError::UnsupportedExtension(path.to_path_buf()))
        }
    }
}

fn no_capture_backend(source_name: String) -> FrameSourceError {
    FrameSourceError::Open {
        source_name,
        reason: "no video capture backend is available in this build".to_string(),
    }
}

/// Open the frame source for `media`, or the live device when absent.
pub fn open_frame_source(media: Option<&Path>) -> Result<Box<dyn FrameSource>, MediaError> {
    let Some(path) = media else {
        return Err(no_capture_backend("live video device".to_string()).into());
    };
    match MediaKind::from_path(path)? {
        MediaKind::Image => Ok(Box::new(ImageFileSource::open(path)?)),
        MediaKind::Video => Err(no_capture_backend(path.display().to_string()).into()),
    }
}

/// A single still image, yielded once.
#[derive(Debug)]
pub struct ImageFileSource {
    frame: Option<Frame>,
}

impl ImageFileSource {
    pub fn open(path: &Path) -> Result<Self, FrameSourceError> {
        let frame = image::open(path)
            .map_err(|e| FrameSourceError::Open {
                source_name: path.display().to_string(),
                reason: e.to_string(),
            })?
            .into_rgb8();
        debug!(
            "loaded {} ({}x{})",
            path.display(),
            frame.width(),
            frame.height()
        );
        Ok(Self { frame: Some(frame) })
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self { frame: Some(frame) }
    }
}

impl FrameSource for ImageFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError> {
        Ok(self.frame.take())
    }
}

#[derive(Debug, Error)]
pub enum InputFileError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("detection {index}: {source}")]
    Correspondence {
        index: usize,
        #[source]
        source: CorrespondenceError,
    },
}

/// Read and deserialize a JSON file.
pub fn load_json_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, InputFileError> {
    let text = fs::read_to_string(path).map_err(|source| InputFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| InputFileError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn to_points(raw: &[[Real; 2]]) -> Vec<Pt2> {
    raw.iter().map(|&[u, v]| Pt2::new(u, v)).collect()
}

/// Pre-recorded detections, one entry per frame (`null` = not found).
#[derive(Debug, Clone, Default)]
pub struct RecordedCorners {
    frames: VecDeque<Option<Vec<Pt2>>>,
}

impl RecordedCorners {
    pub fn new(frames: impl IntoIterator<Item = Option<Vec<Pt2>>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, InputFileError> {
        let raw: Vec<Option<Vec<[Real; 2]>>> = load_json_file(path)?;
        Ok(Self::new(
            raw.into_iter().map(|entry| entry.map(|pts| to_points(&pts))),
        ))
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl CornerDetector for RecordedCorners {
    fn detect(&mut self, _frame: &Frame, _geometry: TargetGeometry) -> Option<Vec<Pt2>> {
        self.frames.pop_front().flatten()
    }
}

/// Writes every shown frame as `<prefix>_<n>.png`. Never reports keys.
#[derive(Debug)]
pub struct PngDirSink {
    dir: PathBuf,
    prefix: String,
    written: Vec<PathBuf>,
}

impl PngDirSink {
    pub fn create(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            written: Vec::new(),
        })
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl DisplaySink for PngDirSink {
    fn show(&mut self, frame: &Frame) -> Result<(), BoxError> {
        let path = self
            .dir
            .join(format!("{}_{:05}.png", self.prefix, self.written.len()));
        frame.save(&path)?;
        debug!("wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }

    fn poll_key(&mut self) -> Option<char> {
        None
    }
}

/// Input of the calibration program: image size, board and detections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationInput {
    pub image_size: ImageSize,
    pub target: TargetGeometry,
    /// Row-major corner detections, one list per sample.
    pub detections: Vec<Vec<[Real; 2]>>,
}

impl CalibrationInput {
    /// Pair every detection with the shared model points.
    pub fn views(&self) -> Result<Vec<CorrespondenceView>, InputFileError> {
        let target = TargetModel::new(self.target);
        self.detections
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                target
                    .pair(to_points(raw))
                    .map_err(|source| InputFileError::Correspondence { index, source })
            })
            .collect()
    }
}
