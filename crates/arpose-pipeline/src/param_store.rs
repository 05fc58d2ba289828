//! Line-oriented text persistence of an [`IntrinsicModel`].
//!
//! ```text
//! fx 0 cx
//! 0 fy cy
//! 0 0 1
//! k1 k2 p1 p2 k3 [k4 k5 k6]
//! ```
//!
//! Values are written with the shortest representation that parses back to
//! the same `f64`, so a save/load cycle is bit-exact. Parsing is strict:
//! there is no checksum, so anything that is not exactly this layout is
//! rejected rather than partially filled.

use std::fs;
use std::path::{Path, PathBuf};

use arpose_core::{
    IntrinsicModel, Mat3, ModelError, Real, MAX_DISTORTION_COEFFS, MIN_DISTORTION_COEFFS,
};
use log::info;
use thiserror::Error;

/// Why a calibration file was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedKind {
    #[error("cannot open file: {0}")]
    Unreadable(String),
    #[error("missing line {line}")]
    MissingLine { line: usize },
    #[error("line {line}: `{token}` is not a number")]
    NotANumber { line: usize, token: String },
    #[error("camera matrix row {row} has {got} values, expected 3")]
    RowLength { row: usize, got: usize },
    #[error(
        "distortion line has {got} coefficients, expected {min} to {max}",
        min = MIN_DISTORTION_COEFFS,
        max = MAX_DISTORTION_COEFFS
    )]
    CoefficientCount { got: usize },
    #[error("unexpected content on line {line}")]
    TrailingContent { line: usize },
    #[error("invalid intrinsics: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Error)]
pub enum ParamStoreError {
    #[error("malformed calibration file {}: {kind}", path.display())]
    Malformed { path: PathBuf, kind: MalformedKind },
    #[error("failed to write calibration file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParamStoreError {
    pub fn malformed_kind(&self) -> Option<&MalformedKind> {
        match self {
            ParamStoreError::Malformed { kind, .. } => Some(kind),
            ParamStoreError::Write { .. } => None,
        }
    }
}

fn join(values: impl IntoIterator<Item = Real>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render `model` in the calibration file layout, newline terminated.
pub fn to_calibration_text(model: &IntrinsicModel) -> String {
    let k = model.camera_matrix();
    let mut out = String::new();
    for r in 0..3 {
        out.push_str(&join((0..3).map(|c| k[(r, c)])));
        out.push('\n');
    }
    out.push_str(&join(model.dist.as_slice().iter().copied()));
    out.push('\n');
    out
}

fn parse_numbers(line_no: usize, line: &str) -> Result<Vec<Real>, MalformedKind> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<Real>().map_err(|_| MalformedKind::NotANumber {
                line: line_no,
                token: tok.to_string(),
            })
        })
        .collect()
}

/// Parse the calibration file layout.
pub fn parse_calibration_text(text: &str) -> Result<IntrinsicModel, MalformedKind> {
    let mut lines = text.lines().enumerate().map(|(idx, l)| (idx + 1, l));
    let mut next_line = |expected: usize| {
        lines
            .next()
            .ok_or(MalformedKind::MissingLine { line: expected })
    };

    let mut kmtx = Mat3::zeros();
    for row in 0..3 {
        let (line_no, line) = next_line(row + 1)?;
        let values = parse_numbers(line_no, line)?;
        if values.len() != 3 {
            return Err(MalformedKind::RowLength {
                row,
                got: values.len(),
            });
        }
        for (col, v) in values.into_iter().enumerate() {
            kmtx[(row, col)] = v;
        }
    }

    let (line_no, line) = next_line(4)?;
    let coeffs = parse_numbers(line_no, line)?;
    if !(MIN_DISTORTION_COEFFS..=MAX_DISTORTION_COEFFS).contains(&coeffs.len()) {
        return Err(MalformedKind::CoefficientCount { got: coeffs.len() });
    }

    if let Some((line_no, _)) = lines.find(|(_, l)| !l.trim().is_empty()) {
        return Err(MalformedKind::TrailingContent { line: line_no });
    }

    Ok(IntrinsicModel::from_parts(&kmtx, &coeffs)?)
}

/// Read and validate a calibration file.
///
/// A file that cannot be opened is reported as malformed too: either way the
/// caller has no usable model.
pub fn load_calibration(path: impl AsRef<Path>) -> Result<IntrinsicModel, ParamStoreError> {
    let path = path.as_ref();
    let malformed = |kind| ParamStoreError::Malformed {
        path: path.to_path_buf(),
        kind,
    };
    let text = fs::read_to_string(path)
        .map_err(|e| malformed(MalformedKind::Unreadable(e.to_string())))?;
    parse_calibration_text(&text).map_err(malformed)
}

pub fn save_calibration(
    path: impl AsRef<Path>,
    model: &IntrinsicModel,
) -> Result<(), ParamStoreError> {
    let path = path.as_ref();
    fs::write(path, to_calibration_text(model)).map_err(|source| ParamStoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("wrote calibration to {}", path.display());
    Ok(())
}
