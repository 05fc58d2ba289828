use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arpose_core::logger;
use arpose_pipeline::io::{load_json_file, CalibrationInput};
use arpose_pipeline::{
    CalibrationReport, CalibrationSession, SessionCommand, SessionConfig, SessionEvent,
};
use clap::Parser;
use log::info;

/// Calibrate a camera from recorded chessboard detections.
#[derive(Debug, Parser)]
#[command(author, version, about = "Chessboard camera calibration")]
struct Args {
    /// Path to JSON file containing CalibrationInput.
    #[arg(long)]
    input: PathBuf,

    /// Optional path to JSON SessionConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calibration file to write; overrides the config's output path.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Save every sample, calibrate, persist. Returns the report.
fn run_calibration_from_files(
    input_path: &Path,
    config_path: Option<&Path>,
    output: Option<&Path>,
) -> Result<CalibrationReport> {
    let input: CalibrationInput = load_json_file(input_path)?;
    let mut config = match config_path {
        Some(path) => load_json_file::<SessionConfig>(path)?,
        None => SessionConfig::default(),
    };
    if let Some(output) = output {
        config.output_path = output.to_path_buf();
    }

    let mut session = CalibrationSession::new(config);
    for view in input.views()? {
        session.observe(Some(view), input.image_size);
        session.handle(SessionCommand::SaveSample)?;
    }
    session
        .handle(SessionCommand::Calibrate)
        .context("calibration failed")?;
    if let SessionEvent::Persisted { path } = session.handle(SessionCommand::Persist)? {
        info!("calibration saved to {}", path.display());
    }
    session.handle(SessionCommand::Quit)?;

    session
        .report()
        .cloned()
        .context("calibration produced no report")
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    logger::init_with_level(logger::level_from_verbosity(args.verbose.max(1)))?;
    let report = run_calibration_from_files(
        &args.input,
        args.config.as_deref(),
        args.output.as_deref(),
    )?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arpose_core::synthetic::{noise::PixelNoise, planar};
    use arpose_core::{IntrinsicModel, PinholeIntrinsics, TargetGeometry, TargetModel};
    use arpose_pipeline::{load_calibration, ImageSize};
    use std::fs;
    use tempfile::NamedTempFile;

    fn write_json<T: serde::Serialize>(value: &T, path: &Path) {
        serde_json::to_writer_pretty(fs::File::create(path).unwrap(), value).unwrap();
    }

    fn synthetic_input(n_views: usize) -> CalibrationInput {
        let gt =
            IntrinsicModel::pinhole(PinholeIntrinsics::new(800.0, 800.0, 320.0, 240.0).unwrap());
        let geometry = TargetGeometry::new(6, 9).unwrap();
        let target = TargetModel::new(geometry);
        let poses = planar::orbit_poses(geometry, n_views, 20.0, 0.4);
        let views = planar::project_views(&gt, &target, &poses, &PixelNoise::new(5, 0.5))
            .expect("projection");
        CalibrationInput {
            image_size: ImageSize::new(640, 480),
            target: geometry,
            detections: views
                .iter()
                .map(|v| v.image_points().iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        }
    }

    #[test]
    fn helper_smoke_test() {
        let dir = tempfile::tempdir().unwrap();
        let input_file = NamedTempFile::new().unwrap();
        write_json(&synthetic_input(5), input_file.path());
        let output = dir.path().join("calibration.txt");

        let report = run_calibration_from_files(input_file.path(), None, Some(&output))
            .expect("cli helper should succeed");

        assert!(report.rms_error < 1.0, "rms too high: {}", report.rms_error);
        let loaded = load_calibration(&output).unwrap();
        assert_eq!(loaded, report.model);
    }

    #[test]
    fn four_samples_fail() {
        let dir = tempfile::tempdir().unwrap();
        let input_file = NamedTempFile::new().unwrap();
        write_json(&synthetic_input(4), input_file.path());
        let output = dir.path().join("calibration.txt");

        let err = run_calibration_from_files(input_file.path(), None, Some(&output)).unwrap_err();
        assert!(format!("{err:#}").contains("insufficient samples"), "{err:#}");
        assert!(!output.exists());
    }
}
