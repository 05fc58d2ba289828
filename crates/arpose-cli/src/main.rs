use std::path::PathBuf;

use anyhow::{Context, Result};
use arpose_core::logger;
use arpose_core::{Pt2, TargetGeometry, TargetModel};
use arpose_pipeline::io::{load_json_file, open_frame_source, PngDirSink, RecordedCorners};
use arpose_pipeline::overlay::OverlayConfig;
use arpose_pipeline::{
    load_calibration, run_frame_loop, CornerDetector, Frame, FrameLoopConfig, LoopSummary,
    OverlayHandler,
};
use clap::Parser;
use log::{info, warn};

/// Draw AR shapes on a chessboard using a saved camera calibration.
#[derive(Debug, Parser)]
#[command(author, version, about = "Chessboard pose estimation and AR overlay")]
struct Args {
    /// Calibration file written by `arpose-calibrate` (or the `f` key).
    calibration: PathBuf,

    /// Image (.jpg .png .ppm .tif) or video (.mp4 .m4v .mov .MOV .avi) file.
    /// Live capture is used when omitted.
    media: Option<PathBuf>,

    /// JSON list of per-frame corner detections (`null` = not found).
    #[arg(long)]
    corners: Option<PathBuf>,

    /// Directory receiving the annotated frames.
    #[arg(long, default_value = "overlay_out")]
    output: PathBuf,

    /// Optional JSON OverlayConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inner corners along the board's vertical axis.
    #[arg(long, default_value_t = 6)]
    rows: usize,

    /// Inner corners along the board's horizontal axis.
    #[arg(long, default_value_t = 9)]
    cols: usize,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Detector used when no recorded detections are given.
struct NoCorners;

impl CornerDetector for NoCorners {
    fn detect(&mut self, _frame: &Frame, _geometry: TargetGeometry) -> Option<Vec<Pt2>> {
        None
    }
}

fn run_overlay(args: &Args) -> Result<LoopSummary> {
    let model = load_calibration(&args.calibration)?;
    info!("read calibration from {}", args.calibration.display());

    let config = match &args.config {
        Some(path) => load_json_file::<OverlayConfig>(path)?,
        None => OverlayConfig::default(),
    };
    let target = TargetModel::new(TargetGeometry::new(args.rows, args.cols)?);

    let mut source = open_frame_source(args.media.as_deref())?;
    let mut detector: Box<dyn CornerDetector> = match &args.corners {
        Some(path) => Box::new(RecordedCorners::load(path)?),
        None => {
            warn!("no corner detections given (--corners); frames pass through unannotated");
            Box::new(NoCorners)
        }
    };
    let mut sink = PngDirSink::create(&args.output, "overlay")
        .with_context(|| format!("creating output directory {}", args.output.display()))?;
    let mut handler = OverlayHandler::new(model, &config);

    let summary = run_frame_loop(
        source.as_mut(),
        detector.as_mut(),
        &mut sink,
        &mut handler,
        &target,
        &FrameLoopConfig::default(),
    )?;
    info!(
        "{} frames, {} with the target, {} posed; output in {}",
        summary.frames,
        summary.detections,
        handler.posed_frames(),
        args.output.display()
    );
    Ok(summary)
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    logger::init_with_level(logger::level_from_verbosity(args.verbose))?;
    let summary = run_overlay(&args)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
