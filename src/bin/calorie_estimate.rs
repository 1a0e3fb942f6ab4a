//! calorie_estimate - one-shot estimation from a still image or a synthetic scene.
//!
//! Reads one frame (a local image with an optional `.depth` dump next to it,
//! or a `stub://` scene), runs the estimation pipeline and prints one line
//! per food region. Configuration comes from `CALORIE_CONFIG` and the
//! `CALORIE_*` environment overrides.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use depth_calorie::dump::{read_depth_map, DumpSink};
use depth_calorie::ui::Ui;
use depth_calorie::{
    CaptureConfig, CaptureSource, EstimationContext, EstimationPipeline, EstimationRun,
    EstimatorConfig, FixedRegionDetector, NormalizedRect, PixelRect, PointCloud, Size,
};

#[derive(Parser, Debug)]
#[command(
    name = "calorie_estimate",
    about = "Estimate food volume and calories from one depth capture"
)]
struct Args {
    /// Image path or stub:// scene (defaults to the configured capture URL)
    #[arg(value_name = "INPUT")]
    input: Option<String>,

    /// Depth dump to use instead of the sibling .depth file
    #[arg(long, value_name = "PATH", conflicts_with = "no_depth")]
    depth: Option<PathBuf>,

    /// Ignore any depth data and only classify and segment
    #[arg(long)]
    no_depth: bool,

    /// Food region in image pixels as x,y,width,height (repeatable)
    #[arg(long = "region", value_name = "X,Y,W,H", value_parser = parse_region)]
    regions: Vec<PixelRect>,

    /// Print summaries as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Directory for masked images, depth renderings and dumps
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Also export one LAS point cloud per region into --out
    #[arg(long, requires = "out")]
    point_cloud: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let cfg = {
        let _stage = ui.stage("Load configuration");
        EstimatorConfig::load()?
    };

    let mut frame = {
        let _stage = ui.stage("Capture frame");
        let mut capture = CaptureConfig::from(&cfg.capture);
        if let Some(input) = &args.input {
            capture.url = input.clone();
        }
        let mut source = CaptureSource::new(capture)?;
        source.connect()?;
        source.next_frame()?
    };
    if let Some(path) = &args.depth {
        frame.depth = Some(read_depth_map(path)?);
    }
    if args.no_depth {
        frame.depth = None;
    }

    let mut context = EstimationContext::from_config(&cfg)?;
    if !args.regions.is_empty() {
        let bounds = Size::new(frame.color.width(), frame.color.height());
        let rects = args
            .regions
            .iter()
            .map(|rect| NormalizedRect::from_pixels_clamped(*rect, bounds))
            .collect();
        context = context.with_detector(Arc::new(FixedRegionDetector::new(rects)));
    }
    {
        let _stage = ui.stage("Warm up models");
        context.warm_up()?;
    }
    let pipeline = EstimationPipeline::new(Arc::new(context));

    let calibrated = match &frame.depth {
        Some(raw) => {
            let _stage = ui.stage("Calibrate depth");
            Some(Arc::new(cfg.calibrator().calibrate(raw)?))
        }
        None => {
            log::warn!("no depth data; area, volume and calories will not be estimated");
            None
        }
    };

    let outcome = {
        let mut progress = ui.progress();
        let outcome = match calibrated {
            Some(depth) => pipeline.estimate_with_depth(&frame.color, depth, &mut progress),
            None => pipeline.estimate_without_depth(&frame.color, &mut progress),
        };
        progress.finish();
        outcome
    };
    let run = outcome?;

    report(&run, args.json)?;

    if let Some(out) = &args.out {
        let _stage = ui.stage("Write outputs");
        let sink = DumpSink::new(out)?;
        let stamp = DumpSink::stamp()?;
        sink.write_frame(&stamp, &frame)?;
        sink.write_run(&stamp, &run)?;
        if args.point_cloud {
            for (index, region) in run.regions().iter().enumerate() {
                if region.depth.is_none() {
                    continue;
                }
                let cloud = PointCloud::from_region(region)?;
                if cloud.is_empty() {
                    log::warn!("region {} has no masked depth pixels; skipping", index);
                    continue;
                }
                cloud.write_las(&sink.dir().join(format!("{stamp}-region{index}.las")))?;
            }
        }
        log::info!("outputs written to {}", sink.dir().display());
    }

    Ok(())
}

fn report(run: &EstimationRun, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&run.summaries())?);
        return Ok(());
    }
    for summary in run.summaries() {
        println!("{summary}");
    }
    if let Some(total) = run.total_calories() {
        println!("total: {total:.1} kcal");
    }
    Ok(())
}

fn parse_region(value: &str) -> Result<PixelRect, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid region '{value}': {e}"))?;
    match parts.as_slice() {
        [x, y, width, height] if *width > 0 && *height > 0 => Ok(PixelRect {
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        }),
        _ => Err(format!("region '{value}' must be x,y,width,height with a non-zero size")),
    }
}
