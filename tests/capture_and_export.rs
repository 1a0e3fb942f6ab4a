use std::sync::Arc;

use anyhow::{anyhow, Result};

use depth_calorie::dump::{read_depth_map, write_depth_map, DumpSink};
use depth_calorie::ingest::synthetic::{render_color, render_depth};
use depth_calorie::{
    CaptureConfig, CaptureSource, EstimationContext, EstimationPipeline, EstimatorConfig,
    NoProgress, PointCloud, Size,
};

#[test]
fn depth_dump_round_trips_through_text() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("scene.depth");
    let depth = render_depth(12, 9)?;

    write_depth_map(&path, &depth)?;
    let text = std::fs::read_to_string(&path)?;
    assert!(text.starts_with("12,9\n"));

    let loaded = read_depth_map(&path)?;
    assert_eq!(loaded.size(), depth.size());
    for (a, b) in loaded.samples().iter().zip(depth.samples()) {
        assert!((a - b).abs() < 1e-5);
    }
    Ok(())
}

#[test]
fn file_capture_feeds_the_pipeline_and_exports() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let image_path = dir.path().join("meal.png");
    render_color(64, 48).save(&image_path)?;
    write_depth_map(&dir.path().join("meal.depth"), &render_depth(32, 24)?)?;

    let mut source = CaptureSource::new(CaptureConfig {
        url: image_path.display().to_string(),
        ..CaptureConfig::default()
    })?;
    source.connect()?;
    let frame = source.next_frame()?;
    assert_eq!(frame.color.dimensions(), (64, 48));
    let raw = frame.depth.as_ref().ok_or_else(|| anyhow!("sibling depth not loaded"))?;

    let cfg = EstimatorConfig::default();
    let calibrated = Arc::new(cfg.calibrator().calibrate(raw)?);
    let pipeline = EstimationPipeline::new(Arc::new(EstimationContext::stub(cfg.regressor())));
    let run = pipeline.estimate_with_depth(&frame.color, calibrated, &mut NoProgress)?;

    let region = &run.regions()[0];
    assert!(region.area.unwrap_or_default() > 0.0);
    assert!(region.volume.unwrap_or_default() > 0.0);
    assert!(region.calories.is_some());

    let cloud = PointCloud::from_region(region)?;
    assert!(!cloud.is_empty());
    assert!(cloud.points().iter().all(|p| p.z > 0.0));
    let las_path = dir.path().join("meal.las");
    cloud.write_las(&las_path)?;
    assert!(std::fs::metadata(&las_path)?.len() > 0);

    let sink = DumpSink::new(dir.path().join("dumps"))?;
    let mut written = sink.write_frame("0001", &frame)?;
    written.extend(sink.write_run("0001", &run)?);
    let names: Vec<String> = written
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    assert_eq!(
        names,
        vec![
            "0001-color.png",
            "0001-depth.txt",
            "0001-region0-masked.png",
            "0001-region0-depth.png"
        ]
    );
    Ok(())
}

#[test]
fn dumped_frames_replay_with_their_depth() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut synthetic = CaptureSource::new(CaptureConfig {
        width: 32,
        height: 24,
        depth_width: 16,
        depth_height: 12,
        ..CaptureConfig::default()
    })?;
    let frame = synthetic.next_frame()?;
    let sink = DumpSink::new(dir.path())?;
    let written = sink.write_frame("0042", &frame)?;

    let mut replay = CaptureSource::new(CaptureConfig {
        url: written[0].display().to_string(),
        ..CaptureConfig::default()
    })?;
    let replayed = replay.next_frame()?;
    let depth = replayed
        .depth
        .as_ref()
        .ok_or_else(|| anyhow!("dumped depth not picked up"))?;
    assert_eq!(depth.size(), Size::new(16, 12));
    Ok(())
}

#[test]
fn depthless_capture_still_classifies() -> Result<()> {
    let mut source = CaptureSource::new(CaptureConfig {
        url: "stub://plate?nodepth".to_string(),
        width: 48,
        height: 48,
        ..CaptureConfig::default()
    })?;
    let frame = source.next_frame()?;
    assert!(frame.depth.is_none());

    let pipeline = EstimationPipeline::new(Arc::new(EstimationContext::stub(Default::default())));
    let run = pipeline.estimate_without_depth(&frame.color, &mut NoProgress)?;
    assert!(run.regions()[0].calories.is_none());
    assert_eq!(run.total_calories(), None);
    Ok(())
}
