//! calorie_cam - capture loop with on-demand estimation.
//!
//! A capture thread keeps the latest frame fresh. Every line read from stdin
//! triggers one estimation run on the current frame; a trigger that arrives
//! while a run is in flight is ignored. Ctrl-C or end of input stops the loop.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::{BufRead, IsTerminal};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use depth_calorie::dump::DumpSink;
use depth_calorie::ui::Ui;
use depth_calorie::{
    CaptureConfig, CaptureFeed, CaptureSource, EstimationContext, EstimationPipeline,
    EstimatorConfig, Frame, LatestFrame, PipelineRunner, RunHandle,
};

#[derive(Parser, Debug)]
#[command(name = "calorie_cam", about = "Capture loop with on-demand calorie estimation")]
struct Args {
    /// Capture URL override (stub://... or a local image path)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

enum Command {
    Trigger,
    Quit,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let cfg = EstimatorConfig::load()?;
    let mut capture = CaptureConfig::from(&cfg.capture);
    if let Some(url) = args.url {
        capture.url = url;
    }
    let target_fps = capture.target_fps;
    let source = CaptureSource::new(capture)?;

    let context = EstimationContext::from_config(&cfg)?;
    context.warm_up()?;
    let runner = PipelineRunner::new(EstimationPipeline::new(Arc::new(context)), cfg.calibrator());
    let sink = cfg.dump_dir.as_ref().map(DumpSink::new).transpose()?;

    let latest = Arc::new(LatestFrame::new());
    let feed = CaptureFeed::spawn(source, Arc::clone(&latest), target_fps)?;

    let (tx, rx) = mpsc::channel();
    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(Command::Quit);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if line.is_err() || tx.send(Command::Trigger).is_err() {
                    break;
                }
            }
            let _ = tx.send(Command::Quit);
        })?;

    log::info!("calorie_cam running. press Enter to estimate, Ctrl-C to quit");

    let mut reporters: Vec<JoinHandle<()>> = Vec::new();
    while let Ok(Command::Trigger) = rx.recv() {
        reporters.retain(|handle| !handle.is_finished());
        if !feed.is_running() {
            log::error!("capture feed stopped; exiting");
            break;
        }
        let Some(frame) = latest.snapshot()? else {
            log::warn!("no frame captured yet; trigger ignored");
            continue;
        };
        match runner.trigger(Arc::clone(&frame)) {
            Ok(Some(handle)) => {
                reporters.push(spawn_reporter(handle, frame, ui.clone(), sink.clone())?);
            }
            Ok(None) => eprintln!("estimation in progress; trigger ignored"),
            Err(e) => log::warn!("trigger rejected: {:#}", e),
        }
    }

    log::info!("shutting down");
    for handle in reporters {
        let _ = handle.join();
    }
    feed.stop()
}

/// Wait for one run on its own thread so the loop keeps accepting triggers.
fn spawn_reporter(
    handle: RunHandle,
    frame: Arc<Frame>,
    ui: Ui,
    sink: Option<DumpSink>,
) -> Result<JoinHandle<()>> {
    let thread = std::thread::Builder::new()
        .name("reporter".to_string())
        .spawn(move || {
            let mut progress = ui.progress();
            let outcome = handle.wait(&mut progress);
            progress.finish();
            match outcome {
                Some(Ok(run)) => {
                    for summary in run.summaries() {
                        println!("{summary}");
                    }
                    if let Some(sink) = &sink {
                        let written = DumpSink::stamp().and_then(|stamp| {
                            sink.write_frame(&stamp, &frame)?;
                            sink.write_run(&stamp, &run)
                        });
                        if let Err(e) = written {
                            log::warn!("dump failed: {:#}", e);
                        }
                    }
                }
                Some(Err(e)) => eprintln!("{e}"),
                None => log::error!("estimation worker ended without a result"),
            }
        })?;
    Ok(thread)
}
