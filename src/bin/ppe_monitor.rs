//! ppe_monitor - live PPE compliance overlay
//!
//! Captures frames, runs the detector, evaluates each detection against the
//! compliance rule table and writes annotated frames to the configured sink.
//! Ctrl-C stops the loop after the current frame.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ppe_monitor::ui::Ui;
use ppe_monitor::{BackendKind, Monitor, MonitorConfig, SinkKind, StopReason};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML (or .json) monitor configuration.
    #[arg(long, env = "PPE_CONFIG")]
    config: Option<PathBuf>,
    /// Camera device path or stub://name[?frames=N].
    #[arg(long)]
    device: Option<String>,
    /// ONNX model artifact for the tract backend.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Detector backend (tract|scripted).
    #[arg(long)]
    backend: Option<String>,
    /// Detection replay file for the scripted backend.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Directory for annotated frames; use --sink none to discard them.
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Output sink (directory|none).
    #[arg(long)]
    sink: Option<String>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let cfg = {
        let _stage = ui.stage("Load configuration");
        let mut cfg = match &args.config {
            Some(path) => MonitorConfig::load_from(path)?,
            None => MonitorConfig::load()?,
        };
        if let Some(device) = args.device {
            cfg.camera.device = device;
        }
        if let Some(model) = args.model {
            cfg.detector.model_path = model;
        }
        if let Some(backend) = args.backend.as_deref() {
            cfg.detector.backend = BackendKind::parse(backend)?;
        }
        if let Some(script) = args.script {
            cfg.detector.script_path = Some(script);
        }
        if let Some(dir) = args.output_dir {
            cfg.output.dir = dir;
        }
        if let Some(sink) = args.sink.as_deref() {
            cfg.output.sink = SinkKind::parse(sink)?;
        }
        if cfg.detector.backend == BackendKind::Scripted && cfg.detector.script_path.is_none() {
            return Err(anyhow!("--backend scripted requires --script"));
        }
        cfg
    };

    let mut monitor = {
        let _stage = ui.stage("Start monitor");
        Monitor::from_config(&cfg)?.with_max_frames(args.max_frames)
    };

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!(
        "monitoring {} (Ctrl-C to stop), frames to {}",
        cfg.camera.device,
        match cfg.output.sink {
            SinkKind::Directory => cfg.output.dir.display().to_string(),
            SinkKind::None => "nowhere".to_string(),
        }
    );
    let stats = monitor.run(&stop)?;

    println!(
        "frames={} violations={} compliant={} unmatched={} malformed={}",
        stats.frames, stats.violations, stats.compliant, stats.unmatched, stats.malformed
    );
    if stats.stop_reason == StopReason::CaptureEnded {
        log::warn!("camera stopped delivering frames");
    }
    Ok(())
}
