//! Frame-by-frame compliance monitor.
//!
//! One iteration is `capture → detect → evaluate → render → show`, with no
//! overlap between stages and no state carried from one frame's verdict to
//! the next. The stop flag is polled once per iteration; a detector call that
//! never returns cannot be interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::compliance::{ComplianceEvaluator, FrameEvaluation, Verdict};
use crate::config::{MonitorConfig, SinkKind};
use crate::detect::{build_backend, DetectorBackend};
use crate::frame::Frame;
use crate::ingest::CameraSource;
use crate::render::Renderer;
use crate::sink::{DirectorySink, FrameSink, NullSink};

/// Why the loop ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StopReason {
    #[default]
    Cancelled,
    FrameLimit,
    /// The camera stopped delivering frames.
    CaptureEnded,
}

/// Totals over one monitor run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub frames: u64,
    pub instructions: u64,
    pub compliant: u64,
    pub violations: u64,
    pub unmatched: u64,
    pub ignored: u64,
    pub malformed: u64,
    pub stop_reason: StopReason,
}

impl MonitorStats {
    fn record(&mut self, evaluation: &FrameEvaluation) {
        self.frames += 1;
        self.instructions += evaluation.instructions.len() as u64;
        self.compliant += evaluation.compliant() as u64;
        self.violations += evaluation.violations() as u64;
        self.unmatched += evaluation.unmatched as u64;
        self.ignored += evaluation.ignored as u64;
        self.malformed += evaluation.malformed as u64;
    }
}

pub struct Monitor {
    source: CameraSource,
    detector: Box<dyn DetectorBackend>,
    evaluator: ComplianceEvaluator,
    renderer: Renderer,
    sink: Box<dyn FrameSink>,
    max_frames: Option<u64>,
    health_every: Duration,
}

impl Monitor {
    pub fn new(
        source: CameraSource,
        detector: Box<dyn DetectorBackend>,
        evaluator: ComplianceEvaluator,
        renderer: Renderer,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        Self {
            source,
            detector,
            evaluator,
            renderer,
            sink,
            max_frames: None,
            health_every: Duration::from_secs(5),
        }
    }

    /// Assemble every stage from configuration.
    ///
    /// Prerequisites (model artifact, font, rule table) are checked here so a
    /// broken setup fails before the camera is opened.
    pub fn from_config(cfg: &MonitorConfig) -> Result<Self> {
        let evaluator = ComplianceEvaluator::new(cfg.rule_table()?);
        let mut detector = build_backend(&cfg.detector)?;
        detector.warm_up()?;
        let font = match &cfg.font_path {
            Some(path) => Some(Renderer::load_font(path)?),
            None => None,
        };
        let renderer = Renderer::new(font, cfg.render.clone());
        let sink: Box<dyn FrameSink> = match cfg.output.sink {
            SinkKind::Directory => Box::new(DirectorySink::new(
                cfg.output.dir.clone(),
                cfg.output.save_every,
            )?),
            SinkKind::None => Box::new(NullSink),
        };
        let mut source = CameraSource::new(cfg.camera.clone())?;
        source.connect()?;

        let mut monitor = Self::new(source, detector, evaluator, renderer, sink);
        monitor.health_every = Duration::from_secs(cfg.health_log_secs.max(1));
        Ok(monitor)
    }

    /// Stop after `limit` frames.
    pub fn with_max_frames(mut self, limit: Option<u64>) -> Self {
        self.max_frames = limit;
        self
    }

    pub fn run(&mut self, stop: &AtomicBool) -> Result<MonitorStats> {
        let mut stats = MonitorStats::default();
        let mut last_health_log = Instant::now();
        log::info!(
            "monitor running: detector={} sink={}",
            self.detector.name(),
            self.sink.name()
        );

        loop {
            if stop.load(Ordering::SeqCst) {
                stats.stop_reason = StopReason::Cancelled;
                break;
            }
            if self.max_frames.is_some_and(|limit| stats.frames >= limit) {
                stats.stop_reason = StopReason::FrameLimit;
                break;
            }

            let mut frame = match self.source.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("capture failed, stopping monitor: {:#}", err);
                    stats.stop_reason = StopReason::CaptureEnded;
                    break;
                }
            };

            if let Err(err) = self.process_frame(&mut frame, &mut stats) {
                self.source.release();
                log::error!(
                    "monitor aborted at frame #{} after {} frames: {:#}",
                    frame.index,
                    stats.frames,
                    err
                );
                return Err(err);
            }

            if last_health_log.elapsed() >= self.health_every {
                let camera = self.source.stats();
                log::info!(
                    "camera health={} frames={} device={} violations={} unmatched={} latency={}ms",
                    self.source.is_healthy(),
                    camera.frames_captured,
                    camera.device,
                    stats.violations,
                    stats.unmatched,
                    frame.age_ms()
                );
                last_health_log = Instant::now();
            }
        }

        self.source.release();
        log::info!(
            "monitor stopped ({:?}) after {} frames: {} compliant, {} violations, {} unmatched, {} malformed",
            stats.stop_reason,
            stats.frames,
            stats.compliant,
            stats.violations,
            stats.unmatched,
            stats.malformed
        );
        Ok(stats)
    }

    /// Detect, evaluate, draw and show one frame.
    fn process_frame(&mut self, frame: &mut Frame, stats: &mut MonitorStats) -> Result<()> {
        let result = self
            .detector
            .detect(frame.pixels(), frame.width(), frame.height())?;
        let evaluation = self.evaluator.evaluate(&result.detections);
        for instruction in &evaluation.instructions {
            if instruction.verdict == Verdict::Violation {
                log::info!(
                    "frame #{}: {} ({} conf={:.2})",
                    frame.index,
                    instruction.text,
                    instruction.class_name,
                    instruction.confidence
                );
            }
        }
        if evaluation.dropped() > 0 {
            log::debug!(
                "frame #{}: dropped unmatched={} ignored={} malformed={}",
                frame.index,
                evaluation.unmatched,
                evaluation.ignored,
                evaluation.malformed
            );
        }

        self.renderer
            .draw(frame.image_mut(), &evaluation.instructions);
        self.sink.show(frame.index, frame.image())?;
        stats.record(&evaluation);
        Ok(())
    }

    pub fn source(&self) -> &CameraSource {
        &self.source
    }
}
