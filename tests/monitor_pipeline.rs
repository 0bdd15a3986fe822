use std::sync::atomic::AtomicBool;

use anyhow::{anyhow, Result};
use image::RgbImage;

use ppe_monitor::detect::ScriptedBackend;
use ppe_monitor::{
    CameraConfig, CameraSource, ComplianceEvaluator, Detection, DetectionResult, DetectorBackend,
    DirectorySink, FrameSink, Monitor, NullSink, PixelBox, RenderSettings, Renderer, RuleTable,
    StopReason,
};

struct FailingDetector;

impl DetectorBackend for FailingDetector {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<DetectionResult> {
        Err(anyhow!("inference backend lost"))
    }
}

/// Accepts `ok_frames` frames, then fails.
struct FlakySink {
    ok_frames: u64,
}

impl FrameSink for FlakySink {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn show(&mut self, index: u64, _frame: &RgbImage) -> Result<()> {
        if index > self.ok_frames {
            return Err(anyhow!("display closed"));
        }
        Ok(())
    }
}

fn stub_source(device: &str) -> CameraSource {
    let mut source = CameraSource::new(CameraConfig {
        device: device.to_string(),
        target_fps: 30,
        width: 160,
        height: 120,
    })
    .expect("stub source");
    source.connect().expect("connect");
    source
}

fn script() -> ScriptedBackend {
    ScriptedBackend::new(vec![
        vec![
            Detection::new("Hardhat", 0.9, PixelBox::new(10.0, 40.0, 50.0, 80.0)),
            Detection::new("Head", 0.8, PixelBox::new(80.0, 40.0, 120.0, 80.0)),
        ],
        vec![Detection::new(
            "Unknown",
            0.7,
            PixelBox::new(0.0, 0.0, 20.0, 20.0),
        )],
    ])
}

fn renderer() -> Renderer {
    Renderer::new(None, RenderSettings::default())
}

#[test]
fn runs_until_capture_ends() {
    let mut monitor = Monitor::new(
        stub_source("stub://yard?frames=3"),
        Box::new(script()),
        ComplianceEvaluator::new(RuleTable::default()),
        renderer(),
        Box::new(NullSink),
    );

    let stats = monitor.run(&AtomicBool::new(false)).expect("run");

    assert_eq!(stats.stop_reason, StopReason::CaptureEnded);
    assert!(!monitor.source().is_connected());
    assert_eq!(stats.frames, 3);
    // Frames 1 and 3 replay the first script entry, frame 2 the second.
    assert_eq!(stats.compliant, 2);
    assert_eq!(stats.violations, 2);
    assert_eq!(stats.unmatched, 1);
    assert_eq!(stats.instructions, 4);
}

#[test]
fn frame_limit_stops_loop_and_frames_are_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sink = DirectorySink::new(dir.path().join("frames"), 1).expect("sink");
    let mut monitor = Monitor::new(
        stub_source("stub://yard"),
        Box::new(script()),
        ComplianceEvaluator::new(RuleTable::default()),
        renderer(),
        Box::new(sink),
    )
    .with_max_frames(Some(2));

    let stats = monitor.run(&AtomicBool::new(false)).expect("run");

    assert_eq!(stats.stop_reason, StopReason::FrameLimit);
    assert_eq!(stats.frames, 2);
    assert!(dir.path().join("frames/frame_000001.jpg").is_file());
    assert!(dir.path().join("frames/frame_000002.jpg").is_file());
}

#[test]
fn raised_stop_flag_processes_no_frames() {
    let mut monitor = Monitor::new(
        stub_source("stub://yard"),
        Box::new(script()),
        ComplianceEvaluator::new(RuleTable::default()),
        renderer(),
        Box::new(NullSink),
    );

    let stats = monitor.run(&AtomicBool::new(true)).expect("run");

    assert_eq!(stats.stop_reason, StopReason::Cancelled);
    assert_eq!(stats.frames, 0);
}

#[test]
fn from_config_wires_scripted_backend() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script_path = dir.path().join("replay.json");
    std::fs::write(
        &script_path,
        r#"[[{"class": "NO-Safety Vest", "confidence": 0.88, "box": [5, 5, 60, 90]}]]"#,
    )
    .expect("write script");
    let config_path = dir.path().join("monitor.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
            [camera]
            device = "stub://gate?frames=4"
            width = 96
            height = 96

            [detector]
            backend = "scripted"
            script_path = "{}"

            [output]
            sink = "none"
            "#,
            script_path.display()
        ),
    )
    .expect("write config");

    let cfg = ppe_monitor::MonitorConfig::load_from(&config_path).expect("config");
    let mut monitor = Monitor::from_config(&cfg).expect("monitor");
    let stats = monitor.run(&AtomicBool::new(false)).expect("run");

    assert_eq!(stats.frames, 4);
    assert_eq!(stats.violations, 4);
    assert_eq!(stats.stop_reason, StopReason::CaptureEnded);
}

#[test]
fn detector_error_releases_camera_and_propagates() {
    let mut monitor = Monitor::new(
        stub_source("stub://yard"),
        Box::new(FailingDetector),
        ComplianceEvaluator::new(RuleTable::default()),
        renderer(),
        Box::new(NullSink),
    );

    let err = monitor.run(&AtomicBool::new(false)).unwrap_err();

    assert!(err.to_string().contains("inference backend lost"));
    assert!(!monitor.source().is_connected());
}

#[test]
fn sink_error_releases_camera_and_propagates() {
    let mut monitor = Monitor::new(
        stub_source("stub://yard"),
        Box::new(script()),
        ComplianceEvaluator::new(RuleTable::default()),
        renderer(),
        Box::new(FlakySink { ok_frames: 2 }),
    );

    let err = monitor.run(&AtomicBool::new(false)).unwrap_err();

    assert!(err.to_string().contains("display closed"));
    assert!(!monitor.source().is_connected());
}
