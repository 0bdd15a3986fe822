use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use ppe_monitor::{BackendKind, Color, MonitorConfig, SinkKind};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PPE_CONFIG",
        "PPE_CAMERA_DEVICE",
        "PPE_MODEL_PATH",
        "PPE_DETECTOR_BACKEND",
        "PPE_CONFIDENCE",
        "PPE_OUTPUT_DIR",
    ] {
        std::env::remove_var(key);
    }
}

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = MonitorConfig::load().expect("load defaults");

    assert_eq!(cfg.camera.device, "/dev/video0");
    assert_eq!((cfg.camera.width, cfg.camera.height), (1280, 720));
    assert_eq!(cfg.detector.backend, BackendKind::Tract);
    assert_eq!(
        cfg.detector.model_path,
        PathBuf::from("models/SafeSite-AI_v2/weights/best.onnx")
    );
    assert_eq!(cfg.detector.confidence, 0.5);
    assert_eq!(cfg.output.sink, SinkKind::Directory);
    assert_eq!(cfg.rules.len(), 4);
    assert!(cfg.rule_table().unwrap().lookup("Head").is_some());
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = toml_file(
        r#"
        health_log_secs = 30

        [camera]
        device = "/dev/video2"
        width = 640
        height = 480

        [detector]
        backend = "scripted"
        script_path = "replay.json"
        confidence = 0.4
        input_size = 320

        [output]
        sink = "none"

        [[rules]]
        classes = ["Hardhat"]
        verdict = "compliant"
        color = "green"
        text = "SAFE: HELMET"

        [[rules]]
        classes = ["Person"]
        verdict = "ignored"
        "#,
    );

    std::env::set_var("PPE_CONFIG", file.path());
    std::env::set_var("PPE_CAMERA_DEVICE", "stub://yard");
    std::env::set_var("PPE_CONFIDENCE", "0.65");
    std::env::set_var("PPE_OUTPUT_DIR", "/tmp/ppe_frames");

    let cfg = MonitorConfig::load().expect("load config");
    clear_env();

    assert_eq!(cfg.camera.device, "stub://yard");
    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.detector.backend, BackendKind::Scripted);
    assert_eq!(cfg.detector.script_path, Some(PathBuf::from("replay.json")));
    assert_eq!(cfg.detector.input_size, 320);
    assert_eq!(cfg.detector.confidence, 0.65);
    assert_eq!(cfg.output.sink, SinkKind::None);
    assert_eq!(cfg.output.dir, PathBuf::from("/tmp/ppe_frames"));
    assert_eq!(cfg.health_log_secs, 30);

    let table = cfg.rule_table().unwrap();
    assert_eq!(table.lookup("Hardhat").unwrap().color, Some(Color::Green));
    assert!(table.lookup("Head").is_none());
}

#[test]
fn rejects_out_of_range_confidence() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PPE_CONFIDENCE", "1.5");
    let result = MonitorConfig::load();
    clear_env();

    assert!(result.is_err());
}

#[test]
fn rejects_duplicate_rule_triggers() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = toml_file(
        r#"
        [[rules]]
        classes = ["Head"]
        verdict = "violation"
        color = "red"
        text = "DANGER: NO HELMET"

        [[rules]]
        classes = ["Head", "Hardhat"]
        verdict = "compliant"
        color = "green"
        text = "SAFE: HELMET"
        "#,
    );

    let err = MonitorConfig::load_from(file.path()).unwrap_err();
    assert!(err.to_string().contains("Head"), "{err}");
}

#[test]
fn scripted_backend_requires_script() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PPE_DETECTOR_BACKEND", "scripted");
    let result = MonitorConfig::load();
    clear_env();

    assert!(result.is_err());
}
