use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::compliance::{default_rules, ComplianceRule, RuleTable};
use crate::dataset::DatasetDescriptor;
use crate::ingest::CameraConfig;
use crate::ontology::Ontology;
use crate::render::RenderSettings;

const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAMERA_WIDTH: u32 = 1280;
const DEFAULT_CAMERA_HEIGHT: u32 = 720;
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_MODEL_PATH: &str = "models/SafeSite-AI_v2/weights/best.onnx";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.5;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_OUTPUT_DIR: &str = "monitor_out";
const DEFAULT_SAVE_EVERY: u64 = 1;
const DEFAULT_HEALTH_LOG_SECS: u64 = 5;

#[derive(Debug, Deserialize, Default)]
struct MonitorConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    render: Option<RenderConfigFile>,
    output: Option<OutputConfigFile>,
    rules: Option<Vec<ComplianceRule>>,
    health_log_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    script_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence: Option<f32>,
    iou_threshold: Option<f32>,
    class_names: Option<Vec<String>>,
    dataset: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct RenderConfigFile {
    font_path: Option<PathBuf>,
    font_scale: Option<f32>,
    box_thickness: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    sink: Option<String>,
    dir: Option<PathBuf>,
    save_every: Option<u64>,
}

/// Which detector implementation to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Tract,
    Scripted,
}

impl BackendKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tract" => Ok(Self::Tract),
            "scripted" => Ok(Self::Scripted),
            other => Err(anyhow!(
                "unknown detector backend '{}' (expected tract|scripted)",
                other
            )),
        }
    }
}

/// Where annotated frames go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SinkKind {
    Directory,
    None,
}

impl SinkKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "directory" | "dir" => Ok(Self::Directory),
            "none" => Ok(Self::None),
            other => Err(anyhow!(
                "unknown output sink '{}' (expected directory|none)",
                other
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DetectorSettings {
    pub backend: BackendKind,
    pub model_path: PathBuf,
    pub script_path: Option<PathBuf>,
    pub input_size: u32,
    pub confidence: f32,
    pub iou_threshold: f32,
    pub class_names: Option<Vec<String>>,
    pub dataset: Option<PathBuf>,
}

impl DetectorSettings {
    /// Class names for model output indices: explicit list, then the dataset
    /// descriptor, then the built-in ontology.
    pub fn resolve_class_names(&self) -> Result<Vec<String>> {
        if let Some(names) = &self.class_names {
            return Ok(names.clone());
        }
        if let Some(path) = &self.dataset {
            let descriptor = DatasetDescriptor::load(path)?;
            return Ok(descriptor.class_names().to_vec());
        }
        Ok(Ontology::default().names().to_vec())
    }
}

#[derive(Clone, Debug)]
pub struct OutputSettings {
    pub sink: SinkKind,
    pub dir: PathBuf,
    pub save_every: u64,
}

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub camera: CameraConfig,
    pub detector: DetectorSettings,
    pub render: RenderSettings,
    pub font_path: Option<PathBuf>,
    pub output: OutputSettings,
    pub rules: Vec<ComplianceRule>,
    pub health_log_secs: u64,
}

impl MonitorConfig {
    /// Read `PPE_CONFIG` (if set), fill defaults, apply env overrides, validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PPE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a specific file without consulting `PPE_CONFIG`. Env overrides still apply.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Result<Self> {
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraConfig {
            device: camera_file
                .device
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            width: camera_file.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
        };

        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: match detector_file.backend.as_deref() {
                Some(name) => BackendKind::parse(name)?,
                None => BackendKind::Tract,
            },
            model_path: detector_file
                .model_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            script_path: detector_file.script_path,
            input_size: detector_file.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
            confidence: detector_file.confidence.unwrap_or(DEFAULT_CONFIDENCE),
            iou_threshold: detector_file
                .iou_threshold
                .unwrap_or(DEFAULT_IOU_THRESHOLD),
            class_names: detector_file.class_names,
            dataset: detector_file.dataset,
        };

        let render_file = file.render.unwrap_or_default();
        let render_defaults = RenderSettings::default();
        let render = RenderSettings {
            box_thickness: render_file
                .box_thickness
                .unwrap_or(render_defaults.box_thickness),
            font_scale: render_file.font_scale.unwrap_or(render_defaults.font_scale),
        };

        let output_file = file.output.unwrap_or_default();
        let output = OutputSettings {
            sink: match output_file.sink.as_deref() {
                Some(name) => SinkKind::parse(name)?,
                None => SinkKind::Directory,
            },
            dir: output_file
                .dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            save_every: output_file.save_every.unwrap_or(DEFAULT_SAVE_EVERY),
        };

        Ok(Self {
            camera,
            detector,
            render,
            font_path: render_file.font_path,
            output,
            rules: file.rules.unwrap_or_else(default_rules),
            health_log_secs: file.health_log_secs.unwrap_or(DEFAULT_HEALTH_LOG_SECS),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("PPE_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(backend) = std::env::var("PPE_DETECTOR_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = BackendKind::parse(&backend)?;
            }
        }
        if let Ok(path) = std::env::var("PPE_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = PathBuf::from(path);
            }
        }
        if let Ok(confidence) = std::env::var("PPE_CONFIDENCE") {
            self.detector.confidence = confidence
                .trim()
                .parse()
                .map_err(|_| anyhow!("PPE_CONFIDENCE must be a number between 0 and 1"))?;
        }
        if let Ok(dir) = std::env::var("PPE_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = PathBuf::from(dir);
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera resolution must be non-zero"));
        }
        if !(self.detector.confidence > 0.0 && self.detector.confidence <= 1.0) {
            return Err(anyhow!(
                "detector confidence must be in (0, 1], got {}",
                self.detector.confidence
            ));
        }
        if !(self.detector.iou_threshold > 0.0 && self.detector.iou_threshold <= 1.0) {
            return Err(anyhow!(
                "detector iou_threshold must be in (0, 1], got {}",
                self.detector.iou_threshold
            ));
        }
        if self.detector.input_size == 0 || self.detector.input_size % 32 != 0 {
            return Err(anyhow!(
                "detector input_size must be a positive multiple of 32, got {}",
                self.detector.input_size
            ));
        }
        if self.detector.backend == BackendKind::Scripted && self.detector.script_path.is_none() {
            return Err(anyhow!("scripted detector backend requires detector.script_path"));
        }
        if self.output.save_every == 0 {
            return Err(anyhow!("output save_every must be at least 1"));
        }
        // Surface duplicate or incomplete rules at startup.
        RuleTable::new(self.rules.clone())?;
        Ok(())
    }

    pub fn rule_table(&self) -> Result<RuleTable> {
        RuleTable::new(self.rules.clone())
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
