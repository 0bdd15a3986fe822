//! PPE compliance monitor
//!
//! Watches a camera feed for personal protective equipment, turns each
//! detection into a compliance verdict and draws the result onto the frame.
//! The same crate carries the offline tooling that feeds the detector: a
//! label remapper that folds third-party datasets into the project ontology,
//! and a driver for the external YOLO trainer.
//!
//! # Module Structure
//!
//! - `ontology`: the shared class list and its index contract
//! - `compliance`: rule table and per-frame evaluator (pure, no I/O)
//! - `detect`: detector backends (ONNX via tract, scripted replays) and NMS
//! - `ingest`: camera sources (V4L2 devices, synthetic `stub://` feeds)
//! - `render`: draws evaluator instructions onto frames
//! - `monitor`: the capture → detect → evaluate → render → show loop
//! - `remap`, `dataset`: label ETL and `data.yaml` handling
//! - `train`: training plan for the external trainer

pub mod compliance;
pub mod config;
pub mod dataset;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod monitor;
pub mod ontology;
pub mod remap;
pub mod render;
pub mod sink;
pub mod train;
pub mod ui;

pub use compliance::{
    default_rules, Color, ComplianceEvaluator, ComplianceRule, DrawInstruction, FrameEvaluation,
    RuleTable, Verdict,
};
pub use config::{BackendKind, DetectorSettings, MonitorConfig, OutputSettings, SinkKind};
pub use dataset::{DatasetDescriptor, SplitDirs};
pub use detect::{Detection, DetectionResult, DetectorBackend, PixelBox};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource, CameraStats};
pub use monitor::{Monitor, MonitorStats, StopReason};
pub use ontology::Ontology;
pub use remap::{ClassMapping, FileOutcome, RemapJob, RemapReport, Remapper};
pub use render::{RenderSettings, Renderer};
pub use sink::{DirectorySink, FrameSink, NullSink};
pub use train::{Hyperparameters, TrainingPlan};
