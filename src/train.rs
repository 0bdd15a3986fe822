//! Training driver.
//!
//! Training is delegated to the external ultralytics `yolo` CLI. This module
//! owns the static hyperparameter set, the prerequisite checks and the
//! artifact layout (`<project>/<name>/weights/best.pt`).

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};

use crate::dataset::DatasetDescriptor;

pub const DEFAULT_TRAINER: &str = "yolo";
pub const DEFAULT_BASE_WEIGHTS: &str = "yolo11m.pt";
pub const DEFAULT_PROJECT_DIR: &str = "models";
pub const DEFAULT_RUN_NAME: &str = "SafeSite-AI_v2";

#[derive(Clone, Debug, PartialEq)]
pub struct Hyperparameters {
    pub epochs: u32,
    pub image_size: u32,
    /// Kept small so medium models fit on limited VRAM.
    pub batch: u32,
    pub device: String,
    /// Early-stopping patience in epochs.
    pub patience: u32,
    pub optimizer: String,
    pub lr0: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            epochs: 50,
            image_size: 640,
            batch: 8,
            device: "0".to_string(),
            patience: 15,
            optimizer: "AdamW".to_string(),
            lr0: 0.001,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrainingPlan {
    pub trainer: PathBuf,
    pub base_weights: String,
    pub dataset: PathBuf,
    pub project: PathBuf,
    pub name: String,
    pub hyperparameters: Hyperparameters,
}

impl TrainingPlan {
    pub fn new(dataset: PathBuf) -> Self {
        Self {
            trainer: PathBuf::from(DEFAULT_TRAINER),
            base_weights: DEFAULT_BASE_WEIGHTS.to_string(),
            dataset,
            project: PathBuf::from(DEFAULT_PROJECT_DIR),
            name: DEFAULT_RUN_NAME.to_string(),
            hyperparameters: Hyperparameters::default(),
        }
    }

    /// Arguments passed to the trainer executable.
    pub fn arguments(&self) -> Vec<String> {
        let hp = &self.hyperparameters;
        vec![
            "detect".to_string(),
            "train".to_string(),
            format!("model={}", self.base_weights),
            format!("data={}", self.dataset.display()),
            format!("epochs={}", hp.epochs),
            format!("imgsz={}", hp.image_size),
            format!("batch={}", hp.batch),
            format!("device={}", hp.device),
            format!("patience={}", hp.patience),
            format!("optimizer={}", hp.optimizer),
            format!("lr0={}", hp.lr0),
            format!("project={}", self.project.display()),
            format!("name={}", self.name),
            "exist_ok=True".to_string(),
            "verbose=True".to_string(),
        ]
    }

    /// The trainer invocation, ready to spawn.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.trainer);
        command.args(self.arguments());
        command
    }

    /// Weights written by a successful run.
    pub fn artifact_path(&self) -> PathBuf {
        self.project.join(&self.name).join("weights").join("best.pt")
    }

    /// The dataset descriptor must exist and parse before any GPU time is spent.
    pub fn check_prerequisites(&self) -> Result<DatasetDescriptor> {
        DatasetDescriptor::load(&self.dataset)
    }

    /// Run training to completion and return the weights path.
    pub fn run(&self) -> Result<PathBuf> {
        let descriptor = self.check_prerequisites()?;
        log::info!(
            "training {} on {} ({} classes, {} epochs)",
            self.base_weights,
            descriptor.source.display(),
            descriptor.class_names().len(),
            self.hyperparameters.epochs
        );
        run_to_completion(self.command())?;

        let artifact = self.artifact_path();
        if !artifact.is_file() {
            return Err(anyhow!(
                "trainer finished but {} was not produced",
                artifact.display()
            ));
        }
        log::info!("training complete, weights at {}", artifact.display());
        Ok(artifact)
    }

    /// Arguments for exporting `weights` to ONNX.
    pub fn export_arguments(&self, weights: &Path) -> Vec<String> {
        vec![
            "export".to_string(),
            format!("model={}", weights.display()),
            "format=onnx".to_string(),
            format!("imgsz={}", self.hyperparameters.image_size),
        ]
    }

    /// Export trained weights to ONNX next to the `.pt` file.
    pub fn export_onnx(&self, weights: &Path) -> Result<PathBuf> {
        if !weights.is_file() {
            return Err(anyhow!("weights not found at {}", weights.display()));
        }
        let mut command = Command::new(&self.trainer);
        command.args(self.export_arguments(weights));
        run_to_completion(command)?;
        let onnx = weights.with_extension("onnx");
        if !onnx.is_file() {
            return Err(anyhow!("export finished but {} was not produced", onnx.display()));
        }
        log::info!("exported {}", onnx.display());
        Ok(onnx)
    }
}

fn run_to_completion(mut command: Command) -> Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    log::info!("running {:?}", command);
    let status = command
        .status()
        .with_context(|| format!("failed to launch {}", program))?;
    if !status.success() {
        return Err(anyhow!("{} exited with {}", program, status));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_carry_static_hyperparameters() {
        let plan = TrainingPlan::new(PathBuf::from("data/data.yaml"));
        let args = plan.arguments();
        for expected in [
            "model=yolo11m.pt",
            "data=data/data.yaml",
            "epochs=50",
            "imgsz=640",
            "batch=8",
            "device=0",
            "patience=15",
            "optimizer=AdamW",
            "lr0=0.001",
            "name=SafeSite-AI_v2",
            "exist_ok=True",
        ] {
            assert!(args.iter().any(|a| a == expected), "missing {}", expected);
        }
        assert_eq!(&args[..2], &["detect".to_string(), "train".to_string()]);
    }

    #[test]
    fn command_targets_trainer_executable() {
        let mut plan = TrainingPlan::new(PathBuf::from("data/data.yaml"));
        plan.trainer = PathBuf::from("/opt/venv/bin/yolo");
        let command = plan.command();
        assert_eq!(command.get_program(), "/opt/venv/bin/yolo");
        assert_eq!(command.get_args().count(), plan.arguments().len());
    }

    #[test]
    fn artifact_lives_under_versioned_run() {
        let plan = TrainingPlan::new(PathBuf::from("data/data.yaml"));
        assert_eq!(
            plan.artifact_path(),
            PathBuf::from("models/SafeSite-AI_v2/weights/best.pt")
        );
    }

    #[test]
    fn missing_descriptor_aborts_before_spawning() {
        let mut plan = TrainingPlan::new(PathBuf::from("/nonexistent/data.yaml"));
        plan.trainer = PathBuf::from("/nonexistent/yolo");
        let err = plan.run().unwrap_err();
        assert!(err.to_string().contains("dataset descriptor not found"));
    }
}
