mod backend;
pub mod backends;
mod nms;
mod result;

use anyhow::{anyhow, Result};

pub use backend::DetectorBackend;
pub use backends::ScriptedBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use nms::agnostic_nms;
pub use result::{Detection, DetectionResult, PixelBox};

use crate::config::{BackendKind, DetectorSettings};

/// Build the configured detector backend.
///
/// The model artifact must already exist; a missing file aborts before any
/// frame is captured.
pub fn build_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend {
        BackendKind::Scripted => {
            let script = settings
                .script_path
                .as_ref()
                .ok_or_else(|| anyhow!("scripted backend requires a script path"))?;
            Ok(Box::new(ScriptedBackend::from_file(script)?))
        }
        BackendKind::Tract => {
            if !settings.model_path.exists() {
                return Err(anyhow!(
                    "model artifact not found at {} (train and export the model first)",
                    settings.model_path.display()
                ));
            }
            #[cfg(feature = "backend-tract")]
            {
                let class_names = settings.resolve_class_names()?;
                log::info!(
                    "loading detector {} ({} classes)",
                    settings.model_path.display(),
                    class_names.len()
                );
                let backend = TractBackend::new(&settings.model_path, settings.input_size, class_names)?
                    .with_threshold(settings.confidence)
                    .with_iou_threshold(settings.iou_threshold);
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                Err(anyhow!("tract detector requires the backend-tract feature"))
            }
        }
    }
}
