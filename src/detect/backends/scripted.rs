use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};

/// Replays canned per-frame detections, cycling when the script runs out.
///
/// The script file is a JSON array of frames, each an array of detections:
/// `[[{"class": "Hardhat", "confidence": 0.9, "box": [10, 10, 50, 50]}], []]`.
pub struct ScriptedBackend {
    frames: Vec<Vec<Detection>>,
    cursor: usize,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self { frames, cursor: 0 }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read detection script {}", path.display()))?;
        let frames: Vec<Vec<Detection>> = serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid detection script {}: {}", path.display(), e))?;
        log::info!(
            "ScriptedBackend: loaded {} frames from {}",
            frames.len(),
            path.display()
        );
        Ok(Self::new(frames))
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<DetectionResult> {
        if self.frames.is_empty() {
            return Ok(DetectionResult::default());
        }
        let frame = self.frames[self.cursor % self.frames.len()].clone();
        self.cursor = self.cursor.wrapping_add(1);
        Ok(DetectionResult::new(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::PixelBox;

    #[test]
    fn scripted_backend_cycles_frames() {
        let mut backend = ScriptedBackend::new(vec![
            vec![Detection::new(
                "Hardhat",
                0.9,
                PixelBox::new(10.0, 10.0, 50.0, 50.0),
            )],
            vec![],
        ]);

        assert_eq!(backend.detect(&[], 0, 0).unwrap().detections.len(), 1);
        assert!(backend.detect(&[], 0, 0).unwrap().is_empty());
        assert_eq!(backend.detect(&[], 0, 0).unwrap().detections.len(), 1);
    }

    #[test]
    fn empty_script_yields_no_detections() {
        let mut backend = ScriptedBackend::new(Vec::new());
        assert!(backend.detect(b"pixels", 2, 2).unwrap().is_empty());
    }
}
