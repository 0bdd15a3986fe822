use anyhow::Result;

use crate::detect::result::DetectionResult;

/// Detector backend trait.
///
/// Backends own model loading, thresholding and duplicate suppression. The
/// compliance layer only ever sees the returned detections.
///
/// `detect` is a blocking call with no cancellation path; a backend that hangs
/// stalls the monitor loop.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an RGB24 frame.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
