//! Frame ingestion sources.
//!
//! - Local V4L2 cameras (feature: ingest-v4l2)
//! - Stub source (testing, demos)
//!
//! Every source hands out RGB24 `Frame`s. Other pixel formats are converted
//! at capture time.

pub mod camera;
#[cfg_attr(not(feature = "ingest-v4l2"), allow(dead_code))]
mod normalize;

pub use camera::{CameraConfig, CameraSource, CameraStats};
