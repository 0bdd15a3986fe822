//! Display sinks for annotated frames.

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::RgbImage;

/// Receives each annotated frame at the end of a loop iteration.
pub trait FrameSink {
    fn name(&self) -> &'static str;

    fn show(&mut self, index: u64, frame: &RgbImage) -> Result<()>;
}

/// Discards frames. Useful for headless runs that only want the logs.
#[derive(Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn name(&self) -> &'static str {
        "none"
    }

    fn show(&mut self, _index: u64, _frame: &RgbImage) -> Result<()> {
        Ok(())
    }
}

/// Writes every Nth annotated frame to a directory as `frame_<index>.jpg`.
pub struct DirectorySink {
    dir: PathBuf,
    every: u64,
    written: u64,
}

impl DirectorySink {
    pub fn new(dir: PathBuf, every: u64) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(Self {
            dir,
            every: every.max(1),
            written: 0,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for DirectorySink {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn show(&mut self, index: u64, frame: &RgbImage) -> Result<()> {
        if index % self.every != 0 {
            return Ok(());
        }
        let path = self.dir.join(format!("frame_{:06}.jpg", index));
        frame
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_sink_honours_stride() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut sink = DirectorySink::new(dir.path().join("out"), 2)?;
        let frame = RgbImage::new(4, 4);
        for index in 1..=4 {
            sink.show(index, &frame)?;
        }
        assert_eq!(sink.written(), 2);
        assert!(dir.path().join("out/frame_000002.jpg").is_file());
        assert!(!dir.path().join("out/frame_000001.jpg").exists());
        Ok(())
    }
}
