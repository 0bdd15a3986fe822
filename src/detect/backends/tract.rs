#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::nms::agnostic_nms;
use crate::detect::result::{Detection, DetectionResult, PixelBox};

/// Tract-based backend for ONNX exports of the trained detector.
///
/// Expects a single `[1, 4 + classes, anchors]` output where the first four
/// rows are center-x, center-y, width, height in model input pixels and the
/// rest are per-class scores.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: u32,
    class_names: Vec<String>,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for square `input_size` inputs.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        input_size: u32,
        class_names: Vec<String>,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            class_names,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Override the default suppression IoU.
    pub fn with_iou_threshold(mut self, iou: f32) -> Self {
        self.iou_threshold = iou;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let frame = RgbImage::from_raw(width, height, pixels.to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", width, height))?;
        let resized = image::imageops::resize(
            &frame,
            self.input_size,
            self.input_size,
            FilterType::Triangle,
        );

        let side = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, width: u32, height: u32) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("model output was not rank 3")?;
        let decoder = OutputDecoder {
            class_names: &self.class_names,
            input_size: self.input_size,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
        };
        decoder.decode(view, width, height)
    }
}

/// Turns a `[1, 4 + classes, anchors]` prediction tensor into frame-space detections.
struct OutputDecoder<'a> {
    class_names: &'a [String],
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl OutputDecoder<'_> {
    fn decode(
        &self,
        view: tract_ndarray::ArrayView3<f32>,
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>> {
        let (_, rows, anchors) = view.dim();
        if rows <= 4 {
            return Err(anyhow!("model output has {} rows, expected > 4", rows));
        }

        let sx = width as f32 / self.input_size as f32;
        let sy = height as f32 / self.input_size as f32;
        let mut candidates = Vec::new();
        for i in 0..anchors {
            let mut best_class = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for row in 4..rows {
                let score = view[[0, row, i]];
                if score > best_score {
                    best_score = score;
                    best_class = row - 4;
                }
            }
            if best_score.is_nan() || best_score < self.confidence_threshold {
                continue;
            }
            let bbox = PixelBox::from_center(
                view[[0, 0, i]],
                view[[0, 1, i]],
                view[[0, 2, i]],
                view[[0, 3, i]],
            )
            .scaled(sx, sy)
            .clamped(width, height);
            // Indices past the configured names keep their numeric ID.
            let class_name = self
                .class_names
                .get(best_class)
                .cloned()
                .unwrap_or_else(|| best_class.to_string());
            candidates.push(Detection::new(class_name, best_score, bbox));
        }

        Ok(agnostic_nms(candidates, self.iou_threshold))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let detections = self.decode(outputs, width, height)?;
        Ok(DetectionResult::new(detections))
    }

    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size;
        let blank = vec![0u8; (side as usize) * (side as usize) * 3];
        self.detect(&blank, side, side).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Rows: cx, cy, w, h, score(class 0), score(class 1); one column per anchor.
    fn predictions() -> tract_ndarray::Array3<f32> {
        let rows: [[f32; 4]; 6] = [
            [100.0, 102.0, 300.0, 630.0],
            [100.0, 100.0, 300.0, 630.0],
            [40.0, 40.0, 40.0, 40.0],
            [40.0, 40.0, 40.0, 40.0],
            [0.9, 0.2, 0.3, 0.0],
            [0.1, 0.7, 0.4, 0.8],
        ];
        tract_ndarray::Array3::from_shape_fn((1, 6, 4), |(_, r, a)| rows[r][a])
    }

    #[test]
    fn decodes_scales_and_suppresses_across_classes() {
        let names = vec!["Hardhat".to_string()];
        let decoder = OutputDecoder {
            class_names: &names,
            input_size: 640,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
        };
        let tensor = predictions();
        let detections = decoder.decode(tensor.view(), 1280, 720).unwrap();

        // Anchor 1 overlaps anchor 0 with another class and loses; anchor 2
        // is under threshold.
        assert_eq!(detections.len(), 2);

        assert_eq!(detections[0].class_name, "Hardhat");
        assert_eq!(detections[0].confidence, 0.9);
        assert_eq!(detections[0].bbox, PixelBox::new(160.0, 90.0, 240.0, 135.0));

        // Unnamed class index falls back to its number; box clamped to frame.
        assert_eq!(detections[1].class_name, "1");
        assert_eq!(detections[1].confidence, 0.8);
        assert_eq!(detections[1].bbox, PixelBox::new(1220.0, 686.25, 1280.0, 720.0));
    }

    #[test]
    fn rejects_output_without_class_rows() {
        let names: Vec<String> = Vec::new();
        let decoder = OutputDecoder {
            class_names: &names,
            input_size: 640,
            confidence_threshold: 0.5,
            iou_threshold: 0.45,
        };
        let tensor = tract_ndarray::Array3::<f32>::zeros((1, 4, 8));
        assert!(decoder.decode(tensor.view(), 640, 640).is_err());
    }
}
