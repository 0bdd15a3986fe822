use serde::{Deserialize, Serialize};

/// Axis-aligned box in frame pixels, `(x1, y1)` top-left and `(x2, y2)` bottom-right.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct PixelBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl PixelBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a center point and size, the layout detector heads emit.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Finite coordinates with strictly positive width and height.
    pub fn is_well_formed(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x1 < self.x2
            && self.y1 < self.y2
    }

    pub fn intersection_over_union(&self, other: &PixelBox) -> f32 {
        let left = self.x1.max(other.x1);
        let top = self.y1.max(other.y1);
        let right = self.x2.min(other.x2);
        let bottom = self.y2.min(other.y2);
        let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// Scale by independent x/y factors (model input space → frame space).
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            x2: self.x2 * sx,
            y2: self.y2 * sy,
        }
    }

    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let w = width as f32;
        let h = height as f32;
        Self {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }
}

impl From<[f32; 4]> for PixelBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<PixelBox> for [f32; 4] {
    fn from(b: PixelBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// One observation from the detector for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: PixelBox,
}

impl Detection {
    pub fn new(class_name: impl Into<String>, confidence: f32, bbox: PixelBox) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox,
        }
    }

    /// Confidence is a finite value in `0.0..=1.0` and the box is well formed.
    pub fn is_well_formed(&self) -> bool {
        self.confidence.is_finite()
            && (0.0..=1.0).contains(&self.confidence)
            && self.bbox.is_well_formed()
    }
}

/// Result of running detection on a frame.
#[derive(Clone, Debug, Default)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_or_nan_boxes_are_malformed() {
        assert!(PixelBox::new(0.0, 0.0, 1.0, 1.0).is_well_formed());
        assert!(!PixelBox::new(5.0, 0.0, 1.0, 1.0).is_well_formed());
        assert!(!PixelBox::new(0.0, 0.0, 0.0, 1.0).is_well_formed());
        assert!(!PixelBox::new(f32::NAN, 0.0, 1.0, 1.0).is_well_formed());
    }

    #[test]
    fn detection_rejects_nan_confidence() {
        let bbox = PixelBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(Detection::new("Hardhat", 0.7, bbox).is_well_formed());
        assert!(!Detection::new("Hardhat", f32::NAN, bbox).is_well_formed());
        assert!(!Detection::new("Hardhat", 1.5, bbox).is_well_formed());
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = PixelBox::new(0.0, 0.0, 4.0, 4.0);
        let b = PixelBox::new(2.0, 0.0, 6.0, 4.0);
        assert_eq!(a.intersection_over_union(&a), 1.0);
        assert!((a.intersection_over_union(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn detection_json_uses_class_and_box_keys() {
        let det: Detection =
            serde_json::from_str(r#"{"class":"Head","confidence":0.8,"box":[1,2,3,4]}"#).unwrap();
        assert_eq!(det.class_name, "Head");
        assert_eq!(det.bbox, PixelBox::new(1.0, 2.0, 3.0, 4.0));
    }
}
