use std::cmp::Ordering;

use crate::detect::result::Detection;

/// Class-agnostic non-maximum suppression.
///
/// Boxes are compared regardless of class, so a "Head" and a "Hardhat" on the
/// same region collapse to whichever scored higher. Output is ordered by
/// descending confidence.
pub fn agnostic_nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    let mut suppressed = vec![false; detections.len()];
    for current in 0..detections.len() {
        if suppressed[current] {
            continue;
        }
        for other in (current + 1)..detections.len() {
            if suppressed[other] {
                continue;
            }
            let iou = detections[current]
                .bbox
                .intersection_over_union(&detections[other].bbox);
            if iou > iou_threshold {
                suppressed[other] = true;
            }
        }
    }
    let mut keep = suppressed.iter().map(|s| !s);
    detections.retain(|_| keep.next().unwrap_or(false));
    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::PixelBox;

    #[test]
    fn overlapping_boxes_of_different_classes_collapse() {
        let dets = vec![
            Detection::new("Head", 0.6, PixelBox::new(0.0, 0.0, 10.0, 10.0)),
            Detection::new("Hardhat", 0.9, PixelBox::new(1.0, 1.0, 10.0, 10.0)),
        ];
        let kept = agnostic_nms(dets, 0.45);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_name, "Hardhat");
    }

    #[test]
    fn disjoint_boxes_survive() {
        let dets = vec![
            Detection::new("Hardhat", 0.7, PixelBox::new(0.0, 0.0, 1.0, 1.0)),
            Detection::new("Hardhat", 0.8, PixelBox::new(2.0, 2.0, 3.0, 3.0)),
        ];
        let kept = agnostic_nms(dets, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.8);
    }
}
