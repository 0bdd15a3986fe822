use crate::compliance::rules::{Color, RuleTable, Verdict};
use crate::detect::{Detection, PixelBox};

/// One overlay to paint: box, color and label text.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawInstruction {
    pub bbox: PixelBox,
    pub color: Color,
    pub text: String,
    pub verdict: Verdict,
    pub class_name: String,
    /// Carried for logging; not part of the rendered label.
    pub confidence: f32,
}

/// Evaluation of a single frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameEvaluation {
    pub instructions: Vec<DrawInstruction>,
    /// Detections whose class has no rule.
    pub unmatched: usize,
    /// Detections matched by an `ignored` rule.
    pub ignored: usize,
    /// Detections with NaN/out-of-range confidence or degenerate boxes.
    pub malformed: usize,
}

impl FrameEvaluation {
    pub fn violations(&self) -> usize {
        self.count(Verdict::Violation)
    }

    pub fn compliant(&self) -> usize {
        self.count(Verdict::Compliant)
    }

    pub fn dropped(&self) -> usize {
        self.unmatched + self.ignored + self.malformed
    }

    fn count(&self, verdict: Verdict) -> usize {
        self.instructions
            .iter()
            .filter(|i| i.verdict == verdict)
            .count()
    }
}

/// Maps detections to draw instructions through a rule table.
///
/// Stateless across frames: every call depends only on its own input.
#[derive(Clone, Debug, Default)]
pub struct ComplianceEvaluator {
    table: RuleTable,
}

impl ComplianceEvaluator {
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn evaluate(&self, detections: &[Detection]) -> FrameEvaluation {
        let mut evaluation = FrameEvaluation::default();
        for det in detections {
            if !det.is_well_formed() {
                log::debug!(
                    "dropping malformed detection class={} conf={} box={:?}",
                    det.class_name,
                    det.confidence,
                    det.bbox
                );
                evaluation.malformed += 1;
                continue;
            }
            let Some(rule) = self.table.lookup(&det.class_name) else {
                log::debug!("no rule for class {}", det.class_name);
                evaluation.unmatched += 1;
                continue;
            };
            // RuleTable guarantees color and text for drawn verdicts.
            match (rule.verdict, rule.color, rule.text.as_deref()) {
                (Verdict::Ignored, _, _) | (_, None, _) | (_, _, None) => {
                    evaluation.ignored += 1;
                }
                (verdict, Some(color), Some(text)) => {
                    evaluation.instructions.push(DrawInstruction {
                        bbox: det.bbox,
                        color,
                        text: text.to_string(),
                        verdict,
                        class_name: det.class_name.clone(),
                        confidence: det.confidence,
                    });
                }
            }
        }
        evaluation
    }
}
