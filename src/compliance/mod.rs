//! Compliance rule layer.
//!
//! Turns the detections of one frame into overlay instructions. The mapping
//! from class name to verdict lives in a [`RuleTable`], so extending the
//! ontology is a data change rather than new control flow.

mod evaluator;
mod rules;

pub use evaluator::{ComplianceEvaluator, DrawInstruction, FrameEvaluation};
pub use rules::{default_rules, Color, ComplianceRule, RuleTable, Verdict};
