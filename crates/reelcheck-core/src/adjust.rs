//! Default adjustment strategy.
//!
//! `HintingAdjuster` keeps the caller's prompt and appends one corrective
//! instruction per failure category of the previous attempt. The hints are
//! also stored under `params.hints` so a generation service that builds its
//! own prompt can use them.

use serde_json::{json, Value};

use reelcheck_contracts::{
    report::{DocumentErrorKind, ErrorKind, FailureCategory},
    session::{Adjustment, GenerationRequest},
};

use crate::traits::AdjustmentStrategy;

const HINTS_HEADER: &str = "\n\nThe previous answer was rejected. Fix the following:";

#[derive(Debug, Clone, Copy, Default)]
pub struct HintingAdjuster;

impl HintingAdjuster {
    pub fn new() -> Self {
        Self
    }

    fn hint(category: &FailureCategory) -> String {
        match category {
            FailureCategory::Document { kind } => match kind {
                DocumentErrorKind::MetadataParseError => {
                    "Answer with a single JSON object that has a 'segments' array of objects.".to_string()
                }
                DocumentErrorKind::InsufficientSegments => {
                    "Split the video into more segments.".to_string()
                }
                DocumentErrorKind::IncompleteCoverage => {
                    "Make the segments cover the video from 00:00 to its very end.".to_string()
                }
                DocumentErrorKind::FieldViolation => {
                    "Fill in every required top-level field with a valid value.".to_string()
                }
            },
            FailureCategory::Field { field, kind } => match kind {
                ErrorKind::MissingField => format!("Always include '{field}' in every segment."),
                ErrorKind::TypeMismatch => format!("Give '{field}' the declared JSON type."),
                ErrorKind::ConstraintViolation => {
                    format!("'{field}' is too short or out of range; provide more content.")
                }
                ErrorKind::PatternMismatch => format!("Write '{field}' in the required format."),
                ErrorKind::InvalidEnum => format!("Use only the permitted values for '{field}'."),
                ErrorKind::ConfidenceBelowThreshold => {
                    format!("Only report '{field}' when you are confident; omit uncertain values.")
                }
                ErrorKind::CoverageGap => {
                    "Leave no gaps between consecutive segments' timestamps.".to_string()
                }
                ErrorKind::SequenceViolation => "List segments in chronological order.".to_string(),
            },
        }
    }
}

impl AdjustmentStrategy for HintingAdjuster {
    fn propose(&self, failed: &[FailureCategory], previous: &GenerationRequest) -> Adjustment {
        let base = previous
            .prompt
            .split(HINTS_HEADER)
            .next()
            .unwrap_or(previous.prompt.as_str());

        let mut hints: Vec<String> = failed.iter().map(Self::hint).collect();
        hints.dedup();
        if hints.is_empty() {
            hints.push("The previous request did not produce an answer in time; answer concisely.".to_string());
        }

        let mut prompt = format!("{base}{HINTS_HEADER}");
        for hint in &hints {
            prompt.push_str("\n- ");
            prompt.push_str(hint);
        }

        let mut params = match &previous.params {
            Value::Object(map) => Value::Object(map.clone()),
            _ => json!({}),
        };
        params["hints"] = json!(hints);

        let rationale = if failed.is_empty() {
            "no report from previous attempt".to_string()
        } else {
            failed.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
        };

        Adjustment {
            request: GenerationRequest {
                prompt,
                params,
            },
            rationale,
        }
    }
}
