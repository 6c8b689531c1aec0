//! Report assembly.

use reelcheck_contracts::report::{
    DocumentError, DocumentErrorKind, OverallStatus, SegmentValidationResult, ValidationReport,
    ValidationSummary,
};

/// Folds per-segment results and document errors into a `ValidationReport`.
///
/// Pure: the same inputs always give the same report. Segment order is
/// taken as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn assemble(segments: Vec<SegmentValidationResult>, document_errors: Vec<DocumentError>) -> ValidationReport {
        let total_segments = segments.len();
        let valid_segments = segments.iter().filter(|s| s.valid()).count();
        let invalid_segments = total_segments - valid_segments;
        let valid = invalid_segments == 0 && document_errors.is_empty();

        ValidationReport {
            valid,
            segments,
            document_errors,
            summary: ValidationSummary {
                total_segments,
                valid_segments,
                invalid_segments,
                overall_status: if valid { OverallStatus::Pass } else { OverallStatus::Fail },
            },
        }
    }

    /// FAIL report for input that never became a document.
    pub fn parse_failure(reason: impl Into<String>) -> ValidationReport {
        Self::assemble(
            Vec::new(),
            vec![DocumentError::new(DocumentErrorKind::MetadataParseError, reason)],
        )
    }
}
