//! Cross-segment quality checks.
//!
//! Runs after the structural phase has produced a result for every
//! segment. Timeline checks only look at segments whose `timestamps` parse;
//! the others already carry a structural error.

use tracing::{debug, warn};

use reelcheck_contracts::{
    metadata::{ClockValue, MetadataDocument, TimeRange},
    report::{DocumentError, DocumentErrorKind, ErrorKind, FieldIssue, SegmentValidationResult},
    rules::RuleSet,
};

use crate::schema::min_items_issue;

pub const TIMESTAMPS_FIELD: &str = "timestamps";
pub const EDITORIAL_FIELD: &str = "editorial_subjects";
pub const VISUAL_FIELD: &str = "visual_subjects";

#[derive(Debug, Clone, Copy, Default)]
pub struct QualityChecker {
    /// Length of the video in the same unit as the timestamps. Without it
    /// the end of the last segment is not checked.
    total_duration: Option<u32>,
}

impl QualityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_total_duration(mut self, total_duration: Option<u32>) -> Self {
        self.total_duration = total_duration;
        self
    }

    /// Run every configured check, attaching field-level findings to
    /// `segments` and returning document-level ones.
    pub fn check(
        &self,
        document: &MetadataDocument,
        rules: &RuleSet,
        segments: &mut [SegmentValidationResult],
    ) -> Vec<DocumentError> {
        let mut document_errors = Vec::new();
        let ranges = parse_ranges(document, rules);

        self.check_segment_count(document, rules, &mut document_errors);
        self.check_gaps(&ranges, rules, segments);
        self.check_sequence(&ranges, rules, segments);
        self.check_full_coverage(&ranges, rules, &mut document_errors);
        self.check_content(document, rules, segments);

        debug!(
            parsed_ranges = ranges.len(),
            document_errors = document_errors.len(),
            "quality checks complete"
        );
        document_errors
    }

    // ── Segment count ─────────────────────────────────────────────────────────

    fn check_segment_count(&self, document: &MetadataDocument, rules: &RuleSet, errors: &mut Vec<DocumentError>) {
        let required = stricter(rules.segments_rule().min_items, rules.quality_checks().min_segments);
        if let Some(required) = required {
            if document.len() < required {
                warn!(found = document.len(), required, "too few segments");
                errors.push(DocumentError::new(
                    DocumentErrorKind::InsufficientSegments,
                    format!("There should be at least {required} segments, found {}", document.len()),
                ));
            }
        }
    }

    // ── Coverage gaps ─────────────────────────────────────────────────────────

    fn check_gaps(&self, ranges: &[(usize, TimeRange)], rules: &RuleSet, segments: &mut [SegmentValidationResult]) {
        let Some(max_gap) = rules.quality_checks().max_time_gap else {
            return;
        };

        let mut ordered = ranges.to_vec();
        ordered.sort_by_key(|(index, range)| (range.start, *index));

        for pair in ordered.windows(2) {
            let (previous_index, previous) = pair[0];
            let (index, current) = pair[1];
            let gap = current.start.0.saturating_sub(previous.end.0);
            if gap > max_gap {
                warn!(segment = index, gap, max_gap, "coverage gap");
                push_issue(
                    segments,
                    index,
                    TIMESTAMPS_FIELD,
                    FieldIssue::new(
                        ErrorKind::CoverageGap,
                        format!(
                            "Gap of {gap} between segment {previous_index} (ends {}) and this segment (starts {}) exceeds {max_gap}",
                            previous.end, current.start
                        ),
                    ),
                );
            }
        }
    }

    // ── Sequence ──────────────────────────────────────────────────────────────

    fn check_sequence(&self, ranges: &[(usize, TimeRange)], rules: &RuleSet, segments: &mut [SegmentValidationResult]) {
        if !rules.quality_checks().enforce_sequence {
            return;
        }
        for pair in ranges.windows(2) {
            let (previous_index, previous) = pair[0];
            let (index, current) = pair[1];
            if current.start < previous.start {
                warn!(segment = index, "segment starts before its predecessor");
                push_issue(
                    segments,
                    index,
                    TIMESTAMPS_FIELD,
                    FieldIssue::new(
                        ErrorKind::SequenceViolation,
                        format!(
                            "Segment starts at {} before segment {previous_index} which starts at {}",
                            current.start, previous.start
                        ),
                    ),
                );
            }
        }
    }

    // ── Full-video coverage ───────────────────────────────────────────────────

    fn check_full_coverage(&self, ranges: &[(usize, TimeRange)], rules: &RuleSet, errors: &mut Vec<DocumentError>) {
        if !rules.quality_checks().must_cover_full_video {
            return;
        }
        let Some(first_start) = ranges.iter().map(|(_, range)| range.start).min() else {
            return;
        };
        if first_start != ClockValue(0) {
            errors.push(DocumentError::new(
                DocumentErrorKind::IncompleteCoverage,
                format!("Coverage starts at {first_start}, expected 00:00"),
            ));
        }

        let Some(total) = self.total_duration else {
            return;
        };
        let last_end = ranges
            .iter()
            .map(|(_, range)| range.end)
            .max()
            .unwrap_or(ClockValue(0));
        if last_end != ClockValue(total) {
            errors.push(DocumentError::new(
                DocumentErrorKind::IncompleteCoverage,
                format!("Coverage ends at {last_end}, expected {}", ClockValue(total)),
            ));
        }
    }

    // ── Content minimums ──────────────────────────────────────────────────────

    /// Subject lists must meet the stricter of the structural `min_items` and
    /// the quality minimum, reported once. When the structural rule is at
    /// least as strict it has already reported; otherwise the quality bound
    /// takes the place of any structural finding.
    fn check_content(&self, document: &MetadataDocument, rules: &RuleSet, segments: &mut [SegmentValidationResult]) {
        let quality = rules.quality_checks();
        let schema = rules.segment_schema();

        for (field, quality_min) in [
            (EDITORIAL_FIELD, quality.min_editorial_subjects),
            (VISUAL_FIELD, quality.min_visual_subjects),
        ] {
            let Some(quality_min) = quality_min else { continue };
            let Some(node) = schema.field(field) else {
                debug!(field, "content minimum skipped: field is not declared for segments");
                continue;
            };
            let structural_min = node.as_array().and_then(|array| array.min_items);
            if structural_min.is_some_and(|min| min >= quality_min) {
                continue;
            }

            for segment in document.segments() {
                let Some(items) = schema
                    .resolve(field, segment.fields())
                    .and_then(|(_, value)| value.as_array())
                else {
                    continue;
                };
                if items.len() >= quality_min {
                    continue;
                }
                let issue = min_items_issue(field, quality_min, items.len());
                match structural_min {
                    Some(min) if items.len() < min => {
                        let structural = min_items_issue(field, min, items.len());
                        if let Some(result) = segments.iter_mut().find(|s| s.segment_index == segment.index()) {
                            result.replace_issue(field, &structural, issue);
                        }
                    }
                    _ => push_issue(segments, segment.index(), field, issue),
                }
            }
        }
    }
}

/// Parsed timestamp ranges in document order, paired with segment index.
fn parse_ranges(document: &MetadataDocument, rules: &RuleSet) -> Vec<(usize, TimeRange)> {
    let schema = rules.segment_schema();
    document
        .segments()
        .iter()
        .filter_map(|segment| {
            let (_, value) = schema.resolve(TIMESTAMPS_FIELD, segment.fields())?;
            let range = TimeRange::parse(value.as_str()?)?;
            Some((segment.index(), range))
        })
        .collect()
}

fn push_issue(segments: &mut [SegmentValidationResult], index: usize, field: &str, issue: FieldIssue) {
    if let Some(segment) = segments.iter_mut().find(|s| s.segment_index == index) {
        if !segment.push_issue(field, issue) {
            debug!(segment = index, field, "finding dropped: field is not declared for segments");
        }
    }
}

fn stricter(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
