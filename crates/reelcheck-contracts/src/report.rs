//! Validation report types.
//!
//! A report is built once per validation pass and never modified afterwards.
//! Field and segment ordering follow rule declaration order and document
//! order respectively, so two passes over the same input serialize to the
//! same bytes.

use std::fmt;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

use crate::metadata::MetadataDocument;

/// Field-level error kinds, structural and quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingField,
    TypeMismatch,
    ConstraintViolation,
    PatternMismatch,
    InvalidEnum,
    ConfidenceBelowThreshold,
    CoverageGap,
    SequenceViolation,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingField => "MissingField",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::ConstraintViolation => "ConstraintViolation",
            ErrorKind::PatternMismatch => "PatternMismatch",
            ErrorKind::InvalidEnum => "InvalidEnum",
            ErrorKind::ConfidenceBelowThreshold => "ConfidenceBelowThreshold",
            ErrorKind::CoverageGap => "CoverageGap",
            ErrorKind::SequenceViolation => "SequenceViolation",
        }
    }

    /// True for errors raised by the cross-segment quality phase.
    pub fn is_quality(self) -> bool {
        matches!(self, ErrorKind::CoverageGap | ErrorKind::SequenceViolation)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error attached to a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub kind: ErrorKind,
    pub detail: String,
}

impl FieldIssue {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Validation outcome for one declared field of one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValidationResult {
    pub field: String,
    /// The document key the value was found under, if it was found at all.
    pub json_field_name: Option<String>,
    pub issues: Vec<FieldIssue>,
}

impl FieldValidationResult {
    pub fn new(field: impl Into<String>, json_field_name: Option<String>) -> Self {
        Self {
            field: field.into(),
            json_field_name,
            issues: Vec::new(),
        }
    }

    pub fn valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn push(&mut self, issue: FieldIssue) {
        self.issues.push(issue);
    }

    pub fn has(&self, kind: ErrorKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ErrorKind> + '_ {
        self.issues.iter().map(|issue| issue.kind)
    }
}

/// Wire format: `{valid, json_field_name, errors: [kind], details: [text]}`.
impl Serialize for FieldValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FieldValidationResult", 4)?;
        state.serialize_field("valid", &self.valid())?;
        state.serialize_field("json_field_name", &self.json_field_name)?;
        let kinds: Vec<ErrorKind> = self.kinds().collect();
        state.serialize_field("errors", &kinds)?;
        let details: Vec<&str> = self.issues.iter().map(|i| i.detail.as_str()).collect();
        state.serialize_field("details", &details)?;
        state.end()
    }
}

/// Validation outcome for one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentValidationResult {
    pub segment_index: usize,
    pub segment_title: String,
    /// One entry per declared field, in declaration order.
    pub fields: Vec<FieldValidationResult>,
}

impl SegmentValidationResult {
    pub fn valid(&self) -> bool {
        self.fields.iter().all(FieldValidationResult::valid)
    }

    pub fn field(&self, name: &str) -> Option<&FieldValidationResult> {
        self.fields.iter().find(|f| f.field == name)
    }

    /// Attach `issue` to the declared field `name`.
    ///
    /// Returns false and drops the issue when the segment has no entry for
    /// `name`; results only ever hold declared fields.
    pub fn push_issue(&mut self, name: &str, issue: FieldIssue) -> bool {
        match self.fields.iter_mut().find(|f| f.field == name) {
            Some(result) => {
                result.push(issue);
                true
            }
            None => false,
        }
    }

    /// Replace `old` on field `name` with `new`, or append `new` if `old`
    /// is not there.
    pub fn replace_issue(&mut self, name: &str, old: &FieldIssue, new: FieldIssue) -> bool {
        let Some(result) = self.fields.iter_mut().find(|f| f.field == name) else {
            return false;
        };
        match result.issues.iter_mut().find(|issue| *issue == old) {
            Some(slot) => *slot = new,
            None => result.push(new),
        }
        true
    }

    pub fn error_count(&self) -> usize {
        self.fields.iter().map(|f| f.issues.len()).sum()
    }
}

struct FieldMap<'a>(&'a [FieldValidationResult]);

impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for field in self.0 {
            map.serialize_entry(&field.field, field)?;
        }
        map.end()
    }
}

impl Serialize for SegmentValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SegmentValidationResult", 4)?;
        state.serialize_field("segment_index", &self.segment_index)?;
        state.serialize_field("segment_title", &self.segment_title)?;
        state.serialize_field("valid", &self.valid())?;
        state.serialize_field("field_validations", &FieldMap(&self.fields))?;
        state.end()
    }
}

/// Errors that concern the document as a whole rather than one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentErrorKind {
    /// The input could not be read as a segment list.
    MetadataParseError,
    /// Fewer segments than the rule set requires.
    InsufficientSegments,
    /// The segments do not span the whole video.
    IncompleteCoverage,
    /// A top-level field outside `segments` failed its rule.
    FieldViolation,
}

impl fmt::Display for DocumentErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentErrorKind::MetadataParseError => "MetadataParseError",
            DocumentErrorKind::InsufficientSegments => "InsufficientSegments",
            DocumentErrorKind::IncompleteCoverage => "IncompleteCoverage",
            DocumentErrorKind::FieldViolation => "FieldViolation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentError {
    pub kind: DocumentErrorKind,
    pub detail: String,
}

impl DocumentError {
    pub fn new(kind: DocumentErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallStatus::Pass => f.write_str("PASS"),
            OverallStatus::Fail => f.write_str("FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_segments: usize,
    pub valid_segments: usize,
    pub invalid_segments: usize,
    pub overall_status: OverallStatus,
}

/// The result of one validation pass.
///
/// Built by `ReportBuilder::assemble` in `reelcheck-verify`; `valid` and
/// `summary` are derived from the segment results and document errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(rename = "segments_validation")]
    pub segments: Vec<SegmentValidationResult>,
    pub document_errors: Vec<DocumentError>,
    pub summary: ValidationSummary,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.summary.overall_status == OverallStatus::Pass
    }

    pub fn segment(&self, index: usize) -> Option<&SegmentValidationResult> {
        self.segments.iter().find(|s| s.segment_index == index)
    }

    /// De-duplicated failure categories in a stable order.
    ///
    /// This is what an adjustment strategy keys its prompt rewrites on.
    pub fn failure_categories(&self) -> Vec<FailureCategory> {
        let mut categories: Vec<FailureCategory> = self
            .document_errors
            .iter()
            .map(|e| FailureCategory::Document { kind: e.kind })
            .chain(self.segments.iter().flat_map(|segment| {
                segment.fields.iter().flat_map(|field| {
                    field.kinds().map(move |kind| FailureCategory::Field {
                        field: field.field.clone(),
                        kind,
                    })
                })
            }))
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Pretty JSON wire form.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A rule category that failed somewhere in a report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum FailureCategory {
    Document { kind: DocumentErrorKind },
    Field { field: String, kind: ErrorKind },
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCategory::Document { kind } => write!(f, "document:{kind}"),
            FailureCategory::Field { field, kind } => write!(f, "{field}:{kind}"),
        }
    }
}

/// A report together with the document it describes.
///
/// `document` is `None` when the raw input could not be parsed; the report
/// then carries a `MetadataParseError` document error.
#[derive(Debug, Clone)]
pub struct ValidationPass {
    pub document: Option<MetadataDocument>,
    pub report: ValidationReport,
}
