//! Structural validation of a metadata document against the rule tree.
//!
//! Recursive descent over `RuleNode`. Every check records its failure and
//! carries on; the only early exits are a missing value and a type
//! mismatch, after which the remaining checks for that value are
//! meaningless.

use serde_json::Value;
use tracing::{debug, warn};

use reelcheck_contracts::{
    metadata::{json_kind, MetadataDocument, Segment},
    report::{
        DocumentError, DocumentErrorKind, ErrorKind, FieldIssue, FieldValidationResult,
        SegmentValidationResult,
    },
    rules::{ItemRule, ObjectRule, RuleKind, RuleNode, RuleSet, SEGMENTS_FIELD},
};

/// Field whose value names a segment in the report.
pub const TITLE_FIELD: &str = "segment_title";

const UNKNOWN_TITLE: &str = "Unknown";

/// Output of the structural phase.
#[derive(Debug, Clone, Default)]
pub struct StructuralResult {
    /// One entry per segment, in document order.
    pub segments: Vec<SegmentValidationResult>,
    /// Failures of top-level fields other than `segments`.
    pub document_errors: Vec<DocumentError>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, document: &MetadataDocument, rules: &RuleSet) -> StructuralResult {
        let schema = rules.segment_schema();
        let segments = document
            .segments()
            .iter()
            .map(|segment| self.validate_segment(segment, schema))
            .collect();

        StructuralResult {
            segments,
            document_errors: self.validate_root(document, rules),
        }
    }

    /// Validate one segment against the segment object rule.
    ///
    /// The result has exactly one entry per declared field, in declaration
    /// order, whether or not the field was present.
    pub fn validate_segment(&self, segment: &Segment, schema: &ObjectRule) -> SegmentValidationResult {
        let fields = schema
            .fields
            .iter()
            .map(|(name, node)| {
                let resolved = schema.resolve(name, segment.fields());
                let mut result = FieldValidationResult::new(name.as_str(), resolved.map(|(key, _)| key.to_string()));
                match resolved {
                    None => {
                        if node.required {
                            result.push(FieldIssue::new(
                                ErrorKind::MissingField,
                                format!("Required field '{name}' is missing"),
                            ));
                        }
                    }
                    Some((_, value)) => {
                        check_value(node, value, name, &mut result.issues);
                        check_confidence(node, segment, name, &mut result.issues);
                    }
                }
                result
            })
            .collect::<Vec<_>>();

        let segment_title = schema
            .resolve(TITLE_FIELD, segment.fields())
            .and_then(|(_, value)| value.as_str())
            .unwrap_or(UNKNOWN_TITLE)
            .to_string();

        let result = SegmentValidationResult {
            segment_index: segment.index(),
            segment_title,
            fields,
        };
        debug!(
            segment = result.segment_index,
            errors = result.error_count(),
            "segment structure checked"
        );
        result
    }

    fn validate_root(&self, document: &MetadataDocument, rules: &RuleSet) -> Vec<DocumentError> {
        let root = rules.root_object();
        let mut errors = Vec::new();
        for (name, node) in root.fields.iter().filter(|(name, _)| name != SEGMENTS_FIELD) {
            let mut issues = Vec::new();
            match root.resolve(name, document.root()) {
                None if node.required => issues.push(FieldIssue::new(
                    ErrorKind::MissingField,
                    format!("Required field '{name}' is missing"),
                )),
                None => {}
                Some((_, value)) => check_value(node, value, name, &mut issues),
            }
            for issue in issues {
                warn!(field = %name, kind = %issue.kind, "top-level field failed");
                errors.push(DocumentError::new(
                    DocumentErrorKind::FieldViolation,
                    format!("{}: {}", issue.kind, issue.detail),
                ));
            }
        }
        errors
    }
}

/// Check `value` against `node`, appending every failure to `issues`.
///
/// `path` prefixes each detail: the field name at the top, `names[2]` for
/// array elements, `location.city` for nested object fields.
pub fn check_value(node: &RuleNode, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) {
    let expected = node.value_type();
    if !expected.matches(value) {
        issues.push(FieldIssue::new(
            ErrorKind::TypeMismatch,
            format!("Field '{path}' should be a {expected}, found {}", json_kind(value)),
        ));
        return;
    }

    match &node.kind {
        RuleKind::String(rule) => {
            let Some(text) = value.as_str() else { return };
            if let Some(min) = rule.min_length {
                let length = text.chars().count();
                if length < min {
                    issues.push(FieldIssue::new(
                        ErrorKind::ConstraintViolation,
                        format!("Field '{path}' length should be at least {min}, found {length}"),
                    ));
                }
            }
            if let Some(pattern) = &rule.pattern {
                if !pattern.is_match(text) {
                    issues.push(FieldIssue::new(
                        ErrorKind::PatternMismatch,
                        format!("Field '{path}' value '{text}' does not match pattern '{}'", pattern.source()),
                    ));
                }
            }
            if let Some(allowed) = &rule.allowed {
                if !allowed.iter().any(|candidate| candidate == text) {
                    issues.push(FieldIssue::new(
                        ErrorKind::InvalidEnum,
                        format!("Field '{path}' should be one of {allowed:?}, found '{text}'"),
                    ));
                }
            }
        }

        RuleKind::Number(rule) => {
            let Some(number) = value.as_f64() else { return };
            if let Some(min) = rule.min {
                if number < min {
                    issues.push(FieldIssue::new(
                        ErrorKind::ConstraintViolation,
                        format!("Field '{path}' should be at least {min}, found {number}"),
                    ));
                }
            }
            if let Some(max) = rule.max {
                if number > max {
                    issues.push(FieldIssue::new(
                        ErrorKind::ConstraintViolation,
                        format!("Field '{path}' should be at most {max}, found {number}"),
                    ));
                }
            }
            if let Some(allowed) = &rule.allowed {
                if !allowed.iter().any(|candidate| *candidate == number) {
                    issues.push(FieldIssue::new(
                        ErrorKind::InvalidEnum,
                        format!("Field '{path}' should be one of {allowed:?}, found {number}"),
                    ));
                }
            }
        }

        RuleKind::Array(rule) => {
            let Some(items) = value.as_array() else { return };
            if let Some(min) = rule.min_items {
                if items.len() < min {
                    issues.push(min_items_issue(path, min, items.len()));
                }
            }
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{index}]");
                match &rule.items {
                    ItemRule::Schema(child) => check_value(child, item, &item_path, issues),
                    ItemRule::Element(element) => {
                        if !element.matches(item) {
                            issues.push(FieldIssue::new(
                                ErrorKind::TypeMismatch,
                                format!("Field '{item_path}' should be a {element}, found {}", json_kind(item)),
                            ));
                        }
                    }
                }
            }
        }

        RuleKind::Object(rule) => {
            let Some(object) = value.as_object() else { return };
            for (name, child) in &rule.fields {
                let child_path = format!("{path}.{name}");
                match rule.resolve(name, object) {
                    None if child.required => issues.push(FieldIssue::new(
                        ErrorKind::MissingField,
                        format!("Required field '{child_path}' is missing"),
                    )),
                    None => {}
                    Some((_, child_value)) => check_value(child, child_value, &child_path, issues),
                }
            }
        }
    }
}

/// Check the segment's reported confidence for `field` against the node's
/// thresholds.
///
/// Level and score are independent; both may fail. A segment that reports
/// nothing for the field is not penalised.
/// The `ConstraintViolation` raised for an array shorter than `min`.
pub fn min_items_issue(path: &str, min: usize, found: usize) -> FieldIssue {
    FieldIssue::new(
        ErrorKind::ConstraintViolation,
        format!("Field '{path}' should have at least {min} items, found {found}"),
    )
}

pub fn check_confidence(node: &RuleNode, segment: &Segment, field: &str, issues: &mut Vec<FieldIssue>) {
    if node.confidence.is_empty() {
        return;
    }
    let Some(entry) = segment.confidence_for(field) else {
        return;
    };

    if let (Some(threshold), Some(raw)) = (node.confidence.level, entry.level.as_deref()) {
        let meets = entry.parsed_level().is_some_and(|level| level.meets(threshold));
        if !meets {
            issues.push(FieldIssue::new(
                ErrorKind::ConfidenceBelowThreshold,
                format!("Field '{field}' confidence '{raw}' is below required level '{threshold}'"),
            ));
        }
    }

    if let (Some(threshold), Some(score)) = (node.confidence.score, entry.score) {
        if score < threshold {
            issues.push(FieldIssue::new(
                ErrorKind::ConfidenceBelowThreshold,
                format!("Field '{field}' confidence score {score} is below required {threshold}"),
            ));
        }
    }
}
