//! The metadata validator.
//!
//! `MetadataValidator` implements the `Validator` trait from
//! `reelcheck-core`. A pass runs in two phases:
//!
//! 1. **Structural**: every segment is checked against the segment rule,
//!    including per-field confidence thresholds.
//! 2. **Quality**: timeline and content checks over the whole segment list,
//!    which need every structural result to exist first.
//!
//! Each pass takes one snapshot of the shared rule set and uses it
//! throughout, so a concurrent reload never mixes two rule versions.

use std::sync::Arc;

use tracing::{debug, warn};

use reelcheck_contracts::{
    error::ReelcheckError,
    metadata::MetadataDocument,
    report::{ValidationPass, ValidationReport},
    rules::RuleSet,
};
use reelcheck_core::traits::Validator;
use reelcheck_rules::SharedRuleSet;

use crate::{quality::QualityChecker, report::ReportBuilder, schema::SchemaValidator};

pub struct MetadataValidator {
    rules: Arc<SharedRuleSet>,
    schema: SchemaValidator,
    quality: QualityChecker,
}

impl MetadataValidator {
    pub fn new(rules: Arc<SharedRuleSet>) -> Self {
        Self {
            rules,
            schema: SchemaValidator::new(),
            quality: QualityChecker::new(),
        }
    }

    /// Validator over a fixed rule set.
    pub fn with_rules(rules: RuleSet) -> Self {
        Self::new(Arc::new(SharedRuleSet::new(rules)))
    }

    /// Supply the video length so `must_cover_full_video` can check the
    /// end of the last segment.
    pub fn with_total_duration(mut self, total_duration: Option<u32>) -> Self {
        self.quality = self.quality.with_total_duration(total_duration);
        self
    }

    pub fn rules(&self) -> &Arc<SharedRuleSet> {
        &self.rules
    }

    /// Validate a parsed document against the current rule set.
    pub fn validate(&self, document: &MetadataDocument) -> ValidationReport {
        let rules = self.rules.snapshot();
        self.validate_with(document, &rules)
    }

    /// Validate a parsed document against an explicit rule set.
    pub fn validate_with(&self, document: &MetadataDocument, rules: &RuleSet) -> ValidationReport {
        // ── Phase 1: structure ────────────────────────────────────────────────
        let structural = self.schema.validate(document, rules);
        let mut segments = structural.segments;
        let mut document_errors = structural.document_errors;

        // ── Phase 2: quality ──────────────────────────────────────────────────
        document_errors.extend(self.quality.check(document, rules, &mut segments));

        let report = ReportBuilder::assemble(segments, document_errors);
        debug!(
            total = report.summary.total_segments,
            invalid = report.summary.invalid_segments,
            document_errors = report.document_errors.len(),
            status = %report.summary.overall_status,
            "validation complete"
        );
        report
    }

    /// Parse `raw` as JSON and validate it.
    ///
    /// Unparseable input produces a FAIL report carrying a
    /// `MetadataParseError` document error instead of an `Err`.
    pub fn validate_str(&self, raw: &str) -> ValidationPass {
        match MetadataDocument::from_json_str(raw) {
            Ok(document) => {
                let report = self.validate(&document);
                ValidationPass {
                    document: Some(document),
                    report,
                }
            }
            Err(e) => {
                let reason = match e {
                    ReelcheckError::MetadataParse { reason } => reason,
                    other => other.to_string(),
                };
                warn!(%reason, "metadata could not be parsed");
                ValidationPass {
                    document: None,
                    report: ReportBuilder::parse_failure(reason),
                }
            }
        }
    }
}

impl Validator for MetadataValidator {
    fn validate_raw(&self, raw: &str) -> ValidationPass {
        self.validate_str(raw)
    }
}
