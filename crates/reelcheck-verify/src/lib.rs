//! # reelcheck-verify
//!
//! Validation of AI-generated video segment metadata.
//!
//! [`MetadataValidator`] implements the
//! [`Validator`](reelcheck_core::traits::Validator) trait and runs two phases:
//!
//! 1. **Structural** ([`schema`]): recursive descent over the rule tree,
//!    including per-field confidence thresholds.
//! 2. **Quality** ([`quality`]): coverage gaps, ordering, full-video
//!    coverage and content minimums across the whole segment list.
//!
//! [`ReportBuilder`] folds both into a `ValidationReport`. Errors always
//! accumulate: one pass reports everything wrong with a document.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! let rules = reelcheck_rules::from_file(Path::new("rules/summary_validation_rules.yaml"))?;
//! let validator = MetadataValidator::with_rules(rules);
//! let pass = validator.validate_str(&raw_json);
//! println!("{}", pass.report.to_json_pretty()?);
//! ```

pub mod engine;
pub mod quality;
pub mod report;
pub mod schema;

pub use engine::MetadataValidator;
pub use quality::QualityChecker;
pub use report::ReportBuilder;
pub use schema::SchemaValidator;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use reelcheck_contracts::{
        metadata::MetadataDocument,
        report::{DocumentErrorKind, ErrorKind, OverallStatus, ValidationReport},
        rules::RuleSet,
    };
    use reelcheck_core::traits::Validator;

    use super::MetadataValidator;

    // ── Builder helpers ───────────────────────────────────────────────────────

    const STRUCTURE: &str = r#"
validation:
  structure:
    type: object
    fields:
      video_id:
        type: string
        required: true
      segments:
        type: array
        required: true
        item_schema:
          type: object
          fields:
            segment_title:
              type: string
              required: true
              aliases: ["Segment Title"]
            timestamps:
              type: string
              required: true
              pattern: '^\d{2}:\d{2}\s*[–—-]\s*\d{2}:\d{2}$'
            editorial_subjects:
              type: array
              required: true
              min_items: 1
              items: string
            visual_subjects:
              type: array
              required: true
              items: string
            names:
              type: array
              required: false
              items: string
              score:
                threshold: 60
            location:
              type: string
              required: true
              confidence:
                type: string
                enum: [low, medium, high]
                threshold: high
"#;

    /// Rule set with the given `quality_checks` body (already indented by
    /// four spaces).
    fn rules_with_quality(quality: &str) -> RuleSet {
        compile_rules(STRUCTURE, quality)
    }

    fn compile_rules(structure: &str, quality: &str) -> RuleSet {
        let doc = format!("{structure}  quality_checks:\n{quality}");
        reelcheck_rules::from_yaml_str(&doc).unwrap()
    }

    fn default_rules() -> RuleSet {
        rules_with_quality("    segment_coverage:\n      max_time_gap: 15\n")
    }

    fn segment(title: &str, timestamps: &str) -> Value {
        json!({
            "segment_title": title,
            "timestamps": timestamps,
            "editorial_subjects": ["election debate"],
            "visual_subjects": ["podium"],
            "names": ["A. Speaker"],
            "location": "Berlin",
            "confidence_level": {
                "location": {"score": 90, "level": "high"},
                "names": {"score": 75, "level": "medium"}
            }
        })
    }

    fn document(segments: Vec<Value>) -> Value {
        json!({"video_id": "vid-001", "segments": segments})
    }

    fn three_good_segments() -> Vec<Value> {
        vec![
            segment("Opening remarks", "00:00–05:00"),
            segment("First question", "05:00–10:00"),
            segment("Rebuttal", "10:10–15:00"),
        ]
    }

    fn run(rules: RuleSet, doc: Value) -> ValidationReport {
        let validator = MetadataValidator::with_rules(rules);
        let document = MetadataDocument::from_value(doc).unwrap();
        validator.validate(&document)
    }

    fn field_kinds(report: &ValidationReport, segment: usize, field: &str) -> Vec<ErrorKind> {
        report
            .segment(segment)
            .and_then(|s| s.field(field))
            .map(|f| f.kinds().collect())
            .unwrap_or_default()
    }

    // ── Scenarios ─────────────────────────────────────────────────────────────

    /// Three well-formed segments with small gaps pass.
    #[test]
    fn test_well_formed_document_passes() {
        let report = run(default_rules(), document(three_good_segments()));

        assert!(report.valid, "unexpected failures: {:?}", report.failure_categories());
        assert_eq!(report.summary.overall_status, OverallStatus::Pass);
        assert_eq!(report.summary.total_segments, 3);
        assert_eq!(report.summary.valid_segments, 3);
        assert!(report.document_errors.is_empty());
    }

    /// A missing required field is reported as exactly `MissingField`.
    #[test]
    fn test_missing_required_field() {
        let mut segments = three_good_segments();
        segments[1].as_object_mut().unwrap().remove("location");
        let report = run(default_rules(), document(segments));

        let wire = serde_json::to_value(&report).unwrap();
        let location = &wire["segments_validation"][1]["field_validations"]["location"];
        assert_eq!(location["errors"], json!(["MissingField"]));
        assert_eq!(location["valid"], json!(false));
        assert_eq!(wire["summary"]["overall_status"], json!("FAIL"));
        assert_eq!(report.summary.invalid_segments, 1);
    }

    /// A gap wider than `max_time_gap` is charged to the later segment.
    #[test]
    fn test_coverage_gap_on_later_segment() {
        let report = run(
            default_rules(),
            document(vec![
                segment("Opening", "00:00–10:00"),
                segment("Late start", "10:20–15:00"),
            ]),
        );

        assert_eq!(field_kinds(&report, 1, "timestamps"), [ErrorKind::CoverageGap]);
        assert!(field_kinds(&report, 0, "timestamps").is_empty());
        assert!(!report.valid);
    }

    /// A categorical level below the rule's threshold fails even when the
    /// numeric score looks healthy.
    #[test]
    fn test_confidence_level_below_threshold() {
        let mut segments = three_good_segments();
        segments[0]["confidence_level"]["location"] = json!({"score": 80, "level": "medium"});
        let report = run(default_rules(), document(segments));

        assert_eq!(field_kinds(&report, 0, "location"), [ErrorKind::ConfidenceBelowThreshold]);
        let detail = &report.segment(0).unwrap().field("location").unwrap().issues[0].detail;
        assert!(detail.contains("'medium'"), "detail: {detail}");
    }

    // ── Structural details ────────────────────────────────────────────────────

    #[test]
    fn test_alias_key_is_reported() {
        let mut segments = three_good_segments();
        let first = segments[0].as_object_mut().unwrap();
        let title = first.remove("segment_title").unwrap();
        first.insert("Segment Title".to_string(), title);
        let report = run(default_rules(), document(segments));

        let result = report.segment(0).unwrap();
        assert_eq!(result.segment_title, "Opening remarks");
        assert_eq!(
            result.field("segment_title").unwrap().json_field_name.as_deref(),
            Some("Segment Title")
        );
        assert!(report.valid);
    }

    #[test]
    fn test_element_errors_carry_index() {
        let mut segments = three_good_segments();
        segments[2]["names"] = json!(["A. Speaker", 42, null]);
        let report = run(default_rules(), document(segments));

        let names = report.segment(2).unwrap().field("names").unwrap();
        assert_eq!(names.issues.len(), 2);
        assert!(names.issues[0].detail.contains("names[1]"));
        assert!(names.issues[1].detail.contains("names[2]"));
        assert!(names.has(ErrorKind::TypeMismatch));
    }

    /// Level and score thresholds are evaluated independently.
    #[test]
    fn test_level_and_score_thresholds_both_fail() {
        let structure = STRUCTURE.replace(
            "                threshold: high\n",
            "                threshold: high\n              score:\n                threshold: 85\n",
        );
        let rules = compile_rules(&structure, "    segment_coverage:\n      max_time_gap: 15\n");
        let mut segments = three_good_segments();
        segments[0]["confidence_level"]["location"] = json!({"score": 80, "level": "medium"});
        let report = run(rules, document(segments));

        assert_eq!(
            field_kinds(&report, 0, "location"),
            [ErrorKind::ConfidenceBelowThreshold, ErrorKind::ConfidenceBelowThreshold]
        );
        let location = report.segment(0).unwrap().field("location").unwrap();
        assert!(location.issues[0].detail.contains("'medium'"));
        assert!(location.issues[1].detail.contains("80"));
        assert!(field_kinds(&report, 1, "location").is_empty());
    }

    #[test]
    fn test_errors_accumulate_within_a_field() {
        let structure = STRUCTURE.replace(
            "              pattern:",
            "              min_length: 11\n              pattern:",
        );
        let rules = compile_rules(&structure, "    segment_coverage:\n      max_time_gap: 15\n");
        let mut segments = three_good_segments();
        segments[1]["timestamps"] = json!("5 to 10");
        let report = run(rules, document(segments));

        assert_eq!(
            field_kinds(&report, 1, "timestamps"),
            [ErrorKind::ConstraintViolation, ErrorKind::PatternMismatch]
        );
    }

    #[test]
    fn test_errors_accumulate_across_fields() {
        let mut segments = three_good_segments();
        segments[0]["timestamps"] = json!(12);
        segments[0]["editorial_subjects"] = json!([]);
        segments[0]["confidence_level"]["location"] = json!({"level": "low"});
        let report = run(default_rules(), document(segments));

        let result = report.segment(0).unwrap();
        assert_eq!(field_kinds(&report, 0, "timestamps"), [ErrorKind::TypeMismatch]);
        assert_eq!(field_kinds(&report, 0, "editorial_subjects"), [ErrorKind::ConstraintViolation]);
        assert_eq!(field_kinds(&report, 0, "location"), [ErrorKind::ConfidenceBelowThreshold]);
        assert_eq!(result.error_count(), 3);
    }

    #[test]
    fn test_pattern_mismatch() {
        let mut segments = three_good_segments();
        segments[1]["timestamps"] = json!("5 to 10");
        let report = run(default_rules(), document(segments));
        assert_eq!(field_kinds(&report, 1, "timestamps"), [ErrorKind::PatternMismatch]);
    }

    #[test]
    fn test_missing_confidence_entry_is_skipped() {
        let mut segments = three_good_segments();
        segments[0].as_object_mut().unwrap().remove("confidence_level");
        let report = run(default_rules(), document(segments));
        assert!(report.valid);
    }

    #[test]
    fn test_top_level_field_violation() {
        let mut doc = document(three_good_segments());
        doc.as_object_mut().unwrap().remove("video_id");
        let report = run(default_rules(), doc);

        assert_eq!(report.summary.invalid_segments, 0);
        assert_eq!(report.document_errors.len(), 1);
        assert_eq!(report.document_errors[0].kind, DocumentErrorKind::FieldViolation);
        assert_eq!(report.summary.overall_status, OverallStatus::Fail);
    }

    // ── Quality checks ────────────────────────────────────────────────────────

    #[test]
    fn test_insufficient_segments() {
        let rules = rules_with_quality("    segment_coverage:\n      min_segments: 4\n");
        let report = run(rules, document(three_good_segments()));

        let kinds: Vec<_> = report.document_errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [DocumentErrorKind::InsufficientSegments]);
        assert!(report.document_errors[0].detail.contains("at least 4"));
    }

    #[test]
    fn test_sequence_violation() {
        let rules = rules_with_quality("    timestamp_validation:\n      enforce_sequence: true\n");
        let report = run(
            rules,
            document(vec![
                segment("A", "05:00–10:00"),
                segment("B", "00:00–05:00"),
                segment("C", "10:00–15:00"),
            ]),
        );
        assert_eq!(field_kinds(&report, 1, "timestamps"), [ErrorKind::SequenceViolation]);
        assert!(field_kinds(&report, 2, "timestamps").is_empty());
    }

    #[test]
    fn test_full_video_coverage() {
        let rules = rules_with_quality("    timestamp_validation:\n      must_cover_full_video: true\n");
        let late_start = document(vec![segment("A", "00:05–10:00"), segment("B", "10:00–15:00")]);

        let report = run(rules.clone(), late_start);
        assert_eq!(report.document_errors.len(), 1);
        assert_eq!(report.document_errors[0].kind, DocumentErrorKind::IncompleteCoverage);

        // End is only compared once the duration is known: 15:00 → 900 units.
        let doc = MetadataDocument::from_value(document(three_good_segments())).unwrap();
        let validator = MetadataValidator::with_rules(rules);
        assert!(validator.validate(&doc).valid);
        let short = validator.with_total_duration(Some(960)).validate(&doc);
        assert_eq!(short.document_errors[0].kind, DocumentErrorKind::IncompleteCoverage);
        assert!(short.document_errors[0].detail.contains("16:00"));
    }

    /// The stricter of the structural and quality minimums applies, and only
    /// one error is reported for it.
    #[test]
    fn test_content_minimums_use_stricter_bound() {
        let mut segments = three_good_segments();
        segments[0]["editorial_subjects"] = json!([]);
        segments[1]["visual_subjects"] = json!([]);
        let rules = rules_with_quality(
            "    content_quality:\n      min_editorial_subjects: 1\n      min_visual_subjects: 1\n",
        );
        let report = run(rules, document(segments.clone()));

        assert_eq!(field_kinds(&report, 0, "editorial_subjects"), [ErrorKind::ConstraintViolation]);
        assert_eq!(field_kinds(&report, 1, "visual_subjects"), [ErrorKind::ConstraintViolation]);

        segments[0]["editorial_subjects"] = json!(["one"]);
        let rules = rules_with_quality("    content_quality:\n      min_editorial_subjects: 2\n");
        let report = run(rules, document(segments));
        assert_eq!(field_kinds(&report, 0, "editorial_subjects"), [ErrorKind::ConstraintViolation]);
    }

    /// A quality minimum stricter than a failed structural `min_items`
    /// replaces the structural finding instead of adding a second one.
    #[test]
    fn test_stricter_quality_minimum_replaces_structural_error() {
        let mut segments = three_good_segments();
        segments[0]["editorial_subjects"] = json!([]);
        let rules = rules_with_quality("    content_quality:\n      min_editorial_subjects: 2\n");
        let report = run(rules, document(segments));

        let editorial = report.segment(0).unwrap().field("editorial_subjects").unwrap();
        assert_eq!(editorial.kinds().collect::<Vec<_>>(), [ErrorKind::ConstraintViolation]);
        assert!(editorial.issues[0].detail.contains("at least 2 items"), "{:?}", editorial.issues);
    }

    /// Content minimums never add entries for fields the segment rule does
    /// not declare.
    #[test]
    fn test_content_minimum_for_undeclared_field_is_skipped() {
        let structure = STRUCTURE.replace(
            "            visual_subjects:\n              type: array\n              required: true\n              items: string\n",
            "",
        );
        let rules = compile_rules(&structure, "    content_quality:\n      min_visual_subjects: 1\n");
        assert!(rules.segment_schema().field("visual_subjects").is_none());

        let mut segments = three_good_segments();
        segments[0]["visual_subjects"] = json!([]);
        let report = run(rules, document(segments));

        let names: Vec<&str> = report.segments[0].fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, ["segment_title", "timestamps", "editorial_subjects", "names", "location"]);
        assert!(report.valid, "unexpected failures: {:?}", report.failure_categories());
    }

    /// Clock values too large to represent are treated as unparseable and
    /// skipped by the timeline checks.
    #[test]
    fn test_oversized_timestamps_do_not_break_quality_checks() {
        let report = run(
            default_rules(),
            document(vec![
                segment("Opening", "00:00-10:00"),
                segment("Garbled", "99999999:00-99999999:30"),
            ]),
        );

        assert_eq!(field_kinds(&report, 1, "timestamps"), [ErrorKind::PatternMismatch]);
        assert!(field_kinds(&report, 0, "timestamps").is_empty());
        assert_eq!(report.summary.invalid_segments, 1);
    }

    // ── Properties ────────────────────────────────────────────────────────────

    #[test]
    fn test_validation_is_idempotent() {
        let mut segments = three_good_segments();
        segments[1]["names"] = json!("not a list");
        let validator = MetadataValidator::with_rules(default_rules());
        let doc = MetadataDocument::from_value(document(segments)).unwrap();

        let first = serde_json::to_string(&validator.validate(&doc)).unwrap();
        let second = serde_json::to_string(&validator.validate(&doc)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_declared_field_is_reported_in_order() {
        let report = run(default_rules(), document(vec![json!({"segment_title": "Only a title"})]));
        let names: Vec<&str> = report.segments[0].fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            names,
            ["segment_title", "timestamps", "editorial_subjects", "visual_subjects", "names", "location"]
        );
        // Optional `names` is absent without error.
        assert!(report.segments[0].field("names").unwrap().valid());
    }

    /// Raising a score threshold can only turn passes into failures.
    #[test]
    fn test_score_threshold_is_monotonic() {
        let mut previous_failures = 0;
        for threshold in [10, 50, 75, 76, 95] {
            let doc = STRUCTURE.replace("threshold: 60", &format!("threshold: {threshold}"));
            let rules = reelcheck_rules::from_yaml_str(&doc).unwrap();
            let report = run(rules, document(three_good_segments()));
            let failures = report.summary.invalid_segments;
            assert!(failures >= previous_failures, "threshold {threshold} reduced failures");
            previous_failures = failures;
        }
        assert_eq!(previous_failures, 3);
    }

    #[test]
    fn test_summary_is_consistent() {
        let mut segments = three_good_segments();
        segments[0].as_object_mut().unwrap().remove("timestamps");
        segments[2]["location"] = json!(7);
        let report = run(default_rules(), document(segments));

        let summary = &report.summary;
        assert_eq!(summary.valid_segments + summary.invalid_segments, summary.total_segments);
        assert_eq!(summary.valid_segments, report.segments.iter().filter(|s| s.valid()).count());
        assert_eq!(
            summary.overall_status == OverallStatus::Pass,
            summary.invalid_segments == 0 && report.document_errors.is_empty()
        );
        assert_eq!(summary.invalid_segments, 2);
    }

    // ── Raw input ─────────────────────────────────────────────────────────────

    #[test]
    fn test_unparseable_input_is_a_fail_report() {
        let validator = MetadataValidator::with_rules(default_rules());
        for raw in ["{not json", r#"{"segments": "none"}"#, r#"{"segments": [1, 2]}"#] {
            let pass = validator.validate_raw(raw);
            assert!(pass.document.is_none());
            assert_eq!(pass.report.summary.overall_status, OverallStatus::Fail);
            assert_eq!(pass.report.document_errors[0].kind, DocumentErrorKind::MetadataParseError);
        }
    }

    #[test]
    fn test_raw_input_round_trips_document() {
        let validator = MetadataValidator::with_rules(default_rules());
        let raw = document(three_good_segments()).to_string();
        let pass = validator.validate_raw(&raw);
        assert!(pass.report.passed());
        assert_eq!(pass.document.unwrap().len(), 3);
    }
}
