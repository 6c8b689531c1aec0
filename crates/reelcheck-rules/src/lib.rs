//! # reelcheck-rules
//!
//! Loads declarative validation rule documents and compiles them into the
//! immutable [`RuleSet`](reelcheck_contracts::rules::RuleSet) the validators
//! consume.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! let rules = reelcheck_rules::from_file(Path::new("rules/summary_validation_rules.yaml"))?;
//! let node = rules.lookup("segments.timestamps");
//! ```
//!
//! YAML is the canonical encoding; JSON and TOML documents with the same
//! layout are accepted too. Field declaration order is preserved in every
//! format and drives the order of the validation report.

pub mod compile;
pub mod document;
pub mod loader;
pub mod shared;

pub use compile::{compile, compile_value};
pub use document::RuleDocument;
pub use loader::{from_file, from_json_str, from_str, from_toml_str, from_yaml_str, RuleFormat};
pub use shared::SharedRuleSet;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::Path;

    use reelcheck_contracts::{
        error::ReelcheckError,
        rules::{ConfidenceLevel, ItemRule, RuleKind, ValueType},
    };

    use super::*;

    const SHIPPED_RULES: &str = include_str!("../../../rules/summary_validation_rules.yaml");

    /// Wrap a segment field block in the minimum document around it.
    fn with_segment_fields(fields_yaml: &str) -> String {
        let indented: String = fields_yaml
            .lines()
            .map(|line| format!("              {line}\n"))
            .collect();
        format!(
            "validation:\n  structure:\n    type: object\n    fields:\n      segments:\n        type: array\n        item_schema:\n          type: object\n          fields:\n{indented}"
        )
    }

    fn expect_rule_parse(result: Result<impl std::fmt::Debug, ReelcheckError>, needle: &str) {
        match result {
            Err(ReelcheckError::RuleParse { reason }) => {
                assert!(reason.contains(needle), "expected '{needle}' in reason, got: {reason}");
            }
            other => panic!("expected RuleParse, got {:?}", other),
        }
    }

    // ── shipped document ──────────────────────────────────────────────────────

    #[test]
    fn shipped_rules_compile() {
        let rules = from_yaml_str(SHIPPED_RULES).unwrap();

        let names: Vec<&str> = rules
            .segment_schema()
            .fields
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(
            names,
            ["segment_title", "timestamps", "editorial_subjects", "visual_subjects", "names", "location"]
        );

        let quality = rules.quality_checks();
        assert_eq!(quality.max_time_gap, Some(15));
        assert_eq!(quality.min_segments, Some(3));
        assert!(quality.enforce_sequence);
        assert!(!quality.must_cover_full_video);

        let location = rules.lookup("segments.location").unwrap();
        assert_eq!(location.confidence.level, Some(ConfidenceLevel::Medium));
        assert_eq!(location.confidence.score, Some(70.0));
        assert_eq!(location.aliases, ["Location"]);
    }

    #[test]
    fn timestamps_pattern_accepts_both_dashes() {
        let rules = from_yaml_str(SHIPPED_RULES).unwrap();
        let RuleKind::String(rule) = &rules.lookup("segments[].timestamps").unwrap().kind else {
            panic!("timestamps should be a string rule");
        };
        let pattern = rule.pattern.as_ref().unwrap();
        assert!(pattern.is_match("00:00–10:00"));
        assert!(pattern.is_match("00:00-10:00"));
        assert!(!pattern.is_match("0:00 to 10:00"));
    }

    #[test]
    fn bare_items_become_element_types() {
        let rules = from_yaml_str(SHIPPED_RULES).unwrap();
        let names = rules.lookup("segments.names").unwrap().as_array().unwrap();
        assert!(matches!(names.items, ItemRule::Element(ValueType::String)));
    }

    // ── malformed documents ───────────────────────────────────────────────────

    #[test]
    fn node_without_type_is_rejected() {
        let doc = with_segment_fields("location:\n  required: true");
        expect_rule_parse(from_yaml_str(&doc), "'validation.structure.segments.item_schema.location' has no type");
    }

    #[test]
    fn array_without_items_is_rejected() {
        let doc = with_segment_fields("names:\n  type: array");
        expect_rule_parse(from_yaml_str(&doc), "neither item_schema nor items");
    }

    #[test]
    fn object_without_fields_is_rejected() {
        let doc = with_segment_fields("extra:\n  type: object\n  fields: {}");
        expect_rule_parse(from_yaml_str(&doc), "has no fields");
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let doc = with_segment_fields("timestamps:\n  type: string\n  pattern: '([0-9'");
        expect_rule_parse(from_yaml_str(&doc), "invalid pattern");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let doc = with_segment_fields("location:\n  type: text");
        expect_rule_parse(from_yaml_str(&doc), "unknown type 'text'");
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let doc = with_segment_fields("duration:\n  type: number\n  min: 10\n  max: 5");
        expect_rule_parse(from_yaml_str(&doc), "greater than max");
    }

    #[test]
    fn confidence_threshold_must_be_a_known_level() {
        let doc = with_segment_fields("location:\n  type: string\n  confidence:\n    threshold: certain");
        expect_rule_parse(from_yaml_str(&doc), "not one of low, medium, high");
    }

    #[test]
    fn missing_structure_is_rejected() {
        expect_rule_parse(from_yaml_str("validation:\n  quality_checks: {}"), "validation.structure");
        expect_rule_parse(from_yaml_str("rules: []"), "no 'validation' section");
    }

    #[test]
    fn segments_must_hold_objects() {
        let doc = "validation:\n  structure:\n    type: object\n    fields:\n      segments:\n        type: array\n        items: string\n";
        expect_rule_parse(from_yaml_str(doc), "object item_schema");
    }

    #[test]
    fn yaml_syntax_error_is_rule_parse() {
        expect_rule_parse(from_yaml_str("validation: [unclosed"), "failed to parse rule YAML");
    }

    #[test]
    fn threshold_sub_rule_without_threshold_declares_no_check() {
        let doc = with_segment_fields(
            "location:\n  type: string\n  confidence:\n    type: string\n    enum: [low, medium, high]\n  score:\n    type: number\n    threshold: null",
        );
        let rules = from_yaml_str(&doc).unwrap();
        let location = rules.lookup("segments.location").unwrap();
        assert!(location.confidence.is_empty());
    }

    #[test]
    fn bare_threshold_values_are_accepted() {
        let doc = with_segment_fields("location:\n  type: string\n  confidence: high\n  score: 40");
        let rules = from_yaml_str(&doc).unwrap();
        let location = rules.lookup("segments.location").unwrap();
        assert_eq!(location.confidence.level, Some(ConfidenceLevel::High));
        assert_eq!(location.confidence.score, Some(40.0));
    }

    // ── other encodings ───────────────────────────────────────────────────────

    #[test]
    fn json_documents_keep_declaration_order() {
        let doc = r#"{
            "validation": {
                "structure": {
                    "type": "object",
                    "fields": {
                        "segments": {
                            "type": "array",
                            "item_schema": {
                                "type": "object",
                                "fields": {
                                    "zeta": {"type": "string"},
                                    "alpha": {"type": "number", "enum": [1, 2, 3]}
                                }
                            }
                        }
                    }
                }
            }
        }"#;
        let rules = from_json_str(doc).unwrap();
        let names: Vec<&str> = rules.segment_schema().fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn toml_documents_compile() {
        let doc = r#"
            [validation.structure]
            type = "object"

            [validation.structure.fields.segments]
            type = "array"
            required = true

            [validation.structure.fields.segments.item_schema]
            type = "object"

            [validation.structure.fields.segments.item_schema.fields.location]
            type = "string"
            required = true
            score = { threshold = 70 }

            [validation.quality_checks.segment_coverage]
            max_time_gap = 30
        "#;
        let rules = from_toml_str(doc).unwrap();
        assert_eq!(rules.quality_checks().max_time_gap, Some(30));
        assert_eq!(rules.lookup("segments.location").unwrap().confidence.score, Some(70.0));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(RuleFormat::from_path(Path::new("r.YML")).unwrap(), RuleFormat::Yaml);
        assert_eq!(RuleFormat::from_path(Path::new("r.toml")).unwrap(), RuleFormat::Toml);
        assert!(matches!(
            RuleFormat::from_path(Path::new("rules.txt")),
            Err(ReelcheckError::ConfigError { .. })
        ));
    }

    // ── reload ────────────────────────────────────────────────────────────────

    #[test]
    fn replace_swaps_whole_rule_set() {
        let shared = SharedRuleSet::new(from_yaml_str(SHIPPED_RULES).unwrap());
        let before = shared.snapshot();

        let doc = with_segment_fields("location:\n  type: string");
        shared.replace(from_yaml_str(&doc).unwrap());

        // A snapshot taken before the swap still sees the old tree.
        assert_eq!(before.segment_schema().fields.len(), 6);
        assert_eq!(shared.snapshot().segment_schema().fields.len(), 1);
    }

    #[test]
    fn failed_reload_keeps_previous_rules() {
        let path = std::env::temp_dir().join(format!("reelcheck-reload-{}.yaml", std::process::id()));
        std::fs::write(&path, SHIPPED_RULES).unwrap();
        let shared = SharedRuleSet::from_file(&path).unwrap();

        std::fs::write(&path, "validation: {}").unwrap();
        assert!(shared.reload().is_err());
        assert_eq!(shared.snapshot().segment_schema().fields.len(), 6);

        std::fs::write(&path, with_segment_fields("location:\n  type: string")).unwrap();
        shared.reload().unwrap();
        assert_eq!(shared.snapshot().segment_schema().fields.len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn reload_without_source_is_config_error() {
        let shared = SharedRuleSet::new(from_yaml_str(SHIPPED_RULES).unwrap());
        assert!(matches!(shared.reload(), Err(ReelcheckError::ConfigError { .. })));
    }
}
